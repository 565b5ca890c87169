use std::net::SocketAddr;
use std::sync::Arc;

use professor_chat::config::AppConfig;
use professor_chat::openai_client::OpenAiClient;
use professor_chat::pinecone_client::PineconeClient;
use professor_chat::services::{PipelineSettings, RagPipeline};
use professor_chat::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = AppConfig::from_env().expect("Invalid configuration");
    log_configuration(&config);

    let openai = Arc::new(OpenAiClient::new(&config.openai));
    let pinecone = Arc::new(PineconeClient::new(&config.pinecone));
    let pipeline = RagPipeline::new(PipelineSettings::from(&config), openai.clone(), pinecone, openai);

    let bind_addr = config.bind_addr;
    let shared_state = Arc::new(AppState { config, pipeline });
    let app = professor_chat::app(shared_state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("listening on {}", bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,professor_chat=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,professor_chat=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON lines for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("🎓 Rate My Professor chat starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

// Presence only, never the key values
fn log_configuration(config: &AppConfig) {
    let mark = |configured: bool| if configured { "✅" } else { "❌" };

    tracing::info!(
        "Configuration - OpenAI: {}, Pinecone: {}, index: {}/{}",
        mark(config.generation_configured()),
        mark(config.vector_index_configured()),
        config.pinecone.index_name,
        config.pinecone.namespace
    );

    if !config.generation_configured() {
        tracing::warn!("OPENAI_API_KEY not found. Chat requests will be rejected until it is set.");
    }
    if !config.vector_index_configured() {
        tracing::warn!("PINECONE_API_KEY not found. Review retrieval will fail.");
    }
    if config.pinecone.index_host.is_none() {
        tracing::info!("PINECONE_INDEX_HOST not set, the index host will be resolved on first query");
    }
}
