// Terminal chat against a running server.
use std::io::Write;

use professor_chat::client::{ChatTransport, MessageStore};
use professor_chat::models::Role;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let endpoint = std::env::var("CHAT_ENDPOINT").unwrap_or_else(|_| "http://localhost:3000/api/chat".to_string());
    let transport = ChatTransport::new(endpoint);
    let mut store = MessageStore::new();

    if let Some(greeting) = store.last() {
        println!("bot> {}", greeting.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let mut current: Option<usize> = None;
        let mut printed = 0;
        let result = transport
            .send_turn(&mut store, &line, |store| {
                let index = store.len().saturating_sub(1);
                let Some(last) = store.last() else { return };
                if last.role != Role::Assistant {
                    return;
                }
                if current != Some(index) {
                    if current.is_some() {
                        println!();
                    }
                    print!("bot> ");
                    current = Some(index);
                    printed = 0;
                }
                if last.content.len() > printed {
                    print!("{}", &last.content[printed..]);
                    printed = last.content.len();
                }
                let _ = std::io::stdout().flush();
            })
            .await;

        if current.is_some() {
            println!();
        }
        if let Err(e) = result {
            tracing::debug!("turn failed: {}", e);
        }
    }

    Ok(())
}
