// src/config.rs
use std::fmt;
use std::net::SocketAddr;

pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const CHAT_MODEL: &str = "gpt-4o-mini";
pub const TOP_K: u32 = 3;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
const DEFAULT_PINECONE_INDEX: &str = "rag";
const DEFAULT_PINECONE_NAMESPACE: &str = "ns1";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Secret credential. Only `expose` hands out the value; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<ApiKey>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

#[derive(Debug, Clone)]
pub struct PineconeSettings {
    pub api_key: Option<ApiKey>,
    pub controller_url: String,
    pub index_name: String,
    pub namespace: String,
    /// Data-plane host. Resolved through the controller when unset.
    pub index_host: Option<String>,
}

/// Process-wide configuration, built once at start-up and handed to the
/// clients and the chat pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub openai: OpenAiSettings,
    pub pinecone: PineconeSettings,
    pub top_k: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: bind.clone(), source })?;

        Ok(Self {
            bind_addr,
            openai: OpenAiSettings {
                api_key: var("OPENAI_API_KEY").map(ApiKey::new),
                base_url: var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                embedding_model: EMBEDDING_MODEL.to_string(),
                chat_model: CHAT_MODEL.to_string(),
            },
            pinecone: PineconeSettings {
                api_key: var("PINECONE_API_KEY").map(ApiKey::new),
                controller_url: var("PINECONE_CONTROLLER_URL")
                    .unwrap_or_else(|| DEFAULT_PINECONE_CONTROLLER_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                index_name: var("PINECONE_INDEX").unwrap_or_else(|| DEFAULT_PINECONE_INDEX.to_string()),
                namespace: var("PINECONE_NAMESPACE")
                    .unwrap_or_else(|| DEFAULT_PINECONE_NAMESPACE.to_string()),
                index_host: var("PINECONE_INDEX_HOST"),
            },
            top_k: TOP_K,
        })
    }

    pub fn generation_configured(&self) -> bool {
        self.openai.api_key.is_some()
    }

    pub fn vector_index_configured(&self) -> bool {
        self.pinecone.api_key.is_some()
    }
}
