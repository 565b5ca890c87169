// src/pinecone_client.rs
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::{ApiKey, PineconeSettings};
use crate::error::UpstreamError;
use crate::models::RetrievalMatch;
use crate::services::upstream::VectorIndex;

const SERVICE: &str = "vector index";
const API_VERSION: &str = "2024-07";

/// Pinecone REST client bound to one index namespace.
#[derive(Debug)]
pub struct PineconeClient {
    client: Client,
    api_key: Option<ApiKey>,
    controller_url: String,
    index_name: String,
    namespace: String,
    host: OnceCell<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: Vec<f32>,
    top_k: u32,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<ReviewMetadata>,
}

#[derive(Debug, Deserialize)]
struct ReviewMetadata {
    review: String,
    subject: String,
    stars: f64,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

impl TryFrom<PineconeMatch> for RetrievalMatch {
    type Error = UpstreamError;

    fn try_from(m: PineconeMatch) -> Result<Self, Self::Error> {
        let metadata = m
            .metadata
            .ok_or_else(|| UpstreamError::malformed(SERVICE, format!("match '{}' has no metadata", m.id)))?;
        Ok(RetrievalMatch {
            id: m.id,
            review: metadata.review,
            subject: metadata.subject,
            stars: metadata.stars,
        })
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

impl PineconeClient {
    pub fn new(settings: &PineconeSettings) -> Self {
        let host = OnceCell::new_with(settings.index_host.as_deref().map(normalize_host));
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            controller_url: settings.controller_url.clone(),
            index_name: settings.index_name.clone(),
            namespace: settings.namespace.clone(),
            host,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, UpstreamError> {
        match &self.api_key {
            Some(key) => Ok(builder
                .header("Api-Key", key.expose())
                .header("X-Pinecone-API-Version", API_VERSION)),
            None => Err(UpstreamError::NotConfigured { service: SERVICE }),
        }
    }

    /// Data-plane host for the index, looked up once through the controller.
    async fn host(&self) -> Result<&str, UpstreamError> {
        self.host
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/indexes/{}",
                    self.controller_url,
                    urlencoding::encode(&self.index_name)
                );
                let response = self
                    .authorized(self.client.get(url))?
                    .send()
                    .await
                    .map_err(|e| UpstreamError::request(SERVICE, e))?;

                if !response.status().is_success() {
                    return Err(UpstreamError::from_response(SERVICE, response).await);
                }

                let description: IndexDescription = response
                    .json()
                    .await
                    .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;
                tracing::info!(index = %self.index_name, host = %description.host, "resolved vector index host");
                Ok::<_, UpstreamError>(normalize_host(&description.host))
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn query(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<RetrievalMatch>, UpstreamError> {
        let host = self.host().await?;
        let request = QueryRequest {
            namespace: &self.namespace,
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self
            .authorized(self.client.post(format!("{}/query", host)))?
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(UpstreamError::from_response(SERVICE, response).await);
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        for m in &query_response.matches {
            tracing::debug!(id = %m.id, score = ?m.score, "vector match");
        }

        query_response
            .matches
            .into_iter()
            .map(RetrievalMatch::try_from)
            .collect()
    }
}
