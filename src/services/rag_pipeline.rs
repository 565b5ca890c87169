// src/services/rag_pipeline.rs
//! Retrieval-augmented answer pipeline behind `POST /api/chat`.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::ChatError;
use crate::models::{ChatMessage, Role};
use crate::services::prompt;
use crate::services::relay::Relay;
use crate::services::upstream::{CompletionService, EmbeddingService, VectorIndex};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Whether the generation-service key was present at start-up.
    pub generation_configured: bool,
    pub chat_model: String,
    pub top_k: u32,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            generation_configured: config.generation_configured(),
            chat_model: config.openai.chat_model.clone(),
            top_k: config.top_k,
        }
    }
}

pub struct RagPipeline {
    settings: PipelineSettings,
    embedder: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn CompletionService>,
}

impl RagPipeline {
    pub fn new(
        settings: PipelineSettings,
        embedder: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            settings,
            embedder,
            index,
            generator,
        }
    }

    /// Fails fast when the generation key was missing at start-up. Runs
    /// before the request body is looked at.
    pub fn ensure_configured(&self) -> Result<(), ChatError> {
        if self.settings.generation_configured {
            Ok(())
        } else {
            Err(ChatError::MissingCredential("OPENAI_API_KEY"))
        }
    }

    /// Embeds the newest question, retrieves matching reviews, and opens the
    /// completion stream. Everything up to the first streamed byte happens
    /// here, so failures before that point become ordinary error responses.
    pub async fn respond(&self, mut conversation: Vec<ChatMessage>) -> Result<Relay, ChatError> {
        self.ensure_configured()?;

        let question = match conversation.pop() {
            Some(message) if message.role == Role::User => message,
            Some(message) => {
                return Err(ChatError::InvalidConversation(format!(
                    "last message must come from the user, got {}",
                    message.role.as_str()
                )))
            }
            None => return Err(ChatError::InvalidConversation("conversation is empty".into())),
        };
        let earlier = conversation;

        tracing::debug!(turns = earlier.len() + 1, "embedding latest question");
        let embedding = self.embedder.embed(&question.content).await?;

        let mut matches = self.index.query(embedding, self.settings.top_k).await?;
        let limit = self.settings.top_k as usize;
        if matches.len() > limit {
            tracing::warn!(
                returned = matches.len(),
                requested = limit,
                "vector index returned more matches than requested, keeping the first ones"
            );
            matches.truncate(limit);
        }
        tracing::info!(matches = matches.len(), "retrieved professor reviews");

        let augmented = prompt::augment(&question.content, &matches);
        let messages = prompt::outgoing_messages(&earlier, augmented);

        tracing::debug!(
            messages = messages.len(),
            model = %self.settings.chat_model,
            "requesting streamed completion"
        );
        let chunks = self
            .generator
            .stream_chat(&self.settings.chat_model, messages)
            .await?;

        Ok(Relay::new(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::models::{CompletionChunk, RetrievalMatch};
    use crate::services::upstream::ChunkStream;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Calls {
        pub embedded: Mutex<Vec<String>>,
        pub queried: Mutex<Vec<(usize, u32)>>,
        pub generated: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    }

    impl Calls {
        pub fn total(&self) -> usize {
            self.embedded.lock().unwrap().len()
                + self.queried.lock().unwrap().len()
                + self.generated.lock().unwrap().len()
        }
    }

    pub struct StubServices {
        pub calls: Arc<Calls>,
        pub matches: Vec<RetrievalMatch>,
        pub reply: Vec<&'static str>,
    }

    #[async_trait]
    impl EmbeddingService for StubServices {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
            self.calls.embedded.lock().unwrap().push(text.to_string());
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    #[async_trait]
    impl VectorIndex for StubServices {
        async fn query(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<RetrievalMatch>, UpstreamError> {
            self.calls.queried.lock().unwrap().push((vector.len(), top_k));
            Ok(self.matches.clone())
        }
    }

    #[async_trait]
    impl CompletionService for StubServices {
        async fn stream_chat(
            &self,
            model: &str,
            messages: Vec<ChatMessage>,
        ) -> Result<ChunkStream, UpstreamError> {
            self.calls
                .generated
                .lock()
                .unwrap()
                .push((model.to_string(), messages));
            let chunks: Vec<Result<CompletionChunk, UpstreamError>> = self
                .reply
                .iter()
                .map(|text| Ok(CompletionChunk::text(*text)))
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    pub fn professor(id: &str, subject: &str, stars: f64) -> RetrievalMatch {
        RetrievalMatch {
            id: id.into(),
            review: format!("{} explains things clearly", id),
            subject: subject.into(),
            stars,
        }
    }

    pub fn settings(generation_configured: bool) -> PipelineSettings {
        PipelineSettings {
            generation_configured,
            chat_model: "gpt-4o-mini".into(),
            top_k: 3,
        }
    }

    pub fn pipeline_with(
        generation_configured: bool,
        matches: Vec<RetrievalMatch>,
        reply: Vec<&'static str>,
    ) -> (RagPipeline, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let stub = Arc::new(StubServices {
            calls: calls.clone(),
            matches,
            reply,
        });
        let pipeline = RagPipeline::new(settings(generation_configured), stub.clone(), stub.clone(), stub);
        (pipeline, calls)
    }

    async fn drain(relay: Relay) -> String {
        let mut out = Vec::new();
        let mut relay = relay;
        while let Some(item) = relay.next().await {
            out.extend_from_slice(&item.unwrap());
        }
        String::from_utf8(out).unwrap()
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant("Hi! I am the rate my professor bot. How can I help you today?"),
            ChatMessage::user("Who teaches calculus?"),
            ChatMessage::assistant("Dr. X does."),
            ChatMessage::user("Any good Biology professors?"),
        ]
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_calls() {
        let (pipeline, calls) = pipeline_with(false, vec![], vec!["unused"]);
        let err = pipeline.respond(conversation()).await.err().unwrap();
        assert!(matches!(err, ChatError::MissingCredential("OPENAI_API_KEY")));
        assert!(matches!(
            pipeline.ensure_configured(),
            Err(ChatError::MissingCredential("OPENAI_API_KEY"))
        ));
        assert_eq!(calls.total(), 0);

        let (configured, _) = pipeline_with(true, vec![], vec![]);
        assert!(configured.ensure_configured().is_ok());
    }

    #[tokio::test]
    async fn test_embeds_exactly_the_last_message() {
        let (pipeline, calls) = pipeline_with(true, vec![], vec!["ok"]);
        drain(pipeline.respond(conversation()).await.unwrap()).await;
        assert_eq!(
            *calls.embedded.lock().unwrap(),
            vec!["Any good Biology professors?".to_string()]
        );
        assert_eq!(*calls.queried.lock().unwrap(), vec![(3, 3)]);
    }

    #[tokio::test]
    async fn test_outgoing_message_layout() {
        let matches = vec![
            professor("Dr. A", "Bio", 4.5),
            professor("Dr. B", "Bio", 4.0),
            professor("Dr. C", "Bio", 3.5),
        ];
        let (pipeline, calls) = pipeline_with(true, matches, vec!["ok"]);
        let input = conversation();
        drain(pipeline.respond(input.clone()).await.unwrap()).await;

        let generated = calls.generated.lock().unwrap();
        let (model, messages) = &generated[0];
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(messages.len(), (input.len() - 1) + 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(&messages[1..4], &input[..3]);

        let last = &messages[4];
        assert_eq!(last.role, Role::User);
        assert!(last.content.starts_with("Any good Biology professors?"));
        assert!(last.content.contains(prompt::RETRIEVAL_HEADER));
        assert_ne!(last.content, input[3].content);
        let a = last.content.find("Professor: Dr. A").unwrap();
        let b = last.content.find("Professor: Dr. B").unwrap();
        let c = last.content.find("Professor: Dr. C").unwrap();
        assert!(a < b && b < c);
        assert!(last.content.contains("Stars: 4.5"));
    }

    #[tokio::test]
    async fn test_zero_matches_still_answers() {
        let (pipeline, calls) = pipeline_with(true, vec![], vec!["No data, sorry."]);
        let body = drain(pipeline.respond(vec![ChatMessage::user("hello")]).await.unwrap()).await;
        assert_eq!(body, "No data, sorry.");

        let generated = calls.generated.lock().unwrap();
        let messages = &generated[0].1;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains(prompt::RETRIEVAL_HEADER));
        assert!(!messages[1].content.contains("Professor:"));
    }

    #[tokio::test]
    async fn test_extra_matches_are_capped() {
        let matches = vec![
            professor("Dr. A", "Bio", 4.5),
            professor("Dr. B", "Bio", 4.0),
            professor("Dr. C", "Bio", 3.5),
            professor("Dr. D", "Bio", 3.0),
        ];
        let (pipeline, calls) = pipeline_with(true, matches, vec!["ok"]);
        drain(pipeline.respond(vec![ChatMessage::user("bio?")]).await.unwrap()).await;

        let generated = calls.generated.lock().unwrap();
        let prompt = &generated[0].1[1].content;
        assert!(prompt.contains("Dr. C"));
        assert!(!prompt.contains("Dr. D"));
    }

    #[tokio::test]
    async fn test_rejects_conversation_not_ending_with_user() {
        let (pipeline, calls) = pipeline_with(true, vec![], vec!["ok"]);
        let err = pipeline
            .respond(vec![ChatMessage::assistant("hi")])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::InvalidConversation(_)));

        let err = pipeline.respond(vec![]).await.err().unwrap();
        assert!(matches!(err, ChatError::InvalidConversation(_)));
        assert_eq!(calls.total(), 0);
    }

    #[tokio::test]
    async fn test_same_input_same_bytes() {
        let (pipeline, _calls) = pipeline_with(
            true,
            vec![professor("Dr. A", "Bio", 4.5)],
            vec!["Try ", "", "Dr. A."],
        );
        let first = drain(pipeline.respond(conversation()).await.unwrap()).await;
        let second = drain(pipeline.respond(conversation()).await.unwrap()).await;
        assert_eq!(first, "Try Dr. A.");
        assert_eq!(first, second);
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingService for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
            Err(UpstreamError::malformed("embeddings", "no embedding returned"))
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_before_streaming() {
        let calls = Arc::new(Calls::default());
        let stub = Arc::new(StubServices {
            calls: calls.clone(),
            matches: vec![],
            reply: vec!["ok"],
        });
        let pipeline = RagPipeline::new(settings(true), Arc::new(FailingEmbedder), stub.clone(), stub);

        let err = pipeline.respond(vec![ChatMessage::user("q")]).await.err().unwrap();
        assert!(matches!(err, ChatError::Upstream(_)));
        assert!(calls.queried.lock().unwrap().is_empty());
        assert!(calls.generated.lock().unwrap().is_empty());
    }
}
