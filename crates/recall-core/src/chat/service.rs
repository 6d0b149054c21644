//! Conversation service tying history, retrieval and a chat model together.
//!
//! One conversational turn runs in a fixed order:
//! append current input -> window -> retrieve -> template -> invoke -> append reply.
//!
//! Generic over `ChatModel` and `PromptTemplate` so recall-core never depends
//! on a concrete provider.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use recall_types::chat::{ChatConfig, ChatInput, ResponseFragment, Role, Turn};
use recall_types::config::RecallConfig;
use recall_types::error::{ConversationError, ModelError};
use recall_types::vector::ScoredRecord;
use tracing::{debug, warn};

use crate::history::SessionHistoryStore;
use crate::llm::model::ChatModel;
use crate::llm::prompt::{PromptTemplate, PromptVariables};
use crate::memory::retriever::Retriever;

/// Stream of reply fragments produced by [`ConversationService::respond_stream`].
pub type ConversationStream<'a> =
    Pin<Box<dyn Stream<Item = Result<ResponseFragment, ConversationError>> + Send + 'a>>;

/// Runs conversational turns against a shared history store.
pub struct ConversationService<M: ChatModel, P: PromptTemplate> {
    history: Arc<SessionHistoryStore>,
    model: M,
    template: P,
    retriever: Option<Retriever>,
    chat_config: ChatConfig,
    window: usize,
}

impl<M: ChatModel, P: PromptTemplate> ConversationService<M, P> {
    /// Create a service without retrieval, taking the chat settings and
    /// history window from `config`.
    pub fn new(
        history: Arc<SessionHistoryStore>,
        model: M,
        template: P,
        config: &RecallConfig,
    ) -> Self {
        Self {
            history,
            model,
            template,
            retriever: None,
            chat_config: config.chat.clone(),
            window: config.history.default_window,
        }
    }

    /// Attach a retriever whose results are passed to the template as context.
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Override how many recent turns are sent to the model.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Access the shared history store.
    pub fn history(&self) -> &Arc<SessionHistoryStore> {
        &self.history
    }

    /// Access the chat model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run one turn and return the assistant reply.
    ///
    /// The input is recorded before the model is called, so it stays in
    /// history even when a later step fails. The reply is appended only on
    /// success.
    #[tracing::instrument(
        name = "respond",
        skip(self, input),
        fields(model = self.model.name(), window = self.window)
    )]
    pub async fn respond(
        &self,
        session_key: &str,
        input: impl Into<ChatInput>,
    ) -> Result<Turn, ConversationError> {
        let prompt = self.prepare(session_key, input.into()).await?;
        let reply = self.model.invoke(&prompt, &self.chat_config).await?;
        let reply = if reply.timestamp().is_none() {
            reply.with_timestamp(Utc::now())
        } else {
            reply
        };
        self.history.append(session_key, reply.clone());
        Ok(reply)
    }

    /// Run one turn, forwarding reply fragments as the model produces them.
    ///
    /// The assembled reply is appended to history when the model signals
    /// `Done`, before that fragment is yielded. A model stream that ends
    /// without `Done` yields a `ModelError::Stream` and leaves no reply in
    /// history.
    pub fn respond_stream<'a>(
        &'a self,
        session_key: &'a str,
        input: impl Into<ChatInput>,
    ) -> ConversationStream<'a> {
        let input = input.into();
        Box::pin(async_stream::try_stream! {
            let prompt = self
                .prepare(session_key, input)
                .await
                .map_err(ConversationError::from)?;
            let mut fragments = self.model.stream(prompt, self.chat_config.clone());

            let mut text = String::new();
            let mut completed = false;
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment.map_err(ConversationError::from)?;
                match &fragment {
                    ResponseFragment::TextDelta { text: delta } => text.push_str(delta),
                    ResponseFragment::Done => {
                        self.history
                            .append(session_key, Turn::stamped(Role::Assistant, text.clone()));
                        completed = true;
                    }
                }
                yield fragment;
                if completed {
                    break;
                }
            }

            if !completed {
                warn!(session_key, received = text.len(), "model stream ended before completion");
                Err::<(), _>(ConversationError::from(ModelError::Stream(
                    "stream ended before completion".to_string(),
                )))?;
            }
        })
    }

    /// Record the input, then build the prompt for this turn.
    async fn prepare(
        &self,
        session_key: &str,
        input: ChatInput,
    ) -> Result<Vec<Turn>, ConversationError> {
        let turns = input.into_turns();
        let query = turns
            .iter()
            .rev()
            .find(|turn| turn.role() == Role::User)
            .map(|turn| turn.text().to_string());

        self.history.extend(session_key, turns);
        let history = self.history.window(session_key, self.window);

        let context = self.retrieve_context(query.as_deref()).await?;
        debug!(
            session_key,
            history = history.len(),
            context = context.len(),
            "assembled prompt inputs"
        );

        let vars = PromptVariables {
            history,
            context,
            language: self.chat_config.system_prompt_language.clone(),
            ..Default::default()
        };
        Ok(self.template.format(&vars)?)
    }

    async fn retrieve_context(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<ScoredRecord>, ConversationError> {
        match (&self.retriever, query) {
            (Some(retriever), Some(query)) => Ok(retriever.retrieve(query).await?),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use recall_types::config::RetrievalConfig;
    use recall_types::error::EmbedError;
    use recall_types::vector::Metric;

    use super::*;
    use crate::index::VectorIndex;
    use crate::llm::model::FragmentStream;
    use crate::llm::prompt::ContextPromptTemplate;
    use crate::memory::box_embedder::BoxEmbedder;
    use crate::memory::embedder::Embedder;

    /// Replies "echo: <last user text>" and records every prompt it receives.
    #[derive(Default)]
    struct EchoModel {
        prompts: Mutex<Vec<Vec<Turn>>>,
        truncate_stream: bool,
        fail: bool,
    }

    impl EchoModel {
        fn reply_text(turns: &[Turn]) -> String {
            let last = turns
                .iter()
                .rev()
                .find(|t| t.role() == Role::User)
                .map(|t| t.text().to_string())
                .unwrap_or_default();
            format!("echo: {last}")
        }

        fn last_prompt(&self) -> Vec<Turn> {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl ChatModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, turns: &[Turn], _config: &ChatConfig) -> Result<Turn, ModelError> {
            self.prompts.lock().unwrap().push(turns.to_vec());
            if self.fail {
                return Err(ModelError::Timeout);
            }
            Ok(Turn::assistant(Self::reply_text(turns)))
        }

        fn stream(&self, turns: Vec<Turn>, _config: ChatConfig) -> FragmentStream {
            self.prompts.lock().unwrap().push(turns.clone());
            let reply = Self::reply_text(&turns);
            let truncate = self.truncate_stream;
            Box::pin(async_stream::stream! {
                for word in reply.split_inclusive(' ') {
                    yield Ok(ResponseFragment::TextDelta { text: word.to_string() });
                }
                if !truncate {
                    yield Ok(ResponseFragment::Done);
                }
            })
        }
    }

    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            let text = text.to_lowercase();
            let hit = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
            Ok(vec![hit("rust"), hit("tea")])
        }

        fn model_name(&self) -> &str {
            "keyword"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct OfflineEmbedder;

    impl Embedder for OfflineEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Provider("offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "offline"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn service(model: EchoModel) -> ConversationService<EchoModel, ContextPromptTemplate> {
        ConversationService::new(
            Arc::new(SessionHistoryStore::new()),
            model,
            ContextPromptTemplate::default(),
            &RecallConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_respond_appends_input_and_reply() {
        let service = service(EchoModel::default());
        let reply = service.respond("s1", "hello").await.unwrap();

        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.text(), "echo: hello");
        assert!(reply.timestamp().is_some());

        let history = service.history().full_history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].text(), "hello");
        assert_eq!(history[1], reply);
    }

    #[tokio::test]
    async fn test_prompt_respects_window() {
        let service = service(EchoModel::default()).with_window(3);
        for i in 0..5 {
            service.respond("s1", format!("message {i}")).await.unwrap();
        }

        let prompt = service.model().last_prompt();
        // System turn, then the last three turns including the current input.
        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].role(), Role::System);
        assert_eq!(prompt[1].text(), "message 3");
        assert_eq!(prompt[2].text(), "echo: message 3");
        assert_eq!(prompt[3].text(), "message 4");
        assert_eq!(service.history().len("s1"), 10);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let service = service(EchoModel::default());
        service.respond("alice", "one").await.unwrap();
        service.respond("bob", "two").await.unwrap();

        let prompt = service.model().last_prompt();
        assert!(prompt.iter().all(|t| t.text() != "one"));
        assert_eq!(service.history().len("alice"), 2);
        assert_eq!(service.history().len("bob"), 2);
    }

    #[tokio::test]
    async fn test_retrieved_context_reaches_prompt() {
        let retriever = Retriever::new(
            Arc::new(VectorIndex::new()),
            BoxEmbedder::new(KeywordEmbedder),
            RetrievalConfig {
                default_k: 1,
                default_metric: Metric::Cosine,
                threshold: None,
            },
        );
        retriever
            .add_documents(["Rust ownership rules", "Green tea brewing"])
            .await
            .unwrap();

        let service = service(EchoModel::default()).with_retriever(retriever);
        service.respond("s1", "how does tea work?").await.unwrap();

        let system = service.model().last_prompt()[0].text().to_string();
        assert!(system.contains("<context>\n[1] Green tea brewing\n</context>"));
        assert!(!system.contains("Rust ownership"));
    }

    #[tokio::test]
    async fn test_turns_without_user_skip_retrieval() {
        let retriever = Retriever::new(
            Arc::new(VectorIndex::new()),
            BoxEmbedder::new(OfflineEmbedder),
            RetrievalConfig::default(),
        );
        let service = service(EchoModel::default()).with_retriever(retriever);

        let input = ChatInput::Turns {
            turns: vec![Turn::system("note: user is away")],
        };
        let reply = service.respond("s1", input).await.unwrap();
        assert_eq!(reply.text(), "echo: ");
    }

    #[tokio::test]
    async fn test_retrieval_failure_surfaces() {
        let retriever = Retriever::new(
            Arc::new(VectorIndex::new()),
            BoxEmbedder::new(OfflineEmbedder),
            RetrievalConfig::default(),
        );
        let service = service(EchoModel::default()).with_retriever(retriever);

        let err = service.respond("s1", "hi").await.unwrap_err();
        assert!(matches!(err, ConversationError::Retrieval(_)));
        // Input was recorded before retrieval ran.
        assert_eq!(service.history().len("s1"), 1);
    }

    #[tokio::test]
    async fn test_model_failure_keeps_input_only() {
        let service = service(EchoModel {
            fail: true,
            ..Default::default()
        });
        let err = service.respond("s1", "hi").await.unwrap_err();
        assert_eq!(err, ConversationError::Model(ModelError::Timeout));
        assert_eq!(service.history().len("s1"), 1);
    }

    #[tokio::test]
    async fn test_respond_stream_forwards_and_appends() {
        let service = service(EchoModel::default());
        let fragments: Vec<_> = service
            .respond_stream("s1", "good morning")
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(fragments.last(), Some(&ResponseFragment::Done));
        let text: String = fragments
            .iter()
            .filter_map(|f| match f {
                ResponseFragment::TextDelta { text } => Some(text.as_str()),
                ResponseFragment::Done => None,
            })
            .collect();
        assert_eq!(text, "echo: good morning");

        let history = service.history().full_history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role(), Role::Assistant);
        assert_eq!(history[1].text(), "echo: good morning");
    }

    #[tokio::test]
    async fn test_respond_stream_truncated_appends_nothing() {
        let service = service(EchoModel {
            truncate_stream: true,
            ..Default::default()
        });
        let items: Vec<_> = service.respond_stream("s1", "hi there").collect().await;

        assert!(matches!(
            items.last(),
            Some(Err(ConversationError::Model(ModelError::Stream(_))))
        ));
        assert_eq!(service.history().len("s1"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let service = Arc::new(service(EchoModel::default()));
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let key = format!("session-{i}");
                for j in 0..5 {
                    service.respond(&key, format!("msg {j}")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            let history = service.history().full_history(&format!("session-{i}"));
            assert_eq!(history.len(), 10);
            assert_eq!(history[8].text(), "msg 4");
            assert_eq!(history[9].text(), "echo: msg 4");
        }
    }
}
