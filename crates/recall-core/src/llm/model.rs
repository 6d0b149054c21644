//! ChatModel trait definition.
//!
//! Uses RPITIT for `invoke` and `Pin<Box<dyn Stream>>` for `stream`, matching
//! how streamed replies are consumed: lazily, once, to completion.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use recall_types::chat::{ChatConfig, ResponseFragment, Role, Turn};
use recall_types::error::ModelError;

/// Boxed stream of reply fragments.
pub type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<ResponseFragment, ModelError>> + Send + 'static>>;

/// Trait for external chat-model backends.
///
/// Recall never implements a model; callers wrap their provider client in
/// this trait. Failures may be transient (see [`ModelError::is_transient`])
/// and retry policy is the caller's responsibility.
pub trait ChatModel: Send + Sync {
    /// Human-readable backend name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send the full prompt and receive the complete reply turn.
    fn invoke(
        &self,
        turns: &[Turn],
        config: &ChatConfig,
    ) -> impl std::future::Future<Output = Result<Turn, ModelError>> + Send;

    /// Send the prompt and receive the reply incrementally.
    ///
    /// The stream is finite and not restartable; it should end with
    /// [`ResponseFragment::Done`].
    fn stream(&self, turns: Vec<Turn>, config: ChatConfig) -> FragmentStream;
}

/// Drain a fragment stream into a single assistant turn.
///
/// Fails with `ModelError::Stream` if the stream ends before `Done`, so a
/// truncated reply is never mistaken for a complete one.
pub async fn collect_reply(mut stream: FragmentStream) -> Result<Turn, ModelError> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment? {
            ResponseFragment::TextDelta { text: delta } => text.push_str(&delta),
            ResponseFragment::Done => return Ok(Turn::stamped(Role::Assistant, text)),
        }
    }
    Err(ModelError::Stream(
        "stream ended before completion".to_string(),
    ))
}
