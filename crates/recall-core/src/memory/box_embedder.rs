//! Type-erased [`Embedder`] so a `Retriever` can hold any embedding model
//! without a generic parameter.
//!
//! `EmbedderDyn` mirrors `Embedder` with a boxed future and is blanket
//! implemented for every `Embedder`. `BoxEmbedder` delegates to it.

use std::future::Future;
use std::pin::Pin;

use recall_types::error::EmbedError;

use super::embedder::Embedder;

/// Dyn-compatible mirror of [`Embedder`].
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbedError>> + Send + 'a>>;

    fn model_name_dyn(&self) -> &str;

    fn dimension_dyn(&self) -> usize;
}

impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbedError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn model_name_dyn(&self) -> &str {
        self.model_name()
    }

    fn dimension_dyn(&self) -> usize {
        self.dimension()
    }
}

/// An owned embedder of any concrete type.
///
/// Implements `Embedder` itself, so it also works with the generic
/// `VectorIndex::query_by_text`.
pub struct BoxEmbedder {
    inner: Box<dyn EmbedderDyn + Send + Sync>,
}

impl BoxEmbedder {
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }
}

impl Embedder for BoxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.inner.embed_boxed(text).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name_dyn()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension_dyn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model_name(&self) -> &str {
            "length"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_box_embedder_delegates() {
        let boxed = BoxEmbedder::new(LengthEmbedder);
        assert_eq!(boxed.model_name(), "length");
        assert_eq!(boxed.dimension(), 2);
        assert_eq!(boxed.embed("abcd").await.unwrap(), vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn test_box_embedder_future_is_send_with_borrowed_text() {
        let boxed = std::sync::Arc::new(BoxEmbedder::new(LengthEmbedder));
        let handle = tokio::spawn({
            let boxed = std::sync::Arc::clone(&boxed);
            async move {
                let text = String::from("hello");
                boxed.embed(&text).await
            }
        });
        assert_eq!(handle.await.unwrap().unwrap(), vec![5.0, 1.0]);
    }
}
