use async_trait::async_trait;
use chat_core::context::ContextTurn;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unknown model '{0}'")]
    UnknownModel(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// One incremental piece of streamed model output.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDelta {
    pub content: String,
}

impl StreamDelta {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Finite, non-restartable sequence of content deltas.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>;

/// Streaming chat capability, implemented once per provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Open a streaming completion for the given context turns.
    async fn stream(&self, context: &[ContextTurn]) -> Result<ChatStream>;

    /// Run a completion to the end and return the concatenated text.
    ///
    /// Used where the caller wants one structured result (e.g. title
    /// generation) rather than incremental delivery.
    async fn complete(&self, context: &[ContextTurn]) -> Result<String> {
        let mut stream = self.stream(context).await?;
        let mut output = String::new();
        while let Some(delta) = stream.next().await {
            output.push_str(&delta?.content);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::message::ContentBlock;
    use chat_core::message::Role;

    struct ScriptedModel {
        deltas: Vec<&'static str>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn stream(&self, _context: &[ContextTurn]) -> Result<ChatStream> {
            let items: Vec<Result<StreamDelta>> =
                self.deltas.iter().map(|d| Ok(StreamDelta::new(*d))).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn complete_concatenates_stream() {
        let model = ScriptedModel {
            deltas: vec!["Hel", "lo ", "world"],
        };
        let context = vec![ContextTurn {
            role: Role::User,
            content: vec![ContentBlock::text("hi")],
        }];

        let output = model.complete(&context).await.unwrap();
        assert_eq!(output, "Hello world");
    }

    #[tokio::test]
    async fn complete_propagates_stream_errors() {
        struct FailingModel;

        #[async_trait]
        impl ChatModel for FailingModel {
            async fn stream(&self, _context: &[ContextTurn]) -> Result<ChatStream> {
                let items: Vec<Result<StreamDelta>> = vec![
                    Ok(StreamDelta::new("partial")),
                    Err(ChatError::Stream("connection reset".to_string())),
                ];
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }

        let err = FailingModel.complete(&[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Stream(_)));
    }
}
