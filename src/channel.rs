//! Message channel dispatch.
//!
//! The host page (or any other embedder) talks to the loader through a
//! small closed set of messages:
//!
//! ```json
//! {"type": "RENDER_OFFICE", "data": {"chunkIndex": 0, "totalChunks": 2, "data": "...", ...}}
//! {"type": "CLOSE_EDITOR"}
//! ```
//!
//! [`ChannelDispatcher`] routes each message to the orchestrator and turns
//! every outcome, including errors and panics, into a [`DispatchReport`].
//! Nothing escapes into the transport.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AcquisitionError;
use crate::models::{AcquisitionResult, Chunk};
use crate::orchestrator::{AcquisitionOrchestrator, StreamProgress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMessage {
    RenderOffice(Chunk),
    CloseEditor,
}

/// What happened to one dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchReport {
    /// Chunk buffered, transfer still in flight.
    Buffered { received: usize, total: usize },
    /// Transfer complete and document opened.
    Opened { file_name: String },
    /// Channel closed, pending transfer discarded.
    Closed,
    Failed { code: String, message: String },
}

impl DispatchReport {
    fn failed(err: &AcquisitionError) -> Self {
        Self::Failed {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ChannelDispatcher {
    orchestrator: Arc<AcquisitionOrchestrator>,
}

impl ChannelDispatcher {
    pub fn new(orchestrator: Arc<AcquisitionOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Parse and dispatch one JSON message.
    pub async fn dispatch_json(&self, raw: &str) -> DispatchReport {
        match serde_json::from_str::<ChannelMessage>(raw) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed channel message");
                DispatchReport::Failed {
                    code: "bad_message".to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Dispatch one message.
    ///
    /// The handler runs on its own task so a panic inside it is reported
    /// as a failure instead of tearing down the caller.
    pub async fn dispatch(&self, message: ChannelMessage) -> DispatchReport {
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { handle(&orchestrator, message).await });

        match handle.await {
            Ok(report) => report,
            Err(e) => {
                let err = AcquisitionError::Unknown(e.to_string());
                tracing::error!(error = %err, "channel handler crashed");
                DispatchReport::failed(&err)
            }
        }
    }
}

async fn handle(orchestrator: &AcquisitionOrchestrator, message: ChannelMessage) -> DispatchReport {
    match message {
        ChannelMessage::RenderOffice(chunk) => match orchestrator.submit_chunk(chunk).await {
            Ok(StreamProgress::Incomplete { received, total }) => {
                DispatchReport::Buffered { received, total }
            }
            Ok(StreamProgress::Opened(AcquisitionResult::Success { file_name, .. })) => {
                DispatchReport::Opened { file_name }
            }
            Ok(StreamProgress::Opened(other)) => DispatchReport::Failed {
                code: "internal".to_string(),
                message: format!("unexpected stream result: {:?}", other),
            },
            Err(e) => {
                tracing::error!(error = %e, "error rendering office document");
                DispatchReport::failed(&e)
            }
        },
        ChannelMessage::CloseEditor => match orchestrator.close_channel().await {
            Ok(()) => DispatchReport::Closed,
            Err(e) => {
                tracing::error!(error = %e, "error closing editor");
                DispatchReport::failed(&e)
            }
        },
    }
}
