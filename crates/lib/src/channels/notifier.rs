//! Notifier seam between the dispatcher and the outbound platform client.

use crate::channels::inbound::EventObject;
use async_trait::async_trait;

/// Failure of a single reply send (after the retry policy gave up, the last one surfaces).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Carries the error with its URL stripped; the URL holds the access token.
    #[error("messages.send request failed: {0}")]
    Request(reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),
    #[error("messages.send returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("messages.send returned no integer response: {0}")]
    MalformedResponse(String),
    #[error("response code {code} repeats the last one recorded for sender {from_id}: {body}")]
    DuplicateResponseCode { from_id: i64, code: i64, body: String },
    #[error("message_new object has no destination id")]
    NoDestination,
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Request(e.without_url())
    }
}

/// Handles `message_new` events by replying on the platform.
#[async_trait]
pub trait MessageNotifier: Send + Sync {
    async fn handle_new_message(&self, object: &EventObject) -> Result<(), NotifyError>;
}
