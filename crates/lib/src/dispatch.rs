//! Callback dispatcher: classify an inbound event and produce the plain-text response body.
//!
//! `confirmation` echoes the configured token, `message_new` is handed to the notifier,
//! `message_reply` and unknown types are acknowledged without side effects.

use crate::channels::{CallbackEvent, InboundEvent, MalformedEvent, MessageNotifier, NotifyError};
use std::sync::Arc;

/// Body returned once an event has been handled.
pub const OK_REPLY: &str = "OK";
/// Body returned for event types this receiver does not handle.
pub const UNSUPPORTED_REPLY: &str = "Unsupported event";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed callback event: {0}")]
    Malformed(#[from] MalformedEvent),
    #[error("callback secret mismatch")]
    SecretMismatch,
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub struct Dispatcher {
    confirmation: String,
    secret: Option<String>,
    notifier: Arc<dyn MessageNotifier>,
}

impl Dispatcher {
    pub fn new(confirmation: impl Into<String>, notifier: Arc<dyn MessageNotifier>) -> Self {
        Self {
            confirmation: confirmation.into(),
            secret: None,
            notifier,
        }
    }

    /// Require every callback to carry this `secret`.
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret;
        self
    }

    /// Parse a raw callback body and dispatch it.
    pub async fn dispatch_body(&self, body: &[u8]) -> Result<String, DispatchError> {
        let callback = CallbackEvent::from_slice(body).map_err(|e| {
            log::error!("rejecting callback: {}", e);
            DispatchError::from(e)
        })?;
        self.dispatch(&callback).await
    }

    pub async fn dispatch(&self, callback: &CallbackEvent) -> Result<String, DispatchError> {
        if let Some(ref expected) = self.secret {
            if callback.secret.as_deref() != Some(expected.as_str()) {
                log::error!(
                    "rejecting {} event: secret mismatch (group {:?})",
                    callback.event.type_name(),
                    callback.group_id
                );
                return Err(DispatchError::SecretMismatch);
            }
        }
        match &callback.event {
            InboundEvent::Confirmation => {
                log::info!("confirmation");
                Ok(self.confirmation.clone())
            }
            InboundEvent::MessageNew(object) => {
                self.notifier.handle_new_message(object).await?;
                log::info!(
                    "message_new, {}",
                    object
                        .conversation_message_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                Ok(OK_REPLY.to_string())
            }
            InboundEvent::MessageReply(object) => {
                log::info!(
                    "message_reply: {}",
                    object
                        .as_ref()
                        .map(|o| o.to_string())
                        .unwrap_or_default()
                );
                Ok(OK_REPLY.to_string())
            }
            InboundEvent::Other(typ) => {
                log::info!("Unsupported event: {}", typ);
                Ok(UNSUPPORTED_REPLY.to_string())
            }
        }
    }
}
