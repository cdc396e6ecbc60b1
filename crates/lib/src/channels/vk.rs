//! VK channel: answer `message_new` callbacks via the `messages.send` API method.

use crate::channels::delivery::ReplyDeliveryRecord;
use crate::channels::inbound::EventObject;
use crate::channels::notifier::{MessageNotifier, NotifyError};
use crate::config::{DeliveryConfig, PlatformCredentials};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;

const SEND_METHOD: &str = "messages.send";
const REPLY_PREFIX: &str = "Вы сказали: ";
const EMPTY_REPLY: &str = "Вы ничего не сказали";

/// Reply body for an inbound text: echo with a prefix, or a fixed line when the text is blank.
pub fn reply_text(text: &str) -> String {
    if text.trim().is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        format!("{}{}", REPLY_PREFIX, text)
    }
}

/// Fresh `random_id` for one send, uniform over 1..=i32::MAX.
pub fn random_id() -> i32 {
    rand::thread_rng().gen_range(1..=i32::MAX)
}

/// A fully built messages.send request.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    pub peer_id: i64,
    pub message: String,
    pub random_id: i32,
    pub url: Url,
}

impl OutboundReply {
    /// Build the request URL `{endpoint}/messages.send?access_token=..&v=..&peer_id=..&message=..&random_id=..`.
    pub fn build(
        credentials: &PlatformCredentials,
        peer_id: i64,
        message: &str,
        random_id: i32,
    ) -> Result<Self, NotifyError> {
        let base = format!(
            "{}/{}",
            credentials.endpoint.trim_end_matches('/'),
            SEND_METHOD
        );
        let peer = peer_id.to_string();
        let random = random_id.to_string();
        let url = Url::parse_with_params(
            &base,
            &[
                ("access_token", credentials.access_token.as_str()),
                ("v", credentials.api_version.as_str()),
                ("peer_id", peer.as_str()),
                ("message", message),
                ("random_id", random.as_str()),
            ],
        )
        .map_err(|e| NotifyError::InvalidEndpoint(format!("{}: {}", base, e)))?;
        Ok(Self {
            peer_id,
            message: message.to_string(),
            random_id,
            url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    response: i64,
}

/// Integer `response` field of a messages.send body, if present.
fn response_code(body: &str) -> Option<i64> {
    serde_json::from_str::<SendResponse>(body)
        .ok()
        .map(|r| r.response)
}

/// Sends replies through the VK API with a fixed-delay retry and records response codes per sender.
pub struct VkNotifier {
    credentials: PlatformCredentials,
    client: reqwest::Client,
    retry: RetryPolicy,
    deliveries: ReplyDeliveryRecord,
}

impl VkNotifier {
    pub fn new(
        credentials: PlatformCredentials,
        delivery: &DeliveryConfig,
    ) -> Result<Self, NotifyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = delivery.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            credentials,
            client: builder.build()?,
            retry: RetryPolicy::new(delivery.max_attempts, delivery.retry_delay()),
            deliveries: ReplyDeliveryRecord::new(),
        })
    }

    /// Response codes recorded so far (shared with clones of the record).
    pub fn deliveries(&self) -> &ReplyDeliveryRecord {
        &self.deliveries
    }

    /// Send `message` to `peer_id` on behalf of `from_id`, retrying every failure. Returns the response code.
    pub async fn send_reply(
        &self,
        from_id: i64,
        peer_id: i64,
        message: &str,
    ) -> Result<i64, NotifyError> {
        let this = self;
        self.retry
            .run(SEND_METHOD, move |attempt| {
                this.send_once(from_id, peer_id, message, attempt)
            })
            .await
    }

    async fn send_once(
        &self,
        from_id: i64,
        peer_id: i64,
        message: &str,
        attempt: u32,
    ) -> Result<i64, NotifyError> {
        let reply = OutboundReply::build(&self.credentials, peer_id, message, random_id())?;
        log::debug!(
            "{} attempt {}: peer_id={} random_id={}",
            SEND_METHOD,
            attempt,
            reply.peer_id,
            reply.random_id
        );
        let res = self.client.get(reply.url).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            log::error!("error during sending message: {} {}", status, body);
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let Some(code) = response_code(&body) else {
            log::error!("messages.send body has no integer response: {}", body);
            return Err(NotifyError::MalformedResponse(body));
        };
        if !self.deliveries.record_if_new(from_id, code).await {
            log::error!("random id should be unique, sender {} got {} again: {}", from_id, code, body);
            return Err(NotifyError::DuplicateResponseCode {
                from_id,
                code,
                body,
            });
        }
        log::info!("{}", body);
        Ok(code)
    }
}

#[async_trait]
impl MessageNotifier for VkNotifier {
    async fn handle_new_message(&self, object: &EventObject) -> Result<(), NotifyError> {
        let peer_id = object.destination_id().ok_or(NotifyError::NoDestination)?;
        let message = reply_text(&object.text);
        self.send_reply(object.from_id, peer_id, &message).await?;
        Ok(())
    }
}
