//! VK channel: inbound callback events and outbound replies.
//!
//! Inbound events are parsed into [`CallbackEvent`]; `message_new` events are handed to a
//! [`MessageNotifier`], implemented for VK by [`VkNotifier`].

mod delivery;
mod inbound;
mod notifier;
mod vk;

pub use delivery::ReplyDeliveryRecord;
pub use inbound::{CallbackEvent, EventObject, InboundEvent, MalformedEvent};
pub use notifier::{MessageNotifier, NotifyError};
pub use vk::{random_id, reply_text, OutboundReply, VkNotifier};
