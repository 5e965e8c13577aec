pub mod client;
pub mod messages;
pub mod webhook;

pub use client::{LineReplyClient, ReplySender, TransportError};
pub use messages::Message;
pub use webhook::{parse_webhook, InboundEvent, MessageContent, WebhookError};
