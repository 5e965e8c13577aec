// Inbound webhook payloads
// https://developers.line.biz/en/reference/messaging-api/#webhook-event-objects
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ReplyToken, UserId};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload contains no events")]
    NoEvents,

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, PartialEq)]
pub enum InboundEvent {
    Follow {
        user_id: UserId,
        reply_token: ReplyToken,
    },
    Message {
        user_id: UserId,
        reply_token: ReplyToken,
        content: MessageContent,
    },
    /// Any other event type (unfollow, postback, join, ...).
    Unsupported { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    /// Stickers, images, audio and so on; carries the platform's type name.
    Other(String),
}

impl InboundEvent {
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::Follow { .. } => "follow",
            InboundEvent::Message { .. } => "message",
            InboundEvent::Unsupported { kind } => kind,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    source: Option<RawSource>,
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Parse a webhook body. The platform may batch events; only the first one
/// is handled.
pub fn parse_webhook(body: &[u8]) -> Result<InboundEvent, WebhookError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let event = envelope
        .events
        .into_iter()
        .next()
        .ok_or(WebhookError::NoEvents)?;

    if event.kind != "follow" && event.kind != "message" {
        return Ok(InboundEvent::Unsupported { kind: event.kind });
    }

    let user_id = event
        .source
        .and_then(|s| s.user_id)
        .map(UserId::new)
        .ok_or(WebhookError::MissingField("source.userId"))?;
    let reply_token = event
        .reply_token
        .map(ReplyToken::new)
        .ok_or(WebhookError::MissingField("replyToken"))?;

    if event.kind == "follow" {
        return Ok(InboundEvent::Follow {
            user_id,
            reply_token,
        });
    }

    let message = event.message.ok_or(WebhookError::MissingField("message"))?;
    let content = if message.kind == "text" {
        MessageContent::Text(
            message
                .text
                .ok_or(WebhookError::MissingField("message.text"))?,
        )
    } else {
        MessageContent::Other(message.kind)
    };

    Ok(InboundEvent::Message {
        user_id,
        reply_token,
        content,
    })
}
