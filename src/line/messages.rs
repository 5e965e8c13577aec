// Outbound reply payloads
// https://developers.line.biz/en/reference/messaging-api/#send-reply-message
use serde::Serialize;

use crate::domain::QuestionExample;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [Message],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text {
        text: String,
        #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_image_url: String,
        #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
}

impl Message {
    pub fn text(text: impl Into<String>, suggestions: &[QuestionExample]) -> Self {
        Message::Text {
            text: text.into(),
            quick_reply: QuickReply::from_suggestions(suggestions),
        }
    }

    /// The generated image doubles as its own preview.
    pub fn image(url: impl Into<String>, suggestions: &[QuestionExample]) -> Self {
        let url = url.into();
        Message::Image {
            preview_image_url: url.clone(),
            original_content_url: url,
            quick_reply: QuickReply::from_suggestions(suggestions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

impl QuickReply {
    /// No items means no quick reply at all; the platform rejects an empty list.
    pub fn from_suggestions(suggestions: &[QuestionExample]) -> Option<Self> {
        if suggestions.is_empty() {
            return None;
        }
        Some(Self {
            items: suggestions
                .iter()
                .map(|s| QuickReplyItem {
                    kind: "action",
                    action: MessageAction {
                        kind: "message",
                        label: s.label.clone(),
                        text: s.text.clone(),
                    },
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: MessageAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub text: String,
}
