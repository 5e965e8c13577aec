use async_trait::async_trait;
use reqwest::Client as HttpClient;
use thiserror::Error;

use crate::domain::ReplyToken;
use crate::http::{self, HttpError};
use crate::line::messages::{Message, ReplyRequest};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Reply failed: {0}")]
    Http(#[from] HttpError),
}

/// Sends the single reply a webhook event allows.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Consumes the token: a second reply to the same event cannot be written.
    async fn reply(&self, token: ReplyToken, messages: Vec<Message>)
        -> Result<(), TransportError>;
}

pub struct LineReplyClient {
    http: HttpClient,
    reply_url: String,
    access_token: String,
}

impl LineReplyClient {
    pub fn new(reply_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: http::create_http_client(),
            reply_url: reply_url.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl ReplySender for LineReplyClient {
    async fn reply(
        &self,
        token: ReplyToken,
        messages: Vec<Message>,
    ) -> Result<(), TransportError> {
        let request = ReplyRequest {
            reply_token: token.as_str(),
            messages: &messages,
        };
        http::post_json(
            &self.http,
            &self.reply_url,
            Some(self.access_token.as_str()),
            &request,
        )
        .await?;
        tracing::debug!("reply sent");
        Ok(())
    }
}
