// Event router: one inbound webhook in, at most one reply out
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{Config, MessagesConfig};
use crate::db::{BotStore, StoreError};
use crate::diagnostics::InvocationLog;
use crate::domain::{InteractionRecord, QuestionExample, ReplyToken, UserId};
use crate::generation::{GenerationError, ImageGenerator};
use crate::line::{parse_webhook, InboundEvent, Message, MessageContent, ReplySender};
use crate::line::{TransportError, WebhookError};
use crate::quota::UsageQuota;
use crate::sampler::{PhraseSampler, RandomSource, RngSource};
use crate::text::truncate_utf16;
use crate::translation::Translator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed webhook: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, PartialEq)]
pub enum ReplyAction {
    SendText {
        reply_token: ReplyToken,
        text: String,
        suggestions: Vec<QuestionExample>,
    },
    SendImage {
        reply_token: ReplyToken,
        image_url: String,
        suggestions: Vec<QuestionExample>,
    },
    NoReply,
}

impl ReplyAction {
    pub fn into_reply(self) -> Option<(ReplyToken, Message)> {
        match self {
            ReplyAction::SendText {
                reply_token,
                text,
                suggestions,
            } => Some((reply_token, Message::text(text, &suggestions))),
            ReplyAction::SendImage {
                reply_token,
                image_url,
                suggestions,
            } => Some((reply_token, Message::image(image_url, &suggestions))),
            ReplyAction::NoReply => None,
        }
    }

    pub fn suggestions(&self) -> &[QuestionExample] {
        match self {
            ReplyAction::SendText { suggestions, .. }
            | ReplyAction::SendImage { suggestions, .. } => suggestions,
            ReplyAction::NoReply => &[],
        }
    }
}

/// External services the pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn BotStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub translator: Arc<dyn Translator>,
    pub sender: Arc<dyn ReplySender>,
}

pub struct Pipeline {
    store: Arc<dyn BotStore>,
    generator: Arc<dyn ImageGenerator>,
    translator: Arc<dyn Translator>,
    sender: Arc<dyn ReplySender>,
    sampler: PhraseSampler,
    quota: UsageQuota,
    messages: MessagesConfig,
    max_input_length: usize,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl Pipeline {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        Self {
            store: collaborators.store,
            generator: collaborators.generator,
            translator: collaborators.translator,
            sender: collaborators.sender,
            sampler: PhraseSampler::from_config(config),
            quota: UsageQuota::new(
                config.limits.usage_limit,
                chrono::Duration::hours(config.limits.window_hours),
            ),
            messages: config.messages.clone(),
            max_input_length: config.limits.max_input_length,
            rng: Mutex::new(Box::new(RngSource::from_entropy())),
        }
    }

    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn store(&self) -> &dyn BotStore {
        self.store.as_ref()
    }

    /// Decide the reply for one webhook body without sending it.
    pub async fn handle_event(&self, raw: &[u8]) -> ReplyAction {
        self.handle_event_at(raw, Utc::now()).await
    }

    pub async fn handle_event_at(&self, raw: &[u8], now: DateTime<Utc>) -> ReplyAction {
        let mut log = InvocationLog::new();
        let outcome = AssertUnwindSafe(self.decide_or_recover(raw, now, &mut log))
            .catch_unwind()
            .await;
        let action = match outcome {
            Ok(action) => action,
            Err(panic) => {
                log.error(format!("pipeline panicked: {}", panic_message(panic.as_ref())));
                ReplyAction::NoReply
            }
        };
        log.flush(self.store.as_ref()).await;
        action
    }

    /// Full invocation: decide, send the reply, persist diagnostics.
    /// Never returns an error or unwinds; every failure, panics included,
    /// ends in the error log next to the lines recorded before it.
    pub async fn process(&self, raw: &[u8]) {
        self.process_at(raw, Utc::now()).await
    }

    pub async fn process_at(&self, raw: &[u8], now: DateTime<Utc>) {
        let mut log = InvocationLog::new();
        let outcome = AssertUnwindSafe(self.decide_and_dispatch(raw, now, &mut log))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            log.error(format!("pipeline panicked: {}", panic_message(panic.as_ref())));
        }
        log.flush(self.store.as_ref()).await;
    }

    async fn decide_and_dispatch(
        &self,
        raw: &[u8],
        now: DateTime<Utc>,
        log: &mut InvocationLog,
    ) {
        let action = self.decide_or_recover(raw, now, log).await;
        if let Err(e) = self.dispatch(action, log).await {
            log.error(format!("{e}"));
        }
    }

    async fn decide_or_recover(
        &self,
        raw: &[u8],
        now: DateTime<Utc>,
        log: &mut InvocationLog,
    ) -> ReplyAction {
        log.record("webhook received");
        match self.decide(raw, now, log).await {
            Ok(action) => action,
            Err(e) => {
                log.error(format!("{e}"));
                ReplyAction::NoReply
            }
        }
    }

    async fn decide(
        &self,
        raw: &[u8],
        now: DateTime<Utc>,
        log: &mut InvocationLog,
    ) -> Result<ReplyAction, PipelineError> {
        let event = parse_webhook(raw)?;
        log.record(format!("event.type: {}", event.kind()));

        match event {
            InboundEvent::Unsupported { .. } => {
                log.record("unsupported event, no reply");
                Ok(ReplyAction::NoReply)
            }
            InboundEvent::Follow {
                user_id,
                reply_token,
            } => {
                log.record(format!("userId: {user_id}"));
                Ok(self
                    .text_reply(reply_token, &self.messages.welcome, log)
                    .await)
            }
            InboundEvent::Message {
                user_id,
                reply_token,
                content,
            } => {
                log.record(format!("userId: {user_id}"));
                self.respond_to_message(user_id, reply_token, content, now, log)
                    .await
            }
        }
    }

    async fn respond_to_message(
        &self,
        user_id: UserId,
        reply_token: ReplyToken,
        content: MessageContent,
        now: DateTime<Utc>,
        log: &mut InvocationLog,
    ) -> Result<ReplyAction, PipelineError> {
        let text = match content {
            MessageContent::Text(text) => text,
            MessageContent::Other(kind) => {
                log.record(format!("message.type: {kind}, asking for text"));
                return Ok(self
                    .text_reply(reply_token, &self.messages.non_text, log)
                    .await);
            }
        };

        if self
            .quota
            .is_over_limit(self.store.as_ref(), &user_id, now)
            .await?
        {
            log.record(format!(
                "usage limit of {} reached for {user_id}",
                self.quota.limit()
            ));
            return Ok(self
                .text_reply(reply_token, &self.messages.quota_exceeded, log)
                .await);
        }

        let original_text = truncate_utf16(&text, self.max_input_length).to_string();
        log.record(format!("userMessage: {original_text}"));

        let (translated_text, image_url) = match self.generate(&original_text, log).await {
            Ok(generated) => generated,
            Err(e) => {
                log.error(format!("image generation failed: {e}"));
                return Ok(self
                    .text_reply(reply_token, &self.messages.generation_failed, log)
                    .await);
            }
        };

        self.store
            .append_interaction(&InteractionRecord {
                user_id,
                original_text,
                translated_text,
                image_url: image_url.clone(),
                created_at: now,
            })
            .await?;
        log.record("interaction saved");

        let suggestions = self.suggestions(log).await;
        Ok(ReplyAction::SendImage {
            reply_token,
            image_url,
            suggestions,
        })
    }

    /// Returns the translated prompt (when translation is active) and the
    /// image URL.
    async fn generate(
        &self,
        original: &str,
        log: &mut InvocationLog,
    ) -> Result<(Option<String>, String), GenerationError> {
        let translated = if self.translator.is_active() {
            let translated = self.translator.translate(original).await?;
            let translated = truncate_utf16(&translated, self.max_input_length).to_string();
            log.record(format!("translatedMessage: {translated}"));
            Some(translated)
        } else {
            None
        };

        let prompt = translated.as_deref().unwrap_or(original);
        let image_url = self.generator.generate(prompt).await?;
        log.record(format!("imageUrl: {image_url}"));
        Ok((translated, image_url))
    }

    async fn text_reply(
        &self,
        reply_token: ReplyToken,
        text: &str,
        log: &mut InvocationLog,
    ) -> ReplyAction {
        ReplyAction::SendText {
            reply_token,
            text: text.to_string(),
            suggestions: self.suggestions(log).await,
        }
    }

    /// A broken example table costs the suggestions, never the reply.
    async fn suggestions(&self, log: &mut InvocationLog) -> Vec<QuestionExample> {
        let table = match self.store.read_example_table(self.sampler.table_kind()).await {
            Ok(table) => table,
            Err(e) => {
                log.error(format!("failed to read example table: {e}"));
                return Vec::new();
            }
        };
        let mut rng = self.rng.lock().await;
        let suggestions = self.sampler.sample(&table, &mut **rng);
        log.record(format!("suggestions: {}", suggestions.len()));
        suggestions
    }

    async fn dispatch(
        &self,
        action: ReplyAction,
        log: &mut InvocationLog,
    ) -> Result<(), PipelineError> {
        let Some((token, message)) = action.into_reply() else {
            return Ok(());
        };
        self.sender.reply(token, vec![message]).await?;
        log.record("reply sent");
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
