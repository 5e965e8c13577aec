use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::TranslationConfig;
use crate::http::{self, HttpError};

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Translation returned no text")]
    Empty,
}

/// Normalizes user input into the language the generator expects.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslationError>;

    /// False when `translate` returns its input unchanged.
    fn is_active(&self) -> bool {
        true
    }
}

/// Used when no translation key is configured.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Google Cloud Translation (v2 REST).
pub struct GoogleTranslator {
    http: HttpClient,
    url: String,
    source: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Self {
        // The v2 API takes the key as a query parameter.
        let separator = if config.url.contains('?') { '&' } else { '?' };
        Self {
            http: http::create_http_client(),
            url: format!("{}{}key={}", config.url, separator, config.api_key),
            source: config.source.clone(),
            target: config.target.clone(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            q: text,
            source: &self.source,
            target: &self.target,
            format: "text",
        };
        let response: TranslateResponse =
            http::post_json_for(&self.http, &self.url, None, &request).await?;
        response
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or(TranslationError::Empty)
    }
}

/// Pick the translator for this configuration.
pub fn from_config(config: &TranslationConfig) -> Arc<dyn Translator> {
    if config.api_key.trim().is_empty() {
        tracing::info!("Translation disabled, phrases are sent as typed");
        Arc::new(PassthroughTranslator)
    } else {
        Arc::new(GoogleTranslator::new(config))
    }
}
