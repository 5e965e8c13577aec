use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{self, HttpError};
use crate::translation::TranslationError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Generation returned no images")]
    Empty,

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),
}

/// Text-to-image collaborator. Implementations never panic on bad upstream
/// responses; every failure is a `GenerationError`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns a locator (URL) for the first generated image.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl GenerationResponse {
    fn first_url(self) -> Result<String, GenerationError> {
        self.data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.is_empty())
            .ok_or(GenerationError::Empty)
    }
}

/// OpenAI images endpoint client.
pub struct OpenAiImageClient {
    http: HttpClient,
    url: String,
    api_key: String,
}

impl OpenAiImageClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: http::create_http_client(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::info!("requesting image generation");
        let response: GenerationResponse = http::post_json_for(
            &self.http,
            &self.url,
            Some(self.api_key.as_str()),
            &GenerationRequest { prompt },
        )
        .await?;
        let url = response.first_url()?;
        tracing::info!("image generated");
        Ok(url)
    }
}
