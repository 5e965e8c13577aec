//! Shared outbound HTTP plumbing for the platform and service clients.

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Image generation regularly takes ten seconds or more.
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
}

#[must_use]
pub fn create_http_client() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// POST `body` as JSON with a bearer credential and return the raw success
/// response. Non-2xx statuses become `HttpError::Api`.
pub async fn post_json<B: Serialize + ?Sized>(
    client: &HttpClient,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<reqwest::Response, HttpError> {
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(HttpError::Api {
            status: status.as_u16(),
            body: crate::text::truncate_utf16(&text, MAX_ERROR_BODY).to_string(),
        });
    }
    Ok(response)
}

/// `post_json` followed by decoding the response body.
pub async fn post_json_for<B, T>(
    client: &HttpClient,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<T, HttpError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = post_json(client, url, bearer, body).await?;
    Ok(response.json::<T>().await?)
}
