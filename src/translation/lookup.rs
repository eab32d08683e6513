//! External translation lookup

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Translates one word between two languages
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, word: &str, from: &str, to: &str) -> Result<String>;
}

/// Translator backed by the public `translate_a/single` endpoint
pub struct HttpTranslator {
    client: Client,
    base_url: String,
}

impl HttpTranslator {
    /// Create a translator for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, word: &str, from: &str, to: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", from),
                ("tl", to),
                ("dt", "t"),
                ("q", word),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::ExternalService(format!(
                "translator returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await?;
        let translation = parse_response(&body)?;
        debug!("Translated {:?} ({} -> {}): {:?}", word, from, to, translation);
        Ok(translation)
    }
}

impl std::fmt::Debug for HttpTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTranslator")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Join the translated segments of a nested-array response
///
/// The body looks like `[[["hello", "hola", ...], ["world", "mundo", ...]], ...]`;
/// the first element of each segment is translated text.
pub fn parse_response(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| CacheError::ExternalService("unexpected translator response".to_string()))?;

    let translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translation.trim().is_empty() {
        return Err(CacheError::ExternalService(
            "translator returned an empty translation".to_string(),
        ));
    }
    Ok(translation)
}
