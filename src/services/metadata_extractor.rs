//! Title/chapter extraction for a series URL.
//!
//! The remote extractor is best effort: any failure is turned into a
//! [`ExtractionOutcome::Manual`] so the caller can fall back to manual entry,
//! seeded with whatever chapter number the URL itself reveals.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::types::errors::MetadataError;
use crate::types::settings::MetadataSettings;

/// What an extractor found for a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: String,
    pub chapter: f64,
}

/// Result of [`extract_or_manual`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ExtractionOutcome {
    Filled(ExtractedMetadata),
    /// Extraction failed; the user fills the form in by hand.
    #[serde(rename_all = "camelCase")]
    Manual {
        reason: String,
        chapter_guess: Option<f64>,
    },
}

/// Extracts series metadata from a URL.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedMetadata, MetadataError>;
}

/// Extractor backed by an HTTP endpoint taking `{"url": ...}` and answering
/// `{"title": ..., "chapter": ...}` or `{"error": ...}`.
pub struct HttpMetadataExtractor {
    client: Client,
    endpoint: Option<String>,
}

impl HttpMetadataExtractor {
    /// # Errors
    /// Returns [`MetadataError::Request`] if the HTTP client cannot be built.
    pub fn new(settings: &MetadataSettings) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| MetadataError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone().filter(|e| !e.trim().is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[async_trait]
impl MetadataExtractor for HttpMetadataExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedMetadata, MetadataError> {
        let endpoint = self.endpoint.as_deref().ok_or(MetadataError::NotConfigured)?;
        debug!(%url, "requesting metadata");

        let response = self
            .client
            .post(endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(MetadataError::Request(message));
        }

        let metadata: ExtractedMetadata = serde_json::from_str(&body)
            .map_err(|e| MetadataError::InvalidResponse(e.to_string()))?;
        if metadata.title.trim().is_empty() {
            return Err(MetadataError::InvalidResponse("empty title".to_string()));
        }
        if !metadata.chapter.is_finite() || metadata.chapter < 0.0 {
            return Err(MetadataError::InvalidResponse(format!(
                "chapter {} is out of range",
                metadata.chapter
            )));
        }
        Ok(metadata)
    }
}

static CHAPTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:[/\-_]|chapter[-_]?|ch[-_.]?)(\d+(?:\.\d+)?)(?:[/?#\-_]|$)")
        .expect("CHAPTER_REGEX should compile - this is a bug")
});

/// Guesses the chapter number from a URL such as `.../chapter-123/`.
/// The last number-like path segment wins.
pub fn guess_chapter_from_url(url: &str) -> Option<f64> {
    CHAPTER_REGEX
        .captures_iter(url)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .last()
}

/// Runs `extractor`, turning every failure into a manual-entry outcome.
pub async fn extract_or_manual(extractor: &dyn MetadataExtractor, url: &str) -> ExtractionOutcome {
    match extractor.extract(url).await {
        Ok(metadata) => ExtractionOutcome::Filled(metadata),
        Err(e) => {
            warn!(%url, error = %e, "metadata extraction failed");
            ExtractionOutcome::Manual {
                reason: e.to_string(),
                chapter_guess: guess_chapter_from_url(url),
            }
        }
    }
}
