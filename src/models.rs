//! Payloads stored by the caches and their on-disk shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fold a newer write into an existing entry
///
/// Only non-empty fields of `newer` overwrite the current value.
pub trait Merge {
    fn merge(&mut self, newer: Self);
}

/// One item of a per-language "recently played" list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingEntry {
    pub partition_key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl NowPlayingEntry {
    pub fn new(
        partition_key: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            title: title.into(),
            description: None,
            thumbnail_url: None,
            url: url.into(),
            length: None,
            updated_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    /// Entries with a blank partition, url or title are rejected
    pub fn is_well_formed(&self) -> bool {
        !self.partition_key.trim().is_empty()
            && !self.url.trim().is_empty()
            && !self.title.trim().is_empty()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Merge for NowPlayingEntry {
    fn merge(&mut self, newer: Self) {
        if !newer.title.trim().is_empty() {
            self.title = newer.title;
        }
        if let Some(description) = non_empty(newer.description) {
            self.description = Some(description);
        }
        if let Some(thumbnail) = non_empty(newer.thumbnail_url) {
            self.thumbnail_url = Some(thumbnail);
        }
        if let Some(length) = non_empty(newer.length) {
            self.length = Some(length);
        }
        self.updated_at = newer.updated_at;
    }
}

/// A single video search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

/// Cached outcome of one search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSearch {
    pub query: String,
    pub results: Vec<VideoResult>,
}

/// A persisted translation of one word in one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub word: String,
    pub from: String,
    pub to: String,
    pub translation: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Trim and lowercase a key so logically equal keys collide
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
