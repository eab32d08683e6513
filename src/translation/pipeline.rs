//! Tiered translation resolution
//!
//! Tiers are tried fastest first and the first usable answer wins:
//!
//! 1. identity: same language or blank word, no cache touched
//! 2. exact in-memory cache
//! 3. persisted translation store, backfilling the exact cache
//! 4. external lookup under a timeout, written through to every tier
//!
//! Resolution never fails. When every tier misses the input word comes
//! back unchanged and no cache is mutated.

use crate::error::CacheError;
use crate::stores::{SeenWords, TranslationCache, TranslationStore};
use crate::translation::lookup::Translator;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which tier produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Identity,
    ExactCache,
    Store,
    External,
    /// Every tier failed; the input was echoed back
    Unresolved,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Identity => write!(f, "identity"),
            ResolutionSource::ExactCache => write!(f, "cache"),
            ResolutionSource::Store => write!(f, "store"),
            ResolutionSource::External => write!(f, "external"),
            ResolutionSource::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub source: ResolutionSource,
}

impl Resolution {
    fn new(text: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

pub struct TranslationPipeline {
    cache: Arc<TranslationCache>,
    store: Arc<TranslationStore>,
    seen: Arc<SeenWords>,
    lookup_timeout: Duration,
}

impl TranslationPipeline {
    pub fn new(
        cache: Arc<TranslationCache>,
        store: Arc<TranslationStore>,
        seen: Arc<SeenWords>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            seen,
            lookup_timeout,
        }
    }

    /// Translate `word`, falling back to the input on any failure
    pub async fn resolve(&self, word: &str, from: &str, to: &str, translator: &dyn Translator) -> String {
        self.resolve_detailed(word, from, to, translator).await.text
    }

    /// Translate `word` and report which tier answered
    pub async fn resolve_detailed(
        &self,
        word: &str,
        from: &str,
        to: &str,
        translator: &dyn Translator,
    ) -> Resolution {
        if word.trim().is_empty() || from.trim().eq_ignore_ascii_case(to.trim()) {
            return Resolution::new(word, ResolutionSource::Identity);
        }

        if let Some(hit) = self.cache.get_cached_translation(word, from, to).await {
            debug!("Exact cache hit for {:?} ({} -> {})", word, from, to);
            self.seen.record_seen(word).await;
            return Resolution::new(hit, ResolutionSource::ExactCache);
        }

        if let Some(stored) = self.store.lookup(word, from, to).await {
            debug!("Store hit for {:?} ({} -> {})", word, from, to);
            self.cache.set_cached_translation(word, from, to, &stored).await;
            self.seen.record_seen(word).await;
            return Resolution::new(stored, ResolutionSource::Store);
        }

        let outcome = match tokio::time::timeout(self.lookup_timeout, translator.translate(word, from, to)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                timeout_ms: self.lookup_timeout.as_millis() as u64,
                context: format!("translating {:?} ({} -> {})", word, from, to),
            }),
        };

        match outcome {
            Ok(translation) if !translation.trim().is_empty() => {
                self.store.save(word, from, to, &translation).await;
                self.cache.set_cached_translation(word, from, to, &translation).await;
                self.seen.record_seen(word).await;
                Resolution::new(translation, ResolutionSource::External)
            }
            Ok(_) => {
                warn!("Empty translation for {:?} ({} -> {})", word, from, to);
                Resolution::new(word, ResolutionSource::Unresolved)
            }
            Err(e) => {
                warn!("Translation lookup failed for {:?}: {}", word, e);
                Resolution::new(word, ResolutionSource::Unresolved)
            }
        }
    }
}
