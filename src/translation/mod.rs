//! Word translation: external lookup and the tiered resolution pipeline

pub mod lookup;
pub mod pipeline;

pub use lookup::{parse_response, HttpTranslator, Translator};
pub use pipeline::{Resolution, ResolutionSource, TranslationPipeline};
