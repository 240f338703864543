use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::languages::LanguagePair;

/// Body of `POST /translate`.
///
/// `source` and `target` are accepted for client compatibility; the direction
/// is fixed by the loaded model's [`LanguagePair`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub q: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_source() -> String {
    "en".to_string()
}

fn default_target() -> String {
    "te".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
}

/// A loaded translation model. Implementations are immutable after
/// construction and shared across request handlers.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Identifier of the underlying model, e.g. `facebook/nllb-200-distilled-600M`.
    fn model_id(&self) -> &str;

    fn language_pair(&self) -> &LanguagePair;

    /// Translate non-empty, already trimmed text.
    async fn translate(&self, text: &str) -> anyhow::Result<String>;
}
