use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::interface::Translator;
use super::nllb::NllbTranslator;
use crate::config::ModelConfig;

/// Builds the process-wide translator at startup.
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Load the configured model. Any failure here should abort startup.
    pub fn create_translator(model_config: &ModelConfig) -> Result<Arc<dyn Translator>> {
        info!(
            "Initializing translation model: {} ({} -> {}, {} thread(s))",
            model_config.model_id,
            model_config.source_lang,
            model_config.target_lang,
            model_config.intra_threads
        );

        let translator = NllbTranslator::load(model_config)?;
        Ok(Arc::new(translator))
    }
}
