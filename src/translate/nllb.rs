use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::generation::{last_step_logits, GenerationConfig};
use super::interface::Translator;
use super::languages::LanguagePair;
use super::tokenizer::NllbTokenizer;
use crate::config::ModelConfig;

const TOKENIZER_FILE: &str = "tokenizer.json";
const ENCODER_FILE: &str = "encoder_model.onnx";
const DECODER_FILE: &str = "decoder_model.onnx";

/// Encoder side of the decoder inputs for one source sentence. Built once and
/// passed by reference at every decoder step.
struct EncoderOutput {
    /// `[batch, source_len, hidden]`
    hidden_states: Tensor<f32>,
    /// `[batch, source_len]`
    attention_mask: Tensor<i64>,
}

/// NLLB encoder/decoder exported to ONNX, plus its tokenizer.
///
/// Sessions are only ever run for inference. `Session::run` needs exclusive
/// access, hence one mutex per session.
pub struct NllbModel {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: NllbTokenizer,
    generation: GenerationConfig,
    src_lang_id: i64,
    tgt_lang_id: i64,
    max_input_tokens: usize,
}

impl NllbModel {
    /// Load tokenizer and sessions from `config.model_dir`.
    ///
    /// # Files Required
    /// - `tokenizer.json`
    /// - `encoder_model.onnx` (`input_ids`, `attention_mask` -> `last_hidden_state`)
    /// - `decoder_model.onnx` (`encoder_attention_mask`, `input_ids`, `encoder_hidden_states` -> `logits`)
    /// - `generation_config.json` / `config.json` (optional)
    pub fn load(config: &ModelConfig, pair: &LanguagePair) -> Result<Self> {
        let model_dir = config.model_dir.as_path();
        if !model_dir.is_dir() {
            return Err(anyhow!(
                "model directory for {} not found at {}",
                config.model_id,
                model_dir.display()
            ));
        }

        let tokenizer = NllbTokenizer::from_file(&model_dir.join(TOKENIZER_FILE))?;
        let src_lang_id = tokenizer.token_id(&pair.source.token)?;
        let tgt_lang_id = tokenizer.token_id(&pair.target.token)?;

        let mut generation = GenerationConfig::from_model_dir(model_dir)?;
        if let Some(max_length) = config.max_length {
            generation.max_length = max_length;
        }

        let encoder_path = model_dir.join(ENCODER_FILE);
        let decoder_path = model_dir.join(DECODER_FILE);
        for path in [&encoder_path, &decoder_path] {
            if !path.exists() {
                return Err(anyhow!("ONNX model not found at {}", path.display()));
            }
        }

        ort::init()
            .with_name("indic-mt")
            .commit()
            .map_err(|e| anyhow!("failed to init ONNX Runtime: {e}"))?;

        let encoder = build_session(&encoder_path, config.intra_threads)?;
        info!("Encoder loaded: {}", encoder_path.display());
        let decoder = build_session(&decoder_path, config.intra_threads)?;
        info!("Decoder loaded: {}", decoder_path.display());

        debug!(
            "{} -> {} uses token ids {} -> {}, {:?}",
            pair.source.token, pair.target.token, src_lang_id, tgt_lang_id, generation
        );

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            tokenizer,
            generation,
            src_lang_id,
            tgt_lang_id,
            max_input_tokens: config.max_input_tokens,
        })
    }

    /// Blocking translation of one sentence.
    pub fn translate(&self, text: &str) -> Result<String> {
        let input_ids = self
            .tokenizer
            .encode(text, self.src_lang_id, self.max_input_tokens)?;
        let encoded = self.run_encoder(&input_ids)?;

        let generated = self
            .generation
            .greedy_decode(self.tgt_lang_id, |ids| self.next_logits(&encoded, ids))?;
        debug!(
            input_tokens = input_ids.len(),
            output_tokens = generated.len(),
            "generation finished"
        );

        self.tokenizer.decode(&generated)
    }

    fn run_encoder(&self, input_ids: &[i64]) -> Result<EncoderOutput> {
        let seq_len = input_ids.len();
        let attention_mask = vec![1i64; seq_len];

        let ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids.to_vec()))
            .map_err(|e| anyhow!("failed to build input_ids tensor: {e}"))?;
        let attention_mask = Tensor::from_array(([1usize, seq_len], attention_mask))
            .map_err(|e| anyhow!("failed to build attention_mask tensor: {e}"))?;

        let mut session = self
            .encoder
            .lock()
            .map_err(|_| anyhow!("encoder session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => &attention_mask
            ])
            .map_err(|e| anyhow!("failed to run encoder: {e}"))?;

        let hidden = outputs
            .get("last_hidden_state")
            .ok_or_else(|| anyhow!("encoder produced no last_hidden_state"))?;
        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("failed to extract encoder hidden states: {e}"))?;
        if shape.len() != 3 {
            return Err(anyhow!("unexpected encoder output rank: {:?}", shape));
        }

        let dims = [shape[0] as usize, shape[1] as usize, shape[2] as usize];
        let hidden_states = Tensor::from_array((dims, data.to_vec()))
            .map_err(|e| anyhow!("failed to build encoder_hidden_states tensor: {e}"))?;

        Ok(EncoderOutput {
            hidden_states,
            attention_mask,
        })
    }

    /// Logits for the position after `decoder_ids`. Runs the full decoder
    /// sequence every step; no past key/values are kept.
    fn next_logits(&self, encoded: &EncoderOutput, decoder_ids: &[i64]) -> Result<Vec<f32>> {
        let tgt_len = decoder_ids.len();
        let ids_tensor = Tensor::from_array(([1usize, tgt_len], decoder_ids.to_vec()))
            .map_err(|e| anyhow!("failed to build decoder input_ids tensor: {e}"))?;

        let mut session = self
            .decoder
            .lock()
            .map_err(|_| anyhow!("decoder session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "encoder_attention_mask" => &encoded.attention_mask,
                "input_ids" => ids_tensor,
                "encoder_hidden_states" => &encoded.hidden_states
            ])
            .map_err(|e| anyhow!("failed to run decoder: {e}"))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| anyhow!("decoder produced no logits"))?;
        let (shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("failed to extract logits: {e}"))?;
        Ok(last_step_logits(shape, data)?.to_vec())
    }
}

fn build_session(path: &Path, threads: usize) -> Result<Session> {
    Session::builder()
        .map_err(|e| anyhow!("failed to create session builder: {e}"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| anyhow!("failed to set optimization level: {e}"))?
        .with_intra_threads(threads)
        .map_err(|e| anyhow!("failed to set intra-op threads: {e}"))?
        .with_inter_threads(1)
        .map_err(|e| anyhow!("failed to set inter-op threads: {e}"))?
        .commit_from_file(path)
        .map_err(|e| anyhow!("failed to load ONNX model from {}: {e}", path.display()))
}

/// [`Translator`] backed by a local NLLB export. Inference runs on the
/// blocking thread pool.
pub struct NllbTranslator {
    model_id: String,
    pair: LanguagePair,
    model: Arc<NllbModel>,
}

impl NllbTranslator {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let pair = config.language_pair()?;
        let model = NllbModel::load(config, &pair)
            .with_context(|| format!("failed to load {}", config.model_id))?;
        Ok(Self {
            model_id: config.model_id.clone(),
            pair,
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl Translator for NllbTranslator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn language_pair(&self) -> &LanguagePair {
        &self.pair
    }

    async fn translate(&self, text: &str) -> Result<String> {
        let model = Arc::clone(&self.model);
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || model.translate(&text))
            .await
            .context("translation task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::tokenizer::tests::TINY_TOKENIZER_JSON;
    use std::path::PathBuf;

    fn test_model_config() -> Option<ModelConfig> {
        let model_dir = std::env::var("INDIC_MT_TEST_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| ModelConfig::default().model_dir);
        if !model_dir.exists() {
            eprintln!("Skipping test: model directory not found at {}", model_dir.display());
            return None;
        }
        Some(ModelConfig {
            model_dir,
            ..Default::default()
        })
    }

    fn is_telugu(c: char) -> bool {
        ('\u{0C00}'..='\u{0C7F}').contains(&c)
    }

    #[test]
    fn missing_model_dir_is_fatal() {
        let config = ModelConfig {
            model_dir: PathBuf::from("/nonexistent/nllb"),
            ..Default::default()
        };
        let err = NllbTranslator::load(&config).err().unwrap();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn missing_onnx_files_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), TINY_TOKENIZER_JSON).unwrap();
        let config = ModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = NllbTranslator::load(&config).err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("ONNX model not found"), "{message}");
        assert!(message.contains(ENCODER_FILE), "{message}");

        // Encoder present, decoder still missing.
        std::fs::write(dir.path().join(ENCODER_FILE), b"").unwrap();
        let err = NllbTranslator::load(&config).err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("ONNX model not found"), "{message}");
        assert!(message.contains(DECODER_FILE), "{message}");
    }

    #[tokio::test]
    async fn translates_hello_into_telugu_script() {
        let Some(config) = test_model_config() else {
            return;
        };
        let translator = NllbTranslator::load(&config).unwrap();

        let out = translator.translate("Hello").await.unwrap();
        assert!(!out.is_empty());
        assert!(out.chars().any(is_telugu), "not Telugu: {out}");
    }
}
