use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Decoding settings read from the model directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_decoder_start_token_id")]
    pub decoder_start_token_id: i64,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: i64,
    /// Upper bound on the decoder sequence, start token included.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_decoder_start_token_id() -> i64 {
    2
}

fn default_eos_token_id() -> i64 {
    2
}

fn default_max_length() -> usize {
    200
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            decoder_start_token_id: default_decoder_start_token_id(),
            eos_token_id: default_eos_token_id(),
            max_length: default_max_length(),
        }
    }
}

impl GenerationConfig {
    /// Reads `generation_config.json`, then `config.json`, falling back to
    /// the NLLB defaults when neither exists.
    pub fn from_model_dir(model_dir: &Path) -> Result<Self> {
        for name in ["generation_config.json", "config.json"] {
            let path = model_dir.join(name);
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            debug!("Generation settings from {}: {:?}", path.display(), config);
            return Ok(config);
        }
        Ok(Self::default())
    }

    /// Greedy decoding with a forced first token.
    ///
    /// The sequence starts as `[decoder_start_token_id, forced_bos]`. `next_logits`
    /// receives the sequence so far and returns the vocabulary logits for the
    /// next position. Returns the full sequence, including the start token, the
    /// forced token and the end token when one was produced.
    pub fn greedy_decode<F>(&self, forced_bos: i64, mut next_logits: F) -> Result<Vec<i64>>
    where
        F: FnMut(&[i64]) -> Result<Vec<f32>>,
    {
        let mut ids = vec![self.decoder_start_token_id];
        if self.max_length > 1 {
            ids.push(forced_bos);
        }

        while ids.len() < self.max_length {
            let logits = next_logits(&ids)?;
            let next = argmax(&logits).ok_or_else(|| anyhow!("decoder returned empty logits"))?;
            ids.push(next);
            if next == self.eos_token_id {
                break;
            }
        }

        Ok(ids)
    }
}

/// Logits of the final position of a `[batch, steps, vocab]` decoder output.
pub fn last_step_logits<'a>(shape: &[i64], data: &'a [f32]) -> Result<&'a [f32]> {
    if shape.len() != 3 {
        return Err(anyhow!("unexpected logits rank: {:?}", shape));
    }
    let steps = usize::try_from(shape[1]).unwrap_or(0);
    let vocab = usize::try_from(shape[2]).unwrap_or(0);
    if steps == 0 || vocab == 0 || data.len() < steps * vocab {
        return Err(anyhow!(
            "logits shape {:?} does not match {} values",
            shape,
            data.len()
        ));
    }
    Ok(&data[(steps - 1) * vocab..steps * vocab])
}

fn argmax(logits: &[f32]) -> Option<i64> {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx as i64)
}
