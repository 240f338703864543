use std::path::Path;

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

const EOS_TOKEN: &str = "</s>";

/// NLLB tokenizer wrapper.
///
/// Source sequences are framed as `[src_lang] tokens.. </s>`; the language
/// token is chosen per call instead of relying on the post-processor baked
/// into `tokenizer.json`.
pub struct NllbTokenizer {
    inner: Tokenizer,
    eos_token_id: i64,
}

impl NllbTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("tokenizer.json not found at {}", path.display()));
        }
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", path.display()))?;
        Self::new(inner)
    }

    pub fn new(inner: Tokenizer) -> Result<Self> {
        let eos_token_id = inner
            .token_to_id(EOS_TOKEN)
            .ok_or_else(|| anyhow!("tokenizer has no {} token", EOS_TOKEN))?;
        Ok(Self {
            inner,
            eos_token_id: eos_token_id as i64,
        })
    }

    /// Id of a language token such as `tel_Telu`.
    pub fn token_id(&self, token: &str) -> Result<i64> {
        self.inner
            .token_to_id(token)
            .map(|id| id as i64)
            .ok_or_else(|| anyhow!("token {} is not in the model vocabulary", token))
    }

    /// Encode `text` for the encoder. The result never exceeds `max_tokens`;
    /// longer inputs lose their tail but keep the language and end tokens.
    pub fn encode(&self, text: &str, src_lang_id: i64, max_tokens: usize) -> Result<Vec<i64>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow!("failed to encode text: {e}"))?;

        let budget = max_tokens.saturating_sub(2);
        let mut ids = Vec::with_capacity(encoding.get_ids().len().min(budget) + 2);
        ids.push(src_lang_id);
        ids.extend(encoding.get_ids().iter().take(budget).map(|&id| id as i64));
        ids.push(self.eos_token_id);
        Ok(ids)
    }

    /// Decode generated ids, dropping special tokens (language codes, `</s>`, padding).
    pub fn decode(&self, ids: &[i64]) -> Result<String> {
        let ids: Vec<u32> = ids
            .iter()
            .filter(|&&id| id >= 0)
            .map(|&id| id as u32)
            .collect();
        let text = self
            .inner
            .decode(&ids, true)
            .map_err(|e| anyhow!("failed to decode ids: {e}"))?;
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    /// Word-level stand-in with NLLB's special token layout.
    pub(crate) const TINY_TOKENIZER_JSON: &str = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 2, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 3, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 8, "content": "eng_Latn", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 9, "content": "tel_Telu", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {
                    "<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3,
                    "hello": 4, "world": 5, "నమస్కారం": 6, "ప్రపంచం": 7,
                    "eng_Latn": 8, "tel_Telu": 9
                },
                "unk_token": "<unk>"
            }
        }"#;

    fn tiny_tokenizer() -> NllbTokenizer {
        NllbTokenizer::new(Tokenizer::from_str(TINY_TOKENIZER_JSON).unwrap()).unwrap()
    }

    #[test]
    fn frames_source_with_language_and_eos() {
        let tok = tiny_tokenizer();
        let src = tok.token_id("eng_Latn").unwrap();
        let ids = tok.encode("hello world", src, 1024).unwrap();
        assert_eq!(ids, vec![8, 4, 5, 2]);
    }

    #[test]
    fn truncates_but_keeps_frame() {
        let tok = tiny_tokenizer();
        let ids = tok.encode("hello world hello world", 8, 4).unwrap();
        assert_eq!(ids, vec![8, 4, 5, 2]);
    }

    #[test]
    fn decode_skips_special_tokens() {
        let tok = tiny_tokenizer();
        let text = tok.decode(&[2, 9, 6, 7, 2]).unwrap();
        assert_eq!(text, "నమస్కారం ప్రపంచం");
    }

    #[test]
    fn decode_keeps_text_as_produced() {
        let tok = tiny_tokenizer();
        assert_eq!(tok.decode(&[2, 9, 2]).unwrap(), "");
        assert_eq!(tok.decode(&[6]).unwrap(), "నమస్కారం");
    }

    #[test]
    fn unknown_language_token() {
        let tok = tiny_tokenizer();
        assert!(tok.token_id("hin_Deva").is_err());
        assert_eq!(tok.token_id("tel_Telu").unwrap(), 9);
    }
}
