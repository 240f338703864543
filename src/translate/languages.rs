use anyhow::{anyhow, Result};
use serde::Serialize;

/// Short language codes and the FLORES-200 tokens the NLLB vocabulary uses for them.
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "eng_Latn", "English"),
    ("te", "tel_Telu", "Telugu"),
    ("hi", "hin_Deva", "Hindi"),
    ("ta", "tam_Taml", "Tamil"),
    ("kn", "kan_Knda", "Kannada"),
    ("ml", "mal_Mlym", "Malayalam"),
    ("bn", "ben_Beng", "Bengali"),
    ("mr", "mar_Deva", "Marathi"),
    ("gu", "guj_Gujr", "Gujarati"),
    ("pa", "pan_Guru", "Punjabi"),
    ("ur", "urd_Arab", "Urdu"),
    ("es", "spa_Latn", "Spanish"),
    ("ar", "arb_Arab", "Arabic"),
    ("zh-Hans", "zho_Hans", "Chinese (Simplified)"),
    ("ja", "jpn_Jpan", "Japanese"),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    /// Token the model uses to mark this language, e.g. `tel_Telu`.
    #[serde(skip)]
    pub token: String,
}

impl Language {
    /// Accepts a short code (`te`), case-insensitively, or a raw FLORES-200
    /// code (`tel_Telu`).
    pub fn from_code(code: &str) -> Result<Self> {
        let code = code.trim();
        if let Some((short, token, name)) = LANGUAGES
            .iter()
            .find(|(short, token, _)| short.eq_ignore_ascii_case(code) || *token == code)
        {
            return Ok(Self {
                code: short.to_string(),
                name: name.to_string(),
                token: token.to_string(),
            });
        }

        if is_flores_code(code) {
            return Ok(Self {
                code: code.to_string(),
                name: code.to_string(),
                token: code.to_string(),
            });
        }

        Err(anyhow!("Unsupported language code: {}", code))
    }
}

/// `xxx_Yyyy`: three lowercase letters, underscore, four-letter script tag.
fn is_flores_code(code: &str) -> bool {
    match code.split_once('_') {
        Some((lang, script)) => {
            lang.len() == 3
                && lang.chars().all(|c| c.is_ascii_lowercase())
                && script.len() == 4
                && script.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                && script.chars().skip(1).all(|c| c.is_ascii_lowercase())
        }
        None => false,
    }
}

/// Source -> target direction served by this process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub source: Language,
    pub target: Language,
}

impl LanguagePair {
    pub fn from_codes(source: &str, target: &str) -> Result<Self> {
        let source = Language::from_code(source)?;
        let target = Language::from_code(target)?;
        if source == target {
            return Err(anyhow!("Source and target language are both {}", source.code));
        }
        Ok(Self { source, target })
    }

    /// Whether a request hint names this pair. Hints do not change routing.
    pub fn matches_hint(&self, source: &str, target: &str) -> bool {
        let same = |lang: &Language, hint: &str| {
            Language::from_code(hint).map(|l| l.token == lang.token).unwrap_or(false)
        };
        same(&self.source, source) && same(&self.target, target)
    }
}
