pub mod factory;
pub mod generation;
pub mod interface;
pub mod languages;
pub mod nllb;
pub mod tokenizer;

pub use factory::TranslatorFactory;
pub use interface::{TranslateRequest, TranslateResponse, Translator};
pub use languages::Language;
