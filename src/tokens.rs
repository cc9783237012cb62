//! Token counting for generated prompts (gpt-4o encoding)

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

use crate::error::{PromptError, Result};

static ENCODER: Lazy<std::result::Result<CoreBPE, String>> =
    Lazy::new(|| tiktoken_rs::o200k_base().map_err(|e| e.to_string()));

/// Number of tokens in `text`
pub fn count_tokens(text: &str) -> Result<usize> {
    let encoder = ENCODER
        .as_ref()
        .map_err(|e| PromptError::Tokenizer(e.clone()))?;
    Ok(encoder.encode_ordinary(text).len())
}
