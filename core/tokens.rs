use crate::error::{AppError, Result};
use log;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Counts tokens in the final assembled text.
pub trait TokenEstimator {
    fn estimate(&self, text: &str, model_name: &str) -> Result<usize>;
}

/// Estimator backed by the BPE tables bundled with `tiktoken-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TikTokenEstimator;

impl TikTokenEstimator {
    pub fn new() -> Self {
        Self
    }

    fn bpe_for(model_name: &str) -> Result<CoreBPE> {
        match get_bpe_from_model(model_name) {
            Ok(bpe) => Ok(bpe),
            Err(e) => {
                log::debug!(
                    "No tokenizer registered for model '{}' ({}), using cl100k_base",
                    model_name,
                    e
                );
                cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))
            }
        }
    }
}

impl TokenEstimator for TikTokenEstimator {
    fn estimate(&self, text: &str, model_name: &str) -> Result<usize> {
        let bpe = Self::bpe_for(model_name)?;
        let count = bpe.encode_with_special_tokens(text).len();
        log::debug!("Estimated {} tokens for model '{}'", count, model_name);
        Ok(count)
    }
}
