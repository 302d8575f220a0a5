use super::Classifier;
use crate::confidence::{encode, Label, NO_VERDICT};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A bag-of-words model answering with its top label and that label's probability.
pub trait LinearModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<(String, f64)>;
}

/// fastText supervised model loaded in-process.
pub struct FastTextModel {
    inner: fasttext::FastText,
}

impl FastTextModel {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("fastText model not found: {}", path.display()));
        }
        info!("loading fastText model {}", path.display());
        let mut inner = fasttext::FastText::new();
        inner
            .load_model(&path.to_string_lossy())
            .map_err(|e| anyhow!("loading fastText model {}: {e}", path.display()))?;
        Ok(Self { inner })
    }
}

impl LinearModel for FastTextModel {
    fn predict(&self, text: &str) -> Result<(String, f64)> {
        let preds = self
            .inner
            .predict(text, 1, 0.0)
            .map_err(|e| anyhow!("fastText predict: {e}"))?;
        let top = preds
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("fastText returned no prediction"))?;
        Ok((top.label, f64::from(top.prob)))
    }
}

/// The fast text-signal ensemble member.
pub struct LinearClassifier {
    model: Arc<dyn LinearModel>,
}

impl LinearClassifier {
    pub fn new(model: Arc<dyn LinearModel>) -> Self {
        Self { model }
    }
}

impl Classifier for LinearClassifier {
    type Input = [String];

    fn classify(&self, tokens: &[String]) -> f64 {
        match self.model.predict(&tokens.join(" ")) {
            Ok((label, p)) => {
                debug!("linear label={label} confidence={p:.2}");
                encode(Label::from_model_label(&label), p)
            }
            Err(e) => {
                warn!("linear classifier failed: {e:#}");
                NO_VERDICT
            }
        }
    }
}
