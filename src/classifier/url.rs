use super::LinearModel;
use crate::{
    confidence::{encode, Label, NO_VERDICT},
    tokenize::{tokenize_url, url_model_input},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores a link by its host and directory path alone.
pub struct UrlClassifier {
    model: Arc<dyn LinearModel>,
}

impl UrlClassifier {
    pub fn new(model: Arc<dyn LinearModel>) -> Self {
        Self { model }
    }

    pub fn classify_url(&self, url: &str) -> f64 {
        let input = url_model_input(&tokenize_url(url));
        debug!("classify_url url={url} tokens={input}");
        match self.model.predict(&input) {
            Ok((label, p)) => {
                info!("classify_url label={label} confidence={p:.2} url={url}");
                encode(Label::from_model_label(&label), p)
            }
            Err(e) => {
                warn!("url classifier failed for {url}: {e:#}");
                NO_VERDICT
            }
        }
    }
}
