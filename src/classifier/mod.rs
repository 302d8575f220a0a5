//! The three ensemble members plus the URL-only classifier.
//!
//! Every member reports a score on the [`crate::confidence`] scale and never
//! fails: backend trouble of any kind comes back as
//! [`NO_VERDICT`](crate::confidence::NO_VERDICT).

pub mod bert;
pub mod image;
pub mod linear;
pub mod url;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub use self::bert::{BertClassifier, Vocab};
pub use self::image::ImageClassifier;
pub use self::linear::{FastTextModel, LinearClassifier, LinearModel};
pub use self::url::UrlClassifier;

/// An ensemble member, named the way clients name it in a mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Image,
    Linear,
    Bert,
}

impl Signal {
    /// Fixed execution order for explicit mode sets.
    pub const ALL: [Signal; 3] = [Signal::Image, Signal::Linear, Signal::Bert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Image => "image",
            Signal::Linear => "linear",
            Signal::Bert => "bert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Signal::Image),
            "linear" => Some(Signal::Linear),
            "bert" => Some(Signal::Bert),
            _ => None,
        }
    }
}

pub trait Classifier: Send + Sync {
    type Input: ?Sized;

    fn classify(&self, input: &Self::Input) -> f64;
}

/// Text members take the cleaned token stream.
pub type TextClassifier = dyn Classifier<Input = [String]>;
/// The image member takes the path of a rendered page thumbnail.
pub type PageClassifier = dyn Classifier<Input = std::path::Path>;

/// First row of a TF-serving response as `(other, research)`.
pub(crate) fn first_pair(rows: &[Vec<f64>]) -> Result<(f64, f64)> {
    let row = rows.first().ok_or_else(|| anyhow!("empty prediction batch"))?;
    match row.as_slice() {
        [other, research] => Ok((*other, *research)),
        _ => Err(anyhow!("expected 2 class probabilities, got {}", row.len())),
    }
}
