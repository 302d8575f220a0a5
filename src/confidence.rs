//! One confidence scale shared by every classifier.
//!
//! A score of 1.0 is full confidence the document is research, 0.0 full
//! confidence it is something else. 0.5 is what every failure path reports,
//! so an exact 0.5 means "no verdict obtained".

use serde::{Deserialize, Serialize};
use tracing::error;

/// Score recorded when a classifier could not produce a verdict.
pub const NO_VERDICT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Research,
    Other,
}

impl Label {
    /// Accepts bare labels and fastText's `__label__` form. Anything that is
    /// not the research label counts as other.
    pub fn from_model_label(raw: &str) -> Self {
        match raw.trim() {
            "research" | "__label__research" => Label::Research,
            _ => Label::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Research => "research",
            Label::Other => "other",
        }
    }
}

/// Fold a classifier's own (label, probability-of-that-label) into [0, 1].
pub fn encode(label: Label, raw_confidence: f64) -> f64 {
    if raw_confidence < 0.5 {
        error!(
            "encode called improperly with label={} confidence={}",
            label.as_str(),
            raw_confidence
        );
    }
    let p = raw_confidence.clamp(0.0, 1.0);
    match label {
        Label::Research => 0.5 + p / 2.0,
        Label::Other => 0.5 - p / 2.0,
    }
}

pub fn decode(score: f64) -> (Label, f64) {
    if score < 0.5 {
        (Label::Other, 1.0 - 2.0 * score)
    } else {
        (Label::Research, 2.0 * score - 1.0)
    }
}

/// Encode a two-class probability vector `[other, research]`, picking the
/// larger entry as the predicted label. Ties go to other.
pub fn encode_pair(other: f64, research: f64) -> f64 {
    if research > other {
        encode(Label::Research, research)
    } else {
        encode(Label::Other, other)
    }
}
