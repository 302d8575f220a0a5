use crate::{classifier::Signal, config::Versions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response body for a PDF classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_research: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bert: Option<f64>,
    pub version: Versions,
}

impl ClassificationResult {
    pub fn new(version: Versions) -> Self {
        Self {
            is_research: None,
            image: None,
            linear: None,
            bert: None,
            version,
        }
    }

    pub fn record(&mut self, signal: Signal, score: f64) {
        let slot = match signal {
            Signal::Image => &mut self.image,
            Signal::Linear => &mut self.linear,
            Signal::Bert => &mut self.bert,
        };
        *slot = Some(score);
    }

    pub fn get(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::Image => self.image,
            Signal::Linear => self.linear,
            Signal::Bert => self.bert,
        }
    }

    /// Every member score that made it into the result, in execution order.
    pub fn scores(&self) -> Vec<f64> {
        Signal::ALL.iter().filter_map(|s| self.get(*s)).collect()
    }

    /// Plain mean of the recorded scores; absent when nothing ran.
    pub fn finalize(&mut self) {
        let scores = self.scores();
        self.is_research = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
    }
}

/// Response body for URL classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlPredictions {
    pub predictions: BTreeMap<String, f64>,
}
