use crate::classifier::Signal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// A parsed mode string such as `auto`, `all` or `linear,bert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSet {
    pub auto: bool,
    pub all: bool,
    pub signals: BTreeSet<Signal>,
    pub unknown: Vec<String>,
}

impl ModeSet {
    /// Comma-separated, case-sensitive. An empty string means `auto`.
    pub fn parse(raw: &str) -> Self {
        let mut modes = ModeSet {
            auto: false,
            all: false,
            signals: BTreeSet::new(),
            unknown: Vec::new(),
        };
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name {
                "auto" => modes.auto = true,
                "all" => modes.all = true,
                other => match Signal::from_name(other) {
                    Some(sig) => {
                        modes.signals.insert(sig);
                    }
                    None => modes.unknown.push(other.to_string()),
                },
            }
        }
        let named_nothing = modes.signals.is_empty() && modes.unknown.is_empty();
        if !modes.auto && !modes.all && named_nothing {
            modes.auto = true;
        }
        modes
    }

    pub fn auto() -> Self {
        Self::parse("auto")
    }

    /// `auto` beats `all` when both are named, so `auto,all` runs the auto policy.
    pub fn plan(&self) -> ExecutionPlan {
        for name in &self.unknown {
            warn!("ignoring unknown classifier ref: {name}");
        }
        if self.auto {
            return ExecutionPlan::Auto;
        }
        if self.all {
            return ExecutionPlan::Explicit(Signal::ALL.to_vec());
        }
        ExecutionPlan::Explicit(self.signals.iter().copied().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPlan {
    /// Linear first, BERT only when linear is ambiguous, image only without text.
    Auto,
    /// Named members in `image, linear, bert` order.
    Explicit(Vec<Signal>),
}

impl ExecutionPlan {
    pub fn needs_text(&self) -> bool {
        match self {
            ExecutionPlan::Auto => true,
            ExecutionPlan::Explicit(sigs) => sigs
                .iter()
                .any(|s| matches!(s, Signal::Linear | Signal::Bert)),
        }
    }
}

/// Whether a linear score is inconclusive enough to consult BERT.
pub fn is_ambiguous(score: f64, low: f64, high: f64) -> bool {
    (low..=high).contains(&score)
}
