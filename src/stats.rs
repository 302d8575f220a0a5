use crate::{classifier::Signal, confidence::NO_VERDICT};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct SignalCounters {
    invocations: AtomicU64,
    no_verdict: AtomicU64,
}

/// Request counters shared by every worker.
#[derive(Debug, Default)]
pub struct Stats {
    pdf_requests: AtomicU64,
    url_requests: AtomicU64,
    empty_text: AtomicU64,
    empty_image: AtomicU64,
    image: SignalCounters,
    linear: SignalCounters,
    bert: SignalCounters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub invocations: u64,
    pub no_verdict: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub pdf_requests: u64,
    pub url_requests: u64,
    pub empty_text: u64,
    pub empty_image: u64,
    pub image: SignalSnapshot,
    pub linear: SignalSnapshot,
    pub bert: SignalSnapshot,
}

impl Stats {
    pub fn pdf_request(&self) {
        self.pdf_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn url_request(&self) {
        self.url_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn empty_text(&self) {
        self.empty_text.fetch_add(1, Ordering::Relaxed);
    }

    pub fn empty_image(&self) {
        self.empty_image.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scored(&self, signal: Signal, score: f64) {
        let c = self.counters(signal);
        c.invocations.fetch_add(1, Ordering::Relaxed);
        if score == NO_VERDICT {
            c.no_verdict.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn counters(&self, signal: Signal) -> &SignalCounters {
        match signal {
            Signal::Image => &self.image,
            Signal::Linear => &self.linear,
            Signal::Bert => &self.bert,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let sig = |c: &SignalCounters| SignalSnapshot {
            invocations: c.invocations.load(Ordering::Relaxed),
            no_verdict: c.no_verdict.load(Ordering::Relaxed),
        };
        StatsSnapshot {
            pdf_requests: self.pdf_requests.load(Ordering::Relaxed),
            url_requests: self.url_requests.load(Ordering::Relaxed),
            empty_text: self.empty_text.load(Ordering::Relaxed),
            empty_image: self.empty_image.load(Ordering::Relaxed),
            image: sig(&self.image),
            linear: sig(&self.linear),
            bert: sig(&self.bert),
        }
    }
}
