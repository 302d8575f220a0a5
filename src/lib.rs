//! Research-publication classification for PDFs and URLs.
//!
//! A PDF is staged in a scratch dir, turned into text and a first-page
//! thumbnail by external tools, and scored by up to three classifiers whose
//! outputs share one confidence scale (see [`confidence`]). [`ensemble`]
//! decides which classifiers run for a given mode string.

pub mod classifier;
pub mod cli;
pub mod confidence;
pub mod config;
pub mod ensemble;
pub mod extract;
pub mod plan;
pub mod report;
pub mod scratch;
pub mod server;
pub mod stats;
pub mod tokenize;
pub mod util;
