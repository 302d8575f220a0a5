use super::{first_pair, Classifier};
use crate::{
    config::Config,
    confidence::{encode_pair, NO_VERDICT},
};
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Token -> id table from a BERT `vocab.txt`, one token per line.
#[derive(Debug, Default, Clone)]
pub struct Vocab {
    ids: HashMap<String, u32>,
}

impl Vocab {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading BERT vocab: {}", path.display()))?;
        let vocab = Self::parse(&raw);
        info!("loaded {} vocab entries from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    pub fn parse(raw: &str) -> Self {
        let ids = raw
            .lines()
            .enumerate()
            .map(|(i, line)| (line.trim().to_string(), i as u32))
            .collect();
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids for the tokens the vocabulary knows; unknown tokens are skipped.
    pub fn convert(&self, tokens: &[String]) -> Vec<u32> {
        tokens.iter().filter_map(|t| self.ids.get(t).copied()).collect()
    }
}

/// Columnar TF-serving request for the exported BERT graph.
#[derive(Debug, Serialize)]
pub struct BertRequest {
    pub signature_name: &'static str,
    pub inputs: BertInputs,
}

#[derive(Debug, Serialize)]
pub struct BertInputs {
    pub input_ids: [Vec<u32>; 1],
    pub input_mask: [Vec<u32>; 1],
    /// Placeholder; the graph wants it but prediction ignores it.
    pub label_ids: [u32; 1],
    pub segment_ids: [Vec<u32>; 1],
}

#[derive(Debug, Deserialize)]
struct BertResponse {
    outputs: Vec<Vec<f64>>,
}

/// Deep text member, served remotely.
pub struct BertClassifier {
    client: reqwest::blocking::Client,
    url: String,
    vocab: Arc<Vocab>,
    max_seq_len: usize,
}

impl BertClassifier {
    pub fn new(cfg: &Config, vocab: Arc<Vocab>) -> Result<Self> {
        if cfg.bert.server_url.is_empty() {
            return Err(anyhow!(
                "missing BERT server URL; set bert.server_url or TF_BERT_SERVER_URL"
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.bert.timeout_seconds))
            .build()
            .with_context(|| "building BERT http client")?;
        Ok(Self {
            client,
            url: cfg.bert.predict_url(),
            vocab,
            max_seq_len: cfg.bert.max_seq_len,
        })
    }

    /// Ids right-padded with zeros to the sequence length, plus the matching mask.
    pub fn build_request(&self, tokens: &[String]) -> BertRequest {
        let n = self.max_seq_len;
        let mut ids = self.vocab.convert(tokens);
        ids.truncate(n);
        let real = ids.len();
        ids.resize(n, 0);

        let mut mask = vec![1u32; real];
        mask.resize(n, 0);

        BertRequest {
            signature_name: "serving_default",
            inputs: BertInputs {
                input_ids: [ids],
                input_mask: [mask],
                label_ids: [0],
                segment_ids: [vec![0; n]],
            },
        }
    }

    fn predict(&self, tokens: &[String]) -> Result<f64> {
        let req = self.build_request(tokens);
        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .with_context(|| format!("POST {}", self.url))?;

        match resp.status() {
            StatusCode::OK => {
                let body: BertResponse = resp.json().with_context(|| "decoding BERT response")?;
                let (other, research) = first_pair(&body.outputs)?;
                debug!("bert other={other:.4} research={research:.4}");
                Ok(encode_pair(other, research))
            }
            StatusCode::BAD_REQUEST => {
                let body = resp.text().unwrap_or_default();
                Err(anyhow!("HTTP 400 from BERT serving: {body}"))
            }
            status => Err(anyhow!("HTTP {status} from BERT serving")),
        }
    }
}

impl Classifier for BertClassifier {
    type Input = [String];

    fn classify(&self, tokens: &[String]) -> f64 {
        self.predict(tokens).unwrap_or_else(|e| {
            warn!("bert classifier failed: {e:#}");
            NO_VERDICT
        })
    }
}
