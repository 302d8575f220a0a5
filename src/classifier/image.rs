use super::{first_pair, Classifier};
use crate::{
    config::Config,
    confidence::{encode_pair, NO_VERDICT},
};
use ::image::imageops::FilterType;
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// One image as `rows x cols x 3` floats in 0..=255, BGR channel order.
pub type Pixels = Vec<Vec<[f32; 3]>>;

#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub signature_name: &'static str,
    pub instances: [Pixels; 1],
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    predictions: Vec<Vec<f64>>,
}

/// Page-thumbnail member, served remotely.
pub struct ImageClassifier {
    client: reqwest::blocking::Client,
    url: String,
    input_size: u32,
}

impl ImageClassifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        if cfg.image.server_url.is_empty() {
            return Err(anyhow!(
                "missing image server URL; set image.server_url or TF_IMAGE_SERVER_URL"
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.image.timeout_seconds))
            .build()
            .with_context(|| "building image http client")?;
        Ok(Self {
            client,
            url: cfg.image.predict_url(),
            input_size: cfg.image.input_size,
        })
    }

    /// Decode the thumbnail and bilinearly resize it to the model's input square.
    pub fn preprocess(&self, jpg: &Path) -> Result<Pixels> {
        let img = ::image::open(jpg)
            .with_context(|| format!("decoding {}", jpg.display()))?
            .resize_exact(self.input_size, self.input_size, FilterType::Triangle)
            .to_rgb8();
        // The serving graph was trained on BGR input.
        Ok(img
            .rows()
            .map(|row| {
                row.map(|p| [f32::from(p[2]), f32::from(p[1]), f32::from(p[0])])
                    .collect()
            })
            .collect())
    }

    fn predict(&self, jpg: &Path) -> Result<f64> {
        let req = ImageRequest {
            signature_name: "serving_default",
            instances: [self.preprocess(jpg)?],
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .with_context(|| format!("POST {}", self.url))?;

        match resp.status() {
            StatusCode::OK => {
                let body: ImageResponse =
                    resp.json().with_context(|| "decoding image response")?;
                let (other, research) = first_pair(&body.predictions)?;
                debug!(
                    "image {} other={other:.4} research={research:.4}",
                    jpg.display()
                );
                Ok(encode_pair(other, research))
            }
            status => Err(anyhow!("HTTP {status} from image serving")),
        }
    }
}

impl Classifier for ImageClassifier {
    type Input = Path;

    fn classify(&self, jpg: &Path) -> f64 {
        self.predict(jpg).unwrap_or_else(|e| {
            warn!("image classifier failed for {}: {e:#}", jpg.display());
            NO_VERDICT
        })
    }
}
