use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub extract: Extract,
    #[serde(default)]
    pub bert: Bert,
    #[serde(default)]
    pub image: Image,
    #[serde(default)]
    pub ensemble: Ensemble,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Apply the environment variables the deployed service has always been
    /// configured with. Non-empty values win over the TOML file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("TF_IMAGE_SERVER_URL") {
            self.image.server_url = v;
        }
        if let Some(v) = get("TF_BERT_SERVER_URL") {
            self.bert.server_url = v;
        }
        if let Some(v) = get("TF_BERT_VOCAB_PATH") {
            self.paths.vocab_path = v;
        }
        if let Some(v) = get("FT_MODEL") {
            self.paths.fasttext_model = v;
        }
        if let Some(v) = get("FT_URL_MODEL") {
            self.paths.fasttext_url_model = v;
        }
        if let Some(v) = get("TEMP") {
            self.paths.temp_root = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub body_limit_bytes: usize,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3939".into(),
            body_limit_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub temp_root: String,
    pub fasttext_model: String,
    pub fasttext_url_model: String,
    pub vocab_path: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            temp_root: "/tmp".into(),
            fasttext_model: "".into(),
            fasttext_url_model: "".into(),
            vocab_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Extract {
    pub pdftotext_exe: String,
    pub convert_exe: String,
    pub timeout_seconds: u64,
    pub min_text_bytes: usize,
    pub min_image_bytes: u64,
    pub thumbnail_width: u32,
    pub canvas_size: u32,
    pub jpeg_quality: u32,
}
impl Default for Extract {
    fn default() -> Self {
        Self {
            pdftotext_exe: "pdftotext".into(),
            convert_exe: "convert".into(),
            timeout_seconds: 5,
            min_text_bytes: 300,
            min_image_bytes: 3000,
            thumbnail_width: 156,
            canvas_size: 224,
            jpeg_quality: 95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bert {
    /// TF-serving prefix, e.g. `http://localhost:8501/v1`.
    pub server_url: String,
    pub model_name: String,
    pub max_seq_len: usize,
    pub timeout_seconds: u64,
}
impl Default for Bert {
    fn default() -> Self {
        Self {
            server_url: "".into(),
            model_name: "bert_model".into(),
            max_seq_len: 512,
            timeout_seconds: 30,
        }
    }
}
impl Bert {
    pub fn predict_url(&self) -> String {
        predict_url(&self.server_url, &self.model_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub server_url: String,
    pub model_name: String,
    /// Square edge in pixels the serving model expects.
    pub input_size: u32,
    pub timeout_seconds: u64,
}
impl Default for Image {
    fn default() -> Self {
        Self {
            server_url: "".into(),
            model_name: "image_model".into(),
            input_size: 299,
            timeout_seconds: 30,
        }
    }
}
impl Image {
    pub fn predict_url(&self) -> String {
        predict_url(&self.server_url, &self.model_name)
    }
}

fn predict_url(prefix: &str, model_name: &str) -> String {
    format!("{}/models/{}:predict", prefix.trim_end_matches('/'), model_name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ensemble {
    pub default_mode: String,
    pub ambiguous_low: f64,
    pub ambiguous_high: f64,
}
impl Default for Ensemble {
    fn default() -> Self {
        Self {
            default_mode: "auto".into(),
            ambiguous_low: 0.15,
            ambiguous_high: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Versions {
    pub image: String,
    pub linear: String,
    pub bert: String,
    pub urlmeta: String,
}
impl Default for Versions {
    fn default() -> Self {
        Self {
            image: "20190708".into(),
            linear: "20190720".into(),
            bert: "20190923T2215".into(),
            urlmeta: "20190722".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "research-pub.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    /// Leave temp PDFs and page images in the scratch dir for inspection.
    pub keep_artifacts: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_artifacts: false,
            dump_effective_config: false,
        }
    }
}
