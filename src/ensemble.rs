use crate::{
    classifier::{
        BertClassifier, FastTextModel, ImageClassifier, LinearClassifier, PageClassifier, Signal,
        TextClassifier, Vocab,
    },
    config::Config,
    extract::{Extractor, ToolExtractor},
    plan::{is_ambiguous, ExecutionPlan, ModeSet},
    report::ClassificationResult,
    scratch::{ScratchDir, TempArtifact},
    stats::Stats,
    tokenize::{tokenize, trim},
    util::trace_id,
};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// The three classifiers an ensemble can consult.
pub struct Members {
    pub image: Box<PageClassifier>,
    pub linear: Box<TextClassifier>,
    pub bert: Box<TextClassifier>,
}

impl Members {
    /// Load the fastText model and vocab and set up the remote clients.
    pub fn load(cfg: &Config) -> Result<Self> {
        let model_path = &cfg.paths.fasttext_model;
        if model_path.is_empty() {
            return Err(anyhow!(
                "missing fastText model; set paths.fasttext_model or FT_MODEL"
            ));
        }
        let linear = FastTextModel::load(Path::new(model_path))?;

        let vocab_path = &cfg.paths.vocab_path;
        if vocab_path.is_empty() {
            return Err(anyhow!(
                "missing BERT vocab; set paths.vocab_path or TF_BERT_VOCAB_PATH"
            ));
        }
        let vocab = Vocab::load(Path::new(vocab_path))?;

        Ok(Self {
            image: Box::new(ImageClassifier::new(cfg)?),
            linear: Box::new(LinearClassifier::new(Arc::new(linear))),
            bert: Box::new(BertClassifier::new(cfg, Arc::new(vocab))?),
        })
    }
}

/// Decides per request which members run and folds their scores together.
pub struct Ensemble {
    cfg: Config,
    scratch: Arc<ScratchDir>,
    extractor: Box<dyn Extractor>,
    members: Members,
    stats: Arc<Stats>,
}

impl Ensemble {
    pub fn new(
        cfg: &Config,
        scratch: Arc<ScratchDir>,
        extractor: Box<dyn Extractor>,
        members: Members,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            cfg: cfg.clone(),
            scratch,
            extractor,
            members,
            stats,
        }
    }

    /// Production wiring: external tools for extraction, real models behind the members.
    pub fn from_config(cfg: &Config, scratch: Arc<ScratchDir>, stats: Arc<Stats>) -> Result<Self> {
        let members = Members::load(cfg)?;
        Ok(Self::new(
            cfg,
            scratch,
            Box::new(ToolExtractor::new(cfg)),
            members,
            stats,
        ))
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn classify_file(&self, mode: &ModeSet, input: &Path) -> Result<ClassificationResult> {
        let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.classify_pdf(mode, &bytes, &name)
    }

    /// Classify one uploaded PDF. Only failing to stage the upload is an error;
    /// extraction and backend trouble degrade the result instead.
    pub fn classify_pdf(
        &self,
        mode: &ModeSet,
        pdf: &[u8],
        filename: &str,
    ) -> Result<ClassificationResult> {
        let trace = trace_id(pdf);
        let span = info_span!("classify_pdf", trace = %trace, file = filename);
        let _enter = span.enter();
        self.stats.pdf_request();

        let plan = mode.plan();
        debug!(?plan, "execution plan");

        let pdf_file = self
            .scratch
            .write_pdf(pdf, self.cfg.debug.keep_artifacts)?;
        debug!("stored {} bytes in {}", pdf.len(), pdf_file.path().display());

        let tokens = if plan.needs_text() {
            self.tokens_for(pdf_file.path())
        } else {
            Vec::new()
        };

        let mut result = ClassificationResult::new(self.cfg.versions.clone());
        match &plan {
            ExecutionPlan::Auto => self.run_auto(pdf_file.path(), &tokens, &mut result),
            ExecutionPlan::Explicit(signals) => {
                for signal in signals {
                    self.run_signal(*signal, pdf_file.path(), &tokens, &mut result);
                }
            }
        }
        result.finalize();

        info!(
            "is_research={:?} image={:?} linear={:?} bert={:?}",
            result.is_research, result.image, result.linear, result.bert
        );
        Ok(result)
    }

    fn run_auto(&self, pdf: &Path, tokens: &[String], result: &mut ClassificationResult) {
        if tokens.is_empty() {
            debug!("no usable text; falling back to page image");
            self.run_signal(Signal::Image, pdf, tokens, result);
            return;
        }

        self.run_signal(Signal::Linear, pdf, tokens, result);
        let linear = result.linear.unwrap_or_default();
        let ens = &self.cfg.ensemble;
        if is_ambiguous(linear, ens.ambiguous_low, ens.ambiguous_high) {
            debug!("linear score {linear:.3} is ambiguous; consulting bert");
            self.run_signal(Signal::Bert, pdf, tokens, result);
        }
    }

    fn run_signal(
        &self,
        signal: Signal,
        pdf: &Path,
        tokens: &[String],
        result: &mut ClassificationResult,
    ) {
        let score = match signal {
            Signal::Image => {
                let Some(page) = self.render_page(pdf) else {
                    debug!("no page image; skipping image");
                    return;
                };
                self.members.image.classify(page.path())
            }
            Signal::Linear | Signal::Bert if tokens.is_empty() => {
                debug!("no tokens extracted; skipping {}", signal.as_str());
                return;
            }
            Signal::Linear => self.members.linear.classify(tokens),
            Signal::Bert => {
                let trimmed = trim(tokens, self.cfg.bert.max_seq_len);
                self.members.bert.classify(&trimmed)
            }
        };
        self.stats.scored(signal, score);
        result.record(signal, score);
    }

    fn tokens_for(&self, pdf: &Path) -> Vec<String> {
        let text = match self.extractor.extract_text(pdf) {
            Ok(t) => t,
            Err(e) => {
                warn!("text extraction failed: {e:#}");
                String::new()
            }
        };
        if text.len() < self.cfg.extract.min_text_bytes {
            debug!("extracted text too short ({} bytes)", text.len());
            self.stats.empty_text();
            return Vec::new();
        }
        tokenize(&text)
    }

    fn render_page(&self, pdf: &Path) -> Option<TempArtifact> {
        match self.extractor.extract_image(pdf, 0) {
            Ok(Some(path)) => Some(TempArtifact::new(path, self.cfg.debug.keep_artifacts)),
            Ok(None) => {
                self.stats.empty_image();
                None
            }
            Err(e) => {
                warn!("page render failed: {e:#}");
                self.stats.empty_image();
                None
            }
        }
    }
}
