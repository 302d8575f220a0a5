use crate::{
    classifier::{FastTextModel, UrlClassifier},
    config::Config,
    ensemble::Ensemble,
    extract::ToolExtractor,
    plan::ModeSet,
    report::UrlPredictions,
    scratch::ScratchDir,
    server::{self, AppState},
    stats::Stats,
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pdf-trio")]
#[command(about = "Classify PDFs and URLs as research publications (fastText + BERT + image ensemble)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pdf-trio.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the extraction tools and model files are in place.
    Doctor {},
    /// Run the HTTP service.
    Serve {
        /// Listen address, overrides server.bind.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Classify one local PDF and print the result JSON.
    Classify {
        #[arg(long)]
        input: PathBuf,
        /// auto, all, or a comma list of image,linear,bert.
        #[arg(long)]
        mode: Option<String>,
    },
    /// Classify URLs by their text alone.
    ClassifyUrl {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let mut cfg = match &cfg_path {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok());

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    match &cfg_path {
        Some(p) => info!("config {}", p.display()),
        None => info!("no config file; using defaults"),
    }

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(&cfg).unwrap_or_default();
        info!("effective config:\n{raw}");
    }

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Serve { bind } => serve(&cfg, bind.as_deref()),
        Command::Classify { input, mode } => classify(&cfg, input, mode.as_deref()),
        Command::ClassifyUrl { urls } => classify_urls(&cfg, urls),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("pdf-trio.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn doctor(cfg: &Config) -> Result<()> {
    let tools = ToolExtractor::new(cfg).doctor();
    let file_ok = |p: &str| !p.is_empty() && Path::new(p).is_file();
    let diag = serde_json::json!({
        "tools": tools,
        "fasttext_model": { "path": cfg.paths.fasttext_model, "ok": file_ok(&cfg.paths.fasttext_model) },
        "fasttext_url_model": { "path": cfg.paths.fasttext_url_model, "ok": file_ok(&cfg.paths.fasttext_url_model) },
        "vocab": { "path": cfg.paths.vocab_path, "ok": file_ok(&cfg.paths.vocab_path) },
        "bert_url": cfg.bert.predict_url(),
        "image_url": cfg.image.predict_url(),
    });
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn open_scratch(cfg: &Config) -> Result<Arc<ScratchDir>> {
    let root = Path::new(&cfg.paths.temp_root);
    let scratch = ScratchDir::create(root)
        .with_context(|| format!("creating scratch area under {}", root.display()))?;
    Ok(Arc::new(scratch))
}

fn load_url_classifier(cfg: &Config) -> Result<UrlClassifier> {
    let path = &cfg.paths.fasttext_url_model;
    if path.is_empty() {
        return Err(anyhow!(
            "missing fastText URL model; set paths.fasttext_url_model or FT_URL_MODEL"
        ));
    }
    let model = FastTextModel::load(Path::new(path))?;
    Ok(UrlClassifier::new(Arc::new(model)))
}

fn serve(cfg: &Config, bind: Option<&str>) -> Result<()> {
    let stats = Arc::new(Stats::default());
    let scratch = open_scratch(cfg)?;
    // Blocking HTTP clients are built here, before the async runtime exists.
    let ensemble = Ensemble::from_config(cfg, Arc::clone(&scratch), Arc::clone(&stats))?;
    let urls = load_url_classifier(cfg)?;
    let state = Arc::new(AppState {
        ensemble,
        urls,
        stats,
        default_mode: cfg.ensemble.default_mode.clone(),
    });

    let bind = bind.unwrap_or(cfg.server.bind.as_str());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")?;
    let served = runtime.block_on(server::serve(bind, cfg.server.body_limit_bytes, state));
    drop(runtime);
    info!("removing scratch dir {}", scratch.path().display());
    served
}

fn classify(cfg: &Config, input: &Path, mode: Option<&str>) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }
    let stats = Arc::new(Stats::default());
    let scratch = open_scratch(cfg)?;
    let ensemble = Ensemble::from_config(cfg, scratch, stats)?;
    let modes = ModeSet::parse(mode.unwrap_or(cfg.ensemble.default_mode.as_str()));
    let result = ensemble.classify_file(&modes, input)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn classify_urls(cfg: &Config, urls: &[String]) -> Result<()> {
    let classifier = load_url_classifier(cfg)?;
    let mut out = UrlPredictions::default();
    for url in urls {
        out.predictions
            .insert(url.clone(), classifier.classify_url(url));
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
