use super::Extractor;
use crate::{
    config::Config,
    scratch::remove,
    util::{sibling_with_suffix, which},
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Shells out to poppler's `pdftotext` and ImageMagick's `convert`.
pub struct ToolExtractor {
    pdftotext_exe: PathBuf,
    convert_exe: PathBuf,
    timeout: Duration,
    min_image_bytes: u64,
    thumbnail_width: u32,
    canvas_size: u32,
    jpeg_quality: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDiag {
    pub pdftotext: Option<String>,
    pub convert: Option<String>,
    pub ok: bool,
}

impl ToolExtractor {
    pub fn new(cfg: &Config) -> Self {
        let ex = &cfg.extract;
        for exe in [&ex.pdftotext_exe, &ex.convert_exe] {
            if which(exe).is_none() {
                warn!("{exe} not found on PATH; extraction will fail until it is installed");
            }
        }
        Self {
            pdftotext_exe: PathBuf::from(&ex.pdftotext_exe),
            convert_exe: PathBuf::from(&ex.convert_exe),
            timeout: Duration::from_secs(ex.timeout_seconds),
            min_image_bytes: ex.min_image_bytes,
            thumbnail_width: ex.thumbnail_width,
            canvas_size: ex.canvas_size,
            jpeg_quality: ex.jpeg_quality,
        }
    }

    pub fn doctor(&self) -> ToolDiag {
        let find = |p: &Path| which(&p.to_string_lossy()).map(|p| p.display().to_string());
        let pdftotext = find(&self.pdftotext_exe);
        let convert = find(&self.convert_exe);
        ToolDiag {
            ok: pdftotext.is_some() && convert.is_some(),
            pdftotext,
            convert,
        }
    }

    fn thumbnail_args(&self, pdf: &Path, page: u32, out: &Path) -> Vec<String> {
        let canvas = format!("{0}x{0}", self.canvas_size);
        vec![
            format!("{}[{}]", pdf.display(), page),
            "-background".into(),
            "white".into(),
            "-alpha".into(),
            "remove".into(),
            "-equalize".into(),
            "-quality".into(),
            self.jpeg_quality.to_string(),
            "-thumbnail".into(),
            format!("{}x", self.thumbnail_width),
            "-gravity".into(),
            "north".into(),
            "-extent".into(),
            canvas,
            out.display().to_string(),
        ]
    }
}

impl Extractor for ToolExtractor {
    fn extract_text(&self, pdf: &Path) -> Result<String> {
        let txt = sibling_with_suffix(pdf, ".txt");
        let mut cmd = Command::new(&self.pdftotext_exe);
        cmd.args(["-nopgbrk", "-eol", "unix", "-enc", "UTF-8"])
            .arg(pdf)
            .arg(&txt);

        let run = run_with_timeout(cmd, self.timeout);
        let outcome = match run {
            Ok(o) => o,
            Err(e) => {
                remove(&txt);
                return Err(e.context("pdftotext"));
            }
        };
        if outcome.timed_out {
            warn!(
                "pdftotext did not finish in {:?} for {}; reading partial output",
                self.timeout,
                pdf.display()
            );
        } else if !outcome.success() {
            debug!("pdftotext exited {:?}: {}", outcome.status, outcome.stderr.trim());
        }

        let text = match std::fs::read(&txt) {
            Ok(bytes) => {
                remove(&txt);
                String::from_utf8(bytes)
                    .map_err(|e| anyhow!("pdftotext output is not UTF-8: {e}"))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                remove(&txt);
                return Err(e).with_context(|| format!("read {}", txt.display()));
            }
        };
        Ok(text)
    }

    fn extract_image(&self, pdf: &Path, page: u32) -> Result<Option<PathBuf>> {
        let jpg = if page == 0 {
            sibling_with_suffix(pdf, ".jpg")
        } else {
            sibling_with_suffix(pdf, &format!(".{page}.jpg"))
        };
        let args = self.thumbnail_args(pdf, page, &jpg);
        debug!("convert {}", args.join(" "));
        let mut cmd = Command::new(&self.convert_exe);
        cmd.args(&args);

        let outcome = run_with_timeout(cmd, self.timeout).context("convert")?;
        if outcome.timed_out {
            warn!(
                "convert did not finish in {:?} for {}",
                self.timeout,
                pdf.display()
            );
        } else if !outcome.success() {
            debug!("convert exited {:?}: {}", outcome.status, outcome.stderr.trim());
        }

        let size = match std::fs::metadata(&jpg) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(None),
        };
        if size <= self.min_image_bytes {
            debug!(
                "jpg of {} bytes for {} assumed blank; removing",
                size,
                pdf.display()
            );
            remove(&jpg);
            return Ok(None);
        }
        Ok(Some(jpg))
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    pub timed_out: bool,
    pub stderr: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }
}

/// How long to wait for stderr to reach EOF once the child is gone. Helpers the
/// child spawned (ghostscript under `convert`) may still hold the pipe open.
const STDERR_GRACE: Duration = Duration::from_millis(200);

/// Spawn `cmd` and block until it exits or `timeout` elapses. On timeout the
/// child is killed and reaped. Stdout is discarded; stderr is collected only if
/// it closes shortly after the child exits.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<RunOutcome> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {program}"))?;
    wait_with_timeout(&mut child, timeout)
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<RunOutcome> {
    // The reader is never joined; a grandchild holding the pipe only delays it.
    let (tx, rx) = mpsc::channel();
    if let Some(mut err) = child.stderr.take() {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break (status, false);
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            break (status, true);
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let stderr = rx.recv_timeout(STDERR_GRACE).unwrap_or_default();
    Ok(RunOutcome {
        status,
        timed_out,
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
