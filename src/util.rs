use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use time::macros::format_description;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// First 12 hex chars of the content digest; enough to correlate log lines.
pub fn trace_id(bytes: &[u8]) -> String {
    let mut id = sha256_hex(bytes);
    id.truncate(12);
    id
}

/// Second-resolution UTC timestamp, e.g. `2019-07-20T14:03:51`.
pub fn startup_stamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| "1970-01-01T00:00:00".to_string())
}

pub fn which(bin: &str) -> Option<PathBuf> {
    let candidate = Path::new(bin);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|cand| cand.is_file())
}

/// `<path><suffix>` next to `path`, e.g. `f123.pdf` -> `f123.pdf.txt`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_is_a_digest_prefix() {
        let id = trace_id(b"%PDF-1.4");
        assert_eq!(id.len(), 12);
        assert!(sha256_hex(b"%PDF-1.4").starts_with(&id));
    }

    #[test]
    fn sibling_keeps_the_original_extension() {
        let p = sibling_with_suffix(Path::new("/tmp/x/f42.pdf"), ".txt");
        assert_eq!(p, PathBuf::from("/tmp/x/f42.pdf.txt"));
    }
}
