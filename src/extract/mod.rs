pub mod tools;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use tools::{ToolDiag, ToolExtractor};

/// Turns a PDF on disk into the raw signals the classifiers consume.
pub trait Extractor: Send + Sync {
    /// Plain UTF-8 text of the whole document; empty when the tool produced nothing.
    fn extract_text(&self, pdf: &Path) -> Result<String>;

    /// JPEG thumbnail of `page` (0-based) written next to the PDF. `None` when
    /// rendering failed or the page is effectively blank. The caller owns the file.
    fn extract_image(&self, pdf: &Path, page: u32) -> Result<Option<PathBuf>>;
}
