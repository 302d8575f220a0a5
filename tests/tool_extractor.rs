use pdf_trio::{
    config::Config,
    extract::{Extractor, ToolExtractor},
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Write an executable `sh` script standing in for an external tool.
fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn extractor(pdftotext: &Path, convert: &Path, timeout_seconds: u64) -> ToolExtractor {
    let mut cfg = Config::default();
    cfg.extract.pdftotext_exe = pdftotext.display().to_string();
    cfg.extract.convert_exe = convert.display().to_string();
    cfg.extract.timeout_seconds = timeout_seconds;
    ToolExtractor::new(&cfg)
}

fn staged_pdf(dir: &Path) -> PathBuf {
    let pdf = dir.join("f42.pdf");
    std::fs::write(&pdf, b"%PDF-1.4").expect("write pdf");
    pdf
}

// pdftotext is called as: -nopgbrk -eol unix -enc UTF-8 <pdf> <txt>
const TEXT_OUT: &str = "$6";

#[test]
fn text_is_read_and_sibling_file_removed() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tool = fake_tool(
        tmp.path(),
        "pdftotext",
        &format!("printf 'Deep residual learning' > \"{TEXT_OUT}\""),
    );
    let ex = extractor(&tool, &tool, 5);
    let pdf = staged_pdf(tmp.path());

    let text = ex.extract_text(&pdf).expect("extract");

    assert_eq!(text, "Deep residual learning");
    assert!(!tmp.path().join("f42.pdf.txt").exists());
}

#[test]
fn no_output_file_means_empty_text() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tool = fake_tool(tmp.path(), "pdftotext", "exit 1");
    let ex = extractor(&tool, &tool, 5);
    let pdf = staged_pdf(tmp.path());

    assert_eq!(ex.extract_text(&pdf).expect("extract"), "");
}

#[test]
fn partial_text_is_kept_after_timeout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tool = fake_tool(
        tmp.path(),
        "pdftotext",
        &format!("printf 'first page only' > \"{TEXT_OUT}\"\nexec sleep 10"),
    );
    let ex = extractor(&tool, &tool, 1);
    let pdf = staged_pdf(tmp.path());

    let started = Instant::now();
    let text = ex.extract_text(&pdf).expect("extract");

    assert_eq!(text, "first page only");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!tmp.path().join("f42.pdf.txt").exists());
}

#[test]
fn invalid_utf8_is_an_extraction_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tool = fake_tool(
        tmp.path(),
        "pdftotext",
        &format!("printf '\\377\\376abc' > \"{TEXT_OUT}\""),
    );
    let ex = extractor(&tool, &tool, 5);
    let pdf = staged_pdf(tmp.path());

    assert!(ex.extract_text(&pdf).is_err());
    assert!(!tmp.path().join("f42.pdf.txt").exists());
}

/// A `convert` stand-in that writes `size` bytes to its last argument.
fn fake_convert(dir: &Path, size: usize) -> PathBuf {
    fake_tool(
        dir,
        &format!("convert-{size}"),
        &format!("for a; do out=\"$a\"; done\nhead -c {size} /dev/zero > \"$out\""),
    )
}

#[test]
fn thumbnail_at_blank_floor_is_dropped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let convert = fake_convert(tmp.path(), 3000);
    let ex = extractor(&convert, &convert, 5);
    let pdf = staged_pdf(tmp.path());

    assert_eq!(ex.extract_image(&pdf, 0).expect("extract"), None);
    assert!(!tmp.path().join("f42.pdf.jpg").exists());
}

#[test]
fn thumbnail_above_blank_floor_is_kept() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let convert = fake_convert(tmp.path(), 3001);
    let ex = extractor(&convert, &convert, 5);
    let pdf = staged_pdf(tmp.path());

    let jpg = ex.extract_image(&pdf, 0).expect("extract").expect("page image");
    assert_eq!(jpg, tmp.path().join("f42.pdf.jpg"));
    assert_eq!(std::fs::metadata(&jpg).expect("stat").len(), 3001);
}

#[test]
fn later_pages_get_their_own_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let convert = fake_convert(tmp.path(), 4096);
    let ex = extractor(&convert, &convert, 5);
    let pdf = staged_pdf(tmp.path());

    let jpg = ex.extract_image(&pdf, 2).expect("extract").expect("page image");
    assert_eq!(jpg, tmp.path().join("f42.pdf.2.jpg"));
}

#[test]
fn failed_render_means_no_image() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let convert = fake_tool(tmp.path(), "convert", "echo 'no decode delegate' >&2\nexit 1");
    let ex = extractor(&convert, &convert, 5);
    let pdf = staged_pdf(tmp.path());

    assert_eq!(ex.extract_image(&pdf, 0).expect("extract"), None);
}
