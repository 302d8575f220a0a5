use anyhow::Result;
use pdf_trio::{
    classifier::{Classifier, LinearModel, UrlClassifier},
    config::Config,
    ensemble::{Ensemble, Members},
    extract::Extractor,
    scratch::ScratchDir,
    server::{router, AppState},
    stats::Stats,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct TextOnly;

impl Extractor for TextOnly {
    fn extract_text(&self, _pdf: &Path) -> Result<String> {
        Ok("lorem ipsum dolor sit amet ".repeat(20))
    }

    fn extract_image(&self, _pdf: &Path, _page: u32) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

struct Fixed(f64);

impl Classifier for Fixed {
    type Input = [String];

    fn classify(&self, _tokens: &[String]) -> f64 {
        self.0
    }
}

struct NoPage;

impl Classifier for NoPage {
    type Input = Path;

    fn classify(&self, _jpg: &Path) -> f64 {
        panic!("image member should not run without a page image");
    }
}

/// Research for arxiv links, other for everything else.
struct HostRule;

impl LinearModel for HostRule {
    fn predict(&self, text: &str) -> Result<(String, f64)> {
        if text.contains("arxiv.org") {
            Ok(("__label__research".into(), 0.9))
        } else {
            Ok(("__label__other".into(), 0.8))
        }
    }
}

struct Service {
    base: String,
    client: reqwest::blocking::Client,
    _tmp: tempfile::TempDir,
}

fn service() -> Service {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = Config::default();
    let scratch = Arc::new(ScratchDir::create(tmp.path()).expect("scratch"));
    let stats = Arc::new(Stats::default());
    let members = Members {
        image: Box::new(NoPage),
        linear: Box::new(Fixed(0.96)),
        bert: Box::new(Fixed(0.7)),
    };
    let ensemble = Ensemble::new(&cfg, scratch, Box::new(TextOnly), members, Arc::clone(&stats));
    let state = Arc::new(AppState {
        ensemble,
        urls: UrlClassifier::new(Arc::new(HostRule)),
        stats,
        default_mode: "auto".into(),
    });
    let app = router(state, 1024 * 1024);

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("nonblocking");
    let addr = listener.local_addr().expect("addr");
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            axum::serve(listener, app).await.expect("serve");
        });
    });

    Service {
        base: format!("http://{addr}"),
        client: reqwest::blocking::Client::new(),
        _tmp: tmp,
    }
}

const BOUNDARY: &str = "pdftrioboundary";

fn multipart(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"paper.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post_pdf(svc: &Service, path: &str, field: &str) -> reqwest::blocking::Response {
    svc.client
        .post(format!("{}{path}", svc.base))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart(field, b"%PDF-1.4 test"))
        .send()
        .expect("request")
}

#[test]
fn liveness_and_listing() {
    let svc = service();
    let body = svc
        .client
        .get(format!("{}/", svc.base))
        .send()
        .expect("get /")
        .text()
        .expect("text");
    assert_eq!(body, "okay!");

    let list: Value = svc
        .client
        .get(format!("{}/api/list", svc.base))
        .send()
        .expect("get list")
        .json()
        .expect("json");
    assert_eq!(list["count"], 6);
}

#[test]
fn pdf_with_explicit_mode() {
    let svc = service();
    let resp = post_pdf(&svc, "/classify/research-pub/linear,bert", "pdf_content");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().expect("json");
    assert_eq!(body["linear"], 0.96);
    assert_eq!(body["bert"], 0.7);
    assert!(body.get("image").is_none());
    assert!((body["is_research"].as_f64().unwrap() - 0.83).abs() < 1e-9);
    assert_eq!(body["version"]["linear"], "20190720");
}

#[test]
fn pdf_with_default_mode_runs_auto() {
    let svc = service();
    let resp = post_pdf(&svc, "/classify/research-pub", "pdf_content");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().expect("json");
    assert_eq!(body["linear"], 0.96);
    assert!(body.get("bert").is_none());
    assert_eq!(body["is_research"], 0.96);
}

#[test]
fn pdf_without_content_field_is_rejected() {
    let svc = service();
    let resp = post_pdf(&svc, "/classify/research-pub/all", "attachment");
    assert_eq!(resp.status(), 400);
}

#[test]
fn urls_are_scored_individually() {
    let svc = service();
    let body: Value = svc
        .client
        .post(format!("{}/classify/research-pub/url", svc.base))
        .json(&json!({ "urls": [
            "https://arxiv.org/pdf/1706.03762.pdf",
            "https://example.com/menu.pdf"
        ]}))
        .send()
        .expect("post urls")
        .json()
        .expect("json");

    let preds = &body["predictions"];
    assert!((preds["https://arxiv.org/pdf/1706.03762.pdf"].as_f64().unwrap() - 0.95).abs() < 1e-12);
    assert!((preds["https://example.com/menu.pdf"].as_f64().unwrap() - 0.1).abs() < 1e-12);

    let stats: Value = svc
        .client
        .get(format!("{}/stats", svc.base))
        .send()
        .expect("get stats")
        .json()
        .expect("json");
    assert_eq!(stats["url_requests"], 2);
}

#[test]
fn url_request_without_urls_is_rejected() {
    let svc = service();
    let resp = svc
        .client
        .post(format!("{}/classify/research-pub/url", svc.base))
        .json(&json!({ "links": [] }))
        .send()
        .expect("post");
    assert_eq!(resp.status(), 400);
}

#[test]
fn truncated_form_field_is_rejected() {
    let svc = service();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhalf a fie"
    );
    let resp = svc
        .client
        .post(format!("{}/classify/research-pub/all", svc.base))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .send()
        .expect("request");
    assert_eq!(resp.status(), 400);
    let stats: Value = svc
        .client
        .get(format!("{}/stats", svc.base))
        .send()
        .expect("get stats")
        .json()
        .expect("json");
    assert_eq!(stats["pdf_requests"], 0);
}
