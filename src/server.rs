use crate::{
    classifier::UrlClassifier,
    ensemble::Ensemble,
    plan::ModeSet,
    report::UrlPredictions,
    stats::Stats,
};
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub ensemble: Ensemble,
    pub urls: UrlClassifier,
    pub stats: Arc<Stats>,
    pub default_mode: String,
}

const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/", "liveness probe"),
    ("GET", "/api/list", "this listing"),
    ("GET", "/stats", "request and classifier counters"),
    (
        "POST",
        "/classify/research-pub/url",
        "classify URLs from a JSON body {\"urls\": [...]}",
    ),
    (
        "POST",
        "/classify/research-pub/{mode}",
        "classify the multipart field pdf_content; mode is auto, all or a comma list of image,linear,bert",
    ),
    (
        "POST",
        "/classify/research-pub",
        "classify the multipart field pdf_content with the default mode",
    ),
];

pub fn router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(|| async { "okay!" }))
        .route("/api/list", get(api_list))
        .route("/stats", get(stats))
        .route("/classify/research-pub/url", post(classify_urls))
        .route("/classify/research-pub", post(classify_pdf_default))
        .route("/classify/research-pub/{mode}", post(classify_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve(bind: &str, body_limit: usize, state: Arc<AppState>) -> Result<()> {
    let app = router(state, body_limit);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "http server")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match terminate_signal() {
            Ok(sig) => sig.await,
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received; shutting down"),
        _ = terminate => info!("SIGTERM received; shutting down"),
    }
}

/// Registers for SIGTERM immediately; the returned future resolves on delivery.
#[cfg(unix)]
fn terminate_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sig = signal(SignalKind::terminate())?;
    Ok(async move {
        sig.recv().await;
    })
}

fn client_error(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": msg.into() })),
    )
        .into_response()
}

fn server_error(msg: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": msg.into() })),
    )
        .into_response()
}

async fn api_list() -> Json<serde_json::Value> {
    let routes: Vec<_> = ROUTES
        .iter()
        .map(|(method, path, doc)| serde_json::json!({"method": method, "path": path, "doc": doc}))
        .collect();
    Json(serde_json::json!({ "count": routes.len(), "routes": routes }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<crate::stats::StatsSnapshot> {
    Json(state.stats.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub urls: Option<Vec<String>>,
}

async fn classify_urls(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UrlRequest>,
) -> Response {
    let Some(urls) = req.urls else {
        return client_error("missing urls");
    };
    let worker = Arc::clone(&state);
    let joined = tokio::task::spawn_blocking(move || {
        let mut out = UrlPredictions::default();
        for url in urls {
            worker.stats.url_request();
            let score = worker.urls.classify_url(&url);
            out.predictions.insert(url, score);
        }
        out
    })
    .await;

    match joined {
        Ok(out) => {
            debug!("url predictions={:?}", out.predictions);
            Json(out).into_response()
        }
        Err(e) => server_error(format!("url classification task failed: {e}")),
    }
}

async fn classify_pdf_default(state: State<Arc<AppState>>, multipart: Multipart) -> Response {
    let mode = state.default_mode.clone();
    classify_pdf(state, Path(mode), multipart).await
}

async fn classify_pdf(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    multipart: Multipart,
) -> Response {
    debug!("mode={mode}");
    let upload = match read_pdf_field(multipart).await {
        Ok(Some(u)) => u,
        Ok(None) => return client_error("missing pdf_content"),
        Err(msg) => return client_error(msg),
    };

    let modes = ModeSet::parse(&mode);
    let worker = Arc::clone(&state);
    let joined = tokio::task::spawn_blocking(move || {
        worker
            .ensemble
            .classify_pdf(&modes, &upload.data, &upload.filename)
    })
    .await;

    match joined {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e)) => {
            error!("classification failed: {e:#}");
            server_error(format!("{e:#}"))
        }
        Err(e) => server_error(format!("classification task failed: {e}")),
    }
}

struct Upload {
    filename: String,
    data: Vec<u8>,
}

async fn read_pdf_field(mut multipart: Multipart) -> Result<Option<Upload>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("failed to read form field: {e}"))?
    {
        if field.name() != Some("pdf_content") {
            field
                .bytes()
                .await
                .map_err(|e| format!("failed to read form field: {e}"))?;
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("failed to read pdf_content: {e}"))?
            .to_vec();
        return Ok(Some(Upload { filename, data }));
    }
    Ok(None)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sigterm_resolves_the_shutdown_listener() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let term = terminate_signal().unwrap();
            let pid = std::process::id().to_string();
            let sent = std::process::Command::new("sh")
                .args(["-c", "kill -TERM \"$1\"", "sh", &pid])
                .status()
                .unwrap();
            assert!(sent.success());
            tokio::time::timeout(Duration::from_secs(5), term)
                .await
                .expect("SIGTERM should resolve the listener");
        });
    }
}
