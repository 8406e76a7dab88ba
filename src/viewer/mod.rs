//! Local browser viewer for batch request files.
//!
//! Serves one page plus a `/record?idx=N` JSON endpoint over the records of a
//! `batch_input.jsonl`, so strips and prompts can be checked before a batch
//! is submitted.

mod page;
mod record;

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

pub use page::render_page;
pub use record::{load_jsonl, RecordView};

/// Default port of the viewer.
pub const DEFAULT_VIEWER_PORT: u16 = 8765;

#[derive(Clone)]
struct ViewerState {
    records: Arc<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RecordQuery {
    #[serde(default)]
    idx: i64,
}

async fn index(State(state): State<ViewerState>) -> Html<String> {
    Html(render_page(state.records.len()))
}

async fn record(
    State(state): State<ViewerState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordView>, StatusCode> {
    let last = state.records.len().checked_sub(1).ok_or(StatusCode::NOT_FOUND)?;
    let idx = usize::try_from(query.idx.max(0)).unwrap_or(0).min(last);
    Ok(Json(RecordView::from_request(&state.records[idx])))
}

/// Routes of the viewer. Unknown paths fall through to 404.
pub fn router(records: Vec<Value>) -> Router {
    let state = ViewerState {
        records: Arc::new(records),
    };
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/record", get(record))
        .with_state(state)
}

/// Load `jsonl` and serve it on `localhost:port` until Ctrl+C.
///
/// An empty file logs a warning and returns without serving.
pub async fn serve(jsonl: &Path, port: u16) -> anyhow::Result<()> {
    let records = load_jsonl(jsonl)?;
    tracing::info!(records = records.len(), path = %jsonl.display(), "Loaded request records");

    if records.is_empty() {
        tracing::warn!(
            path = %jsonl.display(),
            "Request file is empty; run `contact-forge prepare` first"
        );
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(("localhost", port)).await?;
    tracing::info!(url = %format!("http://localhost:{}", port), "Viewer listening (Ctrl+C to stop)");

    axum::serve(listener, router(records))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Viewer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn spawn(records: Vec<Value>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router(records)).await.expect("serve");
        });
        format!("http://{}", addr)
    }

    fn records() -> Vec<Value> {
        (0..3)
            .map(|i| json!({"custom_id": format!("ep000000_fr{:06}", i * 10), "body": {"model": "m"}}))
            .collect()
    }

    #[tokio::test]
    async fn test_routes() {
        let base = spawn(records()).await;
        let client = reqwest::Client::new();

        let page = client.get(format!("{}/", base)).send().await.expect("index");
        assert_eq!(page.status(), 200);
        assert!(page.text().await.expect("body").contains("window.__TOTAL__ = 3;"));

        let alias = client.get(format!("{}/index.html", base)).send().await.expect("alias");
        assert_eq!(alias.status(), 200);

        let missing = client.get(format!("{}/nope", base)).send().await.expect("404");
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn test_record_index_is_clamped() {
        let base = spawn(records()).await;
        let client = reqwest::Client::new();

        for (idx, expected) in [("1", "ep000000_fr000010"), ("99", "ep000000_fr000020"), ("-5", "ep000000_fr000000")] {
            let view: Value = client
                .get(format!("{}/record?idx={}", base, idx))
                .send()
                .await
                .expect("record")
                .json()
                .await
                .expect("json");
            assert_eq!(view["custom_id"], expected, "idx={idx}");
        }

        let view: Value = client
            .get(format!("{}/record", base))
            .send()
            .await
            .expect("record")
            .json()
            .await
            .expect("json");
        assert_eq!(view["custom_id"], "ep000000_fr000000");
        assert_eq!(view["image_mime"], "image/jpeg");
    }

    #[tokio::test]
    async fn test_serve_empty_file_returns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "\n").expect("write");
        serve(&path, 0).await.expect("serve");
    }
}
