//! Read-only HTTP API for browsing history and snapshots.

use crate::error::ServerResult;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use worldsync_protocol::Commit;
use worldsync_store::CommitStore;

const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Creates the API router.
pub fn router(store: Arc<CommitStore>) -> Router {
    Router::new()
        .route("/api/history/{branch}", get(history))
        .route("/api/snapshot/{commit_id}", get(snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Binds the given address and serves the API until the process exits.
pub async fn serve(addr: SocketAddr, store: Arc<CommitStore>) -> ServerResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "http api listening");
    axum::serve(listener, router(store)).await?;
    Ok(())
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<u32>,
}

async fn history(
    State(store): State<Arc<CommitStore>>,
    Path(branch): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Commit>>, StatusCode> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let commits = store.history(&branch, limit).map_err(|err| {
        tracing::error!(%branch, error = %err, "history query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(commits))
}

async fn snapshot(
    State(store): State<Arc<CommitStore>>,
    Path(commit_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    match store.snapshot(&commit_id) {
        Ok(Some(data)) => Ok((
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=snapshot_{commit_id}.zip"),
                ),
            ],
            data,
        )),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            tracing::error!(%commit_id, error = %err, "snapshot query failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
