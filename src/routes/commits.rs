use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{default_branch, invalid_query, run_blocking, SharedCore};
use crate::error::Result;
use crate::git::session::DEFAULT_HISTORY_COUNT;
use crate::models::Envelope;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/repos/history", get(get_history))
        .with_state(core)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    repo_url: String,
    #[serde(default = "default_branch")]
    branch: String,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default)]
    offset: usize,
}

fn default_count() -> usize {
    DEFAULT_HISTORY_COUNT
}

async fn get_history(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Envelope>> {
    let Query(query) = query.map_err(invalid_query)?;
    let envelope = run_blocking(core, move |core| {
        core.history(&query.repo_url, &query.branch, query.count, query.offset)
    })
    .await?;
    Ok(Json(envelope))
}
