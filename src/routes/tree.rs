use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{default_branch, invalid_query, run_blocking, SharedCore};
use crate::error::Result;
use crate::models::Envelope;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/repos/tree", get(get_tree))
        .route("/api/v1/repos/file", get(get_file_content))
        .with_state(core)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeQuery {
    repo_url: String,
    #[serde(default = "default_branch")]
    branch: String,
}

async fn get_tree(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<TreeQuery>, QueryRejection>,
) -> Result<Json<Envelope>> {
    let Query(query) = query.map_err(invalid_query)?;
    let envelope =
        run_blocking(core, move |core| core.get_file_tree(&query.repo_url, &query.branch)).await?;
    Ok(Json(envelope))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileQuery {
    repo_url: String,
    #[serde(default = "default_branch")]
    branch: String,
    path: String,
}

async fn get_file_content(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<FileQuery>, QueryRejection>,
) -> Result<Json<Envelope>> {
    let Query(query) = query.map_err(invalid_query)?;
    let envelope = run_blocking(core, move |core| {
        core.read_file(&query.repo_url, &query.branch, &query.path)
    })
    .await?;
    Ok(Json(envelope))
}
