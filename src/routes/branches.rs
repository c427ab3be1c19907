//! Remote reference listing endpoints.
//!
//! - GET /api/v1/repos/branches?repoUrl=
//!   Branch names advertised by `origin`. An empty listing is a failure
//!   carrying the session's last error.
//!
//! - GET /api/v1/repos/tags?repoUrl=
//!   Tag names advertised by `origin`; `[]` when there are none.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};

use super::{invalid_query, run_blocking, RepoQuery, SharedCore};
use crate::error::Result;
use crate::models::Envelope;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/repos/branches", get(list_branches))
        .route("/api/v1/repos/tags", get(list_tags))
        .with_state(core)
}

async fn list_branches(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<RepoQuery>, QueryRejection>,
) -> Result<Json<Envelope>> {
    let Query(query) = query.map_err(invalid_query)?;
    let envelope = run_blocking(core, move |core| core.get_branches(&query.repo_url)).await?;
    Ok(Json(envelope))
}

async fn list_tags(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<RepoQuery>, QueryRejection>,
) -> Result<Json<Envelope>> {
    let Query(query) = query.map_err(invalid_query)?;
    let envelope = run_blocking(core, move |core| core.get_tags(&query.repo_url)).await?;
    Ok(Json(envelope))
}
