//! System and repository lifecycle endpoints.
//!
//! - POST /api/v1/system/init { basePath }
//!   Records the files directory and loads or creates the SSH identity.
//!
//! - POST /api/v1/repos { basePath, repoUrl, repoName, provider }
//!   Binds a bare repository under `<basePath>/repos/<provider>/<repoName>`
//!   to `repoUrl`. Re-initializing a known URL is a no-op.
//!
//! - DELETE /api/v1/repos { basePath, repoUrl, repoName, provider }
//!   Drops the session and removes the repository directory.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{invalid_body, run_blocking, SharedCore};
use crate::core::RepoLocation;
use crate::error::Result;
use crate::models::Envelope;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/system/init", post(init_system))
        .route("/api/v1/repos", post(init_repo).delete(delete_repo))
        .with_state(core)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitSystemRequest {
    base_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoRequest {
    base_path: String,
    repo_url: String,
    repo_name: String,
    provider: String,
}

impl RepoRequest {
    fn location(&self) -> RepoLocation<'_> {
        RepoLocation {
            base_path: &self.base_path,
            repo_url: &self.repo_url,
            repo_name: &self.repo_name,
            provider: &self.provider,
        }
    }
}

async fn init_system(
    State(core): State<SharedCore>,
    request: std::result::Result<Json<InitSystemRequest>, JsonRejection>,
) -> Result<Json<Envelope>> {
    let Json(request) = request.map_err(invalid_body)?;
    let envelope = run_blocking(core, move |core| core.init_system(&request.base_path)).await?;
    Ok(Json(envelope))
}

async fn init_repo(
    State(core): State<SharedCore>,
    request: std::result::Result<Json<RepoRequest>, JsonRejection>,
) -> Result<Json<Envelope>> {
    let Json(request) = request.map_err(invalid_body)?;
    let envelope = run_blocking(core, move |core| core.init_repo(request.location())).await?;
    Ok(Json(envelope))
}

async fn delete_repo(
    State(core): State<SharedCore>,
    request: std::result::Result<Json<RepoRequest>, JsonRejection>,
) -> Result<Json<Envelope>> {
    let Json(request) = request.map_err(invalid_body)?;
    let envelope = run_blocking(core, move |core| core.delete_repo(request.location())).await?;
    Ok(Json(envelope))
}
