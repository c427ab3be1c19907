//! API route handlers - maps HTTP endpoints to `Core` operations.
//!
//! Each submodule defines routes for a feature area:
//! - `repository`: system init, repository init and deletion
//! - `branches`: remote branch and tag listing
//! - `commits`: paginated commit history
//! - `tree`: flattened file tree and file content
//! - `fetch`: fetch with progress streamed as Server-Sent Events
//! - `ssh`: the public half of the SSH identity
//!
//! Handlers answer with the operation's `Envelope`. Malformed queries or
//! bodies are rejected with an `InvalidArgument` envelope and HTTP 400.

pub mod branches;
pub mod commits;
pub mod fetch;
pub mod repository;
pub mod ssh;
pub mod tree;

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use serde::Deserialize;

use crate::core::Core;
use crate::error::{AppError, Result};
use crate::models::Envelope;

pub type SharedCore = Arc<Core>;

pub fn create_router(core: SharedCore) -> Router {
    Router::new()
        .merge(repository::routes(core.clone()))
        .merge(branches::routes(core.clone()))
        .merge(commits::routes(core.clone()))
        .merge(tree::routes(core.clone()))
        .merge(fetch::routes(core.clone()))
        .merge(ssh::routes(core))
}

/// `?repoUrl=` shared by the read-only repository endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoQuery {
    pub repo_url: String,
}

pub(crate) fn default_branch() -> String {
    "HEAD".to_string()
}

/// Run a blocking `Core` operation on the blocking thread pool.
pub(crate) async fn run_blocking<F>(core: SharedCore, op: F) -> Result<Envelope>
where
    F: FnOnce(&Core) -> Envelope + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&core))
        .await
        .map_err(|e| AppError::Internal(format!("worker task failed: {e}")))
}

pub(crate) fn invalid_query(rejection: QueryRejection) -> AppError {
    AppError::InvalidArgument(rejection.body_text())
}

pub(crate) fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidArgument(rejection.body_text())
}
