//! SSH identity endpoints.
//!
//! - GET /api/v1/ssh/key
//!   The OpenSSH public key line of the active identity. Waits while a
//!   regeneration holds the identity lock, so it also runs on the blocking pool.
//!
//! - POST /api/v1/ssh/key
//!   Replaces the identity with a freshly generated key pair and returns the
//!   new public key. Key generation is slow; it runs on the blocking pool.

use axum::{extract::State, routing::get, Json, Router};

use super::{run_blocking, SharedCore};
use crate::error::Result;
use crate::models::Envelope;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/ssh/key", get(get_key).post(generate_key))
        .with_state(core)
}

async fn get_key(State(core): State<SharedCore>) -> Result<Json<Envelope>> {
    let envelope = run_blocking(core, |core| core.get_ssh_key()).await?;
    Ok(Json(envelope))
}

async fn generate_key(State(core): State<SharedCore>) -> Result<Json<Envelope>> {
    let envelope = run_blocking(core, |core| core.generate_ssh_key()).await?;
    Ok(Json(envelope))
}
