//! higit-core: repository sessions and SSH identity for a Git client.
//!
//! The library is organized around `core::Core`, which owns the session
//! registry and the SSH identity and exposes every operation as an
//! `Envelope`. `routes` adapts `Core` to an axum HTTP API.

pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod models;
pub mod routes;
pub mod ssh;

pub use crate::config::AppConfig;
pub use crate::core::{Core, RepoLocation};
pub use crate::error::{AppError, Result};
