//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure the repository sessions, the SSH
//! identity subsystem and the host bridge can report. Engine failures carry a
//! classified `GitErrorInfo` so the caller gets a category, a code and a
//! suggested remedy instead of a bare libgit2 message.
//!
//! `AppError` implements Axum's `IntoResponse`, producing the same
//! `{success, message, data}` envelope as successful calls:
//! - `PathNotFound`, `ReferenceNotFound`, `FileNotFound`, `NotInitialized` → 404
//! - `InvalidArgument`, `InvalidPath`, `NotAFile` → 400
//! - `AlreadyExists` → 409
//! - `Remote`, `NoSuitableCredential` → 502
//! - everything else → 500

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::git::diagnostics::GitErrorInfo;
use crate::models::Envelope;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Repository already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Repository(GitErrorInfo),

    #[error("Cannot resolve reference: {0}")]
    ReferenceNotFound(String),

    #[error("{0}")]
    Remote(GitErrorInfo),

    #[error("No suitable credential: {0}")]
    NoSuitableCredential(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Repository not initialized: {0}")]
    NotInitialized(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Git(GitErrorInfo),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Engine failure while opening, creating or initializing a repository.
    pub fn repository(err: git2::Error) -> Self {
        AppError::Repository(GitErrorInfo::from(&err))
    }

    /// Engine failure while looking up, connecting to or fetching from a remote.
    pub fn remote(err: git2::Error) -> Self {
        AppError::Remote(GitErrorInfo::from(&err))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn lock_poisoned() -> Self {
        AppError::Internal("Lock poisoned".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::PathNotFound(_)
            | AppError::ReferenceNotFound(_)
            | AppError::FileNotFound(_)
            | AppError::NotInitialized(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) | AppError::InvalidPath(_) | AppError::NotAFile(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Remote(_) | AppError::NoSuitableCredential(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<git2::Error> for AppError {
    fn from(err: git2::Error) -> Self {
        AppError::Git(GitErrorInfo::from(&err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(Envelope::failure(self.to_string()));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
