//! Git repository access built on libgit2.
//!
//! - `session`: one repository bound to one remote
//! - `registry`: sessions keyed by remote URL
//! - `resolve`, `history`, `tree`: read-only object graph helpers
//! - `transport`: credential and certificate callbacks
//! - `diagnostics`: classification of engine failures
//! - `engine`: process-wide libgit2 options

pub mod diagnostics;
pub mod engine;
pub mod history;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod transport;
pub mod tree;

pub use registry::SessionRegistry;
pub use session::{FetchRequest, RepoSession};
