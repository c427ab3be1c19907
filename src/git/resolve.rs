use git2::{Oid, Repository};
use tracing::debug;

use crate::error::{AppError, Result};

/// Resolve a user-supplied reference to a commit-ish object id.
///
/// Tried in order: local branch, `origin` remote-tracking branch, full
/// reference name (including `HEAD`), full-length hex object id. The first
/// interpretation that exists wins.
pub fn resolve_reference(repo: &Repository, reference: &str) -> Result<Oid> {
    let candidates = [
        format!("refs/heads/{reference}"),
        format!("refs/remotes/origin/{reference}"),
        reference.to_string(),
    ];

    for name in &candidates {
        if let Ok(oid) = repo.refname_to_id(name) {
            debug!("Resolved '{}' via {} -> {}", reference, name, oid);
            return Ok(oid);
        }
    }

    if is_full_object_id(reference) {
        if let Ok(oid) = Oid::from_str(reference) {
            if repo.find_object(oid, None).is_ok() {
                debug!("Resolved '{}' as object id", reference);
                return Ok(oid);
            }
        }
    }

    Err(AppError::ReferenceNotFound(reference.to_string()))
}

fn is_full_object_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
