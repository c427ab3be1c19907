use git2::{Oid, Repository, Sort};
use tracing::debug;

use crate::error::Result;
use crate::models::CommitInfo;

/// Walk the commit graph from `start`, newest first.
///
/// Exactly `offset` entries are skipped (fewer if the walk runs out), then up
/// to `limit` commits are collected. Commits that cannot be loaded are
/// skipped and do not count toward `limit`.
pub fn walk_history(
    repo: &Repository,
    start: Oid,
    limit: usize,
    offset: usize,
) -> Result<Vec<CommitInfo>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push(start)?;

    let mut commits = Vec::with_capacity(limit.min(256));
    let mut oids = revwalk.skip(offset);

    while commits.len() < limit {
        let oid = match oids.next() {
            Some(Ok(oid)) => oid,
            Some(Err(e)) => {
                debug!("History walk stopped early: {}", e.message());
                break;
            }
            None => break,
        };

        match repo.find_commit(oid) {
            Ok(commit) => commits.push(CommitInfo::from_commit(&commit)),
            Err(e) => debug!("Skipping unloadable commit {}: {}", oid, e.message()),
        }
    }

    Ok(commits)
}
