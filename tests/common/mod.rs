// Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use higit_core::config::{HostCertPolicy, IdentitySettings};
use higit_core::git::RepoSession;
use higit_core::ssh::IdentityManager;

/// Seconds since the epoch of the first fixture commit; each later commit is
/// one minute newer so time-sorted walks are deterministic.
pub const BASE_TIME: i64 = 1_700_000_000;

/// Create a temporary non-bare repository with a configured user.
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Write `files` into the work tree, stage them and commit on HEAD.
///
/// `tick` offsets the commit time from `BASE_TIME` in minutes.
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str, tick: i64) -> Oid {
    let sig = Signature::new(
        "Test User",
        "test@example.com",
        &Time::new(BASE_TIME + tick * 60, 0),
    )
    .unwrap();

    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Commit `count` single-file changes, returning ids oldest first.
pub fn add_linear_history(repo: &Repository, count: usize) -> Vec<Oid> {
    (0..count)
        .map(|i| {
            let content = format!("revision {i}\n");
            add_commit(
                repo,
                &[("file.txt", content.as_bytes())],
                &format!("Commit {i}"),
                i as i64,
            )
        })
        .collect()
}

/// Name of the branch HEAD points at (`master` or `main` depending on the
/// local git configuration).
pub fn head_branch(repo: &Repository) -> String {
    repo.head().unwrap().shorthand().unwrap().to_string()
}

/// A session with no SSH identity; enough for local-path remotes.
pub fn new_session() -> RepoSession {
    let identity = Arc::new(IdentityManager::new(IdentitySettings::default()));
    RepoSession::new(identity, HostCertPolicy::Strict)
}

/// A source repository with commits plus a session connected to it through a
/// bare mirror directory.
pub struct RemoteFixture {
    pub source_dir: TempDir,
    pub source: Repository,
    pub mirror_dir: TempDir,
    pub session: RepoSession,
}

impl RemoteFixture {
    pub fn new() -> Self {
        let (source_dir, _, source) = create_test_repo();
        let mirror_dir = TempDir::new().unwrap();
        Self {
            source_dir,
            source,
            mirror_dir,
            session: new_session(),
        }
    }

    pub fn url(&self) -> String {
        self.source_dir.path().to_string_lossy().into_owned()
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.mirror_dir.path().join("mirror.git")
    }

    pub fn connect(&self) {
        self.session
            .connect_remote(&self.url(), &self.mirror_path())
            .unwrap();
    }
}
