//! Repository session: one local repository bound to one remote URL.
//!
//! A `RepoSession` owns at most one `git2::Repository` behind a mutex. Remote
//! handles are looked up per call and dropped before the call returns, so no
//! engine handle outlives the operation that created it. Every operation
//! records its failure in `last_error`, which has its own lock and stays
//! readable while a long fetch holds the repository.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use git2::build::RepoBuilder;
use git2::{
    AutotagOption, BranchType, Direction, ErrorCode, FetchOptions, FetchPrune, Oid,
    RemoteRedirect, Repository,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_FETCH_DEPTH, HostCertPolicy};
use crate::error::{AppError, Result};
use crate::git::history::walk_history;
use crate::git::resolve::resolve_reference;
use crate::git::transport::CredentialBridge;
use crate::git::tree::flatten_tree;
use crate::models::{BranchInfo, CommitInfo, FetchProgress, FileContent, FileTreeNode, TagInfo};
use crate::ssh::IdentityManager;

pub const ORIGIN: &str = "origin";
pub const DEFAULT_HISTORY_COUNT: usize = 50;

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";
const PEELED_SUFFIX: &str = "^{}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub remote_name: String,
    /// Branch names to fetch; empty uses the remote's configured refspecs.
    pub branch_refs: Vec<String>,
    /// Shallow depth; 0 or less fetches full history.
    pub depth: i32,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            remote_name: ORIGIN.to_string(),
            branch_refs: Vec::new(),
            depth: DEFAULT_FETCH_DEPTH,
        }
    }
}

impl FetchRequest {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            branch_refs: vec![name.into()],
            ..Self::default()
        }
    }

    pub fn refspecs(&self) -> Vec<String> {
        self.branch_refs
            .iter()
            .map(|b| format!("refs/heads/{b}:refs/remotes/{}/{b}", self.remote_name))
            .collect()
    }
}

#[derive(Default)]
struct SessionState {
    repo: Option<Repository>,
    repo_path: Option<PathBuf>,
    remote_url: Option<String>,
    connected: bool,
}

pub struct RepoSession {
    identity: Arc<IdentityManager>,
    cert_policy: HostCertPolicy,
    state: Mutex<SessionState>,
    last_error: Mutex<String>,
}

impl RepoSession {
    pub fn new(identity: Arc<IdentityManager>, cert_policy: HostCertPolicy) -> Self {
        Self {
            identity,
            cert_policy,
            state: Mutex::new(SessionState::default()),
            last_error: Mutex::new(String::new()),
        }
    }

    /// Bind an existing repository, replacing any repository already bound.
    pub fn open(&self, path: &Path) -> Result<()> {
        let result = (|| -> Result<()> {
            if !path.exists() {
                return Err(AppError::PathNotFound(path.display().to_string()));
            }
            let repo = Repository::open(path).map_err(AppError::repository)?;
            let remote_url = repo
                .find_remote(ORIGIN)
                .ok()
                .and_then(|r| r.url().map(str::to_string));

            let mut state = self.lock()?;
            *state = SessionState {
                repo: Some(repo),
                repo_path: Some(path.to_path_buf()),
                remote_url,
                connected: false,
            };
            info!("Opened repository at {}", path.display());
            Ok(())
        })();
        self.record(result)
    }

    pub fn create(&self, path: &Path) -> Result<()> {
        self.record(self.init_at(path, false))
    }

    pub fn create_bare(&self, path: &Path) -> Result<()> {
        self.record(self.init_at(path, true))
    }

    fn init_at(&self, path: &Path, bare: bool) -> Result<()> {
        if Repository::open(path).is_ok() {
            return Err(AppError::AlreadyExists(path.display().to_string()));
        }
        let repo = if bare {
            Repository::init_bare(path)
        } else {
            Repository::init(path)
        }
        .map_err(AppError::repository)?;

        let mut state = self.lock()?;
        *state = SessionState {
            repo: Some(repo),
            repo_path: Some(path.to_path_buf()),
            ..SessionState::default()
        };
        info!("Created {}repository at {}", if bare { "bare " } else { "" }, path.display());
        Ok(())
    }

    /// Bind `local_path` (initializing a bare repository if needed), point
    /// `origin` at `url` and verify the remote is reachable.
    ///
    /// When only the connection fails the repository stays bound and
    /// `is_connected` reports false.
    pub fn connect_remote(&self, url: &str, local_path: &Path) -> Result<()> {
        let result = (|| -> Result<()> {
            let repo = match Repository::open(local_path) {
                Ok(repo) => repo,
                Err(_) => {
                    info!("Initializing bare repository at {}", local_path.display());
                    Repository::init_bare(local_path).map_err(AppError::repository)?
                }
            };

            match repo.remote(ORIGIN, url) {
                Ok(_) => {}
                Err(e) if e.code() == ErrorCode::Exists => {
                    debug!("Updating existing remote '{}' to {}", ORIGIN, url);
                    repo.remote_set_url(ORIGIN, url).map_err(AppError::remote)?;
                }
                Err(e) => return Err(AppError::remote(e)),
            }

            let probe = self.probe_remote(&repo, ORIGIN);

            let mut state = self.lock()?;
            *state = SessionState {
                repo: Some(repo),
                repo_path: Some(local_path.to_path_buf()),
                remote_url: Some(url.to_string()),
                connected: probe.is_ok(),
            };
            if probe.is_ok() {
                info!("Connected to {}", url);
            }
            probe
        })();
        self.record(result)
    }

    fn probe_remote(&self, repo: &Repository, remote_name: &str) -> Result<()> {
        let mut remote = repo.find_remote(remote_name).map_err(AppError::remote)?;
        let lease = self.identity.lease()?;
        let bridge = CredentialBridge::new(&lease, self.cert_policy);
        let connection = remote
            .connect_auth(Direction::Fetch, Some(bridge.remote_callbacks()), None)
            .map_err(|e| bridge.remote_error(e))?;
        drop(connection);
        Ok(())
    }

    /// Fetch from a remote into `refs/remotes/<remote>/*`.
    ///
    /// Always prunes, never downloads tags and refuses redirects. `progress`
    /// is called on this thread each time the received object count grows;
    /// a panicking sink is logged and ignored. Cancelling `cancel` aborts the
    /// transfer at the next progress tick. A requested branch that the remote
    /// does not advertise is `ReferenceNotFound`.
    pub fn fetch(
        &self,
        request: &FetchRequest,
        mut progress: Option<&mut dyn FnMut(FetchProgress)>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.with_repo(|repo| {
            let mut remote = repo
                .find_remote(&request.remote_name)
                .map_err(AppError::remote)?;
            let lease = self.identity.lease()?;
            let bridge = CredentialBridge::new(&lease, self.cert_policy);

            let mut callbacks = bridge.remote_callbacks();
            let mut last_received = 0;
            callbacks.transfer_progress(|stats| {
                if cancel.is_cancelled() {
                    return false;
                }
                if stats.received_objects() > last_received {
                    last_received = stats.received_objects();
                    let tick = FetchProgress {
                        received_objects: stats.received_objects(),
                        total_objects: stats.total_objects(),
                        indexed_objects: stats.indexed_objects(),
                        received_bytes: stats.received_bytes(),
                    };
                    if let Some(sink) = progress.as_mut() {
                        if catch_unwind(AssertUnwindSafe(|| sink(tick))).is_err() {
                            warn!("Fetch progress sink panicked; continuing");
                        }
                    }
                }
                true
            });

            let mut options = FetchOptions::new();
            options
                .remote_callbacks(callbacks)
                .prune(FetchPrune::On)
                .download_tags(AutotagOption::None)
                .follow_redirects(RemoteRedirect::None);
            if request.depth > 0 {
                options.depth(request.depth);
            }

            let refspecs = request.refspecs();
            debug!("Fetching {} with refspecs {:?}", request.remote_name, refspecs);

            match remote.fetch(&refspecs, Some(&mut options), None) {
                Ok(()) => {
                    // A refspec whose source is not advertised fetches nothing.
                    for branch in &request.branch_refs {
                        let tracking = format!("refs/remotes/{}/{branch}", request.remote_name);
                        if repo.refname_to_id(&tracking).is_err() {
                            return Err(AppError::ReferenceNotFound(format!(
                                "branch '{branch}' not found on remote '{}'",
                                request.remote_name
                            )));
                        }
                    }
                    info!("Fetch from {} complete", request.remote_name);
                    Ok(())
                }
                Err(_) if cancel.is_cancelled() => Err(AppError::Cancelled),
                Err(e) => Err(bridge.remote_error(e)),
            }
        });
        self.record(result)
    }

    /// Branches advertised by the remote.
    pub fn remote_branches(&self, remote_name: &str) -> Result<Vec<BranchInfo>> {
        let result = self.list_remote(remote_name, |heads, default_branch| {
            heads
                .iter()
                .filter_map(|(name, oid)| {
                    let short = name.strip_prefix(HEADS_PREFIX)?;
                    Some(BranchInfo {
                        name: short.to_string(),
                        target_id: oid.to_string(),
                        is_remote: true,
                        is_current: default_branch == Some(name.as_str()),
                    })
                })
                .collect::<Vec<_>>()
        });
        if let Ok(branches) = &result {
            if branches.is_empty() {
                self.set_last_error(format!("no branches advertised by remote '{remote_name}'"));
            }
        }
        self.record(result)
    }

    /// Tags advertised by the remote.
    ///
    /// A tag counts as annotated when the advertisement also carries its
    /// peeled `^{}` entry; no tag object is downloaded to check.
    pub fn remote_tags(&self, remote_name: &str) -> Result<Vec<TagInfo>> {
        let result = self.list_remote(remote_name, |heads, _| {
            let mut tags: Vec<TagInfo> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();

            for (name, oid) in heads {
                let Some(tag) = name.strip_prefix(TAGS_PREFIX) else {
                    continue;
                };
                if let Some(base) = tag.strip_suffix(PEELED_SUFFIX) {
                    if let Some(&i) = index.get(base) {
                        tags[i].peeled_id = oid.to_string();
                        tags[i].is_annotated = true;
                    }
                    continue;
                }
                index.insert(tag.to_string(), tags.len());
                tags.push(TagInfo {
                    name: tag.to_string(),
                    id: oid.to_string(),
                    peeled_id: String::new(),
                    is_annotated: false,
                });
            }
            tags
        });
        if let Ok(tags) = &result {
            if tags.is_empty() {
                self.set_last_error(format!("no tags advertised by remote '{remote_name}'"));
            }
        }
        self.record(result)
    }

    fn list_remote<T>(
        &self,
        remote_name: &str,
        collect: impl FnOnce(&[(String, Oid)], Option<&str>) -> T,
    ) -> Result<T> {
        self.with_repo(|repo| {
            let mut remote = repo.find_remote(remote_name).map_err(AppError::remote)?;
            let lease = self.identity.lease()?;
            let bridge = CredentialBridge::new(&lease, self.cert_policy);
            let connection = remote
                .connect_auth(Direction::Fetch, Some(bridge.remote_callbacks()), None)
                .map_err(|e| bridge.remote_error(e))?;

            let default_branch = connection
                .default_branch()
                .ok()
                .and_then(|buf| buf.as_str().map(str::to_string));
            let heads: Vec<(String, Oid)> = connection
                .list()
                .map_err(AppError::remote)?
                .iter()
                .map(|head| (head.name().to_string(), head.oid()))
                .collect();
            debug!("Remote '{}' advertised {} refs", remote_name, heads.len());

            Ok(collect(&heads, default_branch.as_deref()))
        })
    }

    /// A page of history starting at `branch`, newest first.
    pub fn commit_history(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
    ) -> Result<Vec<CommitInfo>> {
        let result = self.with_repo(|repo| {
            let start = resolve_commit(repo, branch)?;
            walk_history(repo, start, count, offset)
        });
        if let Ok(commits) = &result {
            if commits.is_empty() {
                self.set_last_error(format!(
                    "history retrieval failed: no commits for '{branch}' at offset {offset}"
                ));
            }
        }
        self.record(result)
    }

    /// The tree of `branch` (or of `root_path` inside it) as a flat node list.
    pub fn branch_file_tree(&self, branch: &str, root_path: &str) -> Result<Vec<FileTreeNode>> {
        let result = self.with_repo(|repo| {
            let commit = repo.find_commit(resolve_commit(repo, branch)?)?;
            let tree = commit.tree()?;

            let root_path = root_path.trim_matches('/');
            if root_path.is_empty() {
                return Ok(flatten_tree(repo, &tree, "", 1));
            }

            let entry = tree
                .get_path(Path::new(root_path))
                .map_err(|_| AppError::FileNotFound(root_path.to_string()))?;
            if entry.kind() != Some(git2::ObjectType::Tree) {
                return Err(AppError::InvalidPath(format!("{root_path} is not a directory")));
            }
            let subtree = repo.find_tree(entry.id())?;
            Ok(flatten_tree(repo, &subtree, root_path, 1))
        });
        self.record(result)
    }

    /// Read the blob at `path` in `branch`.
    pub fn read_file(&self, branch: &str, path: &str) -> Result<FileContent> {
        let result = (|| -> Result<FileContent> {
            if path.is_empty() {
                return Err(AppError::InvalidArgument("file path is empty".to_string()));
            }
            self.with_repo(|repo| {
                let commit = repo.find_commit(resolve_commit(repo, branch)?)?;
                let tree = commit.tree()?;
                let entry = tree
                    .get_path(Path::new(path))
                    .map_err(|_| AppError::FileNotFound(path.to_string()))?;
                if entry.kind() != Some(git2::ObjectType::Blob) {
                    return Err(AppError::NotAFile(path.to_string()));
                }

                let blob = repo.find_blob(entry.id())?;
                if blob.size() == 0 {
                    return Ok(FileContent {
                        exists: true,
                        ..FileContent::default()
                    });
                }
                Ok(FileContent {
                    exists: true,
                    is_binary: blob.is_binary(),
                    content: blob.content().to_vec(),
                })
            })
        })();
        self.record(result)
    }

    /// Bare clone of `url` into `local_path`; shallow when `depth > 0`.
    pub fn clone_bare(&self, url: &str, local_path: &Path, depth: i32) -> Result<()> {
        let result = (|| -> Result<()> {
            let lease = self.identity.lease()?;
            let bridge = CredentialBridge::new(&lease, self.cert_policy);
            let mut options = FetchOptions::new();
            options
                .remote_callbacks(bridge.remote_callbacks())
                .download_tags(AutotagOption::None)
                .follow_redirects(RemoteRedirect::None);
            if depth > 0 {
                options.depth(depth);
            }

            info!("Cloning {} into {}", url, local_path.display());
            let repo = RepoBuilder::new()
                .bare(true)
                .fetch_options(options)
                .clone(url, local_path)
                .map_err(|e| bridge.remote_error(e))?;

            let mut state = self.lock()?;
            *state = SessionState {
                repo: Some(repo),
                repo_path: Some(local_path.to_path_buf()),
                remote_url: Some(url.to_string()),
                connected: true,
            };
            Ok(())
        })();
        self.record(result)
    }

    pub fn local_branches(&self) -> Result<Vec<BranchInfo>> {
        let result = self.with_repo(|repo| {
            let mut branches = Vec::new();
            for item in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = item?;
                let name = match branch.name()? {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                branches.push(BranchInfo {
                    name,
                    target_id: branch.get().target().map(|o| o.to_string()).unwrap_or_default(),
                    is_remote: false,
                    is_current: branch.is_head(),
                });
            }
            Ok(branches)
        });
        self.record(result)
    }

    pub fn commit_details(&self, reference: &str) -> Result<CommitInfo> {
        let result = self.with_repo(|repo| {
            let commit = repo.find_commit(resolve_commit(repo, reference)?)?;
            Ok(CommitInfo::from_commit(&commit))
        });
        self.record(result)
    }

    pub fn create_branch(&self, name: &str, commit_id: &str) -> Result<BranchInfo> {
        let result = self.with_repo(|repo| {
            let oid = Oid::from_str(commit_id)
                .map_err(|_| AppError::InvalidArgument(format!("invalid commit id: {commit_id}")))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|_| AppError::ReferenceNotFound(commit_id.to_string()))?;
            let branch = repo.branch(name, &commit, false)?;
            info!("Created branch {} at {}", name, oid);
            Ok(BranchInfo {
                name: name.to_string(),
                target_id: oid.to_string(),
                is_remote: false,
                is_current: branch.is_head(),
            })
        });
        self.record(result)
    }

    /// Short name of the branch HEAD points at, even if it has no commits yet.
    pub fn current_branch(&self) -> Option<String> {
        let state = self.state.lock().ok()?;
        let repo = state.repo.as_ref()?;
        if let Ok(head) = repo.head() {
            return head.shorthand().map(str::to_string);
        }
        let head = repo.find_reference("HEAD").ok()?;
        head.symbolic_target()
            .map(|target| target.strip_prefix(HEADS_PREFIX).unwrap_or(target).to_string())
    }

    pub fn remote_url(&self) -> Option<String> {
        self.state.lock().ok()?.remote_url.clone()
    }

    pub fn repository_path(&self) -> Option<PathBuf> {
        self.state.lock().ok()?.repo_path.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().map(|s| s.repo.is_some()).unwrap_or(false)
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().map(|s| s.connected).unwrap_or(false)
    }

    pub fn last_error(&self) -> String {
        self.last_error
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state.lock().map_err(|_| AppError::lock_poisoned())
    }

    fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let state = self.lock()?;
        let repo = state
            .repo
            .as_ref()
            .ok_or_else(|| AppError::NotInitialized("no repository is open".to_string()))?;
        f(repo)
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.set_last_error(e.to_string());
        }
        result
    }

    fn set_last_error(&self, message: String) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = message;
        }
    }
}

fn resolve_commit(repo: &Repository, reference: &str) -> Result<Oid> {
    let oid = resolve_reference(repo, reference)?;
    let commit = repo
        .find_object(oid, None)?
        .peel_to_commit()
        .map_err(|_| AppError::ReferenceNotFound(format!("{reference} is not a commit")))?;
    Ok(commit.id())
}
