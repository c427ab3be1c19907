//! Boundary operations exposed to the host.
//!
//! `Core` owns the session registry and the SSH identity and turns every
//! operation into an `Envelope`; no error crosses this boundary. The HTTP
//! bridge in `routes` is a thin adapter over these methods.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::git::session::ORIGIN;
use crate::git::{FetchRequest, RepoSession, SessionRegistry, engine};
use crate::models::{Envelope, FetchEvent, SshKeyInfo};
use crate::ssh::IdentityManager;

const REPOS_DIR: &str = "repos";

/// Where `init_repo` keeps the bare repository for `provider`/`repo_name`.
pub fn repo_dir(base_path: &Path, provider: &str, repo_name: &str) -> PathBuf {
    base_path.join(REPOS_DIR).join(provider).join(repo_name)
}

/// Arguments of `init_repo` and `delete_repo`.
#[derive(Debug, Clone, Copy)]
pub struct RepoLocation<'a> {
    pub base_path: &'a str,
    pub repo_url: &'a str,
    pub repo_name: &'a str,
    pub provider: &'a str,
}

impl RepoLocation<'_> {
    fn validate(&self) -> Result<PathBuf> {
        for (field, value) in [
            ("basePath", self.base_path),
            ("repoUrl", self.repo_url),
            ("repoName", self.repo_name),
            ("provider", self.provider),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidArgument(format!("{field} is empty")));
            }
        }
        for (field, value) in [("repoName", self.repo_name), ("provider", self.provider)] {
            let escapes = Path::new(value)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if escapes {
                return Err(AppError::InvalidArgument(format!(
                    "{field} must be a relative name: {value}"
                )));
            }
        }
        Ok(repo_dir(Path::new(self.base_path), self.provider, self.repo_name))
    }
}

pub struct Core {
    config: AppConfig,
    registry: SessionRegistry,
    identity: Arc<IdentityManager>,
    base_path: RwLock<Option<PathBuf>>,
}

impl Core {
    pub fn new(config: AppConfig) -> Self {
        let identity = Arc::new(IdentityManager::new(config.identity.clone()));
        Self {
            base_path: RwLock::new(config.base_path.clone()),
            registry: SessionRegistry::new(),
            identity,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn identity(&self) -> &Arc<IdentityManager> {
        &self.identity
    }

    pub fn base_path(&self) -> Option<PathBuf> {
        self.base_path.read().ok().and_then(|p| p.clone())
    }

    /// Record the application files directory, apply engine options and
    /// load or create the SSH identity.
    pub fn init_system(&self, base_path: &str) -> Envelope {
        respond("initSystem", self.try_init_system(base_path), |key| {
            info!("System initialized, identity {}", key.fingerprint);
            Envelope::success("System initialized")
        })
    }

    fn try_init_system(&self, base_path: &str) -> Result<SshKeyInfo> {
        if base_path.trim().is_empty() {
            return Err(AppError::InvalidArgument("basePath is empty".to_string()));
        }
        let base = PathBuf::from(base_path);
        fs::create_dir_all(&base).map_err(|e| AppError::io(&base, e))?;

        {
            let mut current = self.base_path.write().map_err(|_| AppError::lock_poisoned())?;
            *current = Some(base.clone());
        }
        engine::configure(&self.config.engine, Some(&base))?;
        self.identity.ensure_identity(&base)
    }

    /// Bind a session for `repo_url`. A URL that already has a session is a
    /// successful no-op.
    pub fn init_repo(&self, location: RepoLocation<'_>) -> Envelope {
        respond("initRepo", self.try_init_repo(location), |_| {
            Envelope::success("Repository initialized")
        })
    }

    fn try_init_repo(&self, location: RepoLocation<'_>) -> Result<Arc<RepoSession>> {
        let dir = location.validate()?;
        self.registry.get_or_try_insert_with(location.repo_url, || {
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;
            }
            let session = RepoSession::new(Arc::clone(&self.identity), self.config.cert_policy);
            session.connect_remote(location.repo_url, &dir)?;
            info!("Repository {} bound at {}", location.repo_url, dir.display());
            Ok(session)
        })
    }

    pub fn get_branches(&self, repo_url: &str) -> Envelope {
        let session = match self.session(repo_url) {
            Ok(session) => session,
            Err(e) => return failure("getBranches", e),
        };
        match session.remote_branches(ORIGIN) {
            Ok(branches) if branches.is_empty() => {
                let reason = session.last_error();
                error!("getBranches failed: {}", reason);
                Envelope::failure(reason)
            }
            result => respond("getBranches", result, |branches| {
                let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
                Envelope::json("Branches loaded", &names)
            }),
        }
    }

    pub fn get_tags(&self, repo_url: &str) -> Envelope {
        let result = self
            .session(repo_url)
            .and_then(|session| session.remote_tags(ORIGIN));
        respond("getTags", result, |tags| {
            let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
            Envelope::json("Tags loaded", &names)
        })
    }

    /// Fetch `branch` with full history, reporting `start`, `progress` and
    /// `end` events to `events`. An empty branch or an unknown URL fails
    /// before `start` is sent.
    pub fn fetch(
        &self,
        repo_url: &str,
        branch: &str,
        events: &mut dyn FnMut(FetchEvent),
        cancel: &CancellationToken,
    ) -> Envelope {
        if branch.trim().is_empty() {
            return failure("fetch", AppError::InvalidArgument("branch is empty".to_string()));
        }
        let session = match self.session(repo_url) {
            Ok(session) => session,
            Err(e) => return failure("fetch", e),
        };

        events(FetchEvent::Start);
        let request = FetchRequest {
            depth: 0,
            ..FetchRequest::branch(branch)
        };
        let result = {
            let mut forward = |progress| events(FetchEvent::Progress(progress));
            session.fetch(&request, Some(&mut forward), cancel)
        };
        let envelope = respond("fetch", result, |_| Envelope::success("Branch fetched"));
        events(FetchEvent::End(envelope.clone()));
        envelope
    }

    pub fn history(&self, repo_url: &str, branch: &str, count: usize, offset: usize) -> Envelope {
        let result = self
            .session(repo_url)
            .and_then(|session| session.commit_history(branch, count, offset));
        respond("history", result, |commits| {
            Envelope::json("History loaded", &commits)
        })
    }

    pub fn get_ssh_key(&self) -> Envelope {
        match self.identity.public_key() {
            Some(key) => Envelope::with_data("SSH key loaded", key),
            None => failure(
                "getSSHKey",
                AppError::NotInitialized("SSH identity; call initSystem first".to_string()),
            ),
        }
    }

    /// Replace the SSH identity under the current base path.
    pub fn generate_ssh_key(&self) -> Envelope {
        let result = self
            .base_path()
            .ok_or_else(|| AppError::NotInitialized("base path; call initSystem first".to_string()))
            .and_then(|base| self.identity.regenerate(&base));
        respond("generateSSHKey", result, |key| {
            Envelope::with_data("SSH key generated", key.public_key)
        })
    }

    /// Forget the session for `repo_url` and remove its directory.
    pub fn delete_repo(&self, location: RepoLocation<'_>) -> Envelope {
        let result = location.validate().and_then(|dir| {
            self.registry.delete(location.repo_url)?;
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;
                info!("Deleted {}", dir.display());
            }
            Ok(())
        });
        respond("deleteRepo", result, |_| Envelope::success("Repository deleted"))
    }

    pub fn get_file_tree(&self, repo_url: &str, branch: &str) -> Envelope {
        let result = self
            .session(repo_url)
            .and_then(|session| session.branch_file_tree(branch, ""));
        respond("getFileTree", result, |nodes| {
            Envelope::json("File tree loaded", &nodes)
        })
    }

    pub fn read_file(&self, repo_url: &str, branch: &str, path: &str) -> Envelope {
        let result = self.session(repo_url).and_then(|session| {
            let content = session.read_file(branch, path)?;
            if content.is_binary {
                return Err(AppError::NotAFile(format!(
                    "{path}: binary file cannot be displayed"
                )));
            }
            Ok(content)
        });
        respond("readFile", result, |content| {
            Envelope::with_data("File loaded", content.text().into_owned())
        })
    }

    /// Drop every live session.
    pub fn shutdown(&self) {
        match self.registry.clear() {
            Ok(count) => info!("Closed {} repository session(s)", count),
            Err(e) => error!("Failed to close sessions: {}", e),
        }
    }

    fn session(&self, repo_url: &str) -> Result<Arc<RepoSession>> {
        self.registry
            .find(repo_url)?
            .ok_or_else(|| AppError::NotInitialized(repo_url.to_string()))
    }
}

fn respond<T>(operation: &str, result: Result<T>, on_success: impl FnOnce(T) -> Envelope) -> Envelope {
    match result {
        Ok(value) => on_success(value),
        Err(e) => failure(operation, e),
    }
}

fn failure(operation: &str, err: AppError) -> Envelope {
    error!("{} failed: {}", operation, err);
    Envelope::failure(err.to_string())
}
