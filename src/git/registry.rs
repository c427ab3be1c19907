use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::git::session::RepoSession;

/// Live sessions keyed by remote URL.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RepoSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` under `url`, returning the session it replaced.
    pub fn store(&self, url: &str, session: Arc<RepoSession>) -> Result<Option<Arc<RepoSession>>> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let previous = sessions.insert(url.to_string(), session);
        if previous.is_some() {
            info!("Replaced session for {}", url);
        } else {
            debug!("Registered session for {}", url);
        }
        Ok(previous)
    }

    pub fn find(&self, url: &str) -> Result<Option<Arc<RepoSession>>> {
        let sessions = self.sessions.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(sessions.get(url).cloned())
    }

    pub fn delete(&self, url: &str) -> Result<Option<Arc<RepoSession>>> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let removed = sessions.remove(url);
        if removed.is_some() {
            info!("Removed session for {}", url);
        }
        Ok(removed)
    }

    /// Return the session for `url`, building and inserting one if absent.
    ///
    /// `build` runs without the lock held. If another caller inserts first,
    /// its session is returned and the one built here is dropped.
    pub fn get_or_try_insert_with<F>(&self, url: &str, build: F) -> Result<Arc<RepoSession>>
    where
        F: FnOnce() -> Result<RepoSession>,
    {
        if let Some(existing) = self.find(url)? {
            return Ok(existing);
        }

        let candidate = Arc::new(build()?);
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let session = sessions.entry(url.to_string()).or_insert(candidate);
        Ok(Arc::clone(session))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn urls(&self) -> Vec<String> {
        self.sessions
            .read()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every session. Called on shutdown.
    pub fn clear(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let count = sessions.len();
        sessions.clear();
        Ok(count)
    }
}
