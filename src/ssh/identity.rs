//! The process SSH identity: an RSA key pair persisted under `<base>/ssh`.
//!
//! `IdentityManager` is created once by `Core` and shared with every session
//! through an `Arc`. Remote operations take a read lease for their whole
//! duration; `regenerate` takes the write lock, so key files are never
//! rewritten while libgit2 is authenticating with them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use tracing::{info, warn};

use crate::config::IdentitySettings;
use crate::error::{AppError, Result};
use crate::models::SshKeyInfo;

use super::fingerprint::{fingerprint, is_error_fingerprint};
use super::keygen::{entropy_rng, generate_key_pair, load_private_key, public_key_pem};
use super::openssh::{RSA_KEY_TYPE, encode_public_key_pem};

const SSH_DIR: &str = "ssh";
const PRIVATE_KEY_FILE: &str = "id_rsa";
const PUBLIC_KEY_FILE: &str = "id_rsa.pub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub dir: PathBuf,
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyPaths {
    pub fn under(base: &Path) -> Self {
        let dir = base.join(SSH_DIR);
        Self {
            private_key: dir.join(PRIVATE_KEY_FILE),
            public_key: dir.join(PUBLIC_KEY_FILE),
            dir,
        }
    }
}

#[derive(Default)]
struct IdentityState {
    paths: Option<KeyPaths>,
    key: Option<SshKeyInfo>,
}

/// Read access to the active identity, held by the transport bridge.
pub struct IdentityLease<'a> {
    state: RwLockReadGuard<'a, IdentityState>,
    passphrase: &'a str,
}

impl IdentityLease<'_> {
    /// Key file locations, present only once an identity has been persisted.
    pub fn key_paths(&self) -> Option<&KeyPaths> {
        match (&self.state.paths, &self.state.key) {
            (Some(paths), Some(_)) => Some(paths),
            _ => None,
        }
    }

    pub fn passphrase(&self) -> Option<&str> {
        (!self.passphrase.is_empty()).then_some(self.passphrase)
    }
}

pub struct IdentityManager {
    settings: IdentitySettings,
    state: RwLock<IdentityState>,
}

impl IdentityManager {
    pub fn new(settings: IdentitySettings) -> Self {
        Self {
            settings,
            state: RwLock::new(IdentityState::default()),
        }
    }

    pub fn settings(&self) -> &IdentitySettings {
        &self.settings
    }

    /// Load the identity persisted under `base`, or create one if none exists.
    pub fn ensure_identity(&self, base: &Path) -> Result<SshKeyInfo> {
        let paths = KeyPaths::under(base);
        let mut state = self.state.write().map_err(|_| AppError::lock_poisoned())?;

        let key = if paths.private_key.exists() {
            info!("Loading SSH identity from {}", paths.dir.display());
            self.read_key(&paths)?
        } else {
            info!("No SSH identity under {}, generating one", paths.dir.display());
            let key = self.generate()?;
            write_key(&paths, &key)?;
            key
        };

        state.paths = Some(paths);
        state.key = Some(key.clone());
        Ok(key)
    }

    /// Replace the identity under `base` with a freshly generated key pair.
    pub fn regenerate(&self, base: &Path) -> Result<SshKeyInfo> {
        let paths = KeyPaths::under(base);
        let mut state = self.state.write().map_err(|_| AppError::lock_poisoned())?;

        for file in [&paths.private_key, &paths.public_key] {
            match fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::io(file, e)),
            }
        }
        state.key = None;

        let key = self.generate()?;
        write_key(&paths, &key)?;
        info!("Regenerated SSH identity: {}", key.fingerprint);

        state.paths = Some(paths);
        state.key = Some(key.clone());
        Ok(key)
    }

    /// Generate and validate a key pair in memory without touching disk.
    pub fn generate(&self) -> Result<SshKeyInfo> {
        let mut rng = entropy_rng();
        let pair = generate_key_pair(
            &mut rng,
            self.settings.key_bits,
            &self.settings.comment,
            &self.settings.passphrase,
        )?;
        let public_key = encode_public_key_pem(&pair.public_pem, &pair.comment)?;
        let key = SshKeyInfo {
            fingerprint: fingerprint(&public_key),
            public_key,
            private_key: pair.private_pem,
            key_type: RSA_KEY_TYPE.to_string(),
            comment: pair.comment,
        };
        validate(&key)?;
        Ok(key)
    }

    /// Load the identity from `base` without generating. Missing files are
    /// `FileNotFound`.
    pub fn load(&self, base: &Path) -> Result<SshKeyInfo> {
        let paths = KeyPaths::under(base);
        if !paths.private_key.exists() {
            return Err(AppError::FileNotFound(paths.private_key.display().to_string()));
        }
        let mut state = self.state.write().map_err(|_| AppError::lock_poisoned())?;
        let key = self.read_key(&paths)?;
        state.paths = Some(paths);
        state.key = Some(key.clone());
        Ok(key)
    }

    /// Persist the active identity under `base`.
    pub fn save(&self, base: &Path) -> Result<()> {
        let paths = KeyPaths::under(base);
        let mut state = self.state.write().map_err(|_| AppError::lock_poisoned())?;
        let key = state
            .key
            .as_ref()
            .ok_or_else(|| AppError::NotInitialized("no SSH identity to save".to_string()))?;
        write_key(&paths, key)?;
        state.paths = Some(paths);
        Ok(())
    }

    pub fn public_key(&self) -> Option<String> {
        self.read_state(|key| key.public_key.clone())
    }

    pub fn fingerprint(&self) -> Option<String> {
        self.read_state(|key| key.fingerprint.clone())
    }

    pub fn key_info(&self) -> Option<SshKeyInfo> {
        self.read_state(SshKeyInfo::clone)
    }

    pub fn key_paths(&self) -> Option<KeyPaths> {
        self.state.read().ok().and_then(|state| state.paths.clone())
    }

    /// Whether the active identity is complete and well-formed.
    pub fn validate(&self) -> bool {
        self.read_state(|key| validate(key).is_ok()).unwrap_or(false)
    }

    pub fn lease(&self) -> Result<IdentityLease<'_>> {
        let state = self.state.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(IdentityLease {
            state,
            passphrase: &self.settings.passphrase,
        })
    }

    fn read_state<T>(&self, f: impl FnOnce(&SshKeyInfo) -> T) -> Option<T> {
        let state = self.state.read().ok()?;
        state.key.as_ref().map(f)
    }

    fn read_key(&self, paths: &KeyPaths) -> Result<SshKeyInfo> {
        let private_key = fs::read_to_string(&paths.private_key)
            .map_err(|e| AppError::io(&paths.private_key, e))?;

        let stored = match fs::read_to_string(&paths.public_key) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(AppError::io(&paths.public_key, e)),
        };

        let (public_key, key_type, comment) = match stored {
            Some(line) => {
                let mut tokens = line.splitn(3, ' ');
                let key_type = tokens.next().unwrap_or(RSA_KEY_TYPE).to_string();
                let comment = tokens.nth(1).unwrap_or_default().to_string();
                (line, key_type, comment)
            }
            None => {
                warn!(
                    "Public key file missing, deriving it from {}",
                    paths.private_key.display()
                );
                let private = load_private_key(&private_key, &self.settings.passphrase)?;
                let pem = public_key_pem(&private)?;
                let line = encode_public_key_pem(&pem, &self.settings.comment)?;
                (line, RSA_KEY_TYPE.to_string(), self.settings.comment.clone())
            }
        };

        let key = SshKeyInfo {
            fingerprint: fingerprint(&public_key),
            public_key,
            private_key,
            key_type,
            comment,
        };
        validate(&key)?;
        Ok(key)
    }
}

fn validate(key: &SshKeyInfo) -> Result<()> {
    let invalid = |reason: &str| Err(AppError::KeyGeneration(format!("invalid SSH key: {reason}")));

    if key.private_key.is_empty() || key.public_key.is_empty() {
        return invalid("empty key material");
    }
    if !key.private_key.starts_with("-----BEGIN") {
        return invalid("private key is not PEM");
    }
    if !key.public_key.starts_with("ssh-") {
        return invalid("public key is not in OpenSSH format");
    }
    if is_error_fingerprint(&key.fingerprint) {
        return invalid("public key cannot be fingerprinted");
    }
    Ok(())
}

fn write_key(paths: &KeyPaths, key: &SshKeyInfo) -> Result<()> {
    fs::create_dir_all(&paths.dir).map_err(|e| AppError::io(&paths.dir, e))?;
    set_mode(&paths.dir, 0o700)?;

    fs::write(&paths.private_key, key.private_key.as_bytes())
        .map_err(|e| AppError::io(&paths.private_key, e))?;
    set_mode(&paths.private_key, 0o600)?;

    fs::write(&paths.public_key, format!("{}\n", key.public_key))
        .map_err(|e| AppError::io(&paths.public_key, e))?;
    set_mode(&paths.public_key, 0o644)?;

    info!("SSH identity written to {}", paths.dir.display());
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| AppError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
