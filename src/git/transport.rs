//! Credential and certificate callbacks for remote operations.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use git2::{CertificateCheckStatus, Cred, CredentialType, ErrorClass, ErrorCode, RemoteCallbacks};
use tracing::{debug, warn};

use crate::config::HostCertPolicy;
use crate::error::AppError;
use crate::ssh::IdentityLease;

/// User name for SSH URLs that do not embed one (`git@host:...` style).
pub const DEFAULT_SSH_USER: &str = "git";

/// libgit2 re-invokes the credential callback after every rejected attempt.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Supplies the active SSH identity to libgit2 for one remote operation.
///
/// Borrows from an `IdentityLease`, so the key files cannot be replaced
/// while the operation is authenticating.
pub struct CredentialBridge<'a> {
    key: Option<(&'a Path, &'a Path)>,
    passphrase: Option<&'a str>,
    policy: HostCertPolicy,
    failure: Rc<RefCell<Option<String>>>,
}

impl<'a> CredentialBridge<'a> {
    pub fn new(lease: &'a IdentityLease<'_>, policy: HostCertPolicy) -> Self {
        Self {
            key: lease
                .key_paths()
                .map(|paths| (paths.private_key.as_path(), paths.public_key.as_path())),
            passphrase: lease.passphrase(),
            policy,
            failure: Rc::default(),
        }
    }

    pub fn remote_callbacks(&self) -> RemoteCallbacks<'a> {
        let mut callbacks = RemoteCallbacks::new();

        let key = self.key;
        let passphrase = self.passphrase;
        let failure = Rc::clone(&self.failure);
        let mut attempts = 0;

        callbacks.credentials(move |url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Ssh,
                    format!("credentials for {url} rejected {MAX_CREDENTIAL_ATTEMPTS} times"),
                ));
            }

            let user = username_from_url.unwrap_or(DEFAULT_SSH_USER);

            if allowed.contains(CredentialType::SSH_KEY) {
                return match key {
                    Some((private_key, public_key)) => {
                        debug!("Offering SSH key {} as '{}'", private_key.display(), user);
                        Cred::ssh_key(user, Some(public_key), private_key, passphrase)
                    }
                    None => {
                        let reason = "SSH key requested but no identity is initialized".to_string();
                        *failure.borrow_mut() = Some(reason.clone());
                        Err(git2::Error::new(ErrorCode::Auth, ErrorClass::Ssh, reason))
                    }
                };
            }

            if allowed.contains(CredentialType::USERNAME) {
                return Cred::username(user);
            }

            let reason = format!("no supported credential type for {url} (allowed: {allowed:?})");
            *failure.borrow_mut() = Some(reason.clone());
            Err(git2::Error::new(ErrorCode::Auth, ErrorClass::Net, reason))
        });

        let policy = self.policy;
        callbacks.certificate_check(move |_cert, host| match policy {
            HostCertPolicy::Strict => Ok(CertificateCheckStatus::CertificatePassthrough),
            HostCertPolicy::AcceptInvalid => {
                warn!("Accepting certificate for {} without validation", host);
                Ok(CertificateCheckStatus::CertificateOk)
            }
        });

        callbacks
    }

    /// Map a failed remote call, surfacing credential negotiation failures.
    pub fn remote_error(&self, err: git2::Error) -> AppError {
        match self.failure.borrow_mut().take() {
            Some(reason) => AppError::NoSuitableCredential(reason),
            None => AppError::remote(err),
        }
    }
}
