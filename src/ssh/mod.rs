//! SSH identity: RSA key generation, OpenSSH encoding and fingerprints.

pub mod fingerprint;
pub mod identity;
pub mod keygen;
pub mod openssh;

pub use fingerprint::{FINGERPRINT_ERROR, fingerprint, is_error_fingerprint};
pub use identity::{IdentityLease, IdentityManager, KeyPaths};
