use std::fmt;

use serde::Serialize;

/// The active SSH identity. The private key never leaves the process through
/// serialization or debug output.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyInfo {
    pub public_key: String,
    #[serde(skip)]
    pub private_key: String,
    pub key_type: String,
    pub comment: String,
    pub fingerprint: String,
}

impl fmt::Debug for SshKeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshKeyInfo")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("key_type", &self.key_type)
            .field("comment", &self.comment)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
