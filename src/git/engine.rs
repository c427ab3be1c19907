//! Process-wide libgit2 settings.

use std::path::Path;

use tracing::{info, warn};

use crate::config::EngineOptions;
use crate::error::{AppError, Result};

/// Trust anchor looked up under the base path.
pub const CERT_FILE: &str = "cert.pem";

/// Apply `options` to libgit2 and install `<base>/cert.pem` as the TLS trust
/// anchor when present.
///
/// The underlying settings are global to the process; call this during
/// startup or from `initSystem`, before any repository operation is in flight.
pub fn configure(options: &EngineOptions, base: Option<&Path>) -> Result<()> {
    let version = git2::Version::get();
    let (major, minor, rev) = version.libgit2_version();
    info!("libgit2 {}.{}.{} (ssh: {}, https: {})", major, minor, rev, version.ssh(), version.https());
    if !version.ssh() {
        warn!("libgit2 was built without SSH support; ssh:// remotes will fail");
    }

    // SAFETY: these only write libgit2 globals and are called before any
    // engine object exists on another thread.
    unsafe {
        git2::opts::set_server_timeout_in_milliseconds(options.server_timeout_ms)?;
        git2::opts::set_mwindow_size(options.mwindow_size)?;
        git2::opts::set_mwindow_mapped_limit(options.mwindow_mapped_limit)?;
    }
    git2::opts::strict_hash_verification(options.strict_hash_verification);

    if let Some(cert) = base.map(|b| b.join(CERT_FILE)).filter(|p| p.is_file()) {
        // SAFETY: as above.
        unsafe { git2::opts::set_ssl_cert_file(cert.as_path()) }.map_err(|e| {
            AppError::Internal(format!("failed to install {}: {}", cert.display(), e.message()))
        })?;
        info!("Installed TLS trust anchor {}", cert.display());
    }

    Ok(())
}
