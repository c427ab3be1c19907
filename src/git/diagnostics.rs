//! Classification of libgit2 failures into human-readable diagnostics.
//!
//! Every failed engine call is turned into a `GitErrorInfo` record: the error
//! class and code come from libgit2's own taxonomy, the remedy is looked up by
//! code first and falls back to a per-class suggestion.

use std::fmt;

use git2::{ErrorClass, ErrorCode};
use serde::{Deserialize, Serialize};

/// libgit2 `GIT_TIMEOUT`, not exposed as an `ErrorCode` variant on every git2 release.
const RAW_TIMEOUT: i32 = -37;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitErrorInfo {
    pub class: String,
    pub code: String,
    pub message: String,
    pub remedy: String,
}

impl From<&git2::Error> for GitErrorInfo {
    fn from(err: &git2::Error) -> Self {
        let class = err.class();
        let raw_code = err.raw_code();
        Self {
            class: class_description(class).to_string(),
            code: code_description(err.code(), raw_code),
            message: err.message().to_string(),
            remedy: remedy(class, err.code(), raw_code).to_string(),
        }
    }
}

impl fmt::Display for GitErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Operation failed")?;
        writeln!(f, "Category: {}", self.class)?;
        writeln!(f, "Error: {}", self.code)?;
        writeln!(f, "Details: {}", self.message)?;
        write!(f, "Suggested fix: {}", self.remedy)
    }
}

pub fn class_description(class: ErrorClass) -> &'static str {
    match class {
        ErrorClass::None => "No error class",
        ErrorClass::NoMemory => "Out of memory",
        ErrorClass::Os => "Operating system error",
        ErrorClass::Invalid => "Invalid operation or argument",
        ErrorClass::Reference => "Reference error",
        ErrorClass::Zlib => "Compression error",
        ErrorClass::Repository => "Repository error",
        ErrorClass::Config => "Configuration error",
        ErrorClass::Regex => "Regular expression error",
        ErrorClass::Odb => "Object database error",
        ErrorClass::Index => "Index error",
        ErrorClass::Object => "Git object error",
        ErrorClass::Net => "Network error",
        ErrorClass::Tag => "Tag error",
        ErrorClass::Tree => "Tree object error",
        ErrorClass::Indexer => "Indexer error",
        ErrorClass::Ssl => "SSL/TLS error",
        ErrorClass::Submodule => "Submodule error",
        ErrorClass::Thread => "Threading error",
        ErrorClass::Stash => "Stash error",
        ErrorClass::Checkout => "Checkout error",
        ErrorClass::FetchHead => "FETCH_HEAD error",
        ErrorClass::Merge => "Merge error",
        ErrorClass::Ssh => "SSH connection error",
        ErrorClass::Filter => "Filter error",
        ErrorClass::Revert => "Revert error",
        ErrorClass::Callback => "Callback error",
        ErrorClass::CherryPick => "Cherry-pick error",
        ErrorClass::Describe => "Describe error",
        ErrorClass::Rebase => "Rebase error",
        ErrorClass::Filesystem => "Filesystem error",
        ErrorClass::Patch => "Patch error",
        ErrorClass::Worktree => "Worktree error",
        ErrorClass::Sha1 => "SHA hash error",
        ErrorClass::Http => "HTTP error",
    }
}

pub fn code_description(code: ErrorCode, raw_code: i32) -> String {
    if raw_code == RAW_TIMEOUT {
        return "Operation timed out".to_string();
    }
    let text = match code {
        ErrorCode::GenericError => "Generic error",
        ErrorCode::NotFound => "Requested object could not be found",
        ErrorCode::Exists => "Object exists preventing operation",
        ErrorCode::Ambiguous => "More than one object matches",
        ErrorCode::BufSize => "Output buffer too short",
        ErrorCode::User => "Operation aborted by a user callback",
        ErrorCode::BareRepo => "Operation not allowed on a bare repository",
        ErrorCode::UnbornBranch => "HEAD refers to a branch with no commits",
        ErrorCode::Unmerged => "Merge in progress prevented operation",
        ErrorCode::NotFastForward => "Reference was not fast-forwardable",
        ErrorCode::InvalidSpec => "Name or refspec is not in a valid format",
        ErrorCode::Conflict => "Checkout conflicts prevented operation",
        ErrorCode::Locked => "Lock file prevented operation",
        ErrorCode::Modified => "Reference value does not match expected",
        ErrorCode::Auth => "Authentication error",
        ErrorCode::Certificate => "Server certificate is invalid",
        ErrorCode::Applied => "Patch or merge has already been applied",
        ErrorCode::Peel => "Requested peel operation is not possible",
        ErrorCode::Eof => "Unexpected end of file",
        ErrorCode::Invalid => "Invalid operation or input",
        ErrorCode::Uncommitted => "Uncommitted changes in index prevented operation",
        ErrorCode::Directory => "Operation is not valid for a directory",
        ErrorCode::MergeConflict => "A merge conflict exists and cannot continue",
        ErrorCode::HashsumMismatch => "Object hash does not match its contents",
        ErrorCode::IndexDirty => "Unsaved changes in the index",
        ErrorCode::ApplyFail => "Patch application failed",
        ErrorCode::Owner => "Object is not owned by the current user",
        _ => return format!("Unknown error code: {raw_code}"),
    };
    text.to_string()
}

pub fn remedy(class: ErrorClass, code: ErrorCode, raw_code: i32) -> &'static str {
    if raw_code == RAW_TIMEOUT {
        return "1) Check that the network connection is stable 2) Increase the server timeout 3) Retry the operation";
    }
    match code {
        ErrorCode::Certificate => {
            "1) Check that the certificate file exists 2) Verify the certificate has not expired 3) Make sure the system clock is correct"
        }
        ErrorCode::Auth => {
            "1) Check the user name and password 2) Verify the SSH key is valid 3) Confirm you have access to the repository"
        }
        ErrorCode::NotFound => {
            "1) Check the target object exists 2) Verify the reference name 3) Fetch the remote repository again"
        }
        ErrorCode::Exists => {
            "1) Check whether the target already exists 2) Use a force option to overwrite 3) Remove the existing object first"
        }
        ErrorCode::Conflict => {
            "1) Resolve the conflicting files 2) Inspect the conflicts 3) Commit again after editing"
        }
        ErrorCode::Uncommitted => {
            "1) Commit or stash the current changes 2) Reset the working directory 3) Retry the operation"
        }
        ErrorCode::Locked => {
            "1) Wait for other processes to finish 2) Check no other Git operation is running 3) Restart the application"
        }
        ErrorCode::Modified => {
            "1) Fetch the remote repository again 2) Check the local reference state 3) Reload the latest data"
        }
        ErrorCode::MergeConflict => {
            "1) Resolve the merge conflicts 2) Inspect the conflicting files 3) Continue the merge afterwards"
        }
        ErrorCode::NotFastForward => {
            "1) Fetch the latest changes first 2) Resolve conflicts and push again 3) Use --force-with-lease"
        }
        ErrorCode::InvalidSpec => {
            "1) Check the reference name format 2) Verify the branch or tag name 3) Follow Git naming rules"
        }
        ErrorCode::BufSize => {
            "1) Increase the buffer size 2) Process the data in batches 3) Check available memory"
        }
        ErrorCode::Ambiguous => {
            "1) Use the full commit id 2) Name the branch explicitly 3) Check the reference is unique"
        }
        ErrorCode::BareRepo => {
            "1) Use a non-bare repository 2) Check how the repository was initialized 3) Recreate the repository"
        }
        ErrorCode::UnbornBranch => {
            "1) Create the first commit 2) Check the HEAD reference 3) Fetch the repository content"
        }
        ErrorCode::Unmerged => {
            "1) Finish the current merge 2) Resolve the merge conflicts 3) Commit the merge result"
        }
        ErrorCode::Peel => {
            "1) Check the object type 2) Verify the peel target is supported 3) Use the correct object reference"
        }
        ErrorCode::Eof => {
            "1) Check the network connection 2) Verify data integrity 3) Fetch the data again"
        }
        ErrorCode::Invalid => {
            "1) Check the operation arguments 2) Verify the current state 3) Perform the steps in the correct order"
        }
        ErrorCode::Directory => {
            "1) Check the target is a file 2) Verify the operation is valid for directories 3) Use the correct operation"
        }
        ErrorCode::HashsumMismatch => {
            "1) Verify object integrity 2) Fetch the object data again 3) Check the repository state"
        }
        ErrorCode::IndexDirty => {
            "1) Save the current index state 2) Commit or stash the changes 3) Reset the index"
        }
        ErrorCode::ApplyFail => {
            "1) Check the patch format 2) Verify the target file state 3) Apply the patch manually"
        }
        ErrorCode::Owner => {
            "1) Check file permissions 2) Confirm the user identity 3) Use an account that owns the repository"
        }
        _ => class_remedy(class),
    }
}

fn class_remedy(class: ErrorClass) -> &'static str {
    match class {
        ErrorClass::NoMemory => {
            "1) Close other memory-intensive applications 2) Check available memory 3) Restart the application"
        }
        ErrorClass::Os => {
            "1) Check file permissions 2) Make sure there is enough disk space 3) Check whether the file is in use"
        }
        ErrorClass::Net => {
            "1) Check the network connection 2) Verify the remote repository URL 3) Check firewall and proxy settings"
        }
        ErrorClass::Ssl => {
            "1) Check the SSL certificate configuration 2) Make sure the system clock is correct 3) Update the certificate file"
        }
        ErrorClass::Ssh => {
            "1) Check the SSH key configuration 2) Verify the public key was added to the server 3) Check the SSH host settings"
        }
        ErrorClass::Repository => {
            "1) Check repository integrity 2) Verify the repository directory 3) Try initializing it again"
        }
        ErrorClass::Config => {
            "1) Check the configuration file format 2) Verify configuration values 3) Reset to the default configuration"
        }
        ErrorClass::Filesystem => {
            "1) Check disk space 2) Verify file permissions 3) Check the file system state"
        }
        ErrorClass::Http => {
            "1) Check HTTP proxy settings 2) Verify the network connection 3) Check the server status"
        }
        _ => {
            "1) Check the operation arguments 2) Verify the current state allows this operation 3) Retry the operation"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_specific_remedy_wins_over_class() {
        let err = git2::Error::new(ErrorCode::Auth, ErrorClass::Ssh, "publickey denied");
        let info = GitErrorInfo::from(&err);
        assert_eq!(info.class, "SSH connection error");
        assert_eq!(info.code, "Authentication error");
        assert!(info.remedy.contains("SSH key"));
    }

    #[test]
    fn class_remedy_is_the_fallback() {
        let err = git2::Error::new(ErrorCode::GenericError, ErrorClass::Net, "connection reset");
        let info = GitErrorInfo::from(&err);
        assert_eq!(info.code, "Generic error");
        assert!(info.remedy.contains("network connection"));
    }

    #[test]
    fn every_class_has_its_own_description() {
        assert_eq!(class_description(ErrorClass::None), "No error class");
        assert_eq!(class_description(ErrorClass::Worktree), "Worktree error");
        assert_eq!(class_description(ErrorClass::Http), "HTTP error");
    }

    #[test]
    fn display_carries_every_field() {
        let err = git2::Error::new(ErrorCode::NotFound, ErrorClass::Reference, "no such ref");
        let text = GitErrorInfo::from(&err).to_string();
        assert!(text.starts_with("Operation failed"));
        assert!(text.contains("Reference error"));
        assert!(text.contains("no such ref"));
        assert!(text.contains("Suggested fix:"));
    }
}
