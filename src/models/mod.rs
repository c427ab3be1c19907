//! Data transfer objects (DTOs) handed to the host bridge.
//!
//! These structs are serialized to camelCase JSON for the UI layer.
//! - `commit`: CommitInfo for history pages
//! - `refs`: BranchInfo, TagInfo from the remote advertisement
//! - `tree`: FileTreeNode (flat, parent-indexed) and FileContent
//! - `ssh`: SshKeyInfo for the active identity
//! - `envelope`: the uniform `{success, message, data}` response and fetch events

pub mod commit;
pub mod envelope;
pub mod refs;
pub mod ssh;
pub mod tree;

pub use commit::*;
pub use envelope::*;
pub use refs::*;
pub use ssh::*;
pub use tree::*;
