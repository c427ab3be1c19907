//! Branch and tag DTOs.
//!
//! Both are built from plain data (reference names and object ids), never
//! from engine handles, so they can outlive the remote connection that
//! produced them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    pub name: String,
    pub target_id: String,
    pub is_remote: bool,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInfo {
    pub name: String,
    pub id: String,
    /// Commit the tag peels to, empty when the advertisement carried none.
    pub peeled_id: String,
    pub is_annotated: bool,
}
