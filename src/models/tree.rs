//! File tree DTOs.
//!
//! - `FileTreeNode`: one entry of a flattened tree. The hierarchy is encoded
//!   through `id`/`parent_id` so the whole tree serializes as a flat array.
//! - `FileContent`: blob bytes plus the engine's binary classification.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// `parent_id` of entries at the top level of the flattened tree.
pub const ROOT_PARENT_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeNode {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub object_id: String,
    pub mode: i32,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// Extension of a file name: the text after the last `.`, if that dot is not
/// the final character.
pub fn file_extension(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    if dot + 1 == name.len() {
        return None;
    }
    Some(name[dot + 1..].to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub exists: bool,
    pub is_binary: bool,
    pub content: Vec<u8>,
}

impl FileContent {
    /// Content decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}
