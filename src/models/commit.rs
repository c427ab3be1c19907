use serde::{Deserialize, Serialize};

/// Number of hex characters kept in `CommitInfo::short_id`.
pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub email: String,
    pub timestamp: i64,
    pub message: String,
    pub short_message: String,
    pub parent_ids: Vec<String>,
}

impl CommitInfo {
    pub fn from_commit(commit: &git2::Commit) -> Self {
        let id = commit.id().to_string();
        let short_id = id.chars().take(SHORT_ID_LEN).collect();
        let author = commit.author();
        let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
        let short_message = message.lines().next().unwrap_or("").to_string();

        Self {
            id,
            short_id,
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
            timestamp: author.when().seconds(),
            message,
            short_message,
            parent_ids: commit.parent_ids().map(|oid| oid.to_string()).collect(),
        }
    }
}
