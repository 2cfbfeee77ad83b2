// GitHub API response types.
// Defines structs for deserializing the repository, search, branch, and tree endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a GitHub repository. Identity is the numeric `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
    #[serde(rename = "updated_at")]
    pub last_update: DateTime<Utc>,
}

/// Result of a repository search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(rename = "total_count")]
    pub count: u64,
    #[serde(rename = "items")]
    pub repositories: Vec<RepositoryMetadata>,
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    Commit,
    #[serde(other)]
    Unknown,
}

/// One entry of a git tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub sha: String,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Tree
    }
}

/// A git tree listing (one level, not recursive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub sha: String,
    #[serde(rename = "tree")]
    pub entries: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Branch as returned by `/repos/{owner}/{repo}/branches/{branch}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Branch {
    pub name: String,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BranchCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitDetail {
    pub tree: TreeRef,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TreeRef {
    pub sha: String,
}
