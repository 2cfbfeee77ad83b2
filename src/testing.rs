// Shared test fixtures.
// Repository snapshots, API JSON bodies, and a git runner that fakes clones on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;

use crate::error::GitError;
use crate::git::GitRunner;
use crate::github::RepositoryMetadata;

pub const UPDATED_AT: &str = "2024-05-01T12:00:00Z";

pub fn updated_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(UPDATED_AT)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn repository(id: u64, full_name: &str) -> RepositoryMetadata {
    serde_json::from_value(repo_json(id, full_name)).unwrap()
}

pub fn repo_json(id: u64, full_name: &str) -> serde_json::Value {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    json!({
        "id": id,
        "name": name,
        "full_name": full_name,
        "description": "A template",
        "html_url": format!("https://github.com/{full_name}"),
        "clone_url": format!("https://github.com/{full_name}.git"),
        "default_branch": "main",
        "updated_at": UPDATED_AT,
        "stargazers_count": 3
    })
}

/// Git runner that records commands and writes `files` into the directory on `clone`.
#[derive(Default)]
pub struct MockGit {
    files: BTreeMap<String, String>,
    failing: Vec<String>,
    commands: Mutex<Vec<String>>,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }

    /// Make every command starting with `verb` exit non-zero.
    pub fn failing(mut self, verb: &str) -> Self {
        self.failing.push(verb.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl GitRunner for MockGit {
    async fn run(&self, args: &[&str], working_dir: &Path) -> Result<(), GitError> {
        let command = args.join(" ");
        self.commands.lock().push(command.clone());

        if args
            .first()
            .is_some_and(|verb| self.failing.iter().any(|f| f == verb))
        {
            return Err(GitError::Failed { command, code: 128 });
        }

        if args.first() == Some(&"clone") {
            fs::create_dir_all(working_dir.join(".git")).unwrap();
            fs::write(working_dir.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
            for (path, contents) in &self.files {
                let target = working_dir.join(path);
                fs::create_dir_all(target.parent().unwrap()).unwrap();
                fs::write(target, contents).unwrap();
            }
        }

        Ok(())
    }
}
