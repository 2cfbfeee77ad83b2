// Template path utilities.
// Derives the cache and installed directories for a template from its repository id.

use std::io;
use std::path::PathBuf;

use crate::config::Config;

/// Marker file holding the last sync timestamp.
pub const SYNC_MARKER: &str = "update.txt";

/// Version-control metadata directory inside a working copy.
pub const GIT_DIR: &str = ".git";

/// An installed template directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstall {
    pub repository_id: u64,
    /// Sanitized subdirectory suffix of a nested template.
    pub sub_directory: Option<String>,
    pub path: PathBuf,
}

impl LocalInstall {
    /// `{id}` or `{id}:{sub}`, the selector the CLI accepts for it.
    pub fn selector(&self) -> String {
        match &self.sub_directory {
            Some(sub) => format!("{}:{}", self.repository_id, sub),
            None => self.repository_id.to_string(),
        }
    }
}

/// Roots under which templates are cloned and installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    cache_root: PathBuf,
    templates_root: PathBuf,
}

impl TemplatePaths {
    pub fn new(cache_root: impl Into<PathBuf>, templates_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            templates_root: templates_root.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_root(), config.templates_root())
    }

    /// Working copy of a repository, shared by all of its templates.
    pub fn cache_dir(&self, repository_id: u64) -> PathBuf {
        self.cache_root.join(repository_id.to_string())
    }

    /// Sync timestamp marker inside the working copy.
    pub fn sync_marker(&self, repository_id: u64) -> PathBuf {
        self.cache_dir(repository_id).join(SYNC_MARKER)
    }

    /// Git metadata directory inside the working copy.
    pub fn git_dir(&self, repository_id: u64) -> PathBuf {
        self.cache_dir(repository_id).join(GIT_DIR)
    }

    /// Directory holding the filtered copy of one template.
    /// Nested templates get `{id}_{subdirectory}`.
    pub fn installed_dir(&self, repository_id: u64, sub_directory: Option<&str>) -> PathBuf {
        let name = match sub_directory {
            Some(sub) => format!("{}_{}", repository_id, sanitize_name(sub)),
            None => repository_id.to_string(),
        };
        self.templates_root.join(name)
    }

    /// Source of a template's files inside the working copy.
    pub fn source_dir(&self, repository_id: u64, sub_directory: Option<&str>) -> PathBuf {
        let cache = self.cache_dir(repository_id);
        match sub_directory {
            Some(sub) => cache.join(sub),
            None => cache,
        }
    }

    /// Installed template directories, sorted by name. A missing root is empty.
    ///
    /// Entries whose names do not start with a repository id are ignored.
    pub fn local_installs(&self) -> io::Result<Vec<LocalInstall>> {
        let entries = match std::fs::read_dir(&self.templates_root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut installs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some((repository_id, sub_directory)) = parse_installed_name(&name) {
                installs.push(LocalInstall {
                    repository_id,
                    sub_directory,
                    path: entry.path(),
                });
            }
        }
        installs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(installs)
    }
}

fn parse_installed_name(name: &str) -> Option<(u64, Option<String>)> {
    match name.split_once('_') {
        Some((id, sub)) if !sub.is_empty() => Some((id.parse().ok()?, Some(sub.to_string()))),
        Some(_) => None,
        None => Some((name.parse().ok()?, None)),
    }
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
