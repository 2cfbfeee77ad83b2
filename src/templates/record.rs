// Template records.
// One installable template and the on-disk state queries derived from it.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::github::RepositoryMetadata;

use super::fs::read_timestamp;
use super::paths::{SYNC_MARKER, TemplatePaths};

/// Index of a record inside its [`Catalog`](super::Catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId(pub(crate) usize);

impl TemplateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Installation state, recomputed from the filesystem on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateState {
    NotInstalled,
    Current,
    Stale,
    Corrupted,
}

impl TemplateState {
    pub fn label(&self) -> &'static str {
        match self {
            TemplateState::NotInstalled => "not installed",
            TemplateState::Current => "installed",
            TemplateState::Stale => "update available",
            TemplateState::Corrupted => "corrupted",
        }
    }
}

/// A discoverable template: a whole repository, or one subdirectory of it.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub repository: RepositoryMetadata,
    pub sub_directory: Option<String>,
    pub(crate) siblings: BTreeSet<TemplateId>,
}

impl TemplateRecord {
    /// Template occupying the whole repository.
    pub fn root(repository: RepositoryMetadata) -> Self {
        Self {
            repository,
            sub_directory: None,
            siblings: BTreeSet::new(),
        }
    }

    /// Template living in one subdirectory of a multi-template repository.
    pub fn nested(repository: RepositoryMetadata, sub_directory: impl Into<String>) -> Self {
        Self {
            repository,
            sub_directory: Some(sub_directory.into()),
            siblings: BTreeSet::new(),
        }
    }

    /// Other templates from the same repository.
    pub fn siblings(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.siblings.iter().copied()
    }

    pub fn display_name(&self) -> String {
        match &self.sub_directory {
            Some(sub) => format!("{}/{}", self.repository.name, sub),
            None => self.repository.name.clone(),
        }
    }

    pub fn cache_dir(&self, paths: &TemplatePaths) -> PathBuf {
        paths.cache_dir(self.repository.id)
    }

    pub fn installed_dir(&self, paths: &TemplatePaths) -> PathBuf {
        paths.installed_dir(self.repository.id, self.sub_directory.as_deref())
    }

    /// True if either the working copy or the installed directory exists.
    pub fn is_installed(&self, paths: &TemplatePaths) -> bool {
        self.cache_dir(paths).exists() || self.installed_dir(paths).exists()
    }

    /// True if any piece of the installation is missing or unreadable.
    ///
    /// A template that was never installed also reports corrupted; check
    /// [`is_installed`](Self::is_installed) first to tell the two apart.
    pub fn is_corrupted(&self, paths: &TemplatePaths) -> bool {
        let id = self.repository.id;
        !paths.cache_dir(id).is_dir()
            || !paths.git_dir(id).is_dir()
            || !self.installed_dir(paths).is_dir()
            || self.sync_time(paths).is_none()
    }

    /// Locally recorded sync timestamp, if present and valid.
    pub fn sync_time(&self, paths: &TemplatePaths) -> Option<DateTime<Utc>> {
        read_timestamp(&paths.sync_marker(self.repository.id))
    }

    /// Timestamp stamped into the installed directory by the last copy.
    pub fn last_version_time(&self, paths: &TemplatePaths) -> Option<DateTime<Utc>> {
        read_timestamp(&self.installed_dir(paths).join(SYNC_MARKER))
    }

    /// Installed, and the held snapshot is not newer than the last sync.
    pub fn is_up_to_date(&self, paths: &TemplatePaths) -> bool {
        self.is_installed(paths)
            && self
                .sync_time(paths)
                .is_some_and(|synced| self.repository.last_update <= synced)
    }

    pub fn state(&self, paths: &TemplatePaths) -> TemplateState {
        if !self.is_installed(paths) {
            TemplateState::NotInstalled
        } else if self.is_corrupted(paths) {
            TemplateState::Corrupted
        } else if self.is_up_to_date(paths) {
            TemplateState::Current
        } else {
            TemplateState::Stale
        }
    }
}
