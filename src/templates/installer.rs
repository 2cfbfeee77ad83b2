// Template installation lifecycle.
// Download, update, copy, and delete templates, keeping sibling installs in step.

use std::fs;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::GitFailurePolicy;
use crate::error::{ApiResult, Result, SyncError};
use crate::git::GitRunner;
use crate::github::ApiClient;
use crate::progress::{LogProgress, ProgressScope, ProgressSink};

use super::catalog::Catalog;
use super::fs::{copy_filtered, force_remove_dir, write_timestamp};
use super::paths::{LocalInstall, SYNC_MARKER, TemplatePaths};
use super::record::{TemplateId, TemplateRecord, TemplateState};

/// Result of an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Upstream had nothing newer; nothing on disk was touched.
    AlreadyCurrent,
    Updated,
}

/// Performs install, update, and delete for templates in a [`Catalog`].
pub struct Installer {
    api: ApiClient,
    git: Arc<dyn GitRunner>,
    paths: TemplatePaths,
    progress: Arc<dyn ProgressSink>,
    git_failures: GitFailurePolicy,
}

impl Installer {
    pub fn new(api: ApiClient, git: Arc<dyn GitRunner>, paths: TemplatePaths) -> Self {
        Self {
            api,
            git,
            paths,
            progress: Arc::new(LogProgress),
            git_failures: GitFailurePolicy::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_git_failures(mut self, policy: GitFailurePolicy) -> Self {
        self.git_failures = policy;
        self
    }

    pub fn paths(&self) -> &TemplatePaths {
        &self.paths
    }

    pub fn state(&self, record: &TemplateRecord) -> TemplateState {
        record.state(&self.paths)
    }

    /// Re-fetch the repository snapshot and compare it with the local sync time.
    ///
    /// Templates that are not installed answer `false` without a request. The
    /// held snapshot is only replaced when the fetch succeeds.
    pub async fn is_up_to_date_remote(&self, record: &mut TemplateRecord) -> ApiResult<bool> {
        if !record.is_installed(&self.paths) {
            return Ok(false);
        }

        record.repository = self.api.get_repository(record.repository.id).await?;
        Ok(record.is_up_to_date(&self.paths))
    }

    /// Clone the repository and install the template plus its siblings.
    pub async fn download(&self, catalog: &Catalog, id: TemplateId) -> Result<()> {
        let record = lookup(catalog, id)?;
        let repository = &record.repository;
        let scope = ProgressScope::begin(
            self.progress.as_ref(),
            &format!("Downloading {}", record.display_name()),
        );

        let cache_dir = record.cache_dir(&self.paths);
        fs::create_dir_all(&cache_dir)?;

        scope.update("Cloning repository", 1, 4);
        let url = repository.clone_url.as_str();
        self.run_git(&["clone", url, "."], record).await?;

        scope.update("Recording sync time", 2, 4);
        write_timestamp(&self.paths.sync_marker(repository.id), repository.last_update)?;

        scope.update("Copying template files", 3, 4);
        self.install_files(record, repository.last_update)?;

        scope.update("Refreshing sibling templates", 4, 4);
        for (_, sibling) in catalog.siblings_of(id) {
            self.install_files(sibling, repository.last_update)?;
        }

        log::info!("Downloaded {}", record.display_name());
        Ok(())
    }

    /// Pull upstream changes into an existing working copy and reinstall.
    pub async fn update(&self, catalog: &mut Catalog, id: TemplateId) -> Result<UpdateOutcome> {
        let record = catalog
            .get_mut(id)
            .ok_or_else(|| unknown_template(id))?;

        if !record.cache_dir(&self.paths).is_dir() {
            return Err(SyncError::InvalidOperation(format!(
                "{} has not been downloaded",
                record.display_name()
            )));
        }

        match self.is_up_to_date_remote(record).await {
            Ok(true) => {
                log::info!("{} is already up to date", record.display_name());
                return Ok(UpdateOutcome::AlreadyCurrent);
            }
            Ok(false) => {}
            Err(err) => log::warn!(
                "Could not check {} for updates ({}), updating anyway",
                record.display_name(),
                err
            ),
        }

        let record = lookup(catalog, id)?;
        let scope = ProgressScope::begin(
            self.progress.as_ref(),
            &format!("Updating {}", record.display_name()),
        );

        scope.update("Resetting working copy", 1, 5);
        self.run_git(&["reset", "--hard", "HEAD"], record).await?;

        scope.update("Pulling changes", 2, 5);
        self.run_git(&["pull"], record).await?;

        scope.update("Checking out default branch", 3, 5);
        let branch = record.repository.default_branch.as_str();
        self.run_git(&["checkout", branch, "--force"], record).await?;

        // sync point is local time after a full re-sync
        let synced = Utc::now();
        write_timestamp(&self.paths.sync_marker(record.repository.id), synced)?;

        scope.update("Copying template files", 4, 5);
        self.install_files(record, synced)?;

        scope.update("Refreshing sibling templates", 5, 5);
        for (_, sibling) in catalog.siblings_of(id) {
            self.install_files(sibling, synced)?;
        }

        log::info!("Updated {}", record.display_name());
        Ok(UpdateOutcome::Updated)
    }

    /// Replace the installed directory with a filtered copy of the working copy.
    /// Returns the number of files copied.
    pub fn copy_to_installed(&self, record: &TemplateRecord) -> Result<u64> {
        let cache_dir = record.cache_dir(&self.paths);
        if !cache_dir.is_dir() {
            return Err(SyncError::InvalidOperation(format!(
                "{} has no working copy at {}",
                record.display_name(),
                cache_dir.display()
            )));
        }

        let installed = record.installed_dir(&self.paths);
        force_remove_dir(&installed)?;
        fs::create_dir_all(&installed)?;

        let source = self
            .paths
            .source_dir(record.repository.id, record.sub_directory.as_deref());
        let copied = copy_filtered(&source, &installed)?;
        log::debug!(
            "Copied {} files from {} to {}",
            copied,
            source.display(),
            installed.display()
        );

        Ok(copied)
    }

    /// Remove the installed and cached files of a template and its siblings.
    ///
    /// Failures are logged, never returned.
    pub fn delete(&self, catalog: &Catalog, id: TemplateId) {
        let Some(record) = catalog.get(id) else {
            log::error!("Cannot delete {}", unknown_template(id));
            return;
        };

        self.delete_files(record);
        for (_, sibling) in catalog.siblings_of(id) {
            self.delete_files(sibling);
        }
        log::info!("Deleted {}", record.display_name());
    }

    /// Installed templates found on disk, whether or not discovery still lists them.
    pub fn local_installs(&self) -> Vec<LocalInstall> {
        self.paths.local_installs().unwrap_or_else(|err| {
            log::error!("Failed to list installed templates: {}", err);
            Vec::new()
        })
    }

    /// Remove every installed template of a repository and its working copy,
    /// using only the on-disk layout. Returns how many installed directories
    /// were removed. Failures are logged, never returned.
    pub fn delete_local(&self, repository_id: u64) -> usize {
        let mut removed = 0;
        for install in self.local_installs() {
            if install.repository_id != repository_id {
                continue;
            }
            match force_remove_dir(&install.path) {
                Ok(()) => removed += 1,
                Err(err) => log::error!("Failed to delete {}: {}", install.path.display(), err),
            }
        }

        let cache_dir = self.paths.cache_dir(repository_id);
        if let Err(err) = force_remove_dir(&cache_dir) {
            log::error!("Failed to delete {}: {}", cache_dir.display(), err);
        }
        log::info!("Deleted {} installed templates of repository {}", removed, repository_id);
        removed
    }

    fn delete_files(&self, record: &TemplateRecord) {
        for dir in [record.installed_dir(&self.paths), record.cache_dir(&self.paths)] {
            if let Err(err) = force_remove_dir(&dir) {
                log::error!("Failed to delete {}: {}", dir.display(), err);
            }
        }
    }

    /// Copy files into the installed directory and stamp it with `synced`.
    fn install_files(&self, record: &TemplateRecord, synced: DateTime<Utc>) -> Result<()> {
        self.copy_to_installed(record)?;
        write_timestamp(&record.installed_dir(&self.paths).join(SYNC_MARKER), synced)?;
        Ok(())
    }

    async fn run_git(&self, args: &[&str], record: &TemplateRecord) -> Result<()> {
        let cache_dir = record.cache_dir(&self.paths);
        match self.git.run(args, &cache_dir).await {
            Ok(()) => Ok(()),
            Err(err) => match self.git_failures {
                GitFailurePolicy::Lenient => {
                    log::error!("{} (continuing with {})", err, record.display_name());
                    Ok(())
                }
                GitFailurePolicy::Strict => Err(err.into()),
            },
        }
    }
}

fn lookup(catalog: &Catalog, id: TemplateId) -> Result<&TemplateRecord> {
    catalog.get(id).ok_or_else(|| unknown_template(id))
}

fn unknown_template(id: TemplateId) -> SyncError {
    SyncError::InvalidOperation(format!("no template with index {}", id.index()))
}
