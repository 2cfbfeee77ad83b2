// tplsync library.
// Discovers addon templates on GitHub and keeps local installs in sync with upstream.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod github;
pub mod progress;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, GitFailurePolicy};
pub use discovery::{DiscoveryOrchestrator, DiscoveryOutcome};
pub use error::{ApiError, GitError, SyncError};
pub use github::ApiClient;
pub use templates::{Catalog, Installer, TemplateId, TemplateRecord, TemplateState, UpdateOutcome};
