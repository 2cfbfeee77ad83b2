// Templates module.
// Records, the sibling-aware catalog, on-disk layout, and the install lifecycle.

pub mod catalog;
pub mod fs;
pub mod installer;
pub mod paths;
pub mod record;

pub use catalog::Catalog;
pub use installer::{Installer, UpdateOutcome};
pub use paths::{GIT_DIR, LocalInstall, SYNC_MARKER, TemplatePaths};
pub use record::{TemplateId, TemplateRecord, TemplateState};
