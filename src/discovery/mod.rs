// Discovery module.
// Searches GitHub for template repositories and classifies their trees.

pub mod classifier;
pub mod orchestrator;

pub use classifier::{Classification, MANIFEST_MARKER, TreeClassifier};
pub use orchestrator::{DiscoveryOrchestrator, DiscoveryOutcome};
