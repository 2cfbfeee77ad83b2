// GitHub API module.
// Provides the client, transport, and types for the GitHub REST API.

pub mod client;
pub mod endpoints;
pub mod transport;
pub mod types;

pub use client::{ApiClient, GITHUB_API_BASE};
pub use transport::{HttpTransport, RawResponse, Transport};
pub use types::*;
