// GitHub API endpoint functions.
// Provides the typed repository, search, branch, and tree lookups.

use url::form_urlencoded;

use crate::error::ApiResult;

use super::client::ApiClient;
use super::types::{Branch, RepositoryMetadata, SearchResults, Tree};

impl ApiClient {
    /// Get a repository by numeric id.
    pub async fn get_repository(&self, id: u64) -> ApiResult<RepositoryMetadata> {
        self.get_json(&format!("/repositories/{}", id)).await
    }

    /// Search repositories. `query` uses GitHub search syntax, e.g. `topic:foo`.
    pub async fn search(&self, query: &str) -> ApiResult<SearchResults> {
        self.get_json(&search_endpoint(query)).await
    }

    /// Tree sha of the latest commit on `branch`.
    pub async fn get_default_branch_head_tree_sha(
        &self,
        full_name: &str,
        branch: &str,
    ) -> ApiResult<String> {
        let branch: Branch = self
            .get_json(&format!(
                "/repos/{}/branches/{}",
                encode_path(full_name),
                encode_path(branch)
            ))
            .await?;
        log::debug!(
            "{} branch {} is at commit {}",
            full_name,
            branch.name,
            branch.commit.sha
        );
        Ok(branch.commit.commit.tree.sha)
    }

    /// Get one level of a git tree.
    pub async fn get_tree(&self, full_name: &str, sha: &str) -> ApiResult<Tree> {
        self.get_json(&format!(
            "/repos/{}/git/trees/{}",
            encode_path(full_name),
            encode_path(sha)
        ))
        .await
    }
}

pub(crate) fn search_endpoint(query: &str) -> String {
    let query: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("/search/repositories?q={}", query)
}

/// Percent-encode each `/`-separated segment of a path fragment.
pub(crate) fn encode_path(value: &str) -> String {
    value
        .split('/')
        .map(|segment| {
            form_urlencoded::byte_serialize(segment.as_bytes())
                .collect::<String>()
                .replace('+', "%20")
        })
        .collect::<Vec<_>>()
        .join("/")
}
