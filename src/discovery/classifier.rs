// Repository tree classifier.
// Decides whether a repository is one template, a folder of sibling templates, or neither.

use crate::error::ApiResult;
use crate::github::{ApiClient, RepositoryMetadata, TreeEntry};
use crate::templates::TemplateRecord;

/// File whose presence marks a directory as a template.
pub const MANIFEST_MARKER: &str = ".addon";

/// What a repository's tree says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The manifest sits at the top level.
    Root,
    /// These first-level subdirectories each hold a manifest.
    Nested(Vec<String>),
    NotTemplate,
}

impl Classification {
    /// Records this repository contributes. Sibling links are added by the catalog.
    pub fn into_records(self, repository: &RepositoryMetadata) -> Vec<TemplateRecord> {
        match self {
            Classification::Root => vec![TemplateRecord::root(repository.clone())],
            Classification::Nested(dirs) => dirs
                .into_iter()
                .map(|dir| TemplateRecord::nested(repository.clone(), dir))
                .collect(),
            Classification::NotTemplate => Vec::new(),
        }
    }
}

/// Walks repository trees, at most one level deep.
#[derive(Clone)]
pub struct TreeClassifier {
    api: ApiClient,
}

impl TreeClassifier {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Classify `repository` from the head of its default branch.
    ///
    /// Errors resolving the branch or the root tree are returned. A failed
    /// subdirectory lookup only drops that subdirectory.
    pub async fn classify(&self, repository: &RepositoryMetadata) -> ApiResult<Classification> {
        let full_name = repository.full_name.as_str();
        let sha = self
            .api
            .get_default_branch_head_tree_sha(full_name, &repository.default_branch)
            .await?;
        let tree = self.api.get_tree(full_name, &sha).await?;
        if tree.truncated {
            log::warn!("Tree of {} is truncated, some entries were not listed", full_name);
        }

        if has_manifest(&tree.entries) {
            return Ok(Classification::Root);
        }

        let candidates: Vec<&TreeEntry> = tree.entries.iter().filter(|e| e.is_dir()).collect();
        if candidates.is_empty() {
            return Ok(Classification::NotTemplate);
        }

        let mut nested = Vec::new();
        for candidate in candidates {
            match self.api.get_tree(full_name, &candidate.sha).await {
                Ok(subtree) if has_manifest(&subtree.entries) => {
                    nested.push(candidate.path.clone());
                }
                Ok(_) => {}
                Err(err) => log::warn!("Skipping {}/{}: {}", full_name, candidate.path, err),
            }
        }

        if nested.is_empty() {
            Ok(Classification::NotTemplate)
        } else {
            Ok(Classification::Nested(nested))
        }
    }
}

fn has_manifest(entries: &[TreeEntry]) -> bool {
    entries.iter().any(|entry| entry.path == MANIFEST_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RateLimitedCache;
    use crate::github::transport::MockTransport;
    use crate::testing::repository;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://api.example.test";

    fn branch(transport: MockTransport, full_name: &str, tree_sha: &str) -> MockTransport {
        transport.with_json(
            &format!("{BASE}/repos/{full_name}/branches/main"),
            json!({
                "name": "main",
                "commit": { "sha": "c1", "commit": { "tree": { "sha": tree_sha } } }
            }),
        )
    }

    fn tree(
        transport: MockTransport,
        full_name: &str,
        sha: &str,
        entries: &[(&str, &str, &str)],
    ) -> MockTransport {
        let entries: Vec<_> = entries
            .iter()
            .map(|(path, kind, sha)| json!({ "path": path, "type": kind, "sha": sha }))
            .collect();
        transport.with_json(
            &format!("{BASE}/repos/{full_name}/git/trees/{sha}"),
            json!({ "sha": sha, "tree": entries, "truncated": false }),
        )
    }

    fn classifier(transport: MockTransport) -> TreeClassifier {
        TreeClassifier::new(ApiClient::new(Arc::new(RateLimitedCache::new(
            BASE,
            Arc::new(transport),
        ))))
    }

    #[tokio::test]
    async fn test_root_manifest_is_single_template() {
        let transport = branch(MockTransport::new(), "x/y", "abc");
        let transport = tree(
            transport,
            "x/y",
            "abc",
            &[(".addon", "blob", "1"), ("assets", "tree", "2")],
        );
        let repo = repository(1, "x/y");

        let classification = classifier(transport).classify(&repo).await.unwrap();
        assert_eq!(classification, Classification::Root);

        let records = classification.into_records(&repo);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sub_directory, None);
    }

    #[tokio::test]
    async fn test_nested_templates_one_level_down() {
        let transport = branch(MockTransport::new(), "x/y", "root");
        let transport = tree(
            transport,
            "x/y",
            "root",
            &[
                ("a", "tree", "ta"),
                ("b", "tree", "tb"),
                ("c", "tree", "tc"),
                ("LICENSE", "blob", "l"),
            ],
        );
        let transport = tree(transport, "x/y", "ta", &[(".addon", "blob", "1")]);
        let transport = tree(
            transport,
            "x/y",
            "tb",
            &[(".addon", "blob", "2"), ("x.gd", "blob", "3")],
        );
        let transport = tree(transport, "x/y", "tc", &[("notes.txt", "blob", "4")]);

        let classification = classifier(transport)
            .classify(&repository(1, "x/y"))
            .await
            .unwrap();

        assert_eq!(
            classification,
            Classification::Nested(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[tokio::test]
    async fn test_manifest_two_levels_down_is_ignored() {
        let transport = branch(MockTransport::new(), "x/y", "root");
        let transport = tree(transport, "x/y", "root", &[("outer", "tree", "to")]);
        let transport = tree(transport, "x/y", "to", &[("inner", "tree", "ti")]);
        let transport = tree(transport, "x/y", "ti", &[(".addon", "blob", "1")]);
        let transport = Arc::new(transport);
        let classifier = TreeClassifier::new(ApiClient::new(Arc::new(RateLimitedCache::new(
            BASE,
            transport.clone(),
        ))));

        let classification = classifier.classify(&repository(1, "x/y")).await.unwrap();

        assert_eq!(classification, Classification::NotTemplate);
        assert_eq!(transport.calls_to(&format!("{BASE}/repos/x/y/git/trees/ti")), 0);
    }

    #[tokio::test]
    async fn test_no_manifest_and_no_dirs_is_not_template() {
        let transport = branch(MockTransport::new(), "x/y", "abc");
        let transport = tree(transport, "x/y", "abc", &[("README.md", "blob", "1")]);

        let classification = classifier(transport)
            .classify(&repository(1, "x/y"))
            .await
            .unwrap();

        assert_eq!(classification, Classification::NotTemplate);
        assert!(classification.into_records(&repository(1, "x/y")).is_empty());
    }

    #[tokio::test]
    async fn test_failed_subdirectory_is_skipped() {
        let transport = branch(MockTransport::new(), "x/y", "root");
        let transport = tree(
            transport,
            "x/y",
            "root",
            &[("broken", "tree", "missing"), ("good", "tree", "tg")],
        );
        let transport = tree(transport, "x/y", "tg", &[(".addon", "blob", "1")]);

        let classification = classifier(transport)
            .classify(&repository(1, "x/y"))
            .await
            .unwrap();

        assert_eq!(classification, Classification::Nested(vec!["good".to_string()]));
    }

    #[tokio::test]
    async fn test_branch_failure_aborts_repository() {
        let result = classifier(MockTransport::new())
            .classify(&repository(1, "x/y"))
            .await;
        assert!(result.is_err());
    }
}
