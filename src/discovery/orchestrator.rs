// Discovery orchestration.
// Runs both topic searches, classifies every hit, and assembles a sibling-linked catalog.

use std::collections::HashSet;

use futures::future::join_all;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::github::{ApiClient, RepositoryMetadata};
use crate::templates::{Catalog, TemplateRecord};

use super::classifier::TreeClassifier;

/// Result of a discovery pass.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    Found(Catalog),
    /// Every search succeeded and no repository held a template.
    NothingFound,
    /// Nothing was found and at least one request failed. A rate-limit error
    /// is reported in preference to any other.
    Failed(ApiError),
}

impl DiscoveryOutcome {
    /// The catalog, empty when nothing was found or discovery failed.
    pub fn into_catalog(self) -> Catalog {
        match self {
            DiscoveryOutcome::Found(catalog) => catalog,
            DiscoveryOutcome::NothingFound | DiscoveryOutcome::Failed(_) => Catalog::new(),
        }
    }
}

/// Finds templates on GitHub.
pub struct DiscoveryOrchestrator {
    api: ApiClient,
    classifier: TreeClassifier,
    queries: [String; 2],
}

impl DiscoveryOrchestrator {
    pub fn new(api: ApiClient, queries: [String; 2]) -> Self {
        Self {
            classifier: TreeClassifier::new(api.clone()),
            api,
            queries,
        }
    }

    pub fn from_config(api: ApiClient, config: &Config) -> Self {
        Self::new(api, config.search_queries())
    }

    /// Run one full discovery pass.
    ///
    /// Failures of a search or of one repository's classification are logged
    /// and only drop that part of the result.
    pub async fn refresh(&self) -> DiscoveryOutcome {
        let [first, second] = &self.queries;
        let (first, second) = tokio::join!(self.search(first), self.search(second));

        let mut failure = None;
        let mut seen = HashSet::new();
        let mut repositories = Vec::new();
        for result in [first, second] {
            match result {
                Ok(found) => repositories.extend(
                    found
                        .into_iter()
                        .filter(|repository| seen.insert(repository.id)),
                ),
                Err(err) => record_failure(&mut failure, err),
            }
        }
        log::info!("Classifying {} repositories", repositories.len());

        let classified = join_all(
            repositories
                .iter()
                .map(|repository| self.templates_in(repository)),
        )
        .await;

        let mut catalog = Catalog::new();
        for result in classified {
            match result {
                Ok(records) => {
                    let ids: Vec<_> = records.into_iter().map(|r| catalog.push(r)).collect();
                    catalog.link_siblings(&ids);
                }
                Err(err) if err.is_rate_limited() => record_failure(&mut failure, err),
                Err(_) => {}
            }
        }

        if !catalog.is_empty() {
            log::info!("Found {} templates", catalog.len());
            return DiscoveryOutcome::Found(catalog);
        }
        match failure {
            Some(err) => {
                log::error!("Discovery found nothing and failed: {}", err);
                DiscoveryOutcome::Failed(err)
            }
            None => {
                log::info!("No templates found");
                DiscoveryOutcome::NothingFound
            }
        }
    }

    async fn search(&self, query: &str) -> ApiResult<Vec<RepositoryMetadata>> {
        match self.api.search(query).await {
            Ok(results) => {
                log::debug!("Search {:?} matched {} repositories", query, results.count);
                Ok(results.repositories)
            }
            Err(err) => {
                log::error!("Search {:?} failed: {}", query, err);
                Err(err)
            }
        }
    }

    async fn templates_in(
        &self,
        repository: &RepositoryMetadata,
    ) -> ApiResult<Vec<TemplateRecord>> {
        match self.classifier.classify(repository).await {
            Ok(classification) => Ok(classification.into_records(repository)),
            Err(err) => {
                log::warn!("Could not classify {}: {}", repository.full_name, err);
                Err(err)
            }
        }
    }
}

/// Keep the first failure, unless a later one is a rate limit.
fn record_failure(slot: &mut Option<ApiError>, err: ApiError) {
    let replace = match slot {
        None => true,
        Some(existing) => err.is_rate_limited() && !existing.is_rate_limited(),
    };
    if replace {
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RateLimitedCache;
    use crate::github::endpoints::search_endpoint;
    use crate::github::transport::MockTransport;
    use crate::testing::repo_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://api.example.test";
    const TOPIC: &str = "topic:addon-template";
    const PAIR: &str = "topic:addon topic:template";

    fn search(
        transport: MockTransport,
        query: &str,
        repos: Vec<serde_json::Value>,
    ) -> MockTransport {
        transport.with_json(
            &format!("{BASE}{}", search_endpoint(query)),
            json!({ "total_count": repos.len(), "items": repos }),
        )
    }

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
        entries: serde_json::Value,
    ) -> MockTransport {
        transport.with_json(
            &format!("{BASE}/repos/{full_name}/git/trees/{sha}"),
            json!({ "sha": sha, "tree": entries }),
        )
    }

    fn manifest() -> serde_json::Value {
        json!([{ "path": ".addon", "type": "blob", "sha": "1" }])
    }

    fn orchestrator(transport: MockTransport) -> DiscoveryOrchestrator {
        let cache = RateLimitedCache::new(BASE, Arc::new(transport));
        let api = ApiClient::new(Arc::new(cache));
        DiscoveryOrchestrator::new(api, [TOPIC.to_string(), PAIR.to_string()])
    }

    #[tokio::test]
    async fn test_single_root_repository_end_to_end() {
        let transport = search(MockTransport::new(), TOPIC, vec![repo_json(1, "x/y")]);
        let transport = search(transport, PAIR, vec![]);
        let transport = branch(transport, "x/y", "abc");
        let transport = tree(transport, "x/y", "abc", manifest());

        let catalog = match orchestrator(transport).refresh().await {
            DiscoveryOutcome::Found(catalog) => catalog,
            other => panic!("expected a template, got {:?}", other),
        };

        assert_eq!(catalog.len(), 1);
        let (_, record) = catalog.iter().next().unwrap();
        assert_eq!(record.repository.full_name, "x/y");
        assert_eq!(record.sub_directory, None);
        assert_eq!(record.siblings().count(), 0);
    }

    #[tokio::test]
    async fn test_nested_repository_links_siblings() {
        let transport = search(MockTransport::new(), TOPIC, vec![]);
        let transport = search(transport, PAIR, vec![repo_json(5, "m/multi")]);
        let transport = branch(transport, "m/multi", "root");
        let transport = tree(
            transport,
            "m/multi",
            "root",
            json!([
                { "path": "a", "type": "tree", "sha": "ta" },
                { "path": "b", "type": "tree", "sha": "tb" },
                { "path": "c", "type": "tree", "sha": "tc" }
            ]),
        );
        let transport = tree(transport, "m/multi", "ta", manifest());
        let transport = tree(transport, "m/multi", "tb", manifest());
        let transport = tree(
            transport,
            "m/multi",
            "tc",
            json!([{ "path": "x.txt", "type": "blob", "sha": "3" }]),
        );

        let catalog = orchestrator(transport).refresh().await.into_catalog();

        assert_eq!(catalog.len(), 2);
        let a = catalog.find("m/multi", Some("a")).unwrap();
        let b = catalog.find("m/multi", Some("b")).unwrap();
        assert_eq!(catalog.get(a).unwrap().siblings().collect::<Vec<_>>(), vec![b]);
        assert_eq!(catalog.get(b).unwrap().siblings().collect::<Vec<_>>(), vec![a]);
    }

    #[tokio::test]
    async fn test_repository_in_both_searches_counted_once() {
        let transport = search(MockTransport::new(), TOPIC, vec![repo_json(1, "x/y")]);
        let transport = search(transport, PAIR, vec![repo_json(1, "x/y")]);
        let transport = branch(transport, "x/y", "abc");
        let transport = tree(transport, "x/y", "abc", manifest());

        let catalog = orchestrator(transport).refresh().await.into_catalog();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_search_does_not_abort_other() {
        // only the paired query is registered; the topic query answers 404
        let transport = search(MockTransport::new(), PAIR, vec![repo_json(1, "x/y")]);
        let transport = branch(transport, "x/y", "abc");
        let transport = tree(transport, "x/y", "abc", manifest());

        let catalog = orchestrator(transport).refresh().await.into_catalog();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_unclassifiable_repository_is_skipped() {
        let transport = search(
            MockTransport::new(),
            TOPIC,
            vec![repo_json(1, "x/y"), repo_json(2, "x/broken")],
        );
        let transport = search(transport, PAIR, vec![]);
        let transport = branch(transport, "x/y", "abc");
        let transport = tree(transport, "x/y", "abc", manifest());

        let catalog = orchestrator(transport).refresh().await.into_catalog();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.find("x/broken", None).is_none());
    }

    #[tokio::test]
    async fn test_nothing_found_is_distinct() {
        let transport = search(MockTransport::new(), TOPIC, vec![]);
        let transport = search(transport, PAIR, vec![]);

        let outcome = orchestrator(transport).refresh().await;
        assert!(matches!(outcome, DiscoveryOutcome::NothingFound));
    }

    #[tokio::test]
    async fn test_rate_limited_search_is_not_nothing_found() {
        // the paired query is unregistered and answers 404
        let transport = MockTransport::new().with_body(
            &format!("{BASE}{}", search_endpoint(TOPIC)),
            403,
            r#"{"message":"API rate limit exceeded"}"#,
        );

        let outcome = orchestrator(transport).refresh().await;

        match outcome {
            DiscoveryOutcome::Failed(err) => assert!(err.is_rate_limited()),
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_search_with_empty_other_is_failure() {
        let transport = search(MockTransport::new(), PAIR, vec![]);

        let outcome = orchestrator(transport).refresh().await;

        assert!(matches!(
            outcome,
            DiscoveryOutcome::Failed(ApiError::NotFound(_))
        ));
    }
}
