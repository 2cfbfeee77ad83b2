// Runtime configuration.
// Resolves the API host, data directories, and discovery queries from defaults and environment.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::github::GITHUB_API_BASE;

pub const DEFAULT_TOPIC: &str = "addon-template";
pub const DEFAULT_TOPIC_PAIR: (&str, &str) = ("addon", "template");

/// What to do when a git command fails during download or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GitFailurePolicy {
    /// Log the failure and carry on to the copy step.
    #[default]
    Lenient,
    /// Abort the operation with the git error.
    Strict,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub data_dir: PathBuf,
    /// Topic searched on its own.
    pub topic: String,
    /// Two topics a repository must carry together.
    pub topic_pair: (String, String),
    pub git_failures: GitFailurePolicy,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base: GITHUB_API_BASE.to_string(),
            data_dir: data_dir.into(),
            topic: DEFAULT_TOPIC.to_string(),
            topic_pair: (
                DEFAULT_TOPIC_PAIR.0.to_string(),
                DEFAULT_TOPIC_PAIR.1.to_string(),
            ),
            git_failures: GitFailurePolicy::default(),
        }
    }

    /// Defaults overridden by `TPLSYNC_*` environment variables. An explicit
    /// `data_dir` wins over `TPLSYNC_DATA_DIR` and the platform default.
    pub fn load(data_dir: Option<PathBuf>) -> Option<Self> {
        let data_dir = data_dir
            .or_else(|| std::env::var_os("TPLSYNC_DATA_DIR").map(PathBuf::from))
            .or_else(default_data_dir)?;

        let mut config = Self::new(data_dir);
        if let Ok(base) = std::env::var("TPLSYNC_API_BASE") {
            config.api_base = base;
        }
        if let Ok(topic) = std::env::var("TPLSYNC_TOPIC") {
            config.topic = topic;
        }
        if let Some(pair) = std::env::var("TPLSYNC_TOPIC_PAIR")
            .ok()
            .as_deref()
            .and_then(parse_topic_pair)
        {
            config.topic_pair = pair;
        }
        if std::env::var("TPLSYNC_STRICT_GIT").is_ok_and(|v| is_truthy(&v)) {
            config.git_failures = GitFailurePolicy::Strict;
        }

        Some(config)
    }

    /// Root holding one git working copy per repository.
    pub fn cache_root(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Root holding the filtered, installed templates.
    pub fn templates_root(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    /// The two discovery queries, in GitHub search syntax.
    pub fn search_queries(&self) -> [String; 2] {
        [
            format!("topic:{}", self.topic),
            format!("topic:{} topic:{}", self.topic_pair.0, self.topic_pair.1),
        ]
    }
}

/// Platform data directory (~/.local/share/tplsync on Linux).
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tplsync").map(|dirs| dirs.data_dir().to_path_buf())
}

fn parse_topic_pair(value: &str) -> Option<(String, String)> {
    let (first, second) = value.split_once(',')?;
    let (first, second) = (first.trim(), second.trim());
    if first.is_empty() || second.is_empty() {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
