// Git command runner.
// Runs git in a working directory and streams its output to the log. No timeout is applied.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::GitError;

/// Runs git commands.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` inside `working_dir` and wait for it to exit.
    async fn run(&self, args: &[&str], working_dir: &Path) -> Result<(), GitError>;
}

/// Runs the `git` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a different executable, e.g. an absolute path to git.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn run(&self, args: &[&str], working_dir: &Path) -> Result<(), GitError> {
        let command = args.join(" ");
        log::info!("git {} (in {})", command, working_dir.display());

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::Launch {
                command: command.clone(),
                source,
            })?;

        // stderr carries clone/pull progress, not only failures
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::join!(stream_lines(stdout, "stdout"), stream_lines(stderr, "stderr"));

        let status = child.wait().await.map_err(|source| GitError::Launch {
            command: command.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(GitError::Failed {
                command,
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

async fn stream_lines<R: AsyncRead + Unpin>(reader: Option<R>, stream: &str) {
    let Some(reader) = reader else {
        return;
    };

    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::debug!("git {}: {}", stream, line);
    }
}
