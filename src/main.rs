// tplsync command line.
// Lists templates found on GitHub and installs, updates, or deletes them locally.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use tplsync::git::GitCli;
use tplsync::progress::BarProgress;
use tplsync::templates::TemplatePaths;
use tplsync::{
    ApiClient, Catalog, Config, DiscoveryOrchestrator, DiscoveryOutcome, GitFailurePolicy,
    Installer, TemplateId, TemplateState, UpdateOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "tplsync", version, about = "Discover and install addon templates from GitHub")]
struct Cli {
    /// Directory holding cloned repositories and installed templates.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Abort install/update when a git command fails.
    #[arg(long, global = true)]
    strict_git: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every template found on GitHub.
    List,
    /// List installed templates and whether they need attention.
    Status,
    /// Download a template (`owner/name` or `owner/name:subdir`).
    Install { selector: String },
    /// Pull upstream changes for an installed template.
    Update { selector: String },
    /// Remove a template and its siblings from disk. A numeric repository id
    /// (as shown by `status`) works without contacting GitHub.
    Delete { selector: String },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.data_dir)
        .context("Could not determine a data directory, pass --data-dir")?;
    if cli.strict_git {
        config.git_failures = GitFailurePolicy::Strict;
    }

    let api = ApiClient::connect(&config.api_base)?;
    let orchestrator = DiscoveryOrchestrator::from_config(api.clone(), &config);
    let installer = Installer::new(api, Arc::new(GitCli::new()), TemplatePaths::from_config(&config))
        .with_progress(Arc::new(BarProgress::new()))
        .with_git_failures(config.git_failures);

    match cli.command {
        Command::List => {
            let Some(catalog) = discovered(orchestrator.refresh().await)? else {
                println!("No templates found.");
                return Ok(());
            };
            print_catalog(&catalog, &installer, false);
        }
        Command::Status => {
            let catalog = match orchestrator.refresh().await {
                DiscoveryOutcome::Failed(err) => {
                    log::warn!("Showing local installs only, discovery failed: {}", err);
                    Catalog::new()
                }
                outcome => outcome.into_catalog(),
            };
            print_catalog(&catalog, &installer, true);
            print_unlisted(&catalog, &installer);
        }
        Command::Install { selector } => {
            let catalog = require_catalog(orchestrator.refresh().await)?;
            let id = select(&catalog, &selector)?;
            installer.download(&catalog, id).await?;
            println!("Installed {}", selector);
        }
        Command::Update { selector } => {
            let mut catalog = require_catalog(orchestrator.refresh().await)?;
            let id = select(&catalog, &selector)?;
            match installer.update(&mut catalog, id).await? {
                UpdateOutcome::AlreadyCurrent => println!("{} is already up to date", selector),
                UpdateOutcome::Updated => println!("Updated {}", selector),
            }
        }
        Command::Delete { selector } => {
            if let Some(repository_id) = local_selector(&selector) {
                let removed = installer.delete_local(repository_id);
                println!("Deleted {} ({} installed templates)", selector, removed);
                return Ok(());
            }
            let catalog = require_catalog(orchestrator.refresh().await)?;
            let id = select(&catalog, &selector)?;
            installer.delete(&catalog, id);
            println!("Deleted {}", selector);
        }
    }

    Ok(())
}

/// `None` when discovery succeeded without finding anything.
fn discovered(outcome: DiscoveryOutcome) -> Result<Option<Catalog>> {
    match outcome {
        DiscoveryOutcome::Found(catalog) => Ok(Some(catalog)),
        DiscoveryOutcome::NothingFound => Ok(None),
        DiscoveryOutcome::Failed(err) => Err(err).context("Template discovery failed"),
    }
}

fn require_catalog(outcome: DiscoveryOutcome) -> Result<Catalog> {
    discovered(outcome)?.context("No templates found")
}

fn print_catalog(catalog: &Catalog, installer: &Installer, installed_only: bool) {
    for (_, record) in catalog.iter() {
        let state = installer.state(record);
        if installed_only && state == TemplateState::NotInstalled {
            continue;
        }

        let selector = match &record.sub_directory {
            Some(sub) => format!("{}:{}", record.repository.full_name, sub),
            None => record.repository.full_name.clone(),
        };
        println!("{:<40} {:<18} {}", selector, state.label(), record.display_name());
        if let Some(description) = &record.repository.description {
            println!("    {}", description);
        }
    }
}

/// Installed directories with no record in `catalog`, listed by repository id.
fn print_unlisted(catalog: &Catalog, installer: &Installer) {
    let paths = installer.paths();
    let listed: HashSet<PathBuf> = catalog
        .iter()
        .map(|(_, record)| record.installed_dir(paths))
        .collect();

    for install in installer.local_installs() {
        if listed.contains(&install.path) {
            continue;
        }
        let state = if paths.git_dir(install.repository_id).is_dir() {
            "unlisted"
        } else {
            "unlisted, corrupted"
        };
        println!("{:<40} {}", install.selector(), state);
    }
}

/// A numeric `id` or `id:subdir` selector, resolved from disk without discovery.
fn local_selector(selector: &str) -> Option<u64> {
    let id = selector.split_once(':').map_or(selector, |(id, _)| id);
    id.parse().ok()
}

fn select(catalog: &Catalog, selector: &str) -> Result<TemplateId> {
    let (full_name, sub_directory) = match selector.split_once(':') {
        Some((full_name, sub)) => (full_name, Some(sub)),
        None => (selector, None),
    };
    if !full_name.contains('/') {
        bail!("Expected owner/name or owner/name:subdir, got {}", selector);
    }

    catalog
        .find(full_name, sub_directory)
        .with_context(|| format!("No template named {} was found", selector))
}
