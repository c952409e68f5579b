use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitsync::fs::LocalBackend;
use gitsync::logging::{error, init_tracing};
use gitsync::remote::GitHubRemote;
use gitsync::sync::{OpStatus, RequestThrottle, SyncEngine, SyncProgress, SyncStrategy, SyncSummary};
use gitsync::{Settings, SettingsStore};

#[derive(Parser)]
#[command(name = "gitsync", version, about = "Sync a local folder with a GitHub repository")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Token override; not persisted
    #[arg(long = "token", env = "GITSYNC_TOKEN", global = true, hide_env_values = true)]
    api_token: Option<String>,

    /// Local folder to sync
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync: local_to_remote, remote_to_local or merge
    Sync {
        mode: SyncStrategy,
        /// Print the plan without transferring anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the token against the remote
    Whoami,
    /// List repositories visible to the token
    Repos,
    /// List branches of the configured repository
    Branches,
    /// Edit repository, branch and timer settings
    Configure(ConfigureArgs),
    /// Manage the stored token
    #[command(subcommand)]
    Token(TokenCommand),
    /// Manage exclusion rules
    #[command(subcommand)]
    Exclude(ExcludeCommand),
    /// Show the recent sync log
    Log {
        /// Clear the log instead
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct ConfigureArgs {
    /// Repository as owner/name
    #[arg(long)]
    repository: Option<String>,
    #[arg(long)]
    branch: Option<String>,
    /// Fixed sync interval in seconds (0 disables)
    #[arg(long)]
    interval: Option<u64>,
    /// Sync delay after the last edit in seconds (0 disables)
    #[arg(long)]
    idle: Option<u64>,
    /// Remote requests per second (0 disables pacing)
    #[arg(long)]
    rate: Option<u32>,
}

#[derive(Subcommand)]
enum TokenCommand {
    Set { token: String },
    Lock,
    Unlock,
}

#[derive(Subcommand)]
enum ExcludeCommand {
    List,
    Add { rule: String },
    Remove { rule: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let path = match cli.config.clone() {
        Some(path) => path,
        None => SettingsStore::default_path()?,
    };
    let mut store = SettingsStore::load(path)?;

    match cli.command {
        Command::Sync { mode, dry_run } => {
            let settings = effective_settings(store.settings(), cli.api_token.as_deref());
            let result = run_sync(&settings, &cli.root, mode, dry_run).await;
            match result {
                Ok(Some(summary)) => {
                    store.update(|s| {
                        s.log.extend_from(&summary.log);
                        Ok(())
                    })?;
                    print_summary(&summary);
                }
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "sync aborted");
                    store.update(|s| {
                        s.log.push(format!("{} aborted: {}", mode.label(), err));
                        Ok(())
                    })?;
                    return Err(err);
                }
            }
        }
        Command::Whoami => {
            let remote = connect(store.settings(), cli.api_token.as_deref())?;
            let user = remote.current_user().await?;
            match user.name {
                Some(name) => println!("{} ({})", user.login.bold(), name),
                None => println!("{}", user.login.bold()),
            }
        }
        Command::Repos => {
            let remote = connect(store.settings(), cli.api_token.as_deref())?;
            for repo in remote.list_repositories().await? {
                let visibility = if repo.private { "private" } else { "public" };
                println!("{} {}", repo.full_name, visibility.dimmed());
            }
        }
        Command::Branches => {
            let remote = connect(store.settings(), cli.api_token.as_deref())?;
            for branch in remote.list_branches().await? {
                if branch.name == remote.branch() {
                    println!("* {}", branch.name.green());
                } else {
                    println!("  {}", branch.name);
                }
            }
        }
        Command::Configure(args) => {
            store.update(|s| {
                if let Some(repository) = args.repository {
                    s.repository = repository;
                }
                if let Some(branch) = args.branch {
                    s.branch = branch;
                }
                if let Some(interval) = args.interval {
                    s.sync_interval_secs = interval;
                }
                if let Some(idle) = args.idle {
                    s.idle_sync_secs = idle;
                }
                if let Some(rate) = args.rate {
                    s.requests_per_second = rate;
                }
                Ok(())
            })?;
            let settings = store.settings();
            println!(
                "Saved {} ({}@{}, {})",
                store.path().display(),
                settings.repository,
                settings.branch,
                settings.request_rate().display()
            );
        }
        Command::Token(command) => match command {
            TokenCommand::Set { token } => {
                store.update(|s| Ok(s.set_token(&token)?))?;
                println!("Token updated");
            }
            TokenCommand::Lock => store.update(|s| {
                s.token_locked = true;
                Ok(())
            })?,
            TokenCommand::Unlock => store.update(|s| {
                s.token_locked = false;
                Ok(())
            })?,
        },
        Command::Exclude(command) => match command {
            ExcludeCommand::List => {
                for rule in &store.settings().exclusion_rules {
                    println!("{}", rule);
                }
            }
            ExcludeCommand::Add { rule } => {
                if !store.update(|s| Ok(s.add_exclusion(&rule)?))? {
                    println!("Rule already present: {}", rule);
                }
            }
            ExcludeCommand::Remove { rule } => {
                if !store.update(|s| Ok(s.remove_exclusion(&rule)))? {
                    println!("No such rule: {}", rule);
                }
            }
        },
        Command::Log { clear } => {
            if clear {
                store.update(|s| {
                    s.log.clear();
                    Ok(())
                })?;
            } else {
                for entry in store.settings().log.entries() {
                    println!("{}", entry);
                }
            }
        }
    }

    Ok(())
}

/// Stored settings with the command-line token applied.
fn effective_settings(stored: &Settings, token: Option<&str>) -> Settings {
    let mut settings = stored.clone();
    if let Some(token) = token {
        settings.token = token.to_string();
    }
    settings
}

fn connect(stored: &Settings, token: Option<&str>) -> Result<GitHubRemote> {
    let settings = effective_settings(stored, token);
    settings.validate()?;
    let remote = GitHubRemote::new(&settings.token, &settings.repository, &settings.branch)?
        .with_throttle(RequestThrottle::new(settings.request_rate()));
    Ok(remote)
}

async fn run_sync(
    settings: &Settings,
    root: &Path,
    mode: SyncStrategy,
    dry_run: bool,
) -> Result<Option<SyncSummary>> {
    let remote = connect(settings, None)?;
    let exclude = settings.exclusion_rules()?;
    let root = root
        .canonicalize()
        .with_context(|| format!("Local folder not found: {}", root.display()))?;
    let local = Arc::new(LocalBackend::new(root));

    if dry_run {
        let engine = SyncEngine::new(local, Arc::new(remote));
        let ops = engine.preview(mode, &exclude).await?;
        if ops.is_empty() {
            println!("Nothing to do");
        }
        for op in ops {
            println!("{}", op);
        }
        return Ok(None);
    }

    if mode.is_destructive() {
        println!(
            "{}",
            "Remote files missing locally will be deleted".yellow()
        );
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel::<SyncProgress>(64);
    let engine = SyncEngine::new(local, Arc::new(remote)).with_progress(tx);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let bar_task = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                bar.set_length(progress.total_files as u64);
                bar.set_position(progress.files_done as u64);
                bar.set_message(progress.current_file);
            }
        })
    };

    let summary = engine.run(mode, &exclude).await;
    drop(engine);
    let _ = bar_task.await;
    bar.finish_and_clear();

    Ok(Some(summary?))
}

fn print_summary(summary: &SyncSummary) {
    let headline = summary.headline();
    if summary.is_clean() {
        println!("{}", headline.green());
    } else {
        println!("{}", headline.yellow());
        for outcome in summary.failures() {
            if let OpStatus::Failed { reason } = &outcome.status {
                println!("  {} {}: {}", "✗".red(), outcome.op, reason);
            }
        }
    }
    println!(
        "{} transferred in {:.1}s",
        format_size(summary.bytes_transferred, DECIMAL),
        summary.duration.as_secs_f64()
    );
}
