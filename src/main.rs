// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the github-exporter binary.
//!
//! `collect` runs a single cycle and prints the exposition text or writes it
//! to a file. `watch` repeats cycles on an interval and rewrites a textfile
//! for the node exporter textfile collector.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Duration,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use github_exporter::{
    ConfigSources, Error, Exporter, ExporterConfig, GitHubClient, RemoteQueryClient, RetryConfig, io_error,
    write_textfile,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line interface for exporting GitHub metrics.
#[derive(Debug, Parser,)]
#[command(name = "github-exporter", version, about = "Export GitHub repository metrics for Prometheus")]
struct Cli
{
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Run one collection cycle and print or write the exposition.
    Collect(CollectArgs,),
    /// Run collection cycles forever, rewriting a textfile after each one.
    Watch(WatchArgs,),
}

#[derive(Debug, Args,)]
struct CollectArgs
{
    /// File to write atomically instead of printing to stdout.
    #[arg(long = "output", value_name = "PATH")]
    output: Option<PathBuf,>,
}

#[derive(Debug, Args,)]
struct WatchArgs
{
    /// Textfile rewritten after every cycle.
    #[arg(long = "output", value_name = "PATH")]
    output: PathBuf,

    /// Seconds between the start of two cycles.
    #[arg(long = "interval-secs", value_name = "SECONDS", default_value_t = 60)]
    interval_secs: u64,
}

/// Entity lists, credentials and tuning knobs shared by every command.
#[derive(Debug, Args, Default,)]
struct SettingsArgs
{
    /// Comma-separated organization logins.
    #[arg(long = "orgs", env = "ORGS", value_name = "LOGINS", global = true)]
    orgs: Option<String,>,

    /// Comma-separated user logins.
    #[arg(long = "users", env = "USERS", value_name = "LOGINS", global = true)]
    users: Option<String,>,

    /// Comma-separated `owner/name` repositories.
    #[arg(long = "repos", env = "REPOS", value_name = "REPOSITORIES", global = true)]
    repos: Option<String,>,

    /// YAML document with additional entities and settings.
    #[arg(long = "config", env = "EXPORTER_CONFIG", value_name = "PATH", global = true)]
    config: Option<PathBuf,>,

    /// GitHub API base URL.
    #[arg(long = "api-url", env = "API_URL", value_name = "URL", global = true)]
    api_url: Option<String,>,

    /// Personal access token.
    #[arg(long = "token", env = "GITHUB_TOKEN", value_name = "TOKEN", hide_env_values = true, global = true)]
    token: Option<String,>,

    /// File holding the personal access token.
    #[arg(long = "token-file", env = "GITHUB_TOKEN_FILE", value_name = "PATH", global = true)]
    token_file: Option<PathBuf,>,

    /// Repositories fetched per user or organization.
    #[arg(long = "repo-page-size", env = "REPO_PAGE_SIZE", value_name = "N", global = true)]
    repo_page_size: Option<u32,>,

    /// Languages fetched per repository.
    #[arg(long = "language-page-size", env = "LANGUAGE_PAGE_SIZE", value_name = "N", global = true)]
    language_page_size: Option<u32,>,

    /// Upper bound on concurrent queries; unbounded when omitted.
    #[arg(long = "max-concurrency", env = "MAX_CONCURRENCY", value_name = "N", global = true)]
    max_concurrency: Option<usize,>,

    /// Per-attempt request timeout.
    #[arg(long = "timeout-secs", env = "TIMEOUT_SECS", value_name = "SECONDS", global = true)]
    timeout_secs: Option<u64,>,

    /// Drop repositories already reported by an earlier entity.
    #[arg(long = "dedupe", env = "DEDUPE", action = ArgAction::SetTrue, global = true)]
    dedupe: bool,
}

impl From<SettingsArgs,> for ConfigSources
{
    fn from(args: SettingsArgs,) -> Self
    {
        Self {
            organizations:      args.orgs,
            users:              args.users,
            repositories:       args.repos,
            document:           args.config,
            api_url:            args.api_url,
            token:              args.token,
            token_file:         args.token_file,
            repo_page_size:     args.repo_page_size,
            language_page_size: args.language_page_size,
            max_concurrency:    args.max_concurrency,
            timeout_secs:       args.timeout_secs,
            dedupe:             args.dedupe,
        }
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();

    if let Err(error,) = run().await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with_writer(io::stderr,)
        .init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, client construction and output errors. A cycle
/// with failed queries is not an error.
async fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();
    let config = ConfigSources::from(cli.settings,).resolve()?;
    let exporter = build_exporter(config,)?;

    match cli.command {
        Command::Collect(args,) => run_collect(&exporter, args,).await,
        Command::Watch(args,) => run_watch(&exporter, args,).await,
    }
}

fn build_exporter(config: ExporterConfig,) -> Result<Exporter<GitHubClient,>, Error,>
{
    if config.targets.is_empty() {
        warn!("No organizations, users or repositories configured");
    }
    if config.token.is_none() {
        info!("No token configured, querying {} anonymously", config.api_url);
    }

    let client = GitHubClient::new(
        &config.api_url,
        config.token.as_deref(),
        config.timeout,
        RetryConfig::default(),
    )?;

    Ok(Exporter::new(Arc::new(client,), config.targets, config.fetch,).with_dedupe(config.dedupe,),)
}

async fn run_collect(exporter: &Exporter<GitHubClient,>, args: CollectArgs,) -> Result<(), Error,>
{
    let text = exporter.render().await?;

    match args.output {
        Some(path,) => {
            let written = write_textfile(&path, &text,)?;
            info!("Wrote {} bytes to {}", written.bytes, written.destination.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes(),)
                .and_then(|()| handle.flush(),)
                .map_err(|source| io_error(Path::new("<stdout>",), source,),)?;
        }
    }

    Ok((),)
}

async fn run_watch(exporter: &Exporter<GitHubClient,>, args: WatchArgs,) -> Result<(), Error,>
{
    if args.interval_secs == 0 {
        return Err(Error::validation("interval must be greater than zero",),);
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs,),);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay,);
    info!("Writing {} every {}s", args.output.display(), args.interval_secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh(exporter, &args.output,).await;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(error,) = result {
                    warn!("Failed to listen for shutdown signal: {}", error);
                }
                info!("Shutting down");
                return Ok((),);
            }
        }
    }
}

/// Runs one cycle and rewrites `output`. Failures are logged and the
/// previous textfile, if any, stays in place until the next cycle.
async fn refresh<C: RemoteQueryClient,>(exporter: &Exporter<C,>, output: &Path,) -> bool
{
    let written = match exporter.render().await {
        Ok(text,) => write_textfile(output, &text,),
        Err(error,) => Err(error,),
    };

    match written {
        Ok(written,) => {
            info!("Refreshed {} ({} bytes)", written.destination.display(), written.bytes);
            true
        }
        Err(error,) => {
            warn!("Cycle failed, keeping previous output: {}", error.to_display_string());
            false
        }
    }
}
