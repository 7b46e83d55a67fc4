use std::str::FromStr;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use user_hygiene::{
    cli::{
        cleanup::{cleanup, KeepArg, MatchArg},
        output::OutputFormat,
        report::{run_check, run_report, Report},
    },
    core::{cleanup::CleanupRequest, db::init_pool},
    settings::{get_config, uses_env_file, Config},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read-only duplicate and orphan reports
    Report(ReportArgs),
    /// Check the connection and count the rows of every report
    Check {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Delete all but one user per duplicate cluster
    ///
    /// Deleted users are gone for good and their profiles are left orphaned.
    /// Back up the database first.
    ///
    /// The default `--match any` treats users sharing a username OR an email as
    /// duplicates. That is looser than the duplicate-users report, which needs
    /// both. `--match both` lines cleanup up with that report.
    Cleanup(CleanupArgs),
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[command(subcommand)]
    command: ReportCommands,
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Subcommand)]
enum ReportCommands {
    /// Usernames held by more than one user, with counts
    DuplicateUsernames,
    /// Emails held by more than one user, with counts
    DuplicateEmails,
    /// Users sharing both username and email, oldest first per username
    DuplicateUsers,
    /// Profiles whose user does not exist
    OrphanedProfiles,
    /// Users without a profile
    UserlessUsers,
}

impl From<&ReportCommands> for Report {
    fn from(value: &ReportCommands) -> Self {
        match value {
            ReportCommands::DuplicateUsernames => Report::DuplicateUsernames,
            ReportCommands::DuplicateEmails => Report::DuplicateEmails,
            ReportCommands::DuplicateUsers => Report::DuplicateUsers,
            ReportCommands::OrphanedProfiles => Report::OrphanedProfiles,
            ReportCommands::UserlessUsers => Report::UserlessUsers,
        }
    }
}

#[derive(Debug, Args)]
struct CleanupArgs {
    /// Which user survives in each duplicate cluster
    #[arg(short, long, value_enum)]
    keep: Option<KeepArg>,
    /// When two users count as duplicates
    #[arg(short, long = "match", value_enum, default_value_t = MatchArg::Any)]
    match_mode: MatchArg,
    /// Actually delete. Required unless --dry-run
    #[arg(long)]
    confirm: bool,
    /// Print the clusters that would be cleaned without deleting
    #[arg(long, conflicts_with = "confirm")]
    dry_run: bool,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

fn init_tracing(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let log_level = Level::from_str(config.log_level())
        .with_context(|| format!("invalid log level {}", config.log_level()))?;
    match &config.log_dir {
        Some(log_dir) => {
            // Logging to File
            let file_appender = tracing_appender::rolling::daily(log_dir, "user_hygiene.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_max_level(log_level)
                .init();
            Ok(Some(guard))
        }
        None => {
            // stdout carries report output
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_max_level(log_level)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = get_config()?;
    let _guard = init_tracing(&config)?;

    if uses_env_file() {
        tracing::info!("using .env file as environment variable");
    } else {
        tracing::info!("using server environment as environment variable");
    }
    tracing::info!("connecting to database");
    let pool = init_pool(&config).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Report(report_args) => {
            run_report(
                &pool,
                Report::from(&report_args.command),
                report_args.format,
                &mut out,
            )
            .await?;
        }
        Commands::Check { format } => {
            let summary = run_check(&pool, *format, &mut out).await?;
            if !summary.is_clean() {
                tracing::warn!("hygiene issues found: {:?}", summary);
            }
        }
        Commands::Cleanup(cleanup_args) => {
            let request = CleanupRequest {
                policy: cleanup_args.keep.map(Into::into),
                match_mode: cleanup_args.match_mode.into(),
                confirmed: cleanup_args.confirm,
            };
            let deleted = cleanup(
                &pool,
                request,
                cleanup_args.dry_run,
                cleanup_args.format,
                &mut out,
            )
            .await?;
            if deleted > 0 {
                eprintln!("deleted {deleted} users; run `report orphaned-profiles` to find profiles left behind");
            }
        }
    }
    Ok(())
}
