use std::io::Write;

use clap::ValueEnum;
use sqlx::PgPool;

use super::output::{write_header, write_row, OutputFormat};
use crate::core::cleanup::{
    preview_cleanup, run_cleanup, CleanupPlan, CleanupRequest, DuplicateCluster, KeepPolicy,
    MatchMode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeepArg {
    /// Keep the smallest id in each cluster
    Oldest,
    /// Keep the largest id in each cluster
    Newest,
}

impl From<KeepArg> for KeepPolicy {
    fn from(value: KeepArg) -> Self {
        match value {
            KeepArg::Oldest => KeepPolicy::Oldest,
            KeepArg::Newest => KeepPolicy::Newest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MatchArg {
    /// Same username OR same email, followed transitively
    #[default]
    Any,
    /// Same username AND same email, as in the duplicate-users report
    Both,
}

impl From<MatchArg> for MatchMode {
    fn from(value: MatchArg) -> Self {
        match value {
            MatchArg::Any => MatchMode::Any,
            MatchArg::Both => MatchMode::Both,
        }
    }
}

fn write_plan<W: Write>(plan: &CleanupPlan, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    write_header::<DuplicateCluster, W>(format, out)?;
    for cluster in plan.clusters.iter() {
        write_row(cluster, format, out)?;
    }
    Ok(())
}

/// Previews when `dry_run` is set, otherwise deletes. Deleting still needs
/// `request.confirmed`.
pub async fn cleanup<W: Write>(
    pool: &PgPool,
    request: CleanupRequest,
    dry_run: bool,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<u64> {
    if dry_run {
        let plan = preview_cleanup(pool, request.policy, request.match_mode).await?;
        match format {
            OutputFormat::Table => write_plan(&plan, format, out)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &plan)?;
                writeln!(out)?;
            }
        }
        return Ok(0);
    }

    let outcome = run_cleanup(pool, &request).await?;
    match format {
        OutputFormat::Table => {
            write_plan(&outcome.plan, format, out)?;
            writeln!(out, "deleted users\t{}", outcome.deleted)?;
            writeln!(out, "orphaned profiles\t{}", outcome.orphaned_profiles)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &outcome)?;
            writeln!(out)?;
        }
    }
    Ok(outcome.deleted)
}
