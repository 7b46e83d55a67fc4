use std::io::Write;

use sqlx::PgPool;
use tracing::info;

use super::output::{write_stream, OutputFormat};
use crate::{
    core::summary::{summary, HygieneSummary},
    repository,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Report {
    DuplicateUsernames,
    DuplicateEmails,
    DuplicateUsers,
    OrphanedProfiles,
    UserlessUsers,
}

pub async fn run_report<W: Write>(
    pool: &PgPool,
    report: Report,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<usize> {
    let count = match report {
        Report::DuplicateUsernames => {
            write_stream(repository::user::duplicate_usernames(pool), format, out).await?
        }
        Report::DuplicateEmails => {
            write_stream(repository::user::duplicate_emails(pool), format, out).await?
        }
        Report::DuplicateUsers => {
            write_stream(repository::user::duplicate_user_details(pool), format, out).await?
        }
        Report::OrphanedProfiles => {
            write_stream(repository::profile::orphaned_profiles(pool), format, out).await?
        }
        Report::UserlessUsers => {
            write_stream(repository::user::userless_users(pool), format, out).await?
        }
    };
    info!("report {:?}: {} rows", report, count);
    Ok(count)
}

pub async fn run_check<W: Write>(
    pool: &PgPool,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<HygieneSummary> {
    let res = summary(pool).await?;
    match format {
        OutputFormat::Table => {
            for (name, count) in res.entries() {
                writeln!(out, "{}\t{}", name, count)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &res)?;
            writeln!(out)?;
        }
    }
    Ok(res)
}
