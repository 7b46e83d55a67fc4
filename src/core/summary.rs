use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::repository::{
    self,
    profile::ORPHANED_PROFILES_STMT,
    user::{
        DUPLICATE_EMAILS_STMT, DUPLICATE_USERNAMES_STMT, DUPLICATE_USER_DETAILS_STMT,
        USERLESS_USERS_STMT,
    },
};

/// Row counts for every hygiene report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HygieneSummary {
    pub users: i64,
    pub profiles: i64,
    pub duplicate_usernames: i64,
    pub duplicate_emails: i64,
    pub duplicate_users: i64,
    pub orphaned_profiles: i64,
    pub userless_users: i64,
}

impl HygieneSummary {
    pub fn is_clean(&self) -> bool {
        self.duplicate_usernames == 0
            && self.duplicate_emails == 0
            && self.duplicate_users == 0
            && self.orphaned_profiles == 0
            && self.userless_users == 0
    }

    pub fn entries(&self) -> [(&'static str, i64); 7] {
        [
            ("users", self.users),
            ("profiles", self.profiles),
            ("duplicate_usernames", self.duplicate_usernames),
            ("duplicate_emails", self.duplicate_emails),
            ("duplicate_users", self.duplicate_users),
            ("orphaned_profiles", self.orphaned_profiles),
            ("userless_users", self.userless_users),
        ]
    }
}

/// Opens a read-only transaction whose statements all see one snapshot.
pub async fn begin_snapshot(db: &PgPool) -> sqlx::Result<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

pub async fn summary_in(tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<HygieneSummary> {
    Ok(HygieneSummary {
        users: repository::user::count_users(&mut **tx).await?,
        profiles: repository::profile::count_profiles(&mut **tx).await?,
        duplicate_usernames: repository::count_report(&mut **tx, DUPLICATE_USERNAMES_STMT).await?,
        duplicate_emails: repository::count_report(&mut **tx, DUPLICATE_EMAILS_STMT).await?,
        duplicate_users: repository::count_report(&mut **tx, DUPLICATE_USER_DETAILS_STMT).await?,
        orphaned_profiles: repository::count_report(&mut **tx, ORPHANED_PROFILES_STMT).await?,
        userless_users: repository::count_report(&mut **tx, USERLESS_USERS_STMT).await?,
    })
}

/// Counts every report against one snapshot, so concurrent writers cannot
/// make the numbers disagree with each other.
pub async fn summary(db: &PgPool) -> sqlx::Result<HygieneSummary> {
    let mut tx = begin_snapshot(db).await?;
    let res = summary_in(&mut tx).await?;
    tx.commit().await?;
    info!(
        "database reachable: {} users, {} profiles",
        res.users, res.profiles
    );
    Ok(res)
}
