use futures::stream::BoxStream;
use sqlx::{Executor, Postgres, Transaction};

use crate::model::{
    duplicate::{DuplicateEmail, DuplicateUsername},
    user::{User, UserKey, TABLE_NAME},
};

// Grouping and ordering use the "C" collation so equality is byte-exact
// whatever the database default is.
pub const DUPLICATE_USERNAMES_STMT: &str = r#"
    SELECT username COLLATE "C" AS username, COUNT(*) AS count
    FROM users
    GROUP BY username COLLATE "C"
    HAVING COUNT(*) > 1
    ORDER BY 1
"#;

pub const DUPLICATE_EMAILS_STMT: &str = r#"
    SELECT email COLLATE "C" AS email, COUNT(*) AS count
    FROM users
    GROUP BY email COLLATE "C"
    HAVING COUNT(*) > 1
    ORDER BY 1
"#;

pub const DUPLICATE_USER_DETAILS_STMT: &str = r#"
    SELECT u.id, u.username, u.email, u.created_at
    FROM users u
    JOIN (
        SELECT username COLLATE "C" AS username, email COLLATE "C" AS email
        FROM users
        GROUP BY username COLLATE "C", email COLLATE "C"
        HAVING COUNT(*) > 1
    ) d ON u.username COLLATE "C" = d.username AND u.email COLLATE "C" = d.email
    ORDER BY u.username COLLATE "C", u.created_at, u.id
"#;

pub const USERLESS_USERS_STMT: &str = r#"
    SELECT u.id, u.username, u.email, u.created_at
    FROM users u
    LEFT JOIN profiles p ON p.user_id = u.id
    WHERE p.id IS NULL
    ORDER BY u.id
"#;

const USER_KEYS_STMT: &str = "SELECT id, username, email FROM users ORDER BY id";

const LOCK_USER_KEYS_STMT: &str = "SELECT id, username, email FROM users ORDER BY id FOR UPDATE";

pub fn duplicate_usernames<'e, E>(db: E) -> BoxStream<'e, sqlx::Result<DuplicateUsername>>
where
    E: Executor<'e, Database = Postgres> + 'e,
{
    sqlx::query_as::<_, DuplicateUsername>(DUPLICATE_USERNAMES_STMT).fetch(db)
}

pub fn duplicate_emails<'e, E>(db: E) -> BoxStream<'e, sqlx::Result<DuplicateEmail>>
where
    E: Executor<'e, Database = Postgres> + 'e,
{
    sqlx::query_as::<_, DuplicateEmail>(DUPLICATE_EMAILS_STMT).fetch(db)
}

/// Users sharing both username and email with another user, oldest first
/// within each username.
pub fn duplicate_user_details<'e, E>(db: E) -> BoxStream<'e, sqlx::Result<User>>
where
    E: Executor<'e, Database = Postgres> + 'e,
{
    sqlx::query_as::<_, User>(DUPLICATE_USER_DETAILS_STMT).fetch(db)
}

/// Users no profile points at.
pub fn userless_users<'e, E>(db: E) -> BoxStream<'e, sqlx::Result<User>>
where
    E: Executor<'e, Database = Postgres> + 'e,
{
    sqlx::query_as::<_, User>(USERLESS_USERS_STMT).fetch(db)
}

pub async fn get_user_keys<'e, E>(db: E) -> sqlx::Result<Vec<UserKey>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, UserKey>(USER_KEYS_STMT)
        .fetch_all(db)
        .await
}

/// Reads every user key and holds row locks until the transaction ends.
pub async fn lock_user_keys(tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<Vec<UserKey>> {
    sqlx::query_as::<_, UserKey>(LOCK_USER_KEYS_STMT)
        .fetch_all(&mut **tx)
        .await
}

pub async fn delete_users_by_ids(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i32],
) -> sqlx::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = ANY($1)", TABLE_NAME))
        .bind(ids.to_vec())
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected())
}

pub async fn count_users<'e, E>(db: E) -> sqlx::Result<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME))
        .fetch_one(db)
        .await?;
    Ok(count.0)
}
