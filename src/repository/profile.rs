use futures::stream::BoxStream;
use sqlx::{Executor, Postgres, Transaction};

use crate::model::profile::{Profile, TABLE_NAME};

// A NULL user_id never joins, so it is orphaned as well.
pub const ORPHANED_PROFILES_STMT: &str = r#"
    SELECT p.id, p.name, p.user_id
    FROM profiles p
    LEFT JOIN users u ON u.id = p.user_id
    WHERE u.id IS NULL
    ORDER BY p.id
"#;

pub fn orphaned_profiles<'e, E>(db: E) -> BoxStream<'e, sqlx::Result<Profile>>
where
    E: Executor<'e, Database = Postgres> + 'e,
{
    sqlx::query_as::<_, Profile>(ORPHANED_PROFILES_STMT).fetch(db)
}

/// Number of profiles pointing at any of the given users.
pub async fn count_profiles_of_users(
    tx: &mut Transaction<'_, Postgres>,
    user_ids: &[i32],
) -> sqlx::Result<i64> {
    if user_ids.is_empty() {
        return Ok(0);
    }
    let count: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = ANY($1)",
        TABLE_NAME
    ))
    .bind(user_ids.to_vec())
    .fetch_one(&mut **tx)
    .await?;
    Ok(count.0)
}

pub async fn count_profiles<'e, E>(db: E) -> sqlx::Result<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME))
        .fetch_one(db)
        .await?;
    Ok(count.0)
}
