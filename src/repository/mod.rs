use sqlx::{Executor, Postgres};

pub mod profile;
pub mod user;

/// Counts the rows a report statement would yield.
pub async fn count_report<'e, E>(db: E, stmt: &str) -> sqlx::Result<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM ({}) AS report", stmt))
        .fetch_one(db)
        .await?;
    Ok(count.0)
}
