use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;

use crate::model::{
    profile::{Profile, TABLE_NAME as PROFILE_TABLE_NAME},
    user::{User, TABLE_NAME as USER_TABLE_NAME},
};

/// Midnight on the given day of January 2024.
pub fn timestamp(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub async fn insert_user(
    db: &PgPool,
    id: i32,
    username: &str,
    email: &str,
    created_at: Option<NaiveDateTime>,
) -> anyhow::Result<User> {
    let user = User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        created_at,
    };
    sqlx::query(&format!(
        "INSERT INTO {} (id, username, email, created_at) VALUES ($1, $2, $3, $4)",
        USER_TABLE_NAME
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.created_at)
    .execute(db)
    .await?;
    Ok(user)
}

pub async fn insert_profile(
    db: &PgPool,
    id: i32,
    name: &str,
    user_id: Option<i32>,
) -> anyhow::Result<Profile> {
    let profile = Profile {
        id,
        name: name.to_string(),
        user_id,
    };
    sqlx::query(&format!(
        "INSERT INTO {} (id, name, user_id) VALUES ($1, $2, $3)",
        PROFILE_TABLE_NAME
    ))
    .bind(profile.id)
    .bind(&profile.name)
    .bind(profile.user_id)
    .execute(db)
    .await?;
    Ok(profile)
}

pub async fn user_ids(db: &PgPool) -> anyhow::Result<Vec<i32>> {
    let ids: Vec<(i32,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} ORDER BY id",
        USER_TABLE_NAME
    ))
    .fetch_all(db)
    .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}
