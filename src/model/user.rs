use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

pub const TABLE_NAME: &str = "users";

#[derive(Clone, Debug, Deserialize, Serialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: Option<NaiveDateTime>,
}

/// The columns cleanup needs to cluster users.
#[derive(Clone, Debug, FromRow, PartialEq, Eq)]
pub struct UserKey {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl UserKey {
    pub fn new(id: i32, username: &str, email: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            email: email.to_string(),
        }
    }
}
