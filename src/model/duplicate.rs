use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, FromRow, PartialEq, Eq)]
pub struct DuplicateUsername {
    pub username: String,
    pub count: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize, FromRow, PartialEq, Eq)]
pub struct DuplicateEmail {
    pub email: String,
    pub count: i64,
}
