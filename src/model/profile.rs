use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const TABLE_NAME: &str = "profiles";

#[derive(Clone, Debug, Deserialize, Serialize, FromRow, PartialEq, Eq)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub user_id: Option<i32>,
}
