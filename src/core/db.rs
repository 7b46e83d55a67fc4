use std::time::Duration;

use anyhow::Context;
use sqlx::{pool::PoolOptions, Pool, Postgres};

use crate::settings::Config;

pub async fn init_pool(config: &Config) -> anyhow::Result<Pool<Postgres>> {
    PoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections())
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")
}
