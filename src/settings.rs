use std::env;

use anyhow::Context;
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: Option<u32>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).context("invalid configuration")
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(5)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn is_env_file(env_var: Option<&str>) -> bool {
    env_var.unwrap_or("file") == "file"
}

/// Whether `get_config` reads a `.env` file before the process environment.
pub fn uses_env_file() -> bool {
    is_env_file(env::var("ENV").ok().as_deref())
}

/// Runs before logging is set up, so it does not log. Callers report
/// `uses_env_file` once a subscriber exists.
pub fn get_config() -> anyhow::Result<Config> {
    if uses_env_file() {
        let _ = dotenvy::dotenv();
    }
    Config::from_vars(env::vars())
}
