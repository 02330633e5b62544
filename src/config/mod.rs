use anyhow::{Result, bail};
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the server
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on pooled Postgres connections
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Capacity of the change-event bus and of each realtime connection outbox
    #[serde(default = "default_realtime_buffer")]
    pub realtime_buffer: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_realtime_buffer() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            host: default_host(),
            port: default_port(),
            database_max_connections: default_max_connections(),
            realtime_buffer: default_realtime_buffer(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if it exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Build a config from an explicit list of variables instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(vars)?)
    }

    /// Get the database URL, failing if none was configured
    pub fn database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => bail!("DATABASE_URL is not set"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
