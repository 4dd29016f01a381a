use std::{net::SocketAddr, path::Path};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_RESULTS: i64 = 5000;
const DEFAULT_CONCURRENCY: i64 = 4;
const DEFAULT_SEARCH_RETRIES: i64 = 2;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: std::path::PathBuf,

    /// Path to the certificate file.
    #[arg(long, value_name = "CERT_PATH")]
    pub cert: std::path::PathBuf,

    /// Path to the key file.
    #[arg(long, value_name = "KEY_PATH")]
    pub key: std::path::PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

/// Jira site credentials. `user` is the account email paired with an API
/// token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Jira {
    pub base_url: String,
    pub user: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Matrix {
    /// Upper bound passed to the search API; only the total is read.
    pub max_results: u32,
    /// Worker-pool size for the pairwise searches.
    pub concurrency: usize,
    /// Retries per search call on transient failures.
    pub search_retries: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub jira: Jira,
    pub matrix: Matrix,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("matrix.max_results", DEFAULT_MAX_RESULTS)?
            .set_default("matrix.concurrency", DEFAULT_CONCURRENCY)?
            .set_default("matrix.search_retries", DEFAULT_SEARCH_RETRIES)?;

        let cfg = builder.add_source(File::from(path)).build()?;

        cfg.try_deserialize()
    }
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
