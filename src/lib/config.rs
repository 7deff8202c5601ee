//! Server configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first, so the same
//! variables can be kept there during development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite { url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// Load the sample todos at startup.
    pub seed_sample_data: bool,
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            seed_sample_data: true,
            tls: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let host = lookup("TODO_API_HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "TODO_API_PORT")?.unwrap_or(defaults.port);
        let seed_sample_data = match lookup("TODO_API_SEED") {
            Some(raw) => parse_flag(&raw).with_context(|| format!("TODO_API_SEED={raw}"))?,
            None => defaults.seed_sample_data,
        };

        let storage = match lookup("TODO_API_STORAGE").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StorageBackend::Memory,
            Some("sqlite") => StorageBackend::Sqlite {
                url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://todos.db".to_string()),
                max_connections: parse_var(&lookup, "TODO_API_DB_MAX_CONNECTIONS")?.unwrap_or(5),
            },
            Some(other) => bail!("TODO_API_STORAGE must be `memory` or `sqlite`, got `{other}`"),
        };

        let tls = match (lookup("TODO_API_TLS_CERT"), lookup("TODO_API_TLS_KEY")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => bail!("TODO_API_TLS_CERT and TODO_API_TLS_KEY must be set together"),
        };

        Ok(Self {
            host,
            port,
            storage,
            seed_sample_data,
            tls,
        })
    }

    /// Resolves `host` (an IP literal or a name such as `localhost`) to
    /// the first matching socket address.
    pub async fn addr(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("cannot resolve listen address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("no address found for {}:{}", self.host, self.port))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{key}={raw}")))
        .transpose()
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got `{other}`"),
    }
}
