//! Console configuration sourced from environment variables, with an optional
//! YAML override file (`WARDEN_CONFIG`).
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection URL; may contain credentials, never log it.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_ttl_secs: u64,
    /// Hex-encoded 32-byte Ed25519 seed. When unset a fresh key is generated
    /// at startup and sessions do not survive restarts.
    pub signing_seed: Option<String>,
}

impl AuthConfig {
    /// Decode the configured signing seed, if any.
    pub fn signing_seed_bytes(&self) -> Result<Option<[u8; 32]>> {
        let Some(seed) = &self.signing_seed else {
            return Ok(None);
        };
        let bytes = hex::decode(seed).with_context(|| "parse WARDEN_AUTH_SEED as hex")?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("WARDEN_AUTH_SEED must decode to exactly 32 bytes"))?;
        Ok(Some(bytes))
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub bind_addr: SocketAddr,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
}

/// Shape of the optional YAML override file. Every field is optional; set
/// fields win over the environment.
#[derive(Debug, Deserialize)]
struct ConsoleConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    token_ttl_secs: Option<u64>,
    bootstrap_enabled: Option<bool>,
    bootstrap_bind: Option<String>,
    bootstrap_token: Option<String>,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("WARDEN_BIND", "0.0.0.0:8080")
            .parse()
            .with_context(|| "parse WARDEN_BIND")?;
        let metrics_bind = env_or("WARDEN_METRICS_BIND", "0.0.0.0:9090")
            .parse()
            .with_context(|| "parse WARDEN_METRICS_BIND")?;

        let storage = parse_storage(&env_or("WARDEN_STORAGE", "memory"))?;
        let postgres = std::env::var("WARDEN_PG_URL").ok().map(|url| {
            Ok::<_, anyhow::Error>(PostgresConfig {
                url,
                max_connections: env_or("WARDEN_PG_MAX_CONNECTIONS", "10")
                    .parse()
                    .with_context(|| "parse WARDEN_PG_MAX_CONNECTIONS")?,
                acquire_timeout_ms: env_or("WARDEN_PG_ACQUIRE_TIMEOUT_MS", "3000")
                    .parse()
                    .with_context(|| "parse WARDEN_PG_ACQUIRE_TIMEOUT_MS")?,
            })
        });
        let postgres = postgres.transpose()?;

        let auth = AuthConfig {
            token_ttl_secs: env_or("WARDEN_TOKEN_TTL_SECS", "3600")
                .parse()
                .with_context(|| "parse WARDEN_TOKEN_TTL_SECS")?,
            signing_seed: std::env::var("WARDEN_AUTH_SEED").ok(),
        };

        let bootstrap = BootstrapConfig {
            enabled: env_or("WARDEN_BOOTSTRAP_ENABLED", "false")
                .parse()
                .with_context(|| "parse WARDEN_BOOTSTRAP_ENABLED")?,
            bind_addr: env_or("WARDEN_BOOTSTRAP_BIND", "127.0.0.1:8081")
                .parse()
                .with_context(|| "parse WARDEN_BOOTSTRAP_BIND")?,
            token: std::env::var("WARDEN_BOOTSTRAP_TOKEN").ok(),
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            auth,
            bootstrap,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WARDEN_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read WARDEN_CONFIG: {path}"))?;
            let override_cfg: ConsoleConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse console config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.storage {
                config.storage = parse_storage(&value)?;
            }
            if let Some(url) = override_cfg.postgres_url {
                let existing = config.postgres.take();
                config.postgres = Some(PostgresConfig {
                    url,
                    max_connections: existing.as_ref().map(|pg| pg.max_connections).unwrap_or(10),
                    acquire_timeout_ms: existing
                        .as_ref()
                        .map(|pg| pg.acquire_timeout_ms)
                        .unwrap_or(3000),
                });
            }
            if let Some(value) = override_cfg.token_ttl_secs {
                config.auth.token_ttl_secs = value;
            }
            if let Some(value) = override_cfg.bootstrap_enabled {
                config.bootstrap.enabled = value;
            }
            if let Some(value) = override_cfg.bootstrap_bind {
                config.bootstrap.bind_addr = value.parse().with_context(|| "parse bootstrap_bind")?;
            }
            if let Some(value) = override_cfg.bootstrap_token {
                config.bootstrap.token = Some(value);
            }
        }
        Ok(config)
    }
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => bail!("unknown storage backend: {other}"),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
