use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, bail, Context, Result};
use common_auth::JwtConfig;

const MIN_SECRET_BYTES: usize = 32;
const DEFAULT_ISSUER: &str = "allergy-clinic";
const DEFAULT_AUDIENCE: &str = "allergy-clinic-web";
const DEFAULT_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_LEEWAY_SECONDS: u32 = 30;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres(String),
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_seconds: i64,
    pub jwt_leeway_seconds: u32,
    pub host: IpAddr,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub bootstrap: Option<BootstrapAdmin>,
}

impl ServiceConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.jwt_issuer.clone(), self.jwt_audience.clone())
            .with_leeway(self.jwt_leeway_seconds)
            .with_ttl(self.jwt_ttl_seconds)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Builds a config from any key lookup; `load_service_config` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
        let storage = parse_storage(&database_url);

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            bail!("JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes");
        }

        let jwt_issuer = get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let jwt_audience = get("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let jwt_ttl_seconds = get("JWT_TTL_SECONDS")
            .map(|value| value.parse::<i64>())
            .transpose()
            .context("Failed to parse JWT_TTL_SECONDS")?
            .unwrap_or(DEFAULT_TTL_SECONDS);
        if jwt_ttl_seconds <= 0 {
            bail!("JWT_TTL_SECONDS must be positive");
        }

        let jwt_leeway_seconds = get("JWT_LEEWAY_SECONDS")
            .map(|value| value.parse::<u32>())
            .transpose()
            .context("Failed to parse JWT_LEEWAY_SECONDS")?
            .unwrap_or(DEFAULT_LEEWAY_SECONDS);

        let host: IpAddr = get("HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse()
            .context("Failed to parse HOST")?;
        let port: u16 = get("PORT")
            .map(|value| value.parse())
            .transpose()
            .context("Failed to parse PORT")?
            .unwrap_or(5000);

        let cors_allowed_origins = parse_origins(
            &get("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        );

        let bootstrap = match (
            get("BOOTSTRAP_SUPERADMIN_EMAIL"),
            get("BOOTSTRAP_SUPERADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                name: get("BOOTSTRAP_SUPERADMIN_NAME")
                    .unwrap_or_else(|| "Super Admin".to_string()),
            }),
            (None, None) => None,
            _ => bail!(
                "BOOTSTRAP_SUPERADMIN_EMAIL and BOOTSTRAP_SUPERADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            storage,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_ttl_seconds,
            jwt_leeway_seconds,
            host,
            port,
            cors_allowed_origins,
            bootstrap,
        })
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    ServiceConfig::from_lookup(|key| env::var(key).ok())
}

fn parse_storage(url: &str) -> StorageBackend {
    if url.starts_with("memory://") {
        StorageBackend::Memory
    } else {
        StorageBackend::Postgres(url.to_string())
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
