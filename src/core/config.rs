use std::env;
use std::time::Duration;

use crate::modules::storage::StorageConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub docs: DocsConfig,
    pub storage: StorageConfig,
    pub files: FilesConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Bearer token validation (tokens are issued by the session service)
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_leeway: Duration,
}

/// OpenAPI document settings
#[derive(Debug, Clone)]
pub struct DocsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
}

/// File lifecycle settings
#[derive(Debug, Clone)]
pub struct FilesConfig {
    /// Largest accepted upload in bytes
    pub max_upload_size: usize,
    /// Validity of presigned download URLs
    pub presigned_url_ttl: Duration,
    /// Deadline for a single upload/download transfer
    pub transfer_timeout: Duration,
    /// Attempts made for each step of a permanent delete
    pub delete_max_attempts: u32,
}

/// Retention sweep settings
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub enabled: bool,
    /// How long soft-deleted files are kept
    pub retention_period: chrono::Duration,
    /// Time between sweeps
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            docs: DocsConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            files: FilesConfig::from_env()?,
            retention: RetentionConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required".to_string())?;

        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters".to_string());
        }

        let jwt_leeway_secs = parse_env("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            jwt_secret,
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl DocsConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("DOCS_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("DOCS_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("DOCS_TITLE").unwrap_or_else(|_| "Pulse Files API".to_string());
        let version = env::var("DOCS_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl FilesConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB
    const DEFAULT_PRESIGNED_URL_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 300; // 5 minutes
    const DEFAULT_DELETE_MAX_ATTEMPTS: u32 = 3;

    pub fn from_env() -> Result<Self, String> {
        let max_upload_size = parse_env("MAX_UPLOAD_SIZE_BYTES", Self::DEFAULT_MAX_UPLOAD_SIZE)?;
        let ttl_secs = parse_env("PRESIGNED_URL_TTL_SECS", Self::DEFAULT_PRESIGNED_URL_TTL_SECS)?;
        let timeout_secs = parse_env(
            "STORAGE_TRANSFER_TIMEOUT_SECS",
            Self::DEFAULT_TRANSFER_TIMEOUT_SECS,
        )?;
        let delete_max_attempts = parse_env(
            "STORAGE_DELETE_MAX_ATTEMPTS",
            Self::DEFAULT_DELETE_MAX_ATTEMPTS,
        )?;

        if delete_max_attempts == 0 {
            return Err("STORAGE_DELETE_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(Self {
            max_upload_size,
            presigned_url_ttl: Duration::from_secs(ttl_secs),
            transfer_timeout: Duration::from_secs(timeout_secs),
            delete_max_attempts,
        })
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_upload_size: Self::DEFAULT_MAX_UPLOAD_SIZE,
            presigned_url_ttl: Duration::from_secs(Self::DEFAULT_PRESIGNED_URL_TTL_SECS),
            transfer_timeout: Duration::from_secs(Self::DEFAULT_TRANSFER_TIMEOUT_SECS),
            delete_max_attempts: Self::DEFAULT_DELETE_MAX_ATTEMPTS,
        }
    }
}

impl RetentionConfig {
    pub const DEFAULT_RETENTION_DAYS: i64 = 30;
    /// Upper bound for any retention window, configured or requested
    pub const MAX_RETENTION_DAYS: i64 = 36_500;
    const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

    pub fn from_env() -> Result<Self, String> {
        let enabled = parse_env("RETENTION_SWEEP_ENABLED", true)?;
        let days = parse_env("RETENTION_PERIOD_DAYS", Self::DEFAULT_RETENTION_DAYS)?;
        let interval_secs = parse_env(
            "RETENTION_SWEEP_INTERVAL_SECS",
            Self::DEFAULT_SWEEP_INTERVAL_SECS,
        )?;

        if !(1..=Self::MAX_RETENTION_DAYS).contains(&days) {
            return Err(format!(
                "RETENTION_PERIOD_DAYS must be between 1 and {}",
                Self::MAX_RETENTION_DAYS
            ));
        }
        if interval_secs == 0 {
            return Err("RETENTION_SWEEP_INTERVAL_SECS must be positive".to_string());
        }

        Ok(Self {
            enabled,
            retention_period: chrono::Duration::days(days),
            sweep_interval: Duration::from_secs(interval_secs),
        })
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_period: chrono::Duration::days(Self::DEFAULT_RETENTION_DAYS),
            sweep_interval: Duration::from_secs(Self::DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Read `key` from the environment, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid value", key)),
        Err(_) => Ok(default),
    }
}
