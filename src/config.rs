//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

/// Default lifetime of a staged customer import awaiting resolution
const DEFAULT_IMPORT_STAGING_TTL_SECS: u64 = 30 * 60;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// JWT secret key for token signing/validation
    pub jwt_secret: String,

    /// How long an import with unresolved duplicates stays staged
    pub import_staging_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set, generate one with: openssl rand -base64 48")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                jwt_secret.len()
            );
        }

        const KNOWN_DEV_SECRETS: &[&str] = &[
            "dev-secret-change-in-production-min-32-bytes!!",
        ];
        if KNOWN_DEV_SECRETS.contains(&jwt_secret.as_str()) {
            tracing::warn!("JWT_SECRET matches a known default, change it for production!");
        }

        let import_staging_ttl = parse_staging_ttl(std::env::var("IMPORT_STAGING_TTL_SECS").ok())?;

        Ok(Self {
            nats_url,
            database_url,
            jwt_secret,
            import_staging_ttl,
        })
    }
}

fn parse_staging_ttl(raw: Option<String>) -> Result<Duration> {
    match raw {
        None => Ok(Duration::from_secs(DEFAULT_IMPORT_STAGING_TTL_SECS)),
        Some(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("IMPORT_STAGING_TTL_SECS must be a number of seconds, got '{}'", value))?;
            if secs == 0 {
                anyhow::bail!("IMPORT_STAGING_TTL_SECS must be greater than zero");
            }
            Ok(Duration::from_secs(secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_ttl_defaults_to_thirty_minutes() {
        assert_eq!(parse_staging_ttl(None).unwrap(), Duration::from_secs(1800));
    }

    #[test]
    fn test_staging_ttl_parses_seconds() {
        assert_eq!(parse_staging_ttl(Some(" 120 ".to_string())).unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_staging_ttl_rejects_garbage_and_zero() {
        assert!(parse_staging_ttl(Some("soon".to_string())).is_err());
        assert!(parse_staging_ttl(Some("0".to_string())).is_err());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_requires_database_url() {
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("JWT_SECRET", "test-secret-key-for-jwt-at-least-32-bytes-long");

        assert!(Config::from_env().is_err());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_rejects_short_jwt_secret() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("JWT_SECRET", "short");

        assert!(Config::from_env().is_err());

        std::env::remove_var("JWT_SECRET");
    }
}
