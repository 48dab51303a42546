use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "insecure-development-secret-change-me";

/// One week
const MAX_CLEANUP_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Signing secret and token lifetimes, fixed at start-up
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, access_ttl_minutes: i64, refresh_ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_minutes,
            refresh_ttl_hours,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_hours", &self.refresh_ttl_hours)
            .finish()
    }
}

/// Credentials for the first owner account, created at start-up when present
#[derive(Clone)]
pub struct BootstrapOwner {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

impl fmt::Debug for BootstrapOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapOwner")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub log_level: String,
    pub cleanup_interval_minutes: Option<u64>,
    pub bootstrap_owner: Option<BootstrapOwner>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = get("APP_ENV").unwrap_or_else(|| "development".to_string());
        let is_development = app_env == "development";

        let secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if is_development => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let access_ttl_minutes: i64 = parse_or(&get, "JWT_EXPIRY_MINUTE", 15)?;
        if access_ttl_minutes <= 0 {
            return Err(invalid("JWT_EXPIRY_MINUTE", "must be positive"));
        }
        let refresh_ttl_hours: i64 = parse_or(&get, "JWT_REFRESH_EXPIRY_HOUR", 24)?;
        if refresh_ttl_hours <= 0 {
            return Err(invalid("JWT_REFRESH_EXPIRY_HOUR", "must be positive"));
        }

        let bcrypt_cost: u32 = parse_or(&get, "BCRYPT_COST", 10)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", "must be between 4 and 31"));
        }

        let cleanup_interval_minutes = match get("TOKEN_CLEANUP_INTERVAL_MINUTES") {
            Some(raw) => {
                let minutes: u64 = raw
                    .parse()
                    .map_err(|_| invalid("TOKEN_CLEANUP_INTERVAL_MINUTES", "not a number"))?;
                if minutes == 0 || minutes > MAX_CLEANUP_INTERVAL_MINUTES {
                    return Err(invalid(
                        "TOKEN_CLEANUP_INTERVAL_MINUTES",
                        "must be between 1 and 10080",
                    ));
                }
                Some(minutes)
            }
            None => None,
        };

        let bootstrap_owner = match (
            get("BOOTSTRAP_OWNER_USERNAME"),
            get("BOOTSTRAP_OWNER_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapOwner {
                full_name: get("BOOTSTRAP_OWNER_FULL_NAME").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "BOOTSTRAP_OWNER_USERNAME",
                    "username and password must be set together",
                ))
            }
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "APP_PORT", 8080)?,
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 25)?,
            jwt: JwtConfig::new(secret, access_ttl_minutes, refresh_ttl_hours),
            bcrypt_cost,
            cors_allowed_origins,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            cleanup_interval_minutes,
            bootstrap_owner,
            app_env,
        })
    }

    /// True when JWT_SECRET was absent and the built-in development secret is in use
    pub fn uses_development_secret(&self) -> bool {
        self.jwt.secret() == DEV_JWT_SECRET
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| invalid("APP_HOST", "not a valid listen address"))
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &format!("'{}' is not a valid value", raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.app_env, "development");
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt.access_ttl_minutes, 15);
        assert_eq!(config.jwt.refresh_ttl_hours, 24);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.cors_allowed_origins, vec!["*".to_string()]);
        assert!(config.database_url.is_none());
        assert!(config.cleanup_interval_minutes.is_none());
        assert!(config.bootstrap_owner.is_none());
    }

    #[test]
    fn test_secret_required_outside_development() {
        let result = config_from(&[("APP_ENV", "production")]);
        assert_eq!(result.unwrap_err(), ConfigError::Missing("JWT_SECRET"));

        let config = config_from(&[("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.jwt.secret(), "s3cret");
        assert!(!config.uses_development_secret());
    }

    #[test]
    fn test_development_falls_back_to_builtin_secret() {
        let config = config_from(&[]).unwrap();
        assert!(config.uses_development_secret());

        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(!config.uses_development_secret());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(config_from(&[]).unwrap().log_level, "info");
        assert_eq!(
            config_from(&[("LOG_LEVEL", "debug")]).unwrap().log_level,
            "debug"
        );
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        assert!(config_from(&[("JWT_EXPIRY_MINUTE", "0")]).is_err());
        assert!(config_from(&[("JWT_REFRESH_EXPIRY_HOUR", "-3")]).is_err());
        assert!(config_from(&[("JWT_EXPIRY_MINUTE", "soon")]).is_err());
    }

    #[test]
    fn test_bcrypt_cost_range() {
        assert!(config_from(&[("BCRYPT_COST", "3")]).is_err());
        assert_eq!(config_from(&[("BCRYPT_COST", "12")]).unwrap().bcrypt_cost, 12);
    }

    #[test]
    fn test_cleanup_interval_bounds() {
        assert!(config_from(&[("TOKEN_CLEANUP_INTERVAL_MINUTES", "0")]).is_err());
        assert!(config_from(&[("TOKEN_CLEANUP_INTERVAL_MINUTES", "10081")]).is_err());
        assert!(config_from(&[("TOKEN_CLEANUP_INTERVAL_MINUTES", "18446744073709551615")]).is_err());

        let config = config_from(&[("TOKEN_CLEANUP_INTERVAL_MINUTES", "10080")]).unwrap();
        assert_eq!(config.cleanup_interval_minutes, Some(10080));
    }

    #[test]
    fn test_cors_origins_split() {
        let config = config_from(&[(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:3000, https://laundry.example.com",
        )])
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "https://laundry.example.com"]
        );
    }

    #[test]
    fn test_bootstrap_owner_needs_both_fields() {
        assert!(config_from(&[("BOOTSTRAP_OWNER_USERNAME", "owner")]).is_err());

        let config = config_from(&[
            ("BOOTSTRAP_OWNER_USERNAME", "owner"),
            ("BOOTSTRAP_OWNER_PASSWORD", "owner-password"),
        ])
        .unwrap();
        let owner = config.bootstrap_owner.unwrap();
        assert_eq!(owner.full_name, "owner");
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = config_from(&[
            ("JWT_SECRET", "top-secret-value"),
            ("BOOTSTRAP_OWNER_USERNAME", "owner"),
            ("BOOTSTRAP_OWNER_PASSWORD", "owner-password"),
        ])
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("owner-password"));
    }

    #[test]
    fn test_socket_addr() {
        let config = config_from(&[("APP_HOST", "127.0.0.1"), ("APP_PORT", "9000")]).unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
    }
}
