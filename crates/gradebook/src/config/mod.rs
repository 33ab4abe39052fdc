use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::records::{AccessPolicy, Capability};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub access: AccessPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("APP_DATABASE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let sms_sender = env::var("APP_SMS_SENDER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "RESULTS".to_string());

        let access = parse_access_mode(
            &env::var("APP_ACCESS_MODE").unwrap_or_else(|_| "open".to_string()),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig { database_path },
            notifications: NotificationConfig { sms_sender },
            access,
        })
    }
}

/// `open`, `read_only`, or a comma separated list of capability keys.
pub fn parse_access_mode(raw: &str) -> Result<AccessPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "open" => Ok(AccessPolicy::open()),
        "read_only" | "readonly" => Ok(AccessPolicy::read_only()),
        list => {
            let mut capabilities = Vec::new();
            for key in list.split(',').map(str::trim).filter(|key| !key.is_empty()) {
                let capability = Capability::from_key(key).ok_or_else(|| {
                    ConfigError::InvalidAccessMode {
                        value: key.to_string(),
                    }
                })?;
                capabilities.push(capability);
            }
            Ok(AccessPolicy::with_capabilities(capabilities))
        }
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Record store selection. Without a database path the service keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Commands that operate on persisted records cannot fall back to memory.
    pub fn require_database(&self) -> Result<&PathBuf, ConfigError> {
        self.database_path
            .as_ref()
            .ok_or(ConfigError::MissingDatabasePath)
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub sms_sender: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAccessMode { value: String },
    MissingDatabasePath,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAccessMode { value } => write!(
                f,
                "APP_ACCESS_MODE entry '{}' is not 'open', 'read_only' or a capability key",
                value
            ),
            ConfigError::MissingDatabasePath => {
                write!(f, "APP_DATABASE_PATH must be set for this command")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidAccessMode { .. }
            | ConfigError::MissingDatabasePath => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_PATH",
            "APP_SMS_SENDER",
            "APP_ACCESS_MODE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.notifications.sms_sender, "RESULTS");
        assert_eq!(config.access, AccessPolicy::open());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_storage_and_access_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DATABASE_PATH", "data/records.db");
        env::set_var("APP_ACCESS_MODE", "read_only");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.storage.database_path,
            Some(PathBuf::from("data/records.db"))
        );
        assert!(!config.access.permits(Capability::RecordResults));
        reset_env();
    }

    #[test]
    fn rejects_invalid_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "not-a-port");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidPort)));
        reset_env();
    }

    #[test]
    fn access_mode_accepts_capability_lists() {
        let policy = parse_access_mode("record_results, send_notifications").expect("valid list");
        assert!(policy.permits(Capability::RecordResults));
        assert!(policy.permits(Capability::SendNotifications));
        assert!(!policy.permits(Capability::ManageStudents));

        let err = parse_access_mode("record_results,grant_everything").unwrap_err();
        assert!(err.to_string().contains("grant_everything"));
    }
}
