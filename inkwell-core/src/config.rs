//! Configuration management

use crate::error::{InkwellError, InkwellResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Prefix for environment overrides, e.g. `INKWELL__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "INKWELL";

/// Top-level configuration for an Inkwell deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InkwellConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the listener is reachable only from this machine
    pub fn is_loopback(&self) -> bool {
        self.host.eq_ignore_ascii_case("localhost")
            || self
                .host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback())
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL; `sqlite::memory:` keeps everything in process
    pub url: String,
    pub max_connections: u32,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            run_migrations: true,
        }
    }
}

/// Settings consumed by the access enforcement boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where anonymous users are sent when an action needs a login
    pub login_path: String,
    /// Request header carrying the authenticated user id. Its value is
    /// trusted as-is, so it must be set by an upstream proxy that
    /// authenticates the caller and strips any client-supplied copy.
    pub identity_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/users/sign_in".to_string(),
            identity_header: "x-user-id".to_string(),
        }
    }
}

impl InkwellConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> InkwellResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InkwellError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_hint("Check if the config file exists and is readable"),
        })?;

        let config: InkwellConfig = toml::from_str(&content).map_err(|e| InkwellError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_hint("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Layer defaults, an optional TOML file and `INKWELL__*` environment
    /// variables. `DATABASE_URL` overrides `database.url` when set.
    pub fn load(path: Option<&Path>) -> InkwellResult<Self> {
        let defaults = ::config::Config::try_from(&InkwellConfig::default())
            .map_err(|e| Self::layering_error("defaults", e))?;

        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: InkwellConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Self::layering_error("build", e))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            loaded.database.url = url;
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> InkwellResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| InkwellError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| InkwellError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_hint("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> InkwellResult<()> {
        if self.server.port == 0 {
            return Err(invalid(
                "server.port must be greater than 0".to_string(),
                "Set server.port to a positive value",
            ));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(invalid(
                format!("Unsupported database URL: {}", self.database.url),
                "Use a sqlite: URL, e.g. sqlite://inkwell.db",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(crate::config_error!(
                "database.max_connections must be greater than 0",
                "validate"
            ));
        }

        if !self.auth.login_path.starts_with('/') {
            return Err(invalid(
                "auth.login_path must be an absolute path".to_string(),
                "Use a path such as /users/sign_in",
            ));
        }

        if self.auth.identity_header.trim().is_empty() {
            return Err(crate::config_error!(
                "auth.identity_header must not be empty",
                "validate"
            ));
        }

        Ok(())
    }

    fn layering_error(operation: &str, e: ::config::ConfigError) -> InkwellError {
        InkwellError::Config {
            message: format!("Failed to load configuration: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation(operation),
        }
    }
}

fn invalid(message: String, hint: &str) -> InkwellError {
    InkwellError::Config {
        message,
        source: None,
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_hint(hint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = InkwellConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.address(), "127.0.0.1:8080");
        assert_eq!(config.auth.login_path, "/users/sign_in");
    }

    #[test]
    fn loopback_hosts() {
        let mut server = ServerConfig::default();
        assert!(server.is_loopback());
        for host in ["localhost", "::1", "[::1]", "127.0.0.2"] {
            server.host = host.to_string();
            assert!(server.is_loopback(), "{host}");
        }
        for host in ["0.0.0.0", "::", "10.0.0.5", "inkwell.example.com"] {
            server.host = host.to_string();
            assert!(!server.is_loopback(), "{host}");
        }
    }

    #[test]
    fn rejects_non_sqlite_database() {
        let mut config = InkwellConfig::default();
        config.database.url = "postgres://localhost/inkwell".to_string();
        assert!(matches!(
            config.validate(),
            Err(InkwellError::Config { .. })
        ));
    }

    #[test]
    fn rejects_relative_login_path() {
        let mut config = InkwellConfig::default();
        config.auth.login_path = "login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: InkwellConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkwell.toml");

        let mut config = InkwellConfig::default();
        config.server.port = 3000;
        config.auth.identity_header = "x-account-id".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = InkwellConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 3000);
        assert_eq!(loaded.auth.identity_header, "x-account-id");
    }

    #[test]
    fn load_layers_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkwell.toml");
        std::fs::write(&path, "[auth]\nlogin_path = \"/login\"\n").unwrap();

        let config = InkwellConfig::load(Some(&path)).unwrap();
        assert_eq!(config.auth.login_path, "/login");
        assert_eq!(config.auth.identity_header, "x-user-id");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = InkwellConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(InkwellError::Config { .. })));
    }
}
