use axum::http::Method;
use std::{env, str::FromStr};
use thiserror::Error;

/// Fallback signing secret, only ever used in `Env::Local`.
const LOCAL_TOKEN_SECRET: &str = "tools-house-local-development-secret";

/// ConfigError
///
/// Raised while reading the environment at startup. `main` refuses to start on any of these.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers and middleware via `FromRef<AppState>`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and secret strictness.
    pub env: Env,
    // Port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    // Postgres connection string. `None` (local only) selects the in-memory store.
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    // Shared HS256 secret for issuing and verifying access tokens.
    pub token_secret: String,
    // Routes that must pass the bearer-token gate.
    pub protected_routes: Vec<ProtectedRoute>,
}

/// Env
///
/// Runtime context: `Local` favours developer convenience, `Production` demands
/// every secret be provided explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ProtectedRoute
///
/// One entry of the reviewable protected-route list, written as `METHOD /path/template`
/// where the template uses the router's own syntax (e.g. `DELETE /bookings/{id}`).
#[derive(Clone, Debug, PartialEq)]
pub struct ProtectedRoute {
    pub method: Method,
    pub path: String,
}

impl ProtectedRoute {
    pub fn matches(&self, method: &Method, matched_path: &str) -> bool {
        self.method == *method && self.path == matched_path
    }
}

impl FromStr for ProtectedRoute {
    type Err = ConfigError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Invalid {
            key: "PROTECTED_ROUTES",
            value: entry.to_string(),
        };

        let mut parts = entry.split_whitespace();
        let (Some(method), Some(path), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        if !path.starts_with('/') {
            return Err(invalid());
        }

        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| invalid())?;

        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests: local mode, memory store,
    /// every route public.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 5000,
            db_url: None,
            db_max_connections: 5,
            token_secret: LOCAL_TOKEN_SECRET.to_string(),
            protected_routes: Vec::new(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// from_lookup
    ///
    /// Builds the configuration from any key lookup. Production fails fast on a
    /// missing database URL or token secret; local fills in development defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value,
            })?,
            None => 5000,
        };

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value,
            })?,
            None => 5,
        };

        let db_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        let token_secret = lookup("ACCESS_TOKEN_SECRET").filter(|secret| !secret.is_empty());

        let (db_url, token_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                token_secret.ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                token_secret.unwrap_or_else(|| LOCAL_TOKEN_SECRET.to_string()),
            ),
        };

        let protected_routes = lookup("PROTECTED_ROUTES")
            .map(|list| parse_protected_routes(&list))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            env,
            port,
            db_url,
            db_max_connections,
            token_secret,
            protected_routes,
        })
    }
}

/// Parses a comma separated `METHOD /path` list. Blank entries are skipped.
pub fn parse_protected_routes(list: &str) -> Result<Vec<ProtectedRoute>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn local_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.env, Env::Local);
        assert_eq!(config.port, 5000);
        assert!(config.db_url.is_none());
        assert_eq!(config.token_secret, LOCAL_TOKEN_SECRET);
        assert!(config.protected_routes.is_empty());
    }

    #[test]
    fn production_requires_secrets() {
        let err = config_from(&[("APP_ENV", "production"), ("DATABASE_URL", "postgres://db")])
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("ACCESS_TOKEN_SECRET"));

        let err = config_from(&[("APP_ENV", "production"), ("ACCESS_TOKEN_SECRET", "s")])
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let config = config_from(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.env, Env::Production);
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_secret, "s3cret");
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn parses_protected_route_list() {
        let config = config_from(&[(
            "PROTECTED_ROUTES",
            "put /users/admin, DELETE /bookings/{id},",
        )])
        .unwrap();

        assert_eq!(
            config.protected_routes,
            vec![
                ProtectedRoute {
                    method: Method::PUT,
                    path: "/users/admin".to_string()
                },
                ProtectedRoute {
                    method: Method::DELETE,
                    path: "/bookings/{id}".to_string()
                },
            ]
        );
        assert!(config.protected_routes[1].matches(&Method::DELETE, "/bookings/{id}"));
        assert!(!config.protected_routes[1].matches(&Method::GET, "/bookings/{id}"));
    }

    #[test]
    fn rejects_malformed_protected_route() {
        assert!(parse_protected_routes("/users").is_err());
        assert!(parse_protected_routes("GET users").is_err());
    }
}
