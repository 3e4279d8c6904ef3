use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::profile::ReturnShape;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub profile: ProfileSettings,
    pub database: DatabaseConfig,
    pub middleware: MiddlewareConfig,
    pub storage: StorageSettings,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Static profile-resolution settings: the ordered relation preference and
/// the caller-facing return shape. Owned by the deploying application and
/// loaded once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub preference: Vec<String>,
    pub shape: ReturnShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    pub query_warning_threshold: u64,
    pub expose_query_count_header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub prefix: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Profile overrides
        if let Ok(v) = env::var("GANTRY_PROFILE_PREFERENCE") {
            let names: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !names.is_empty() {
                self.profile.preference = names;
            }
        }
        if let Ok(v) = env::var("GANTRY_PROFILE_SHAPE") {
            self.profile.shape = v.parse().unwrap_or(self.profile.shape);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Middleware overrides
        if let Ok(v) = env::var("GANTRY_QUERY_WARNING_THRESHOLD") {
            self.middleware.query_warning_threshold =
                v.parse().unwrap_or(self.middleware.query_warning_threshold);
        }
        if let Ok(v) = env::var("GANTRY_EXPOSE_QUERY_COUNT_HEADER") {
            self.middleware.expose_query_count_header =
                v.parse().unwrap_or(self.middleware.expose_query_count_header);
        }

        // Storage overrides
        if let Ok(v) = env::var("GANTRY_STORAGE_PREFIX") {
            self.storage.prefix = v;
        }
        if let Ok(v) = env::var("GANTRY_STORAGE_ROOT") {
            self.storage.root = v;
        }

        // Security overrides
        if let Ok(v) = env::var("GANTRY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("GANTRY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            profile: ProfileSettings {
                preference: vec!["admin".to_string(), "customer".to_string()],
                shape: ReturnShape::Specialized,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            middleware: MiddlewareConfig {
                query_warning_threshold: 25,
                expose_query_count_header: true,
            },
            storage: StorageSettings {
                prefix: String::new(),
                root: "./storage".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "gantry-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            profile: ProfileSettings {
                preference: vec!["admin".to_string(), "customer".to_string()],
                shape: ReturnShape::Specialized,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            middleware: MiddlewareConfig {
                query_warning_threshold: 50,
                expose_query_count_header: true,
            },
            storage: StorageSettings {
                prefix: "staging".to_string(),
                root: "/var/lib/gantry".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            profile: ProfileSettings {
                preference: vec!["admin".to_string(), "customer".to_string()],
                shape: ReturnShape::Specialized,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            middleware: MiddlewareConfig {
                query_warning_threshold: 100,
                expose_query_count_header: false,
            },
            storage: StorageSettings {
                prefix: "prod".to_string(),
                root: "/var/lib/gantry".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.profile.preference, vec!["admin", "customer"]);
        assert_eq!(config.middleware.query_warning_threshold, 25);
        assert!(config.middleware.expose_query_count_header);
        assert!(config.storage.prefix.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.middleware.query_warning_threshold, 100);
        assert!(!config.middleware.expose_query_count_header);
        assert!(config.security.jwt_secret.is_empty());
    }
}
