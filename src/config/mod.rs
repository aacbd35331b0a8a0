use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string; `None` means only the memory store is usable
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    /// Pool acquire timeout in seconds
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub password_min_length: usize,
    /// bcrypt work factor for stored password hashes
    pub password_hash_cost: u32,
    /// Report ownership denials as NotFound so foreign ids look absent
    pub conceal_foreign_resources: bool,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = env::var("API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_NAME") {
            if !v.trim().is_empty() {
                self.security.cookie_name = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_MIN_LENGTH") {
            self.security.password_min_length = v.parse().unwrap_or(self.security.password_min_length);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_HASH_COST") {
            self.security.password_hash_cost = v.parse().unwrap_or(self.security.password_hash_cost);
        }
        if let Ok(v) = env::var("SECURITY_CONCEAL_FOREIGN_RESOURCES") {
            self.security.conceal_foreign_resources =
                v.parse().unwrap_or(self.security.conceal_foreign_resources);
        }

        self
    }

    /// Checks that must hold before the server accepts traffic
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must be set".to_string());
        }
        if self.environment == Environment::Production
            && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET
        {
            return Err("JWT_SECRET must be overridden in production".to_string());
        }
        if self.security.password_min_length == 0 {
            return Err("SECURITY_PASSWORD_MIN_LENGTH must be at least 1".to_string());
        }
        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&self.security.jwt_expiry_hours) {
            return Err(format!(
                "SECURITY_JWT_EXPIRY_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRY_HOURS
            ));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.security.password_hash_cost) {
            return Err(format!(
                "SECURITY_PASSWORD_HASH_COST must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            ));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:5173".to_string()],
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 48,
                cookie_name: "auth_token".to_string(),
                cookie_secure: false,
                password_min_length: 6,
                password_hash_cost: 8,
                conceal_foreign_resources: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: true,
                max_request_size_bytes: 512 * 1024,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cookie_name: "auth_token".to_string(),
                cookie_secure: true,
                password_min_length: 8,
                password_hash_cost: bcrypt::DEFAULT_COST,
                conceal_foreign_resources: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
                max_request_size_bytes: 256 * 1024,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                cookie_name: "auth_token".to_string(),
                cookie_secure: true,
                password_min_length: 8,
                password_hash_cost: bcrypt::DEFAULT_COST,
                conceal_foreign_resources: true,
            },
        }
    }
}

const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret";

// One year
const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

// bcrypt accepts work factors 4 through 31
const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
