use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub run_level: RunLevel,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub cors: CorsConfig,
    pub media: MediaConfig,
}

/// `debug` exposes error messages in response bodies, anything else keeps them in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunLevel {
    Debug,
    Production,
}

impl RunLevel {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "debug" | "dev" | "development" => RunLevel::Debug,
            _ => RunLevel::Production,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual parts
    pub url: Option<String>,
    pub name: String,
    pub user: String,
    pub password: String,
    pub address: String,
    pub port: u16,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Empty disables the API key check
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_credentials: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub max_image_size: u64,
    pub max_video_size: u64,
    pub image_path: String,
    pub video_path: String,
}

impl AppConfig {
    /// Preset for the run level in `RUN_LEVEL`, then the optional JSON file, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let run_level = env::var("RUN_LEVEL")
            .map(|v| RunLevel::parse(&v))
            .unwrap_or(RunLevel::Debug);

        let mut config = match run_level {
            RunLevel::Debug => Self::debug(),
            RunLevel::Production => Self::production(),
        };

        if let Some(path) = path {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            config = config.merge_json(&raw)?;
        }

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlay a (possibly partial) JSON document on top of this config.
    pub fn merge_json(self, raw: &str) -> Result<Self, ConfigError> {
        let overlay: Value = serde_json::from_str(raw)?;
        let mut base = serde_json::to_value(&self)?;
        merge_values(&mut base, overlay);
        Ok(serde_json::from_value(base)?)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("RUN_LEVEL") {
            self.run_level = RunLevel::parse(&v);
        }

        // Server overrides
        if let Ok(v) = env::var("SERVER_ADDRESS") {
            self.server.address = v;
        }
        if let Ok(v) = env::var("SERVER_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_USER") {
            self.database.user = v;
        }
        if let Ok(v) = env::var("DATABASE_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = env::var("DATABASE_ADDRESS") {
            self.database.address = v;
        }
        if let Ok(v) = env::var("DATABASE_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("API_KEY") {
            self.security.api_key = v;
        }

        // CORS overrides
        if let Ok(v) = env::var("CORS_ALLOW_ORIGIN") {
            self.cors.allow_origin = v;
        }
        if let Ok(v) = env::var("CORS_ALLOW_CREDENTIALS") {
            self.cors.allow_credentials = v;
        }
        if let Ok(v) = env::var("CORS_ALLOW_METHODS") {
            self.cors.allow_methods = v;
        }
        if let Ok(v) = env::var("CORS_ALLOW_HEADERS") {
            self.cors.allow_headers = v;
        }

        // Media overrides
        if let Ok(v) = env::var("MAX_IMAGE_SIZE") {
            self.media.max_image_size = v.parse().unwrap_or(self.media.max_image_size);
        }
        if let Ok(v) = env::var("MAX_VIDEO_SIZE") {
            self.media.max_video_size = v.parse().unwrap_or(self.media.max_video_size);
        }
        if let Ok(v) = env::var("IMAGE_PATH") {
            self.media.image_path = v;
        }
        if let Ok(v) = env::var("VIDEO_PATH") {
            self.media.video_path = v;
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".to_string()));
        }
        if self.media.image_path.is_empty() || self.media.video_path.is_empty() {
            return Err(ConfigError::Invalid("image_path and video_path must be set".to_string()));
        }
        Ok(())
    }

    pub fn is_debug(&self) -> bool {
        self.run_level == RunLevel::Debug
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.address, self.server.port)
    }

    /// Connection string, either `DATABASE_URL` as given or assembled from the parts.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }

        let db = &self.database;
        let mut url = url::Url::parse(&format!("postgres://{}:{}", db.address, db.port))
            .map_err(|e| ConfigError::Invalid(format!("database address: {}", e)))?;
        url.set_username(&db.user)
            .map_err(|_| ConfigError::Invalid("database user".to_string()))?;
        if !db.password.is_empty() {
            url.set_password(Some(&db.password))
                .map_err(|_| ConfigError::Invalid("database password".to_string()))?;
        }
        url.set_path(&format!("/{}", db.name));
        Ok(url.into())
    }

    /// Largest upload accepted by any post type.
    pub fn max_upload_size(&self) -> u64 {
        self.media.max_image_size.max(self.media.max_video_size)
    }

    fn debug() -> Self {
        Self {
            run_level: RunLevel::Debug,
            server: ServerConfig {
                address: "127.0.0.1".to_string(),
                port: 8080,
                request_timeout_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                name: "innovision".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                address: "127.0.0.1".to_string(),
                port: 5432,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "debug-secret".to_string(),
                jwt_expiry_hours: 5,
                api_key: String::new(),
            },
            cors: CorsConfig {
                allow_origin: "*".to_string(),
                allow_credentials: "true".to_string(),
                allow_methods: "GET, POST, OPTIONS".to_string(),
                allow_headers: "Content-Type, X-Auth-Token, API_KEY".to_string(),
            },
            media: MediaConfig {
                max_image_size: 10 * 1024 * 1024, // 10MB
                max_video_size: 100 * 1024 * 1024, // 100MB
                image_path: "/static/images/".to_string(),
                video_path: "/static/videos/".to_string(),
            },
        }
    }

    fn production() -> Self {
        let debug = Self::debug();
        Self {
            run_level: RunLevel::Production,
            server: ServerConfig {
                address: "0.0.0.0".to_string(),
                request_timeout_secs: 30,
                ..debug.server
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                ..debug.database
            },
            // No usable default secret outside of debug
            security: SecurityConfig {
                jwt_secret: String::new(),
                ..debug.security
            },
            cors: debug.cors,
            media: debug.media,
        }
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
impl AppConfig {
    /// Debug preset with a fixed secret, for tests.
    pub fn for_tests() -> Self {
        let mut config = Self::debug();
        config.security.jwt_secret = "test-secret".to_string();
        config
    }
}
