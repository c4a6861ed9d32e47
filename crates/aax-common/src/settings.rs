//! Settings surface of the private automation hub content server.
//!
//! The hub image reads its framework settings from environment variables
//! with fixed defaults. This module models that surface so the harness can
//! render the effective values a container would start with, and fail early
//! on values the server would reject (such as a non-numeric Redis port).

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{AaxError, Result};

const BASE_DIR: &str = "/var/lib/pulp";
const API_ROOT: &str = "/pulp/";
const CONTENT_PATH_PREFIX: &str = "/pulp/content/";

/// Database connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    /// Framework database backend.
    pub engine: String,
    /// Database name (`POSTGRES_DB`).
    pub name: String,
    /// Role name (`POSTGRES_USER`).
    pub user: String,
    /// Role password (`POSTGRES_PASSWORD`).
    pub password: String,
    /// Server host (`POSTGRES_HOST`).
    pub host: String,
    /// Server port (`POSTGRES_PORT`), passed through as text.
    pub port: String,
    /// Persistent connection lifetime in seconds; zero closes per request.
    pub conn_max_age: u32,
}

/// Cache and task-broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedisSettings {
    /// Redis host (`REDIS_HOST`).
    pub host: String,
    /// Redis port (`REDIS_PORT`).
    pub port: u16,
    /// Logical database index.
    pub db: u8,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Whether the response cache is enabled.
    pub cache_enabled: bool,
}

impl RedisSettings {
    /// Connection URL shared by the cache, the broker and the result backend.
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Content delivery endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSettings {
    /// Public origin of the content app (`PULP_CONTENT_ORIGIN`).
    pub origin: String,
    /// Public hostname of the collection API (`PULP_ANSIBLE_API_HOSTNAME`).
    pub ansible_api_hostname: String,
    /// Path prefix content is served under.
    pub path_prefix: String,
    /// Default distribution base path for published collections.
    pub default_distribution_path: String,
}

impl ContentSettings {
    /// Hostname collection downloads are served from.
    #[must_use]
    pub fn ansible_content_hostname(&self) -> String {
        format!("{}/pulp/content", self.origin)
    }
}

/// Request security and cross-origin policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecuritySettings {
    /// Framework secret key (`GALAXY_SECRET_KEY`).
    pub secret_key: String,
    /// Path of the database field encryption key (`DB_ENCRYPTION_KEY`).
    pub db_encryption_key: PathBuf,
    /// Accepted `Host` header values.
    pub allowed_hosts: Vec<String>,
    /// Debug mode (`DJANGO_DEBUG`).
    pub debug: bool,
    /// Explicit CORS origins.
    pub cors_allowed_origins: Vec<String>,
    /// Whether any origin is accepted.
    pub cors_allow_all_origins: bool,
}

/// Registry token signing for the container plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSettings {
    /// Whether token authentication is disabled.
    pub auth_disabled: bool,
    /// Public half of the signing key pair.
    pub public_key_path: PathBuf,
    /// Private half of the signing key pair.
    pub private_key_path: PathBuf,
    /// JWS algorithm used for signing.
    pub signature_algorithm: String,
    /// Token lifetime in seconds.
    pub expiration_secs: u32,
}

/// Task serialization and liveness settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSettings {
    /// Task payload serializer.
    pub serializer: String,
    /// Task result serializer.
    pub result_serializer: String,
    /// Accepted content types.
    pub accept_content: Vec<String>,
    /// Scheduler timezone.
    pub timezone: String,
    /// Seconds before a silent worker is considered lost.
    pub worker_ttl_secs: u32,
    /// Seconds before a silent content app is considered lost.
    pub content_app_ttl_secs: u32,
}

/// Filesystem layout and storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageSettings {
    /// Storage backend class.
    pub backend: String,
    /// Base data directory.
    pub base_dir: PathBuf,
    /// Uploaded artifact root.
    pub media_root: PathBuf,
    /// Collected static assets root.
    pub static_root: PathBuf,
    /// Scratch directory for uploads in progress.
    pub upload_temp_dir: PathBuf,
}

/// Log level applied to the root logger and each plugin logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Level name (`PULP_LOGGING_LEVEL`).
    pub level: String,
    /// Named loggers that receive the same level.
    pub loggers: Vec<String>,
}

/// The complete, resolved settings surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubSettings {
    /// Base path of the REST API.
    pub api_root: String,
    /// Database connection.
    pub database: DatabaseSettings,
    /// Cache and broker.
    pub redis: RedisSettings,
    /// Content endpoints.
    pub content: ContentSettings,
    /// Security and CORS.
    pub security: SecuritySettings,
    /// Registry token signing.
    pub token: TokenSettings,
    /// Tasking.
    pub tasks: TaskSettings,
    /// Storage layout.
    pub storage: StorageSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl HubSettings {
    /// Resolves the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_PORT` is not a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the settings using `lookup` in place of the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_PORT` is not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let redis_port_raw = var("REDIS_PORT", "6379");
        let redis_port = redis_port_raw.trim().parse::<u16>().map_err(|_| {
            AaxError::config(format!("REDIS_PORT must be a port number, got {redis_port_raw:?}"))
        })?;

        let base_dir = PathBuf::from(BASE_DIR);
        let settings = Self {
            api_root: API_ROOT.to_string(),
            database: DatabaseSettings {
                engine: "django.db.backends.postgresql".to_string(),
                name: var("POSTGRES_DB", "hub"),
                user: var("POSTGRES_USER", "galaxy"),
                password: var("POSTGRES_PASSWORD", "hubpassword"),
                host: var("POSTGRES_HOST", "hub-postgres"),
                port: var("POSTGRES_PORT", "5432"),
                conn_max_age: 0,
            },
            redis: RedisSettings {
                host: var("REDIS_HOST", "hub-redis"),
                port: redis_port,
                db: 0,
                max_connections: 50,
                cache_enabled: true,
            },
            content: ContentSettings {
                origin: var("PULP_CONTENT_ORIGIN", "http://localhost:24816"),
                ansible_api_hostname: var("PULP_ANSIBLE_API_HOSTNAME", "http://localhost:5001"),
                path_prefix: CONTENT_PATH_PREFIX.to_string(),
                default_distribution_path: "published".to_string(),
            },
            security: SecuritySettings {
                secret_key: var("GALAXY_SECRET_KEY", "change-me-to-a-long-random-string"),
                db_encryption_key: PathBuf::from(var(
                    "DB_ENCRYPTION_KEY",
                    "/var/lib/pulp/db-encryption.key",
                )),
                allowed_hosts: vec!["*".to_string()],
                debug: var("DJANGO_DEBUG", "false").to_lowercase() == "true",
                cors_allowed_origins: vec![
                    "http://localhost:5001".to_string(),
                    "http://galaxy-ng:8000".to_string(),
                ],
                cors_allow_all_origins: true,
            },
            token: TokenSettings {
                auth_disabled: false,
                public_key_path: PathBuf::from("/etc/pulp/pulp-public.pem"),
                private_key_path: PathBuf::from("/etc/pulp/pulp-private.pem"),
                signature_algorithm: "ES256".to_string(),
                expiration_secs: 300,
            },
            tasks: TaskSettings {
                serializer: "json".to_string(),
                result_serializer: "json".to_string(),
                accept_content: vec!["json".to_string()],
                timezone: "UTC".to_string(),
                worker_ttl_secs: 300,
                content_app_ttl_secs: 600,
            },
            storage: StorageSettings {
                backend: "pulpcore.app.models.storage.FileSystem".to_string(),
                media_root: base_dir.join("media"),
                static_root: base_dir.join("assets"),
                upload_temp_dir: base_dir.join("tmp"),
                base_dir,
            },
            logging: LoggingSettings {
                level: var("PULP_LOGGING_LEVEL", "INFO"),
                loggers: ["pulpcore", "pulp_ansible", "pulp_container"]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
        };
        tracing::debug!(
            db_host = %settings.database.host,
            redis = %settings.redis.url(),
            "resolved hub settings"
        );
        Ok(settings)
    }

    /// Broker URL for the task queue.
    #[must_use]
    pub fn broker_url(&self) -> String {
        self.redis.url()
    }

    /// Result backend URL for the task queue.
    #[must_use]
    pub fn result_backend(&self) -> String {
        self.redis.url()
    }
}
