use thiserror::Error;

use crate::upload::IntakePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Bucket,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Base URL of the hosted backend (required when backend is bucket)
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cache_control_secs: u64,
    /// Overwrite objects that already exist at the same path
    pub upsert: bool,
    pub policy: IntakePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            url: None,
            api_key: None,
            bucket: None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            cache_control_secs: 3600,
            upsert: false,
            policy: IntakePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = env_flag("TEST_MODE").unwrap_or(false);

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "bucket" => StorageBackend::Bucket,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let defaults = IntakePolicy::default();
        let policy = IntakePolicy {
            max_files: env_parse("MAX_FILES").unwrap_or(defaults.max_files),
            max_size: env_parse("MAX_FILE_SIZE").unwrap_or(defaults.max_size),
            min_size: env_parse("MIN_FILE_SIZE").unwrap_or(defaults.min_size),
            allowed_mime_types: std::env::var("ALLOWED_MIME_TYPES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_mime_types),
        };

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                url: std::env::var("STORAGE_URL").ok(),
                api_key: std::env::var("STORAGE_API_KEY").ok(),
                bucket: std::env::var("STORAGE_BUCKET").ok(),
            },
            upload: UploadConfig {
                cache_control_secs: env_parse("UPLOAD_CACHE_CONTROL_SECS").unwrap_or(3600),
                upsert: env_flag("UPLOAD_UPSERT").unwrap_or(false),
                policy,
            },
            test_mode,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Bucket {
            for (name, value) in [
                ("STORAGE_URL", &self.storage.url),
                ("STORAGE_API_KEY", &self.storage.api_key),
                ("STORAGE_BUCKET", &self.storage.bucket),
            ] {
                if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                    return Err(ConfigError::ValidationError(format!(
                        "{name} is required when STORAGE_BACKEND=bucket"
                    )));
                }
            }
        }

        let policy = &self.upload.policy;
        if policy.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILES must be at least 1".to_string(),
            ));
        }
        if policy.min_size > policy.max_size {
            return Err(ConfigError::ValidationError(format!(
                "MIN_FILE_SIZE ({}) exceeds MAX_FILE_SIZE ({})",
                policy.min_size, policy.max_size
            )));
        }

        if self.upload.upsert {
            tracing::warn!("UPLOAD_UPSERT is enabled; existing objects will be overwritten");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v == "true" || v == "1")
}
