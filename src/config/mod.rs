use std::env;
use std::path::PathBuf;
use anyhow::{Result, Context};
use tracing::{info, warn};

/// Largest file accepted by the pipeline unless overridden.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Key under which the session snapshot is stored.
pub const STORAGE_KEY: &str = "uploadedFiles";

const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 8;
const DEFAULT_SESSION_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_file_size_bytes: u64,
    pub max_concurrent_extractions: usize,
    pub session_quota_bytes: usize,
    pub session_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_concurrent_extractions: DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
            session_quota_bytes: DEFAULT_SESSION_QUOTA_BYTES,
            session_dir: default_session_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Config {
            max_file_size_bytes: Self::parse_env_var("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES)
                .context("Failed to parse MAX_FILE_SIZE_BYTES")?,
            max_concurrent_extractions: Self::parse_env_var(
                "MAX_CONCURRENT_EXTRACTIONS",
                DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
            )
            .context("Failed to parse MAX_CONCURRENT_EXTRACTIONS")?,
            session_quota_bytes: Self::parse_env_var("SESSION_QUOTA_BYTES", DEFAULT_SESSION_QUOTA_BYTES)
                .context("Failed to parse SESSION_QUOTA_BYTES")?,
            session_dir: env::var("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let dir = default_session_dir();
                    info!("SESSION_DIR not set, using default: {}", dir.display());
                    dir
                }),
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }
        if self.max_concurrent_extractions == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_EXTRACTIONS must be greater than 0"));
        }
        if self.session_quota_bytes == 0 {
            return Err(anyhow::anyhow!("SESSION_QUOTA_BYTES must be greater than 0"));
        }
        Ok(())
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_dir.join(format!("{}.json", STORAGE_KEY))
    }
}

fn default_session_dir() -> PathBuf {
    env::temp_dir().join("filetext-session")
}
