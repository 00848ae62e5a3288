//! Configuration module
//!
//! Engine configuration is read from the environment, mirroring the
//! deployment model of the surrounding services: one flat namespace of
//! variables, validated once at startup.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::models::BackendKind;

// Defaults
const DEFAULT_MAX_FILE_SIZE_MB: u64 = 20;
const DEFAULT_STORAGE_OP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLAMAV_PORT: u16 = 3310;
const DEFAULT_CLAMAV_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SCAN_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_OUTBOX_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_OUTBOX_BATCH_SIZE: usize = 100;
const DEFAULT_OUTBOX_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    // Storage configuration
    pub storage_backend: BackendKind,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub storage_op_timeout_secs: u64,
    // Upload limits
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    // Threat scanning
    pub scan_enabled: bool,
    pub clamav_host: String,
    pub clamav_port: u16,
    pub clamav_timeout_secs: u64,
    pub scan_max_attempts: u32,
    // Event publication
    pub outbox_poll_interval_secs: u64,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: u32,
    pub event_endpoint: Option<String>,
    pub event_signing_secret: Option<String>,
    // Retention of archived documents before terminal deletion
    pub retention_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_backend: BackendKind::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            storage_op_timeout_secs: DEFAULT_STORAGE_OP_TIMEOUT_SECS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: Vec::new(),
            scan_enabled: true,
            clamav_host: "localhost".to_string(),
            clamav_port: DEFAULT_CLAMAV_PORT,
            clamav_timeout_secs: DEFAULT_CLAMAV_TIMEOUT_SECS,
            scan_max_attempts: DEFAULT_SCAN_MAX_ATTEMPTS,
            outbox_poll_interval_secs: DEFAULT_OUTBOX_POLL_INTERVAL_SECS,
            outbox_batch_size: DEFAULT_OUTBOX_BATCH_SIZE,
            outbox_max_attempts: DEFAULT_OUTBOX_MAX_ATTEMPTS,
            event_endpoint: None,
            event_signing_secret: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (including a `.env` file
    /// when present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            storage_backend: env_parse("STORAGE_BACKEND", defaults.storage_backend)?,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION").or_else(|| env_opt("AWS_REGION")),
            s3_endpoint: env_opt("S3_ENDPOINT_URL"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            storage_op_timeout_secs: env_parse(
                "STORAGE_OP_TIMEOUT_SECS",
                defaults.storage_op_timeout_secs,
            )?,
            max_file_size_bytes: env_parse("MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB)?
                * 1024
                * 1024,
            allowed_extensions: env_list("ALLOWED_FILE_TYPES"),
            scan_enabled: env_parse("VIRUS_SCAN_ENABLED", defaults.scan_enabled)?,
            clamav_host: env_opt("CLAMAV_HOST").unwrap_or(defaults.clamav_host),
            clamav_port: env_parse("CLAMAV_PORT", defaults.clamav_port)?,
            clamav_timeout_secs: env_parse("CLAMAV_TIMEOUT_SECS", defaults.clamav_timeout_secs)?,
            scan_max_attempts: env_parse("SCAN_MAX_ATTEMPTS", defaults.scan_max_attempts)?,
            outbox_poll_interval_secs: env_parse(
                "OUTBOX_POLL_INTERVAL_SECS",
                defaults.outbox_poll_interval_secs,
            )?,
            outbox_batch_size: env_parse("OUTBOX_BATCH_SIZE", defaults.outbox_batch_size)?,
            outbox_max_attempts: env_parse("OUTBOX_MAX_ATTEMPTS", defaults.outbox_max_attempts)?,
            event_endpoint: env_opt("EVENT_ENDPOINT"),
            event_signing_secret: env_opt("EVENT_SIGNING_SECRET"),
            retention_days: env_parse("RETENTION_DAYS", defaults.retention_days)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        match self.storage_backend {
            BackendKind::S3 | BackendKind::Minio => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET not configured");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION not configured");
                }
                if self.storage_backend == BackendKind::Minio && self.s3_endpoint.is_none() {
                    anyhow::bail!("S3_ENDPOINT_URL required for the minio backend");
                }
            }
            BackendKind::Local => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_PATH not configured");
                }
            }
            BackendKind::Gcs | BackendKind::Azure => {}
        }

        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be greater than 0");
        }
        if self.scan_max_attempts == 0 {
            anyhow::bail!("SCAN_MAX_ATTEMPTS must be greater than 0");
        }
        Ok(())
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
            .with_context(|| format!("Failed to parse environment variable {}", key)),
        None => Ok(default),
    }
}

fn env_list(key: &str) -> Vec<String> {
    env_opt(key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
