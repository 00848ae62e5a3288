//! Storage location model: backend-agnostic reference to where content is stored.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage backend kinds
///
/// One variant per supported provider. The concrete backend is selected by
/// configuration at startup; this enum is the single dispatch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    S3,
    Minio,
    Gcs,
    Azure,
    Local,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "minio" => Ok(BackendKind::Minio),
            "gcs" => Ok(BackendKind::Gcs),
            "azure" => Ok(BackendKind::Azure),
            "local" => Ok(BackendKind::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::Minio => write!(f, "minio"),
            BackendKind::Gcs => write!(f, "gcs"),
            BackendKind::Azure => write!(f, "azure"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// A reference to one version's physical location.
///
/// Value type embedded in version records; never shared across documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub backend: BackendKind,
    pub bucket: String,
    pub key: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}
