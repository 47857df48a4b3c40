use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because the backend is part of both project configuration
/// and the persisted file record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    Local,
    ObjectStore,
    BlobStore,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "object-store" => Ok(StorageBackend::ObjectStore),
            "blob-store" => Ok(StorageBackend::BlobStore),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::ObjectStore => write!(f, "object-store"),
            StorageBackend::BlobStore => write!(f, "blob-store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_round_trip() {
        for backend in [
            StorageBackend::Local,
            StorageBackend::ObjectStore,
            StorageBackend::BlobStore,
        ] {
            let parsed: StorageBackend = backend.to_string().parse().unwrap();
            assert_eq!(parsed, backend);
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!("nfs".parse::<StorageBackend>().is_err());
    }
}
