//! Configuration module
//!
//! Environment-backed configuration for the ingestion service. Per-project
//! storage credentials live in the database (see `annotia-db`); this struct
//! only carries deployment-level settings.

use std::env;

// Defaults
const SERVER_PORT: u16 = 8080;
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SIZE_BYTES: usize = 50 * 1024 * 1024;
const MAX_VIDEO_SIZE_BYTES: usize = 2 * 1024 * 1024 * 1024;
const MAX_CONCURRENT_TRANSCODES: usize = 2;
/// Expiry for object-store presigned URLs (both read and write).
pub const OBJECT_STORE_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;
const BLOB_SAS_PUBLISH_EXPIRY_DAYS: u64 = 365;
const BLOB_SAS_ACCESS_EXPIRY_DAYS: u64 = 1;

/// Service configuration, loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    server_port: u16,
    cors_origins: Vec<String>,
    environment: String,
    database_url: String,
    db_max_connections: u32,
    db_timeout_seconds: u64,
    // Local file store (staging directory for every backend, final storage for the local one)
    file_store_root: String,
    file_store_base_url: String,
    // External tools
    ffmpeg_path: String,
    ffprobe_path: String,
    max_concurrent_transcodes: usize,
    // Upload limits and allowlists
    max_image_size_bytes: usize,
    max_video_size_bytes: usize,
    image_allowed_extensions: Vec<String>,
    video_allowed_extensions: Vec<String>,
    // Blob-store SAS expiries (day counts)
    blob_sas_publish_expiry_days: u64,
    blob_sas_access_expiry_days: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables (a `.env` file is
    /// honored when present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let file_store_root = env::var("FILE_STORE_ROOT")
            .map_err(|_| anyhow::anyhow!("FILE_STORE_ROOT must be set"))?;

        let config = Config {
            server_port: env_parse("SERVER_PORT", SERVER_PORT),
            cors_origins: env_list("CORS_ORIGINS", ""),
            environment: env_or("ENVIRONMENT", "development"),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECS", DB_TIMEOUT_SECS),
            file_store_root,
            file_store_base_url: env_or("FILE_STORE_BASE_URL", ""),
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            ffprobe_path: env_or("FFPROBE_PATH", "ffprobe"),
            max_concurrent_transcodes: env_parse(
                "MAX_CONCURRENT_TRANSCODES",
                MAX_CONCURRENT_TRANSCODES,
            ),
            max_image_size_bytes: env_parse("MAX_IMAGE_SIZE_BYTES", MAX_IMAGE_SIZE_BYTES),
            max_video_size_bytes: env_parse("MAX_VIDEO_SIZE_BYTES", MAX_VIDEO_SIZE_BYTES),
            image_allowed_extensions: env_list(
                "IMAGE_ALLOWED_EXTENSIONS",
                "jpg,jpeg,png,gif,bmp,webp",
            ),
            video_allowed_extensions: env_list(
                "VIDEO_ALLOWED_EXTENSIONS",
                "mp4,mov,avi,mkv,webm,mpg,mpeg",
            ),
            blob_sas_publish_expiry_days: env_parse(
                "BLOB_SAS_PUBLISH_EXPIRY_DAYS",
                BLOB_SAS_PUBLISH_EXPIRY_DAYS,
            ),
            blob_sas_access_expiry_days: env_parse(
                "BLOB_SAS_ACCESS_EXPIRY_DAYS",
                BLOB_SAS_ACCESS_EXPIRY_DAYS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_transcodes == 0 {
            anyhow::bail!("MAX_CONCURRENT_TRANSCODES must be at least 1");
        }
        if self.file_store_root.trim().is_empty() {
            anyhow::bail!("FILE_STORE_ROOT must not be empty");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn file_store_root(&self) -> &str {
        &self.file_store_root
    }

    pub fn file_store_base_url(&self) -> &str {
        &self.file_store_base_url
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }

    pub fn max_concurrent_transcodes(&self) -> usize {
        self.max_concurrent_transcodes
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.max_image_size_bytes
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.max_video_size_bytes
    }

    pub fn image_allowed_extensions(&self) -> &[String] {
        &self.image_allowed_extensions
    }

    pub fn video_allowed_extensions(&self) -> &[String] {
        &self.video_allowed_extensions
    }

    pub fn blob_sas_publish_expiry_days(&self) -> u64 {
        self.blob_sas_publish_expiry_days
    }

    pub fn blob_sas_access_expiry_days(&self) -> u64 {
        self.blob_sas_access_expiry_days
    }
}
