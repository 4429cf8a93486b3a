//! Configuration loading for the scanner service
//!
//! Settings are resolved in this order (later wins):
//! 1. Built-in defaults (code constants)
//! 2. TOML configuration file (explicit path, or `./fqs.toml` when present)
//! 3. Environment variables (`FQS_*`)
//!
//! Command-line flags for host, port and config path are applied by the
//! binary on top of the result.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "fqs.toml";

/// Complete scanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub detector: DetectorConfig,
    pub nir: NirConfig,
    pub fusion: FusionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Upload handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Where original uploads are stored as `<scan_id>.<ext>`
    pub upload_dir: PathBuf,
    /// Where annotated images are stored as `<scan_id>_processed.jpg`
    pub processed_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Lowercase extensions without the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("static/images/uploads"),
            processed_dir: PathBuf::from("static/images/processed"),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadConfig {
    /// Case-insensitive extension check on a client-supplied file name
    pub fn is_allowed_file(&self, filename: &str) -> bool {
        file_extension(filename)
            .map(|ext| self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false)
    }
}

/// Lowercased extension after the last dot, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Object detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Model weights (ONNX export of the YOLO model)
    pub model_path: PathBuf,
    /// Class list (YOLO `data.yaml` with a `names` entry)
    pub class_list_path: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Square model input edge in pixels
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("data/models/best.onnx"),
            class_list_path: PathBuf::from("data/data.yaml"),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// Near-infrared sensor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NirConfig {
    pub enabled: bool,
    pub mock_mode: bool,
    pub device_id: Option<String>,
    pub api_url: Option<String>,
    /// Seed for reproducible mock readings
    pub seed: Option<u64>,
}

impl Default for NirConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mock_mode: true,
            device_id: None,
            api_url: None,
            seed: None,
        }
    }
}

/// Fusion weights (must sum to 1.0)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub yolo_weight: f64,
    pub nir_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            yolo_weight: 0.6,
            nir_weight: 0.4,
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    #[serde(alias = "postgresql")]
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Postgres => "postgres",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(Error::Config(format!(
                "Unsupported database type '{}' (expected sqlite or postgres)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
    pub postgres: PostgresConfig,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: PathBuf::from("database/fruit_scanner.db"),
            postgres: PostgresConfig::default(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "fruit_scanner".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl PostgresConfig {
    /// Connection description safe for logs (no password)
    pub fn redacted(&self) -> String {
        format!("postgres://{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration: defaults, then TOML file, then environment
    ///
    /// An explicit `path` must exist. Without one, `./fqs.toml` is used
    /// only if present.
    ///
    /// Runs before logging is set up, so it logs nothing; callers report
    /// the source via [`ScannerConfig::resolve_path`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_path(path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// File `load` reads: the explicit path, else `./fqs.toml` when present
    pub fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        }
    }

    /// Parse a TOML file (missing keys take defaults)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `FQS_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_string("FQS_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env_parse("FQS_PORT")? {
            self.server.port = v;
        }
        if let Some(v) = env_parse("FQS_MAX_UPLOAD_BYTES")? {
            self.upload.max_upload_bytes = v;
        }
        if let Some(v) = env_string("FQS_UPLOAD_DIR") {
            self.upload.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("FQS_PROCESSED_DIR") {
            self.upload.processed_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("FQS_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("FQS_CLASS_LIST") {
            self.detector.class_list_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse("FQS_YOLO_CONFIDENCE")? {
            self.detector.confidence_threshold = v;
        }
        if let Some(v) = env_parse("FQS_YOLO_IOU")? {
            self.detector.iou_threshold = v;
        }
        if let Some(v) = env_bool("FQS_NIR_ENABLED")? {
            self.nir.enabled = v;
        }
        if let Some(v) = env_bool("FQS_NIR_MOCK_MODE")? {
            self.nir.mock_mode = v;
        }
        if let Some(v) = env_string("FQS_NIR_DEVICE_ID") {
            self.nir.device_id = Some(v);
        }
        if let Some(v) = env_string("FQS_NIR_API_URL") {
            self.nir.api_url = Some(v);
        }
        if let Some(v) = env_parse("FQS_NIR_SEED")? {
            self.nir.seed = Some(v);
        }
        if let Some(v) = env_parse("FQS_YOLO_WEIGHT")? {
            self.fusion.yolo_weight = v;
        }
        if let Some(v) = env_parse("FQS_NIR_WEIGHT")? {
            self.fusion.nir_weight = v;
        }
        if let Some(v) = env_string("FQS_DATABASE_TYPE") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = env_string("FQS_SQLITE_PATH") {
            self.storage.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("FQS_POSTGRES_HOST") {
            self.storage.postgres.host = v;
        }
        if let Some(v) = env_parse("FQS_POSTGRES_PORT")? {
            self.storage.postgres.port = v;
        }
        if let Some(v) = env_string("FQS_POSTGRES_DB") {
            self.storage.postgres.database = v;
        }
        if let Some(v) = env_string("FQS_POSTGRES_USER") {
            self.storage.postgres.user = v;
        }
        if let Some(v) = env_string("FQS_POSTGRES_PASSWORD") {
            self.storage.postgres.password = v;
        }
        if let Some(v) = env_string("FQS_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with
    ///
    /// Fusion weights are checked separately when the fusion engine is
    /// built, so that the error carries the fusion error type.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.detector.confidence_threshold) {
            return Err(Error::Config(format!(
                "detector.confidence_threshold must be within [0, 1], got {}",
                self.detector.confidence_threshold
            )));
        }
        if !in_unit(self.detector.iou_threshold) {
            return Err(Error::Config(format!(
                "detector.iou_threshold must be within [0, 1], got {}",
                self.detector.iou_threshold
            )));
        }
        if self.detector.input_size == 0 {
            return Err(Error::Config("detector.input_size must be positive".to_string()));
        }
        if self.upload.max_upload_bytes == 0 {
            return Err(Error::Config("upload.max_upload_bytes must be positive".to_string()));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config("upload.allowed_extensions must not be empty".to_string()));
        }
        if self.storage.max_connections == 0 {
            return Err(Error::Config("storage.max_connections must be positive".to_string()));
        }
        Ok(())
    }

    /// Human-readable storage location (password redacted)
    pub fn storage_description(&self) -> String {
        match self.storage.backend {
            StorageBackend::Sqlite => format!("sqlite://{}", self.storage.sqlite_path.display()),
            StorageBackend::Postgres => self.storage.postgres.redacted(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {}: '{}'", name, raw))),
        None => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env_string(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::Config(format!("Invalid boolean for {}: '{}'", name, raw))),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("apple.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailingdot."), None);
    }

    #[test]
    fn test_allowed_file() {
        let upload = UploadConfig::default();
        assert!(upload.is_allowed_file("mango.png"));
        assert!(upload.is_allowed_file("MANGO.JPEG"));
        assert!(!upload.is_allowed_file("notes.txt"));
        assert!(!upload.is_allowed_file("png"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ScannerConfig::from_toml_str(
            r#"
            [fusion]
            yolo_weight = 0.7
            nir_weight = 0.3

            [storage]
            backend = "postgresql"
            "#,
        )
        .unwrap();
        assert_eq!(config.fusion.yolo_weight, 0.7);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upload.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = ScannerConfig::default();
        config.detector.iou_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_postgres_redacted_hides_password() {
        let mut pg = PostgresConfig::default();
        pg.password = "hunter2".to_string();
        assert!(!pg.redacted().contains("hunter2"));
    }
}
