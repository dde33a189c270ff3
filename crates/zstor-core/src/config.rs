use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ZstorError, ZstorResult};

/// Top-level configuration (loaded from zstor.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZstorConfig {
    pub chunking: ChunkingConfig,
    pub codec: CodecConfig,
    pub logging: LoggingConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Nominal chunk size in bytes (default: 524288 = 512 KiB)
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// zstd compression level (default: 3)
    pub compression_level: i32,
    /// Check the frame CRC32 before decrypting (default: false)
    pub verify_checksum: bool,
    /// Largest uncompressed size a frame may declare, in bytes
    pub max_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit per-chunk trace output (forces the filter to "debug")
    pub debug: bool,
    /// Log level when `debug` is off (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// No object store; push and pull refuse to run
    #[default]
    Disabled,
    /// Frames stored as files under `remote.path`
    Directory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub kind: RemoteKind,
    /// Root directory for the `directory` backend
    pub path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            verify_checksum: false,
            max_chunk_size: 64 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl LoggingConfig {
    /// The filter directive implied by this section
    pub fn effective_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.level
        }
    }
}

impl ZstorConfig {
    /// Parse a config from TOML text and validate it.
    pub fn from_toml(text: &str) -> ZstorResult<Self> {
        let config: ZstorConfig =
            toml::from_str(text).map_err(|e| ZstorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ZstorResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ZstorError::file(path, e))?;
        Self::from_toml(&text)
            .map_err(|e| ZstorError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> ZstorResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(ZstorError::Config("chunking.chunk_size must be > 0".into()));
        }
        if !(1..=22).contains(&self.codec.compression_level) {
            return Err(ZstorError::Config(format!(
                "codec.compression_level must be in 1..=22, got {}",
                self.codec.compression_level
            )));
        }
        if self.codec.max_chunk_size < self.chunking.chunk_size {
            return Err(ZstorError::Config(format!(
                "codec.max_chunk_size ({}) is smaller than chunking.chunk_size ({})",
                self.codec.max_chunk_size, self.chunking.chunk_size
            )));
        }
        if self.remote.kind == RemoteKind::Directory && self.remote.path.is_none() {
            return Err(ZstorError::Config(
                "remote.kind = \"directory\" requires remote.path".into(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ZstorError::Config(format!(
                "logging.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[chunking]
chunk_size = 1048576

[codec]
compression_level = 9
verify_checksum = true
max_chunk_size = 8388608

[logging]
debug = true
level = "warn"
format = "json"

[remote]
kind = "directory"
path = "/var/lib/zstor/objects"
"#;
        let config = ZstorConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.chunking.chunk_size, 1048576);
        assert_eq!(config.codec.compression_level, 9);
        assert!(config.codec.verify_checksum);
        assert_eq!(config.codec.max_chunk_size, 8388608);
        assert!(config.logging.debug);
        assert_eq!(config.logging.effective_level(), "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.remote.kind, RemoteKind::Directory);
        assert_eq!(
            config.remote.path,
            Some(PathBuf::from("/var/lib/zstor/objects"))
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config = ZstorConfig::from_toml("").unwrap();

        assert_eq!(config.chunking.chunk_size, 524288);
        assert_eq!(config.codec.compression_level, 3);
        assert!(!config.codec.verify_checksum);
        assert!(!config.logging.debug);
        assert_eq!(config.logging.effective_level(), "info");
        assert_eq!(config.remote.kind, RemoteKind::Disabled);
        assert!(config.remote.path.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = ZstorConfig::from_toml("[logging]\nlevel = \"trace\"\n").unwrap();

        assert_eq!(config.logging.effective_level(), "trace");
        assert_eq!(config.chunking.chunk_size, 524288);
    }

    #[test]
    fn test_reject_zero_chunk_size() {
        let err = ZstorConfig::from_toml("[chunking]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, ZstorError::Config(_)));
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_reject_bad_level() {
        assert!(ZstorConfig::from_toml("[codec]\ncompression_level = 40\n").is_err());
    }

    #[test]
    fn test_directory_remote_requires_path() {
        let err = ZstorConfig::from_toml("[remote]\nkind = \"directory\"\n").unwrap_err();
        assert!(err.to_string().contains("remote.path"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZstorConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chunking.chunk_size, crate::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zstor.toml");
        std::fs::write(&path, "[codec]\ncompression_level = 1\n").unwrap();

        let config = ZstorConfig::load(&path).unwrap();
        assert_eq!(config.codec.compression_level, 1);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = ZstorConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = ZstorConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.chunking.chunk_size, parsed.chunking.chunk_size);
        assert_eq!(config.logging.level, parsed.logging.level);
        assert_eq!(config.remote.kind, parsed.remote.kind);
    }
}
