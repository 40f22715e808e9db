use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::digest::{Algorithm, DigestEngine, DEFAULT_CHUNK_SIZE};
use crate::sources::clipboard::{CommandClipboard, CommandClipboardWriter};
use crate::sources::watcher::DownloadFilter;

/// Rejected at startup, never at verification time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no digest algorithms configured")]
    NoAlgorithms,
    #[error("compare_algorithm {0} is not in the configured algorithms")]
    CompareNotComputed(Algorithm),
    #[error("no folders to watch")]
    NoWatchDirs,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("clipboard commands must not be empty")]
    EmptyClipboardCommand,
}

/// Global configuration loaded from `~/.config/hashmatch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashmatchConfig {
    /// Folders watched (non-recursively) for completed downloads. Created if missing.
    pub watch_dirs: Vec<PathBuf>,
    /// File extensions worth digesting, with leading dot. Empty = every file.
    pub extensions: Vec<String>,
    /// Digests computed for every detected file.
    pub algorithms: Vec<Algorithm>,
    /// Digest that clipboard values are compared against.
    pub compare_algorithm: Algorithm,
    /// Read buffer for the digest pass, in bytes.
    pub chunk_size: usize,
    pub clipboard_poll_ms: u64,
    /// How long a verified/failed result stays before returning to rest.
    pub reset_delay_ms: u64,
    /// Quiet period after the last filesystem event before a file counts as complete.
    pub settle_ms: u64,
    /// Command printing the clipboard text (argv). None = wl-paste or xclip.
    pub clipboard_command: Option<Vec<String>>,
    /// Command reading new clipboard text from stdin (argv). None = wl-copy or xclip -i.
    pub clipboard_copy_command: Option<Vec<String>>,
}

impl Default for HashmatchConfig {
    fn default() -> Self {
        Self {
            watch_dirs: vec![default_download_dir()],
            extensions: [
                ".iso", ".exe", ".msi", ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz",
                ".dmg", ".img", ".apk", ".ova", ".vhd", ".bin", ".deb", ".appimage",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            algorithms: Algorithm::ALL.to_vec(),
            compare_algorithm: Algorithm::Sha256,
            chunk_size: DEFAULT_CHUNK_SIZE,
            clipboard_poll_ms: 500,
            reset_delay_ms: 3000,
            settle_ms: 1000,
            clipboard_command: None,
            clipboard_copy_command: None,
        }
    }
}

fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads")
}

impl HashmatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        if !self.algorithms.contains(&self.compare_algorithm) {
            return Err(ConfigError::CompareNotComputed(self.compare_algorithm));
        }
        if self.watch_dirs.is_empty() {
            return Err(ConfigError::NoWatchDirs);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Zero("chunk_size"));
        }
        if self.clipboard_poll_ms == 0 {
            return Err(ConfigError::Zero("clipboard_poll_ms"));
        }
        if [&self.clipboard_command, &self.clipboard_copy_command]
            .iter()
            .any(|c| c.as_ref().is_some_and(|argv| argv.is_empty()))
        {
            return Err(ConfigError::EmptyClipboardCommand);
        }
        Ok(())
    }

    pub fn digest_engine(&self) -> Result<DigestEngine, ConfigError> {
        DigestEngine::new(self.algorithms.clone(), self.chunk_size)
    }

    pub fn download_filter(&self) -> DownloadFilter {
        DownloadFilter::new(&self.extensions)
    }

    pub fn clipboard_reader(&self) -> CommandClipboard {
        match &self.clipboard_command {
            Some(argv) => CommandClipboard::new(argv.clone()),
            None => CommandClipboard::detect(),
        }
    }

    pub fn clipboard_writer(&self) -> CommandClipboardWriter {
        match &self.clipboard_copy_command {
            Some(argv) => CommandClipboardWriter::new(argv.clone()),
            None => CommandClipboardWriter::detect(),
        }
    }

    pub fn clipboard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clipboard_poll_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hashmatch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HashmatchConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<HashmatchConfig> {
    if !path.exists() {
        let default_cfg = HashmatchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HashmatchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = HashmatchConfig::default();
        assert_eq!(cfg.algorithms, Algorithm::ALL.to_vec());
        assert_eq!(cfg.compare_algorithm, Algorithm::Sha256);
        assert_eq!(cfg.chunk_size, 8192);
        assert_eq!(cfg.clipboard_poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.reset_delay(), Duration::from_secs(3));
        assert!(cfg.watch_dirs[0].ends_with("Downloads"));
        assert!(cfg.extensions.iter().any(|e| e == ".iso"));
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = HashmatchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: HashmatchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.algorithms, cfg.algorithms);
        assert_eq!(parsed.watch_dirs, cfg.watch_dirs);
        assert_eq!(parsed.reset_delay_ms, cfg.reset_delay_ms);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            watch_dirs = ["/srv/incoming"]
            extensions = []
            algorithms = ["sha256", "sha512"]
            compare_algorithm = "sha512"
            clipboard_poll_ms = 250
            reset_delay_ms = 1500
            clipboard_command = ["xsel", "--clipboard", "--output"]
            clipboard_copy_command = ["xsel", "--clipboard", "--input"]
        "#;
        let cfg: HashmatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.watch_dirs, vec![PathBuf::from("/srv/incoming")]);
        assert!(cfg.extensions.is_empty());
        assert_eq!(cfg.algorithms, vec![Algorithm::Sha256, Algorithm::Sha512]);
        assert_eq!(cfg.compare_algorithm, Algorithm::Sha512);
        assert_eq!(cfg.clipboard_poll_ms, 250);
        assert_eq!(cfg.reset_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.clipboard_reader().argv()[0], "xsel");
        assert_eq!(cfg.clipboard_writer().argv()[2], "--input");
        // unspecified fields keep their defaults
        assert_eq!(cfg.chunk_size, 8192);
        assert_eq!(cfg.settle_ms, 1000);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let toml = r#"algorithms = ["sha256", "crc32"]"#;
        assert!(toml::from_str::<HashmatchConfig>(toml).is_err());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut cfg = HashmatchConfig::default();
        cfg.algorithms = vec![Algorithm::Md5];
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::CompareNotComputed(Algorithm::Sha256))
        );

        let mut cfg = HashmatchConfig::default();
        cfg.algorithms.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoAlgorithms));

        let mut cfg = HashmatchConfig::default();
        cfg.chunk_size = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("chunk_size")));

        let mut cfg = HashmatchConfig::default();
        cfg.clipboard_command = Some(vec![]);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyClipboardCommand));

        let mut cfg = HashmatchConfig::default();
        cfg.clipboard_copy_command = Some(vec![]);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyClipboardCommand));

        let mut cfg = HashmatchConfig::default();
        cfg.watch_dirs.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoWatchDirs));
    }

    #[test]
    fn load_or_init_writes_defaults_then_reads_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        let loaded = load_or_init_at(&path).unwrap();
        assert_eq!(loaded.algorithms, created.algorithms);
        assert_eq!(loaded.extensions, created.extensions);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "algorithms = [\"md5\"]\n").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("compare_algorithm"));
    }
}
