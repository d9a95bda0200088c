//! Configuration loading and settings resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`QTWT_*`, merged into the overrides by the CLI parser)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: loading reports it as absent and
//! defaults apply. A config file that exists but does not parse is a
//! [`Error::Config`]. Loading does not log, because it runs before the log
//! level it carries has been applied.

use crate::params::{sanitize_fade_length, ConversionRequest, WaveCount};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "QTWT_CONFIG";

/// Default engine load timeout (seconds)
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 15;

/// Default archive name for multi-file batches
pub const DEFAULT_ARCHIVE_NAME: &str = "qtpy_synth_wavetables.zip";

/// Which transcoder engine normalizes input audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process decoding and resampling
    #[default]
    Symphonia,
    /// External `ffmpeg` executable
    Ffmpeg,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "symphonia" | "native" => Ok(EngineKind::Symphonia),
            "ffmpeg" => Ok(EngineKind::Ffmpeg),
            other => Err(Error::InvalidInput(format!("unknown engine: {:?}", other))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Symphonia => write!(f, "symphonia"),
            EngineKind::Ffmpeg => write!(f, "ffmpeg"),
        }
    }
}

/// `[engine]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: Option<EngineKind>,
    pub ffmpeg_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub load_timeout_secs: Option<u64>,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter level (trace, debug, info, warn, error)
    pub level: Option<String>,
}

/// On-disk configuration file
///
/// Every field is optional so partial files work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub waves: Option<WaveCount>,
    pub fade_in: Option<bool>,
    pub fade_out: Option<bool>,
    pub fade_length: Option<i64>,
    pub output_dir: Option<PathBuf>,
    pub archive: Option<bool>,
    pub archive_name: Option<String>,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Values given on the command line or through `QTWT_*` variables
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub waves: Option<WaveCount>,
    pub fade_in: Option<bool>,
    pub fade_out: Option<bool>,
    pub fade_length: Option<i64>,
    pub output_dir: Option<PathBuf>,
    pub archive: Option<bool>,
    pub archive_name: Option<String>,
    pub engine: Option<EngineKind>,
    pub ffmpeg_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub load_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub waves: WaveCount,
    pub fade_in: bool,
    pub fade_out: bool,
    pub fade_length: usize,
    pub output_dir: PathBuf,
    pub archive: bool,
    pub archive_name: String,
    pub engine: EngineKind,
    pub ffmpeg_path: PathBuf,
    pub work_dir: PathBuf,
    pub engine_load_timeout: Duration,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            waves: WaveCount::Auto,
            fade_in: false,
            fade_out: false,
            fade_length: 0,
            output_dir: PathBuf::from("."),
            archive: true,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            engine: EngineKind::default(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            work_dir: std::env::temp_dir().join("qtwt"),
            engine_load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Merge overrides over the config file over compiled defaults
    pub fn resolve(overrides: &SettingsOverrides, file: &TomlConfig) -> Self {
        let defaults = Settings::default();

        let fade_length = overrides
            .fade_length
            .or(file.fade_length)
            .map(sanitize_fade_length)
            .unwrap_or(defaults.fade_length);

        let load_timeout_secs = overrides
            .load_timeout_secs
            .or(file.engine.load_timeout_secs);

        Self {
            waves: overrides.waves.or(file.waves).unwrap_or(defaults.waves),
            fade_in: overrides.fade_in.or(file.fade_in).unwrap_or(defaults.fade_in),
            fade_out: overrides.fade_out.or(file.fade_out).unwrap_or(defaults.fade_out),
            fade_length,
            output_dir: overrides
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or(defaults.output_dir),
            archive: overrides.archive.or(file.archive).unwrap_or(defaults.archive),
            archive_name: overrides
                .archive_name
                .clone()
                .or_else(|| file.archive_name.clone())
                .unwrap_or(defaults.archive_name),
            engine: overrides.engine.or(file.engine.kind).unwrap_or(defaults.engine),
            ffmpeg_path: overrides
                .ffmpeg_path
                .clone()
                .or_else(|| file.engine.ffmpeg_path.clone())
                .unwrap_or(defaults.ffmpeg_path),
            work_dir: overrides
                .work_dir
                .clone()
                .or_else(|| file.engine.work_dir.clone())
                .unwrap_or(defaults.work_dir),
            engine_load_timeout: load_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.engine_load_timeout),
            log_level: overrides
                .log_level
                .clone()
                .or_else(|| file.logging.level.clone())
                .unwrap_or(defaults.log_level),
        }
    }

    /// Conversion parameters shared by every file of a batch
    pub fn conversion_request(&self) -> ConversionRequest {
        ConversionRequest::new(self.waves, self.fade_in, self.fade_out, self.fade_length)
    }
}

/// Platform config file location (`<config_dir>/qtwt/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("qtwt").join("config.toml"))
}

/// Pick the config file to read
///
/// Command-line path first, then `QTWT_CONFIG`, then the platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load a TOML config file
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    debug!("Wrote config file: {}", path.display());
    Ok(())
}

/// Config file with every key set to its compiled default
pub fn default_toml_config() -> TomlConfig {
    let defaults = Settings::default();
    TomlConfig {
        waves: Some(defaults.waves),
        fade_in: Some(defaults.fade_in),
        fade_out: Some(defaults.fade_out),
        fade_length: Some(defaults.fade_length as i64),
        output_dir: Some(defaults.output_dir),
        archive: Some(defaults.archive),
        archive_name: Some(defaults.archive_name),
        engine: EngineConfig {
            kind: Some(defaults.engine),
            ffmpeg_path: Some(defaults.ffmpeg_path),
            work_dir: None,
            load_timeout_secs: Some(defaults.engine_load_timeout.as_secs()),
        },
        logging: LoggingConfig {
            level: Some(defaults.log_level),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::resolve(&SettingsOverrides::default(), &TomlConfig::default());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine_load_timeout, Duration::from_secs(15));
        assert_eq!(settings.archive_name, "qtpy_synth_wavetables.zip");
    }

    #[test]
    fn test_override_beats_file() {
        let file: TomlConfig = toml::from_str(
            r#"
            waves = 32
            fade_in = true
            fade_length = 200

            [engine]
            kind = "ffmpeg"
            load_timeout_secs = 30
            "#,
        )
        .unwrap();
        let overrides = SettingsOverrides {
            waves: Some(WaveCount::fixed(128).unwrap()),
            load_timeout_secs: Some(5),
            ..Default::default()
        };

        let settings = Settings::resolve(&overrides, &file);
        assert_eq!(settings.waves.resolve().get(), 128);
        assert!(settings.fade_in);
        assert_eq!(settings.fade_length, 200);
        assert_eq!(settings.engine, EngineKind::Ffmpeg);
        assert_eq!(settings.engine_load_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_negative_fade_length_is_zero() {
        let overrides = SettingsOverrides {
            fade_length: Some(-40),
            ..Default::default()
        };
        let settings = Settings::resolve(&overrides, &TomlConfig::default());
        assert_eq!(settings.fade_length, 0);
    }

    #[test]
    fn test_conversion_request_from_settings() {
        let settings = Settings {
            fade_out: true,
            fade_length: 64,
            ..Settings::default()
        };
        let request = settings.conversion_request();
        assert_eq!(request.target_wave_count.get(), 64);
        assert!(request.fade_out);
        assert!(!request.fade_in);
        assert_eq!(request.fade_length_samples, 64);
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("ffmpeg".parse::<EngineKind>().unwrap(), EngineKind::Ffmpeg);
        assert_eq!("Symphonia".parse::<EngineKind>().unwrap(), EngineKind::Symphonia);
        assert!("sox".parse::<EngineKind>().is_err());
    }
}
