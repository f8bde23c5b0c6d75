use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};
use crate::transcode::{Backend, Transcoder};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct TranscodeConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareConfig {
    #[serde(default)]
    pub jobs: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            ffmpeg: default_ffmpeg(),
            temp_dir: None,
        }
    }
}

fn default_ffmpeg() -> String { "ffmpeg".into() }
fn default_temp_dir() -> PathBuf { std::env::temp_dir().join("audiomatch") }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Explicit path, else `audiomatch.toml` in the working directory, else the
/// per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("audiomatch.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("audiomatch").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("audiomatch").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Effective run settings: command-line values win over the config file.
#[derive(Debug)]
pub struct Settings {
    pub format: OutputFormat,
    pub jobs: usize,
    pub transcoder: Transcoder,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: Config) -> Self {
        let transcoder = Transcoder {
            backend: cli.transcoder.unwrap_or(config.transcode.backend),
            ffmpeg: cli.ffmpeg.clone().unwrap_or(config.transcode.ffmpeg),
            temp_dir: cli
                .temp_dir
                .clone()
                .or(config.transcode.temp_dir)
                .unwrap_or_else(default_temp_dir),
        };

        Self {
            format: cli.format.unwrap_or(config.output.format),
            jobs: cli.jobs.unwrap_or(config.compare.jobs),
            transcoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transcode.backend, Backend::Ffmpeg);
        assert_eq!(config.transcode.ffmpeg, "ffmpeg");
        assert!(config.transcode.temp_dir.is_none());
        assert_eq!(config.compare.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [transcode]
            backend = "builtin"
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            temp_dir = "/var/tmp/am"

            [compare]
            jobs = 4

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.transcode.backend, Backend::Builtin);
        assert_eq!(config.transcode.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.transcode.temp_dir, Some(PathBuf::from("/var/tmp/am")));
        assert_eq!(config.compare.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(toml::from_str::<Config>("[transcode]\nbackend = \"sox\"").is_err());
    }

    #[test]
    fn command_line_overrides_config() {
        let config: Config = toml::from_str(
            "[transcode]\nbackend = \"builtin\"\ntemp_dir = \"/cfg\"\n[compare]\njobs = 8\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["audiomatch", "a.wav", "b.wav", "--temp-dir", "/cli", "--format", "json"]);
        let settings = Settings::resolve(&cli, config);

        assert_eq!(settings.transcoder.backend, Backend::Builtin);
        assert_eq!(settings.transcoder.temp_dir, PathBuf::from("/cli"));
        assert_eq!(settings.jobs, 8);
        assert_eq!(settings.format, OutputFormat::Json);
    }

    #[test]
    fn default_temp_dir_is_fixed() {
        let cli = Cli::parse_from(["audiomatch", "a.wav", "b.wav"]);
        let settings = Settings::resolve(&cli, Config::default());
        assert_eq!(settings.transcoder.temp_dir, std::env::temp_dir().join("audiomatch"));
        assert_eq!(settings.transcoder.ffmpeg, "ffmpeg");
    }

    #[test]
    fn load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[compare\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
