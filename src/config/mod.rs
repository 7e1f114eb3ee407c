//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scrivano";
const DEFAULT_ACTIVE_DIR: &str = "generated";
const DEFAULT_ARCHIVE_DIR: &str = "archive";
const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_STYLE_SET: &str = "default";
const DEFAULT_ARCHIVAL_DELAY_SECS: u64 = 86_400;

/// Command-line arguments for the Scrivano binary.
#[derive(Debug, Parser)]
#[command(name = "scrivano", version, about = "Markdown to DOCX conversion service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCRIVANO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Convert a markdown file (or stdin) into a stored document.
    Generate(GenerateArgs),
    /// Print lifecycle counts for the artifact stores.
    Stats(StatsArgs),
    /// Archive artifacts whose delay window has already passed.
    Reconcile(ReconcileArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub overrides: StoreOverrides,

    /// Markdown file to convert; `-` reads from stdin.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Base name for the generated files; derived from the first text line
    /// when omitted.
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Style set to load from the template directory.
    #[arg(long = "style-set", value_name = "NAME")]
    pub style_set: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub overrides: StoreOverrides,

    /// Emit stats as JSON instead of plain text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub overrides: StoreOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the active store directory.
    #[arg(long = "active-dir", value_name = "PATH")]
    pub active_dir: Option<PathBuf>,

    /// Override the archive store directory.
    #[arg(long = "archive-dir", value_name = "PATH")]
    pub archive_dir: Option<PathBuf>,

    /// Override the template directory.
    #[arg(long = "template-dir", value_name = "PATH")]
    pub template_dir: Option<PathBuf>,

    /// Override the archival delay.
    #[arg(long = "archival-delay-seconds", value_name = "SECONDS")]
    pub archival_delay_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub conversion: ConversionSettings,
    pub archival: ArchivalSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub active_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub template_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub style_set: String,
}

#[derive(Debug, Clone)]
pub struct ArchivalSettings {
    pub delay: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SCRIVANO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Generate(args) => raw.apply_store_overrides(&args.overrides),
        Command::Stats(args) => raw.apply_store_overrides(&args.overrides),
        Command::Reconcile(args) => raw.apply_store_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    storage: RawStorageSettings,
    conversion: RawConversionSettings,
    archival: RawArchivalSettings,
}

impl RawSettings {
    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(dir) = overrides.active_dir.as_ref() {
            self.storage.active_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.archive_dir.as_ref() {
            self.storage.archive_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.template_dir.as_ref() {
            self.storage.template_dir = Some(dir.clone());
        }
        if let Some(seconds) = overrides.archival_delay_seconds {
            self.archival.delay_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            storage,
            conversion,
            archival,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let storage = build_storage_settings(storage)?;
        let conversion = build_conversion_settings(conversion)?;
        let archival = build_archival_settings(archival)?;

        Ok(Self {
            logging,
            storage,
            conversion,
            archival,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let active_dir = storage
        .active_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ACTIVE_DIR));
    if active_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.active_dir",
            "path must not be empty",
        ));
    }

    let archive_dir = storage
        .archive_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_DIR));
    if archive_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.archive_dir",
            "path must not be empty",
        ));
    }
    if archive_dir == active_dir {
        return Err(LoadError::invalid(
            "storage.archive_dir",
            "must differ from storage.active_dir",
        ));
    }

    let template_dir = storage
        .template_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));
    if template_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.template_dir",
            "path must not be empty",
        ));
    }

    Ok(StorageSettings {
        active_dir,
        archive_dir,
        template_dir,
    })
}

fn build_conversion_settings(
    conversion: RawConversionSettings,
) -> Result<ConversionSettings, LoadError> {
    let style_set = conversion
        .style_set
        .unwrap_or_else(|| DEFAULT_STYLE_SET.to_string());
    if style_set.trim().is_empty() {
        return Err(LoadError::invalid(
            "conversion.style_set",
            "must not be empty",
        ));
    }

    Ok(ConversionSettings { style_set })
}

fn build_archival_settings(archival: RawArchivalSettings) -> Result<ArchivalSettings, LoadError> {
    let delay_seconds = archival.delay_seconds.unwrap_or(DEFAULT_ARCHIVAL_DELAY_SECS);
    if delay_seconds == 0 {
        return Err(LoadError::invalid(
            "archival.delay_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ArchivalSettings {
        delay: Duration::from_secs(delay_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    active_dir: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawConversionSettings {
    style_set: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawArchivalSettings {
    delay_seconds: Option<u64>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.storage.active_dir, PathBuf::from("generated"));
        assert_eq!(settings.storage.archive_dir, PathBuf::from("archive"));
        assert_eq!(settings.storage.template_dir, PathBuf::from("templates"));
        assert_eq!(settings.conversion.style_set, "default");
        assert_eq!(
            settings.archival.delay,
            Duration::from_secs(DEFAULT_ARCHIVAL_DELAY_SECS)
        );
        assert_eq!(settings.logging.level, LevelFilter::INFO);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.storage.active_dir = Some(PathBuf::from("from-file"));
        raw.logging.level = Some("info".to_string());

        let overrides = StoreOverrides {
            active_dir: Some(PathBuf::from("from-cli")),
            archival_delay_seconds: Some(60),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_store_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.storage.active_dir, PathBuf::from("from-cli"));
        assert_eq!(settings.archival.delay, Duration::from_secs(60));
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn zero_delay_is_rejected() {
        let mut raw = RawSettings::default();
        raw.archival.delay_seconds = Some(0);

        let err = Settings::from_raw(raw).expect_err("invalid delay");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "archival.delay_seconds",
                ..
            }
        ));
    }

    #[test]
    fn identical_store_directories_are_rejected() {
        let mut raw = RawSettings::default();
        raw.storage.active_dir = Some(PathBuf::from("store"));
        raw.storage.archive_dir = Some(PathBuf::from("store"));

        let err = Settings::from_raw(raw).expect_err("identical directories");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "storage.archive_dir",
                ..
            }
        ));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = StoreOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_store_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn parse_generate_arguments() {
        let args = CliArgs::parse_from([
            "scrivano",
            "generate",
            "--name",
            "report",
            "--style-set",
            "bhk",
            "--archival-delay-seconds",
            "120",
            "notes.md",
        ]);

        match args.command {
            Command::Generate(generate) => {
                assert_eq!(generate.file, PathBuf::from("notes.md"));
                assert_eq!(generate.name.as_deref(), Some("report"));
                assert_eq!(generate.style_set.as_deref(), Some("bhk"));
                assert_eq!(generate.overrides.archival_delay_seconds, Some(120));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_stats_arguments() {
        let args = CliArgs::parse_from(["scrivano", "stats", "--json", "--active-dir", "/tmp/a"]);

        match args.command {
            Command::Stats(stats) => {
                assert!(stats.json);
                assert_eq!(stats.overrides.active_dir, Some(PathBuf::from("/tmp/a")));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_reconcile_arguments() {
        let args = CliArgs::parse_from(["scrivano", "reconcile", "--archive-dir", "/tmp/b"]);

        match args.command {
            Command::Reconcile(reconcile) => {
                assert_eq!(
                    reconcile.overrides.archive_dir,
                    Some(PathBuf::from("/tmp/b"))
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
