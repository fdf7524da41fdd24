//! Settings for the diagram-cache binary.
//!
//! Sources, lowest precedence first: `config/default.toml`, `diagrams.toml`,
//! `--config-file`, `DIAGRAMS__SECTION__KEY` environment variables, CLI flags.

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    application::options::overrides_from_map,
    cache::{DEFAULT_CACHE_DIRECTORY, DEFAULT_MEMORY_BUDGET_BYTES},
    domain::{
        options::{DiagramOptions, OptionOverrides},
        themes::theme_id,
    },
};

pub use cli::{
    CliArgs, Command, GlobalOverrides, KeyArgs, RenderArgs, SourceArgs, options_map,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "diagrams";
const ENV_PREFIX: &str = "DIAGRAMS";
pub(crate) const DEFAULT_D2_CLI_PATH: &str = "d2";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub cache: CacheSettings,
    /// Site-wide option layer from `[diagrams.d2]`.
    pub diagrams: OptionOverrides,
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
pub struct RenderSettings {
    pub d2_cli_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub memory_budget_bytes: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration sources could not be merged: {0}")]
    Build(#[from] config::ConfigError),
    #[error("`{key}` is invalid: {reason}")]
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let files = [DEFAULT_CONFIG_BASENAME, LOCAL_CONFIG_BASENAME]
        .into_iter()
        .map(|basename| File::with_name(basename).required(false));
    let explicit = cli
        .config_file
        .as_deref()
        .map(|path| File::from(path).required(true));

    let mut raw: RawSettings = Config::builder()
        .add_source(files.chain(explicit).collect::<Vec<_>>())
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Parse `std::env::args` and load the settings they point at.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    load(&cli).map(|settings| (cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    cache: RawCacheSettings,
    diagrams: RawDiagramsSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.d2_cli_path.as_ref() {
            self.render.d2_cli_path = Some(path.clone());
        }
        if let Some(directory) = overrides.cache_directory.as_ref() {
            self.cache.directory = Some(directory.clone());
        }
        if let Some(budget) = overrides.cache_memory_budget_bytes {
            self.cache.memory_budget_bytes = Some(budget);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            cache,
            diagrams,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            cache: build_cache_settings(cache)?,
            diagrams: build_diagram_settings(diagrams)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .as_deref()
        .map(LevelFilter::from_str)
        .transpose()
        .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?
        .unwrap_or(LevelFilter::INFO);
    let format = match logging.json {
        Some(true) => LogFormat::Json,
        _ => LogFormat::Compact,
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let d2_cli_path = render
        .d2_cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_D2_CLI_PATH));
    if d2_cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.d2_cli_path",
            "path must not be empty",
        ));
    }

    Ok(RenderSettings { d2_cli_path })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let directory = cache
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.directory",
            "path must not be empty",
        ));
    }

    let budget = match cache.memory_budget_bytes {
        Some(value) => usize::try_from(value).map_err(|_| {
            LoadError::invalid("cache.memory_budget_bytes", "does not fit in usize")
        })?,
        None => DEFAULT_MEMORY_BUDGET_BYTES,
    };
    let memory_budget_bytes = NonZeroUsize::new(budget).ok_or_else(|| {
        LoadError::invalid("cache.memory_budget_bytes", "must be greater than zero")
    })?;

    Ok(CacheSettings {
        directory,
        memory_budget_bytes,
    })
}

/// Decode `[diagrams.d2]` with the call-site key rules and reject a layer
/// that would fail every call.
fn build_diagram_settings(diagrams: RawDiagramsSettings) -> Result<OptionOverrides, LoadError> {
    let site = overrides_from_map(&diagrams.d2)
        .map_err(|err| LoadError::invalid("diagrams.d2", err.to_string()))?;
    let mut merged = DiagramOptions::default();
    merged.apply(&site);
    merged
        .validate()
        .map_err(|err| LoadError::invalid("diagrams.d2", err.to_string()))?;
    for theme in [&merged.light_theme, &merged.dark_theme] {
        theme_id(theme).map_err(|err| LoadError::invalid("diagrams.d2", err.to_string()))?;
    }
    Ok(site)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    d2_cli_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    directory: Option<PathBuf>,
    memory_budget_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiagramsSettings {
    d2: Map<String, Value>,
}
