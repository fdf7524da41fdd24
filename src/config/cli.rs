use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use serde_json::{Map, Value};

/// Command-line arguments for the diagram-cache binary.
#[derive(Debug, Parser)]
#[command(
    name = "diagram-cache",
    version,
    about = "Render D2 diagrams through a persistent, content-addressed cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "DIAGRAMS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render diagram files and print their SVG.
    Render(RenderArgs),
    /// Print the cache key a diagram file would be stored under.
    Key(KeyArgs),
    /// Print the light and dark theme catalogs as JSON.
    Themes,
}

/// Settings overrides accepted before the subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Path to the d2 executable.
    #[arg(long = "d2-cli-path", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub d2_cli_path: Option<PathBuf>,

    /// Root directory of the persistent cache tier.
    #[arg(long = "cache-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub cache_directory: Option<PathBuf>,

    #[arg(long = "cache-memory-budget-bytes", value_name = "BYTES")]
    pub cache_memory_budget_bytes: Option<u64>,
}

/// Where diagram files are looked up.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Directory of the page embedding the diagram; searched first.
    #[arg(long = "page-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub page_dir: Option<PathBuf>,

    /// Shared assets directory; searched when the page directory has no match.
    #[arg(
        long = "assets-dir",
        value_name = "DIR",
        default_value = "assets",
        value_hint = ValueHint::DirPath
    )]
    pub assets_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Diagram files, resolved against the page and assets directories.
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Call-site option as KEY=VALUE; VALUE is parsed as JSON when possible.
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, Value)>,

    /// Print the body without the outer `<svg>` element.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub inner: bool,

    /// Maximum number of diagrams rendered at once.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(usize))]
    pub concurrency: usize,
}

#[derive(Debug, Args, Clone)]
pub struct KeyArgs {
    #[arg(value_name = "FILE")]
    pub file: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Call-site option as KEY=VALUE; VALUE is parsed as JSON when possible.
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, Value)>,
}

fn parse_option(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect repeated `--option` flags into a call-site map; later flags win.
pub fn options_map(options: &[(String, Value)]) -> Map<String, Value> {
    options.iter().cloned().collect()
}
