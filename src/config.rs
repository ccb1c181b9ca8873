//! Configuration management for the toolpath parser.
//!
//! Handles:
//! - Command-line argument parsing
//! - Parser options from TOML files (user, project, explicit)
//!
//! Later sources override earlier ones: defaults, user config, project
//! config, `--config` file, command line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::path::Position;
use crate::interp::arc::DEFAULT_ENDPOINT_TOLERANCE;
use crate::parser::DEFAULT_LAYER_MARKER;

/// Project-level config file, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = ".gcode-toolpath.toml";

pub const DEFAULT_WARN_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Command-line arguments shared by the CLI and the language server
#[derive(Debug, Default, Parser)]
#[command(name = "gcode-toolpath")]
#[command(about = "Parse G-code into toolpath segments, layers and diagnostics")]
#[command(version)]
pub struct Args {
    /// G-code file to parse; reads stdin when omitted
    pub input: Option<PathBuf>,

    /// Explicit configuration file
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Coordinate magnitude (mm) above which a warning is emitted")]
    pub warn_threshold: Option<f64>,

    #[arg(long, help = "Comment prefix that opens a layer (e.g. ';LAYER:')")]
    pub layer_marker: Option<String>,

    #[arg(
        long,
        value_delimiter = ',',
        num_args = 3,
        help = "G28 home position in mm as X,Y,Z"
    )]
    pub home: Option<Vec<f64>>,

    #[arg(long, help = "Lines per batch when parsing")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Include program structure analysis in the output")]
    pub structure: bool,

    #[arg(long, help = "Pretty-print JSON output")]
    pub pretty: bool,

    /// Log level
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Options consumed by the interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Coordinates and arc offsets beyond this magnitude (mm) produce warnings
    pub coordinate_warning_threshold: f64,
    /// Comment prefix that opens a layer, matched case-insensitively
    pub layer_marker: String,
    /// Target of G28, in mm
    pub home_position: [f64; 3],
    /// Max difference (mm) between an offset arc's end radius and start radius
    pub arc_endpoint_tolerance: f64,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            coordinate_warning_threshold: DEFAULT_WARN_THRESHOLD,
            layer_marker: DEFAULT_LAYER_MARKER.to_string(),
            home_position: [0.0; 3],
            arc_endpoint_tolerance: DEFAULT_ENDPOINT_TOLERANCE,
        }
    }
}

impl ParserOptions {
    pub fn home(&self) -> Position {
        let [x, y, z] = self.home_position;
        Position::new(x, y, z)
    }
}

/// `[parser]` table of a config file; every key optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserOverrides {
    pub coordinate_warning_threshold: Option<f64>,
    pub layer_marker: Option<String>,
    pub home_position: Option<[f64; 3]>,
    pub arc_endpoint_tolerance: Option<f64>,
}

impl ParserOverrides {
    pub fn apply_to(&self, options: &mut ParserOptions) {
        if let Some(threshold) = self.coordinate_warning_threshold {
            options.coordinate_warning_threshold = threshold;
        }
        if let Some(marker) = &self.layer_marker {
            options.layer_marker = marker.clone();
        }
        if let Some(home) = self.home_position {
            options.home_position = home;
        }
        if let Some(tolerance) = self.arc_endpoint_tolerance {
            options.arc_endpoint_tolerance = tolerance;
        }
    }
}

/// `[cli]` table of a config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliOverrides {
    pub batch_size: Option<usize>,
}

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub parser: ParserOverrides,
    pub cli: CliOverrides,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content, Some(path))
    }

    pub fn parse(content: &str, source_path: Option<&Path>) -> Result<Self> {
        toml::from_str(content).with_context(|| match source_path {
            Some(path) => format!("Failed to parse config TOML: {}", path.display()),
            None => "Failed to parse config TOML".to_string(),
        })
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub parser: ParserOptions,
    pub batch_size: usize,
    pub structure: bool,
    pub pretty: bool,
    pub log_level: String,
    /// Config files that were found and applied, lowest priority first
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments, looking for config
    /// files in the usual places
    pub fn from_args(args: Args) -> Result<Self> {
        let user_config =
            dirs::config_dir().map(|dir| dir.join("gcode-toolpath").join("config.toml"));
        let project_dir = std::env::current_dir().context("Failed to read working directory")?;
        Self::from_args_in(args, user_config.as_deref(), &project_dir)
    }

    /// Create configuration with explicit lookup locations (useful for testing)
    pub fn from_args_in(
        args: Args,
        user_config: Option<&Path>,
        project_dir: &Path,
    ) -> Result<Self> {
        let mut parser = ParserOptions::default();
        let mut batch_size = DEFAULT_BATCH_SIZE;
        let mut sources = Vec::new();

        let project_config = project_dir.join(PROJECT_CONFIG_FILE);
        let discovered = user_config
            .into_iter()
            .chain(std::iter::once(project_config.as_path()))
            .filter(|path| path.is_file());

        for path in discovered {
            let file = ConfigFile::load(path)?;
            file.parser.apply_to(&mut parser);
            batch_size = file.cli.batch_size.unwrap_or(batch_size);
            log::debug!("Loaded config from {}", path.display());
            sources.push(path.to_path_buf());
        }

        // An explicit file must exist
        if let Some(path) = &args.config {
            let file = ConfigFile::load(path)?;
            file.parser.apply_to(&mut parser);
            batch_size = file.cli.batch_size.unwrap_or(batch_size);
            sources.push(path.clone());
        }

        let home_position = match args.home.as_deref() {
            None => None,
            Some(&[x, y, z]) => Some([x, y, z]),
            Some(other) => bail!("--home takes exactly three values, got {}", other.len()),
        };
        ParserOverrides {
            coordinate_warning_threshold: args.warn_threshold,
            layer_marker: args.layer_marker,
            home_position,
            arc_endpoint_tolerance: None,
        }
        .apply_to(&mut parser);

        if let Some(size) = args.batch_size {
            batch_size = size;
        }
        if batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if parser.layer_marker.trim().is_empty() {
            bail!("Layer marker must not be empty");
        }

        Ok(Config {
            input: args.input,
            parser,
            batch_size,
            structure: args.structure,
            pretty: args.pretty,
            log_level: args.log_level,
            sources,
        })
    }
}
