//! Configuration management for the SSML language server.
//!
//! Handles:
//! - Command-line argument parsing
//! - Project configuration (`.ssml.toml`)
//! - Schema directory configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

/// File name of the per-project configuration
pub const PROJECT_CONFIG_FILE: &str = ".ssml.toml";

/// Command-line arguments for the SSML language server
#[derive(Debug, Parser)]
#[command(name = "ssml-ls")]
#[command(about = "Language server validating SSML against speech engine schemas")]
#[command(version)]
pub struct Args {
    /// Explicitly specify the schema to validate against
    #[arg(long, help = "Schema to use (e.g., 'polly')")]
    pub schema: Option<String>,

    /// Custom directory to search for schema files
    #[arg(long, help = "Directory containing *.ssml-schema.toml files")]
    pub schema_dir: Option<PathBuf>,

    /// Log level for the language server
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Contents of `.ssml.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Schema to use for documents in this project
    pub schema: Option<String>,
    /// Extra schema directories, relative to the project root
    #[serde(default)]
    pub schema_dirs: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Load the project configuration from a directory, if present
    pub fn load(project_root: &Path) -> Result<Option<(Self, PathBuf)>> {
        let path = project_root.join(PROJECT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid project config {:?}", path))?;
        Ok(Some((config, path)))
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Schema name explicitly set via command line
    pub cli_schema: Option<String>,
    /// Schema name from the project configuration
    pub project_schema: Option<String>,
    /// Where the project configuration was found
    pub project_config_path: Option<PathBuf>,
    /// Schema directories, lowest priority first
    pub schema_dirs: Vec<PathBuf>,
    /// Log level
    pub log_level: String,
}

impl Config {
    /// Create configuration from command-line arguments and the working directory
    pub fn from_args_and_env() -> Result<Self> {
        let project_root = std::env::current_dir().context("Failed to read working directory")?;
        Self::from_args(Args::parse(), &project_root)
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args, project_root: &Path) -> Result<Self> {
        let project = ProjectConfig::load(project_root)?;

        // Later directories override schemas of the same name
        let mut schema_dirs = Vec::new();

        // User-global directory
        if let Some(config_dir) = dirs::config_dir() {
            schema_dirs.push(config_dir.join("ssml-ls").join("schemas"));
        }

        // Project directories
        if let Some((project_config, _)) = &project {
            schema_dirs.extend(
                project_config
                    .schema_dirs
                    .iter()
                    .map(|dir| project_root.join(dir)),
            );
        }

        // Workspace directory
        schema_dirs.push(project_root.join(".ssml-ls").join("schemas"));

        // User-specified directory
        if let Some(custom_dir) = args.schema_dir {
            schema_dirs.push(custom_dir);
        }

        let (project_schema, project_config_path) = match project {
            Some((project_config, path)) => (project_config.schema, Some(path)),
            None => (None, None),
        };

        Ok(Config {
            cli_schema: args.schema,
            project_schema,
            project_config_path,
            schema_dirs,
            log_level: args.log_level,
        })
    }

    pub fn has_project_config(&self) -> bool {
        self.project_config_path.is_some()
    }

    /// Effective schema name. Priority: CLI > project config
    pub fn get_effective_schema(&self) -> Option<String> {
        self.cli_schema
            .clone()
            .or_else(|| self.project_schema.clone())
    }
}
