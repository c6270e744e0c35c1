//! Command-line interface for crm-export
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Subcommands (version, completion, config)
//! - Output path selection

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, LineEnding, LogLevel};
use crate::error::Result;
use crate::utils::fs::{default_output_path, expand_home};

pub mod completion;

/// Streaming CRM lead and opportunity exporter
#[derive(Parser, Debug)]
#[command(
    name = "crm-export",
    version,
    about = "Export CRM leads and opportunities to CSV",
    long_about = "Streams every lead and opportunity from an Odoo-style CRM over its RPC API
into a single spreadsheet-friendly CSV file, resolving partners, stages, users
and tags in bulk one batch at a time."
)]
pub struct CliArgs {
    /// Output file path
    ///
    /// Defaults to crm_export_api_<YYYYmmdd_HHMMSS>.csv in the working directory
    #[arg(value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Server URL (e.g. https://crm.example.com)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Database name
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Login name
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password or API key
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Records fetched per round-trip
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// Also export archived records
    #[arg(long)]
    pub include_archived: bool,

    /// Terminate rows with LF instead of CRLF
    #[arg(long)]
    pub lf: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Quiet mode: no progress bar, errors only
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose output (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show or validate configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface manager
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration (file values with CLI overrides applied)
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    ///
    /// # Returns
    /// * `Result<Self>` - Initialized CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build the interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        Ok(Self { args, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Destination file, explicit or timestamp-derived
    pub fn output_path(&self) -> PathBuf {
        match &self.args.output {
            Some(path) => expand_home(path),
            None => default_output_path(),
        }
    }

    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_connection_args(config, args);
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);
    }

    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        let conn = &mut config.connection;
        if let Some(url) = &args.url {
            conn.url = url.clone();
        }
        if let Some(database) = &args.database {
            conn.database = database.clone();
        }
        if let Some(username) = &args.username {
            conn.username = username.clone();
        }
        if let Some(password) = &args.password {
            conn.password = password.clone();
        }
        if let Some(timeout) = args.timeout {
            conn.timeout = timeout;
        }
    }

    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Some(batch_size) = args.batch_size {
            config.export.batch_size = batch_size;
        }
        if args.include_archived {
            config.export.include_archived = true;
        }
        if args.lf {
            config.export.line_ending = LineEnding::Lf;
        }
        if args.quiet {
            config.export.progress = false;
        }
    }

    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if a subcommand was handled (should exit)
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn show_version(&self) {
        println!("crm-export version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config()?;
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    fn validate_config(&self) -> Result<()> {
        println!(
            "Validating configuration: {}",
            self.get_config_path().display()
        );

        match self.config.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                Ok(())
            }
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                Err(e)
            }
        }
    }

    fn show_config(&self) -> Result<()> {
        println!("Configuration file: {}", self.get_config_path().display());
        println!();
        println!("=== Effective Configuration ===");
        println!();
        println!("{}", self.config.to_masked_toml()?);
        Ok(())
    }

    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }

    /// Print the target before exporting
    pub fn print_banner(&self, output: &std::path::Path) {
        if !self.args.quiet {
            println!(
                "Exporting from: {} (database '{}')",
                self.config.connection.url, self.config.connection.database
            );
            println!("Output file: {}", output.display());
        }
    }
}
