//! Shell completion generation for crm-export
//!
//! This module generates completion scripts for bash, zsh, fish and
//! PowerShell from the clap command definition.

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io::{self, Write};

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result};

/// Binary name used in generated scripts
const BIN_NAME: &str = "crm-export";

/// Generate shell completion script on stdout
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish, powershell)
///
/// # Returns
/// * `Result<()>` - Success or error
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let stdout = io::stdout();
    write_completion(shell_name, &mut stdout.lock())
}

/// Write the completion script for `shell_name` into `out`
pub fn write_completion(shell_name: &str, out: &mut dyn Write) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    let mut cmd = CliArgs::command();
    generate(shell, &mut cmd, BIN_NAME, out);
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" | "pwsh" => Ok(Shell::PowerShell),
        _ => Err(ConfigError::InvalidValue {
            field: "shell".to_string(),
            value: format!("{shell_name} (supported: bash, zsh, fish, powershell)"),
        }
        .into()),
    }
}
