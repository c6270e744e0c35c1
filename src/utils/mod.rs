//! Utility functions and helpers for crm-export
//!
//! This module provides small helpers used by the CLI:
//! - Time and duration formatting
//! - Output path helpers
//! - Human-readable sizes

use std::path::PathBuf;
use std::time::Duration;

/// Time and duration utilities
pub mod time {
    use super::*;

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1h 30m 45s")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if secs == 0 {
            return format!("{}ms", millis);
        }

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        let mut parts = Vec::new();

        if hours > 0 {
            parts.push(format!("{}h", hours));
        }
        if minutes > 0 {
            parts.push(format!("{}m", minutes));
        }
        if seconds > 0 || parts.is_empty() {
            parts.push(format!("{}s", seconds));
        }

        parts.join(" ")
    }
}

/// File system helpers
pub mod fs {
    use super::*;
    use chrono::{DateTime, Local};

    /// Prefix of generated output file names
    pub const OUTPUT_PREFIX: &str = "crm_export_api";

    /// Expand home directory in path
    ///
    /// # Arguments
    /// * `path` - Path potentially starting with ~
    ///
    /// # Returns
    /// * `PathBuf` - Expanded path
    pub fn expand_home(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    /// Output file name derived from a timestamp
    pub fn output_name_at(at: DateTime<Local>) -> String {
        format!("{}_{}.csv", OUTPUT_PREFIX, at.format("%Y%m%d_%H%M%S"))
    }

    /// Default output path in the working directory, stamped with local time
    pub fn default_output_path() -> PathBuf {
        PathBuf::from(output_name_at(Local::now()))
    }
}

/// Conversion utilities
pub mod convert {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    /// Format an output size for the final summary
    ///
    /// Up to 1 MiB the size is shown in KB with one decimal, above it in MB
    /// with two.
    ///
    /// # Arguments
    /// * `bytes` - Number of bytes
    ///
    /// # Returns
    /// * `String` - Formatted size (e.g., "12.4 KB", "3.50 MB")
    pub fn format_size(bytes: u64) -> String {
        let size = bytes as f64;
        if size <= MIB {
            format!("{:.1} KB", size / KIB)
        } else {
            format!("{:.2} MB", size / MIB)
        }
    }
}
