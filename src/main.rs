//! crm-export
//!
//! Streams CRM leads and opportunities from an Odoo-style server into a
//! single CSV file.
//!
//! # Usage
//!
//! ```bash
//! crm-export leads.csv --url https://crm.example.com --database prod -u exporter -p secret
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Level, warn};

use crm_export::cli::CliInterface;
use crm_export::connection::{Connector, JsonRpcTransport};
use crm_export::error::Result;
use crm_export::export::{CsvWriter, ExportCoordinator, ExportSummary};
use crm_export::utils::{convert::format_size, time::format_duration};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    run_export(&cli).await
}

/// Authenticate, count, then stream every batch into the output file
async fn run_export(cli: &CliInterface) -> Result<()> {
    let config = cli.config();
    config.validate()?;

    let output = cli.output_path();
    cli.print_banner(&output);

    let transport = JsonRpcTransport::new(&config.connection)?;
    let connector = Connector::new(transport, config.connection.clone());

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    let mut coordinator =
        ExportCoordinator::new(connector, config.export.clone()).with_cancellation(token);

    // The file is created only once the login and count succeeded
    coordinator.prepare().await?;

    let path = output.to_string_lossy();
    let mut sink = CsvWriter::open(&path, config.export.line_ending).await?;
    let summary = coordinator.export(&mut sink).await?;

    if !cli.args().quiet {
        print_summary(&path, &summary);
    }
    Ok(())
}

/// Cancel the export on Ctrl+C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nInterrupt received, stopping after the current step...");
                token.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl+C: {}", e),
        }
    });
}

fn print_summary(path: &str, summary: &ExportSummary) {
    println!("Export complete");
    println!("  File:    {}", path);
    println!("  Rows:    {}", summary.rows);
    println!("  Size:    {}", format_size(summary.file_size_bytes));
    println!(
        "  Elapsed: {}",
        format_duration(Duration::from_millis(summary.elapsed_ms))
    );
}

/// Initialize logging based on verbosity settings
///
/// # Arguments
/// * `cli` - CLI interface with logging configuration
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    // Build subscriber with level filter
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
