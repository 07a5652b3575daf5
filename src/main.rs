use clap::Parser;
use std::path::Path;

use evm_wallet_exporter::aggregator::Aggregator;
use evm_wallet_exporter::config::AppConfig;
use evm_wallet_exporter::logging::{init_logging, LogContext};
use evm_wallet_exporter::output::{run_stamp, CsvWriter, SqliteWriter};

/// Export wallet transactions from EVM chains to CSV and SQLite
#[derive(Parser, Debug)]
#[command(name = "exporter", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<String>,

    /// Restrict the run to these chain ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    chains: Option<Vec<String>>,

    /// Stop after collecting this many transactions
    #[arg(long)]
    max_transactions: Option<u64>,

    /// How many blocks behind the chain tip to scan
    #[arg(long)]
    lookback_blocks: Option<u64>,

    /// Explicit scan range start block
    #[arg(long)]
    start_block: Option<u64>,

    /// Explicit scan range end block
    #[arg(long)]
    end_block: Option<u64>,

    /// Directory for the run-stamped output files
    #[arg(long)]
    output_dir: Option<String>,

    /// Skip the CSV sink
    #[arg(long)]
    no_csv: bool,

    /// Skip the SQLite sink
    #[arg(long)]
    no_sqlite: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        std::env::set_var("CONFIG_FILE", path);
    }

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = apply_cli_overrides(&mut config, &cli) {
        eprintln!("Invalid command line arguments: {}", e);
        std::process::exit(1);
    }

    init_logging(&config.logging);

    let context = LogContext::new("main", "run");
    context.info("Starting EVM wallet transaction exporter");

    let report = Aggregator::new(config.clone()).collect().await;

    let stamp = run_stamp();
    let output_dir = Path::new(&config.output.directory);
    let mut sinks_attempted = 0u32;
    let mut sinks_succeeded = 0u32;

    if config.output.csv_enabled {
        sinks_attempted += 1;
        let writer = CsvWriter::new(output_dir.join(format!("transactions_{}.csv", stamp)));
        match writer.write(&report.records) {
            Ok(()) => sinks_succeeded += 1,
            Err(e) => {
                LogContext::new("main", "write_csv").error(&format!("CSV sink failed: {}", e));
            }
        }
    }

    if config.output.sqlite_enabled {
        sinks_attempted += 1;
        let writer = SqliteWriter::new(output_dir.join(format!("transactions_{}.db", stamp)));
        match writer.write(&report.records) {
            Ok(()) => sinks_succeeded += 1,
            Err(e) => {
                LogContext::new("main", "write_sqlite")
                    .error(&format!("SQLite sink failed: {}", e));
            }
        }
    }

    if sinks_attempted == 0 {
        context.warn("All output sinks disabled, nothing was written");
    } else if sinks_succeeded == 0 {
        // Partial chain failures are tolerated; losing every sink is not
        context.error("All output sinks failed");
        std::process::exit(1);
    }

    context.info(&format!(
        "Run complete: {} records, {}/{} sinks written",
        report.records.len(),
        sinks_succeeded,
        sinks_attempted
    ));
}

fn apply_cli_overrides(
    config: &mut AppConfig,
    cli: &Cli,
) -> Result<(), evm_wallet_exporter::error::ConfigError> {
    if let Some(chains) = &cli.chains {
        config.select_chains(chains)?;
    }
    if let Some(max_transactions) = cli.max_transactions {
        config.fetch.max_transactions = Some(max_transactions);
    }
    if let Some(lookback_blocks) = cli.lookback_blocks {
        config.fetch.lookback_blocks = lookback_blocks;
    }
    if let Some(start_block) = cli.start_block {
        config.fetch.start_block = Some(start_block);
    }
    if let Some(end_block) = cli.end_block {
        config.fetch.end_block = Some(end_block);
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output.directory = output_dir.clone();
    }
    if cli.no_csv {
        config.output.csv_enabled = false;
    }
    if cli.no_sqlite {
        config.output.sqlite_enabled = false;
    }
    config.validate()
}
