use serde_json::json;

use crate::blockchain::ChainScanner;
use crate::config::AppConfig;
use crate::logging::{ErrorLogger, LogContext};
use crate::models::{is_valid_address, normalize_transaction, TransactionRecord};

/// Outcome of one collection run
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Records in chain order, then address order, then scan order
    pub records: Vec<TransactionRecord>,
    pub chains_succeeded: u32,
    pub chains_failed: u32,
    pub records_skipped: u32,
}

/// Drives the fetch pipeline: chains × addresses → scanner → normalizer.
///
/// Failures are contained at the smallest scope that makes sense: a failed
/// chain loses that chain, a malformed transaction loses that record, and
/// neither aborts the run.
pub struct Aggregator {
    config: AppConfig,
}

impl Aggregator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn collect(&self) -> AggregateReport {
        let mut report = AggregateReport::default();
        let limit = self.config.fetch.max_transactions.map(|n| n as usize);

        if self.config.wallets.addresses.is_empty() {
            LogContext::new("aggregator", "collect")
                .info("No wallet addresses configured, nothing to fetch");
            return report;
        }

        for chain in &self.config.chains {
            if limit.is_some_and(|limit| report.records.len() >= limit) {
                LogContext::new("aggregator", "collect")
                    .with_metadata("max_transactions", json!(limit))
                    .info("Reached maximum transaction limit");
                break;
            }

            let context = LogContext::new("aggregator", "collect").with_chain(&chain.id);
            context.info(&format!("Fetching transactions from {}", chain.name));

            let scanner = match ChainScanner::new(chain, &self.config.fetch) {
                Ok(scanner) => scanner,
                Err(e) => {
                    ErrorLogger::log_error(
                        &e,
                        Some(LogContext::new("aggregator", "connect").with_chain(&chain.id)),
                    );
                    report.chains_failed += 1;
                    continue;
                }
            };

            scanner.verify_chain_id().await;

            let mut chain_failed = false;

            for address in &self.config.wallets.addresses {
                if limit.is_some_and(|limit| report.records.len() >= limit) {
                    break;
                }

                if !is_valid_address(address) {
                    LogContext::new("aggregator", "collect")
                        .with_chain(&chain.id)
                        .with_address(address)
                        .warn("Invalid address format, skipping");
                    continue;
                }

                let remaining = limit.map(|limit| limit - report.records.len());

                let raw_transactions = match scanner
                    .fetch_address_transactions(address, remaining)
                    .await
                {
                    Ok(raws) => raws,
                    Err(e) => {
                        ErrorLogger::log_error(
                            &e,
                            Some(
                                LogContext::new("aggregator", "fetch")
                                    .with_chain(&chain.id)
                                    .with_address(address),
                            ),
                        );
                        chain_failed = true;
                        continue;
                    }
                };

                for (raw, block_timestamp) in &raw_transactions {
                    match normalize_transaction(raw, &chain.id, address, *block_timestamp) {
                        Ok(record) => report.records.push(record),
                        Err(e) => {
                            LogContext::new("aggregator", "normalize")
                                .with_chain(&chain.id)
                                .with_address(address)
                                .warn(&format!("Skipping record: {}", e));
                            report.records_skipped += 1;
                        }
                    }
                }
            }

            if chain_failed {
                report.chains_failed += 1;
            } else {
                report.chains_succeeded += 1;
            }
        }

        LogContext::new("aggregator", "collect")
            .with_metadata("records", json!(report.records.len()))
            .with_metadata("records_skipped", json!(report.records_skipped))
            .with_metadata("chains_succeeded", json!(report.chains_succeeded))
            .with_metadata("chains_failed", json!(report.chains_failed))
            .info(&format!(
                "Collected {} records ({} skipped, {}/{} chains ok)",
                report.records.len(),
                report.records_skipped,
                report.chains_succeeded,
                report.chains_succeeded + report.chains_failed
            ));

        report
    }
}
