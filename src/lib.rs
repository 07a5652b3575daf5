pub mod aggregator;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod retry;

pub use aggregator::{AggregateReport, Aggregator};
pub use blockchain::{ChainScanner, RpcClient};
pub use config::{AppConfig, ChainConfig, FetchConfig, LoggingConfig, OutputConfig, WalletConfig};
pub use error::{ExporterError, Result};
pub use logging::LogContext;
pub use models::{Direction, RawTransaction, TransactionRecord};
pub use output::{CsvWriter, SqliteWriter};
pub use retry::{RetryConfig, RetryManager};
