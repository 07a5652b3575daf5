use thiserror::Error;

/// Main error type for the EVM wallet transaction exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// RPC-related errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i32, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Rate limit exceeded, retry after {seconds} seconds")]
    RateLimit { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Record normalization errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Malformed transaction record: missing field '{field}' in tx {hash}")]
    MalformedRecord { field: String, hash: String },

    #[error("Amount parsing failed: {0}")]
    AmountParsing(String),

    #[error("Block parsing failed: {0}")]
    BlockParsing(String),
}

/// CSV/file output errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

/// SQLite storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that abort the run
    Critical,
    /// High priority errors that lose a whole chain or sink
    High,
    /// Medium priority errors that lose individual blocks
    Medium,
    /// Low priority errors that lose individual records
    Low,
}

impl ExporterError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExporterError::Config(_) => ErrorSeverity::Critical,

            ExporterError::Rpc(RpcError::Connection(_)) => ErrorSeverity::High,
            ExporterError::Output(_) => ErrorSeverity::High,
            ExporterError::Storage(_) => ErrorSeverity::High,

            ExporterError::Rpc(_) => ErrorSeverity::Medium,

            ExporterError::Processing(_) => ErrorSeverity::Low,
        }
    }

    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExporterError::Rpc(RpcError::Timeout { .. })
                | ExporterError::Rpc(RpcError::RateLimit { .. })
                | ExporterError::Rpc(RpcError::Connection(_))
        )
    }

    /// Get suggested retry delay in seconds for recoverable errors
    pub fn retry_delay(&self) -> Option<u64> {
        if !self.is_recoverable() {
            return None;
        }

        match self {
            ExporterError::Rpc(RpcError::RateLimit { seconds }) => Some(*seconds),
            ExporterError::Rpc(RpcError::Timeout { .. }) => Some(5),
            ExporterError::Rpc(RpcError::Connection(_)) => Some(10),
            _ => Some(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let critical_error = ExporterError::Config(ConfigError::MissingEnvVar("TEST".to_string()));
        assert_eq!(critical_error.severity(), ErrorSeverity::Critical);

        let high_error = ExporterError::Rpc(RpcError::Connection("refused".to_string()));
        assert_eq!(high_error.severity(), ErrorSeverity::High);

        let medium_error = ExporterError::Rpc(RpcError::Timeout { seconds: 30 });
        assert_eq!(medium_error.severity(), ErrorSeverity::Medium);

        let low_error = ExporterError::Processing(ProcessingError::MalformedRecord {
            field: "value".to_string(),
            hash: "0xabc".to_string(),
        });
        assert_eq!(low_error.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_error_recoverability() {
        let recoverable = ExporterError::Rpc(RpcError::Timeout { seconds: 30 });
        assert!(recoverable.is_recoverable());

        let non_recoverable = ExporterError::Config(ConfigError::MissingEnvVar("TEST".to_string()));
        assert!(!non_recoverable.is_recoverable());

        let malformed = ExporterError::Processing(ProcessingError::MalformedRecord {
            field: "value".to_string(),
            hash: "0xabc".to_string(),
        });
        assert!(!malformed.is_recoverable());
    }

    #[test]
    fn test_retry_delay() {
        let timeout_error = ExporterError::Rpc(RpcError::Timeout { seconds: 30 });
        assert_eq!(timeout_error.retry_delay(), Some(5));

        let rate_limit_error = ExporterError::Rpc(RpcError::RateLimit { seconds: 60 });
        assert_eq!(rate_limit_error.retry_delay(), Some(60));

        let non_recoverable = ExporterError::Config(ConfigError::MissingEnvVar("TEST".to_string()));
        assert_eq!(non_recoverable.retry_delay(), None);
    }

    #[test]
    fn test_error_display() {
        let error = ExporterError::Rpc(RpcError::Method {
            code: -32601,
            message: "Method not found".to_string(),
        });
        assert_eq!(
            format!("{}", error),
            "RPC error: RPC method error: code=-32601, message=Method not found"
        );

        let error = ExporterError::Processing(ProcessingError::MalformedRecord {
            field: "value".to_string(),
            hash: "0xdeadbeef".to_string(),
        });
        assert!(format!("{}", error).contains("missing field 'value'"));
    }

    #[test]
    fn test_error_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let output_error = OutputError::Io(io_error);
        let exporter_error = ExporterError::Output(output_error);

        assert!(format!("{}", exporter_error).contains("File system error"));
    }
}
