use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;

/// Structured logging context for the exporter
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_chain(self, chain: &str) -> Self {
        self.with_metadata("chain", json!(chain))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &crate::error::ExporterError, context: Option<LogContext>) {
        let severity = error.severity();
        let is_recoverable = error.is_recoverable();

        let mut log_context = context.unwrap_or_else(|| LogContext::new("error", "unknown"));
        log_context = log_context
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(is_recoverable));

        if let Some(delay) = error.retry_delay() {
            log_context = log_context.with_metadata("retry_delay_seconds", json!(delay));
        }

        let message = format!("Error occurred: {}", error);

        match severity {
            crate::error::ErrorSeverity::Critical => log_context.error(&message),
            crate::error::ErrorSeverity::High => log_context.error(&message),
            crate::error::ErrorSeverity::Medium => log_context.warn(&message),
            crate::error::ErrorSeverity::Low => log_context.info(&message),
        }
    }
}

/// Initialize structured logging for the application
pub fn init_logging(config: &LoggingConfig) {
    let pretty = config.format == "pretty";

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.level.clone()),
    )
    .format(move |buf, record| {
        use std::io::Write;

        let raw = record.args().to_string();
        if pretty {
            // Structured messages carry their own context; render them flat
            if let Ok(json_value) = serde_json::from_str::<Value>(&raw) {
                let message = json_value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(&raw);
                let component = json_value
                    .get("component")
                    .and_then(Value::as_str)
                    .unwrap_or(record.target());
                return writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    component,
                    message
                );
            }
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(buf, "{}", raw)
        }
    })
    .try_init()
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_creation() {
        let context = LogContext::new("aggregator", "collect");
        assert_eq!(context.component, "aggregator");
        assert_eq!(context.operation, "collect");
        assert!(context.metadata.is_empty());
    }

    #[test]
    fn test_log_context_with_metadata() {
        let context = LogContext::new("scanner", "fetch")
            .with_chain("ethereum")
            .with_address("0xabc123")
            .with_block_number(12345);

        assert_eq!(context.metadata.get("chain"), Some(&json!("ethereum")));
        assert_eq!(context.metadata.get("address"), Some(&json!("0xabc123")));
        assert_eq!(context.metadata.get("block_number"), Some(&json!(12345)));
    }

    #[test]
    fn test_log_context_format_message() {
        let context = LogContext::new("test", "test").with_metadata("key", json!("value"));

        let message = context.format_message("INFO", "test message");

        let parsed: Value = serde_json::from_str(&message).expect("Should be valid JSON");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["component"], "test");
        assert_eq!(parsed["operation"], "test");
        assert_eq!(parsed["message"], "test message");
        assert_eq!(parsed["key"], "value");
    }

    #[test]
    fn test_error_logging() {
        let error = crate::error::ExporterError::Config(crate::error::ConfigError::MissingEnvVar(
            "TEST_VAR".to_string(),
        ));

        let context = LogContext::new("test", "error_test");

        // This should not panic
        ErrorLogger::log_error(&error, Some(context));
    }
}
