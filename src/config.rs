use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chains: Vec<ChainConfig>,
    pub wallets: WalletConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Configuration for a single EVM chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Short identifier used in output rows and CLI selection
    pub id: String,
    /// Human-readable chain name
    pub name: String,
    /// JSON-RPC endpoint URL; may contain an `{api_key}` placeholder
    pub rpc_url: String,
    /// Expected chain id, checked against eth_chainId at connect time
    pub chain_id: u64,
    /// API key substituted into the endpoint URL placeholder
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Tracked wallet addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub addresses: Vec<String>,
}

/// Transaction fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// How many blocks behind the chain tip to scan (0 = tip block only)
    pub lookback_blocks: u64,
    /// Explicit scan range start, overrides the lookback window
    pub start_block: Option<u64>,
    /// Explicit scan range end, overrides the chain tip
    pub end_block: Option<u64>,
    /// Stop fetching once this many records have been collected
    pub max_transactions: Option<u64>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retry attempts for recoverable RPC failures
    pub max_retries: u32,
    /// Initial retry delay in seconds
    pub retry_delay_seconds: u64,
    /// Maximum retry delay in seconds
    pub max_retry_delay_seconds: u64,
}

/// Output sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the run-stamped output files are written to
    pub directory: String,
    /// Enable the CSV sink
    pub csv_enabled: bool,
    /// Enable the SQLite sink
    pub sqlite_enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            wallets: WalletConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The chains tracked out of the box
fn default_chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig {
            id: "ethereum".to_string(),
            name: "Ethereum Mainnet".to_string(),
            rpc_url: "https://mainnet.infura.io/v3/{api_key}".to_string(),
            chain_id: 1,
            api_key: None,
        },
        ChainConfig {
            id: "polygon".to_string(),
            name: "Polygon Mainnet".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            chain_id: 137,
            api_key: None,
        },
        ChainConfig {
            id: "bsc".to_string(),
            name: "Binance Smart Chain".to_string(),
            rpc_url: "https://bsc-dataseed.binance.org/".to_string(),
            chain_id: 56,
            api_key: None,
        },
        ChainConfig {
            id: "avalanche".to_string(),
            name: "Avalanche C-Chain".to_string(),
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
            chain_id: 43114,
            api_key: None,
        },
    ]
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: 1000,
            start_block: None,
            end_block: None,
            max_transactions: None,
            timeout_seconds: 30,
            max_retries: 5,
            retry_delay_seconds: 2,
            max_retry_delay_seconds: 60,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            csv_enabled: true,
            sqlite_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ChainConfig {
    /// Resolve the endpoint URL, substituting the `{api_key}` placeholder
    /// from the chain's configured key or the RPC_API_KEY environment variable
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        if !self.rpc_url.contains("{api_key}") {
            return Ok(self.rpc_url.clone());
        }

        let key = match &self.api_key {
            Some(key) => key.clone(),
            None => env::var("RPC_API_KEY")
                .map_err(|_| ConfigError::MissingEnvVar("RPC_API_KEY".to_string()))?,
        };

        Ok(self.rpc_url.replace("{api_key}", &key))
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Wallet addresses, comma-separated
        if let Ok(addresses) = env::var("WALLET_ADDRESSES") {
            self.wallets.addresses = addresses
                .split(',')
                .map(|addr| addr.trim().to_string())
                .filter(|addr| !addr.is_empty())
                .collect();
        }

        // Per-chain endpoint overrides, e.g. ETHEREUM_RPC_URL
        for chain in &mut self.chains {
            let var = format!("{}_RPC_URL", chain.id.to_uppercase());
            if let Ok(url) = env::var(&var) {
                chain.rpc_url = url;
            }
        }

        // Fetch configuration
        if let Ok(lookback) = env::var("LOOKBACK_BLOCKS") {
            self.fetch.lookback_blocks = lookback.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOOKBACK_BLOCKS".to_string(),
                value: lookback,
            })?;
        }
        if let Ok(max_tx) = env::var("MAX_TRANSACTIONS") {
            self.fetch.max_transactions =
                Some(max_tx.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_TRANSACTIONS".to_string(),
                    value: max_tx,
                })?);
        }
        if let Ok(timeout) = env::var("RPC_TIMEOUT_SECONDS") {
            self.fetch.timeout_seconds =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "RPC_TIMEOUT_SECONDS".to_string(),
                    value: timeout,
                })?;
        }
        if let Ok(retries) = env::var("RPC_MAX_RETRIES") {
            self.fetch.max_retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RPC_MAX_RETRIES".to_string(),
                value: retries,
            })?;
        }

        // Output configuration
        if let Ok(dir) = env::var("OUTPUT_DIR") {
            self.output.directory = dir;
        }

        // Logging configuration
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Restrict the run to the named chains, preserving configuration order
    pub fn select_chains(&mut self, selected: &[String]) -> Result<(), ConfigError> {
        for id in selected {
            if !self.chains.iter().any(|chain| chain.id == *id) {
                return Err(ConfigError::UnknownChain(id.clone()));
            }
        }
        self.chains.retain(|chain| selected.contains(&chain.id));
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for chain in &self.chains {
            if !chain.rpc_url.starts_with("http://") && !chain.rpc_url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl(chain.rpc_url.clone()));
            }
            if chain.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "chains.id".to_string(),
                    value: chain.id.clone(),
                });
            }
        }

        if self.fetch.timeout_seconds == 0 || self.fetch.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.timeout_seconds".to_string(),
                value: self.fetch.timeout_seconds.to_string(),
            });
        }

        if self.fetch.max_retries == 0 || self.fetch.max_retries > 20 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.max_retries".to_string(),
                value: self.fetch.max_retries.to_string(),
            });
        }

        if let (Some(start), Some(end)) = (self.fetch.start_block, self.fetch.end_block) {
            if start > end {
                return Err(ConfigError::InvalidValue {
                    key: "fetch.start_block".to_string(),
                    value: format!("{} > end_block {}", start, end),
                });
            }
        }

        if self.output.directory.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.directory".to_string(),
                value: self.output.directory.clone(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chains.len(), 4);
        assert_eq!(config.chains[0].id, "ethereum");
        assert_eq!(config.chains[1].rpc_url, "https://polygon-rpc.com");
        assert!(config.wallets.addresses.is_empty());
        assert_eq!(config.fetch.lookback_blocks, 1000);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert!(config.output.csv_enabled);
        assert!(config.output.sqlite_enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.chains[0].rpc_url = "invalid-url".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.fetch.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.fetch.start_block = Some(200);
        config.fetch.end_block = Some(100);
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_select_chains() {
        let mut config = AppConfig::default();
        config
            .select_chains(&["polygon".to_string(), "ethereum".to_string()])
            .unwrap();

        // Configuration order is preserved regardless of selection order
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].id, "ethereum");
        assert_eq!(config.chains[1].id, "polygon");

        let mut config = AppConfig::default();
        let result = config.select_chains(&["solana".to_string()]);
        assert!(matches!(result, Err(ConfigError::UnknownChain(_))));
    }

    #[test]
    #[serial]
    fn test_endpoint_substitution() {
        env::remove_var("RPC_API_KEY");

        let chain = ChainConfig {
            id: "ethereum".to_string(),
            name: "Ethereum Mainnet".to_string(),
            rpc_url: "https://mainnet.infura.io/v3/{api_key}".to_string(),
            chain_id: 1,
            api_key: Some("abc123".to_string()),
        };
        assert_eq!(
            chain.endpoint().unwrap(),
            "https://mainnet.infura.io/v3/abc123"
        );

        let keyless = ChainConfig {
            api_key: None,
            ..chain.clone()
        };
        assert!(matches!(
            keyless.endpoint(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        env::set_var("RPC_API_KEY", "env456");
        assert_eq!(
            keyless.endpoint().unwrap(),
            "https://mainnet.infura.io/v3/env456"
        );
        env::remove_var("RPC_API_KEY");

        // No placeholder means no key needed
        let plain = ChainConfig {
            rpc_url: "https://polygon-rpc.com".to_string(),
            api_key: None,
            ..chain
        };
        assert_eq!(plain.endpoint().unwrap(), "https://polygon-rpc.com");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("WALLET_ADDRESSES", "0xabc, 0xdef ,,0x123");
        env::set_var("ETHEREUM_RPC_URL", "https://test-rpc.com/");
        env::set_var("LOOKBACK_BLOCKS", "50");
        env::set_var("MAX_TRANSACTIONS", "100");
        env::set_var("OUTPUT_DIR", "/tmp/exports");
        env::set_var("LOG_LEVEL", "debug");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.wallets.addresses, vec!["0xabc", "0xdef", "0x123"]);
        assert_eq!(config.chains[0].rpc_url, "https://test-rpc.com/");
        assert_eq!(config.fetch.lookback_blocks, 50);
        assert_eq!(config.fetch.max_transactions, Some(100));
        assert_eq!(config.output.directory, "/tmp/exports");
        assert_eq!(config.logging.level, "debug");

        env::remove_var("WALLET_ADDRESSES");
        env::remove_var("ETHEREUM_RPC_URL");
        env::remove_var("LOOKBACK_BLOCKS");
        env::remove_var("MAX_TRANSACTIONS");
        env::remove_var("OUTPUT_DIR");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_values() {
        env::set_var("LOOKBACK_BLOCKS", "invalid");

        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));

        env::remove_var("LOOKBACK_BLOCKS");
    }

    #[test]
    #[serial]
    fn test_config_file_loading() {
        let config_content = r#"
[[chains]]
id = "ethereum"
name = "Ethereum Mainnet"
rpc_url = "https://custom-rpc.com/"
chain_id = 1

[wallets]
addresses = ["0x28C6c06298d514Db089934071355E5743bf21d60"]

[fetch]
lookback_blocks = 200
timeout_seconds = 45
max_retries = 3
retry_delay_seconds = 1
max_retry_delay_seconds = 30

[output]
directory = "/custom/exports"
csv_enabled = true
sqlite_enabled = false

[logging]
level = "warn"
format = "json"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, config_content.as_bytes()).unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());

        let config = AppConfig::load_from_file().unwrap();

        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].rpc_url, "https://custom-rpc.com/");
        assert_eq!(
            config.wallets.addresses,
            vec!["0x28C6c06298d514Db089934071355E5743bf21d60"]
        );
        assert_eq!(config.fetch.lookback_blocks, 200);
        assert_eq!(config.fetch.timeout_seconds, 45);
        assert_eq!(config.output.directory, "/custom/exports");
        assert!(!config.output.sqlite_enabled);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");

        env::remove_var("CONFIG_FILE");
    }

    #[test]
    #[serial]
    fn test_missing_config_file_uses_defaults() {
        env::set_var("CONFIG_FILE", "/nonexistent/config.toml");

        let config = AppConfig::load_from_file().unwrap();
        assert_eq!(config.chains.len(), 4);

        env::remove_var("CONFIG_FILE");
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = AppConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[[chains]]"));
        assert!(sample.contains("[wallets]"));
        assert!(sample.contains("[fetch]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[logging]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let original_config = AppConfig::default();
        let toml_string = toml::to_string_pretty(&original_config).unwrap();
        let parsed_config: AppConfig = toml::from_str(&toml_string).unwrap();

        assert_eq!(original_config.chains.len(), parsed_config.chains.len());
        assert_eq!(original_config.chains[0].id, parsed_config.chains[0].id);
        assert_eq!(
            original_config.fetch.lookback_blocks,
            parsed_config.fetch.lookback_blocks
        );
        assert_eq!(
            original_config.output.directory,
            parsed_config.output.directory
        );
    }
}
