use crate::blockchain::rpc_client::{parse_hex_to_u64, RpcClient};
use crate::config::{ChainConfig, FetchConfig};
use crate::error::ExporterError;
use crate::logging::LogContext;
use crate::models::RawTransaction;
use crate::retry::{RetryConfig, RetryManager};

/// Per-chain transaction scanner.
///
/// Direct node RPC cannot enumerate an address's history, so the scanner
/// walks a bounded block window newest-to-oldest and filters each block's
/// transactions for the queried address. Individual block failures are
/// skipped; only failing to resolve the scan range fails the chain.
pub struct ChainScanner {
    chain: ChainConfig,
    client: RpcClient,
    fetch: FetchConfig,
    retry: RetryConfig,
}

impl ChainScanner {
    pub fn new(chain: &ChainConfig, fetch: &FetchConfig) -> Result<Self, ExporterError> {
        let endpoint = chain.endpoint().map_err(ExporterError::Config)?;
        let client = RpcClient::new(endpoint, fetch.timeout_seconds).map_err(ExporterError::Rpc)?;

        Ok(Self {
            chain: chain.clone(),
            client,
            fetch: fetch.clone(),
            retry: RetryConfig::from_fetch(fetch),
        })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain.id
    }

    /// Compare eth_chainId against the configured chain id.
    ///
    /// A mismatch or an unreachable endpoint only logs; the scan itself
    /// decides whether the chain is usable.
    pub async fn verify_chain_id(&self) {
        let context = LogContext::new("scanner", "verify_chain_id").with_chain(&self.chain.id);

        match self.client.get_chain_id().await {
            Ok(id) if id == self.chain.chain_id => {
                context.debug(&format!("Connected to {} (chain id {})", self.chain.name, id));
            }
            Ok(id) => {
                context.warn(&format!(
                    "Endpoint reports chain id {} but configuration expects {}",
                    id, self.chain.chain_id
                ));
            }
            Err(e) => {
                context.warn(&format!("Could not verify chain id: {}", e));
            }
        }
    }

    /// Fetch raw transactions involving the address, paired with their block
    /// timestamps, newest block first. Stops early once `limit` transactions
    /// have been found.
    pub async fn fetch_address_transactions(
        &self,
        address: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(RawTransaction, u64)>, ExporterError> {
        let (start_block, end_block) = self.resolve_scan_range().await?;

        let context = LogContext::new("scanner", "fetch_address_transactions")
            .with_chain(&self.chain.id)
            .with_address(address)
            .with_metadata("start_block", serde_json::json!(start_block))
            .with_metadata("end_block", serde_json::json!(end_block));
        context.info(&format!(
            "Scanning blocks {}..={} on {}",
            start_block, end_block, self.chain.name
        ));

        let mut found = Vec::new();

        for block_number in (start_block..=end_block).rev() {
            if limit.is_some_and(|limit| found.len() >= limit) {
                break;
            }

            let manager = RetryManager::new("get_block", self.retry.clone());
            let client = &self.client;
            let block = match manager
                .execute(|| async move {
                    client.get_block(block_number).await.map_err(ExporterError::Rpc)
                })
                .await
            {
                Ok(block) => block,
                Err(e) => {
                    let context = LogContext::new("scanner", "get_block")
                        .with_chain(&self.chain.id)
                        .with_block_number(block_number);
                    context.warn(&format!("Skipping block {}: {}", block_number, e));
                    continue;
                }
            };

            let timestamp = match parse_hex_to_u64(&block.timestamp) {
                Ok(ts) => ts,
                Err(e) => {
                    let context = LogContext::new("scanner", "get_block")
                        .with_chain(&self.chain.id)
                        .with_block_number(block_number);
                    context.warn(&format!(
                        "Skipping block {} with bad timestamp: {}",
                        block_number, e
                    ));
                    continue;
                }
            };

            for raw in block.transactions {
                if raw.involves(address) {
                    found.push((raw, timestamp));
                    if limit.is_some_and(|limit| found.len() >= limit) {
                        break;
                    }
                }
            }
        }

        Ok(found)
    }

    /// Resolve the block window to scan. Explicit bounds win; otherwise the
    /// window ends at the chain tip and reaches back `lookback_blocks`.
    async fn resolve_scan_range(&self) -> Result<(u64, u64), ExporterError> {
        let end_block = match self.fetch.end_block {
            Some(end) => end,
            None => {
                let manager = RetryManager::new("get_latest_block_number", self.retry.clone());
                let client = &self.client;
                manager
                    .execute(|| async move {
                        client
                            .get_latest_block_number()
                            .await
                            .map_err(ExporterError::Rpc)
                    })
                    .await?
            }
        };

        Ok(scan_window(&self.fetch, end_block))
    }
}

fn scan_window(fetch: &FetchConfig, end_block: u64) -> (u64, u64) {
    let start_block = fetch
        .start_block
        .unwrap_or_else(|| end_block.saturating_sub(fetch.lookback_blocks));
    (start_block.min(end_block), end_block)
}
