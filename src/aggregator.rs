use std::time::Duration;

use async_trait::async_trait;
use ethers_core::types::Address;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    explorer::FetchError,
    models::{AggregationResult, TxPage},
    stats::ANALYSIS_STATS,
};

/// Largest page the explorer serves per request.
pub const PAGE_SIZE: usize = 1000;

/// Source of `txlist` pages, ordered ascending by block.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        address: &str,
        start_block: u64,
        page_size: usize,
    ) -> Result<TxPage, FetchError>;
}

/// How long to wait after a rate-limited page and how many consecutive
/// attempts a single page may take.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AggregateError {
    #[error("invalid contract address: {0:?}")]
    InvalidAddress(String),
    #[error("{message}")]
    Network {
        message: String,
        partial: AggregationResult,
    },
}

impl AggregateError {
    pub fn partial(&self) -> Option<&AggregationResult> {
        match self {
            AggregateError::Network { partial, .. } => Some(partial),
            AggregateError::InvalidAddress(_) => None,
        }
    }
}

/// Validates and lower-cases a `0x` address.
pub fn normalize_address(raw: &str) -> Result<String, AggregateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AggregateError::InvalidAddress(raw.to_string()));
    }
    let address: Address = trimmed
        .parse()
        .map_err(|_| AggregateError::InvalidAddress(raw.to_string()))?;
    Ok(format!("0x{:x}", address))
}

#[derive(Debug, Default)]
struct Totals {
    transactions: u64,
    gas_used: u64,
    earliest: Option<i64>,
}

impl Totals {
    fn absorb(&mut self, page: &TxPage) {
        self.transactions += page.len() as u64;
        for record in &page.records {
            if let Some(gas) = record.gas_used {
                self.gas_used = self.gas_used.saturating_add(gas);
            }
            if let Some(ts) = record.timestamp {
                if self.earliest.map_or(true, |earliest| ts < earliest) {
                    self.earliest = Some(ts);
                }
            }
        }
    }

    fn result(&self) -> AggregationResult {
        AggregationResult {
            total_transactions: self.transactions,
            total_gas_used: self.gas_used,
            earliest_timestamp: self.earliest,
        }
    }
}

/// Walks every `txlist` page for `address`, summing transactions and gas and
/// tracking the oldest timestamp. Pages are requested one at a time; a page
/// shorter than [`PAGE_SIZE`] ends the walk.
pub async fn aggregate(
    address: &str,
    fetcher: &dyn PageFetcher,
    policy: &RetryPolicy,
) -> Result<AggregationResult, AggregateError> {
    let address = normalize_address(address)?;

    let mut totals = Totals::default();
    let mut start_block = 0u64;
    let mut attempts = 0u32;

    loop {
        let page = match fetcher.fetch_page(&address, start_block, PAGE_SIZE).await {
            Ok(page) => page,
            Err(FetchError::RateLimited) => {
                attempts += 1;
                ANALYSIS_STATS.inc_rate_limit_retries(1);
                if attempts >= policy.max_attempts {
                    ANALYSIS_STATS.inc_upstream_failures(1);
                    return Err(AggregateError::Network {
                        message: format!(
                            "explorer still rate limited after {} attempts",
                            attempts
                        ),
                        partial: totals.result(),
                    });
                }
                warn!(
                    "rate limited at block {} for {}, retrying in {:?}",
                    start_block, address, policy.backoff
                );
                sleep(policy.backoff).await;
                continue;
            }
            Err(err) => {
                warn!("txlist failed at block {} for {}: {}", start_block, address, err);
                ANALYSIS_STATS.inc_upstream_failures(1);
                return Err(AggregateError::Network {
                    message: err.to_string(),
                    partial: totals.result(),
                });
            }
        };

        attempts = 0;
        ANALYSIS_STATS.inc_pages(1);
        totals.absorb(&page);
        debug!(
            "page from block {}: {} records, running total {}",
            start_block,
            page.len(),
            totals.transactions
        );

        if page.len() < PAGE_SIZE {
            break;
        }
        // A full page must move the cursor forward or it would be requested forever.
        match page
            .cursor_block
            .and_then(|last_block| last_block.checked_add(1))
            .filter(|next| *next > start_block)
        {
            Some(next) => start_block = next,
            None => {
                warn!(
                    "full page for {} does not advance past block {} (cursor {:?}), stopping",
                    address, start_block, page.cursor_block
                );
                break;
            }
        }
    }

    Ok(totals.result())
}
