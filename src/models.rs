use chrono::NaiveDate;
use serde::Serialize;

/// One explorer transaction, reduced to the fields the aggregator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub timestamp: Option<i64>,
}

/// A single page of `txlist` results after shape normalization.
#[derive(Debug, Clone, Default)]
pub struct TxPage {
    pub records: Vec<TransactionRecord>,
    /// Block number of the last record, used as the next page's cursor.
    pub cursor_block: Option<u64>,
}

impl TxPage {
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let cursor_block = records.last().and_then(|r| r.block_number);
        Self {
            records,
            cursor_block,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub total_transactions: u64,
    pub total_gas_used: u64,
    /// Unix seconds of the oldest transaction; `None` when nothing was found.
    pub earliest_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    pub date: NaiveDate,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsEstimate {
    pub since_date: NaiveDate,
    pub growth_since_date: i64,
    pub primary_unit_amount: f64,
    pub usd_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotApplicableReason {
    NoTransactions,
    NoGrowthData,
    ZeroGrowth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Projection {
    Estimate(EarningsEstimate),
    TooNew { created: NaiveDate },
    NotApplicable { reason: NotApplicableReason },
}

impl Projection {
    pub fn estimate(&self) -> Option<&EarningsEstimate> {
        match self {
            Projection::Estimate(estimate) => Some(estimate),
            _ => None,
        }
    }
}
