use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    aggregator::{aggregate, AggregateError, PageFetcher, RetryPolicy},
    growth::GrowthSeries,
    models::{AggregationResult, Projection},
    projector::{creation_date, project, EarningsRates},
    stats::ANALYSIS_STATS,
};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub address: String,
    #[serde(flatten)]
    pub aggregation: AggregationResult,
    pub earliest_date: Option<NaiveDate>,
    pub projection: Projection,
    /// Set when paging stopped early; totals then cover only the pages read.
    pub upstream_error: Option<String>,
}

/// Aggregates an address's history and projects earnings from it.
#[derive(Clone)]
pub struct Analyzer {
    fetcher: Arc<dyn PageFetcher>,
    growth: Arc<GrowthSeries>,
    rates: EarningsRates,
    policy: RetryPolicy,
}

impl Analyzer {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        growth: Arc<GrowthSeries>,
        rates: EarningsRates,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            growth,
            rates,
            policy,
        }
    }

    pub fn growth(&self) -> &GrowthSeries {
        &self.growth
    }

    pub async fn analyze(&self, address: &str) -> Result<AnalysisReport, AggregateError> {
        self.analyze_at(address, Utc::now()).await
    }

    pub async fn analyze_at(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, AggregateError> {
        ANALYSIS_STATS.inc_analyses(1);

        let (aggregation, upstream_error) =
            match aggregate(address, self.fetcher.as_ref(), &self.policy).await {
                Ok(result) => (result, None),
                Err(AggregateError::Network { message, partial }) => {
                    warn!("analysis of {} stopped early: {}", address, message);
                    (partial, Some(message))
                }
                Err(err) => return Err(err),
            };

        let projection = project(
            aggregation.total_gas_used,
            aggregation.earliest_timestamp,
            &self.growth,
            now,
            &self.rates,
        );

        info!(
            "analyzed {}: {} txs, {} gas",
            address, aggregation.total_transactions, aggregation.total_gas_used
        );

        Ok(AnalysisReport {
            address: address.trim().to_lowercase(),
            earliest_date: aggregation.earliest_timestamp.and_then(creation_date),
            aggregation,
            projection,
            upstream_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        explorer::FetchError,
        models::{GrowthPoint, NotApplicableReason, TransactionRecord, TxPage},
    };
    use async_trait::async_trait;
    use chrono::TimeZone;

    const ADDRESS: &str = "0x00000000000000000000000000000000000000bb";

    struct OnePage(Vec<TransactionRecord>, Option<&'static str>);

    #[async_trait]
    impl PageFetcher for OnePage {
        async fn fetch_page(
            &self,
            _address: &str,
            start_block: u64,
            _page_size: usize,
        ) -> Result<TxPage, FetchError> {
            match (start_block, self.1) {
                (0, _) => Ok(TxPage::from_records(self.0.clone())),
                (_, Some(message)) => Err(FetchError::Upstream(message.to_string())),
                _ => Ok(TxPage::default()),
            }
        }
    }

    fn analyzer(fetcher: OnePage) -> Analyzer {
        let date = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let growth = GrowthSeries::from_points(vec![
            GrowthPoint { date: date("2023-01-01"), value: 100 },
            GrowthPoint { date: date("2023-06-01"), value: 500 },
        ]);
        Analyzer::new(
            Arc::new(fetcher),
            Arc::new(growth),
            EarningsRates::default(),
            RetryPolicy::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 10, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn zero_transactions_are_not_applicable() {
        let report = analyzer(OnePage(vec![], None))
            .analyze_at(ADDRESS, now())
            .await
            .unwrap();

        assert_eq!(report.aggregation.total_transactions, 0);
        assert_eq!(report.earliest_date, None);
        assert_eq!(
            report.projection,
            Projection::NotApplicable {
                reason: NotApplicableReason::NoTransactions
            }
        );
    }

    #[tokio::test]
    async fn full_flow_produces_estimate() {
        let records = vec![TransactionRecord {
            block_number: Some(1),
            gas_used: Some(1_000_000),
            timestamp: Some(1_672_574_400), // 2023-01-01T12:00:00Z
        }];
        let report = analyzer(OnePage(records, None))
            .analyze_at(ADDRESS, now())
            .await
            .unwrap();

        let estimate = report.projection.estimate().expect("estimate");
        assert_eq!(estimate.growth_since_date, 400);
        assert!((estimate.usd_amount - 4391.304_347_8).abs() < 1e-6);
        assert!(report.upstream_error.is_none());
    }

    #[tokio::test]
    async fn upstream_failure_keeps_partial_report() {
        let records: Vec<TransactionRecord> = (0..crate::aggregator::PAGE_SIZE as u64)
            .map(|i| TransactionRecord {
                block_number: Some(i),
                gas_used: Some(10),
                timestamp: Some(1_672_574_400),
            })
            .collect();
        let report = analyzer(OnePage(records, Some("Query Timeout occured")))
            .analyze_at(ADDRESS, now())
            .await
            .unwrap();

        assert_eq!(report.aggregation.total_transactions, 1000);
        assert_eq!(report.upstream_error.as_deref(), Some("Query Timeout occured"));
        assert!(report.projection.estimate().is_some());
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let err = analyzer(OnePage(vec![], None))
            .analyze_at("", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::InvalidAddress(_)));
    }
}
