use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    growth::GrowthSeries,
    models::{EarningsEstimate, NotApplicableReason, Projection},
};

/// Gas units per FTN on the target chain.
pub const DEFAULT_GAS_PER_UNIT: f64 = 2_300_000.0;
/// FTN price snapshot in USD.
pub const DEFAULT_USD_PER_UNIT: f64 = 4.04;

/// Minimum contract age before growth data is considered meaningful.
const MIN_HISTORY_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarningsRates {
    pub unit_conversion_rate: f64,
    pub usd_per_unit: f64,
}

impl Default for EarningsRates {
    fn default() -> Self {
        Self {
            unit_conversion_rate: 1.0 / DEFAULT_GAS_PER_UNIT,
            usd_per_unit: DEFAULT_USD_PER_UNIT,
        }
    }
}

impl EarningsRates {
    pub fn new(gas_per_unit: f64, usd_per_unit: f64) -> Self {
        Self {
            unit_conversion_rate: 1.0 / gas_per_unit,
            usd_per_unit,
        }
    }
}

/// UTC calendar day of a unix-seconds timestamp.
pub fn creation_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

pub fn project(
    total_gas_used: u64,
    earliest_timestamp: Option<i64>,
    series: &GrowthSeries,
    now: DateTime<Utc>,
    rates: &EarningsRates,
) -> Projection {
    let created = match earliest_timestamp.and_then(creation_date) {
        Some(created) if total_gas_used > 0 => created,
        _ => {
            return Projection::NotApplicable {
                reason: NotApplicableReason::NoTransactions,
            }
        }
    };

    let cutoff = (now - Duration::days(MIN_HISTORY_DAYS)).date_naive();
    if created > cutoff {
        return Projection::TooNew { created };
    }

    let Some(growth) = series.growth_since(created) else {
        return Projection::NotApplicable {
            reason: NotApplicableReason::NoGrowthData,
        };
    };
    if growth == 0 {
        return Projection::NotApplicable {
            reason: NotApplicableReason::ZeroGrowth,
        };
    }

    let squared = u128::from(total_gas_used) * u128::from(total_gas_used);
    let ratio = squared as f64 / growth as f64;
    let primary_unit_amount = ratio * rates.unit_conversion_rate;
    let usd_amount = primary_unit_amount * rates.usd_per_unit;

    tracing::debug!(
        "growth since {}: {}, ratio {}, {} FTN",
        created,
        growth,
        ratio,
        primary_unit_amount
    );

    Projection::Estimate(EarningsEstimate {
        since_date: created,
        growth_since_date: growth,
        primary_unit_amount,
        usd_amount,
    })
}
