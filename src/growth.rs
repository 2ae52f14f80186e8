use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use crate::models::GrowthPoint;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cumulative network gas usage by day, ascending by date.
///
/// Rows are kept in file order; the loader does not sort.
#[derive(Debug, Clone, Default)]
pub struct GrowthSeries {
    points: Vec<GrowthPoint>,
}

impl GrowthSeries {
    pub fn from_points(points: Vec<GrowthPoint>) -> Self {
        Self { points }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading growth data {:?}", path))?;
        let series = Self::parse(&text);
        tracing::info!("loaded {} growth entries from {:?}", series.len(), path);
        Ok(series)
    }

    /// Parses `Date,Value` rows. The first line is a header; blank and
    /// malformed rows are skipped.
    pub fn parse(text: &str) -> Self {
        let points = text
            .lines()
            .skip(1)
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| {
                let point = parse_row(line);
                if point.is_none() {
                    debug!("skipping malformed growth row {}: {:?}", idx + 2, line);
                }
                point
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[GrowthPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GrowthPoint> {
        self.points.first()
    }

    pub fn latest(&self) -> Option<&GrowthPoint> {
        self.points.last()
    }

    /// Value recorded on `date`, or on the closest earlier day. Dates before
    /// the series starts floor to the first entry.
    pub fn value_at(&self, date: NaiveDate) -> Option<u64> {
        let first = self.points.first()?;
        let idx = self.points.partition_point(|p| p.date < date);

        if let Some(point) = self.points.get(idx).filter(|p| p.date == date) {
            return Some(point.value);
        }
        if idx == 0 {
            return Some(first.value);
        }
        Some(self.points[idx - 1].value)
    }

    /// Latest value minus the value at `date`. Negative when the data is
    /// stale or out of order.
    pub fn growth_since(&self, date: NaiveDate) -> Option<i64> {
        let from = self.value_at(date)?;
        let latest = self.latest()?.value;
        Some(to_i64_lossy(latest) - to_i64_lossy(from))
    }
}

fn parse_row(line: &str) -> Option<GrowthPoint> {
    let mut cols = line.split(',');
    let date = NaiveDate::parse_from_str(cols.next()?.trim(), DATE_FORMAT).ok()?;
    let raw = cols.next()?.trim().trim_matches('"');
    let value = match raw.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            let v: f64 = raw.parse().ok()?;
            if !v.is_finite() || v < 0.0 {
                return None;
            }
            v.trunc() as u64
        }
    };
    Some(GrowthPoint { date, value })
}

fn to_i64_lossy(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
