use super::price_bar::PriceBar;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Aggregation timeframe for chart-facing resampling.
///
/// The engine itself always consumes daily bars; coarser views are a
/// caller-side transformation applied before (or instead of) invoking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "1d" => Ok(Timeframe::Daily),
            "weekly" | "1w" => Ok(Timeframe::Weekly),
            "monthly" | "1mo" => Ok(Timeframe::Monthly),
            "yearly" | "1y" => Ok(Timeframe::Yearly),
            _ => anyhow::bail!(
                "Invalid timeframe: {}. Must be 'daily', 'weekly', 'monthly' or 'yearly'",
                s
            ),
        }
    }
}

fn bucket_key(date: chrono::NaiveDate, timeframe: Timeframe) -> (i32, u32) {
    match timeframe {
        Timeframe::Daily => (date.year(), date.ordinal()),
        Timeframe::Weekly => {
            let week = date.iso_week();
            (week.year(), week.week())
        }
        Timeframe::Monthly => (date.year(), date.month()),
        Timeframe::Yearly => (date.year(), 0),
    }
}

/// Aggregate ordered daily bars into the requested timeframe:
/// open = first, high = max, low = min, close = last, volume = sum.
/// The aggregated bar carries the date of the last session in the bucket.
pub fn resample(bars: &[PriceBar], timeframe: Timeframe) -> Vec<PriceBar> {
    if timeframe == Timeframe::Daily {
        return bars.to_vec();
    }

    let mut out: Vec<PriceBar> = Vec::new();
    let mut current_key: Option<(i32, u32)> = None;

    for bar in bars {
        let key = bucket_key(bar.date, timeframe);
        match (current_key, out.last_mut()) {
            (Some(open_key), Some(agg)) if open_key == key => {
                agg.date = bar.date;
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                current_key = Some(key);
                out.push(*bar);
            }
        }
    }

    out
}
