use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily trading session for a single instrument.
///
/// Series handed to the engine must be ordered ascending by date with no
/// duplicate dates; that invariant belongs to the caller (the history store
/// persists one row per session and loads them ordered).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Close treated as missing when zero or non-finite, so ratio-based
    /// indicators never divide by a placeholder value.
    pub fn effective_close(&self) -> Option<f64> {
        (self.close != 0.0 && self.close.is_finite()).then_some(self.close)
    }

    /// Volume with the same zero-as-missing convention as [`effective_close`].
    ///
    /// [`effective_close`]: PriceBar::effective_close
    pub fn effective_volume(&self) -> Option<f64> {
        (self.volume != 0.0 && self.volume.is_finite()).then_some(self.volume)
    }

    /// Typical price `(high + low + close) / 3`, undefined when the close is
    /// missing.
    pub fn typical_price(&self) -> Option<f64> {
        self.effective_close()
            .map(|close| (self.high + self.low + close) / 3.0)
    }
}

/// True when `bars` is strictly ascending by date.
pub fn is_ordered(bars: &[PriceBar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64, volume: f64) -> PriceBar {
        PriceBar {
            date: date.parse().unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn test_zero_close_is_missing() {
        assert_eq!(bar("2024-01-02", 0.0, 100.0).effective_close(), None);
        assert_eq!(bar("2024-01-02", 10.5, 100.0).effective_close(), Some(10.5));
    }

    #[test]
    fn test_zero_volume_is_missing() {
        assert_eq!(bar("2024-01-02", 10.0, 0.0).effective_volume(), None);
        assert_eq!(
            bar("2024-01-02", 10.0, 2500.0).effective_volume(),
            Some(2500.0)
        );
    }

    #[test]
    fn test_ordering_check() {
        let bars = vec![
            bar("2024-01-02", 10.0, 1.0),
            bar("2024-01-03", 11.0, 1.0),
            bar("2024-01-04", 12.0, 1.0),
        ];
        assert!(is_ordered(&bars));

        let shuffled = vec![bar("2024-01-03", 11.0, 1.0), bar("2024-01-02", 10.0, 1.0)];
        assert!(!is_ordered(&shuffled));
    }
}
