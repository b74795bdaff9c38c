//! Rolling technical/flow indicators over a daily bar series.
//!
//! Every derived column is partial: a value exists only when the full
//! trailing window (and every input inside it) is defined. Missing inputs
//! (zero closes/volumes, short history, zero denominators) propagate as
//! `None`, never as a sentinel number, so downstream feature selection can
//! treat unavailability as a hard constraint.

use crate::domain::features::{ALL_FEATURES, Feature};
use crate::domain::market::PriceBar;
use statrs::statistics::{Data, Distribution};

const VWAP_WINDOW: usize = 21;
const FLOW_WINDOW: usize = 14;
const MACD_FAST_SPAN: usize = 12;
const MACD_SLOW_SPAN: usize = 26;
const BB_WINDOW: usize = 20;
const BB_STD_DEV: f64 = 2.0;

/// Derived columns for one session. `None` = not derivable at this row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorRow {
    pub vwap: Option<f64>,
    pub dist_vwap: Option<f64>,
    pub obv: Option<f64>,
    pub mfi: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub sma_14: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr: Option<f64>,
    pub dist_sma200: Option<f64>,
}

impl IndicatorRow {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Vwap => self.vwap,
            Feature::DistVwap => self.dist_vwap,
            Feature::Obv => self.obv,
            Feature::Mfi => self.mfi,
            Feature::Rsi => self.rsi,
            Feature::Macd => self.macd,
            Feature::Sma14 => self.sma_14,
            Feature::Sma20 => self.sma_20,
            Feature::Sma50 => self.sma_50,
            Feature::Sma200 => self.sma_200,
            Feature::BbUpper => self.bb_upper,
            Feature::BbLower => self.bb_lower,
            Feature::Atr => self.atr,
            Feature::DistSma200 => self.dist_sma200,
        }
    }
}

/// A bar series enriched with one [`IndicatorRow`] per session.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    bars: Vec<PriceBar>,
    closes: Vec<Option<f64>>,
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn compute(bars: &[PriceBar]) -> Self {
        let n = bars.len();
        let closes: Vec<Option<f64>> = bars.iter().map(|b| b.effective_close()).collect();
        let volumes: Vec<Option<f64>> = bars.iter().map(|b| b.effective_volume()).collect();

        let vwap = vwap_column(&closes, &volumes);
        let obv = obv_column(&closes, &volumes);
        let rsi = rsi_column(&closes);
        let mfi = mfi_column(bars, &volumes);
        let atr = atr_column(bars, &closes);
        let macd = macd_column(&closes);
        let sma_14 = rolling_mean(&closes, FLOW_WINDOW);
        let sma_20 = rolling_mean(&closes, BB_WINDOW);
        let sma_50 = rolling_mean(&closes, 50);
        let sma_200 = rolling_mean(&closes, 200);
        let std_20 = rolling_apply(&closes, BB_WINDOW, |window| {
            Data::new(window.to_vec()).std_dev()
        });

        let rows = (0..n)
            .map(|t| {
                let bb = sma_20[t].zip(std_20[t]);
                IndicatorRow {
                    vwap: vwap[t],
                    dist_vwap: relative_distance(closes[t], vwap[t]),
                    obv: obv[t],
                    mfi: mfi[t],
                    rsi: rsi[t],
                    macd: macd[t],
                    sma_14: sma_14[t],
                    sma_20: sma_20[t],
                    sma_50: sma_50[t],
                    sma_200: sma_200[t],
                    bb_upper: bb.map(|(mean, std)| mean + BB_STD_DEV * std),
                    bb_lower: bb.map(|(mean, std)| mean - BB_STD_DEV * std),
                    atr: atr[t],
                    dist_sma200: relative_distance(closes[t], sma_200[t]),
                }
            })
            .collect();

        Self {
            bars: bars.to_vec(),
            closes,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    /// Sanitized close at `idx` (zero treated as missing).
    pub fn close(&self, idx: usize) -> Option<f64> {
        self.closes.get(idx).copied().flatten()
    }

    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// Features defined on the most recent row, i.e. the only columns usable for
    /// both training and single-step inference.
    pub fn available_features(&self) -> Vec<Feature> {
        match self.latest() {
            Some(row) => ALL_FEATURES
                .iter()
                .copied()
                .filter(|f| row.get(*f).is_some())
                .collect(),
            None => Vec::new(),
        }
    }
}

fn safe_div(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return None;
    }
    Some(num / den)
}

/// `(value − reference) / reference`, undefined on missing or zero reference.
fn relative_distance(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    let (v, r) = value.zip(reference)?;
    safe_div(v - r, r)
}

/// Windowed fold: `None` whenever the window is short or contains a missing
/// input. O(n·w) is fine at daily granularity.
fn rolling_apply(
    xs: &[Option<f64>],
    window: usize,
    f: impl Fn(&[f64]) -> Option<f64>,
) -> Vec<Option<f64>> {
    let mut buf = Vec::with_capacity(window);
    (0..xs.len())
        .map(|t| {
            if t + 1 < window {
                return None;
            }
            buf.clear();
            for x in &xs[t + 1 - window..=t] {
                buf.push((*x)?);
            }
            f(&buf)
        })
        .collect()
}

fn rolling_sum(xs: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(xs, window, |w| Some(w.iter().sum()))
}

fn rolling_mean(xs: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(xs, window, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Volume-weighted average price over a 21-session window.
fn vwap_column(closes: &[Option<f64>], volumes: &[Option<f64>]) -> Vec<Option<f64>> {
    let pv: Vec<Option<f64>> = closes
        .iter()
        .zip(volumes)
        .map(|(c, v)| c.zip(*v).map(|(c, v)| c * v))
        .collect();

    let pv_sum = rolling_sum(&pv, VWAP_WINDOW);
    let vol_sum = rolling_sum(volumes, VWAP_WINDOW);

    pv_sum
        .into_iter()
        .zip(vol_sum)
        .map(|(pv, vol)| pv.zip(vol).and_then(|(pv, vol)| safe_div(pv, vol)))
        .collect()
}

/// On-balance volume: cumulative volume signed by close-to-close direction.
/// A missing close or volume contributes zero rather than poisoning the
/// running sum, so the column is defined at every row.
fn obv_column(closes: &[Option<f64>], volumes: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut acc = 0.0;
    (0..closes.len())
        .map(|t| {
            if t > 0 {
                if let (Some(cur), Some(prev), Some(vol)) =
                    (closes[t], closes[t - 1], volumes[t])
                {
                    if cur > prev {
                        acc += vol;
                    } else if cur < prev {
                        acc -= vol;
                    }
                }
            }
            Some(acc)
        })
        .collect()
}

/// 14-session RSI over plain rolling means of gains and losses. The first
/// session has no delta and counts as zero gain/loss; a zero mean loss makes
/// the ratio (and the oscillator) undefined rather than pinning it at 100.
fn rsi_column(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut gains: Vec<Option<f64>> = vec![None; n];
    let mut losses: Vec<Option<f64>> = vec![None; n];
    if n > 0 {
        gains[0] = Some(0.0);
        losses[0] = Some(0.0);
    }
    for t in 1..n {
        if let (Some(cur), Some(prev)) = (closes[t], closes[t - 1]) {
            let delta = cur - prev;
            gains[t] = Some(delta.max(0.0));
            losses[t] = Some((-delta).max(0.0));
        }
    }

    let mean_gain = rolling_mean(&gains, FLOW_WINDOW);
    let mean_loss = rolling_mean(&losses, FLOW_WINDOW);

    mean_gain
        .into_iter()
        .zip(mean_loss)
        .map(|(gain, loss)| {
            let ratio = gain.zip(loss).and_then(|(g, l)| safe_div(g, l))?;
            Some(100.0 - 100.0 / (1.0 + ratio))
        })
        .collect()
}

/// Money Flow Index: typical-price money flow split by direction, summed
/// over 14 sessions and mapped to 0–100.
fn mfi_column(bars: &[PriceBar], volumes: &[Option<f64>]) -> Vec<Option<f64>> {
    let n = bars.len();
    let tp: Vec<Option<f64>> = bars.iter().map(|b| b.typical_price()).collect();

    let mut pos: Vec<Option<f64>> = vec![None; n];
    let mut neg: Vec<Option<f64>> = vec![None; n];
    if n > 0 {
        pos[0] = Some(0.0);
        neg[0] = Some(0.0);
    }
    for t in 1..n {
        if let (Some(cur), Some(prev), Some(vol)) = (tp[t], tp[t - 1], volumes[t]) {
            let flow = cur * vol;
            if cur > prev {
                pos[t] = Some(flow);
                neg[t] = Some(0.0);
            } else if cur < prev {
                pos[t] = Some(0.0);
                neg[t] = Some(flow);
            } else {
                pos[t] = Some(0.0);
                neg[t] = Some(0.0);
            }
        }
    }

    let pos_sum = rolling_sum(&pos, FLOW_WINDOW);
    let neg_sum = rolling_sum(&neg, FLOW_WINDOW);

    pos_sum
        .into_iter()
        .zip(neg_sum)
        .map(|(p, n)| {
            let ratio = p.zip(n).and_then(|(p, n)| safe_div(p, n))?;
            Some(100.0 - 100.0 / (1.0 + ratio))
        })
        .collect()
}

/// 14-session mean of the true range. The first session falls back to
/// high−low because no prior close exists, matching the flow columns'
/// zero-delta convention.
fn atr_column(bars: &[PriceBar], closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let tr: Vec<Option<f64>> = (0..bars.len())
        .map(|t| {
            let hl = bars[t].high - bars[t].low;
            let range = match t.checked_sub(1).and_then(|p| closes[p]) {
                Some(prev_close) => hl
                    .max((bars[t].high - prev_close).abs())
                    .max((bars[t].low - prev_close).abs()),
                None => hl,
            };
            range.is_finite().then_some(range)
        })
        .collect();

    rolling_mean(&tr, FLOW_WINDOW)
}

/// 12/26 EMA difference. EMAs are seeded with the first defined close
/// (smoothing 2/(span+1), no bias adjustment); a missing close leaves the
/// row undefined while the EMA state carries over. The column is only
/// produced once the series reaches the slow span.
fn macd_column(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    if closes.len() < MACD_SLOW_SPAN {
        return vec![None; closes.len()];
    }

    let fast = ewm(closes, MACD_FAST_SPAN);
    let slow = ewm(closes, MACD_SLOW_SPAN);

    fast.into_iter()
        .zip(slow)
        .map(|(f, s)| f.zip(s).map(|(f, s)| f - s))
        .collect()
}

fn ewm(xs: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut state: Option<f64> = None;
    xs.iter()
        .map(|x| {
            let x = (*x)?;
            let next = match state {
                Some(prev) => alpha * x + (1.0 - alpha) * prev,
                None => x,
            };
            state = Some(next);
            Some(next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(i: usize, close: f64, volume: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2023, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(i as u64))
                .unwrap(),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        }
    }

    fn constant_series(n: usize, price: f64) -> Vec<PriceBar> {
        (0..n).map(|i| bar(i, price, 1000.0)).collect()
    }

    fn rising_series(n: usize) -> Vec<PriceBar> {
        (0..n).map(|i| bar(i, 100.0 + i as f64, 1000.0)).collect()
    }

    fn oscillating_series(n: usize) -> Vec<PriceBar> {
        (0..n)
            .map(|i| bar(i, 100.0 + 5.0 * ((i % 4) as f64 - 1.5), 1000.0))
            .collect()
    }

    #[test]
    fn test_short_history_leaves_windows_undefined() {
        let frame = IndicatorFrame::compute(&constant_series(10, 50.0));

        for row in frame.rows() {
            assert_eq!(row.vwap, None);
            assert_eq!(row.rsi, None);
            assert_eq!(row.mfi, None);
            assert_eq!(row.atr, None);
            assert_eq!(row.sma_14, None);
            assert_eq!(row.macd, None, "MACD requires the 26-bar slow span");
        }
        // OBV is the exception: a running sum defined from the first row.
        assert_eq!(frame.rows()[0].obv, Some(0.0));
    }

    #[test]
    fn test_vwap_of_constant_series_equals_price() {
        let frame = IndicatorFrame::compute(&constant_series(30, 50.0));

        let last = frame.latest().unwrap();
        assert!((last.vwap.unwrap() - 50.0).abs() < 1e-9);
        assert!(last.dist_vwap.unwrap().abs() < 1e-9);
        // First defined VWAP row is index 20 (21-session window).
        assert_eq!(frame.rows()[19].vwap, None);
        assert!(frame.rows()[20].vwap.is_some());
    }

    #[test]
    fn test_obv_monotonic_on_rising_closes() {
        let frame = IndicatorFrame::compute(&rising_series(40));

        let obv: Vec<f64> = frame.rows().iter().map(|r| r.obv.unwrap()).collect();
        assert!(obv.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(obv[0], 0.0);
        assert_eq!(obv[39], 39.0 * 1000.0);
    }

    #[test]
    fn test_rsi_bounds_and_downtrend_floor() {
        let frame = IndicatorFrame::compute(&oscillating_series(60));
        for row in frame.rows() {
            if let Some(rsi) = row.rsi {
                assert!((0.0..=100.0).contains(&rsi), "RSI out of bounds: {}", rsi);
            }
        }

        // Pure downtrend: mean gain is zero, ratio is zero, RSI pins at 0.
        let falling: Vec<PriceBar> = (0..30).map(|i| bar(i, 200.0 - i as f64, 1000.0)).collect();
        let frame = IndicatorFrame::compute(&falling);
        assert_eq!(frame.latest().unwrap().rsi, Some(0.0));

        // Pure uptrend: zero mean loss undefines the ratio rather than
        // clamping the oscillator.
        let frame = IndicatorFrame::compute(&rising_series(30));
        assert_eq!(frame.latest().unwrap().rsi, None);
    }

    #[test]
    fn test_mfi_bounds_where_defined() {
        let frame = IndicatorFrame::compute(&oscillating_series(60));
        let mut defined = 0;
        for row in frame.rows() {
            if let Some(mfi) = row.mfi {
                defined += 1;
                assert!((0.0..=100.0).contains(&mfi), "MFI out of bounds: {}", mfi);
            }
        }
        assert!(defined > 0, "expected MFI to be defined on mixed flows");
    }

    #[test]
    fn test_zero_close_undefines_covering_windows() {
        let mut bars = constant_series(40, 50.0);
        bars[30].close = 0.0;
        let frame = IndicatorFrame::compute(&bars);

        // Window rows covering index 30 lose their SMA_14; later rows recover.
        assert_eq!(frame.rows()[30].sma_14, None);
        assert_eq!(frame.rows()[35].sma_14, None);
        assert_eq!(frame.close(30), None);

        let recovered = IndicatorFrame::compute(&constant_series(60, 50.0));
        assert!(recovered.rows()[45].sma_14.is_some());
    }

    #[test]
    fn test_bollinger_bands_bracket_the_mean() {
        let frame = IndicatorFrame::compute(&oscillating_series(50));
        let last = frame.latest().unwrap();
        let (upper, lower, mid) = (
            last.bb_upper.unwrap(),
            last.bb_lower.unwrap(),
            last.sma_20.unwrap(),
        );
        assert!(upper > mid && mid > lower);
        assert!((upper + lower - 2.0 * mid).abs() < 1e-9);
    }

    #[test]
    fn test_available_features_tracks_history_length() {
        let frame = IndicatorFrame::compute(&oscillating_series(60));
        let available = frame.available_features();

        assert!(available.contains(&Feature::Vwap));
        assert!(available.contains(&Feature::Atr));
        assert!(available.contains(&Feature::Sma50));
        assert!(!available.contains(&Feature::Sma200));
        assert!(!available.contains(&Feature::DistSma200));

        let long = IndicatorFrame::compute(&oscillating_series(220));
        assert!(long.available_features().contains(&Feature::Sma200));
    }

    #[test]
    fn test_atr_positive_where_defined() {
        let frame = IndicatorFrame::compute(&oscillating_series(40));
        assert_eq!(frame.rows()[12].atr, None);
        let atr = frame.rows()[13].atr.unwrap();
        assert!(atr > 0.0);
    }
}
