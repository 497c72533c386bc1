//! Dip detection over a fixed candle window.

use rust_decimal::Decimal;
use tracing::debug;

use crate::exchange::Candle;
use crate::utils::decimal::{parse_decimal, relative_change};

/// Compares the close-to-close change across a window with a negative threshold.
#[derive(Debug, Clone, Copy)]
pub struct DipDetector {
    threshold: Decimal,
}

impl DipDetector {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    /// `(close[newest] - close[oldest]) / close[oldest]` for a newest-first batch.
    ///
    /// `None` when the batch is empty, a close does not parse, or the oldest close is zero.
    pub fn dip_ratio(candles: &[Candle]) -> Option<Decimal> {
        let closes = candles
            .iter()
            .map(|c| parse_decimal(&c.close))
            .collect::<Option<Vec<_>>>()?;
        let newest = *closes.first()?;
        let oldest = *closes.last()?;
        relative_change(newest, oldest)
    }

    /// True iff exactly `n` candles were given and their ratio is below the threshold.
    ///
    /// Missing or malformed data is "no signal", never an error.
    pub fn is_dip(&self, n: usize, candles: &[Candle]) -> bool {
        if n == 0 || candles.len() != n {
            debug!(expected = n, got = candles.len(), "Candle count mismatch, no signal");
            return false;
        }

        let Some(ratio) = Self::dip_ratio(candles) else {
            debug!("Unusable close prices, no signal");
            return false;
        };

        if ratio > Decimal::ZERO {
            debug!(%ratio, "Price rose over the window");
            return false;
        }

        let dip = ratio < self.threshold;
        debug!(%ratio, threshold = %self.threshold, dip, "Dip ratio");
        dip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candles(closes: &[&str]) -> Vec<Candle> {
        let newest = 1_700_000_000_000i64;
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                start: newest - 60_000 * i as i64,
                open: "1".to_string(),
                high: "1".to_string(),
                low: "1".to_string(),
                close: close.to_string(),
                volume: "1".to_string(),
                turnover: "1".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_ratio_uses_oldest_as_denominator() {
        // (100 - 98) / 98
        let ratio = DipDetector::dip_ratio(&candles(&["100", "98"])).unwrap();
        assert_eq!(ratio, dec!(2) / dec!(98));
        assert!(ratio > dec!(0.0204) && ratio < dec!(0.0205));
    }

    #[test]
    fn test_rise_is_not_a_dip() {
        let detector = DipDetector::new(dec!(-0.01));
        assert!(!detector.is_dip(2, &candles(&["100", "98"])));
    }

    #[test]
    fn test_decline_past_threshold_is_a_dip() {
        let detector = DipDetector::new(dec!(-0.01));
        // (98 - 100) / 100 = -0.02
        assert!(detector.is_dip(2, &candles(&["98", "100"])));
        // (99.5 - 100) / 100 = -0.005
        assert!(!detector.is_dip(2, &candles(&["99.5", "100"])));
    }

    #[test]
    fn test_threshold_is_strict() {
        let detector = DipDetector::new(dec!(-0.01));
        assert!(!detector.is_dip(2, &candles(&["99", "100"])));
        assert!(detector.is_dip(2, &candles(&["98.99", "100"])));
    }

    #[test]
    fn test_only_window_endpoints_matter() {
        let detector = DipDetector::new(dec!(-0.002));
        // middle candle spikes down but endpoints are flat
        assert!(!detector.is_dip(3, &candles(&["100", "50", "100"])));
        assert!(detector.is_dip(3, &candles(&["99", "150", "100"])));
    }

    #[test]
    fn test_wrong_count_is_no_signal() {
        let detector = DipDetector::new(dec!(-0.01));
        let batch = candles(&["90", "100"]);
        assert!(!detector.is_dip(3, &batch));
        assert!(!detector.is_dip(1, &batch));
        assert!(!detector.is_dip(0, &[]));
    }

    #[test]
    fn test_unparseable_close_is_no_signal() {
        let detector = DipDetector::new(dec!(-0.01));
        assert!(!detector.is_dip(2, &candles(&["90", "abc"])));
        assert!(!detector.is_dip(2, &candles(&["", "100"])));
        assert!(!detector.is_dip(2, &candles(&["90", "0"])));
    }
}
