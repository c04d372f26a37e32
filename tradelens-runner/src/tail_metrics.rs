//! Tail risk metrics — empirical VaR, CVaR, skewness, kurtosis.
//!
//! All functions are pure: per-trade PnL in, scalar out. VaR is the plain
//! empirical percentile of the PnL distribution; no distributional fit.

use serde::{Deserialize, Serialize};

use crate::metrics::{finite, mean, population_std};

/// Confidence level behind the headline `var_95` / `cvar_95` fields.
pub const HEADLINE_CONFIDENCE: f64 = 0.95;

/// VaR and CVaR at a single confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    pub confidence: f64,
    pub var: Option<f64>,
    pub cvar: Option<f64>,
}

/// Distribution-shape statistics of per-trade PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailRisk {
    pub estimates: Vec<VarEstimate>,
    /// Third standardized moment. Negative = heavier loss tail.
    pub skewness: Option<f64>,
    /// Fourth standardized moment minus 3.
    pub excess_kurtosis: Option<f64>,
    pub sample_size: usize,
}

impl TailRisk {
    pub fn compute(pnls: &[f64], confidence_levels: &[f64]) -> Self {
        let estimates = confidence_levels
            .iter()
            .map(|&confidence| VarEstimate {
                confidence,
                var: value_at_risk(pnls, confidence),
                cvar: conditional_var(pnls, confidence),
            })
            .collect();

        Self {
            estimates,
            skewness: skewness(pnls),
            excess_kurtosis: excess_kurtosis(pnls),
            sample_size: pnls.len(),
        }
    }
}

/// Linear-interpolation percentile of `values`, `q` in [0, 1].
///
/// Rank `h = (n - 1) * q`, interpolated between the two closest order
/// statistics. `None` if the interpolation leaves the finite range.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut h = (sorted.len() - 1) as f64 * q;
    // absorb representation error of `1 - confidence` (0.05 → 0.050000000000000044)
    if (h - h.round()).abs() < 1e-9 {
        h = h.round();
    }
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    finite(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Empirical VaR: the `(1 - confidence)` percentile of per-trade PnL.
///
/// Reported as a PnL value, so losses are negative.
pub fn value_at_risk(pnls: &[f64], confidence: f64) -> Option<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return None;
    }
    percentile(pnls, 1.0 - confidence)
}

/// Mean of every PnL at or below the VaR threshold.
pub fn conditional_var(pnls: &[f64], confidence: f64) -> Option<f64> {
    let var = value_at_risk(pnls, confidence)?;
    let tail: Vec<f64> = pnls.iter().copied().filter(|p| *p <= var).collect();
    mean(&tail).and_then(finite)
}

/// Population skewness; `None` below 3 observations or with zero variance.
pub fn skewness(pnls: &[f64]) -> Option<f64> {
    if pnls.len() < 3 {
        return None;
    }
    let (m, std) = moments_base(pnls)?;
    let n = pnls.len() as f64;
    finite(pnls.iter().map(|p| ((p - m) / std).powi(3)).sum::<f64>() / n)
}

/// Population excess kurtosis; `None` below 4 observations or with zero
/// variance.
pub fn excess_kurtosis(pnls: &[f64]) -> Option<f64> {
    if pnls.len() < 4 {
        return None;
    }
    let (m, std) = moments_base(pnls)?;
    let n = pnls.len() as f64;
    finite(pnls.iter().map(|p| ((p - m) / std).powi(4)).sum::<f64>() / n - 3.0)
}

fn moments_base(pnls: &[f64]) -> Option<(f64, f64)> {
    if pnls.iter().all(|p| *p == pnls[0]) {
        return None;
    }
    let m = mean(pnls)?;
    let std = population_std(pnls)?;
    if !m.is_finite() || !(std > 0.0 && std.is_finite()) {
        return None;
    }
    Some((m, std))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    // ── Percentile ──

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 1.0), Some(4.0));
        // h = 3 * 0.5 = 1.5 → 2.5
        assert_eq!(percentile(&v, 0.5), Some(2.5));
    }

    #[test]
    fn percentile_ignores_input_order() {
        assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 0.5), Some(2.5));
    }

    #[test]
    fn percentile_rejects_empty_and_out_of_range() {
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[1.0], 1.5), None);
    }

    // ── VaR / CVaR ──

    #[test]
    fn var_on_exact_rank() {
        // 21 values → h = 20 * 0.05 = 1 → second smallest
        let v: Vec<f64> = (-10..=10).map(|i| i as f64).collect();
        assert_eq!(value_at_risk(&v, 0.95), Some(-9.0));
        assert_eq!(conditional_var(&v, 0.95), Some(-9.5));
    }

    #[test]
    fn var_between_ranks() {
        // 1..=10, h = 9 * 0.05 = 0.45 → 1 + 0.45 * (2 - 1)
        let var = value_at_risk(&one_to(10), 0.95).unwrap();
        assert!((var - 1.45).abs() < 1e-12);
        assert_eq!(conditional_var(&one_to(10), 0.95), Some(1.0));
    }

    #[test]
    fn var_single_trade() {
        assert_eq!(value_at_risk(&[-3.0], 0.95), Some(-3.0));
        assert_eq!(conditional_var(&[-3.0], 0.95), Some(-3.0));
    }

    #[test]
    fn var_undefined() {
        assert_eq!(value_at_risk(&[], 0.95), None);
        assert_eq!(conditional_var(&[], 0.95), None);
        assert_eq!(value_at_risk(&[1.0], 1.0), None);
        assert_eq!(value_at_risk(&[1.0], 0.0), None);
    }

    #[test]
    fn cvar_never_above_var() {
        let v = [5.0, -2.0, 7.5, -11.0, 0.0, 3.25, -4.0];
        for c in [0.5, 0.9, 0.95, 0.99] {
            assert!(conditional_var(&v, c).unwrap() <= value_at_risk(&v, c).unwrap());
        }
    }

    #[test]
    fn overflowing_inputs_yield_none() {
        let v = [f64::MAX, f64::MAX, -f64::MAX, -f64::MAX];
        assert_eq!(value_at_risk(&v, 0.95), Some(-f64::MAX));
        assert_eq!(conditional_var(&v, 0.95), None);
        assert_eq!(percentile(&[-f64::MAX, f64::MAX], 0.5), None);
        assert_eq!(skewness(&v), None);
        assert_eq!(excess_kurtosis(&v), None);
    }

    // ── Moments ──

    #[test]
    fn symmetric_distribution_has_zero_skew() {
        let s = skewness(&[-2.0, -1.0, 0.0, 1.0, 2.0]).unwrap();
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn loss_tail_skews_negative() {
        let s = skewness(&[1.0, 1.0, 1.0, 1.0, -20.0]).unwrap();
        assert!(s < 0.0);
    }

    #[test]
    fn uniform_kurtosis_is_negative() {
        let k = excess_kurtosis(&one_to(100)).unwrap();
        assert!((k - (-1.2)).abs() < 0.01, "{k}");
    }

    #[test]
    fn moments_need_observations_and_variance() {
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(excess_kurtosis(&[1.0, 2.0, 3.0]), None);
        assert_eq!(skewness(&[2.0, 2.0, 2.0]), None);
        assert_eq!(excess_kurtosis(&[2.0, 2.0, 2.0, 2.0]), None);
    }

    // ── Aggregate ──

    #[test]
    fn tail_risk_has_one_estimate_per_level() {
        let tail = TailRisk::compute(&one_to(50), &[0.9, 0.95, 0.99]);
        assert_eq!(tail.estimates.len(), 3);
        assert_eq!(tail.estimates[1].confidence, 0.95);
        assert_eq!(tail.sample_size, 50);
        assert!(tail.estimates[2].var.unwrap() <= tail.estimates[0].var.unwrap());
    }
}
