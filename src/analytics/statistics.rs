//! Statistical helpers for duration metrics

use serde::{Deserialize, Serialize};

/// Average and percentile summary of a set of durations
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
}

impl DurationSummary {
    /// Summarize a dataset. An empty dataset yields all zeros.
    pub fn from_data(mut data: Vec<f64>) -> Self {
        if data.is_empty() {
            return Self::default();
        }

        data.sort_by(|a, b| a.total_cmp(b));

        Self {
            avg: mean(&data),
            p50: percentile(&data, 50.0),
            p90: percentile(&data, 90.0),
        }
    }
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Percentile (0-100) of sorted data.
///
/// With `idx = n * p`: a fractional `idx` selects the order statistic
/// `x[ceil(idx) - 1]`; an integral `idx` averages `x[idx - 1]` and `x[idx]`
/// when `n` is even and takes `x[idx]` when `n` is odd.
pub fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let n = sorted_data.len();
    let p = (percentile / 100.0).clamp(0.0, 1.0);

    if p == 0.0 {
        return sorted_data[0];
    }
    if p == 1.0 {
        return sorted_data[n - 1];
    }

    let index = n as f64 * p;
    if index.fract() != 0.0 {
        sorted_data[index.ceil() as usize - 1]
    } else {
        let index = index as usize;
        if n % 2 == 0 {
            (sorted_data[index - 1] + sorted_data[index]) / 2.0
        } else {
            sorted_data[index]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let summary = DurationSummary::from_data(data);

        assert!((summary.p50 - 5.5).abs() < 1e-9);
        assert!((summary.p90 - 9.5).abs() < 1e-9);
        assert!((summary.avg - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_three_values() {
        let summary = DurationSummary::from_data(vec![5.0, 1.0, 3.0]);
        assert_eq!(summary.avg, 3.0);
        assert_eq!(summary.p50, 3.0);
        assert_eq!(summary.p90, 5.0);
    }

    #[test]
    fn test_two_values() {
        let summary = DurationSummary::from_data(vec![2.0, 4.0]);
        assert_eq!(summary.p50, 3.0);
        assert_eq!(summary.p90, 4.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 100.0), 5.0);
        assert_eq!(percentile(&data, 40.0), 3.0);
        assert_eq!(percentile(&data, 50.0), 3.0);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(
            DurationSummary::from_data(vec![7.0]),
            DurationSummary { avg: 7.0, p50: 7.0, p90: 7.0 }
        );
        assert_eq!(DurationSummary::from_data(vec![]), DurationSummary::default());
    }
}
