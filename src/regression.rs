//! Workload/stress trend estimation
//!
//! Ordinary least squares over paired samples, used to draw an
//! illustrative "stress vs. workload" trend line.

use crate::dates::round2;
use crate::types::{Regression, TrendPoint, WorkloadStressPoint};

/// Fit `y = a + b * x` over the first `min(xs.len(), ys.len())` pairs.
///
/// Non-finite samples are treated as 0. With no samples the result is
/// `{a: 0, b: 0}`; when every x is equal (including a single sample) the
/// line is horizontal at the mean of y. Sums too large to represent also
/// give the horizontal line, so the result is always finite.
pub fn compute_regression(xs: &[f64], ys: &[f64]) -> Regression {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return Regression::default();
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_xy = 0.0;

    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let x = finite_or_zero(x);
        let y = finite_or_zero(y);
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }

    let n = n as f64;
    let flat = Regression {
        a: finite_or_zero(sum_y / n),
        b: 0.0,
    };
    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 || !denom.is_finite() {
        return flat;
    }

    let b = (n * sum_xy - sum_x * sum_y) / denom;
    let a = (sum_y - b * sum_x) / n;
    if a.is_finite() && b.is_finite() {
        Regression { a, b }
    } else {
        flat
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Fit workload against stress over a series
pub fn fit_workload_vs_stress(series: &[WorkloadStressPoint]) -> Regression {
    let xs: Vec<f64> = series.iter().map(|p| p.workload as f64).collect();
    let ys: Vec<f64> = series.iter().map(|p| p.stress).collect();
    compute_regression(&xs, &ys)
}

/// Attach the fitted value (2 dp) to every point of the series
pub fn project_trend(series: &[WorkloadStressPoint], regression: Regression) -> Vec<TrendPoint> {
    series
        .iter()
        .map(|point| TrendPoint {
            label: point.label.clone(),
            workload: point.workload,
            stress: point.stress,
            predicted: round2(regression.predict(point.workload as f64)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_regression(&[], &[]), Regression { a: 0.0, b: 0.0 });
    }

    #[test]
    fn test_single_point_is_horizontal() {
        assert_eq!(compute_regression(&[5.0], &[3.0]), Regression { a: 3.0, b: 0.0 });
    }

    #[test]
    fn test_exact_fit() {
        let reg = compute_regression(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]);
        assert!((reg.a - 1.0).abs() < 1e-12);
        assert!((reg.b - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_x_uses_mean() {
        let reg = compute_regression(&[0.0, 0.0, 0.0], &[1.0, 2.0, 6.0]);
        assert_eq!(reg, Regression { a: 3.0, b: 0.0 });
    }

    #[test]
    fn test_mismatched_lengths_use_shorter() {
        let reg = compute_regression(&[0.0, 1.0, 2.0, 99.0], &[1.0, 3.0, 5.0]);
        assert!((reg.a - 1.0).abs() < 1e-12);
        assert!((reg.b - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_samples_are_zeroed() {
        let reg = compute_regression(&[f64::NAN, 1.0, 2.0], &[1.0, f64::INFINITY, 5.0]);
        assert!(reg.a.is_finite());
        assert!(reg.b.is_finite());
        // equivalent to ([0, 1, 2], [1, 0, 5])
        assert_eq!(reg, compute_regression(&[0.0, 1.0, 2.0], &[1.0, 0.0, 5.0]));
    }

    #[test]
    fn test_overflowing_sums_stay_finite() {
        let reg = compute_regression(&[1e200, 2e200, 3e200], &[1.0, 2.0, 3.0]);
        assert_eq!(reg, Regression { a: 2.0, b: 0.0 });

        let reg = compute_regression(&[0.0, 0.0], &[f64::MAX, f64::MAX]);
        assert_eq!(reg, Regression { a: 0.0, b: 0.0 });
    }

    #[test]
    fn test_project_trend() {
        let series = vec![
            WorkloadStressPoint {
                label: "Jan 2024".to_string(),
                workload: 0,
                stress: 1.0,
            },
            WorkloadStressPoint {
                label: "Feb 2024".to_string(),
                workload: 2,
                stress: 5.0,
            },
        ];
        let reg = fit_workload_vs_stress(&series);
        let trend = project_trend(&series, reg);

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].predicted, 1.0);
        assert_eq!(trend[1].predicted, 5.0);
        assert_eq!(trend[1].label, "Feb 2024");
    }
}
