//! Summary statistics over the trial axis.

/// Arithmetic mean. `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub fn std_dev(values: &[f64]) -> f64 {
    let mu = mean(values);
    let var = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Smallest value, ignoring NaN. `None` if nothing remains.
pub fn min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .min_by(|a, b| a.total_cmp(b))
}

/// Per-column mean and population std of a `trials x points` series.
///
/// `series[t][i]` is trial `t` at point `i`; every trial must have the same
/// length.
pub fn column_stats(series: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let points = series.first().map_or(0, Vec::len);
    let mut means = Vec::with_capacity(points);
    let mut stds = Vec::with_capacity(points);

    let mut column = Vec::with_capacity(series.len());
    for i in 0..points {
        column.clear();
        column.extend(series.iter().map(|trial| trial[i]));
        means.push(mean(&column));
        stds.push(std_dev(&column));
    }

    (means, stds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn test_std_single_value_is_zero() {
        assert_eq!(std_dev(&[3.5]), 0.0);
    }

    #[test]
    fn test_column_stats_across_trials() {
        let series = vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]];
        let (means, stds) = column_stats(&series);
        assert_eq!(means, vec![2.0, 2.0, 2.0]);
        assert_eq!(stds, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_min_ignores_nan() {
        assert_eq!(min(&[3.0, f64::NAN, -1.5, 2.0]), Some(-1.5));
        assert_eq!(min(&[]), None);
    }
}
