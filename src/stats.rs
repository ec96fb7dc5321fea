use anyhow::{bail, Result};
use ndarray::{Array2, Axis};

use crate::results::{MetricEvaluator, ResultsGrid};

/// Register the standard suite of adjacency statistics on a grid.
pub fn add_network_stats<M>(grid: &mut ResultsGrid<M>) {
    grid.register(
        "Average degree",
        MetricEvaluator::adjacency(|a| a.sum() / a.nrows() as f64),
    );
    grid.register(
        "Max out-degree",
        MetricEvaluator::adjacency(|a| axis_sum_extreme(a, Axis(1), f64::max)),
    );
    grid.register(
        "Min out-degree",
        MetricEvaluator::adjacency(|a| axis_sum_extreme(a, Axis(1), f64::min)),
    );
    grid.register(
        "Max in-degree",
        MetricEvaluator::adjacency(|a| axis_sum_extreme(a, Axis(0), f64::max)),
    );
    grid.register(
        "Min in-degree",
        MetricEvaluator::adjacency(|a| axis_sum_extreme(a, Axis(0), f64::min)),
    );
    grid.register(
        "Self-loop density",
        MetricEvaluator::adjacency(|a| a.diag().mean().unwrap_or(f64::NAN)),
    );
}

// f64::max and f64::min ignore the NaN seed, so only an empty matrix
// yields NaN.
fn axis_sum_extreme(a: &Array2<f64>, axis: Axis, pick: fn(f64, f64) -> f64) -> f64 {
    a.sum_axis(axis).iter().copied().fold(f64::NAN, pick)
}

/// Mean squared difference where equal cells count as zero, so matching
/// infinities do not poison the mean with `inf - inf`.
pub fn robust_mse(x: &Array2<f64>, y: &Array2<f64>) -> Result<f64> {
    if x.dim() != y.dim() {
        bail!(
            "shape mismatch: {:?} vs {:?}",
            x.dim(),
            y.dim()
        );
    }
    let mut total = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let diff = if a == b { 0.0 } else { a - b };
        total += diff * diff;
    }
    Ok(total / x.len() as f64)
}

/// Ratio of the robust MSE of two estimates against a shared truth.
pub fn rel_mse(estimate_1: &Array2<f64>, estimate_2: &Array2<f64>, truth: &Array2<f64>) -> Result<f64> {
    Ok(robust_mse(estimate_1, truth)? / robust_mse(estimate_2, truth)?)
}
