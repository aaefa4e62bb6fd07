//! Numeric helpers shared by generated datasets.

/// `count` evenly spaced values from `start` to `stop`, inclusive.
/// A single value is just `start`.
#[must_use]
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (count - 1) as f64;
            (0..count)
                .map(|idx| start + (stop - start) * (idx as f64 / last))
                .collect()
        }
    }
}

/// How many values `arange_inclusive` would produce, or `None` if that doesn't fit a `usize`.
#[must_use]
pub fn arange_len(min: f64, max: f64, step: f64) -> Option<usize> {
    if max < min || step <= 0.0 {
        return Some(0);
    }
    // Slack so that e.g. (0, 1, 0.1) includes 1.0 despite float error.
    let steps = ((max - min) / step + 1e-9).floor();
    if !(0.0..usize::MAX as f64).contains(&steps) {
        return None;
    }
    (steps as usize).checked_add(1)
}

/// Values `min, min + step, ...` up to and including `max` (give or take rounding).
/// Empty if `max < min`. Callers bound the length with [`arange_len`] first.
#[must_use]
pub fn arange_inclusive(min: f64, max: f64, step: f64) -> Vec<f64> {
    let count = arange_len(min, max, step).unwrap_or(0);
    (0..count).map(|idx| min + step * idx as f64).collect()
}

/// Sorted, deduplicated copy of `values`. NaNs are dropped.
#[must_use]
pub fn sorted_unique(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// The span covered by cell centres `values` (sorted), extended by half a cell on each side.
/// A single centre gets a unit-wide cell.
#[must_use]
pub fn cell_range(values: &[f64]) -> (f64, f64) {
    match values {
        [] => (0.0, 1.0),
        [only] => (only - 0.5, only + 0.5),
        [first, .., last] => {
            let half = (last - first) / (values.len() - 1) as f64 / 2.0;
            (first - half, last + half)
        }
    }
}
