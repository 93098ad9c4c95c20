//! Equal-width binning with right-closed intervals.
//!
//! Edges are spaced evenly between the minimum and maximum, then the first
//! edge is pushed left by 0.1% of the range so the minimum falls inside the
//! first `(low, high]` interval. A single repeated value gets a tiny
//! interval around it instead.

/// One histogram interval `(low, high]` and the number of values inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub low: f64,
    pub high: f64,
    pub count: usize,
}

/// Bin `values` into `min(max_bins, distinct values)` equal-width intervals.
///
/// Every value lands in exactly one bin, so the counts sum to
/// `values.len()`. Empty bins are kept; callers decide whether to show them.
pub fn equal_width_bins(values: &[f64], max_bins: usize) -> Vec<Bin> {
    let edges = bin_edges(values, max_bins);
    if edges.len() < 2 {
        return Vec::new();
    }
    let mut counts = vec![0usize; edges.len() - 1];
    let last = counts.len() - 1;
    for &v in values {
        let idx = edges.partition_point(|e| *e < v).saturating_sub(1).min(last);
        counts[idx] += 1;
    }
    edges
        .windows(2)
        .zip(counts)
        .map(|(w, count)| Bin {
            low: w[0],
            high: w[1],
            count,
        })
        .collect()
}

fn bin_edges(values: &[f64], max_bins: usize) -> Vec<f64> {
    let Some((min, max)) = bounds(values) else {
        return Vec::new();
    };
    let n = distinct(values).min(max_bins).max(1);

    let mut edges = if min == max {
        let pad = |v: f64| if v == 0.0 { 0.001 } else { 0.001 * v.abs() };
        linspace(min - pad(min), max + pad(max), n + 1)
    } else {
        let mut edges = linspace(min, max, n + 1);
        edges[0] -= (max - min) * 0.001;
        edges
    };
    edges.dedup();
    edges
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        None => Some((v, v)),
    })
}

fn distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// `count` evenly spaced points from `start` to `stop`, both included.
fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let step = (stop - start) / (count - 1) as f64;
    let mut points: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
    if let Some(last) = points.last_mut() {
        *last = stop;
    }
    points
}
