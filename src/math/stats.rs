use ordered_float::OrderedFloat;

/// Arithmetic mean, `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the finite values; the two middle values are averaged for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<OrderedFloat<f64>> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1].0 + sorted[mid].0) / 2.0)
    } else {
        Some(sorted[mid].0)
    }
}

/// Sample standard deviation (`n - 1` denominator). Needs at least two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Close-to-close dispersion: `sqrt(mean(diff^2))` over consecutive differences.
pub fn close_to_close_std(series: &[f64]) -> Option<f64> {
    let squared: Vec<f64> = series.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();
    mean(&squared).map(f64::sqrt)
}

/// `max - min` of the sample, `None` when empty.
pub fn range(values: &[f64]) -> Option<f64> {
    let max = values.iter().copied().map(OrderedFloat).max()?;
    let min = values.iter().copied().map(OrderedFloat).min()?;
    Some(max.0 - min.0)
}

/// Largest present value and its index. Ties keep the first index seen.
pub fn first_max(values: &[Option<f64>]) -> Option<(usize, f64)> {
    first_extreme(values, |candidate, best| candidate > best)
}

/// Smallest present value and its index. Ties keep the first index seen.
pub fn first_min(values: &[Option<f64>]) -> Option<(usize, f64)> {
    first_extreme(values, |candidate, best| candidate < best)
}

fn first_extreme(
    values: &[Option<f64>],
    replaces: impl Fn(f64, f64) -> bool,
) -> Option<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .fold(None, |best, (i, x)| match best {
            Some((_, b)) if !replaces(x, b) => best,
            _ => Some((i, x)),
        })
}
