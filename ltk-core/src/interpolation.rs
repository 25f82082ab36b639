//! Linear interpolation for filling gaps in series data.

/// A single known point used as an interpolation anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub value: f64,
}

/// Value on the straight line through `start` and `end` at position `x`.
///
/// If both anchors share the same position the start value is returned.
pub fn interpolate_pair(start: &DataPoint, end: &DataPoint, x: f64) -> f64 {
    let dx = end.x - start.x;
    if dx == 0.0 {
        return start.value;
    }
    let slope = (end.value - start.value) / dx;
    start.value + slope * (x - start.x)
}

/// Fill interior gaps of `values` by linear interpolation against `xs`.
///
/// `xs` must be sorted and the same length as `values`. Only gaps with a
/// known value on both sides are filled; leading and trailing gaps stay
/// `None`.
pub fn fill_interior_gaps(xs: &[f64], values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = values.to_vec();
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    for pair in known.windows(2) {
        let (i, j) = (pair[0], pair[1]);
        if j - i <= 1 {
            continue;
        }
        let start = DataPoint {
            x: xs[i],
            value: values[i].unwrap_or_default(),
        };
        let end = DataPoint {
            x: xs[j],
            value: values[j].unwrap_or_default(),
        };
        for (k, slot) in result.iter_mut().enumerate().take(j).skip(i + 1) {
            *slot = Some(interpolate_pair(&start, &end, xs[k]));
        }
    }

    result
}
