//! Gap-filling kernels used by the missing-value imputer.
//!
//! Each kernel fills in place and returns how many cells it filled. None of
//! them invent values outside the observed range: leading gaps survive
//! forward fill, and both leading and trailing gaps survive interpolation.

pub fn fill_constant(values: &mut [Option<f64>], fill: f64) -> usize {
    let mut filled = 0;
    for slot in values.iter_mut().filter(|slot| slot.is_none()) {
        *slot = Some(fill);
        filled += 1;
    }
    filled
}

/// Linear interpolation over row position between the nearest known
/// neighbours on both sides.
pub fn interpolate_linear(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut previous: Option<(usize, f64)> = None;
    let mut idx = 0;
    while idx < values.len() {
        match values[idx] {
            Some(value) => {
                previous = Some((idx, value));
                idx += 1;
            }
            None => {
                let gap_start = idx;
                while idx < values.len() && values[idx].is_none() {
                    idx += 1;
                }
                let next = values.get(idx).copied().flatten().map(|v| (idx, v));
                if let (Some((left_idx, left)), Some((right_idx, right))) = (previous, next) {
                    let span = (right_idx - left_idx) as f64;
                    for (pos, slot) in values.iter_mut().enumerate().take(idx).skip(gap_start) {
                        let offset = (pos - left_idx) as f64;
                        *slot = Some(left + (right - left) * offset / span);
                        filled += 1;
                    }
                }
            }
        }
    }
    filled
}

pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) -> usize {
    let mut filled = 0;
    let mut last: Option<T> = None;
    for slot in values.iter_mut() {
        match slot {
            Some(value) => last = Some(value.clone()),
            None => {
                if let Some(value) = &last {
                    *slot = Some(value.clone());
                    filled += 1;
                }
            }
        }
    }
    filled
}
