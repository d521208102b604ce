use super::peaks::{find_local_maxima, PeakFilter};
use super::{mass_error_ppm, DetectionCandidate, PeakMode, TruePeakParams};

/// Windows larger than this get a local-maxima search in [`locate_above_floor`]
pub const SWEEP_MIN_WINDOW_POINTS: usize = 3;

/// Index range `[lo, hi)` with `target - tolerance <= mz <= target + tolerance`
fn window(mz: &[f64], target: f64, tolerance: f64) -> (usize, usize) {
    let lo = mz.partition_point(|&m| m < target - tolerance);
    let hi = mz.partition_point(|&m| m <= target + tolerance);
    (lo, hi.max(lo))
}

/// Index of the first maximum; NaN values never win
fn first_argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}

/// Highest of `indices` (first on ties)
fn highest(values: &[f64], indices: &[usize]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &i in indices {
        match best {
            Some(b) if values[i] <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

fn candidate(
    mz: f64,
    intensity: f64,
    target: f64,
    window_points: usize,
    mode: PeakMode,
) -> DetectionCandidate {
    DetectionCandidate {
        mz,
        intensity,
        mass_error_ppm: mass_error_ppm(mz, target),
        window_points,
        mode,
    }
}

/// Find the best peak within `tolerance` Da of `target`.
///
/// Windows with more than `params.min_window_points` points are searched for local
/// maxima (height >= `height_fraction` of the window maximum, at least
/// `min_distance` points apart, prominence >= `prominence_fraction` of the window
/// maximum) and the highest one is returned as [`PeakMode::TruePeak`]. Smaller
/// windows, or windows where no maximum survives, return the first global maximum
/// as [`PeakMode::SimpleMax`].
///
/// `mz` must be ascending. Returns `None` only when the window is empty or the
/// target is not positive.
pub fn locate(
    mz: &[f64],
    intensity: &[f64],
    target: f64,
    tolerance: f64,
    params: &TruePeakParams,
) -> Option<DetectionCandidate> {
    if target.is_nan() || target <= 0.0 {
        return None;
    }
    let n = mz.len().min(intensity.len());
    let (lo, hi) = window(&mz[..n], target, tolerance);
    if lo == hi {
        return None;
    }

    let window_mz = &mz[lo..hi];
    let window_int = &intensity[lo..hi];
    let points = window_int.len();
    let max_idx = first_argmax(window_int);

    if points > params.min_window_points {
        let max_intensity = window_int[max_idx];
        let filter = PeakFilter {
            min_height: Some(max_intensity * params.height_fraction),
            min_prominence: Some(max_intensity * params.prominence_fraction),
            distance: params.min_distance.max(1),
        };
        let maxima = find_local_maxima(window_int, &filter);
        if let Some(i) = highest(window_int, &maxima) {
            return Some(candidate(window_mz[i], window_int[i], target, points, PeakMode::TruePeak));
        }
    }

    Some(candidate(
        window_mz[max_idx],
        window_int[max_idx],
        target,
        points,
        PeakMode::SimpleMax,
    ))
}

/// Sweep-time variant of [`locate`] that rejects weak windows.
///
/// Returns `None` when the window is empty or its maximum is below `floor`.
/// Windows with more than [`SWEEP_MIN_WINDOW_POINTS`] points return the highest
/// local maximum at or above `floor` (no distance or prominence filter); otherwise
/// the window maximum is returned.
pub fn locate_above_floor(
    mz: &[f64],
    intensity: &[f64],
    target: f64,
    tolerance: f64,
    floor: f64,
) -> Option<DetectionCandidate> {
    if target.is_nan() || target <= 0.0 {
        return None;
    }
    let n = mz.len().min(intensity.len());
    let (lo, hi) = window(&mz[..n], target, tolerance);
    if lo == hi {
        return None;
    }

    let window_mz = &mz[lo..hi];
    let window_int = &intensity[lo..hi];
    let points = window_int.len();
    let max_idx = first_argmax(window_int);

    let window_max = window_int[max_idx];
    if window_max.is_nan() || window_max < floor {
        return None;
    }

    if points > SWEEP_MIN_WINDOW_POINTS {
        let filter = PeakFilter {
            min_height: Some(floor),
            ..PeakFilter::default()
        };
        let maxima = find_local_maxima(window_int, &filter);
        if let Some(i) = highest(window_int, &maxima) {
            return Some(candidate(window_mz[i], window_int[i], target, points, PeakMode::TruePeak));
        }
    }

    Some(candidate(
        window_mz[max_idx],
        window_int[max_idx],
        target,
        points,
        PeakMode::SimpleMax,
    ))
}
