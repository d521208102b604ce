//! Local-maxima search over a 1D intensity trace.
//!
//! Behaves like `scipy.signal.find_peaks` restricted to the `height`, `distance`
//! and `prominence` filters:
//!
//! 1. A maximum is a strict rise, an optional flat plateau, then a strict fall.
//!    Plateaus report their midpoint (rounded down). The first and last points are
//!    never maxima.
//! 2. Filters run in the order height, distance, prominence.
//! 3. The distance filter visits maxima from highest to lowest and removes any
//!    lower neighbour closer than `distance` points. Among equal heights the
//!    later maximum is visited first, so it survives.
//! 4. Prominence is the height above the higher of the two lowest points reached
//!    before the trace climbs above the maximum on each side (or hits an end).

/// A local maximum that passed every filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalMaximum {
    /// Index into the input trace
    pub index: usize,
    /// Value at `index`
    pub height: f64,
    /// Height above the surrounding baseline
    pub prominence: f64,
}

/// Filters applied to local maxima
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakFilter {
    /// Minimum height (absolute)
    pub min_height: Option<f64>,
    /// Minimum prominence (absolute)
    pub min_prominence: Option<f64>,
    /// Minimum separation in points; 1 disables the filter
    pub distance: usize,
}

impl Default for PeakFilter {
    fn default() -> Self {
        Self {
            min_height: None,
            min_prominence: None,
            distance: 1,
        }
    }
}

/// Find local maxima that pass `filter`, sorted by index
pub fn find_local_maxima(data: &[f64], filter: &PeakFilter) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }

    let mut peaks = raw_maxima(data);

    if let Some(min_height) = filter.min_height {
        peaks.retain(|&i| data[i] >= min_height);
    }

    if filter.distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(data, peaks, filter.distance);
    }

    if let Some(min_prominence) = filter.min_prominence {
        peaks.retain(|&i| prominence(data, i) >= min_prominence);
    }

    peaks
}

/// Like [`find_local_maxima`], with heights and prominences attached
pub fn describe_maxima(data: &[f64], filter: &PeakFilter) -> Vec<LocalMaximum> {
    find_local_maxima(data, filter)
        .into_iter()
        .map(|index| LocalMaximum {
            index,
            height: data[index],
            prominence: prominence(data, index),
        })
        .collect()
}

fn raw_maxima(data: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    let last = data.len() - 1;
    let mut i = 1;

    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    maxima
}

fn select_by_distance(data: &[f64], peaks: Vec<usize>, distance: usize) -> Vec<usize> {
    // Highest first; equal heights from the highest index down
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| data[peaks[b]].total_cmp(&data[peaks[a]]).then(b.cmp(&a)));

    let mut keep = vec![true; peaks.len()];
    for &p in &priority {
        if !keep[p] {
            continue;
        }
        let mut j = p;
        while j > 0 && peaks[p] - peaks[j - 1] < distance {
            keep[j - 1] = false;
            j -= 1;
        }
        let mut j = p + 1;
        while j < peaks.len() && peaks[j] - peaks[p] < distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(peak))
        .collect()
}

/// Prominence of the point at `index`
pub fn prominence(data: &[f64], index: usize) -> f64 {
    let height = data[index];

    let mut left_min = height;
    for &v in data[..index].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &data[index + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_peak() {
        let data = [0.0, 1.0, 3.0, 1.0, 0.0];
        let peaks = describe_maxima(&data, &PeakFilter::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert_eq!(peaks[0].prominence, 3.0);
    }

    #[test]
    fn test_edges_are_not_maxima() {
        assert!(find_local_maxima(&[5.0, 3.0, 1.0, 3.0, 5.0], &PeakFilter::default()).is_empty());
        assert!(find_local_maxima(&[1.0, 2.0, 3.0, 4.0], &PeakFilter::default()).is_empty());
        assert!(find_local_maxima(&[1.0, 2.0], &PeakFilter::default()).is_empty());
    }

    #[test]
    fn test_plateau_midpoint() {
        let data = [0.0, 1.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        assert_eq!(find_local_maxima(&data, &PeakFilter::default()), vec![3]);

        let even = [0.0, 3.0, 3.0, 0.0];
        assert_eq!(find_local_maxima(&even, &PeakFilter::default()), vec![1]);

        // A plateau that runs into the end is not a maximum
        assert!(find_local_maxima(&[0.0, 3.0, 3.0, 3.0], &PeakFilter::default()).is_empty());
    }

    #[test]
    fn test_height_filter() {
        let data = [0.0, 1.0, 0.0, 5.0, 0.0];
        let filter = PeakFilter {
            min_height: Some(2.0),
            ..PeakFilter::default()
        };
        assert_eq!(find_local_maxima(&data, &filter), vec![3]);
    }

    #[test]
    fn test_distance_keeps_higher_peak() {
        let data = [0.0, 3.0, 1.0, 2.0, 0.0];
        let filter = PeakFilter {
            distance: 3,
            ..PeakFilter::default()
        };
        assert_eq!(find_local_maxima(&data, &filter), vec![1]);

        let data = [0.0, 2.0, 1.0, 3.0, 0.0];
        assert_eq!(find_local_maxima(&data, &filter), vec![3]);
    }

    #[test]
    fn test_distance_equal_heights_keep_later_peak() {
        let filter = PeakFilter {
            distance: 3,
            ..PeakFilter::default()
        };
        assert_eq!(find_local_maxima(&[0.0, 5.0, 1.0, 5.0, 0.0], &filter), vec![3]);

        // Three equal maxima two points apart: the last removes the middle one,
        // the first is far enough away to stay
        let data = [0.0, 4.0, 0.0, 4.0, 0.0, 4.0, 0.0];
        assert_eq!(find_local_maxima(&data, &filter), vec![1, 5]);
    }

    #[test]
    fn test_prominence_filter() {
        // Shoulder at 3 sits on the flank of the main peak
        let data = [0.0, 5.0, 4.0, 4.5, 0.0];
        assert_eq!(prominence(&data, 3), 0.5);
        let filter = PeakFilter {
            min_prominence: Some(2.0),
            ..PeakFilter::default()
        };
        assert_eq!(find_local_maxima(&data, &filter), vec![1]);
    }

    #[test]
    fn test_distance_runs_before_prominence() {
        // The low-prominence shoulder at 3 is removed by distance from the
        // higher maximum at 1, leaving 1 for the prominence check.
        let data = [0.0, 10.0, 9.0, 9.5, 0.0, 0.0];
        let filter = PeakFilter {
            min_height: Some(1.0),
            min_prominence: Some(0.5),
            distance: 3,
        };
        assert_eq!(find_local_maxima(&data, &filter), vec![1]);
    }
}
