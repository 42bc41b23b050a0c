//! Segment planning: split a total duration into fixed-length windows.

use crate::defaults::MAX_SEGMENTS;
use crate::error::{LongscribeError, Result};
use serde::{Deserialize, Serialize};

/// A bounded time slice of the source media scheduled for independent processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentWindow {
    /// Zero-based position in the plan.
    pub index: usize,
    /// Offset of the window start within the source, in seconds.
    pub start_offset_secs: f64,
    /// Length of the window in seconds.
    pub length_secs: f64,
}

impl SegmentWindow {
    /// One-based segment number, as shown to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// End offset of the window in seconds.
    pub fn end_offset_secs(&self) -> f64 {
        self.start_offset_secs + self.length_secs
    }
}

/// Number of windows planned for a duration.
///
/// Always `floor(total / length) + 1`: an exact multiple gets one trailing
/// window starting at end-of-input, which the producer turns into an empty
/// or failed segment. `None` when the count would exceed [`MAX_SEGMENTS`].
pub fn window_count(total_duration_secs: f64, segment_length_secs: f64) -> Option<usize> {
    if !(total_duration_secs.is_finite() && segment_length_secs > 0.0) || total_duration_secs < 0.0
    {
        return Some(1);
    }
    let whole = (total_duration_secs / segment_length_secs).floor();
    if whole >= MAX_SEGMENTS as f64 {
        return None;
    }
    Some(whole as usize + 1)
}

/// Plans contiguous, ordered windows covering `total_duration_secs`.
///
/// Every window carries the fixed segment length; coverage
/// (`count * length`) is therefore always at least the total duration.
pub fn plan(total_duration_secs: f64, segment_length_secs: f64) -> Result<Vec<SegmentWindow>> {
    let count = window_count(total_duration_secs, segment_length_secs).ok_or_else(|| {
        LongscribeError::Planning {
            message: format!(
                "Duration {}s needs more than {} segments of {}s",
                total_duration_secs, MAX_SEGMENTS, segment_length_secs
            ),
        }
    })?;
    Ok((0..count)
        .map(|index| SegmentWindow {
            index,
            start_offset_secs: index as f64 * segment_length_secs,
            length_secs: segment_length_secs,
        })
        .collect())
}

/// Returns true when the input does not fit in a single window.
pub fn requires_segmentation(total_duration_secs: f64, segment_length_secs: f64) -> bool {
    total_duration_secs > segment_length_secs
}

/// Renders seconds for tool command lines: integral values without a fraction.
pub fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{:.0}", secs)
    } else {
        format!("{:.3}", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_700_seconds_gives_three_windows() {
        let windows = plan(700.0, 300.0).unwrap();
        assert_eq!(windows.len(), 3);
        let offsets: Vec<f64> = windows.iter().map(|w| w.start_offset_secs).collect();
        assert_eq!(offsets, vec![0.0, 300.0, 600.0]);
        assert!(windows.iter().all(|w| w.length_secs == 300.0));
    }

    #[test]
    fn test_plan_exact_multiple_over_allocates_one_window() {
        let windows = plan(600.0, 300.0).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].start_offset_secs, 600.0);
    }

    #[test]
    fn test_plan_short_input_is_single_window() {
        let windows = plan(42.5, 300.0).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[0].start_offset_secs, 0.0);
    }

    #[test]
    fn test_plan_windows_are_contiguous_and_cover_input() {
        for total in [1.0, 299.9, 300.0, 301.0, 3599.0, 7200.0, 10_000.5] {
            let windows = plan(total, 300.0).unwrap();
            assert_eq!(windows.len(), (total / 300.0).floor() as usize + 1);
            for (i, pair) in windows.windows(2).enumerate() {
                assert_eq!(pair[0].index, i);
                assert_eq!(pair[0].end_offset_secs(), pair[1].start_offset_secs);
            }
            let coverage: f64 = windows.iter().map(|w| w.length_secs).sum();
            assert!(coverage >= total, "coverage {coverage} < total {total}");
        }
    }

    #[test]
    fn test_window_number_is_one_based() {
        let windows = plan(700.0, 300.0).unwrap();
        assert_eq!(windows[1].number(), 2);
    }

    #[test]
    fn test_window_count_degenerate_inputs() {
        assert_eq!(window_count(f64::NAN, 300.0), Some(1));
        assert_eq!(window_count(100.0, 0.0), Some(1));
        assert_eq!(window_count(0.0, 300.0), Some(1));
    }

    #[test]
    fn test_window_count_caps_huge_durations() {
        assert_eq!(window_count(f64::MAX, 300.0), None);
        assert_eq!(window_count(1e12, 300.0), None);
        assert_eq!(window_count(f64::MAX, f64::MIN_POSITIVE), None);

        let limit = MAX_SEGMENTS as f64 * 300.0;
        assert_eq!(window_count(limit - 1.0, 300.0), Some(MAX_SEGMENTS));
        assert_eq!(window_count(limit, 300.0), None);
    }

    #[test]
    fn test_plan_rejects_huge_duration() {
        let err = plan(1e300, 300.0).unwrap_err();
        assert!(matches!(err, LongscribeError::Planning { .. }));
        assert!(err.to_string().contains("needs more than 100000 segments"));
    }

    #[test]
    fn test_requires_segmentation() {
        assert!(!requires_segmentation(300.0, 300.0));
        assert!(requires_segmentation(300.5, 300.0));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(600.0), "600");
        assert_eq!(format_seconds(12.5), "12.500");
        assert_eq!(format_seconds(0.0), "0");
    }
}
