use crate::config::TestMode;
use serde::{Deserialize, Serialize};

/// Five characters count as one word, the standard WPM convention.
pub const WORD_LENGTH_AVERAGE: f64 = 5.0;

/// Derived, human-facing metrics. Recomputed on demand from raw counts and
/// elapsed time, never stored as authoritative state.
///
/// Naming note carried over from the web client this replaces: the value a
/// user sees as "wpm" is computed from correct characters only, while `raw_wpm`
/// holds the gross (all characters) figure. The mapping is deliberate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub net_wpm: u32,
    pub cpm: u32,
    /// Percentage in [0, 100], one decimal.
    pub accuracy: f64,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub total_chars: usize,
    pub total_errors: usize,
    pub elapsed_secs: u64,
}

/// Translate accumulated counts plus elapsed time into display metrics.
/// Pure; never fails. Elapsed time is floored at 0.001 minutes so a snapshot
/// taken on the very first keystroke cannot divide by zero.
pub fn calculate(
    correct_chars: usize,
    incorrect_chars: usize,
    total_chars: usize,
    elapsed_secs: f64,
    total_errors: usize,
) -> MetricsSnapshot {
    let minutes = (elapsed_secs / 60.0).max(0.001);

    let gross_wpm = (total_chars as f64 / WORD_LENGTH_AVERAGE) / minutes;
    let net_wpm = (gross_wpm - total_errors as f64 / minutes).max(0.0);
    let raw_wpm = (correct_chars as f64 / WORD_LENGTH_AVERAGE) / minutes;
    let cpm = correct_chars as f64 / minutes;

    let accuracy = if total_chars > 0 {
        (correct_chars as f64 / total_chars as f64) * 100.0
    } else {
        100.0
    };

    MetricsSnapshot {
        wpm: raw_wpm.round() as u32,
        raw_wpm: gross_wpm.round() as u32,
        net_wpm: net_wpm.round() as u32,
        cpm: cpm.round() as u32,
        accuracy: (accuracy * 10.0).round() / 10.0,
        correct_chars,
        incorrect_chars,
        total_chars,
        total_errors,
        elapsed_secs: elapsed_secs.round() as u64,
    }
}

/// Test progress in [0, 100]. Time mode tracks the clock, words mode tracks
/// the cursor through the prompt.
pub fn calculate_progress(
    mode: TestMode,
    target_value: f64,
    elapsed_secs: f64,
    cursor: usize,
    text_len: usize,
) -> f64 {
    match mode {
        TestMode::Time => {
            if target_value <= 0.0 {
                return 100.0;
            }
            (elapsed_secs / target_value * 100.0).min(100.0)
        }
        TestMode::Words => {
            if text_len == 0 {
                return 100.0;
            }
            (cursor as f64 / text_len as f64 * 100.0).min(100.0)
        }
    }
}

fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation of a per-second WPM series; lower means a
/// steadier typist. None for an empty series.
pub fn consistency(wpm_series: &[f64]) -> Option<f64> {
    let m = mean(wpm_series)?;
    let variance = wpm_series
        .iter()
        .map(|v| {
            let diff = m - *v;
            diff * diff
        })
        .sum::<f64>()
        / wpm_series.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_minute_perfect_run() {
        let m = calculate(250, 0, 250, 60.0, 0);
        assert_eq!(m.wpm, 50);
        assert_eq!(m.raw_wpm, 50);
        assert_eq!(m.net_wpm, 50);
        assert_eq!(m.cpm, 250);
        assert_eq!(m.accuracy, 100.0);
        assert_eq!(m.elapsed_secs, 60);
    }

    #[test]
    fn zero_elapsed_does_not_divide_by_zero() {
        let m = calculate(5, 0, 5, 0.0, 0);
        assert!(m.wpm > 0);
        assert_eq!(m.accuracy, 100.0);
    }

    #[test]
    fn no_input_reports_full_accuracy() {
        let m = calculate(0, 0, 0, 10.0, 0);
        assert_eq!(m.wpm, 0);
        assert_eq!(m.cpm, 0);
        assert_eq!(m.accuracy, 100.0);
    }

    #[test]
    fn net_wpm_never_negative() {
        // Far more errors than typed volume can sustain.
        let m = calculate(1, 49, 50, 60.0, 49);
        assert_eq!(m.net_wpm, 0);
    }

    #[test]
    fn accuracy_one_decimal_and_bounded() {
        let m = calculate(2, 1, 3, 30.0, 1);
        assert_eq!(m.accuracy, 66.7);
        assert!(m.accuracy >= 0.0 && m.accuracy <= 100.0);
    }

    #[test]
    fn wpm_uses_correct_chars_raw_uses_all() {
        let m = calculate(100, 100, 200, 60.0, 100);
        assert_eq!(m.wpm, 20);
        assert_eq!(m.raw_wpm, 40);
    }

    #[test]
    fn calculate_is_deterministic() {
        let a = calculate(123, 7, 130, 42.5, 7);
        let b = calculate(123, 7, 130, 42.5, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn progress_time_mode() {
        let p = calculate_progress(TestMode::Time, 60.0, 30.0, 0, 0);
        assert_eq!(p, 50.0);
        let p = calculate_progress(TestMode::Time, 60.0, 90.0, 0, 0);
        assert_eq!(p, 100.0);
    }

    #[test]
    fn progress_words_mode_halfway() {
        // 50 words at ~5 chars/word, cursor halfway through the text.
        let p = calculate_progress(TestMode::Words, 50.0, 0.0, 125, 250);
        assert_eq!(p, 50.0);
    }

    #[test]
    fn progress_words_mode_caps_at_100() {
        let p = calculate_progress(TestMode::Words, 10.0, 0.0, 300, 250);
        assert_eq!(p, 100.0);
    }

    #[test]
    fn consistency_of_steady_series_is_zero() {
        assert_eq!(consistency(&[40.0, 40.0, 40.0]), Some(0.0));
        assert_eq!(consistency(&[]), None);
    }

    #[test]
    fn consistency_known_value() {
        let c = consistency(&[100., 120., 90., 102., 94.]).unwrap();
        assert!((c - 10.322790320451151).abs() < 1e-9);
    }
}
