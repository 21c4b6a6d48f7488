//! Pure maintenance-window evaluation (spec §4.3).
//!
//! A maintenance window excludes a provider from receiving new probe jobs
//! during a daily UTC minute-of-day range. The range may wrap past
//! midnight (e.g. 23:30–00:30 UTC), so containment is computed without
//! ever normalizing into a calendar day.

use chrono::{DateTime, Timelike, Utc};

/// A daily recurring window, expressed as minute-of-day in UTC
/// (`0..=1439`). `start` and `end` are inclusive/exclusive respectively;
/// `start == end` denotes a window covering the entire day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceWindow {
    pub start_minute_utc: u16,
    pub end_minute_utc: u16,
}

impl MaintenanceWindow {
    pub fn new(start_minute_utc: u16, end_minute_utc: u16) -> Self {
        MaintenanceWindow {
            start_minute_utc: start_minute_utc % 1440,
            end_minute_utc: end_minute_utc % 1440,
        }
    }

    /// Whether this window wraps past midnight (`end <= start`, excluding
    /// the whole-day case where they're equal but the window is empty).
    fn wraps(&self) -> bool {
        self.end_minute_utc < self.start_minute_utc
    }

    /// True if `minute_of_day` (0..=1439) falls inside the window.
    fn contains_minute(&self, minute_of_day: u16) -> bool {
        if self.start_minute_utc == self.end_minute_utc {
            // A zero-width window excludes nothing; treat start==end as
            // "no maintenance window" rather than "entire day", since a
            // 24-hour standing exclusion would be configured explicitly
            // as 0..1440, not as an accidental equal pair.
            return false;
        }
        if self.wraps() {
            minute_of_day >= self.start_minute_utc || minute_of_day < self.end_minute_utc
        } else {
            minute_of_day >= self.start_minute_utc && minute_of_day < self.end_minute_utc
        }
    }

    /// Minutes remaining until the window closes, given `minute_of_day` is
    /// inside it. Returns `0` if not inside the window.
    fn minutes_until_end(&self, minute_of_day: u16) -> u16 {
        if !self.contains_minute(minute_of_day) {
            return 0;
        }
        if minute_of_day < self.end_minute_utc {
            self.end_minute_utc - minute_of_day
        } else {
            // wrapped: end is "tomorrow"
            (1440 - minute_of_day) + self.end_minute_utc
        }
    }
}

/// Result of evaluating a timestamp against a maintenance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceEvaluation {
    pub in_window: bool,
    /// Minutes remaining until the window closes; `0` when not in a
    /// window.
    pub minutes_until_end: u16,
}

/// Stateless evaluator over a single provider's configured maintenance
/// windows (spec §4.3 allows a list of daily `(start-of-day minute,
/// duration-minutes)` windows per provider, not just one).
///
/// Kept as its own type (rather than free functions) so the worker
/// runtime can hold one per provider without recomputing minute-of-day
/// arithmetic inline at every call site.
#[derive(Debug, Clone)]
pub struct MaintenanceWindowEvaluator {
    windows: Vec<MaintenanceWindow>,
}

impl MaintenanceWindowEvaluator {
    /// An empty list means the provider has no configured maintenance
    /// window and is always eligible.
    pub fn new(windows: Vec<MaintenanceWindow>) -> Self {
        MaintenanceWindowEvaluator { windows }
    }

    /// Builds an evaluator from the config shape in spec §6:
    /// `maintenance_windows_utc` (a list of daily start-of-day minutes) all
    /// sharing one `maintenance_window_minutes` duration.
    pub fn from_daily_starts(starts_minute_utc: &[u16], duration_minutes: u16) -> Self {
        let windows = starts_minute_utc
            .iter()
            .map(|&start| MaintenanceWindow::new(start, start + duration_minutes))
            .collect();
        MaintenanceWindowEvaluator { windows }
    }

    /// Evaluates `now` against every configured window and returns the
    /// first match. Configured windows for one provider aren't expected to
    /// overlap, so "first match" and "longest match" coincide in practice.
    pub fn evaluate_at(&self, now: DateTime<Utc>) -> MaintenanceEvaluation {
        let minute_of_day = (now.hour() * 60 + now.minute()) as u16;
        for window in &self.windows {
            if window.contains_minute(minute_of_day) {
                return MaintenanceEvaluation {
                    in_window: true,
                    minutes_until_end: window.minutes_until_end(minute_of_day),
                };
            }
        }
        MaintenanceEvaluation {
            in_window: false,
            minutes_until_end: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 29, hour, minute, 0).unwrap()
    }

    #[test]
    fn no_window_is_always_eligible() {
        let eval = MaintenanceWindowEvaluator::new(vec![]);
        let result = eval.evaluate_at(at(3, 0));
        assert!(!result.in_window);
        assert_eq!(result.minutes_until_end, 0);
    }

    #[test]
    fn non_wrapping_window_contains_interior_minute() {
        let window = MaintenanceWindow::new(2 * 60, 4 * 60); // 02:00-04:00
        let eval = MaintenanceWindowEvaluator::new(vec![window]);
        let result = eval.evaluate_at(at(3, 0));
        assert!(result.in_window);
        assert_eq!(result.minutes_until_end, 60);
    }

    #[test]
    fn non_wrapping_window_excludes_boundary_end() {
        let window = MaintenanceWindow::new(2 * 60, 4 * 60);
        let eval = MaintenanceWindowEvaluator::new(vec![window]);
        let result = eval.evaluate_at(at(4, 0));
        assert!(!result.in_window);
    }

    #[test]
    fn non_wrapping_window_includes_boundary_start() {
        let window = MaintenanceWindow::new(2 * 60, 4 * 60);
        let eval = MaintenanceWindowEvaluator::new(vec![window]);
        let result = eval.evaluate_at(at(2, 0));
        assert!(result.in_window);
        assert_eq!(result.minutes_until_end, 120);
    }

    #[test]
    fn wrapping_window_contains_minutes_on_both_sides_of_midnight() {
        // 23:30 -> 00:30
        let window = MaintenanceWindow::new(23 * 60 + 30, 30);
        let eval = MaintenanceWindowEvaluator::new(vec![window]);

        let before_midnight = eval.evaluate_at(at(23, 45));
        assert!(before_midnight.in_window);
        assert_eq!(before_midnight.minutes_until_end, 45);

        let after_midnight = eval.evaluate_at(at(0, 15));
        assert!(after_midnight.in_window);
        assert_eq!(after_midnight.minutes_until_end, 15);
    }

    #[test]
    fn wrapping_window_excludes_minute_outside_range() {
        let window = MaintenanceWindow::new(23 * 60 + 30, 30);
        let eval = MaintenanceWindowEvaluator::new(vec![window]);
        let result = eval.evaluate_at(at(12, 0));
        assert!(!result.in_window);
        assert_eq!(result.minutes_until_end, 0);
    }

    #[test]
    fn equal_start_and_end_is_treated_as_no_window() {
        let window = MaintenanceWindow::new(5 * 60, 5 * 60);
        let eval = MaintenanceWindowEvaluator::new(vec![window]);
        let result = eval.evaluate_at(at(5, 0));
        assert!(!result.in_window);
    }

    #[test]
    fn second_configured_window_is_honored_when_first_does_not_match() {
        let morning = MaintenanceWindow::new(2 * 60, 4 * 60);
        let evening = MaintenanceWindow::new(22 * 60, 23 * 60);
        let eval = MaintenanceWindowEvaluator::new(vec![morning, evening]);

        let result = eval.evaluate_at(at(22, 30));
        assert!(result.in_window);
        assert_eq!(result.minutes_until_end, 30);
    }

    #[test]
    fn from_daily_starts_builds_one_window_per_configured_start() {
        let eval = MaintenanceWindowEvaluator::from_daily_starts(&[2 * 60, 14 * 60], 60);
        assert!(eval.evaluate_at(at(2, 30)).in_window);
        assert!(eval.evaluate_at(at(14, 30)).in_window);
        assert!(!eval.evaluate_at(at(8, 0)).in_window);
    }
}
