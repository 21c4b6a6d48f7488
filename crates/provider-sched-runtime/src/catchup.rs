//! Pure catch-up/spread scheduling arithmetic.
//!
//! When a schedule row's `next_run_at` has fallen behind `now` by more
//! than one interval (the process was down, a tick was skipped, etc.),
//! the enqueue loop doesn't send every missed run back-to-back — that
//! would hit the same provider with a burst of probes at once. Instead it
//! sends one immediately and spreads the rest across a configured window,
//! capped at `catchup_max` total sends, while still advancing
//! `next_run_at` by the full number of intervals that elapsed (phase
//! preservation) so the schedule doesn't drift.

use chrono::{DateTime, Duration, Utc};

/// The result of evaluating one schedule row against `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchupPlan {
    /// Send times for this burst, in order. The first entry is always
    /// `now` (or rather, immediately eligible).
    pub run_ats: Vec<DateTime<Utc>>,
    /// The row's `next_run_at` after this burst is accounted for,
    /// computed as `original_next_run_at + runs * interval`, never
    /// snapped to `now` — this keeps the schedule's phase stable across
    /// catch-up events.
    pub new_next_run_at: DateTime<Utc>,
    /// How many missed runs were dropped because they exceeded
    /// `catchup_max`. Surfaced so the caller can log/meter silent loss
    /// rather than let it pass unnoticed.
    pub runs_skipped: i64,
}

/// Evaluate `original_next_run_at` against `now`. Returns `None` if the
/// row isn't due yet.
pub fn plan_catchup(
    original_next_run_at: DateTime<Utc>,
    interval_seconds: i64,
    now: DateTime<Utc>,
    catchup_max: i64,
    spread_seconds: i64,
) -> Option<CatchupPlan> {
    if now < original_next_run_at || interval_seconds <= 0 {
        return None;
    }

    let diff_ms = (now - original_next_run_at).num_milliseconds();
    let interval_ms = interval_seconds * 1000;
    let runs_due = diff_ms / interval_ms + 1;
    let runs = runs_due.min(catchup_max.max(1));
    let runs_skipped = (runs_due - runs).max(0);

    let delayed = runs - 1;
    let mut run_ats = Vec::with_capacity(runs as usize);
    run_ats.push(now);

    if delayed > 0 {
        for i in 0..delayed {
            // ceil((i+1) * spread_seconds / (delayed+1))
            let numerator = (i + 1) * spread_seconds;
            let denominator = delayed + 1;
            let offset_seconds = (numerator + denominator - 1) / denominator;
            run_ats.push(now + Duration::seconds(offset_seconds));
        }
    }

    let new_next_run_at = original_next_run_at + Duration::seconds(runs * interval_seconds);

    Some(CatchupPlan {
        run_ats,
        new_next_run_at,
        runs_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs_from_epoch: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs_from_epoch, 0).unwrap()
    }

    #[test]
    fn not_yet_due_returns_none() {
        let original = t(1000);
        let now = t(999);
        assert!(plan_catchup(original, 60, now, 5, 300).is_none());
    }

    #[test]
    fn exactly_on_time_produces_single_immediate_run() {
        let original = t(1000);
        let now = t(1000);
        let plan = plan_catchup(original, 60, now, 5, 300).unwrap();
        assert_eq!(plan.run_ats, vec![now]);
        assert_eq!(plan.new_next_run_at, t(1060));
        assert_eq!(plan.runs_skipped, 0);
    }

    #[test]
    fn one_interval_late_still_single_run() {
        let original = t(1000);
        let now = t(1000 + 60); // exactly one interval late
        let plan = plan_catchup(original, 60, now, 5, 300).unwrap();
        assert_eq!(plan.run_ats.len(), 1);
        assert_eq!(plan.new_next_run_at, t(1000 + 2 * 60));
    }

    #[test]
    fn several_intervals_late_spreads_delayed_runs() {
        let original = t(0);
        let interval = 60;
        let now = t(4 * interval); // 5 runs due (floor(240/60)+1 = 5)
        let plan = plan_catchup(original, interval, now, 10, 300).unwrap();

        assert_eq!(plan.run_ats.len(), 5);
        assert_eq!(plan.run_ats[0], now);
        // 4 delayed runs spread across 300s: ceil(i/5*300)
        assert_eq!(plan.run_ats[1], now + Duration::seconds(75));
        assert_eq!(plan.run_ats[2], now + Duration::seconds(150));
        assert_eq!(plan.run_ats[3], now + Duration::seconds(225));
        assert_eq!(plan.run_ats[4], now + Duration::seconds(300));
        assert_eq!(plan.new_next_run_at, original + Duration::seconds(5 * interval));
        assert_eq!(plan.runs_skipped, 0);
    }

    #[test]
    fn runs_due_beyond_catchup_max_are_clamped_and_counted_as_skipped() {
        let original = t(0);
        let interval = 60;
        let now = t(100 * interval); // 101 runs due
        let plan = plan_catchup(original, interval, now, 5, 300).unwrap();

        assert_eq!(plan.run_ats.len(), 5);
        assert_eq!(plan.runs_skipped, 96);
        // next_run_at still only advances by the runs actually accounted for
        assert_eq!(plan.new_next_run_at, original + Duration::seconds(5 * interval));
    }

    #[test]
    fn catchup_max_of_one_produces_no_delayed_runs() {
        let original = t(0);
        let interval = 60;
        let now = t(10 * interval);
        let plan = plan_catchup(original, interval, now, 1, 300).unwrap();
        assert_eq!(plan.run_ats, vec![now]);
        assert_eq!(plan.runs_skipped, 10);
    }
}
