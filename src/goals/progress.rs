use chrono::NaiveDate;

use crate::shared::models::GoalStatus;

/// Bounded completion percentage of `current` against `target`.
///
/// `target <= 0` returns 0 rather than dividing by zero, and non-finite
/// inputs (corrupted stored data) coerce to 0 instead of propagating NaN.
/// Reused identically for Key Result progress and checkpoint tracking.
pub fn percentage(current: f64, target: f64) -> f64 {
    if !current.is_finite() || !target.is_finite() {
        return 0.0;
    }
    if target <= 0.0 {
        return 0.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

/// Unweighted mean of child progress values; an empty set rolls up to 0.
pub fn mean_progress(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .map(|v| if v.is_finite() { *v } else { 0.0 })
        .sum();
    (sum / values.len() as f64).clamp(0.0, 100.0)
}

/// Qualitative status from numeric progress and the date range. Child
/// activity (`started`) promotes `Pending` to `Active` before the start date
/// arrives; it never feeds the numeric progress itself.
pub fn classify_status(
    start_date: NaiveDate,
    end_date: NaiveDate,
    progress: f64,
    started: bool,
    today: NaiveDate,
) -> GoalStatus {
    if progress >= 100.0 {
        GoalStatus::Completed
    } else if today > end_date {
        GoalStatus::Delayed
    } else if started || today >= start_date {
        GoalStatus::Active
    } else {
        GoalStatus::Pending
    }
}

/// Whether a reported actual reaches a period target, respecting the
/// direction of the Key Result's range (targets may decrease).
pub fn target_reached(actual: f64, target: f64, increasing: bool) -> bool {
    if !actual.is_finite() || !target.is_finite() {
        return false;
    }
    if increasing {
        actual >= target
    } else {
        actual <= target
    }
}
