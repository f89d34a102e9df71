use chrono::Utc;
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::goals::periods::enumerate_periods;
use crate::shared::models::{Checkpoint, CheckpointStatus, KeyResult};

/// Build the cumulative-target checkpoint series for a Key Result. Nothing is
/// persisted here; the engine replaces the stored series atomically.
///
/// For period `i` of `N` the target is
/// `initial + (target - initial) * (i / N)`; the final period's target is
/// forced to `target_value` exactly rather than trusting the interpolation,
/// so the series never drifts off the target by floating rounding.
pub fn build_series(key_result: &KeyResult) -> Result<Vec<Checkpoint>, GoalsError> {
    let periods = enumerate_periods(
        key_result.start_date,
        key_result.end_date,
        key_result.frequency,
    );
    if periods.is_empty() {
        return Err(GoalsError::Validation(format!(
            "key result {} has a degenerate date range ({} to {}), no checkpoints generatable",
            key_result.id, key_result.start_date, key_result.end_date
        )));
    }

    let total = periods.len();
    let span = key_result.target_value - key_result.initial_value;
    let now = Utc::now();

    let mut series = Vec::with_capacity(total);
    let mut previous = key_result.start_date;
    for period in periods {
        let target_value = if period.index == total {
            key_result.target_value
        } else {
            key_result.initial_value + span * (period.index as f64 / total as f64)
        };
        series.push(Checkpoint {
            id: Uuid::new_v4(),
            key_result_id: key_result.id,
            period: format!("{} - {}", previous, period.due_date),
            target_value,
            actual_value: None,
            status: CheckpointStatus::Pending,
            due_date: period.due_date,
            created_at: now,
            updated_at: now,
        });
        previous = period.due_date;
    }
    Ok(series)
}

/// Carry reported actuals from a previous series onto a freshly built one.
/// A checkpoint inherits the old actual value and status when a previous
/// checkpoint with the same due date had one recorded; periods that no longer
/// exist after a date-range edit are dropped with the old series.
pub fn carry_over_actuals(series: &mut [Checkpoint], previous: &[Checkpoint]) {
    for checkpoint in series.iter_mut() {
        let recorded = previous
            .iter()
            .find(|p| p.due_date == checkpoint.due_date && p.actual_value.is_some());
        if let Some(old) = recorded {
            checkpoint.actual_value = old.actual_value;
            checkpoint.status = old.status;
        }
    }
}
