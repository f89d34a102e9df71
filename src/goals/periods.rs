use chrono::{Days, Months, NaiveDate};

use crate::shared::models::Frequency;

/// One period boundary of a checkpoint series. `index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub index: usize,
    pub due_date: NaiveDate,
}

/// Enumerate period boundaries from `start` (exclusive) to `end` (inclusive).
///
/// Weekly/biweekly step by a fixed day count; monthly/quarterly advance by
/// calendar months. Any step past `end` is clamped, so the final due date
/// always equals `end` exactly. `start >= end` yields an empty sequence.
/// Pure: the same inputs always reproduce the same sequence.
pub fn enumerate_periods(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Vec<Period> {
    if start >= end {
        return Vec::new();
    }

    let mut due_dates = Vec::new();
    let mut cursor = start;
    loop {
        match advance(cursor, frequency) {
            Some(next) if next < end => {
                due_dates.push(next);
                cursor = next;
            }
            _ => {
                due_dates.push(end);
                break;
            }
        }
    }

    due_dates
        .into_iter()
        .enumerate()
        .map(|(i, due_date)| Period {
            index: i + 1,
            due_date,
        })
        .collect()
}

fn advance(from: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    match frequency {
        Frequency::Weekly => from.checked_add_days(Days::new(7)),
        Frequency::Biweekly => from.checked_add_days(Days::new(14)),
        Frequency::Monthly => from.checked_add_months(Months::new(1)),
        Frequency::Quarterly => from.checked_add_months(Months::new(3)),
    }
}
