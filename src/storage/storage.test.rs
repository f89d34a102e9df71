//! Tests for the in-memory store adapter.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::shared::models::{
    Checkpoint, CheckpointStatus, GoalStatus, Objective, ObjectiveFilters,
};
use crate::storage::{GoalStore, MemoryStore};
use crate::tests::test_util;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn objective(region_id: i32, age_minutes: i64) -> Objective {
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    Objective {
        id: Uuid::new_v4(),
        title: format!("Objective in region {region_id}"),
        description: None,
        owner_id: Uuid::new_v4(),
        region_id,
        sub_region_id: None,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 12, 31),
        status: GoalStatus::Active,
        progress: 0.0,
        created_at,
        updated_at: created_at,
    }
}

fn checkpoint(key_result_id: Uuid, due: NaiveDate) -> Checkpoint {
    let now = Utc::now();
    Checkpoint {
        id: Uuid::new_v4(),
        key_result_id,
        period: format!("until {due}"),
        target_value: 10.0,
        actual_value: None,
        status: CheckpointStatus::Pending,
        due_date: due,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn list_objectives_applies_filters_and_sorts_newest_first() {
    test_util::setup();
    let store = MemoryStore::new();
    let older = objective(5, 10);
    let newer = objective(5, 1);
    let other_region = objective(7, 5);
    crate::assert_ok!(store.insert_objective(older.clone()).await);
    crate::assert_ok!(store.insert_objective(newer.clone()).await);
    crate::assert_ok!(store.insert_objective(other_region).await);

    let filters = ObjectiveFilters {
        region_ids: Some(vec![5]),
        ..Default::default()
    };
    let listed = crate::assert_ok!(store.list_objectives(&filters).await);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
}

#[tokio::test]
async fn list_objectives_honors_limit_and_offset() {
    test_util::setup();
    let store = MemoryStore::new();
    for age in 1..=4 {
        crate::assert_ok!(store.insert_objective(objective(5, age)).await);
    }

    let filters = ObjectiveFilters {
        limit: Some(2),
        offset: Some(1),
        ..Default::default()
    };
    let listed = crate::assert_ok!(store.list_objectives(&filters).await);
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn replace_checkpoints_discards_the_previous_series() {
    test_util::setup();
    let store = MemoryStore::new();
    let key_result_id = Uuid::new_v4();

    let first = vec![
        checkpoint(key_result_id, date(2025, 2, 1)),
        checkpoint(key_result_id, date(2025, 3, 1)),
    ];
    crate::assert_ok!(store.replace_checkpoints(key_result_id, first).await);

    let second = vec![checkpoint(key_result_id, date(2025, 6, 1))];
    crate::assert_ok!(store.replace_checkpoints(key_result_id, second).await);

    let stored = crate::assert_ok!(store.list_checkpoints(key_result_id).await);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].due_date, date(2025, 6, 1));
}

#[tokio::test]
async fn replace_checkpoints_leaves_other_key_results_alone() {
    test_util::setup();
    let store = MemoryStore::new();
    let kr_a = Uuid::new_v4();
    let kr_b = Uuid::new_v4();
    crate::assert_ok!(
        store
            .replace_checkpoints(kr_a, vec![checkpoint(kr_a, date(2025, 2, 1))])
            .await
    );
    crate::assert_ok!(
        store
            .replace_checkpoints(kr_b, vec![checkpoint(kr_b, date(2025, 2, 1))])
            .await
    );

    crate::assert_ok!(store.replace_checkpoints(kr_a, vec![]).await);
    assert!(crate::assert_ok!(store.list_checkpoints(kr_a).await).is_empty());
    assert_eq!(crate::assert_ok!(store.list_checkpoints(kr_b).await).len(), 1);
}

#[tokio::test]
async fn updates_of_missing_records_are_not_found() {
    test_util::setup();
    let store = MemoryStore::new();
    let err = crate::assert_err!(store.update_objective(objective(1, 1)).await);
    assert!(matches!(
        err,
        crate::goals::error::GoalsError::NotFound(_)
    ));
    let err = crate::assert_err!(
        store
            .update_checkpoint(checkpoint(Uuid::new_v4(), date(2025, 2, 1)))
            .await
    );
    assert!(matches!(
        err,
        crate::goals::error::GoalsError::NotFound(_)
    ));
}

#[tokio::test]
async fn delete_objective_reports_whether_a_row_was_removed() {
    test_util::setup();
    let store = MemoryStore::new();
    let stored = crate::assert_ok!(store.insert_objective(objective(1, 1)).await);
    assert!(crate::assert_ok!(store.delete_objective(stored.id).await));
    assert!(!crate::assert_ok!(store.delete_objective(stored.id).await));
}
