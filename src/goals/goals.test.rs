//! Tests for the tracking engine and its components.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::goals::{
    CreateActionRequest, CreateKeyResultRequest, CreateObjectiveRequest, TrackingEngine,
    UpdateActionRequest, UpdateKeyResultRequest,
};
use crate::shared::models::{
    ActionStatus, CheckpointStatus, Frequency, GoalStatus, KeyResult, Role, User,
};
use crate::storage::{GoalStore, MemoryStore};
use crate::tests::test_util;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_key_result(
    initial_value: f64,
    target_value: f64,
    frequency: Frequency,
    start: NaiveDate,
    end: NaiveDate,
) -> KeyResult {
    let now = Utc::now();
    KeyResult {
        id: Uuid::new_v4(),
        objective_id: Uuid::new_v4(),
        title: "Sample key result".to_string(),
        description: None,
        initial_value,
        target_value,
        current_value: initial_value,
        unit: None,
        frequency,
        start_date: start,
        end_date: end,
        status: GoalStatus::Pending,
        progress: 0.0,
        strategic_indicator_ids: vec![],
        service_line_ids: vec![],
        created_at: now,
        updated_at: now,
    }
}

mod periods_tests {
    use super::*;
    use crate::goals::periods::enumerate_periods;

    #[test]
    fn weekly_steps_and_clamps_to_end() {
        test_util::setup();
        let periods = enumerate_periods(date(2025, 1, 1), date(2025, 1, 22), Frequency::Weekly);
        let dues: Vec<NaiveDate> = periods.iter().map(|p| p.due_date).collect();
        assert_eq!(dues, vec![date(2025, 1, 8), date(2025, 1, 15), date(2025, 1, 22)]);
    }

    #[test]
    fn weekly_overshoot_clamps_final_period() {
        test_util::setup();
        let periods = enumerate_periods(date(2025, 1, 1), date(2025, 1, 20), Frequency::Weekly);
        let dues: Vec<NaiveDate> = periods.iter().map(|p| p.due_date).collect();
        assert_eq!(dues, vec![date(2025, 1, 8), date(2025, 1, 15), date(2025, 1, 20)]);
    }

    #[test]
    fn biweekly_steps_by_fourteen_days() {
        test_util::setup();
        let periods = enumerate_periods(date(2025, 3, 1), date(2025, 4, 1), Frequency::Biweekly);
        let dues: Vec<NaiveDate> = periods.iter().map(|p| p.due_date).collect();
        assert_eq!(dues, vec![date(2025, 3, 15), date(2025, 3, 29), date(2025, 4, 1)]);
    }

    #[test]
    fn monthly_advances_by_calendar_month() {
        test_util::setup();
        let periods = enumerate_periods(date(2025, 1, 1), date(2025, 4, 30), Frequency::Monthly);
        let dues: Vec<NaiveDate> = periods.iter().map(|p| p.due_date).collect();
        assert_eq!(
            dues,
            vec![date(2025, 2, 1), date(2025, 3, 1), date(2025, 4, 1), date(2025, 4, 30)]
        );
    }

    #[test]
    fn quarterly_advances_by_three_months() {
        test_util::setup();
        let periods = enumerate_periods(date(2025, 1, 15), date(2025, 12, 31), Frequency::Quarterly);
        let dues: Vec<NaiveDate> = periods.iter().map(|p| p.due_date).collect();
        assert_eq!(
            dues,
            vec![date(2025, 4, 15), date(2025, 7, 15), date(2025, 10, 15), date(2025, 12, 31)]
        );
    }

    #[test]
    fn last_due_date_always_equals_end() {
        test_util::setup();
        for frequency in [
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
            Frequency::Quarterly,
        ] {
            let periods = enumerate_periods(date(2024, 2, 10), date(2025, 7, 3), frequency);
            assert!(!periods.is_empty());
            assert_eq!(periods.last().unwrap().due_date, date(2025, 7, 3));
        }
    }

    #[test]
    fn degenerate_range_yields_empty_sequence() {
        test_util::setup();
        assert!(enumerate_periods(date(2025, 5, 1), date(2025, 5, 1), Frequency::Weekly).is_empty());
        assert!(enumerate_periods(date(2025, 5, 2), date(2025, 5, 1), Frequency::Monthly).is_empty());
    }

    #[test]
    fn same_inputs_reproduce_same_sequence() {
        test_util::setup();
        let a = enumerate_periods(date(2025, 1, 1), date(2025, 6, 30), Frequency::Biweekly);
        let b = enumerate_periods(date(2025, 1, 1), date(2025, 6, 30), Frequency::Biweekly);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.index, y.index);
            assert_eq!(x.due_date, y.due_date);
        }
    }
}

mod checkpoints_tests {
    use super::*;
    use crate::goals::checkpoints::{build_series, carry_over_actuals};
    use crate::goals::error::GoalsError;

    #[test]
    fn monthly_series_interpolates_cumulative_targets() {
        test_util::setup();
        let kr = sample_key_result(
            100.0,
            85.0,
            Frequency::Monthly,
            date(2025, 1, 1),
            date(2025, 4, 30),
        );
        let series = crate::assert_ok!(build_series(&kr));
        let targets: Vec<f64> = series.iter().map(|cp| cp.target_value).collect();
        assert_eq!(targets, vec![96.25, 92.5, 88.75, 85.0]);
        assert!(series.iter().all(|cp| cp.actual_value.is_none()));
        assert!(series
            .iter()
            .all(|cp| cp.status == CheckpointStatus::Pending));
    }

    #[test]
    fn final_target_is_exact_even_for_uneven_splits() {
        test_util::setup();
        let kr = sample_key_result(
            0.0,
            10.0,
            Frequency::Monthly,
            date(2025, 1, 1),
            date(2025, 3, 20),
        );
        let series = crate::assert_ok!(build_series(&kr));
        assert_eq!(series.last().unwrap().target_value, 10.0);
    }

    #[test]
    fn labels_span_previous_due_to_current_due() {
        test_util::setup();
        let kr = sample_key_result(
            0.0,
            100.0,
            Frequency::Monthly,
            date(2025, 1, 1),
            date(2025, 3, 1),
        );
        let series = crate::assert_ok!(build_series(&kr));
        assert_eq!(series[0].period, "2025-01-01 - 2025-02-01");
        assert_eq!(series[1].period, "2025-02-01 - 2025-03-01");
    }

    #[test]
    fn degenerate_range_is_a_validation_error() {
        test_util::setup();
        let kr = sample_key_result(
            0.0,
            100.0,
            Frequency::Weekly,
            date(2025, 6, 1),
            date(2025, 6, 1),
        );
        let err = crate::assert_err!(build_series(&kr));
        assert!(matches!(err, GoalsError::Validation(_)));
    }

    #[test]
    fn carry_over_keeps_actuals_for_surviving_due_dates() {
        test_util::setup();
        let kr = sample_key_result(
            0.0,
            100.0,
            Frequency::Monthly,
            date(2025, 1, 1),
            date(2025, 4, 30),
        );
        let mut old = crate::assert_ok!(build_series(&kr));
        old[1].actual_value = Some(42.0);
        old[1].status = CheckpointStatus::Completed;

        let mut fresh = crate::assert_ok!(build_series(&kr));
        carry_over_actuals(&mut fresh, &old);
        assert_eq!(fresh[1].actual_value, Some(42.0));
        assert_eq!(fresh[1].status, CheckpointStatus::Completed);
        assert_eq!(fresh[0].actual_value, None);
    }
}

mod progress_tests {
    use super::*;
    use crate::goals::progress::{
        classify_status, mean_progress, percentage, target_reached,
    };

    #[test]
    fn percentage_of_current_against_target() {
        test_util::setup();
        assert_eq!(percentage(21000.0, 25000.0), 84.0);
        assert_eq!(percentage(50.0, 100.0), 50.0);
    }

    #[test]
    fn percentage_is_bounded() {
        test_util::setup();
        assert_eq!(percentage(300.0, 100.0), 100.0);
        assert_eq!(percentage(-10.0, 100.0), 0.0);
    }

    #[test]
    fn percentage_guards_division_by_zero() {
        test_util::setup();
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert_eq!(percentage(10.0, -5.0), 0.0);
    }

    #[test]
    fn percentage_coerces_non_finite_to_zero() {
        test_util::setup();
        assert_eq!(percentage(f64::NAN, 100.0), 0.0);
        assert_eq!(percentage(10.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn mean_progress_of_empty_set_is_zero() {
        test_util::setup();
        assert_eq!(mean_progress(&[]), 0.0);
    }

    #[test]
    fn mean_progress_is_unweighted() {
        test_util::setup();
        assert_eq!(mean_progress(&[50.0, 25.0]), 37.5);
        assert_eq!(mean_progress(&[100.0, 0.0, 50.0]), 50.0);
    }

    #[test]
    fn classification_follows_dates_and_progress() {
        test_util::setup();
        let start = date(2025, 1, 1);
        let end = date(2025, 12, 31);
        assert_eq!(
            classify_status(start, end, 100.0, false, date(2025, 6, 1)),
            GoalStatus::Completed
        );
        assert_eq!(
            classify_status(start, end, 40.0, false, date(2026, 1, 1)),
            GoalStatus::Delayed
        );
        assert_eq!(
            classify_status(start, end, 40.0, false, date(2025, 6, 1)),
            GoalStatus::Active
        );
        assert_eq!(
            classify_status(start, end, 0.0, false, date(2024, 6, 1)),
            GoalStatus::Pending
        );
        assert_eq!(
            classify_status(start, end, 0.0, true, date(2024, 6, 1)),
            GoalStatus::Active
        );
    }

    #[test]
    fn target_reached_respects_direction() {
        test_util::setup();
        assert!(target_reached(30.0, 25.0, true));
        assert!(!target_reached(20.0, 25.0, true));
        assert!(target_reached(80.0, 85.0, false));
        assert!(!target_reached(90.0, 85.0, false));
    }
}

mod engine_tests {
    use super::*;

    fn engine() -> (Arc<MemoryStore>, TrackingEngine) {
        test_util::setup();
        let store = Arc::new(MemoryStore::new());
        let engine = TrackingEngine::new(store.clone());
        (store, engine)
    }

    fn objective_request() -> CreateObjectiveRequest {
        CreateObjectiveRequest {
            title: "Expand coverage".to_string(),
            description: None,
            owner_id: Uuid::new_v4(),
            region_id: 5,
            sub_region_id: None,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 12, 31),
        }
    }

    fn key_result_request(objective_id: Uuid) -> CreateKeyResultRequest {
        CreateKeyResultRequest {
            objective_id,
            title: "Revenue".to_string(),
            description: None,
            initial_value: Some(0.0),
            target_value: 100.0,
            unit: Some("%".to_string()),
            frequency: Frequency::Monthly,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 4, 30),
            strategic_indicator_ids: None,
            service_line_ids: None,
        }
    }

    fn scoped_user(region_ids: &[i32]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "maria".to_string(),
            email: "maria@example.com".to_string(),
            role: Role::Gestor,
            manager_id: None,
            region_ids: region_ids.iter().copied().collect(),
            sub_region_ids: HashSet::new(),
            solution_ids: HashSet::new(),
            service_line_ids: HashSet::new(),
            service_ids: HashSet::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn creating_a_key_result_generates_its_checkpoint_series() {
        let (store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        let checkpoints = crate::assert_ok!(store.list_checkpoints(kr.id).await);
        assert_eq!(checkpoints.len(), 4);
        assert_eq!(checkpoints.last().unwrap().target_value, 100.0);
        assert_eq!(checkpoints.last().unwrap().due_date, date(2025, 4, 30));
    }

    #[tokio::test]
    async fn key_result_creation_validates_range_and_target() {
        let (_store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);

        let mut bad_range = key_result_request(objective.id);
        bad_range.end_date = bad_range.start_date;
        let err = crate::assert_err!(engine.create_key_result(bad_range).await);
        assert!(matches!(err, crate::goals::error::GoalsError::Validation(_)));

        let mut bad_target = key_result_request(objective.id);
        bad_target.target_value = 0.0;
        let err = crate::assert_err!(engine.create_key_result(bad_target).await);
        assert!(matches!(err, crate::goals::error::GoalsError::Validation(_)));

        let orphan = key_result_request(Uuid::new_v4());
        let err = crate::assert_err!(engine.create_key_result(orphan).await);
        assert!(matches!(err, crate::goals::error::GoalsError::NotFound(_)));
    }

    #[tokio::test]
    async fn regeneration_is_idempotent_without_intervening_edits() {
        let (_store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        let first = crate::assert_ok!(engine.regenerate_checkpoints(kr.id).await);
        let second = crate::assert_ok!(engine.regenerate_checkpoints(kr.id).await);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.due_date, b.due_date);
            assert_eq!(a.target_value, b.target_value);
            assert_eq!(a.period, b.period);
            assert_eq!(a.actual_value, b.actual_value);
        }
    }

    #[tokio::test]
    async fn regeneration_of_unknown_key_result_is_not_found() {
        let (_store, engine) = engine();
        let err = crate::assert_err!(engine.regenerate_checkpoints(Uuid::new_v4()).await);
        assert!(matches!(err, crate::goals::error::GoalsError::NotFound(_)));
    }

    #[tokio::test]
    async fn recorded_actuals_survive_regeneration() {
        let (store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        let checkpoints = crate::assert_ok!(store.list_checkpoints(kr.id).await);
        crate::assert_ok!(engine.record_checkpoint(checkpoints[0].id, 30.0).await);

        let regenerated = crate::assert_ok!(engine.regenerate_checkpoints(kr.id).await);
        assert_eq!(regenerated[0].actual_value, Some(30.0));
        assert!(regenerated[1..].iter().all(|cp| cp.actual_value.is_none()));
    }

    #[tokio::test]
    async fn check_in_writes_through_and_rolls_up() {
        let (store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        let checkpoints = crate::assert_ok!(store.list_checkpoints(kr.id).await);
        // First period target is 25; reporting 30 completes it.
        let recorded = crate::assert_ok!(engine.record_checkpoint(checkpoints[0].id, 30.0).await);
        assert_eq!(recorded.status, CheckpointStatus::Completed);

        let kr = crate::assert_ok!(store.get_key_result(kr.id).await).unwrap();
        assert_eq!(kr.current_value, 30.0);
        assert_eq!(kr.progress, 30.0);

        let objective = crate::assert_ok!(store.get_objective(objective.id).await).unwrap();
        assert_eq!(objective.progress, 30.0);
    }

    #[tokio::test]
    async fn objective_progress_is_the_mean_of_its_key_results() {
        let (store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr1 = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);
        let kr2 = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        let update = UpdateKeyResultRequest {
            current_value: Some(50.0),
            ..Default::default()
        };
        crate::assert_ok!(engine.update_key_result(kr1.id, update).await);
        crate::assert_ok!(engine.recompute_key_result(kr1.id).await);

        let update = UpdateKeyResultRequest {
            current_value: Some(25.0),
            ..Default::default()
        };
        crate::assert_ok!(engine.update_key_result(kr2.id, update).await);
        crate::assert_ok!(engine.recompute_key_result(kr2.id).await);

        let objective = crate::assert_ok!(store.get_objective(objective.id).await).unwrap();
        assert_eq!(objective.progress, 37.5);
    }

    #[tokio::test]
    async fn objective_without_key_results_rolls_up_to_zero() {
        let (_store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let progress = crate::assert_ok!(engine.recompute_objective(objective.id).await);
        assert_eq!(progress, 0.0);
    }

    #[tokio::test]
    async fn action_numbers_increase_per_key_result() {
        let (_store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(objective.id)).await);

        for expected in 1..=3 {
            let action = crate::assert_ok!(
                engine
                    .create_action(CreateActionRequest {
                        key_result_id: kr.id,
                        title: format!("Step {expected}"),
                        description: None,
                        responsible_id: Uuid::new_v4(),
                        due_date: date(2025, 3, 1),
                        priority: None,
                    })
                    .await
            );
            assert_eq!(action.number, expected);
        }
    }

    #[tokio::test]
    async fn action_status_feeds_classification_not_progress() {
        let (store, engine) = engine();
        let mut request = objective_request();
        // A future range keeps classification on the started flag.
        request.start_date = Utc::now().date_naive() + chrono::Days::new(30);
        request.end_date = Utc::now().date_naive() + chrono::Days::new(120);
        let objective = crate::assert_ok!(engine.create_objective(request).await);
        let mut kr_request = key_result_request(objective.id);
        kr_request.start_date = objective.start_date;
        kr_request.end_date = objective.end_date;
        let kr = crate::assert_ok!(engine.create_key_result(kr_request).await);

        let action = crate::assert_ok!(
            engine
                .create_action(CreateActionRequest {
                    key_result_id: kr.id,
                    title: "Kick off".to_string(),
                    description: None,
                    responsible_id: Uuid::new_v4(),
                    due_date: objective.start_date,
                    priority: None,
                })
                .await
        );
        crate::assert_ok!(
            engine
                .update_action(
                    action.id,
                    UpdateActionRequest {
                        status: Some(ActionStatus::InProgress),
                        ..Default::default()
                    },
                )
                .await
        );
        crate::assert_ok!(engine.recompute_key_result(kr.id).await);

        let kr = crate::assert_ok!(store.get_key_result(kr.id).await).unwrap();
        assert_eq!(kr.status, GoalStatus::Active);
        assert_eq!(kr.progress, 0.0);
    }

    #[tokio::test]
    async fn out_of_scope_objective_reads_as_not_found() {
        let (_store, engine) = engine();
        let objective = crate::assert_ok!(engine.create_objective(objective_request()).await);

        let outsider = scoped_user(&[7]);
        let err = crate::assert_err!(engine.get_objective_for(&outsider, objective.id).await);
        assert!(matches!(err, crate::goals::error::GoalsError::NotFound(_)));

        let listed = crate::assert_ok!(
            engine
                .list_objectives_for(&outsider, Default::default())
                .await
        );
        assert!(listed.is_empty());

        let insider = scoped_user(&[5]);
        let found = crate::assert_ok!(engine.get_objective_for(&insider, objective.id).await);
        assert_eq!(found.id, objective.id);
    }

    #[tokio::test]
    async fn dashboard_aggregates_visible_objectives() {
        let (store, engine) = engine();
        let in_scope = crate::assert_ok!(engine.create_objective(objective_request()).await);
        let mut other = objective_request();
        other.region_id = 7;
        crate::assert_ok!(engine.create_objective(other).await);

        let kr = crate::assert_ok!(engine.create_key_result(key_result_request(in_scope.id)).await);
        let checkpoints = crate::assert_ok!(store.list_checkpoints(kr.id).await);
        crate::assert_ok!(engine.record_checkpoint(checkpoints[0].id, 50.0).await);

        let user = scoped_user(&[5]);
        let dashboard = crate::assert_ok!(engine.dashboard_for(&user, None).await);
        assert_eq!(dashboard.total_objectives, 1);
        assert_eq!(dashboard.total_key_results, 1);
        assert_eq!(dashboard.average_progress, 50.0);
    }

    #[tokio::test]
    async fn dashboard_period_filter_keeps_overlapping_objectives() {
        let (_store, engine) = engine();
        crate::assert_ok!(engine.create_objective(objective_request()).await);
        let mut next_year = objective_request();
        next_year.start_date = date(2026, 1, 1);
        next_year.end_date = date(2026, 12, 31);
        crate::assert_ok!(engine.create_objective(next_year).await);

        let user = scoped_user(&[5]);
        let dashboard = crate::assert_ok!(
            engine
                .dashboard_for(&user, Some((date(2025, 1, 1), date(2025, 6, 30))))
                .await
        );
        assert_eq!(dashboard.total_objectives, 1);
    }
}
