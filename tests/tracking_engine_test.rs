#[cfg(test)]
mod tracking_engine_integration_tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use okrcore::goals::{
        CreateActionRequest, CreateKeyResultRequest, CreateObjectiveRequest,
    };
    use okrcore::shared::models::{Frequency, ObjectiveFilters, Role, User};
    use okrcore::shared::state::AppState;
    use okrcore::storage::{GoalStore, MemoryStore};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(role: Role, region_ids: &[i32]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
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

    fn state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(None, store)
    }

    #[tokio::test]
    async fn full_tracking_flow_from_creation_to_dashboard() {
        let state = state();
        let engine = &state.engine;

        let objective = engine
            .create_objective(CreateObjectiveRequest {
                title: "Grow northern region revenue".to_string(),
                description: Some("Annual revenue objective".to_string()),
                owner_id: Uuid::new_v4(),
                region_id: 5,
                sub_region_id: Some(51),
                start_date: date(2025, 1, 1),
                end_date: date(2025, 12, 31),
            })
            .await
            .expect("objective should be created");

        let key_result = engine
            .create_key_result(CreateKeyResultRequest {
                objective_id: objective.id,
                title: "Quarterly revenue".to_string(),
                description: None,
                initial_value: Some(0.0),
                target_value: 25000.0,
                unit: Some("BRL".to_string()),
                frequency: Frequency::Quarterly,
                start_date: date(2025, 1, 1),
                end_date: date(2025, 12, 31),
                strategic_indicator_ids: Some(vec![1]),
                service_line_ids: Some(vec![4]),
            })
            .await
            .expect("key result should be created");

        let checkpoints = state
            .store
            .list_checkpoints(key_result.id)
            .await
            .expect("checkpoints should list");
        assert_eq!(checkpoints.len(), 4);
        assert_eq!(checkpoints.last().unwrap().target_value, 25000.0);
        assert_eq!(checkpoints.last().unwrap().due_date, date(2025, 12, 31));

        let action = engine
            .create_action(CreateActionRequest {
                key_result_id: key_result.id,
                title: "Hire account executive".to_string(),
                description: None,
                responsible_id: Uuid::new_v4(),
                due_date: date(2025, 2, 15),
                priority: None,
            })
            .await
            .expect("action should be created");
        assert_eq!(action.number, 1);

        // Report 21000 against the 25000 target: 84% on the key result.
        engine
            .record_checkpoint(checkpoints[2].id, 21000.0)
            .await
            .expect("check-in should succeed");

        let stored_kr = state
            .store
            .get_key_result(key_result.id)
            .await
            .expect("key result should load")
            .expect("key result should exist");
        assert_eq!(stored_kr.current_value, 21000.0);
        assert_eq!(stored_kr.progress, 84.0);

        let stored_objective = state
            .store
            .get_objective(objective.id)
            .await
            .expect("objective should load")
            .expect("objective should exist");
        assert_eq!(stored_objective.progress, 84.0);

        let manager = user(Role::Gestor, &[5]);
        let dashboard = engine
            .dashboard_for(&manager, None)
            .await
            .expect("dashboard should build");
        assert_eq!(dashboard.total_objectives, 1);
        assert_eq!(dashboard.total_key_results, 1);
        assert_eq!(dashboard.average_progress, 84.0);
    }

    #[tokio::test]
    async fn scoped_users_never_see_foreign_regions() {
        let state = state();
        let engine = &state.engine;

        let visible = engine
            .create_objective(CreateObjectiveRequest {
                title: "Region five objective".to_string(),
                description: None,
                owner_id: Uuid::new_v4(),
                region_id: 5,
                sub_region_id: None,
                start_date: date(2025, 1, 1),
                end_date: date(2025, 12, 31),
            })
            .await
            .expect("objective should be created");
        let hidden = engine
            .create_objective(CreateObjectiveRequest {
                title: "Region seven objective".to_string(),
                description: None,
                owner_id: Uuid::new_v4(),
                region_id: 7,
                sub_region_id: None,
                start_date: date(2025, 1, 1),
                end_date: date(2025, 12, 31),
            })
            .await
            .expect("objective should be created");

        let scoped = user(Role::Gestor, &[5]);
        let listed = engine
            .list_objectives_for(&scoped, ObjectiveFilters::default())
            .await
            .expect("list should succeed");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, visible.id);

        // Out-of-scope get-by-id hides existence.
        let err = engine
            .get_objective_for(&scoped, hidden.id)
            .await
            .expect_err("hidden objective must not resolve");
        assert!(matches!(
            err,
            okrcore::goals::error::GoalsError::NotFound(_)
        ));

        let admin = user(Role::Admin, &[]);
        let all = engine
            .list_objectives_for(&admin, ObjectiveFilters::default())
            .await
            .expect("list should succeed");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn date_range_edits_regenerate_without_losing_reported_actuals() {
        let state = state();
        let engine = &state.engine;

        let objective = engine
            .create_objective(CreateObjectiveRequest {
                title: "Churn".to_string(),
                description: None,
                owner_id: Uuid::new_v4(),
                region_id: 1,
                sub_region_id: None,
                start_date: date(2025, 1, 1),
                end_date: date(2025, 12, 31),
            })
            .await
            .expect("objective should be created");
        let key_result = engine
            .create_key_result(CreateKeyResultRequest {
                objective_id: objective.id,
                title: "Monthly churn checkpoints".to_string(),
                description: None,
                initial_value: Some(0.0),
                target_value: 100.0,
                unit: None,
                frequency: Frequency::Monthly,
                start_date: date(2025, 1, 1),
                end_date: date(2025, 6, 30),
                strategic_indicator_ids: None,
                service_line_ids: None,
            })
            .await
            .expect("key result should be created");

        let checkpoints = state
            .store
            .list_checkpoints(key_result.id)
            .await
            .expect("checkpoints should list");
        engine
            .record_checkpoint(checkpoints[0].id, 12.0)
            .await
            .expect("check-in should succeed");

        // Extend the range; the 2025-02-01 period survives and keeps its actual.
        engine
            .update_key_result(
                key_result.id,
                okrcore::goals::UpdateKeyResultRequest {
                    end_date: Some(date(2025, 9, 30)),
                    ..Default::default()
                },
            )
            .await
            .expect("update should succeed");
        let regenerated = engine
            .regenerate_checkpoints(key_result.id)
            .await
            .expect("regeneration should succeed");

        assert_eq!(regenerated.last().unwrap().due_date, date(2025, 9, 30));
        let carried = regenerated
            .iter()
            .find(|cp| cp.due_date == date(2025, 2, 1))
            .expect("first period should survive");
        assert_eq!(carried.actual_value, Some(12.0));
    }
}
