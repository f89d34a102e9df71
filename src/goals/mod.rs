//! Temporal Progress Tracking Engine
//!
//! Composes the period enumerator, checkpoint generator, progress calculator
//! and access filter over an injected `GoalStore`. All reads exposed to the
//! API layer go through the access filter; all recomputation persists the
//! derived progress back onto the stored record, since dashboards read the
//! stored field rather than recomputing per view.

pub mod checkpoints;
pub mod error;
pub mod periods;
pub mod progress;

#[cfg(test)]
#[path = "goals.test.rs"]
mod goals_test;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{Placement, UserScope};
use crate::goals::checkpoints::{build_series, carry_over_actuals};
use crate::goals::error::GoalsError;
use crate::goals::progress::{classify_status, mean_progress, percentage, target_reached};
use crate::shared::models::{
    Action, ActionPriority, ActionStatus, Checkpoint, CheckpointStatus, Frequency, GoalStatus,
    KeyResult, Objective, ObjectiveFilters, Role, User,
};
use crate::storage::GoalStore;

const UPCOMING_CHECKPOINT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectiveRequest {
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub region_id: i32,
    pub sub_region_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateObjectiveRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<GoalStatus>,
    pub region_id: Option<i32>,
    pub sub_region_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyResultRequest {
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub initial_value: Option<f64>,
    pub target_value: f64,
    pub unit: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub strategic_indicator_ids: Option<Vec<i32>>,
    pub service_line_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateKeyResultRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActionRequest {
    pub key_result_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub responsible_id: Uuid,
    pub due_date: NaiveDate,
    pub priority: Option<ActionPriority>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateActionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub responsible_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<ActionStatus>,
    pub priority: Option<ActionPriority>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_objectives: i64,
    pub completed_objectives: i64,
    pub delayed_objectives: i64,
    pub average_progress: f64,
    pub total_key_results: i64,
    pub upcoming_checkpoints: Vec<UpcomingCheckpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingCheckpoint {
    pub checkpoint_id: Uuid,
    pub key_result_id: Uuid,
    pub key_result_title: String,
    pub objective_title: String,
    pub due_date: NaiveDate,
    pub target_value: f64,
}

/// Per-entity async locks. Regeneration is serialized per Key Result and
/// rollups per Objective; distinct ids proceed concurrently.
struct KeyedLocks {
    locks: tokio::sync::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    fn new() -> Self {
        Self {
            locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    async fn acquire(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

pub struct TrackingEngine {
    store: Arc<dyn GoalStore>,
    regeneration_locks: KeyedLocks,
    rollup_locks: KeyedLocks,
}

impl TrackingEngine {
    pub fn new(store: Arc<dyn GoalStore>) -> Self {
        Self {
            store,
            regeneration_locks: KeyedLocks::new(),
            rollup_locks: KeyedLocks::new(),
        }
    }

    // ===== Objectives =====

    pub async fn create_objective(
        &self,
        request: CreateObjectiveRequest,
    ) -> Result<Objective, GoalsError> {
        if request.end_date <= request.start_date {
            return Err(GoalsError::Validation(format!(
                "objective end date {} must be after start date {}",
                request.end_date, request.start_date
            )));
        }
        let now = Utc::now();
        let objective = Objective {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            owner_id: request.owner_id,
            region_id: request.region_id,
            sub_region_id: request.sub_region_id,
            start_date: request.start_date,
            end_date: request.end_date,
            status: GoalStatus::Pending,
            progress: 0.0,
            created_at: now,
            updated_at: now,
        };
        let objective = self.store.insert_objective(objective).await?;
        info!("Created objective: {} ({})", objective.title, objective.id);
        Ok(objective)
    }

    pub async fn update_objective(
        &self,
        id: Uuid,
        request: UpdateObjectiveRequest,
    ) -> Result<Objective, GoalsError> {
        let mut objective = self
            .store
            .get_objective(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;

        if let Some(title) = request.title {
            objective.title = title;
        }
        if let Some(description) = request.description {
            objective.description = Some(description);
        }
        if let Some(status) = request.status {
            objective.status = status;
        }
        if let Some(region_id) = request.region_id {
            objective.region_id = region_id;
        }
        if let Some(sub_region_id) = request.sub_region_id {
            objective.sub_region_id = Some(sub_region_id);
        }
        if let Some(start_date) = request.start_date {
            objective.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            objective.end_date = end_date;
        }
        if objective.end_date <= objective.start_date {
            return Err(GoalsError::Validation(format!(
                "objective end date {} must be after start date {}",
                objective.end_date, objective.start_date
            )));
        }
        objective.updated_at = Utc::now();

        let objective = self.store.update_objective(objective).await?;
        info!("Updated objective: {} ({})", objective.title, objective.id);
        Ok(objective)
    }

    pub async fn delete_objective(&self, id: Uuid) -> Result<(), GoalsError> {
        if !self.store.delete_objective(id).await? {
            return Err(GoalsError::NotFound("Objective not found".to_string()));
        }
        info!("Deleted objective: {id}");
        Ok(())
    }

    // ===== Key Results =====

    /// Creates the Key Result and generates its initial checkpoint series in
    /// one step, per the creation data flow.
    pub async fn create_key_result(
        &self,
        request: CreateKeyResultRequest,
    ) -> Result<KeyResult, GoalsError> {
        self.store
            .get_objective(request.objective_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;
        if request.end_date <= request.start_date {
            return Err(GoalsError::Validation(format!(
                "key result end date {} must be after start date {}",
                request.end_date, request.start_date
            )));
        }
        if request.target_value <= 0.0 || !request.target_value.is_finite() {
            return Err(GoalsError::Validation(format!(
                "key result target value must be positive, got {}",
                request.target_value
            )));
        }

        let initial_value = request.initial_value.unwrap_or(0.0);
        let now = Utc::now();
        let key_result = KeyResult {
            id: Uuid::new_v4(),
            objective_id: request.objective_id,
            title: request.title,
            description: request.description,
            initial_value,
            target_value: request.target_value,
            current_value: initial_value,
            unit: request.unit,
            frequency: request.frequency,
            start_date: request.start_date,
            end_date: request.end_date,
            status: GoalStatus::Pending,
            progress: 0.0,
            strategic_indicator_ids: request.strategic_indicator_ids.unwrap_or_default(),
            service_line_ids: request.service_line_ids.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let key_result = self.store.insert_key_result(key_result).await?;
        info!(
            "Created key result: {} ({})",
            key_result.title, key_result.id
        );

        self.regenerate_checkpoints(key_result.id).await?;
        Ok(key_result)
    }

    /// Persists the edit only. Progress recomputation and checkpoint
    /// regeneration are deliberate separate calls: regeneration resets the
    /// series and must never ride along as a side effect of an edit.
    pub async fn update_key_result(
        &self,
        id: Uuid,
        request: UpdateKeyResultRequest,
    ) -> Result<KeyResult, GoalsError> {
        let mut key_result = self
            .store
            .get_key_result(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;

        if let Some(title) = request.title {
            key_result.title = title;
        }
        if let Some(description) = request.description {
            key_result.description = Some(description);
        }
        if let Some(current_value) = request.current_value {
            key_result.current_value = coerce_finite(current_value, "current value");
        }
        if let Some(target_value) = request.target_value {
            key_result.target_value = target_value;
        }
        if let Some(unit) = request.unit {
            key_result.unit = Some(unit);
        }
        if let Some(frequency) = request.frequency {
            key_result.frequency = frequency;
        }
        if let Some(start_date) = request.start_date {
            key_result.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            key_result.end_date = end_date;
        }
        if let Some(status) = request.status {
            key_result.status = status;
        }
        if key_result.end_date <= key_result.start_date {
            return Err(GoalsError::Validation(format!(
                "key result end date {} must be after start date {}",
                key_result.end_date, key_result.start_date
            )));
        }
        if key_result.target_value <= 0.0 || !key_result.target_value.is_finite() {
            return Err(GoalsError::Validation(format!(
                "key result target value must be positive, got {}",
                key_result.target_value
            )));
        }
        key_result.updated_at = Utc::now();

        let key_result = self.store.update_key_result(key_result).await?;
        info!(
            "Updated key result: {} ({})",
            key_result.title, key_result.id
        );
        Ok(key_result)
    }

    pub async fn delete_key_result(&self, id: Uuid) -> Result<(), GoalsError> {
        if !self.store.delete_key_result(id).await? {
            return Err(GoalsError::NotFound("Key result not found".to_string()));
        }
        info!("Deleted key result: {id}");
        Ok(())
    }

    // ===== Checkpoints =====

    /// Rebuild and replace the whole checkpoint series for a Key Result.
    ///
    /// An explicit reset operation: the stored series is discarded and
    /// rebuilt from the current date range and frequency. Actual values
    /// reported for periods whose due date survives the rebuild are carried
    /// over. Serialized per Key Result; delete and insert never interleave
    /// between two concurrent calls.
    pub async fn regenerate_checkpoints(
        &self,
        key_result_id: Uuid,
    ) -> Result<Vec<Checkpoint>, GoalsError> {
        let lock = self.regeneration_locks.acquire(key_result_id).await;
        let _guard = lock.lock().await;

        let key_result = self
            .store
            .get_key_result(key_result_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;

        let mut series = build_series(&key_result)?;
        let previous = self.store.list_checkpoints(key_result_id).await?;
        carry_over_actuals(&mut series, &previous);

        let stored = self.store.replace_checkpoints(key_result_id, series).await?;
        info!(
            "Regenerated {} checkpoints for key result {}",
            stored.len(),
            key_result_id
        );
        Ok(stored)
    }

    /// Report an actual value for a checkpoint. Writes through to the Key
    /// Result's `current_value` (the latest report wins) and recomputes the
    /// Key Result and its Objective.
    pub async fn record_checkpoint(
        &self,
        checkpoint_id: Uuid,
        actual_value: f64,
    ) -> Result<Checkpoint, GoalsError> {
        let actual_value = coerce_finite(actual_value, "actual value");

        let mut checkpoint = self
            .store
            .get_checkpoint(checkpoint_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Checkpoint not found".to_string()))?;
        let mut key_result = self
            .store
            .get_key_result(checkpoint.key_result_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;

        checkpoint.actual_value = Some(actual_value);
        checkpoint.status = if target_reached(
            actual_value,
            checkpoint.target_value,
            key_result.is_increasing(),
        ) {
            CheckpointStatus::Completed
        } else {
            CheckpointStatus::Pending
        };
        checkpoint.updated_at = Utc::now();
        let checkpoint = self.store.update_checkpoint(checkpoint).await?;

        key_result.current_value = actual_value;
        key_result.updated_at = Utc::now();
        let key_result = self.store.update_key_result(key_result).await?;
        info!(
            "Recorded checkpoint {} for key result {}: {}",
            checkpoint.id, key_result.id, actual_value
        );

        self.recompute_key_result(key_result.id).await?;
        Ok(checkpoint)
    }

    // ===== Progress recomputation =====

    /// Recompute and persist a Key Result's progress from its stored
    /// current/target pair, then roll its Objective up. Checkpoints are a
    /// tracking aid; they are never averaged into this number.
    pub async fn recompute_key_result(&self, id: Uuid) -> Result<f64, GoalsError> {
        let key_result = self
            .store
            .get_key_result(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;

        let progress = percentage(key_result.current_value, key_result.target_value);
        let actions = self.store.list_actions(id).await?;
        let started = actions.iter().any(|a| a.status != ActionStatus::Pending);
        let status = classify_status(
            key_result.start_date,
            key_result.end_date,
            progress,
            started,
            Utc::now().date_naive(),
        );
        self.store
            .update_key_result_progress(id, progress, status)
            .await?;
        info!("Recomputed key result {id}: {progress:.1}%");

        self.recompute_objective(key_result.objective_id).await?;
        Ok(progress)
    }

    /// Recompute and persist an Objective's progress as the unweighted mean
    /// of its Key Results' stored progress. Serialized per Objective so a
    /// rollup never reads a half-updated child set.
    pub async fn recompute_objective(&self, id: Uuid) -> Result<f64, GoalsError> {
        let lock = self.rollup_locks.acquire(id).await;
        let _guard = lock.lock().await;

        let objective = self
            .store
            .get_objective(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;

        let key_results = self.store.list_key_results(id).await?;
        let values: Vec<f64> = key_results.iter().map(|kr| kr.progress).collect();
        let progress = mean_progress(&values);
        let started = key_results
            .iter()
            .any(|kr| kr.status != GoalStatus::Pending);
        let status = classify_status(
            objective.start_date,
            objective.end_date,
            progress,
            started,
            Utc::now().date_naive(),
        );
        self.store
            .update_objective_progress(id, progress, status)
            .await?;
        info!("Recomputed objective {id}: {progress:.1}%");
        Ok(progress)
    }

    // ===== Actions =====

    pub async fn create_action(&self, request: CreateActionRequest) -> Result<Action, GoalsError> {
        self.store
            .get_key_result(request.key_result_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;

        let existing = self.store.list_actions(request.key_result_id).await?;
        let number = existing.iter().map(|a| a.number).max().unwrap_or(0) + 1;

        let now = Utc::now();
        let action = Action {
            id: Uuid::new_v4(),
            key_result_id: request.key_result_id,
            number,
            title: request.title,
            description: request.description,
            responsible_id: request.responsible_id,
            due_date: request.due_date,
            status: ActionStatus::Pending,
            priority: request.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let action = self.store.insert_action(action).await?;
        info!(
            "Created action #{} for key result {}: {}",
            action.number, action.key_result_id, action.title
        );
        Ok(action)
    }

    pub async fn update_action(
        &self,
        id: Uuid,
        request: UpdateActionRequest,
    ) -> Result<Action, GoalsError> {
        let mut action = self
            .store
            .get_action(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Action not found".to_string()))?;

        if let Some(title) = request.title {
            action.title = title;
        }
        if let Some(description) = request.description {
            action.description = Some(description);
        }
        if let Some(responsible_id) = request.responsible_id {
            action.responsible_id = responsible_id;
        }
        if let Some(due_date) = request.due_date {
            action.due_date = due_date;
        }
        if let Some(status) = request.status {
            action.status = status;
        }
        if let Some(priority) = request.priority {
            action.priority = priority;
        }
        action.updated_at = Utc::now();

        let action = self.store.update_action(action).await?;
        info!("Updated action #{} ({})", action.number, action.id);
        Ok(action)
    }

    // ===== Scoped reads =====

    /// Resolve the requesting user's effective scope, following the gestor
    /// link for operacional users.
    pub async fn resolve_scope(&self, user: &User) -> Result<UserScope, GoalsError> {
        let manager = match (user.role, user.manager_id) {
            (Role::Operacional, Some(manager_id)) => self.store.get_user(manager_id).await?,
            _ => None,
        };
        Ok(UserScope::resolve(user, manager.as_ref()))
    }

    /// Narrow raw query filters to the user's scope. Consumed before any
    /// list query reaches storage.
    pub async fn filter_for_user(
        &self,
        user: &User,
        filters: ObjectiveFilters,
    ) -> Result<ObjectiveFilters, GoalsError> {
        let scope = self.resolve_scope(user).await?;
        Ok(scope.scope_filters(filters))
    }

    pub async fn list_objectives_for(
        &self,
        user: &User,
        filters: ObjectiveFilters,
    ) -> Result<Vec<Objective>, GoalsError> {
        let filters = self.filter_for_user(user, filters).await?;
        self.store.list_objectives(&filters).await
    }

    pub async fn get_objective_for(&self, user: &User, id: Uuid) -> Result<Objective, GoalsError> {
        let scope = self.resolve_scope(user).await?;
        let objective = self
            .store
            .get_objective(id)
            .await?
            .filter(|o| scope.visible(&Placement::of_objective(o)))
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;
        Ok(objective)
    }

    pub async fn get_key_result_for(&self, user: &User, id: Uuid) -> Result<KeyResult, GoalsError> {
        let scope = self.resolve_scope(user).await?;
        let key_result = self
            .store
            .get_key_result(id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
        let objective = self
            .store
            .get_objective(key_result.objective_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
        if !scope.visible(&Placement::of_key_result(&objective, &key_result)) {
            return Err(GoalsError::NotFound("Key result not found".to_string()));
        }
        Ok(key_result)
    }

    pub async fn list_key_results_for(
        &self,
        user: &User,
        objective_id: Uuid,
    ) -> Result<Vec<KeyResult>, GoalsError> {
        let scope = self.resolve_scope(user).await?;
        let objective = self
            .store
            .get_objective(objective_id)
            .await?
            .filter(|o| scope.visible(&Placement::of_objective(o)))
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;

        let key_results = self.store.list_key_results(objective_id).await?;
        Ok(key_results
            .into_iter()
            .filter(|kr| scope.visible(&Placement::of_key_result(&objective, kr)))
            .collect())
    }

    pub async fn list_actions_for(
        &self,
        user: &User,
        key_result_id: Uuid,
    ) -> Result<Vec<Action>, GoalsError> {
        self.get_key_result_for(user, key_result_id).await?;
        self.store.list_actions(key_result_id).await
    }

    pub async fn list_checkpoints_for(
        &self,
        user: &User,
        key_result_id: Uuid,
    ) -> Result<Vec<Checkpoint>, GoalsError> {
        self.get_key_result_for(user, key_result_id).await?;
        self.store.list_checkpoints(key_result_id).await
    }

    // ===== Dashboard =====

    /// KPI rollup over the user's visible objectives, optionally restricted
    /// to objectives overlapping a period.
    pub async fn dashboard_for(
        &self,
        user: &User,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<DashboardSummary, GoalsError> {
        let scope = self.resolve_scope(user).await?;
        let mut filters = ObjectiveFilters::default();
        if let Some((period_start, period_end)) = period {
            filters.period_start = Some(period_start);
            filters.period_end = Some(period_end);
        }
        let filters = scope.scope_filters(filters);
        let objectives = self.store.list_objectives(&filters).await?;

        let total_objectives = objectives.len() as i64;
        let completed_objectives = objectives
            .iter()
            .filter(|o| o.status == GoalStatus::Completed)
            .count() as i64;
        let delayed_objectives = objectives
            .iter()
            .filter(|o| o.status == GoalStatus::Delayed)
            .count() as i64;
        let values: Vec<f64> = objectives.iter().map(|o| o.progress).collect();
        let average_progress = mean_progress(&values);

        let today = Utc::now().date_naive();
        let mut total_key_results = 0i64;
        let mut upcoming: Vec<UpcomingCheckpoint> = Vec::new();
        for objective in &objectives {
            let key_results = self.store.list_key_results(objective.id).await?;
            for key_result in key_results
                .iter()
                .filter(|kr| scope.visible(&Placement::of_key_result(objective, kr)))
            {
                total_key_results += 1;
                let checkpoints = self.store.list_checkpoints(key_result.id).await?;
                upcoming.extend(
                    checkpoints
                        .iter()
                        .filter(|cp| {
                            cp.status == CheckpointStatus::Pending && cp.due_date >= today
                        })
                        .map(|cp| UpcomingCheckpoint {
                            checkpoint_id: cp.id,
                            key_result_id: key_result.id,
                            key_result_title: key_result.title.clone(),
                            objective_title: objective.title.clone(),
                            due_date: cp.due_date,
                            target_value: cp.target_value,
                        }),
                );
            }
        }
        upcoming.sort_by_key(|cp| cp.due_date);
        upcoming.truncate(UPCOMING_CHECKPOINT_LIMIT);

        Ok(DashboardSummary {
            total_objectives,
            completed_objectives,
            delayed_objectives,
            average_progress,
            total_key_results,
            upcoming_checkpoints: upcoming,
        })
    }
}

fn coerce_finite(value: f64, field: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("Coercing non-finite {field} to 0");
        0.0
    }
}
