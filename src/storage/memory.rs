use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::shared::models::{
    Action, Checkpoint, GoalStatus, KeyResult, Objective, ObjectiveFilters, User,
};
use crate::storage::GoalStore;

/// In-memory adapter, used by tests and as a single-process fallback.
#[derive(Default)]
pub struct MemoryStore {
    objectives: Arc<RwLock<HashMap<Uuid, Objective>>>,
    key_results: Arc<RwLock<HashMap<Uuid, KeyResult>>>,
    actions: Arc<RwLock<HashMap<Uuid, Action>>>,
    checkpoints: Arc<RwLock<HashMap<Uuid, Checkpoint>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoalStore for MemoryStore {
    async fn insert_objective(&self, objective: Objective) -> Result<Objective, GoalsError> {
        let mut objectives = self.objectives.write().await;
        objectives.insert(objective.id, objective.clone());
        Ok(objective)
    }

    async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>, GoalsError> {
        let objectives = self.objectives.read().await;
        Ok(objectives.get(&id).cloned())
    }

    async fn list_objectives(
        &self,
        filters: &ObjectiveFilters,
    ) -> Result<Vec<Objective>, GoalsError> {
        let objectives = self.objectives.read().await;
        let mut matched: Vec<Objective> = objectives
            .values()
            .filter(|o| filters.matches(o))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(offset) = filters.offset {
            matched = matched.into_iter().skip(offset.max(0) as usize).collect();
        }
        if let Some(limit) = filters.limit {
            matched.truncate(limit.max(0) as usize);
        }
        Ok(matched)
    }

    async fn update_objective(&self, objective: Objective) -> Result<Objective, GoalsError> {
        let mut objectives = self.objectives.write().await;
        if !objectives.contains_key(&objective.id) {
            return Err(GoalsError::NotFound("Objective not found".to_string()));
        }
        objectives.insert(objective.id, objective.clone());
        Ok(objective)
    }

    async fn update_objective_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError> {
        let mut objectives = self.objectives.write().await;
        let objective = objectives
            .get_mut(&id)
            .ok_or_else(|| GoalsError::NotFound("Objective not found".to_string()))?;
        objective.progress = progress;
        objective.status = status;
        objective.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_objective(&self, id: Uuid) -> Result<bool, GoalsError> {
        let mut objectives = self.objectives.write().await;
        Ok(objectives.remove(&id).is_some())
    }

    async fn insert_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError> {
        let mut key_results = self.key_results.write().await;
        key_results.insert(key_result.id, key_result.clone());
        Ok(key_result)
    }

    async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>, GoalsError> {
        let key_results = self.key_results.read().await;
        Ok(key_results.get(&id).cloned())
    }

    async fn list_key_results(&self, objective_id: Uuid) -> Result<Vec<KeyResult>, GoalsError> {
        let key_results = self.key_results.read().await;
        let mut matched: Vec<KeyResult> = key_results
            .values()
            .filter(|kr| kr.objective_id == objective_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matched)
    }

    async fn update_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError> {
        let mut key_results = self.key_results.write().await;
        if !key_results.contains_key(&key_result.id) {
            return Err(GoalsError::NotFound("Key result not found".to_string()));
        }
        key_results.insert(key_result.id, key_result.clone());
        Ok(key_result)
    }

    async fn update_key_result_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError> {
        let mut key_results = self.key_results.write().await;
        let key_result = key_results
            .get_mut(&id)
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
        key_result.progress = progress;
        key_result.status = status;
        key_result.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_key_result(&self, id: Uuid) -> Result<bool, GoalsError> {
        let mut key_results = self.key_results.write().await;
        Ok(key_results.remove(&id).is_some())
    }

    async fn insert_action(&self, action: Action) -> Result<Action, GoalsError> {
        let mut actions = self.actions.write().await;
        actions.insert(action.id, action.clone());
        Ok(action)
    }

    async fn get_action(&self, id: Uuid) -> Result<Option<Action>, GoalsError> {
        let actions = self.actions.read().await;
        Ok(actions.get(&id).cloned())
    }

    async fn list_actions(&self, key_result_id: Uuid) -> Result<Vec<Action>, GoalsError> {
        let actions = self.actions.read().await;
        let mut matched: Vec<Action> = actions
            .values()
            .filter(|a| a.key_result_id == key_result_id)
            .cloned()
            .collect();
        matched.sort_by_key(|a| a.number);
        Ok(matched)
    }

    async fn update_action(&self, action: Action) -> Result<Action, GoalsError> {
        let mut actions = self.actions.write().await;
        if !actions.contains_key(&action.id) {
            return Err(GoalsError::NotFound("Action not found".to_string()));
        }
        actions.insert(action.id, action.clone());
        Ok(action)
    }

    async fn replace_checkpoints(
        &self,
        key_result_id: Uuid,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Vec<Checkpoint>, GoalsError> {
        let mut stored = self.checkpoints.write().await;
        stored.retain(|_, cp| cp.key_result_id != key_result_id);
        for checkpoint in &checkpoints {
            stored.insert(checkpoint.id, checkpoint.clone());
        }
        Ok(checkpoints)
    }

    async fn list_checkpoints(&self, key_result_id: Uuid) -> Result<Vec<Checkpoint>, GoalsError> {
        let checkpoints = self.checkpoints.read().await;
        let mut matched: Vec<Checkpoint> = checkpoints
            .values()
            .filter(|cp| cp.key_result_id == key_result_id)
            .cloned()
            .collect();
        matched.sort_by_key(|cp| cp.due_date);
        Ok(matched)
    }

    async fn get_checkpoint(&self, id: Uuid) -> Result<Option<Checkpoint>, GoalsError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(&id).cloned())
    }

    async fn update_checkpoint(&self, checkpoint: Checkpoint) -> Result<Checkpoint, GoalsError> {
        let mut checkpoints = self.checkpoints.write().await;
        if !checkpoints.contains_key(&checkpoint.id) {
            return Err(GoalsError::NotFound("Checkpoint not found".to_string()));
        }
        checkpoints.insert(checkpoint.id, checkpoint.clone());
        Ok(checkpoint)
    }

    async fn insert_user(&self, user: User) -> Result<User, GoalsError> {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, GoalsError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }
}
