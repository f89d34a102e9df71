//! Storage collaborator consumed by the tracking engine.
//!
//! One trait, one concrete adapter per backend, selected once at startup and
//! injected as an explicit `Arc<dyn GoalStore>` dependency. The engine never
//! reaches a module-level singleton or touches a connection directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::shared::models::{
    Action, Checkpoint, GoalStatus, KeyResult, Objective, ObjectiveFilters, User,
};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(test)]
#[path = "storage.test.rs"]
mod storage_test;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// CRUD contract over the record store. List operations receive filter sets
/// already narrowed by the access filter; the store applies them verbatim.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn insert_objective(&self, objective: Objective) -> Result<Objective, GoalsError>;
    async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>, GoalsError>;
    async fn list_objectives(
        &self,
        filters: &ObjectiveFilters,
    ) -> Result<Vec<Objective>, GoalsError>;
    async fn update_objective(&self, objective: Objective) -> Result<Objective, GoalsError>;
    async fn update_objective_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError>;
    async fn delete_objective(&self, id: Uuid) -> Result<bool, GoalsError>;

    async fn insert_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError>;
    async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>, GoalsError>;
    async fn list_key_results(&self, objective_id: Uuid) -> Result<Vec<KeyResult>, GoalsError>;
    async fn update_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError>;
    async fn update_key_result_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError>;
    async fn delete_key_result(&self, id: Uuid) -> Result<bool, GoalsError>;

    async fn insert_action(&self, action: Action) -> Result<Action, GoalsError>;
    async fn get_action(&self, id: Uuid) -> Result<Option<Action>, GoalsError>;
    async fn list_actions(&self, key_result_id: Uuid) -> Result<Vec<Action>, GoalsError>;
    async fn update_action(&self, action: Action) -> Result<Action, GoalsError>;

    /// Atomic delete-then-insert of a Key Result's whole checkpoint series.
    async fn replace_checkpoints(
        &self,
        key_result_id: Uuid,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Vec<Checkpoint>, GoalsError>;
    async fn list_checkpoints(&self, key_result_id: Uuid) -> Result<Vec<Checkpoint>, GoalsError>;
    async fn get_checkpoint(&self, id: Uuid) -> Result<Option<Checkpoint>, GoalsError>;
    async fn update_checkpoint(&self, checkpoint: Checkpoint) -> Result<Checkpoint, GoalsError>;

    async fn insert_user(&self, user: User) -> Result<User, GoalsError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, GoalsError>;
}
