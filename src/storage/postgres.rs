use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::shared::models::{
    Action, ActionPriority, ActionStatus, Checkpoint, CheckpointStatus, Frequency, GoalStatus,
    KeyResult, Objective, ObjectiveFilters, Role, User,
};
use crate::shared::utils::{parse_unit_ids, DbPool};
use crate::storage::GoalStore;

use self::schema::{actions, checkpoints, key_results, objectives, users};

pub mod schema {
    diesel::table! {
        objectives (id) {
            id -> Uuid,
            title -> Text,
            description -> Nullable<Text>,
            owner_id -> Uuid,
            region_id -> Int4,
            sub_region_id -> Nullable<Int4>,
            start_date -> Date,
            end_date -> Date,
            status -> Text,
            progress -> Numeric,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        key_results (id) {
            id -> Uuid,
            objective_id -> Uuid,
            title -> Text,
            description -> Nullable<Text>,
            initial_value -> Numeric,
            target_value -> Numeric,
            current_value -> Numeric,
            unit -> Nullable<Text>,
            frequency -> Text,
            start_date -> Date,
            end_date -> Date,
            status -> Text,
            progress -> Numeric,
            strategic_indicator_ids -> Array<Int4>,
            service_line_ids -> Array<Int4>,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        actions (id) {
            id -> Uuid,
            key_result_id -> Uuid,
            number -> Int4,
            title -> Text,
            description -> Nullable<Text>,
            responsible_id -> Uuid,
            due_date -> Date,
            status -> Text,
            priority -> Text,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        checkpoints (id) {
            id -> Uuid,
            key_result_id -> Uuid,
            period -> Text,
            target_value -> Numeric,
            actual_value -> Nullable<Numeric>,
            status -> Text,
            due_date -> Date,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        users (id) {
            id -> Uuid,
            username -> Text,
            email -> Text,
            role -> Text,
            manager_id -> Nullable<Uuid>,
            region_ids -> Text,
            sub_region_ids -> Text,
            solution_ids -> Text,
            service_line_ids -> Text,
            service_ids -> Text,
            is_active -> Bool,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }
}

// Database records - match schema exactly; numeric columns carry BigDecimal
// and are coerced at the boundary.

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = objectives)]
pub struct ObjectiveRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub region_id: i32,
    pub sub_region_id: Option<i32>,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub status: String,
    pub progress: BigDecimal,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = key_results)]
pub struct KeyResultRecord {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub initial_value: BigDecimal,
    pub target_value: BigDecimal,
    pub current_value: BigDecimal,
    pub unit: Option<String>,
    pub frequency: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub status: String,
    pub progress: BigDecimal,
    pub strategic_indicator_ids: Vec<i32>,
    pub service_line_ids: Vec<i32>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = actions)]
pub struct ActionRecord {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub number: i32,
    pub title: String,
    pub description: Option<String>,
    pub responsible_id: Uuid,
    pub due_date: chrono::NaiveDate,
    pub status: String,
    pub priority: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = checkpoints)]
pub struct CheckpointRecord {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub period: String,
    pub target_value: BigDecimal,
    pub actual_value: Option<BigDecimal>,
    pub status: String,
    pub due_date: chrono::NaiveDate,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

// Membership columns hold JSON text in legacy rows (sometimes
// double-encoded); they are normalized to typed id sets exactly once, here.
#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub manager_id: Option<Uuid>,
    pub region_ids: String,
    pub sub_region_ids: String,
    pub solution_ids: String,
    pub service_line_ids: String,
    pub service_ids: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

fn decimal_to_f64(value: &BigDecimal, entity: &str, field: &str) -> f64 {
    match value.to_f64() {
        Some(v) if v.is_finite() => v,
        _ => {
            warn!("Coercing non-numeric {entity}.{field} value to 0: {value}");
            0.0
        }
    }
}

fn f64_to_decimal(value: f64) -> BigDecimal {
    BigDecimal::try_from(value).unwrap_or_else(|_| BigDecimal::from(0))
}

fn ids_to_json(ids: &std::collections::HashSet<i32>) -> String {
    let mut sorted: Vec<i32> = ids.iter().copied().collect();
    sorted.sort_unstable();
    serde_json::to_string(&sorted).unwrap_or_else(|_| "[]".to_string())
}

fn record_to_objective(record: ObjectiveRecord) -> Objective {
    Objective {
        id: record.id,
        title: record.title,
        description: record.description,
        owner_id: record.owner_id,
        region_id: record.region_id,
        sub_region_id: record.sub_region_id,
        start_date: record.start_date,
        end_date: record.end_date,
        status: GoalStatus::from_str(&record.status),
        progress: decimal_to_f64(&record.progress, "objective", "progress"),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn objective_to_record(objective: &Objective) -> ObjectiveRecord {
    ObjectiveRecord {
        id: objective.id,
        title: objective.title.clone(),
        description: objective.description.clone(),
        owner_id: objective.owner_id,
        region_id: objective.region_id,
        sub_region_id: objective.sub_region_id,
        start_date: objective.start_date,
        end_date: objective.end_date,
        status: objective.status.to_str().to_string(),
        progress: f64_to_decimal(objective.progress),
        created_at: objective.created_at,
        updated_at: objective.updated_at,
    }
}

fn record_to_key_result(record: KeyResultRecord) -> KeyResult {
    let frequency = Frequency::from_str(&record.frequency).unwrap_or_else(|| {
        warn!(
            "Unrecognized frequency {:?} on key result {}, falling back to monthly",
            record.frequency, record.id
        );
        Frequency::default()
    });
    KeyResult {
        id: record.id,
        objective_id: record.objective_id,
        title: record.title,
        description: record.description,
        initial_value: decimal_to_f64(&record.initial_value, "key_result", "initial_value"),
        target_value: decimal_to_f64(&record.target_value, "key_result", "target_value"),
        current_value: decimal_to_f64(&record.current_value, "key_result", "current_value"),
        unit: record.unit,
        frequency,
        start_date: record.start_date,
        end_date: record.end_date,
        status: GoalStatus::from_str(&record.status),
        progress: decimal_to_f64(&record.progress, "key_result", "progress"),
        strategic_indicator_ids: record.strategic_indicator_ids,
        service_line_ids: record.service_line_ids,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn key_result_to_record(key_result: &KeyResult) -> KeyResultRecord {
    KeyResultRecord {
        id: key_result.id,
        objective_id: key_result.objective_id,
        title: key_result.title.clone(),
        description: key_result.description.clone(),
        initial_value: f64_to_decimal(key_result.initial_value),
        target_value: f64_to_decimal(key_result.target_value),
        current_value: f64_to_decimal(key_result.current_value),
        unit: key_result.unit.clone(),
        frequency: key_result.frequency.to_str().to_string(),
        start_date: key_result.start_date,
        end_date: key_result.end_date,
        status: key_result.status.to_str().to_string(),
        progress: f64_to_decimal(key_result.progress),
        strategic_indicator_ids: key_result.strategic_indicator_ids.clone(),
        service_line_ids: key_result.service_line_ids.clone(),
        created_at: key_result.created_at,
        updated_at: key_result.updated_at,
    }
}

fn record_to_action(record: ActionRecord) -> Action {
    Action {
        id: record.id,
        key_result_id: record.key_result_id,
        number: record.number,
        title: record.title,
        description: record.description,
        responsible_id: record.responsible_id,
        due_date: record.due_date,
        status: ActionStatus::from_str(&record.status),
        priority: ActionPriority::from_str(&record.priority),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn action_to_record(action: &Action) -> ActionRecord {
    ActionRecord {
        id: action.id,
        key_result_id: action.key_result_id,
        number: action.number,
        title: action.title.clone(),
        description: action.description.clone(),
        responsible_id: action.responsible_id,
        due_date: action.due_date,
        status: action.status.to_str().to_string(),
        priority: action.priority.to_str().to_string(),
        created_at: action.created_at,
        updated_at: action.updated_at,
    }
}

fn record_to_checkpoint(record: CheckpointRecord) -> Checkpoint {
    Checkpoint {
        id: record.id,
        key_result_id: record.key_result_id,
        period: record.period,
        target_value: decimal_to_f64(&record.target_value, "checkpoint", "target_value"),
        actual_value: record
            .actual_value
            .as_ref()
            .map(|v| decimal_to_f64(v, "checkpoint", "actual_value")),
        status: CheckpointStatus::from_str(&record.status),
        due_date: record.due_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn checkpoint_to_record(checkpoint: &Checkpoint) -> CheckpointRecord {
    CheckpointRecord {
        id: checkpoint.id,
        key_result_id: checkpoint.key_result_id,
        period: checkpoint.period.clone(),
        target_value: f64_to_decimal(checkpoint.target_value),
        actual_value: checkpoint.actual_value.map(f64_to_decimal),
        status: checkpoint.status.to_str().to_string(),
        due_date: checkpoint.due_date,
        created_at: checkpoint.created_at,
        updated_at: checkpoint.updated_at,
    }
}

fn record_to_user(record: UserRecord) -> User {
    User {
        id: record.id,
        username: record.username,
        email: record.email,
        role: Role::from_str(&record.role),
        manager_id: record.manager_id,
        region_ids: parse_unit_ids(&record.region_ids),
        sub_region_ids: parse_unit_ids(&record.sub_region_ids),
        solution_ids: parse_unit_ids(&record.solution_ids),
        service_line_ids: parse_unit_ids(&record.service_line_ids),
        service_ids: parse_unit_ids(&record.service_ids),
        is_active: record.is_active,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn user_to_record(user: &User) -> UserRecord {
    UserRecord {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.to_str().to_string(),
        manager_id: user.manager_id,
        region_ids: ids_to_json(&user.region_ids),
        sub_region_ids: ids_to_json(&user.sub_region_ids),
        solution_ids: ids_to_json(&user.solution_ids),
        service_line_ids: ids_to_json(&user.service_line_ids),
        service_ids: ids_to_json(&user.service_ids),
        is_active: user.is_active,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// Postgres adapter over an r2d2 pool; every call hops to the blocking pool
/// the way the rest of the request path expects.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoalStore for PgStore {
    async fn insert_objective(&self, objective: Objective) -> Result<Objective, GoalsError> {
        let pool = self.pool.clone();
        let record = objective_to_record(&objective);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::insert_into(objectives::table)
                .values(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(objective)
    }

    async fn get_objective(&self, id: Uuid) -> Result<Option<Objective>, GoalsError> {
        let pool = self.pool.clone();
        let record = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            objectives::table
                .find(id)
                .first::<ObjectiveRecord>(&mut conn)
                .optional()
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(record.map(record_to_objective))
    }

    async fn list_objectives(
        &self,
        filters: &ObjectiveFilters,
    ) -> Result<Vec<Objective>, GoalsError> {
        let pool = self.pool.clone();
        let filters = filters.clone();
        let records = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;

            let mut query = objectives::table.into_boxed();
            if let Some(owner_id) = filters.owner_id {
                query = query.filter(objectives::owner_id.eq(owner_id));
            }
            if let Some(status) = filters.status {
                query = query.filter(objectives::status.eq(status.to_str()));
            }
            if let Some(region_ids) = filters.region_ids {
                query = query.filter(objectives::region_id.eq_any(region_ids));
            }
            if let Some(sub_region_ids) = filters.sub_region_ids {
                let ids: Vec<Option<i32>> = sub_region_ids.into_iter().map(Some).collect();
                query = query.filter(
                    objectives::sub_region_id
                        .is_null()
                        .or(objectives::sub_region_id.eq_any(ids)),
                );
            }
            if let Some(period_end) = filters.period_end {
                query = query.filter(objectives::start_date.le(period_end));
            }
            if let Some(period_start) = filters.period_start {
                query = query.filter(objectives::end_date.ge(period_start));
            }

            query = query.order(objectives::created_at.desc());
            if let Some(limit) = filters.limit {
                query = query.limit(limit);
            }
            if let Some(offset) = filters.offset {
                query = query.offset(offset);
            }

            query
                .load::<ObjectiveRecord>(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(records.into_iter().map(record_to_objective).collect())
    }

    async fn update_objective(&self, objective: Objective) -> Result<Objective, GoalsError> {
        let pool = self.pool.clone();
        let record = objective_to_record(&objective);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(objectives::table.find(record.id))
                .set(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Objective not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(objective)
    }

    async fn update_objective_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(objectives::table.find(id))
                .set((
                    objectives::progress.eq(f64_to_decimal(progress)),
                    objectives::status.eq(status.to_str()),
                    objectives::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Objective not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(())
    }

    async fn delete_objective(&self, id: Uuid) -> Result<bool, GoalsError> {
        let pool = self.pool.clone();
        let deleted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::delete(objectives::table.find(id))
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(deleted > 0)
    }

    async fn insert_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError> {
        let pool = self.pool.clone();
        let record = key_result_to_record(&key_result);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::insert_into(key_results::table)
                .values(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(key_result)
    }

    async fn get_key_result(&self, id: Uuid) -> Result<Option<KeyResult>, GoalsError> {
        let pool = self.pool.clone();
        let record = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            key_results::table
                .find(id)
                .first::<KeyResultRecord>(&mut conn)
                .optional()
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(record.map(record_to_key_result))
    }

    async fn list_key_results(&self, objective_id: Uuid) -> Result<Vec<KeyResult>, GoalsError> {
        let pool = self.pool.clone();
        let records = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            key_results::table
                .filter(key_results::objective_id.eq(objective_id))
                .order(key_results::created_at.asc())
                .load::<KeyResultRecord>(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(records.into_iter().map(record_to_key_result).collect())
    }

    async fn update_key_result(&self, key_result: KeyResult) -> Result<KeyResult, GoalsError> {
        let pool = self.pool.clone();
        let record = key_result_to_record(&key_result);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(key_results::table.find(record.id))
                .set(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Key result not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(key_result)
    }

    async fn update_key_result_progress(
        &self,
        id: Uuid,
        progress: f64,
        status: GoalStatus,
    ) -> Result<(), GoalsError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(key_results::table.find(id))
                .set((
                    key_results::progress.eq(f64_to_decimal(progress)),
                    key_results::status.eq(status.to_str()),
                    key_results::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Key result not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(())
    }

    async fn delete_key_result(&self, id: Uuid) -> Result<bool, GoalsError> {
        let pool = self.pool.clone();
        let deleted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::delete(key_results::table.find(id))
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(deleted > 0)
    }

    async fn insert_action(&self, action: Action) -> Result<Action, GoalsError> {
        let pool = self.pool.clone();
        let record = action_to_record(&action);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::insert_into(actions::table)
                .values(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(action)
    }

    async fn get_action(&self, id: Uuid) -> Result<Option<Action>, GoalsError> {
        let pool = self.pool.clone();
        let record = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            actions::table
                .find(id)
                .first::<ActionRecord>(&mut conn)
                .optional()
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(record.map(record_to_action))
    }

    async fn list_actions(&self, key_result_id: Uuid) -> Result<Vec<Action>, GoalsError> {
        let pool = self.pool.clone();
        let records = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            actions::table
                .filter(actions::key_result_id.eq(key_result_id))
                .order(actions::number.asc())
                .load::<ActionRecord>(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(records.into_iter().map(record_to_action).collect())
    }

    async fn update_action(&self, action: Action) -> Result<Action, GoalsError> {
        let pool = self.pool.clone();
        let record = action_to_record(&action);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(actions::table.find(record.id))
                .set(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Action not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(action)
    }

    async fn replace_checkpoints(
        &self,
        key_result_id: Uuid,
        checkpoints_in: Vec<Checkpoint>,
    ) -> Result<Vec<Checkpoint>, GoalsError> {
        let pool = self.pool.clone();
        let records: Vec<CheckpointRecord> =
            checkpoints_in.iter().map(checkpoint_to_record).collect();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(
                    checkpoints::table.filter(checkpoints::key_result_id.eq(key_result_id)),
                )
                .execute(conn)?;
                diesel::insert_into(checkpoints::table)
                    .values(&records)
                    .execute(conn)?;
                Ok(())
            })
            .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(checkpoints_in)
    }

    async fn list_checkpoints(&self, key_result_id: Uuid) -> Result<Vec<Checkpoint>, GoalsError> {
        let pool = self.pool.clone();
        let records = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            checkpoints::table
                .filter(checkpoints::key_result_id.eq(key_result_id))
                .order(checkpoints::due_date.asc())
                .load::<CheckpointRecord>(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(records.into_iter().map(record_to_checkpoint).collect())
    }

    async fn get_checkpoint(&self, id: Uuid) -> Result<Option<Checkpoint>, GoalsError> {
        let pool = self.pool.clone();
        let record = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            checkpoints::table
                .find(id)
                .first::<CheckpointRecord>(&mut conn)
                .optional()
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(record.map(record_to_checkpoint))
    }

    async fn update_checkpoint(&self, checkpoint: Checkpoint) -> Result<Checkpoint, GoalsError> {
        let pool = self.pool.clone();
        let record = checkpoint_to_record(&checkpoint);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let updated = diesel::update(checkpoints::table.find(record.id))
                .set(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(GoalsError::NotFound("Checkpoint not found".to_string()));
            }
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(checkpoint)
    }

    async fn insert_user(&self, user: User) -> Result<User, GoalsError> {
        let pool = self.pool.clone();
        let record = user_to_record(&user);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            diesel::insert_into(users::table)
                .values(&record)
                .execute(&mut conn)
                .map_err(|e| GoalsError::Database(e.to_string()))?;
            Ok::<_, GoalsError>(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, GoalsError> {
        let pool = self.pool.clone();
        let record = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            users::table
                .find(id)
                .first::<UserRecord>(&mut conn)
                .optional()
                .map_err(|e| GoalsError::Database(e.to_string()))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;
        Ok(record.map(record_to_user))
    }
}
