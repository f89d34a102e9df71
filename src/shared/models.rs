use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status shared by Objectives and Key Results. Progress recomputation
/// reclassifies it; `Delayed` means the end date passed with the target unmet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Pending,
    Active,
    Delayed,
    Completed,
}

impl GoalStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "delayed" => Self::Delayed,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Delayed => "delayed",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl ActionStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl ActionPriority {
    pub fn from_str(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    #[default]
    Pending,
    Completed,
}

impl CheckpointStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// Sampling frequency of a Key Result's checkpoint series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
}

impl Frequency {
    /// Strict parse; callers at the storage boundary decide how to recover
    /// from an unrecognized value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Gestor,
    #[default]
    Operacional,
}

impl Role {
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            "gestor" => Self::Gestor,
            _ => Self::Operacional,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Gestor => "gestor",
            Self::Operacional => "operacional",
        }
    }
}

/// Top-level organizational goal. `progress` is derived (mean of its Key
/// Results) and persisted by recomputation, not edited directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub region_id: i32,
    pub sub_region_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: GoalStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measurable numeric target under an Objective. `current_value` is the
/// authoritative progress source; checkpoint check-ins write through to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub initial_value: f64,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: GoalStatus,
    pub progress: f64,
    pub strategic_indicator_ids: Vec<i32>,
    pub service_line_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KeyResult {
    /// Whether the target lies above the initial value. Decreasing targets
    /// invert the "reached" comparison for checkpoints.
    pub fn is_increasing(&self) -> bool {
        self.target_value >= self.initial_value
    }
}

/// Discrete task under a Key Result. `number` is unique and increasing per
/// Key Result, assigned at creation as max(existing) + 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub number: i32,
    pub title: String,
    pub description: Option<String>,
    pub responsible_id: Uuid,
    pub due_date: NaiveDate,
    pub status: ActionStatus,
    pub priority: ActionPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One period of a Key Result's generated series: a cumulative target and the
/// actual value reported for that period (None until a check-in lands).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub period: String,
    pub target_value: f64,
    pub actual_value: Option<f64>,
    pub status: CheckpointStatus,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership sets are normalized to typed id sets once at the storage
/// boundary; nothing downstream re-parses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
    pub region_ids: HashSet<i32>,
    pub sub_region_ids: HashSet<i32>,
    pub solution_ids: HashSet<i32>,
    pub service_line_ids: HashSet<i32>,
    pub service_ids: HashSet<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter set consumed by `GoalStore::list_objectives`. The engine narrows
/// the unit-id sets through the access filter before any query reaches
/// storage; `None` means unrestricted.
///
/// `sub_region_ids` follows visibility semantics: an objective that declares
/// no sub-region passes the filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveFilters {
    pub owner_id: Option<Uuid>,
    pub status: Option<GoalStatus>,
    pub region_ids: Option<Vec<i32>>,
    pub sub_region_ids: Option<Vec<i32>>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ObjectiveFilters {
    /// In-memory evaluation of the filter set, mirroring what the SQL adapter
    /// expresses in its WHERE clause. Limit/offset are applied by the store
    /// after sorting, not here.
    pub fn matches(&self, objective: &Objective) -> bool {
        if let Some(owner_id) = self.owner_id {
            if objective.owner_id != owner_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if objective.status != status {
                return false;
            }
        }
        if let Some(ref region_ids) = self.region_ids {
            if !region_ids.contains(&objective.region_id) {
                return false;
            }
        }
        if let Some(ref sub_region_ids) = self.sub_region_ids {
            if let Some(sub_region_id) = objective.sub_region_id {
                if !sub_region_ids.contains(&sub_region_id) {
                    return false;
                }
            }
        }
        if let Some(period_end) = self.period_end {
            if objective.start_date > period_end {
                return false;
            }
        }
        if let Some(period_start) = self.period_start {
            if objective.end_date < period_start {
                return false;
            }
        }
        true
    }
}
