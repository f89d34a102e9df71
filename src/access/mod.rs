//! Hierarchical Access Filter
//!
//! Visibility is decided by cascading organizational-unit membership over two
//! independent hierarchies: region > sub-region, and solution > service line
//! > service. Within a hierarchy the narrowest non-empty membership set wins
//! and broader sets are ignored; a user with no configured scope at any level
//! falls back to unrestricted visibility (deliberate default-open policy for
//! unscoped accounts). Filter decisions never raise; denied single-entity
//! reads surface as `NotFound` at the engine so existence is not leaked.

use std::collections::HashSet;

use crate::shared::models::{KeyResult, Objective, ObjectiveFilters, Role, User};

#[cfg(test)]
#[path = "access.test.rs"]
mod access_test;

/// Organizational-unit attributes an entity declares. A dimension the entity
/// does not declare is never filtered on.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    pub region_id: Option<i32>,
    pub sub_region_id: Option<i32>,
    pub solution_ids: Vec<i32>,
    pub service_line_ids: Vec<i32>,
    pub service_ids: Vec<i32>,
}

impl Placement {
    pub fn of_objective(objective: &Objective) -> Self {
        Placement {
            region_id: Some(objective.region_id),
            sub_region_id: objective.sub_region_id,
            ..Default::default()
        }
    }

    /// Key Results inherit their Objective's placement and add their own
    /// service-line associations.
    pub fn of_key_result(objective: &Objective, key_result: &KeyResult) -> Self {
        Placement {
            region_id: Some(objective.region_id),
            sub_region_id: objective.sub_region_id,
            service_line_ids: key_result.service_line_ids.clone(),
            ..Default::default()
        }
    }
}

/// A user's effective membership sets, resolved once per request. An
/// `operacional` user linked to a gestor inherits the gestor's set for every
/// dimension where no narrower set was explicitly granted.
#[derive(Debug, Clone)]
pub struct UserScope {
    pub role: Role,
    pub region_ids: HashSet<i32>,
    pub sub_region_ids: HashSet<i32>,
    pub solution_ids: HashSet<i32>,
    pub service_line_ids: HashSet<i32>,
    pub service_ids: HashSet<i32>,
}

impl UserScope {
    pub fn resolve(user: &User, manager: Option<&User>) -> Self {
        let mut scope = UserScope {
            role: user.role,
            region_ids: user.region_ids.clone(),
            sub_region_ids: user.sub_region_ids.clone(),
            solution_ids: user.solution_ids.clone(),
            service_line_ids: user.service_line_ids.clone(),
            service_ids: user.service_ids.clone(),
        };
        if user.role == Role::Operacional {
            if let Some(manager) = manager {
                if scope.region_ids.is_empty() {
                    scope.region_ids = manager.region_ids.clone();
                }
                if scope.sub_region_ids.is_empty() {
                    scope.sub_region_ids = manager.sub_region_ids.clone();
                }
                if scope.solution_ids.is_empty() {
                    scope.solution_ids = manager.solution_ids.clone();
                }
                if scope.service_line_ids.is_empty() {
                    scope.service_line_ids = manager.service_line_ids.clone();
                }
                if scope.service_ids.is_empty() {
                    scope.service_ids = manager.service_ids.clone();
                }
            }
        }
        scope
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether an entity with the given placement is visible to this scope.
    /// Every hierarchy is evaluated independently; the entity must pass each
    /// dimension it declares.
    pub fn visible(&self, placement: &Placement) -> bool {
        if self.is_admin() {
            return true;
        }
        cascade_scalar(&[
            (&self.sub_region_ids, placement.sub_region_id),
            (&self.region_ids, placement.region_id),
        ]) && cascade_list(&[
            (&self.service_ids, &placement.service_ids),
            (&self.service_line_ids, &placement.service_line_ids),
            (&self.solution_ids, &placement.solution_ids),
        ])
    }

    /// Narrow a caller-supplied filter set to what this scope may see, before
    /// the query reaches storage. Requested ids are intersected with the
    /// effective set; an absent request expands to the whole effective set.
    pub fn scope_filters(&self, mut filters: ObjectiveFilters) -> ObjectiveFilters {
        if self.is_admin() {
            return filters;
        }
        if !self.sub_region_ids.is_empty() {
            filters.sub_region_ids =
                Some(intersect_requested(&filters.sub_region_ids, &self.sub_region_ids));
        } else if !self.region_ids.is_empty() {
            filters.region_ids =
                Some(intersect_requested(&filters.region_ids, &self.region_ids));
        }
        filters
    }
}

/// Levels ordered narrowest first. The first non-empty membership set decides
/// the hierarchy: the declared id must belong to it, and an undeclared level
/// passes. All levels empty means unrestricted.
fn cascade_scalar(levels: &[(&HashSet<i32>, Option<i32>)]) -> bool {
    for (members, declared) in levels {
        if !members.is_empty() {
            return declared.map_or(true, |id| members.contains(&id));
        }
    }
    true
}

/// List-valued variant: the entity passes when any declared id belongs to the
/// deciding set; an empty declaration is an undeclared dimension.
fn cascade_list(levels: &[(&HashSet<i32>, &Vec<i32>)]) -> bool {
    for (members, declared) in levels {
        if !members.is_empty() {
            return declared.is_empty() || declared.iter().any(|id| members.contains(id));
        }
    }
    true
}

fn intersect_requested(requested: &Option<Vec<i32>>, allowed: &HashSet<i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = match requested {
        Some(ids) => ids.iter().copied().filter(|id| allowed.contains(id)).collect(),
        None => allowed.iter().copied().collect(),
    };
    ids.sort_unstable();
    ids
}
