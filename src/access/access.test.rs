//! Tests for the hierarchical access filter.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::access::{Placement, UserScope};
use crate::shared::models::{ObjectiveFilters, Role, User};
use crate::tests::test_util;

fn user(role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: "joao".to_string(),
        email: "joao@example.com".to_string(),
        role,
        manager_id: None,
        region_ids: HashSet::new(),
        sub_region_ids: HashSet::new(),
        solution_ids: HashSet::new(),
        service_line_ids: HashSet::new(),
        service_ids: HashSet::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn ids(values: &[i32]) -> HashSet<i32> {
    values.iter().copied().collect()
}

fn region_placement(region_id: i32, sub_region_id: Option<i32>) -> Placement {
    Placement {
        region_id: Some(region_id),
        sub_region_id,
        ..Default::default()
    }
}

mod visibility_tests {
    use super::*;

    #[test]
    fn admin_sees_everything() {
        test_util::setup();
        let scope = UserScope::resolve(&user(Role::Admin), None);
        assert!(scope.visible(&region_placement(7, Some(3))));
    }

    #[test]
    fn unscoped_user_falls_back_to_default_open() {
        test_util::setup();
        let scope = UserScope::resolve(&user(Role::Gestor), None);
        assert!(scope.visible(&region_placement(7, None)));
        assert!(scope.visible(&region_placement(1, Some(9))));
    }

    #[test]
    fn region_membership_gates_visibility() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.region_ids = ids(&[5]);
        let scope = UserScope::resolve(&u, None);
        assert!(scope.visible(&region_placement(5, None)));
        assert!(!scope.visible(&region_placement(7, None)));
    }

    #[test]
    fn sub_region_set_overrides_region_set() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.region_ids = ids(&[1, 2]);
        u.sub_region_ids = ids(&[9]);
        let scope = UserScope::resolve(&u, None);
        // The narrower set decides, regardless of region.
        assert!(scope.visible(&region_placement(7, Some(9))));
        assert!(!scope.visible(&region_placement(1, Some(3))));
    }

    #[test]
    fn undeclared_dimension_is_not_filtered() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.sub_region_ids = ids(&[9]);
        let scope = UserScope::resolve(&u, None);
        assert!(scope.visible(&region_placement(7, None)));
    }

    #[test]
    fn service_line_membership_gates_key_result_placements() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.service_line_ids = ids(&[4]);
        let scope = UserScope::resolve(&u, None);

        let mut placement = Placement::default();
        placement.service_line_ids = vec![4, 9];
        assert!(scope.visible(&placement));

        placement.service_line_ids = vec![9];
        assert!(!scope.visible(&placement));

        placement.service_line_ids = vec![];
        assert!(scope.visible(&placement));
    }

    #[test]
    fn service_set_overrides_service_line_and_solution() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.solution_ids = ids(&[1]);
        u.service_line_ids = ids(&[2]);
        u.service_ids = ids(&[30]);
        let scope = UserScope::resolve(&u, None);

        let mut placement = Placement::default();
        placement.service_ids = vec![30];
        placement.service_line_ids = vec![99];
        assert!(scope.visible(&placement));

        placement.service_ids = vec![31];
        assert!(!scope.visible(&placement));
    }
}

mod scope_resolution_tests {
    use super::*;

    #[test]
    fn operacional_inherits_manager_sets_when_empty() {
        test_util::setup();
        let mut manager = user(Role::Gestor);
        manager.region_ids = ids(&[1, 2]);
        manager.service_line_ids = ids(&[4]);

        let mut u = user(Role::Operacional);
        u.manager_id = Some(manager.id);
        let scope = UserScope::resolve(&u, Some(&manager));
        assert_eq!(scope.region_ids, ids(&[1, 2]));
        assert_eq!(scope.service_line_ids, ids(&[4]));
    }

    #[test]
    fn explicit_sets_are_not_overridden_by_the_manager() {
        test_util::setup();
        let mut manager = user(Role::Gestor);
        manager.region_ids = ids(&[1, 2]);

        let mut u = user(Role::Operacional);
        u.manager_id = Some(manager.id);
        u.region_ids = ids(&[5]);
        let scope = UserScope::resolve(&u, Some(&manager));
        assert_eq!(scope.region_ids, ids(&[5]));
    }

    #[test]
    fn gestor_does_not_inherit() {
        test_util::setup();
        let mut manager = user(Role::Gestor);
        manager.region_ids = ids(&[1, 2]);

        let u = user(Role::Gestor);
        let scope = UserScope::resolve(&u, Some(&manager));
        assert!(scope.region_ids.is_empty());
    }
}

mod scope_filters_tests {
    use super::*;

    #[test]
    fn admin_filters_pass_through_untouched() {
        test_util::setup();
        let scope = UserScope::resolve(&user(Role::Admin), None);
        let filters = scope.scope_filters(ObjectiveFilters::default());
        assert!(filters.region_ids.is_none());
        assert!(filters.sub_region_ids.is_none());
    }

    #[test]
    fn unscoped_filters_stay_unrestricted() {
        test_util::setup();
        let scope = UserScope::resolve(&user(Role::Gestor), None);
        let filters = scope.scope_filters(ObjectiveFilters::default());
        assert!(filters.region_ids.is_none());
        assert!(filters.sub_region_ids.is_none());
    }

    #[test]
    fn region_scope_narrows_the_region_filter() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.region_ids = ids(&[1, 2]);
        let scope = UserScope::resolve(&u, None);
        let filters = scope.scope_filters(ObjectiveFilters::default());
        assert_eq!(filters.region_ids, Some(vec![1, 2]));
    }

    #[test]
    fn requested_ids_are_intersected_with_the_scope() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.region_ids = ids(&[1, 2]);
        let scope = UserScope::resolve(&u, None);
        let filters = scope.scope_filters(ObjectiveFilters {
            region_ids: Some(vec![2, 3]),
            ..Default::default()
        });
        assert_eq!(filters.region_ids, Some(vec![2]));
    }

    #[test]
    fn sub_region_scope_wins_over_region_scope() {
        test_util::setup();
        let mut u = user(Role::Gestor);
        u.region_ids = ids(&[1, 2]);
        u.sub_region_ids = ids(&[9]);
        let scope = UserScope::resolve(&u, None);
        let filters = scope.scope_filters(ObjectiveFilters::default());
        assert_eq!(filters.sub_region_ids, Some(vec![9]));
        // The broader set is ignored for this dimension.
        assert!(filters.region_ids.is_none());
    }
}
