//! Tests for shared models and utilities.

use crate::tests::test_util;

mod unit_id_parsing_tests {
    use super::*;
    use crate::shared::utils::parse_unit_ids;
    use std::collections::HashSet;

    fn ids(values: &[i32]) -> HashSet<i32> {
        values.iter().copied().collect()
    }

    #[test]
    fn parses_native_json_arrays() {
        test_util::setup();
        assert_eq!(parse_unit_ids("[1, 2, 3]"), ids(&[1, 2, 3]));
        assert_eq!(parse_unit_ids("[]"), ids(&[]));
    }

    #[test]
    fn parses_double_encoded_arrays() {
        test_util::setup();
        assert_eq!(parse_unit_ids("\"[1,2,3]\""), ids(&[1, 2, 3]));
    }

    #[test]
    fn parses_string_elements_and_bare_numbers() {
        test_util::setup();
        assert_eq!(parse_unit_ids("[\"1\", \"2\"]"), ids(&[1, 2]));
        assert_eq!(parse_unit_ids("7"), ids(&[7]));
    }

    #[test]
    fn parses_legacy_comma_separated_text() {
        test_util::setup();
        assert_eq!(parse_unit_ids("1, 2, 3"), ids(&[1, 2, 3]));
    }

    #[test]
    fn unparseable_input_contributes_nothing() {
        test_util::setup();
        assert_eq!(parse_unit_ids(""), ids(&[]));
        assert_eq!(parse_unit_ids("   "), ids(&[]));
        assert_eq!(parse_unit_ids("garbage"), ids(&[]));
        assert_eq!(parse_unit_ids("[true, null]"), ids(&[]));
    }
}

mod enum_tests {
    use super::*;
    use crate::shared::models::{ActionStatus, Frequency, GoalStatus, Role};

    #[test]
    fn goal_status_round_trips_with_pending_fallback() {
        test_util::setup();
        for status in [
            GoalStatus::Pending,
            GoalStatus::Active,
            GoalStatus::Delayed,
            GoalStatus::Completed,
        ] {
            assert_eq!(GoalStatus::from_str(status.to_str()), status);
        }
        assert_eq!(GoalStatus::from_str("bogus"), GoalStatus::Pending);
    }

    #[test]
    fn action_status_round_trips() {
        test_util::setup();
        for status in [
            ActionStatus::Pending,
            ActionStatus::InProgress,
            ActionStatus::Completed,
        ] {
            assert_eq!(ActionStatus::from_str(status.to_str()), status);
        }
    }

    #[test]
    fn frequency_parse_is_strict() {
        test_util::setup();
        assert_eq!(Frequency::from_str("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::from_str("biweekly"), Some(Frequency::Biweekly));
        assert_eq!(Frequency::from_str("monthly"), Some(Frequency::Monthly));
        assert_eq!(Frequency::from_str("quarterly"), Some(Frequency::Quarterly));
        assert_eq!(Frequency::from_str("daily"), None);
    }

    #[test]
    fn role_defaults_to_operacional() {
        test_util::setup();
        assert_eq!(Role::from_str("admin"), Role::Admin);
        assert_eq!(Role::from_str("gestor"), Role::Gestor);
        assert_eq!(Role::from_str("anything"), Role::Operacional);
    }
}

mod filter_tests {
    use super::*;
    use crate::shared::models::{GoalStatus, Objective, ObjectiveFilters};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn objective(region_id: i32, sub_region_id: Option<i32>) -> Objective {
        let now = Utc::now();
        Objective {
            id: Uuid::new_v4(),
            title: "Objective".to_string(),
            description: None,
            owner_id: Uuid::new_v4(),
            region_id,
            sub_region_id,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 12, 31),
            status: GoalStatus::Active,
            progress: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn region_filter_matches_by_membership() {
        test_util::setup();
        let filters = ObjectiveFilters {
            region_ids: Some(vec![1, 2]),
            ..Default::default()
        };
        assert!(filters.matches(&objective(1, None)));
        assert!(!filters.matches(&objective(3, None)));
    }

    #[test]
    fn sub_region_filter_passes_undeclared_objectives() {
        test_util::setup();
        let filters = ObjectiveFilters {
            sub_region_ids: Some(vec![9]),
            ..Default::default()
        };
        assert!(filters.matches(&objective(1, Some(9))));
        assert!(!filters.matches(&objective(1, Some(3))));
        assert!(filters.matches(&objective(1, None)));
    }

    #[test]
    fn period_filter_keeps_overlapping_ranges() {
        test_util::setup();
        let filters = ObjectiveFilters {
            period_start: Some(date(2025, 6, 1)),
            period_end: Some(date(2025, 7, 1)),
            ..Default::default()
        };
        assert!(filters.matches(&objective(1, None)));

        let filters = ObjectiveFilters {
            period_start: Some(date(2026, 1, 1)),
            period_end: Some(date(2026, 7, 1)),
            ..Default::default()
        };
        assert!(!filters.matches(&objective(1, None)));
    }

    #[test]
    fn status_and_owner_filters_apply() {
        test_util::setup();
        let target = objective(1, None);
        let filters = ObjectiveFilters {
            owner_id: Some(target.owner_id),
            status: Some(GoalStatus::Active),
            ..Default::default()
        };
        assert!(filters.matches(&target));

        let filters = ObjectiveFilters {
            status: Some(GoalStatus::Completed),
            ..Default::default()
        };
        assert!(!filters.matches(&target));
    }
}
