use chrono::DateTime;
use proptest::prelude::*;
use serde_json::{Map, Value};

use sediment_core::project_config::{flatten, unflatten, ProjectConfigTree};
use sediment_core::traits::ProjectConfig;
use sediment_core::types::MigrationName;

// 2000-01-01T00:00:00Z ..= 2068-12-31T23:59:59Z: `%y` reads 69..99 as 19xx.
const FIRST_SECOND: i64 = 946_684_800;
const LAST_SECOND: i64 = 3_124_223_999;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn tree() -> impl Strategy<Value = Value> {
    let node = leaf().prop_recursive(4, 32, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
    });
    prop::collection::btree_map("[a-z]{1,5}", node, 0..4)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn flatten_then_unflatten_restores_the_tree(value in tree()) {
        let rebuilt = unflatten(flatten(&value)).unwrap();
        prop_assert_eq!(rebuilt, value);
    }

    #[test]
    fn apply_leaves_nothing_to_diff(value in tree(), path in "[a-z]{1,3}(\\.[a-z]{1,3}){0,2}", new in leaf()) {
        let mut config = ProjectConfigTree::from_stored(value);
        // Setting under an existing scalar fails; that leaves the tree untouched.
        let _ = config.set(&path, new);
        let before = flatten(config.pending());
        let changes = config.apply();
        prop_assert!(!config.is_dirty());
        prop_assert!(config.diff().is_empty());
        prop_assert_eq!(flatten(config.stored()), before);
        prop_assert!(changes.windows(2).all(|w| w[0].path < w[1].path));
    }

    #[test]
    fn generated_names_sort_by_creation_time(
        a in FIRST_SECOND..=LAST_SECOND,
        b in FIRST_SECOND..=LAST_SECOND,
        description in "[a-z][a-z0-9_]{0,20}",
    ) {
        let ta = DateTime::from_timestamp(a, 0).unwrap();
        let tb = DateTime::from_timestamp(b, 0).unwrap();
        let na = MigrationName::generate(&description, ta).unwrap();
        let nb = MigrationName::generate(&description, tb).unwrap();

        prop_assert_eq!(na.cmp(&nb), a.cmp(&b));
        prop_assert_eq!(na.description(), description.as_str());
        prop_assert_eq!(na.created_at(), Some(ta.naive_utc()));
        prop_assert_eq!(MigrationName::parse(na.as_str()).unwrap(), na);
    }
}
