//! Property-based tests for parameter ordering and render determinism.

mod common;
use common::*;

use proptest::prelude::*;
use rstest::*;
use sqlchain_core::builder::{count, Expression, SqlValue, Values};

fn digit_free(sql: &str) -> bool {
    !sql.chars().any(|c| c.is_ascii_digit())
}

// ============================================================================
// Property-Based Tests: parameter order
// ============================================================================

proptest! {
    /// Test: WHERE literals bind in placeholder order
    ///
    /// Category: Property
    /// Verifies that each literal sits at the ordinal of its placeholder and
    /// never appears in the text.
    #[rstest]
    fn prop_where_literals_follow_placeholders(ages in prop::collection::vec(0i64..10_000, 1..8)) {
        let q = blog();
        let select = q
            .from("users")
            .unwrap()
            .where_clause(|a, _| {
                ages.iter()
                    .map(|age| a["users"]["age"].eq(*age))
                    .reduce(|left, right| left.and(right))
                    .unwrap_or_else(|| Expression::raw("1 = 1"))
            })
            .select(|a| [("id", a["users"]["id"].clone())]);
        let (sql, params) = select.build().unwrap();

        prop_assert_eq!(sql.matches('?').count(), ages.len());
        let expected: Vec<SqlValue> = ages.iter().copied().map(SqlValue::Int).collect();
        prop_assert_eq!(params, expected);
        prop_assert!(digit_free(&sql));
    }

    /// Test: mapped values bind in mapping order
    ///
    /// Category: Property
    /// Verifies that INSERT parameters follow the order fields were set in.
    #[rstest]
    fn prop_insert_values_follow_mapping_order(
        id in any::<i32>(),
        name in "[a-z]{1,16}",
        age in prop::option::of(0i32..130),
        name_first in any::<bool>(),
    ) {
        let values = if name_first {
            Values::new().set("name", name.as_str()).set("id", id)
        } else {
            Values::new().set("id", id).set("name", name.as_str())
        };
        let values = values.set_opt("age", age);
        let (sql, params) = blog().insert("users").unwrap().set(values).unwrap().build().unwrap();

        let mut expected = if name_first {
            vec![SqlValue::Text(name.clone()), SqlValue::Int(i64::from(id))]
        } else {
            vec![SqlValue::Int(i64::from(id)), SqlValue::Text(name.clone())]
        };
        if let Some(age) = age {
            expected.push(SqlValue::Int(i64::from(age)));
        }
        prop_assert_eq!(sql.matches('?').count(), expected.len());
        prop_assert_eq!(params, expected);
        prop_assert_eq!(sql.contains("`age`"), age.is_some());
        prop_assert!(digit_free(&sql));
    }

    /// Test: nested scalar parameters splice in place
    ///
    /// Category: Property
    /// Verifies that parameters of a scalar sub-statement land between the
    /// outer parameters rendered before and after it.
    #[rstest]
    fn prop_scalar_params_splice_in_text_order(
        before in any::<i64>(),
        inner in prop::collection::vec(any::<i64>(), 1..4),
        after in any::<i64>(),
    ) {
        let q = blog();
        let scalar = q
            .from("posts")
            .unwrap()
            .where_clause(|a, _| {
                inner.iter()
                    .map(|v| a["posts"]["id"].not_eq(*v))
                    .reduce(|left, right| left.and(right))
                    .unwrap_or_else(|| Expression::raw("1 = 1"))
            })
            .scalar(|a| count(&a["posts"]["id"]));
        let (_, params) = q
            .from("users")
            .unwrap()
            .where_clause(|a, _| {
                a["users"]["id"].gt(before)
                    .and(a["users"]["age"].lt(scalar))
                    .and(a["users"]["id"].lt(after))
            })
            .select(|a| [("id", a["users"]["id"].clone())])
            .build()
            .unwrap();

        let mut expected = vec![SqlValue::Int(before)];
        expected.extend(inner.iter().copied().map(SqlValue::Int));
        expected.push(SqlValue::Int(after));
        prop_assert_eq!(params, expected);
    }
}

// ============================================================================
// Property-Based Tests: determinism
// ============================================================================

proptest! {
    /// Test: render is idempotent
    ///
    /// Category: Property
    /// Verifies that rendering the same SELECT twice yields identical output.
    #[rstest]
    fn prop_render_is_idempotent(
        limit in 0u64..1_000,
        offset in prop::option::of(0u64..1_000),
        title in ".{0,24}",
        descending in any::<bool>(),
    ) {
        let q = blog();
        let base = q
            .from_as("posts", "p")
            .unwrap()
            .join_as("users", "u")
            .unwrap()
            .on(|u, a| u["id"].eq(&a["p"]["user_id"]))
            .where_clause(|a, _| a["p"]["title"].like(title.as_str()))
            .order_by(|s, _| if descending { s["u"]["name"].desc() } else { s["u"]["name"].clone() })
            .limit(limit);
        let base = match offset {
            Some(offset) => base.offset(offset),
            None => base,
        };
        let select = base.select(|a| [("title", a["p"]["title"].clone())]);

        let first = select.build().unwrap();
        let second = select.build().unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.1, vec![SqlValue::Text(title.clone())]);
    }
}
