#![allow(dead_code)]

use sqlchain_core::builder::Expression;
use sqlchain_core::schema::{Column, ForeignKey, Schema, Table};
use sqlchain_core::Query;

/// `users` and `posts`, with one nullable and one defaulted column each.
pub fn blog_schema() -> Schema {
    Schema::new()
        .table(
            "users",
            Table::new()
                .column("id", Column::int())
                .column("name", Column::varchar(255))
                .column("age", Column::int().nullable())
                .column(
                    "created_at",
                    Column::timestamp().default(Expression::raw("CURRENT_TIMESTAMP")),
                )
                .primary_key(["id"]),
        )
        .table(
            "posts",
            Table::new()
                .column("id", Column::int())
                .column("user_id", Column::int())
                .column("title", Column::text())
                .column("published", Column::tiny_int().default(false))
                .primary_key(["id"]),
        )
        .foreign_key(ForeignKey {
            table: String::from("posts"),
            column: String::from("user_id"),
            references_table: String::from("users"),
            references_column: String::from("id"),
        })
}

pub fn blog() -> Query {
    init_tracing();
    Query::new(blog_schema())
}

/// Routes `tracing` output through the test harness. Safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Byte offset of `needle` in `sql`, failing loudly when absent.
pub fn position(sql: &str, needle: &str) -> usize {
    sql.find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in: {sql}"))
}
