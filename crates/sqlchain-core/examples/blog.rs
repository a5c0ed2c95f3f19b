//! Builds a handful of statements against a small blog schema loaded from
//! JSON and prints the rendered SQL with its parameters.
//!
//! Run with `cargo run --example blog`.

use sqlchain_core::builder::{count, Values};
use sqlchain_core::{Query, Schema, Statement};

const SCHEMA: &str = r#"{
    "tables": {
        "users": {
            "columns": {
                "id": { "type": "int" },
                "name": { "type": { "varchar": 255 } },
                "age": { "type": "int", "nullable": true },
                "created_at": { "type": "timestamp", "default_sql": "CURRENT_TIMESTAMP" }
            },
            "primary_key": ["id"]
        },
        "posts": {
            "columns": {
                "id": { "type": "int" },
                "user_id": { "type": "int" },
                "title": { "type": "text" },
                "published": { "type": "tiny_int", "default": false }
            },
            "primary_key": ["id"]
        }
    },
    "foreign_keys": [
        { "table": "posts", "column": "user_id", "references_table": "users", "references_column": "id" }
    ]
}"#;

fn show(label: &str, statement: &dyn Statement) -> sqlchain_core::Result<()> {
    let (sql, params) = statement.build()?;
    println!("-- {label}");
    println!("{sql}");
    println!("   params: {params:?}\n");
    Ok(())
}

fn main() -> sqlchain_core::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let q = Query::new(Schema::from_json(SCHEMA)?);

    let authors = q
        .from_as("users", "u")?
        .left_join_as("posts", "p")?
        .on(|p, a| p["user_id"].eq(&a["u"]["id"]).and(p["published"].eq(true)))
        .where_clause(|a, _| a["u"]["age"].gt_eq(18))
        .group_by(|a, _| [a["u"]["id"].clone(), a["u"]["name"].clone()])
        .having(|a, _| count(&a["p"]["id"]).gt(0))
        .order_by(|s, _| s["u"]["name"].clone())
        .limit(10)
        .select(|a| {
            [
                ("name", a["u"]["name"].clone()),
                ("posts", count(&a["p"]["id"])),
            ]
        });
    show("active authors", &authors)?;

    let latest = q.from("posts")?;
    let user_id = latest.aliases()["posts"]["user_id"].clone();
    let author_name = q
        .from("users")?
        .where_clause(|a, _| a["users"]["id"].eq(&user_id))
        .scalar(|a| a["users"]["name"].clone());
    let latest = latest
        .order_by(|s, _| s["posts"]["id"].desc())
        .limit(5)
        .select(|a| [("title", a["posts"]["title"].clone()), ("author", author_name)]);
    show("latest posts with author", &latest)?;

    let insert = q.insert("users")?.set(
        Values::new()
            .set("id", 42)
            .set("name", "Ada")
            .set_opt("age", None::<i32>),
    )?;
    show("insert without age", &insert)?;

    let update = q
        .update("posts")?
        .where_clause(|a, _| a["posts"]["user_id"].eq(42))
        .set(Values::new().set("published", true))?;
    show("publish all", &update)?;

    Ok(())
}
