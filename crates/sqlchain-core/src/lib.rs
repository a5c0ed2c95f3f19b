//! # sqlchain-core
//!
//! Immutable, alias-aware builders for parameterized SQL statements.
//!
//! This crate provides:
//! - A schema declaration API (in code or from JSON)
//! - SELECT chains with joins, subqueries, grouping, ordering and paging
//! - INSERT and UPDATE statements validated against the schema
//! - Rendering to `(sql, params)` with `?` placeholders and backtick-quoted
//!   identifiers
//!
//! It does not parse or execute SQL; handing the rendered pair to a driver
//! is up to the caller.
//!
//! ## Building a statement
//!
//! ```rust
//! use sqlchain_core::schema::{Column, Schema, Table};
//! use sqlchain_core::Query;
//!
//! let schema = Schema::new().table(
//!     "users",
//!     Table::new()
//!         .column("id", Column::int())
//!         .column("name", Column::varchar(64))
//!         .column("active", Column::tiny_int()),
//! );
//! let q = Query::new(schema);
//!
//! let (sql, params) = q
//!     .from("users")
//!     .unwrap()
//!     .where_clause(|a, _| a["users"]["active"].eq(true))
//!     .order_by(|s, _| s["users"]["name"].clone())
//!     .limit(10)
//!     .select(|a| [("id", a["users"]["id"].clone())])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT `users`.`id` AS `id` FROM `users` `users` \
//!      WHERE `users`.`active` = ? ORDER BY `users`.`name` ASC LIMIT 10"
//! );
//! assert_eq!(params.len(), 1);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values are always bound, never spliced into the text:
//!
//! ```rust
//! use sqlchain_core::builder::SqlValue;
//! use sqlchain_core::schema::{Column, Schema, Table};
//! use sqlchain_core::Query;
//!
//! let q = Query::new(
//!     Schema::new().table("users", Table::new().column("name", Column::text())),
//! );
//! let user_input = "'; DROP TABLE users; --";
//! let (sql, params) = q
//!     .from("users")
//!     .unwrap()
//!     .where_clause(|a, _| a["users"]["name"].eq(user_input))
//!     .select(|a| [("name", a["users"]["name"].clone())])
//!     .build()
//!     .unwrap();
//!
//! assert!(!sql.contains("DROP"));
//! assert_eq!(params, vec![SqlValue::Text(String::from(user_input))]);
//! ```

pub mod builder;
pub mod error;
pub mod query;
pub mod schema;

pub use builder::{Expression, Insert, Select, SqlValue, Statement, Update};
pub use error::{Error, Result};
pub use query::Query;
pub use schema::{Column, Schema, Table};
