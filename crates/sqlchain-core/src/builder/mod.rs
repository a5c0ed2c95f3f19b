//! Statement builders.
//!
//! Every builder is an immutable snapshot: each chain call returns a new
//! value and leaves the receiver usable, so a partial chain can be branched
//! into several statements.
//!
//! # Example
//!
//! ```rust
//! use sqlchain_core::builder::{count, Statement};
//! use sqlchain_core::schema::{Column, Schema, Table};
//! use sqlchain_core::Query;
//!
//! let schema = Schema::new()
//!     .table(
//!         "users",
//!         Table::new()
//!             .column("id", Column::int())
//!             .column("name", Column::varchar(64)),
//!     )
//!     .table(
//!         "posts",
//!         Table::new()
//!             .column("id", Column::int())
//!             .column("user_id", Column::int()),
//!     );
//! let q = Query::new(schema);
//!
//! let (sql, params) = q
//!     .from_as("users", "u")
//!     .unwrap()
//!     .left_join_as("posts", "p")
//!     .unwrap()
//!     .on(|p, a| p["user_id"].eq(&a["u"]["id"]))
//!     .group_by(|a, _| a["u"]["id"].clone())
//!     .having(|a, _| count(&a["p"]["id"]).gt(3))
//!     .select(|a| [("name", a["u"]["name"].clone())])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT `u`.`name` AS `name` FROM `users` `u` LEFT JOIN `posts` `p` \
//!      ON `p`.`user_id` = `u`.`id` GROUP BY `u`.`id` HAVING COUNT(`p`.`id`) > ?"
//! );
//! assert_eq!(params.len(), 1);
//! ```

mod alias;
mod expr;
mod insert;
mod select;
mod stringify;
mod update;
pub mod value;

pub use alias::{Aliases, Record, TablePrimary};
pub use expr::{and, avg, between, count, distinct, or, sum, Expression, Fragment, Scalar, Variable};
pub use insert::{Insert, InsertBuilder, Source, Values};
pub use select::{
    AfterJoin, Direction, Grouped, IntoTerms, JoinCondition, JoinKind, Joining, OrderTerm, Select,
    SelectBuilder, SortRecord, Sorts, Stage,
};
pub use stringify::{Statement, Stringifier};
pub use update::{Update, UpdateBuilder};
pub use value::{SqlValue, ToSqlValue};
