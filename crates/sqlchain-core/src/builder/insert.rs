//! INSERT statements and the field-value input they share with UPDATE.
//!
//! A [`Values`] mapping distinguishes three states per field: a value
//! (which may be an explicit NULL literal), "not provided" (the field is
//! skipped entirely), and absent.
//!
//! ```rust
//! use sqlchain_core::builder::Values;
//! use sqlchain_core::schema::{Column, Schema, Table};
//! use sqlchain_core::Query;
//!
//! let schema = Schema::new().table(
//!     "users",
//!     Table::new()
//!         .column("id", Column::int())
//!         .column("name", Column::varchar(64))
//!         .column("age", Column::int().nullable()),
//! );
//! let (sql, params) = Query::new(schema)
//!     .insert("users")
//!     .unwrap()
//!     .set(Values::new().set("id", 1).set("name", "Ada"))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(sql, "INSERT INTO `users` SET `id` = ?, `name` = ?");
//! assert_eq!(params.len(), 2);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::expr::Expression;
use super::select::Select;
use super::stringify::{Statement, Stringifier};
use super::value::SqlValue;
use crate::error::{Error, Result};
use crate::schema::{Schema, Table};

/// Ordered field → value mapping for INSERT and UPDATE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    entries: IndexMap<String, Option<Expression>>,
}

impl Values {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a field. `None::<T>` binds an explicit NULL literal.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.entries.insert(field.into(), Some(value.into()));
        self
    }

    /// Binds a field when `value` is `Some`, otherwise marks it not provided.
    #[must_use]
    pub fn set_opt<V: Into<Expression>>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self.not_provided(field),
        }
    }

    /// Marks a field as not provided; it is left out of the statement.
    #[must_use]
    pub fn not_provided(mut self, field: impl Into<String>) -> Self {
        self.entries.insert(field.into(), None);
        self
    }

    /// Iterates over every mentioned field, provided or not.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over provided fields and their values in order.
    pub fn provided(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.entries
            .iter()
            .filter_map(|(field, value)| value.as_ref().map(|value| (field.as_str(), value)))
    }

    /// Returns whether the field is bound to a value.
    #[must_use]
    pub fn is_provided(&self, field: &str) -> bool {
        matches!(self.entries.get(field), Some(Some(_)))
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<Expression>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |values, (field, value)| values.set(field, value))
    }
}

/// What an INSERT or UPDATE writes: a direct mapping or a subquery whose
/// present output fields name the target columns.
#[derive(Debug, Clone)]
pub enum Source {
    /// Field → value mapping.
    Values(Values),
    /// A finished SELECT.
    Select(Select),
}

impl From<Values> for Source {
    fn from(values: Values) -> Self {
        Self::Values(values)
    }
}

impl From<Select> for Source {
    fn from(select: Select) -> Self {
        Self::Select(select)
    }
}

impl From<&Select> for Source {
    fn from(select: &Select) -> Self {
        Self::Select(select.clone())
    }
}

/// The validated body of a write: assignments or a column list plus a
/// SELECT.
#[derive(Debug, Clone)]
pub(crate) enum Body {
    Assignments(Vec<(String, Expression)>),
    Select { columns: Vec<String>, select: Select },
}

impl Body {
    /// Validates `source` against `table`: every written field must be a
    /// column, and something must be written.
    pub(crate) fn new(table_name: &str, table: &Table, source: Source) -> Result<Self> {
        let columns: Vec<String> = match &source {
            Source::Values(values) => values.fields().map(String::from).collect(),
            Source::Select(select) => select.columns().map(String::from).collect(),
        };
        if let Some(unknown) = columns.iter().find(|column| table.get(column).is_none()) {
            return Err(Error::UnknownColumn {
                relation: String::from(table_name),
                column: unknown.clone(),
            });
        }
        let body = match source {
            Source::Values(values) => Self::Assignments(
                values
                    .provided()
                    .map(|(field, value)| (String::from(field), value.clone()))
                    .collect(),
            ),
            Source::Select(select) => Self::Select { columns, select },
        };
        if body.columns().next().is_none() {
            return Err(Error::EmptyValues(String::from(table_name)));
        }
        Ok(body)
    }

    /// Iterates over the columns actually written.
    pub(crate) fn columns(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Assignments(assignments) => {
                Box::new(assignments.iter().map(|(column, _)| column.as_str()))
            }
            Self::Select { columns, .. } => Box::new(columns.iter().map(String::as_str)),
        }
    }

    /// Renders `` `a` = ?, `b` = ? ``.
    pub(crate) fn push_assignments(
        out: &mut Stringifier,
        assignments: &[(String, Expression)],
    ) -> Result<()> {
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            out.push_ident(column);
            out.push_sql(" = ");
            out.push_expression(value)?;
        }
        Ok(())
    }
}

/// An INSERT awaiting its values.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    schema: Arc<Schema>,
    table: String,
}

impl InsertBuilder {
    pub(crate) fn new(schema: Arc<Schema>, table: &str) -> Result<Self> {
        if schema.get(table).is_none() {
            return Err(Error::UnknownTable(String::from(table)));
        }
        Ok(Self {
            schema,
            table: String::from(table),
        })
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Finishes the INSERT.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] for a field the table does not
    /// declare, [`Error::MissingValue`] when a column that is neither
    /// nullable nor defaulted is not written, and [`Error::EmptyValues`]
    /// when nothing would be written.
    pub fn set(&self, source: impl Into<Source>) -> Result<Insert> {
        let table = self
            .schema
            .get(&self.table)
            .ok_or_else(|| Error::UnknownTable(self.table.clone()))?;
        let body = Body::new(&self.table, table, source.into())?;
        let written: Vec<&str> = body.columns().collect();
        if let Some((column, _)) = table
            .columns()
            .find(|(name, column)| !column.is_optional() && !written.contains(name))
        {
            return Err(Error::MissingValue {
                table: self.table.clone(),
                column: String::from(column),
            });
        }
        Ok(Insert {
            table: self.table.clone(),
            body,
        })
    }
}

/// A finished INSERT.
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    body: Body,
}

impl Insert {
    /// Iterates over the columns written, in render order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.body.columns()
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Propagates expression and subquery rendering failures.
    pub fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        let mut out = Stringifier::new();
        out.push_sql("INSERT INTO ");
        out.push_ident(&self.table);
        match &self.body {
            Body::Assignments(assignments) => {
                out.push_sql(" SET ");
                Body::push_assignments(&mut out, assignments)?;
            }
            Body::Select { columns, select } => {
                out.push_sql(" (");
                out.push_idents(columns.iter().map(String::as_str), ", ");
                out.push_sql(") ");
                out.push_statement(select)?;
            }
        }
        let (sql, params) = out.finish();
        debug!(statement = "insert", table = %self.table, params = params.len(), "rendered statement");
        Ok((sql, params))
    }

    /// Renders the statement and returns only the SQL string.
    ///
    /// # Errors
    ///
    /// See [`Insert::build`].
    pub fn build_sql(&self) -> Result<String> {
        self.build().map(|(sql, _)| sql)
    }
}

impl Statement for Insert {
    fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        Self::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use crate::schema::Column;

    fn query() -> Query {
        Query::new(
            Schema::new()
                .table(
                    "users",
                    Table::new()
                        .column("id", Column::int())
                        .column("name", Column::varchar(64))
                        .column("age", Column::int().nullable())
                        .column("role", Column::enumeration(["admin", "member"]).default("member")),
                )
                .table(
                    "archive",
                    Table::new()
                        .column("user_id", Column::int())
                        .column("label", Column::text().nullable()),
                ),
        )
    }

    #[test]
    fn test_values_keep_declaration_order() {
        let (sql, params) = query()
            .insert("users")
            .unwrap()
            .set(Values::new().set("name", "Ada").set("id", 7))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `users` SET `name` = ?, `id` = ?");
        assert_eq!(
            params,
            vec![SqlValue::Text(String::from("Ada")), SqlValue::Int(7)]
        );
    }

    #[test]
    fn test_explicit_null_renders_but_not_provided_is_skipped() {
        let insert = query()
            .insert("users")
            .unwrap()
            .set(
                Values::new()
                    .set("id", 1)
                    .set("name", "Ada")
                    .set("age", None::<i32>)
                    .not_provided("role"),
            )
            .unwrap();
        let (sql, params) = insert.build().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `users` SET `id` = ?, `name` = ?, `age` = NULL"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_raw_expression_is_embedded() {
        let sql = query()
            .insert("users")
            .unwrap()
            .set(
                Values::new()
                    .set("id", Expression::raw("LAST_INSERT_ID()"))
                    .set("name", "x"),
            )
            .unwrap()
            .build_sql()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `users` SET `id` = LAST_INSERT_ID(), `name` = ?"
        );
    }

    #[test]
    fn test_missing_mandatory_column() {
        let err = query()
            .insert("users")
            .unwrap()
            .set(Values::new().set("id", 1).set_opt("name", None::<&str>))
            .unwrap_err();
        assert!(matches!(err, Error::MissingValue { column, .. } if column == "name"));
    }

    #[test]
    fn test_unknown_field_and_table() {
        let err = query()
            .insert("users")
            .unwrap()
            .set(Values::new().set("id", 1).set("name", "x").set("email", "y"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { column, .. } if column == "email"));
        assert!(matches!(
            query().insert("nope"),
            Err(Error::UnknownTable(t)) if t == "nope"
        ));
    }

    #[test]
    fn test_empty_values() {
        let err = query()
            .insert("archive")
            .unwrap()
            .set(Values::new().not_provided("label"))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyValues(t) if t == "archive"));

        let q = Query::new(
            Schema::new().table("notes", Table::new().column("body", Column::text().nullable())),
        );
        let err = q.insert("notes").unwrap().set(Values::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyValues(t) if t == "notes"));
    }

    #[test]
    fn test_insert_from_select() {
        let q = query();
        let select = q
            .from("users")
            .unwrap()
            .where_clause(|a, _| a["users"]["age"].gt(65))
            .select(|a| {
                [
                    ("user_id", Some(a["users"]["id"].clone())),
                    ("label", None),
                ]
            });
        let insert = q.insert("archive").unwrap().set(&select).unwrap();
        assert_eq!(insert.columns().collect::<Vec<_>>(), vec!["user_id"]);
        let (sql, params) = insert.build().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `archive` (`user_id`) SELECT `users`.`id` AS `user_id` FROM `users` `users` WHERE `users`.`age` > ?"
        );
        assert_eq!(params, vec![SqlValue::Int(65)]);
    }

    #[test]
    fn test_values_from_iterator() {
        let values: Values = [("id", 1), ("age", 30)].into_iter().collect();
        assert_eq!(values.fields().collect::<Vec<_>>(), vec!["id", "age"]);
        assert!(values.is_provided("age"));
        assert!(!values.is_provided("name"));
    }
}
