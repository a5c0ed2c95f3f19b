//! UPDATE statements.
//!
//! The WHERE callback sees the target table under its own name, so
//! predicates render as `` `table`.`column` ``.

use std::sync::Arc;

use tracing::{debug, trace};

use super::alias::{resolve, Aliases, TablePrimary};
use super::expr::Expression;
use super::insert::{Body, Source};
use super::stringify::{Statement, Stringifier};
use super::value::SqlValue;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// An UPDATE awaiting its assignments.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    schema: Arc<Schema>,
    table: String,
    aliases: Aliases,
    filter: Option<Expression>,
}

impl UpdateBuilder {
    pub(crate) fn new(schema: Arc<Schema>, table: &str) -> Result<Self> {
        let (record, alias) = resolve(
            &schema,
            &Aliases::new(),
            &TablePrimary::Table(String::from(table)),
            None,
        )?;
        let aliases = Aliases::new().with(&alias, Arc::new(record));
        Ok(Self {
            schema,
            table: alias,
            aliases,
            filter: None,
        })
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the scope the WHERE callback receives.
    #[must_use]
    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    /// Sets the WHERE predicate. The callback receives the scope and the
    /// current predicate; its result replaces it.
    #[must_use]
    pub fn where_clause<F, E>(&self, f: F) -> Self
    where
        F: FnOnce(&Aliases, Option<&Expression>) -> E,
        E: Into<Expression>,
    {
        trace!(table = %self.table, "update where");
        let filter = f(&self.aliases, self.filter.as_ref()).into();
        Self {
            filter: Some(filter),
            ..self.clone()
        }
    }

    /// Finishes the UPDATE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] for a field the table does not
    /// declare and [`Error::EmptyValues`] when nothing would be assigned.
    pub fn set(&self, source: impl Into<Source>) -> Result<Update> {
        let table = self
            .schema
            .get(&self.table)
            .ok_or_else(|| Error::UnknownTable(self.table.clone()))?;
        let body = Body::new(&self.table, table, source.into())?;
        Ok(Update {
            table: self.table.clone(),
            body,
            filter: self.filter.clone(),
        })
    }
}

/// A finished UPDATE.
#[derive(Debug, Clone)]
pub struct Update {
    table: String,
    body: Body,
    filter: Option<Expression>,
}

impl Update {
    /// Iterates over the assigned columns, in render order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.body.columns()
    }

    /// Renders the statement. SET parameters precede WHERE parameters.
    ///
    /// # Errors
    ///
    /// Propagates expression and subquery rendering failures.
    pub fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        let mut out = Stringifier::new();
        out.push_sql("UPDATE ");
        out.push_ident(&self.table);
        out.push_sql(" SET ");
        match &self.body {
            Body::Assignments(assignments) => Body::push_assignments(&mut out, assignments)?,
            Body::Select { columns, select } => {
                out.push_sql("(");
                out.push_idents(columns.iter().map(String::as_str), ", ");
                out.push_sql(") = (");
                out.push_statement(select)?;
                out.push_sql(")");
            }
        }
        if let Some(filter) = &self.filter {
            out.push_sql(" WHERE ");
            out.push_expression(filter)?;
        }
        let (sql, params) = out.finish();
        debug!(statement = "update", table = %self.table, params = params.len(), "rendered statement");
        Ok((sql, params))
    }

    /// Renders the statement and returns only the SQL string.
    ///
    /// # Errors
    ///
    /// See [`Update::build`].
    pub fn build_sql(&self) -> Result<String> {
        self.build().map(|(sql, _)| sql)
    }
}

impl Statement for Update {
    fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        Self::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Values;
    use crate::query::Query;
    use crate::schema::{Column, Table};

    fn query() -> Query {
        Query::new(
            Schema::new()
                .table(
                    "users",
                    Table::new()
                        .column("id", Column::int())
                        .column("name", Column::varchar(64))
                        .column("age", Column::int().nullable()),
                )
                .table(
                    "stats",
                    Table::new()
                        .column("user_id", Column::int())
                        .column("posts", Column::int()),
                ),
        )
    }

    #[test]
    fn test_update_without_where() {
        let (sql, params) = query()
            .update("users")
            .unwrap()
            .set(Values::new().set("name", "Ada"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(sql, "UPDATE `users` SET `name` = ?");
        assert_eq!(params, vec![SqlValue::Text(String::from("Ada"))]);
    }

    #[test]
    fn test_set_params_precede_where_params() {
        let (sql, params) = query()
            .update("users")
            .unwrap()
            .where_clause(|a, _| a["users"]["id"].eq(5))
            .set(Values::new().set("age", 40).set("name", None::<String>))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE `users` SET `age` = ?, `name` = NULL WHERE `users`.`id` = ?"
        );
        assert_eq!(params, vec![SqlValue::Int(40), SqlValue::Int(5)]);
    }

    #[test]
    fn test_where_replaces_previous_predicate() {
        let update = query()
            .update("users")
            .unwrap()
            .where_clause(|a, _| a["users"]["id"].eq(1))
            .where_clause(|a, prev| {
                assert!(prev.is_some());
                a["users"]["id"].eq(2)
            });
        let (_, params) = update
            .set(Values::new().set("age", 1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(params, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_update_from_select() {
        let q = query();
        let counts = q
            .from("users")
            .unwrap()
            .where_clause(|a, _| a["users"]["age"].gt(30))
            .select(|a| [("posts", crate::builder::count(&a["users"]["id"]))]);
        let (sql, params) = q
            .update("stats")
            .unwrap()
            .where_clause(|a, _| a["stats"]["user_id"].eq(9))
            .set(counts)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE `stats` SET (`posts`) = (SELECT COUNT(`users`.`id`) AS `posts` FROM `users` `users` WHERE `users`.`age` > ?) WHERE `stats`.`user_id` = ?"
        );
        assert_eq!(params, vec![SqlValue::Int(30), SqlValue::Int(9)]);
    }

    #[test]
    fn test_update_errors() {
        let q = query();
        assert!(matches!(q.update("nope"), Err(Error::UnknownTable(_))));
        let builder = q.update("users").unwrap();
        assert!(matches!(
            builder.set(Values::new().set("email", "x")),
            Err(Error::UnknownColumn { column, .. }) if column == "email"
        ));
        assert!(matches!(
            builder.set(Values::new().not_provided("age")),
            Err(Error::EmptyValues(_))
        ));
    }
}
