//! Expression-to-text conversion with ordered parameter accumulation.
//!
//! A [`Stringifier`] is owned by exactly one top-level render. Text and
//! parameters are appended in a single left-to-right pass, so the n-th `?`
//! in the output always corresponds to the n-th parameter, however deeply
//! templates and sub-statements nest.

use std::fmt;

use super::alias::TablePrimary;
use super::expr::{Expression, Fragment};
use super::value::SqlValue;
use crate::error::{Error, Result};

/// A complete statement that renders to SQL text and its parameters.
///
/// Rendering is deterministic: calling [`Statement::build`] twice yields
/// byte-identical text and equal parameter lists.
pub trait Statement: fmt::Debug + Send + Sync {
    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Fails if any expression inside the statement cannot be rendered.
    fn build(&self) -> Result<(String, Vec<SqlValue>)>;

    /// Renders the statement and returns only the SQL string.
    ///
    /// # Errors
    ///
    /// See [`Statement::build`].
    fn build_sql(&self) -> Result<String> {
        self.build().map(|(sql, _)| sql)
    }
}

/// Accumulates SQL text and bound parameters for one render.
#[derive(Debug, Default)]
pub struct Stringifier {
    sql: String,
    params: Vec<SqlValue>,
}

impl Stringifier {
    /// Creates an empty stringifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends SQL text verbatim.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends a backtick-quoted identifier. Backticks inside `name` are not
    /// escaped.
    pub fn push_ident(&mut self, name: &str) {
        self.sql.push('`');
        self.sql.push_str(name);
        self.sql.push('`');
    }

    /// Appends identifiers quoted and separated by `separator`.
    pub fn push_idents<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, separator: &str) {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.push_sql(separator);
            }
            self.push_ident(name);
        }
    }

    /// Appends an expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedExpression`] for a template slot without
    /// an argument, and propagates failures of nested scalars.
    pub fn push_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Literal(SqlValue::Null) => self.push_sql("NULL"),
            Expression::Literal(value) => {
                self.params.push(value.clone());
                self.push_sql(SqlValue::placeholder());
            }
            Expression::Variable(variable) => {
                for fragment in variable.fragments() {
                    match fragment {
                        Fragment::Sql(sql) => self.push_sql(sql),
                        Fragment::Ident(name) => self.push_ident(name),
                        Fragment::Arg(index) => {
                            let arg = variable.args().get(*index).ok_or_else(|| {
                                Error::UnrecognizedExpression(format!(
                                    "template slot {index} has no argument ({} given)",
                                    variable.args().len()
                                ))
                            })?;
                            self.push_expression(arg)?;
                        }
                    }
                }
            }
            Expression::Scalar(scalar) => {
                let (sql, params) = scalar.statement().build()?;
                self.push_sql("(");
                self.push_sql(&sql);
                self.push_sql(")");
                self.params.extend(params);
            }
        }
        Ok(())
    }

    /// Appends expressions separated by `separator`.
    ///
    /// # Errors
    ///
    /// See [`Stringifier::push_expression`].
    pub fn push_expressions<'a>(
        &mut self,
        expressions: impl IntoIterator<Item = &'a Expression>,
        separator: &str,
    ) -> Result<()> {
        for (i, expression) in expressions.into_iter().enumerate() {
            if i > 0 {
                self.push_sql(separator);
            }
            self.push_expression(expression)?;
        }
        Ok(())
    }

    /// Appends a FROM/JOIN source: a quoted table name, or a parenthesized
    /// subquery whose parameters are spliced in place.
    ///
    /// # Errors
    ///
    /// Propagates failures of the subquery render.
    pub fn push_table_primary(&mut self, primary: &TablePrimary) -> Result<()> {
        match primary {
            TablePrimary::Table(name) => self.push_ident(name),
            TablePrimary::Subquery(select) => {
                let (sql, params) = select.build()?;
                self.push_sql("(");
                self.push_sql(&sql);
                self.push_sql(")");
                self.params.extend(params);
            }
        }
        Ok(())
    }

    /// Appends a whole statement without parentheses.
    ///
    /// # Errors
    ///
    /// Propagates failures of the statement render.
    pub fn push_statement(&mut self, statement: &dyn Statement) -> Result<()> {
        let (sql, params) = statement.build()?;
        self.push_sql(&sql);
        self.params.extend(params);
        Ok(())
    }

    /// Returns the number of parameters bound so far.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Consumes the stringifier and returns the SQL and parameters.
    #[must_use]
    pub fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::expr::{Scalar, Variable};

    #[derive(Debug)]
    struct Fixed(&'static str, Vec<SqlValue>);

    impl Statement for Fixed {
        fn build(&self) -> Result<(String, Vec<SqlValue>)> {
            Ok((String::from(self.0), self.1.clone()))
        }
    }

    #[test]
    fn test_literal_becomes_placeholder() {
        let mut out = Stringifier::new();
        out.push_expression(&Expression::from("alice")).unwrap();
        let (sql, params) = out.finish();
        assert_eq!(sql, "?");
        assert_eq!(params, vec![SqlValue::Text(String::from("alice"))]);
    }

    #[test]
    fn test_null_renders_keyword() {
        let mut out = Stringifier::new();
        out.push_expression(&Expression::null()).unwrap();
        assert_eq!(out.finish(), (String::from("NULL"), vec![]));
    }

    #[test]
    fn test_scalar_is_parenthesized_and_spliced() {
        let scalar = Scalar::new(Fixed(
            "SELECT ? + ?",
            vec![SqlValue::Int(2), SqlValue::Int(3)],
        ));
        let expr: Expression =
            Variable::template("{} = {}", vec![Expression::from(1), scalar.into()]).into();
        let mut out = Stringifier::new();
        out.push_expression(&expr).unwrap();
        assert_eq!(out.param_count(), 3);
        out.push_sql(" AND ");
        out.push_expression(&Expression::from(4)).unwrap();
        assert_eq!(out.param_count(), 4);
        let (sql, params) = out.finish();
        assert_eq!(sql, "? = (SELECT ? + ?) AND ?");
        assert_eq!(
            params,
            vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
                SqlValue::Int(4)
            ]
        );
    }

    #[test]
    fn test_idents_are_quoted_verbatim() {
        let mut out = Stringifier::new();
        out.push_idents(["id", "user name"], ",");
        assert_eq!(out.finish().0, "`id`,`user name`");
    }

    #[test]
    fn test_missing_slot_argument() {
        let expr: Expression = Variable::from_parts(vec![Fragment::Arg(3)], vec![]).into();
        let mut out = Stringifier::new();
        let err = out.push_expression(&expr).unwrap_err();
        assert!(err.to_string().contains("slot 3"));
    }
}
