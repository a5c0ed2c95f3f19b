//! The expression model.
//!
//! An [`Expression`] is one of three things:
//!
//! - a [`SqlValue`] literal, always rendered as a bound parameter (or `NULL`),
//! - a [`Variable`], a pre-built SQL template whose slots hold nested
//!   expressions,
//! - a [`Scalar`], a complete sub-statement rendered in parentheses.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::select::OrderTerm;
use super::stringify::Statement;
use super::value::{SqlValue, ToSqlValue};

/// One piece of a [`Variable`] template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// SQL text emitted verbatim.
    Sql(String),
    /// An identifier, emitted backtick-quoted.
    Ident(String),
    /// A slot filled by the argument at this index.
    Arg(usize),
}

/// A pre-built SQL fragment embedding nested expressions.
///
/// Variables never contribute parameters themselves; literals in their
/// arguments do, in the order their slots appear in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    fragments: Vec<Fragment>,
    args: Vec<Expression>,
}

impl Variable {
    /// Builds a variable from explicit fragments and arguments.
    #[must_use]
    pub fn from_parts(fragments: Vec<Fragment>, args: Vec<Expression>) -> Self {
        Self { fragments, args }
    }

    /// A qualified column reference: `` `alias`.`column` ``.
    #[must_use]
    pub fn column(alias: &str, column: &str) -> Self {
        Self {
            fragments: vec![
                Fragment::Ident(String::from(alias)),
                Fragment::Sql(String::from(".")),
                Fragment::Ident(String::from(column)),
            ],
            args: vec![],
        }
    }

    /// Raw SQL with no arguments.
    ///
    /// **Warning**: Only use this for SQL fragments that don't contain user input.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment::Sql(sql.into())],
            args: vec![],
        }
    }

    /// Parses a template where each `{}` is a slot for the next argument.
    ///
    /// ```rust
    /// use sqlchain_core::builder::{Expression, Variable};
    ///
    /// let coalesce = Variable::template("COALESCE({}, {})", vec![
    ///     Expression::raw("`u`.`nickname`"),
    ///     Expression::from("anonymous"),
    /// ]);
    /// let (sql, params) = Expression::from(coalesce).build().unwrap();
    /// assert_eq!(sql, "COALESCE(`u`.`nickname`, ?)");
    /// assert_eq!(params.len(), 1);
    /// ```
    ///
    /// A slot without a matching argument is reported when the expression is
    /// rendered.
    #[must_use]
    pub fn template(template: &str, args: Vec<Expression>) -> Self {
        let mut fragments = vec![];
        for (i, piece) in template.split("{}").enumerate() {
            if i > 0 {
                fragments.push(Fragment::Arg(i - 1));
            }
            if !piece.is_empty() {
                fragments.push(Fragment::Sql(String::from(piece)));
            }
        }
        Self { fragments, args }
    }

    /// Returns the template fragments.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Returns the slot arguments.
    #[must_use]
    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    fn infix(left: Expression, op: &str, right: Expression) -> Self {
        Self {
            fragments: vec![
                Fragment::Arg(0),
                Fragment::Sql(format!(" {op} ")),
                Fragment::Arg(1),
            ],
            args: vec![left, right],
        }
    }

    fn postfix(operand: Expression, op: &str) -> Self {
        Self {
            fragments: vec![Fragment::Arg(0), Fragment::Sql(format!(" {op}"))],
            args: vec![operand],
        }
    }
}

/// A complete sub-statement usable where a single value is expected.
#[derive(Clone)]
pub struct Scalar(Arc<dyn Statement>);

impl Scalar {
    /// Wraps a statement.
    pub fn new(statement: impl Statement + 'static) -> Self {
        Self(Arc::new(statement))
    }

    /// Returns the wrapped statement.
    #[must_use]
    pub fn statement(&self) -> &dyn Statement {
        self.0.as_ref()
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scalar").field(&self.0).finish()
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A bound literal.
    Literal(SqlValue),
    /// A SQL template.
    Variable(Variable),
    /// A parenthesized sub-statement.
    Scalar(Scalar),
}

impl Expression {
    /// The `NULL` literal.
    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(SqlValue::Null)
    }

    /// Creates a bound literal.
    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        Self::Literal(value.to_sql_value())
    }

    /// Raw SQL with no arguments.
    ///
    /// **Warning**: Only use this for SQL fragments that don't contain user input.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Variable(Variable::raw(sql))
    }

    /// Renders this expression on its own.
    ///
    /// # Errors
    ///
    /// Fails if a nested template slot has no argument or a nested scalar
    /// fails to render.
    pub fn build(&self) -> crate::Result<(String, Vec<SqlValue>)> {
        let mut out = super::stringify::Stringifier::new();
        out.push_expression(self)?;
        Ok(out.finish())
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), "=", other.into()).into()
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn not_eq(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), "!=", other.into()).into()
    }

    /// Creates a less-than expression.
    #[must_use]
    pub fn lt(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), "<", other.into()).into()
    }

    /// Creates a less-than-or-equal expression.
    #[must_use]
    pub fn lt_eq(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), "<=", other.into()).into()
    }

    /// Creates a greater-than expression.
    #[must_use]
    pub fn gt(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), ">", other.into()).into()
    }

    /// Creates a greater-than-or-equal expression.
    #[must_use]
    pub fn gt_eq(&self, other: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), ">=", other.into()).into()
    }

    /// Creates a LIKE expression.
    #[must_use]
    pub fn like(&self, pattern: impl Into<Self>) -> Self {
        Variable::infix(self.clone(), "LIKE", pattern.into()).into()
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(&self) -> Self {
        Variable::postfix(self.clone(), "IS NULL").into()
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(&self) -> Self {
        Variable::postfix(self.clone(), "IS NOT NULL").into()
    }

    /// Creates `(self) AND (other)`.
    #[must_use]
    pub fn and(&self, other: impl Into<Self>) -> Self {
        and(self.clone(), other)
    }

    /// Creates `(self) OR (other)`.
    #[must_use]
    pub fn or(&self, other: impl Into<Self>) -> Self {
        or(self.clone(), other)
    }

    /// Negates the expression with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self) -> Self {
        Variable::template("NOT ({})", vec![self.clone()]).into()
    }

    /// Wraps the expression in parentheses.
    #[must_use]
    pub fn paren(&self) -> Self {
        Variable::template("({})", vec![self.clone()]).into()
    }

    /// Creates an IN expression, one placeholder per value.
    #[must_use]
    pub fn in_list<T: Into<Self>>(&self, values: Vec<T>) -> Self {
        let mut fragments = vec![Fragment::Arg(0), Fragment::Sql(String::from(" IN ("))];
        let mut args = vec![self.clone()];
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                fragments.push(Fragment::Sql(String::from(", ")));
            }
            fragments.push(Fragment::Arg(args.len()));
            args.push(value.into());
        }
        fragments.push(Fragment::Sql(String::from(")")));
        Variable::from_parts(fragments, args).into()
    }

    /// Creates `(self) BETWEEN (low) AND (high)`.
    #[must_use]
    pub fn between(&self, low: impl Into<Self>, high: impl Into<Self>) -> Self {
        between(self.clone(), low, high)
    }

    /// Ascending ORDER BY term for this expression.
    #[must_use]
    pub fn asc(&self) -> OrderTerm {
        OrderTerm::new(self.clone())
    }

    /// Descending ORDER BY term for this expression.
    #[must_use]
    pub fn desc(&self) -> OrderTerm {
        OrderTerm::new(self.clone()).desc()
    }
}

/// `COUNT(x)`.
#[must_use]
pub fn count(x: impl Into<Expression>) -> Expression {
    Variable::template("COUNT({})", vec![x.into()]).into()
}

/// `SUM(x)`.
#[must_use]
pub fn sum(x: impl Into<Expression>) -> Expression {
    Variable::template("SUM({})", vec![x.into()]).into()
}

/// `AVG(x)`.
#[must_use]
pub fn avg(x: impl Into<Expression>) -> Expression {
    Variable::template("AVG({})", vec![x.into()]).into()
}

/// `DISTINCT(x)`.
#[must_use]
pub fn distinct(x: impl Into<Expression>) -> Expression {
    Variable::template("DISTINCT({})", vec![x.into()]).into()
}

/// `(x) BETWEEN (low) AND (high)`.
#[must_use]
pub fn between(
    x: impl Into<Expression>,
    low: impl Into<Expression>,
    high: impl Into<Expression>,
) -> Expression {
    Variable::template(
        "({}) BETWEEN ({}) AND ({})",
        vec![x.into(), low.into(), high.into()],
    )
    .into()
}

/// `(left) AND (right)`.
#[must_use]
pub fn and(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    Variable::template("({}) AND ({})", vec![left.into(), right.into()]).into()
}

/// `(left) OR (right)`.
#[must_use]
pub fn or(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    Variable::template("({}) OR ({})", vec![left.into(), right.into()]).into()
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl From<Scalar> for Expression {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<&Expression> for Expression {
    fn from(expression: &Expression) -> Self {
        expression.clone()
    }
}

macro_rules! impl_expression_from_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Self::Literal(value.to_sql_value())
                }
            }
        )+
    };
}

impl_expression_from_value!(
    SqlValue,
    bool,
    i64,
    i32,
    i16,
    i8,
    u32,
    u16,
    u8,
    f64,
    f32,
    String,
    &str,
    NaiveDateTime,
    DateTime<Utc>
);

impl<T: ToSqlValue> From<Option<T>> for Expression {
    fn from(value: Option<T>) -> Self {
        Self::Literal(value.to_sql_value())
    }
}
