//! The SELECT pipeline.
//!
//! A chain moves through named stages, each a distinct type exposing only
//! the operations legal at that point:
//!
//! | stage        | type              | may call                                   |
//! |--------------|-------------------|--------------------------------------------|
//! | `Fresh`      | [`SelectBuilder`] | joins, every clause, `select`, `scalar`    |
//! | `Joining`    | [`Joining`]       | `on` or `using` only                       |
//! | `AfterJoin`  | [`AfterJoin`]     | clauses, `select`, `scalar`                |
//! | `Grouped`    | [`Grouped`]       | as `AfterJoin`, plus one `having`          |
//!
//! Every transition takes `&self` and returns a new value; the state it
//! started from stays valid, so any stage can serve as a branch point.
//!
//! ```rust
//! use sqlchain_core::builder::Statement;
//! use sqlchain_core::schema::{Column, Schema, Table};
//! use sqlchain_core::Query;
//!
//! let schema = Schema::new().table(
//!     "users",
//!     Table::new()
//!         .column("id", Column::int())
//!         .column("age", Column::int().nullable()),
//! );
//! let q = Query::new(schema);
//! let (sql, params) = q
//!     .from("users")
//!     .unwrap()
//!     .where_clause(|a, _| a["users"]["age"].gt(18))
//!     .select(|a| [("id", a["users"]["id"].clone())])
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT `users`.`id` AS `id` FROM `users` `users` WHERE `users`.`age` > ?"
//! );
//! assert_eq!(params.len(), 1);
//! ```

use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::alias::{resolve, Aliases, Record, TablePrimary};
use super::expr::{Expression, Scalar};
use super::stringify::{Statement, Stringifier};
use super::value::SqlValue;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// The named stages of a SELECT chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// After `from` or a completed join; joins are still allowed.
    Fresh,
    /// Mid-join, waiting for `on` or `using`.
    Joining,
    /// Joins are locked; clauses may be set in any order.
    AfterJoin,
    /// After `group_by`; `having` is available.
    Grouped,
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left,
    /// `RIGHT JOIN`.
    Right,
}

impl JoinKind {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// How a join matches rows: exactly one of a predicate or a column list.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// `ON <predicate>`.
    On(Expression),
    /// `USING(col, ...)`.
    Using(Vec<String>),
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    target: TablePrimary,
    alias: String,
    condition: JoinCondition,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY term. Ascending unless flipped with [`OrderTerm::desc`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    expr: Expression,
    direction: Direction,
}

impl OrderTerm {
    /// An ascending term.
    #[must_use]
    pub fn new(expr: impl Into<Expression>) -> Self {
        Self {
            expr: expr.into(),
            direction: Direction::Asc,
        }
    }

    /// The same term, ascending.
    #[must_use]
    pub fn asc(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            direction: Direction::Asc,
        }
    }

    /// The same term, descending.
    #[must_use]
    pub fn desc(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            direction: Direction::Desc,
        }
    }

    /// Returns the sorted expression.
    #[must_use]
    pub const fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Returns the direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

/// A single term or a list of terms, as returned by `group_by`/`order_by`
/// callbacks.
pub trait IntoTerms<T> {
    /// Converts into an ordered list of terms.
    fn into_terms(self) -> Vec<T>;
}

impl IntoTerms<Expression> for Expression {
    fn into_terms(self) -> Vec<Expression> {
        vec![self]
    }
}

impl IntoTerms<OrderTerm> for OrderTerm {
    fn into_terms(self) -> Vec<OrderTerm> {
        vec![self]
    }
}

impl<T> IntoTerms<T> for Vec<T> {
    fn into_terms(self) -> Vec<T> {
        self
    }
}

impl<T, const N: usize> IntoTerms<T> for [T; N] {
    fn into_terms(self) -> Vec<T> {
        self.into()
    }
}

/// The `order_by` scope: for every alias and field, an ascending
/// [`OrderTerm`].
#[derive(Debug, Clone)]
pub struct Sorts {
    scope: IndexMap<String, SortRecord>,
}

/// The sort terms of one alias.
#[derive(Debug, Clone)]
pub struct SortRecord {
    terms: IndexMap<String, OrderTerm>,
}

impl Sorts {
    fn new(aliases: &Aliases) -> Self {
        let scope = aliases
            .iter()
            .map(|(alias, record)| {
                let terms = record
                    .iter()
                    .map(|(field, expr)| (String::from(field), OrderTerm::new(expr.clone())))
                    .collect();
                (String::from(alias), SortRecord { terms })
            })
            .collect();
        Self { scope }
    }

    /// Looks up an alias.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&SortRecord> {
        self.scope.get(alias)
    }
}

impl SortRecord {
    /// Looks up a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&OrderTerm> {
        self.terms.get(field)
    }
}

impl Index<&str> for Sorts {
    type Output = SortRecord;

    /// # Panics
    ///
    /// Panics if the alias is not in scope; use [`Sorts::get`] to probe.
    fn index(&self, alias: &str) -> &SortRecord {
        match self.scope.get(alias) {
            Some(record) => record,
            None => panic!("alias `{alias}` is not in scope"),
        }
    }
}

impl Index<&str> for SortRecord {
    type Output = OrderTerm;

    /// # Panics
    ///
    /// Panics if the field does not exist; use [`SortRecord::get`] to probe.
    fn index(&self, field: &str) -> &OrderTerm {
        match self.terms.get(field) {
            Some(term) => term,
            None => panic!("record has no field `{field}`"),
        }
    }
}

/// Accumulated clauses of a SELECT chain. Never mutated once shared.
#[derive(Debug, Clone)]
struct SelectState {
    schema: Arc<Schema>,
    from: TablePrimary,
    alias: String,
    aliases: Aliases,
    joins: Vec<Join>,
    filter: Option<Expression>,
    group_by: Vec<Expression>,
    having: Option<Expression>,
    order_by: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectState {
    fn where_clause<F, E>(&self, f: F) -> Self
    where
        F: FnOnce(&Aliases, Option<&Expression>) -> E,
        E: Into<Expression>,
    {
        let filter = f(&self.aliases, self.filter.as_ref()).into();
        Self {
            filter: Some(filter),
            ..self.clone()
        }
    }

    fn group_by<F, T>(&self, f: F) -> Self
    where
        F: FnOnce(&Aliases, &[Expression]) -> T,
        T: IntoTerms<Expression>,
    {
        let group_by = f(&self.aliases, &self.group_by).into_terms();
        Self {
            group_by,
            ..self.clone()
        }
    }

    fn having<F, E>(&self, f: F) -> Self
    where
        F: FnOnce(&Aliases, Option<&Expression>) -> E,
        E: Into<Expression>,
    {
        let having = f(&self.aliases, self.having.as_ref()).into();
        Self {
            having: Some(having),
            ..self.clone()
        }
    }

    fn order_by<F, T>(&self, f: F) -> Self
    where
        F: FnOnce(&Sorts, &[OrderTerm]) -> T,
        T: IntoTerms<OrderTerm>,
    {
        let sorts = Sorts::new(&self.aliases);
        let mut order_by = self.order_by.clone();
        order_by.extend(f(&sorts, &self.order_by).into_terms());
        Self {
            order_by,
            ..self.clone()
        }
    }

    fn render(
        &self,
        out: &mut Stringifier,
        list: impl FnOnce(&mut Stringifier) -> Result<()>,
    ) -> Result<()> {
        out.push_sql("SELECT ");
        list(out)?;
        out.push_sql(" FROM ");
        out.push_table_primary(&self.from)?;
        out.push_sql(" ");
        out.push_ident(&self.alias);

        for join in &self.joins {
            out.push_sql(" ");
            out.push_sql(join.kind.as_sql());
            out.push_sql(" ");
            out.push_table_primary(&join.target)?;
            out.push_sql(" ");
            out.push_ident(&join.alias);
            match &join.condition {
                JoinCondition::On(predicate) => {
                    out.push_sql(" ON ");
                    out.push_expression(predicate)?;
                }
                JoinCondition::Using(columns) => {
                    out.push_sql(" USING(");
                    out.push_idents(columns.iter().map(String::as_str), ",");
                    out.push_sql(")");
                }
            }
        }

        if let Some(filter) = &self.filter {
            out.push_sql(" WHERE ");
            out.push_expression(filter)?;
        }

        if !self.group_by.is_empty() {
            out.push_sql(" GROUP BY ");
            out.push_expressions(&self.group_by, ", ")?;
        }

        if let Some(having) = &self.having {
            out.push_sql(" HAVING ");
            out.push_expression(having)?;
        }

        if !self.order_by.is_empty() {
            out.push_sql(" ORDER BY ");
            for (i, term) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                out.push_expression(&term.expr)?;
                out.push_sql(" ");
                out.push_sql(term.direction.as_sql());
            }
        }

        // LIMIT/OFFSET are inlined integers, not parameters.
        if let Some(limit) = self.limit {
            out.push_sql(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            out.push_sql(&format!(" OFFSET {offset}"));
        }

        Ok(())
    }
}

/// A chain right after `from` or a completed join.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    state: Arc<SelectState>,
}

/// A chain whose joins are locked.
#[derive(Debug, Clone)]
pub struct AfterJoin {
    state: Arc<SelectState>,
}

/// A chain right after `group_by`.
#[derive(Debug, Clone)]
pub struct Grouped {
    state: Arc<SelectState>,
}

/// A pending join, waiting for its condition.
#[derive(Debug, Clone)]
pub struct Joining {
    state: Arc<SelectState>,
    kind: JoinKind,
    target: TablePrimary,
    alias: String,
    joinee: Arc<Record>,
}

macro_rules! impl_clause_ops {
    ($($builder:ident => $stage:expr),+ $(,)?) => {
        $(
            impl $builder {
                /// Returns the stage this builder represents.
                #[must_use]
                pub const fn stage(&self) -> Stage {
                    $stage
                }

                /// Returns the alias scope.
                #[must_use]
                pub fn aliases(&self) -> &Aliases {
                    &self.state.aliases
                }

                /// Sets the WHERE predicate. The callback receives the scope
                /// and the current predicate; its result replaces it.
                #[must_use]
                pub fn where_clause<F, E>(&self, f: F) -> AfterJoin
                where
                    F: FnOnce(&Aliases, Option<&Expression>) -> E,
                    E: Into<Expression>,
                {
                    trace!(from = ?self.stage(), "where");
                    AfterJoin {
                        state: Arc::new(self.state.where_clause(f)),
                    }
                }

                /// Sets the GROUP BY terms. The callback receives the scope
                /// and the current terms; its result replaces them.
                #[must_use]
                pub fn group_by<F, T>(&self, f: F) -> Grouped
                where
                    F: FnOnce(&Aliases, &[Expression]) -> T,
                    T: IntoTerms<Expression>,
                {
                    trace!(from = ?self.stage(), "group by");
                    Grouped {
                        state: Arc::new(self.state.group_by(f)),
                    }
                }

                /// Appends ORDER BY terms. The callback receives an ascending
                /// term for every alias and field, and the terms already set.
                #[must_use]
                pub fn order_by<F, T>(&self, f: F) -> AfterJoin
                where
                    F: FnOnce(&Sorts, &[OrderTerm]) -> T,
                    T: IntoTerms<OrderTerm>,
                {
                    trace!(from = ?self.stage(), "order by");
                    AfterJoin {
                        state: Arc::new(self.state.order_by(f)),
                    }
                }

                /// Sets LIMIT.
                #[must_use]
                pub fn limit(&self, limit: u64) -> AfterJoin {
                    AfterJoin {
                        state: Arc::new(SelectState {
                            limit: Some(limit),
                            ..(*self.state).clone()
                        }),
                    }
                }

                /// Sets OFFSET.
                #[must_use]
                pub fn offset(&self, offset: u64) -> AfterJoin {
                    AfterJoin {
                        state: Arc::new(SelectState {
                            offset: Some(offset),
                            ..(*self.state).clone()
                        }),
                    }
                }

                /// Finishes the chain with a projection. Fields mapped to
                /// `None` stay in the declared shape but are not rendered.
                #[must_use]
                pub fn select<F, I, K, V>(&self, f: F) -> Select
                where
                    F: FnOnce(&Aliases) -> I,
                    I: IntoIterator<Item = (K, V)>,
                    K: Into<String>,
                    V: Into<Option<Expression>>,
                {
                    let fields = f(&self.state.aliases)
                        .into_iter()
                        .map(|(name, expr)| (name.into(), expr.into()))
                        .collect();
                    Select {
                        state: Arc::clone(&self.state),
                        fields: Arc::new(fields),
                    }
                }

                /// Finishes the chain with a single expression, yielding a
                /// [`Scalar`] sub-statement usable as a value elsewhere.
                #[must_use]
                pub fn scalar<F, E>(&self, f: F) -> Expression
                where
                    F: FnOnce(&Aliases) -> E,
                    E: Into<Expression>,
                {
                    let expr = f(&self.state.aliases).into();
                    Scalar::new(ScalarSelect {
                        state: Arc::clone(&self.state),
                        expr,
                    })
                    .into()
                }
            }
        )+
    };
}

impl_clause_ops!(
    SelectBuilder => Stage::Fresh,
    AfterJoin => Stage::AfterJoin,
    Grouped => Stage::Grouped,
);

impl SelectBuilder {
    pub(crate) fn start(
        schema: Arc<Schema>,
        from: TablePrimary,
        alias: Option<&str>,
    ) -> Result<Self> {
        let (record, alias) = resolve(&schema, &Aliases::new(), &from, alias)?;
        let aliases = Aliases::new().with(&alias, Arc::new(record));
        Ok(Self {
            state: Arc::new(SelectState {
                schema,
                from,
                alias,
                aliases,
                joins: vec![],
                filter: None,
                group_by: vec![],
                having: None,
                order_by: vec![],
                limit: None,
                offset: None,
            }),
        })
    }

    /// Starts a join of the given kind.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnknownTable`], [`Error::MissingAlias`],
    /// [`Error::DuplicateAlias`] or [`Error::MalformedTablePrimary`] when the
    /// source cannot be resolved in the current scope.
    pub fn join_with(
        &self,
        kind: JoinKind,
        primary: impl Into<TablePrimary>,
        alias: Option<&str>,
    ) -> Result<Joining> {
        let target = primary.into();
        let (record, alias) = resolve(&self.state.schema, &self.state.aliases, &target, alias)?;
        trace!(kind = kind.as_sql(), alias = %alias, "joining");
        Ok(Joining {
            state: Arc::clone(&self.state),
            kind,
            target,
            alias,
            joinee: Arc::new(record),
        })
    }

    /// Starts an inner join aliased by the table's own name.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn join(&self, primary: impl Into<TablePrimary>) -> Result<Joining> {
        self.join_with(JoinKind::Inner, primary, None)
    }

    /// Starts an inner join under an explicit alias.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn join_as(&self, primary: impl Into<TablePrimary>, alias: &str) -> Result<Joining> {
        self.join_with(JoinKind::Inner, primary, Some(alias))
    }

    /// Starts a left join aliased by the table's own name.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn left_join(&self, primary: impl Into<TablePrimary>) -> Result<Joining> {
        self.join_with(JoinKind::Left, primary, None)
    }

    /// Starts a left join under an explicit alias.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn left_join_as(&self, primary: impl Into<TablePrimary>, alias: &str) -> Result<Joining> {
        self.join_with(JoinKind::Left, primary, Some(alias))
    }

    /// Starts a right join aliased by the table's own name.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn right_join(&self, primary: impl Into<TablePrimary>) -> Result<Joining> {
        self.join_with(JoinKind::Right, primary, None)
    }

    /// Starts a right join under an explicit alias.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::join_with`].
    pub fn right_join_as(
        &self,
        primary: impl Into<TablePrimary>,
        alias: &str,
    ) -> Result<Joining> {
        self.join_with(JoinKind::Right, primary, Some(alias))
    }
}

impl Grouped {
    /// Sets the HAVING predicate. The callback receives the scope and the
    /// current predicate; its result replaces it.
    #[must_use]
    pub fn having<F, E>(&self, f: F) -> AfterJoin
    where
        F: FnOnce(&Aliases, Option<&Expression>) -> E,
        E: Into<Expression>,
    {
        trace!("having");
        AfterJoin {
            state: Arc::new(self.state.having(f)),
        }
    }
}

impl Joining {
    /// Returns [`Stage::Joining`].
    #[must_use]
    pub const fn stage(&self) -> Stage {
        Stage::Joining
    }

    /// Returns the record of the source being joined.
    #[must_use]
    pub fn joinee(&self) -> &Record {
        &self.joinee
    }

    /// Completes the join with `ON <predicate>`. The callback receives the
    /// joined record and the scope as it was before this join.
    #[must_use]
    pub fn on<F, E>(&self, f: F) -> SelectBuilder
    where
        F: FnOnce(&Record, &Aliases) -> E,
        E: Into<Expression>,
    {
        let predicate = f(&*self.joinee, &self.state.aliases).into();
        self.complete(JoinCondition::On(predicate))
    }

    /// Completes the join with `USING(col, ...)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyUsing`] for an empty list and
    /// [`Error::UnknownUsingColumn`] for a column missing from the joined
    /// record or from every earlier alias.
    pub fn using<I, S>(&self, columns: I) -> Result<SelectBuilder>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::EmptyUsing(self.alias.clone()));
        }
        for column in &columns {
            let shared = self.joinee.contains(column)
                && self
                    .state
                    .aliases
                    .iter()
                    .any(|(_, record)| record.contains(column));
            if !shared {
                return Err(Error::UnknownUsingColumn(column.clone()));
            }
        }
        Ok(self.complete(JoinCondition::Using(columns)))
    }

    fn complete(&self, condition: JoinCondition) -> SelectBuilder {
        let mut state = (*self.state).clone();
        state.aliases = state.aliases.with(&self.alias, Arc::clone(&self.joinee));
        state.joins.push(Join {
            kind: self.kind,
            target: self.target.clone(),
            alias: self.alias.clone(),
            condition,
        });
        debug!(alias = %self.alias, joins = state.joins.len(), "join registered");
        SelectBuilder {
            state: Arc::new(state),
        }
    }
}

/// A finished SELECT.
///
/// The declared output shape lists every field passed to `select`, each
/// optionally present; only present fields are rendered.
#[derive(Debug, Clone)]
pub struct Select {
    state: Arc<SelectState>,
    fields: Arc<IndexMap<String, Option<Expression>>>,
}

impl Select {
    /// Iterates over every declared output field.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over the output fields that are rendered.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, expr)| expr.is_some())
            .map(|(name, _)| name.as_str())
    }

    /// Returns whether a declared field is rendered.
    #[must_use]
    pub fn is_present(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(Some(_)))
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyProjection`] if no field is present, and
    /// propagates expression rendering failures.
    pub fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        let mut out = Stringifier::new();
        self.state.render(&mut out, |out| {
            let mut rendered = 0;
            for (name, expr) in self.fields.iter() {
                let Some(expr) = expr else { continue };
                if rendered > 0 {
                    out.push_sql(", ");
                }
                out.push_expression(expr)?;
                out.push_sql(" AS ");
                out.push_ident(name);
                rendered += 1;
            }
            if rendered == 0 {
                return Err(Error::EmptyProjection);
            }
            Ok(())
        })?;
        let (sql, params) = out.finish();
        debug!(statement = "select", params = params.len(), "rendered statement");
        Ok((sql, params))
    }

    /// Renders the statement and returns only the SQL string.
    ///
    /// # Errors
    ///
    /// See [`Select::build`].
    pub fn build_sql(&self) -> Result<String> {
        self.build().map(|(sql, _)| sql)
    }
}

impl Statement for Select {
    fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        Self::build(self)
    }
}

/// The statement behind [`SelectBuilder::scalar`].
#[derive(Debug)]
struct ScalarSelect {
    state: Arc<SelectState>,
    expr: Expression,
}

impl Statement for ScalarSelect {
    fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        let mut out = Stringifier::new();
        self.state
            .render(&mut out, |out| out.push_expression(&self.expr))?;
        let (sql, params) = out.finish();
        debug!(statement = "scalar", params = params.len(), "rendered statement");
        Ok((sql, params))
    }
}
