//! Alias scopes and table-source resolution.
//!
//! Resolving a table name or a subquery under an alias yields a [`Record`]:
//! one column-reference expression per field, each rendering
//! `` `alias`.`field` ``. An [`Aliases`] scope maps every alias visible at
//! some point in a chain to its record and only ever grows.

use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::expr::{Expression, Variable};
use super::select::Select;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// A row shape: field name → expression, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Expression>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Expression> {
        self.fields.get(field)
    }

    /// Returns whether the record has the field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates over field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over fields and their expressions in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.fields.iter().map(|(name, expr)| (name.as_str(), expr))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A record of `` `alias`.`field` `` references, one per name.
    fn of_columns<'a>(alias: &str, names: impl Iterator<Item = &'a str>) -> Self {
        names
            .map(|name| (String::from(name), Variable::column(alias, name).into()))
            .collect()
    }
}

impl FromIterator<(String, Expression)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Expression)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Index<&str> for Record {
    type Output = Expression;

    /// # Panics
    ///
    /// Panics if the field does not exist; use [`Record::get`] to probe.
    fn index(&self, field: &str) -> &Expression {
        match self.fields.get(field) {
            Some(expr) => expr,
            None => panic!("record has no field `{field}`"),
        }
    }
}

/// The alias scope at one point in a chain.
#[derive(Debug, Clone, Default)]
pub struct Aliases {
    scope: IndexMap<String, Arc<Record>>,
}

impl Aliases {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an alias.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Record> {
        self.scope.get(alias).map(Arc::as_ref)
    }

    /// Returns whether the alias is registered.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.scope.contains_key(alias)
    }

    /// Iterates over aliases in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scope.keys().map(String::as_str)
    }

    /// Iterates over aliases and their records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.scope
            .iter()
            .map(|(alias, record)| (alias.as_str(), record.as_ref()))
    }

    /// Fallible lookup of `alias.field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if either the alias or the field is
    /// missing.
    pub fn column(&self, alias: &str, field: &str) -> Result<Expression> {
        self.get(alias)
            .and_then(|record| record.get(field))
            .cloned()
            .ok_or_else(|| Error::UnknownColumn {
                relation: String::from(alias),
                column: String::from(field),
            })
    }

    /// Returns a new scope with one more alias.
    pub(crate) fn with(&self, alias: &str, record: Arc<Record>) -> Self {
        let mut scope = self.scope.clone();
        scope.insert(String::from(alias), record);
        Self { scope }
    }
}

impl Index<&str> for Aliases {
    type Output = Record;

    /// # Panics
    ///
    /// Panics if the alias is not in scope; use [`Aliases::get`] to probe.
    fn index(&self, alias: &str) -> &Record {
        match self.scope.get(alias) {
            Some(record) => record.as_ref(),
            None => panic!("alias `{alias}` is not in scope"),
        }
    }
}

/// A FROM/JOIN source: a schema table or a finished subquery.
#[derive(Debug, Clone)]
pub enum TablePrimary {
    /// A table declared in the schema.
    Table(String),
    /// A subquery; must be given an explicit alias.
    Subquery(Select),
}

impl From<&str> for TablePrimary {
    fn from(name: &str) -> Self {
        Self::Table(String::from(name))
    }
}

impl From<String> for TablePrimary {
    fn from(name: String) -> Self {
        Self::Table(name)
    }
}

impl From<Select> for TablePrimary {
    fn from(select: Select) -> Self {
        Self::Subquery(select)
    }
}

impl From<&Select> for TablePrimary {
    fn from(select: &Select) -> Self {
        Self::Subquery(select.clone())
    }
}

/// Resolves a table source into its record and alias without touching
/// `scope`.
///
/// A table defaults its alias to its own name; a subquery has no default.
pub(crate) fn resolve(
    schema: &Schema,
    scope: &Aliases,
    primary: &TablePrimary,
    alias: Option<&str>,
) -> Result<(Record, String)> {
    let (record, alias) = match primary {
        TablePrimary::Table(name) => {
            if name.is_empty() {
                return Err(Error::MalformedTablePrimary(String::from(
                    "empty table name",
                )));
            }
            let table = schema
                .get(name)
                .ok_or_else(|| Error::UnknownTable(name.clone()))?;
            let alias = alias.unwrap_or(name.as_str());
            let record = Record::of_columns(alias, table.columns().map(|(column, _)| column));
            (record, String::from(alias))
        }
        TablePrimary::Subquery(select) => {
            let alias = alias.ok_or(Error::MissingAlias)?;
            let mut columns = select.columns().peekable();
            if columns.peek().is_none() {
                return Err(Error::MalformedTablePrimary(format!(
                    "subquery aliased `{alias}` projects no fields"
                )));
            }
            (Record::of_columns(alias, columns), String::from(alias))
        }
    };
    if scope.contains(&alias) {
        return Err(Error::DuplicateAlias(alias));
    }
    debug!(alias = %alias, fields = record.len(), "resolved table source");
    Ok((record, alias))
}
