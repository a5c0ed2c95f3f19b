//! The entry point that binds builders to a schema.

use std::sync::Arc;

use crate::builder::{InsertBuilder, SelectBuilder, TablePrimary, UpdateBuilder};
use crate::error::Result;
use crate::schema::Schema;

/// Builder factory over one schema. Cheap to clone; the schema is shared.
#[derive(Debug, Clone)]
pub struct Query {
    schema: Arc<Schema>,
}

impl Query {
    /// Binds a schema.
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Returns the bound schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Starts a SELECT from a table (aliased by its own name) or a subquery.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnknownTable`] for an undeclared table,
    /// [`crate::Error::MissingAlias`] for a subquery, and
    /// [`crate::Error::MalformedTablePrimary`] for an empty name.
    pub fn from(&self, primary: impl Into<TablePrimary>) -> Result<SelectBuilder> {
        SelectBuilder::start(Arc::clone(&self.schema), primary.into(), None)
    }

    /// Starts a SELECT from a table or subquery under an explicit alias.
    ///
    /// # Errors
    ///
    /// See [`Query::from`].
    pub fn from_as(&self, primary: impl Into<TablePrimary>, alias: &str) -> Result<SelectBuilder> {
        SelectBuilder::start(Arc::clone(&self.schema), primary.into(), Some(alias))
    }

    /// Starts an INSERT into a table.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnknownTable`] for an undeclared table.
    pub fn insert(&self, table: &str) -> Result<InsertBuilder> {
        InsertBuilder::new(Arc::clone(&self.schema), table)
    }

    /// Starts an UPDATE of a table.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnknownTable`] for an undeclared table.
    pub fn update(&self, table: &str) -> Result<UpdateBuilder> {
        UpdateBuilder::new(Arc::clone(&self.schema), table)
    }
}
