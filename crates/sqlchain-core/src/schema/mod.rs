//! Schema declarations: tables, their columns, and foreign-key metadata.
//!
//! A [`Schema`] is declared once and then shared read-only by every builder
//! created from it. Columns are descriptors only; they carry the facts the
//! INSERT/UPDATE builders need (nullability, defaults) and no data.
//!
//! ```rust
//! use sqlchain_core::schema::{Column, Schema, Table};
//!
//! let schema = Schema::new().table(
//!     "users",
//!     Table::new()
//!         .column("id", Column::int())
//!         .column("name", Column::varchar(255))
//!         .column("age", Column::int().nullable())
//!         .primary_key(["id"]),
//! );
//! assert!(schema.get("users").unwrap().get("age").unwrap().is_optional());
//! ```

mod config;

pub use config::{ColumnConfig, ForeignKeyConfig, SchemaConfig, TableConfig};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builder::Expression;
use crate::error::Result;

/// The declared value type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// TINYINT.
    TinyInt,
    /// INT.
    Int,
    /// BIGINT.
    BigInt,
    /// FLOAT / DOUBLE.
    Float,
    /// VARCHAR with a maximum length.
    Varchar(u32),
    /// TEXT.
    Text,
    /// ENUM with its allowed values.
    Enum(Vec<String>),
    /// TIMESTAMP.
    Timestamp,
    /// JSON document.
    Json,
}

/// A column descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    ty: ColumnType,
    nullable: bool,
    default: Option<Expression>,
}

impl Column {
    /// Creates a NOT NULL column without a default.
    #[must_use]
    pub const fn new(ty: ColumnType) -> Self {
        Self {
            ty,
            nullable: false,
            default: None,
        }
    }

    /// A TINYINT column.
    #[must_use]
    pub const fn tiny_int() -> Self {
        Self::new(ColumnType::TinyInt)
    }

    /// An INT column.
    #[must_use]
    pub const fn int() -> Self {
        Self::new(ColumnType::Int)
    }

    /// A BIGINT column.
    #[must_use]
    pub const fn big_int() -> Self {
        Self::new(ColumnType::BigInt)
    }

    /// A FLOAT column.
    #[must_use]
    pub const fn float() -> Self {
        Self::new(ColumnType::Float)
    }

    /// A VARCHAR column.
    #[must_use]
    pub const fn varchar(length: u32) -> Self {
        Self::new(ColumnType::Varchar(length))
    }

    /// A TEXT column.
    #[must_use]
    pub const fn text() -> Self {
        Self::new(ColumnType::Text)
    }

    /// An ENUM column.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ColumnType::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// A TIMESTAMP column.
    #[must_use]
    pub const fn timestamp() -> Self {
        Self::new(ColumnType::Timestamp)
    }

    /// A JSON column.
    #[must_use]
    pub const fn json() -> Self {
        Self::new(ColumnType::Json)
    }

    /// Marks the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets a default, either a literal or an expression such as
    /// `Expression::raw("CURRENT_TIMESTAMP")`.
    #[must_use]
    pub fn default(mut self, value: impl Into<Expression>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the declared type.
    #[must_use]
    pub const fn ty(&self) -> &ColumnType {
        &self.ty
    }

    /// Returns whether the column accepts NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the declared default.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Expression> {
        self.default.as_ref()
    }

    /// An INSERT may omit the column when it is nullable or has a default.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.nullable || self.default.is_some()
    }
}

/// A table: ordered columns plus an optional composite primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Column>,
    primary_key: Vec<String>,
}

impl Table {
    /// Creates a table without columns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. Redeclaring a name replaces the column in place.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    /// Sets the primary key columns, in key order.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Looks up a column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Iterates over columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Returns the primary key column names.
    #[must_use]
    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_key
    }
}

/// Foreign-key metadata. Stored with the schema; builders do not consult it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing table.
    pub table: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
}

/// The set of tables builders resolve names against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: IndexMap<String, Table>,
    foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Records a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Looks up a table.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Iterates over tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    /// Returns the recorded foreign keys.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Loads a schema from a JSON [`SchemaConfig`] document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for malformed JSON and
    /// [`crate::Error::InvalidSchema`] for inconsistent declarations.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchemaConfig = serde_json::from_str(json)?;
        Self::try_from(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_optionality() {
        assert!(!Column::int().is_optional());
        assert!(Column::int().nullable().is_optional());
        assert!(Column::int().default(0).is_optional());
        assert!(Column::timestamp()
            .default(Expression::raw("CURRENT_TIMESTAMP"))
            .is_optional());
    }

    #[test]
    fn test_table_keeps_declaration_order() {
        let table = Table::new()
            .column("b", Column::int())
            .column("a", Column::text())
            .column("c", Column::json());
        let names: Vec<&str> = table.columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_composite_primary_key() {
        let table = Table::new()
            .column("user_id", Column::int())
            .column("group_id", Column::int())
            .primary_key(["user_id", "group_id"]);
        assert_eq!(table.primary_key_columns(), &["user_id", "group_id"]);
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new()
            .table("users", Table::new().column("id", Column::int()))
            .foreign_key(ForeignKey {
                table: String::from("posts"),
                column: String::from("user_id"),
                references_table: String::from("users"),
                references_column: String::from("id"),
            });
        assert!(schema.get("users").is_some());
        assert!(schema.get("posts").is_none());
        let names: Vec<&str> = schema.tables().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["users"]);
        assert_eq!(schema.foreign_keys().len(), 1);
    }

    #[test]
    fn test_enumeration_values() {
        let column = Column::enumeration(["draft", "sent"]);
        assert_eq!(
            column.ty(),
            &ColumnType::Enum(vec![String::from("draft"), String::from("sent")])
        );
    }
}
