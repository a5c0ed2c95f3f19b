//! Error types for statement construction and rendering.

/// Errors raised while building or rendering a statement.
///
/// Every error is final: builders never retry and renders never return
/// partial text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The alias is already registered in the current scope.
    #[error("alias `{0}` is already registered in this scope")]
    DuplicateAlias(String),

    /// The referenced table is not declared in the schema.
    #[error("table `{0}` is not declared in the schema")]
    UnknownTable(String),

    /// A subquery was used as a FROM/JOIN source without an alias.
    #[error("a subquery used as a table source requires an explicit alias")]
    MissingAlias,

    /// The table source is neither a usable table name nor a usable subquery.
    #[error("malformed table source: {0}")]
    MalformedTablePrimary(String),

    /// An expression could not be rendered.
    #[error("unrecognized expression: {0}")]
    UnrecognizedExpression(String),

    /// A field does not name a column of the target table or record.
    #[error("`{relation}` has no column `{column}`")]
    UnknownColumn {
        /// Table name or alias.
        relation: String,
        /// The missing column.
        column: String,
    },

    /// A USING column is not shared by the joined source and an earlier alias.
    #[error("USING column `{0}` is not shared by the joined source and an earlier alias")]
    UnknownUsingColumn(String),

    /// A column that is neither nullable nor defaulted was not provided.
    #[error("column `{column}` of `{table}` is required (not nullable, no default)")]
    MissingValue {
        /// Target table.
        table: String,
        /// The required column.
        column: String,
    },

    /// A join lists no USING columns.
    #[error("USING list for `{0}` is empty")]
    EmptyUsing(String),

    /// Nothing would be written by an INSERT/UPDATE.
    #[error("nothing to write for `{0}`")]
    EmptyValues(String),

    /// A SELECT with no present fields.
    #[error("the select list is empty")]
    EmptyProjection,

    /// The schema declaration is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The schema configuration document could not be parsed.
    #[error("schema configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for statement construction and rendering.
pub type Result<T> = std::result::Result<T, Error>;
