//! Serde model for declaring a schema in a JSON document.
//!
//! ```json
//! {
//!   "tables": {
//!     "users": {
//!       "columns": {
//!         "id": { "type": "int" },
//!         "name": { "type": { "varchar": 255 } },
//!         "created_at": { "type": "timestamp", "default_sql": "CURRENT_TIMESTAMP" },
//!         "age": { "type": "int", "nullable": true }
//!       },
//!       "primary_key": ["id"]
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Column, ColumnType, ForeignKey, Schema, Table};
use crate::builder::{Expression, SqlValue};
use crate::error::Error;

/// Top-level schema document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Tables by name, in document order.
    #[serde(default)]
    pub tables: IndexMap<String, TableConfig>,
    /// Foreign-key metadata.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyConfig>,
}

/// One table in a [`SchemaConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Columns by name, in document order.
    pub columns: IndexMap<String, ColumnConfig>,
    /// Primary key column names.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// One column in a [`TableConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Whether NULL is accepted.
    #[serde(default)]
    pub nullable: bool,
    /// A literal default. An explicit `null` is a NULL default, distinct
    /// from leaving the key out.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<SqlValue>,
    /// A raw SQL default, e.g. `CURRENT_TIMESTAMP`.
    #[serde(default)]
    pub default_sql: Option<String>,
}

/// A foreign key in a [`SchemaConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeyConfig {
    /// Referencing table.
    pub table: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
}

/// Wraps any present value, `null` included, in `Some`; a missing key falls
/// back to `None` through `#[serde(default)]`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<SqlValue>, D::Error>
where
    D: Deserializer<'de>,
{
    SqlValue::deserialize(deserializer).map(Some)
}

impl TryFrom<ColumnConfig> for Column {
    type Error = String;

    fn try_from(config: ColumnConfig) -> Result<Self, Self::Error> {
        let mut column = Self::new(config.ty);
        if config.nullable {
            column = column.nullable();
        }
        match (config.default, config.default_sql) {
            (Some(_), Some(_)) => {
                return Err(String::from("`default` and `default_sql` are mutually exclusive"));
            }
            (Some(value), None) => column = column.default(value),
            (None, Some(sql)) => column = column.default(Expression::raw(sql)),
            (None, None) => {}
        }
        Ok(column)
    }
}

impl TryFrom<SchemaConfig> for Schema {
    type Error = Error;

    fn try_from(config: SchemaConfig) -> Result<Self, Self::Error> {
        let mut schema = Self::new();
        for (table_name, table_config) in config.tables {
            let mut table = Table::new();
            for (column_name, column_config) in table_config.columns {
                let column = Column::try_from(column_config).map_err(|reason| {
                    Error::InvalidSchema(format!("{table_name}.{column_name}: {reason}"))
                })?;
                table = table.column(column_name, column);
            }
            if let Some(missing) = table_config
                .primary_key
                .iter()
                .find(|key| table.get(key).is_none())
            {
                return Err(Error::InvalidSchema(format!(
                    "primary key of `{table_name}` names unknown column `{missing}`"
                )));
            }
            table = table.primary_key(table_config.primary_key);
            schema = schema.table(table_name, table);
        }
        for fk in config.foreign_keys {
            schema = schema.foreign_key(ForeignKey {
                table: fk.table,
                column: fk.column,
                references_table: fk.references_table,
                references_column: fk.references_column,
            });
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"{
        "tables": {
            "users": {
                "columns": {
                    "id": { "type": "int" },
                    "name": { "type": { "varchar": 255 } },
                    "role": { "type": { "enum": ["admin", "member"] }, "default": "member" },
                    "created_at": { "type": "timestamp", "default_sql": "CURRENT_TIMESTAMP" },
                    "age": { "type": "int", "nullable": true }
                },
                "primary_key": ["id"]
            }
        }
    }"#;

    #[test]
    fn test_load_schema_from_json() {
        let schema = Schema::from_json(USERS).unwrap();
        let users = schema.get("users").unwrap();
        let names: Vec<&str> = users.columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name", "role", "created_at", "age"]);
        assert_eq!(users.get("name").unwrap().ty(), &ColumnType::Varchar(255));
        assert!(!users.get("id").unwrap().is_optional());
        assert!(users.get("role").unwrap().is_optional());
        assert_eq!(
            users.get("created_at").unwrap().default_value(),
            Some(&Expression::raw("CURRENT_TIMESTAMP"))
        );
        assert!(users.get("age").unwrap().is_nullable());
        assert_eq!(users.primary_key_columns(), &["id"]);
    }

    #[test]
    fn test_unknown_primary_key_column_is_rejected() {
        let json = r#"{ "tables": { "t": { "columns": { "a": { "type": "int" } }, "primary_key": ["b"] } } }"#;
        assert!(matches!(Schema::from_json(json), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_conflicting_defaults_are_rejected() {
        let json = r#"{ "tables": { "t": { "columns": {
            "a": { "type": "int", "default": 1, "default_sql": "2" }
        } } } }"#;
        let err = Schema::from_json(json).unwrap_err();
        assert!(err.to_string().contains("t.a"));
    }

    #[test]
    fn test_explicit_null_default_keeps_column_optional() {
        let json = r#"{ "tables": { "t": { "columns": {
            "a": { "type": "int", "default": null },
            "b": { "type": "int" }
        } } } }"#;
        let schema = Schema::from_json(json).unwrap();
        let table = schema.get("t").unwrap();
        let a = table.get("a").unwrap();
        assert_eq!(a.default_value(), Some(&Expression::null()));
        assert!(a.is_optional());
        assert_eq!(table.get("b").unwrap().default_value(), None);
        assert!(!table.get("b").unwrap().is_optional());
    }

    #[test]
    fn test_timestamp_default_loads_as_timestamp() {
        let json = r#"{ "tables": { "t": { "columns": {
            "at": { "type": "timestamp", "default": "2024-03-01T12:00:00" }
        } } } }"#;
        let schema = Schema::from_json(json).unwrap();
        let default = schema.get("t").unwrap().get("at").unwrap().default_value();
        assert!(matches!(
            default,
            Some(Expression::Literal(SqlValue::Timestamp(_)))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Schema::from_json("{"), Err(Error::Config(_))));
        assert!(matches!(
            Schema::from_json(r#"{ "tabels": {} }"#),
            Err(Error::Config(_))
        ));
    }
}
