//! CrateDB dialect.

use crate::{AutoIncrStrategy, Dialect, FieldType};

/// Dialect for CrateDB.
///
/// CrateDB has no sequences: auto-increment keys are left out of the INSERT
/// and their generated value is not read back.
#[derive(Debug, Clone, Default)]
pub struct CrateDialect {
    /// Appended to every CREATE TABLE.
    pub suffix: String,
}

impl Dialect for CrateDialect {
    fn name(&self) -> &'static str {
        "crate"
    }

    fn to_sql_type(&self, field_type: FieldType, _max_size: usize, _auto_incr: bool) -> String {
        let ty = match field_type {
            FieldType::Bool => "boolean",
            FieldType::Int8 => "byte",
            FieldType::Int16 => "short",
            FieldType::Int64 => "long",
            FieldType::Int32
            | FieldType::UInt8
            | FieldType::UInt16
            | FieldType::UInt32
            | FieldType::UInt64 => "integer",
            FieldType::Float32 => "float",
            FieldType::Float64 => "double",
            FieldType::Text | FieldType::Json => "string",
            FieldType::Bytes => "array(integer)",
            FieldType::Timestamp => "timestamp",
        };
        ty.to_string()
    }

    fn auto_incr_str(&self) -> &str {
        "PRIMARY KEY"
    }

    fn auto_incr_bind_value(&self) -> &str {
        ""
    }

    fn auto_incr_strategy(&self) -> AutoIncrStrategy {
        AutoIncrStrategy::NotReported
    }

    fn create_table_suffix(&self) -> String {
        self.suffix.clone()
    }

    fn truncate_clause(&self) -> &str {
        "DELETE FROM"
    }

    fn bind_var(&self, _i: usize) -> String {
        "?".to_string()
    }

    fn if_schema_not_exists(&self, command: &str, _schema: &str) -> String {
        format!("{command} IF NOT EXISTS")
    }

    fn if_table_exists(&self, command: &str, _schema: Option<&str>, _table: &str) -> String {
        format!("{command} IF EXISTS")
    }

    fn if_table_not_exists(&self, command: &str, _schema: Option<&str>, _table: &str) -> String {
        format!("{command} IF NOT EXISTS")
    }
}
