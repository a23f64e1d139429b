//! MySQL dialect.

use crate::{Dialect, FieldType, quote_with};

/// Dialect for MySQL and MariaDB.
///
/// `engine` and `encoding` are required for table creation; generating DDL
/// with either left empty panics.
#[derive(Debug, Clone)]
pub struct MySqlDialect {
    /// Storage engine, e.g. `InnoDB`.
    pub engine: String,
    /// Default charset, e.g. `UTF8`.
    pub encoding: String,
}

impl MySqlDialect {
    pub fn new(engine: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            encoding: encoding.into(),
        }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new("InnoDB", "UTF8")
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn to_sql_type(&self, field_type: FieldType, max_size: usize, _auto_incr: bool) -> String {
        let ty = match field_type {
            FieldType::Bool => "boolean",
            FieldType::Int8 => "tinyint",
            FieldType::UInt8 => "tinyint unsigned",
            FieldType::Int16 => "smallint",
            FieldType::UInt16 => "smallint unsigned",
            FieldType::Int32 => "int",
            FieldType::UInt32 => "int unsigned",
            FieldType::Int64 => "bigint",
            FieldType::UInt64 => "bigint unsigned",
            FieldType::Float32 | FieldType::Float64 => "double",
            FieldType::Bytes => "mediumblob",
            FieldType::Timestamp => "datetime",
            FieldType::Json => "text",
            FieldType::Text => {
                return match max_size {
                    0 => "varchar(255)".to_string(),
                    n if n < 256 => format!("varchar({n})"),
                    _ => "text".to_string(),
                };
            }
        };
        ty.to_string()
    }

    fn auto_incr_str(&self) -> &str {
        "auto_increment"
    }

    fn auto_incr_bind_value(&self) -> &str {
        "null"
    }

    fn create_table_suffix(&self) -> String {
        if self.engine.is_empty() {
            tracing::error!(dialect = "mysql", "create table requested without engine");
            panic!("MySqlDialect.engine must be set (e.g. \"InnoDB\") before creating tables");
        }
        if self.encoding.is_empty() {
            tracing::error!(dialect = "mysql", "create table requested without encoding");
            panic!("MySqlDialect.encoding must be set (e.g. \"UTF8\") before creating tables");
        }
        format!(" engine={} charset={}", self.engine, self.encoding)
    }

    fn create_index_suffix(&self) -> &str {
        "using"
    }

    fn index_type_after_columns(&self) -> bool {
        true
    }

    fn drop_index_suffix(&self) -> &str {
        "on"
    }

    fn bind_var(&self, _i: usize) -> String {
        "?".to_string()
    }

    fn quote_field(&self, field: &str) -> String {
        quote_with(field, '`')
    }
}
