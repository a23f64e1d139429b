//! SQLite dialect.

use crate::{Dialect, FieldType};

/// Dialect for SQLite 3.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect {
    /// Appended to every CREATE TABLE, e.g. `" strict"`.
    pub suffix: String,
    /// Run `pragma foreign_keys = on` once per connection.
    pub foreign_keys: bool,
}

impl SqliteDialect {
    /// Dialect with foreign key enforcement switched on.
    pub fn with_foreign_keys() -> Self {
        Self {
            foreign_keys: true,
            ..Self::default()
        }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn to_sql_type(&self, field_type: FieldType, max_size: usize, _auto_incr: bool) -> String {
        match field_type {
            FieldType::Bool => "integer".to_string(),
            t if t.is_integer() => "integer".to_string(),
            FieldType::Float32 | FieldType::Float64 => "real".to_string(),
            FieldType::Bytes => "blob".to_string(),
            FieldType::Timestamp => "datetime".to_string(),
            FieldType::Json => "text".to_string(),
            _ => format!("varchar({})", if max_size > 0 { max_size } else { 255 }),
        }
    }

    fn auto_incr_str(&self) -> &str {
        "autoincrement"
    }

    fn auto_incr_bind_value(&self) -> &str {
        "null"
    }

    fn create_table_suffix(&self) -> String {
        self.suffix.clone()
    }

    fn truncate_clause(&self) -> &str {
        "delete from"
    }

    fn bind_var(&self, _i: usize) -> String {
        "?".to_string()
    }

    // SQLite has no schemas; attached databases are not modelled.
    fn quoted_table_for_query(&self, _schema: Option<&str>, table: &str) -> String {
        self.quote_field(table)
    }

    fn supports_schemas(&self) -> bool {
        false
    }

    fn init_string(&self) -> Option<String> {
        self.foreign_keys
            .then(|| "pragma foreign_keys = on;".to_string())
    }
}
