//! Oracle dialect.

use crate::{Dialect, FieldType, quote_with};

/// Dialect for Oracle Database.
///
/// Identifiers are uppercased when quoted so they match Oracle's folding of
/// unquoted names.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn query_suffix(&self) -> &str {
        ""
    }

    fn to_sql_type(&self, field_type: FieldType, max_size: usize, auto_incr: bool) -> String {
        let ty = match field_type {
            FieldType::Bool => "number(1, 0)",
            FieldType::Int64 | FieldType::UInt64 if auto_incr => "bigserial",
            FieldType::Int64 | FieldType::UInt64 => "number(19, 0)",
            t if t.is_integer() && auto_incr => "serial",
            t if t.is_integer() => "integer",
            FieldType::Float32 | FieldType::Float64 => "float(24)",
            FieldType::Bytes => "bytea",
            FieldType::Timestamp => "date",
            _ if max_size > 0 => return format!("varchar2({max_size})"),
            _ => "text",
        };
        ty.to_string()
    }

    fn auto_incr_str(&self) -> &str {
        ""
    }

    fn auto_incr_bind_value(&self) -> &str {
        "NULL"
    }

    fn truncate_clause(&self) -> &str {
        "truncate table"
    }

    fn bind_var(&self, i: usize) -> String {
        format!(":{}", i + 1)
    }

    fn quote_field(&self, field: &str) -> String {
        quote_with(&field.to_uppercase(), '"')
    }
}
