//! PostgreSQL dialect.

use crate::{AutoIncrStrategy, Dialect, FieldType, quote_with, sized_text};

/// Dialect for PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect {
    /// Appended to every CREATE TABLE.
    pub suffix: String,
    /// Lowercase identifiers before quoting, matching unquoted Postgres folding.
    pub lowercase_fields: bool,
}

/// Type mapping shared with dialects that copy Postgres naming.
pub(crate) fn postgres_type(field_type: FieldType, max_size: usize, auto_incr: bool) -> String {
    let ty = match field_type {
        FieldType::Bool => "boolean",
        FieldType::Int64 | FieldType::UInt64 if auto_incr => "bigserial",
        FieldType::Int64 | FieldType::UInt64 => "bigint",
        t if t.is_integer() && auto_incr => "serial",
        t if t.is_integer() => "integer",
        FieldType::Float32 => "real",
        FieldType::Float64 => "double precision",
        FieldType::Bytes => "bytea",
        FieldType::Timestamp => "timestamp with time zone",
        FieldType::Json => "text",
        _ => return sized_text(max_size, "text"),
    };
    ty.to_string()
}

pub(crate) fn quote_folded(field: &str, lowercase: bool) -> String {
    if lowercase {
        quote_with(&field.to_lowercase(), '"')
    } else {
        quote_with(field, '"')
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn to_sql_type(&self, field_type: FieldType, max_size: usize, auto_incr: bool) -> String {
        postgres_type(field_type, max_size, auto_incr)
    }

    fn auto_incr_str(&self) -> &str {
        ""
    }

    fn auto_incr_bind_value(&self) -> &str {
        "default"
    }

    fn auto_incr_insert_suffix(&self, column: &str) -> String {
        format!(" returning {}", self.quote_field(column))
    }

    fn auto_incr_strategy(&self) -> AutoIncrStrategy {
        AutoIncrStrategy::Returning
    }

    fn create_table_suffix(&self) -> String {
        self.suffix.clone()
    }

    fn create_index_suffix(&self) -> &str {
        "using"
    }

    fn bind_var(&self, i: usize) -> String {
        format!("${}", i + 1)
    }

    fn quote_field(&self, field: &str) -> String {
        quote_folded(field, self.lowercase_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_to_sql_type() {
        let d = PostgresDialect::default();
        let cases = [
            (FieldType::Bool, 0, false, "boolean"),
            (FieldType::Int8, 0, false, "integer"),
            (FieldType::UInt8, 0, false, "integer"),
            (FieldType::Int16, 0, false, "integer"),
            (FieldType::UInt32, 0, false, "integer"),
            (FieldType::Int32, 0, true, "serial"),
            (FieldType::Int64, 0, false, "bigint"),
            (FieldType::UInt64, 0, false, "bigint"),
            (FieldType::Int64, 0, true, "bigserial"),
            (FieldType::Float32, 0, false, "real"),
            (FieldType::Float64, 0, false, "double precision"),
            (FieldType::Bytes, 0, false, "bytea"),
            (FieldType::Timestamp, 0, false, "timestamp with time zone"),
            (FieldType::Text, 0, false, "text"),
            (FieldType::Text, 50, false, "varchar(50)"),
            (FieldType::Text, 1024, false, "varchar(1024)"),
        ];
        for (ty, size, auto_incr, expected) in cases {
            assert_eq!(d.to_sql_type(ty, size, auto_incr), expected, "{ty:?}");
        }
    }

    #[test]
    fn postgres_statement_pieces() {
        let d = PostgresDialect::default();
        assert_eq!(d.auto_incr_str(), "");
        assert_eq!(d.auto_incr_bind_value(), "default");
        assert_eq!(d.auto_incr_insert_suffix("foo"), r#" returning "foo""#);
        assert_eq!(d.create_table_suffix(), "");
        assert_eq!(d.create_index_suffix(), "using");
        assert_eq!(d.drop_index_suffix(), "");
        assert_eq!(d.truncate_clause(), "truncate");
        assert_eq!(d.bind_var(0), "$1");
        assert_eq!(d.bind_var(4), "$5");
    }

    #[test]
    fn postgres_quoting() {
        let d = PostgresDialect::default();
        assert_eq!(d.quote_field("Foo"), r#""Foo""#);
        assert_eq!(d.quote_field("bar"), r#""bar""#);
        assert_eq!(d.quoted_table_for_query(None, "foo"), r#""foo""#);
        assert_eq!(d.quoted_table_for_query(Some("foo"), "bar"), r#"foo."bar""#);

        let lower = PostgresDialect {
            lowercase_fields: true,
            ..PostgresDialect::default()
        };
        assert_eq!(lower.quote_field("Foo"), r#""foo""#);
    }

    #[test]
    fn postgres_existence_guards() {
        let d = PostgresDialect::default();
        assert_eq!(d.if_schema_not_exists("foo", "bar"), "foo if not exists");
        assert_eq!(d.if_table_exists("foo", Some("bar"), "baz"), "foo if exists");
        assert_eq!(
            d.if_table_not_exists("foo", Some("bar"), "baz"),
            "foo if not exists"
        );
    }
}
