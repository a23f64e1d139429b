//! Snowflake dialect.

use crate::postgres::{postgres_type, quote_folded};
use crate::{Dialect, FieldType};

/// Dialect for Snowflake.
///
/// Column types follow Postgres naming; parameters use `?` placeholders.
#[derive(Debug, Clone, Default)]
pub struct SnowflakeDialect {
    /// Appended to every CREATE TABLE.
    pub suffix: String,
    /// Lowercase identifiers before quoting.
    pub lowercase_fields: bool,
}

impl Dialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
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

    fn create_table_suffix(&self) -> String {
        self.suffix.clone()
    }

    fn bind_var(&self, _i: usize) -> String {
        "?".to_string()
    }

    fn quote_field(&self, field: &str) -> String {
        quote_folded(field, self.lowercase_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_matches_postgres_types() {
        let d = SnowflakeDialect::default();
        assert_eq!(d.to_sql_type(FieldType::UInt16, 0, false), "integer");
        assert_eq!(d.to_sql_type(FieldType::UInt64, 0, false), "bigint");
        assert_eq!(d.to_sql_type(FieldType::Float64, 0, false), "double precision");
        assert_eq!(
            d.to_sql_type(FieldType::Timestamp, 0, false),
            "timestamp with time zone"
        );
        assert_eq!(d.to_sql_type(FieldType::Text, 0, false), "text");
        assert_eq!(d.to_sql_type(FieldType::Text, 50, false), "varchar(50)");
    }

    #[test]
    fn snowflake_statement_pieces() {
        let d = SnowflakeDialect::default();
        assert_eq!(d.auto_incr_str(), "");
        assert_eq!(d.auto_incr_bind_value(), "default");
        assert_eq!(d.auto_incr_insert_suffix("id"), "");
        assert_eq!(d.create_index_suffix(), "");
        assert_eq!(d.drop_index_suffix(), "");
        assert_eq!(d.truncate_clause(), "truncate");
        assert_eq!(d.bind_var(0), "?");
        assert_eq!(d.bind_var(4), "?");
        assert_eq!(d.quote_field("Foo"), r#""Foo""#);
        assert_eq!(d.quoted_table_for_query(Some("foo"), "bar"), r#"foo."bar""#);

        let lower = SnowflakeDialect {
            lowercase_fields: true,
            ..SnowflakeDialect::default()
        };
        assert_eq!(lower.quote_field("Foo"), r#""foo""#);
    }
}
