//! SQL dialects for tablemap.
//!
//! A [`Dialect`] supplies everything that differs between databases when the
//! engine generates statements: column types, identifier quoting, bind
//! placeholders, auto-increment handling and DDL suffixes. Dialects are pure
//! string producers and never touch a connection.

mod crate_db;
mod mysql;
mod oracle;
mod postgres;
mod snowflake;
mod sqlite;

pub use crate_db::CrateDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;
pub use sqlite::SqliteDialect;

pub use tablemap_core::FieldType;

/// How the generated key of an auto-increment column is read back after INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrStrategy {
    /// The driver reports the key alongside the affected-row count.
    LastInsertId,
    /// The INSERT carries a returning clause and is run as a query.
    Returning,
    /// The database cannot report the key; the field is left untouched.
    NotReported,
}

/// Per-database SQL syntax.
pub trait Dialect: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Terminator appended to generated statements.
    fn query_suffix(&self) -> &str {
        ";"
    }

    /// SQL column type for a field.
    ///
    /// `max_size` of zero means no explicit size was configured.
    fn to_sql_type(&self, field_type: FieldType, max_size: usize, auto_incr: bool) -> String;

    /// Keyword appended to an auto-increment column definition.
    fn auto_incr_str(&self) -> &str;

    /// Literal placed in the VALUES list for an auto-increment column.
    ///
    /// An empty string omits the column from the INSERT entirely.
    fn auto_incr_bind_value(&self) -> &str;

    /// Text appended to an INSERT that has an auto-increment column.
    fn auto_incr_insert_suffix(&self, _column: &str) -> String {
        String::new()
    }

    /// How the generated key is retrieved.
    fn auto_incr_strategy(&self) -> AutoIncrStrategy {
        AutoIncrStrategy::LastInsertId
    }

    /// Text appended after the closing parenthesis of CREATE TABLE.
    fn create_table_suffix(&self) -> String {
        String::new()
    }

    /// Keyword introducing the index type in CREATE INDEX.
    fn create_index_suffix(&self) -> &str {
        ""
    }

    /// Whether the index type goes after the column list in CREATE INDEX.
    fn index_type_after_columns(&self) -> bool {
        false
    }

    /// Keyword introducing the table in DROP INDEX.
    fn drop_index_suffix(&self) -> &str {
        ""
    }

    /// Statement prefix that empties a table.
    fn truncate_clause(&self) -> &str {
        "truncate"
    }

    /// Bind placeholder for the zero-based parameter index `i`.
    fn bind_var(&self, i: usize) -> String;

    /// Quote an identifier.
    fn quote_field(&self, field: &str) -> String {
        quote_with(field, '"')
    }

    /// Schema-qualified, quoted table name. The schema itself is not quoted.
    fn quoted_table_for_query(&self, schema: Option<&str>, table: &str) -> String {
        match schema.map(str::trim).filter(|s| !s.is_empty()) {
            Some(schema) => format!("{schema}.{}", self.quote_field(table)),
            None => self.quote_field(table),
        }
    }

    /// Whether table names can be qualified with a schema.
    ///
    /// When false, schema names are dropped from table references and no
    /// CREATE SCHEMA is issued.
    fn supports_schemas(&self) -> bool {
        true
    }

    /// Add the "if not exists" guard to a CREATE SCHEMA command.
    fn if_schema_not_exists(&self, command: &str, _schema: &str) -> String {
        format!("{command} if not exists")
    }

    /// Add the "if exists" guard to a DROP TABLE command.
    fn if_table_exists(&self, command: &str, _schema: Option<&str>, _table: &str) -> String {
        format!("{command} if exists")
    }

    /// Add the "if not exists" guard to a CREATE TABLE command.
    fn if_table_not_exists(&self, command: &str, _schema: Option<&str>, _table: &str) -> String {
        format!("{command} if not exists")
    }

    /// Statement run once on the connection before first use.
    fn init_string(&self) -> Option<String> {
        None
    }
}

/// Wrap `ident` in `quote`, doubling any embedded quote characters.
pub fn quote_with(ident: &str, quote: char) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for ch in ident.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}

/// `varchar(n)` when a size is set, else the dialect's unbounded text type.
fn sized_text(max_size: usize, unbounded: &str) -> String {
    if max_size > 0 {
        format!("varchar({max_size})")
    } else {
        unbounded.to_string()
    }
}
