//! DDL helpers: create, drop and truncate registered tables, and manage
//! their secondary indexes.

use crate::dbmap::DbMap;
use crate::executor::SqlExecutor;
use crate::record::Record;
use crate::table::{IndexMap, TableMap};
use tablemap_core::{Error, Result};
use tablemap_dialect::Dialect;

/// Statements creating `table`: an optional CREATE SCHEMA, then CREATE TABLE.
pub fn create_table_statements(
    table: &TableMap,
    dialect: &dyn Dialect,
    if_not_exists: bool,
) -> Vec<String> {
    let mut statements = Vec::with_capacity(2);

    let schema = table
        .schema_name()
        .map(str::trim)
        .filter(|s| !s.is_empty() && dialect.supports_schemas());
    if let Some(schema) = schema {
        let command = if if_not_exists {
            dialect.if_schema_not_exists("create schema", schema)
        } else {
            "create schema".to_string()
        };
        statements.push(format!("{command} {schema}{}", dialect.query_suffix()));
    }

    let command = if if_not_exists {
        dialect.if_table_not_exists("create table", table.schema_name(), table.table_name())
    } else {
        "create table".to_string()
    };

    let single_key = table.key_indices().len() == 1;
    let mut defs = Vec::new();
    for col in table.columns().iter().filter(|c| !c.is_transient()) {
        let mut def = format!(
            "{} {}",
            dialect.quote_field(col.column_name()),
            dialect.to_sql_type(col.field_type(), col.max_size(), col.is_auto_increment())
        );
        if col.is_primary_key() || col.is_not_null() {
            def.push_str(" not null");
        }
        if col.is_primary_key() && single_key {
            def.push_str(" primary key");
        }
        if col.is_unique() {
            def.push_str(" unique");
        }
        if col.is_auto_increment() && !dialect.auto_incr_str().is_empty() {
            def.push(' ');
            def.push_str(dialect.auto_incr_str());
        }
        defs.push(def);
    }

    if table.key_indices().len() > 1 {
        let keys: Vec<_> = table
            .keys()
            .map(|c| dialect.quote_field(c.column_name()))
            .collect();
        defs.push(format!("primary key ({})", keys.join(", ")));
    }
    for group in table.unique_together() {
        let cols: Vec<_> = group.iter().map(|c| dialect.quote_field(c)).collect();
        defs.push(format!("unique ({})", cols.join(", ")));
    }

    statements.push(format!(
        "{command} {} ({}){}{}",
        dialect.quoted_table_for_query(table.schema_name(), table.table_name()),
        defs.join(", "),
        dialect.create_table_suffix(),
        dialect.query_suffix()
    ));
    statements
}

fn create_index_statement(table: &TableMap, index: &IndexMap, dialect: &dyn Dialect) -> String {
    let mut sql = String::from("create");
    if index.unique {
        sql.push_str(" unique");
    }
    sql.push_str(&format!(
        " index {} on {}",
        index.index_name,
        dialect.quoted_table_for_query(table.schema_name(), table.table_name())
    ));

    let using = dialect.create_index_suffix();
    let typed = !using.is_empty() && !index.index_type.is_empty();
    if typed && !dialect.index_type_after_columns() {
        sql.push_str(&format!(" {using} {}", index.index_type));
    }
    let cols: Vec<_> = index.columns.iter().map(|c| dialect.quote_field(c)).collect();
    sql.push_str(&format!(" ({})", cols.join(", ")));
    if typed && dialect.index_type_after_columns() {
        sql.push_str(&format!(" {using} {}", index.index_type));
    }
    sql.push_str(dialect.query_suffix());
    sql
}

fn drop_table_statement(table: &TableMap, dialect: &dyn Dialect, if_exists: bool) -> String {
    let command = if if_exists {
        dialect.if_table_exists("drop table", table.schema_name(), table.table_name())
    } else {
        "drop table".to_string()
    };
    format!(
        "{command} {}{}",
        dialect.quoted_table_for_query(table.schema_name(), table.table_name()),
        dialect.query_suffix()
    )
}

impl DbMap {
    /// DDL that would create `table` with this map's dialect.
    pub fn create_table_sql(&self, table: &TableMap, if_not_exists: bool) -> Vec<String> {
        create_table_statements(table, self.dialect(), if_not_exists)
    }

    /// Create every registered table. Fails if any already exists.
    pub fn create_tables(&self) -> Result<()> {
        self.create_all(false)
    }

    /// Create every registered table that does not exist yet.
    pub fn create_tables_if_not_exists(&self) -> Result<()> {
        self.create_all(true)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn create_all(&self, if_not_exists: bool) -> Result<()> {
        for table in self.tables() {
            for sql in self.create_table_sql(table, if_not_exists) {
                self.exec(&sql, &[])?;
            }
            tracing::info!(table = table.table_name(), "Created table");
        }
        Ok(())
    }

    /// Drop every registered table.
    pub fn drop_tables(&self) -> Result<()> {
        self.drop_all(false)
    }

    /// Drop every registered table that exists.
    pub fn drop_tables_if_exists(&self) -> Result<()> {
        self.drop_all(true)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn drop_all(&self, if_exists: bool) -> Result<()> {
        for table in self.tables() {
            self.exec(&drop_table_statement(table, self.dialect(), if_exists), &[])?;
            tracing::info!(table = table.table_name(), "Dropped table");
        }
        Ok(())
    }

    /// Drop the table registered for `R`.
    ///
    /// Unlike CRUD operations, an unregistered type is reported as
    /// [`Error::NotRegistered`] rather than a panic.
    pub fn drop_table<R: Record>(&self) -> Result<()> {
        self.drop_one::<R>(false)
    }

    pub fn drop_table_if_exists<R: Record>(&self) -> Result<()> {
        self.drop_one::<R>(true)
    }

    fn drop_one<R: Record>(&self, if_exists: bool) -> Result<()> {
        let table = self
            .try_table_for::<R>()
            .ok_or(Error::NotRegistered(std::any::type_name::<R>()))?;
        self.exec(&drop_table_statement(table, self.dialect(), if_exists), &[])?;
        Ok(())
    }

    /// Remove all rows from every registered table.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn truncate_tables(&self) -> Result<()> {
        let dialect = self.dialect();
        for table in self.tables() {
            let sql = format!(
                "{} {}{}",
                dialect.truncate_clause(),
                dialect.quoted_table_for_query(table.schema_name(), table.table_name()),
                dialect.query_suffix()
            );
            self.exec(&sql, &[])?;
        }
        Ok(())
    }

    /// Create every index declared with [`TableMap::add_index`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_index(&self) -> Result<()> {
        for table in self.tables() {
            for index in table.indexes() {
                self.exec(&create_index_statement(table, index, self.dialect()), &[])?;
                tracing::info!(
                    table = table.table_name(),
                    index = %index.index_name,
                    "Created index"
                );
            }
        }
        Ok(())
    }

    /// Drop the index `name` of `R`'s table and forget it.
    pub fn drop_index<R: Record>(&mut self, name: &str) -> Result<()> {
        let table = self.table_for::<R>();
        if table.index(name).is_none() {
            return Err(Error::Custom(format!(
                "index {name} not found on table {}",
                table.table_name()
            )));
        }

        let dialect = self.dialect();
        let mut sql = format!("drop index {name}");
        let on = dialect.drop_index_suffix();
        if !on.is_empty() {
            sql.push_str(&format!(
                " {on} {}",
                dialect.quoted_table_for_query(table.schema_name(), table.table_name())
            ));
        }
        sql.push_str(dialect.query_suffix());
        self.exec(&sql, &[])?;

        self.table_for_mut::<R>().remove_index(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldColumn, FieldDef};
    use std::any::TypeId;
    use tablemap_core::FieldType;
    use tablemap_dialect::{MySqlDialect, PostgresDialect, SqliteDialect};

    fn account_table(schema: Option<&str>) -> TableMap {
        let defs = vec![
            FieldDef::Column(FieldColumn::new("id", FieldType::Int64)),
            FieldDef::Column(FieldColumn::new("email", FieldType::Text)),
            FieldDef::Column(FieldColumn::new("region", FieldType::Text)),
            FieldDef::Transient { name: "session" },
        ];
        let mut table = TableMap::new(
            TypeId::of::<()>(),
            "Account",
            "accounts",
            schema.map(str::to_string),
            &defs,
        );
        table.set_keys(true, &["id"]);
        table.col_map_mut("email").set_unique(true).set_max_size(120);
        table
    }

    #[test]
    fn sqlite_create_table() {
        let sql = create_table_statements(&account_table(None), &SqliteDialect::default(), true);
        assert_eq!(
            sql,
            [r#"create table if not exists "accounts" ("id" integer not null primary key autoincrement, "email" varchar(120) unique, "region" varchar(255));"#]
        );
    }

    #[test]
    fn postgres_create_table_with_schema() {
        let sql =
            create_table_statements(&account_table(Some("crm")), &PostgresDialect::default(), true);
        assert_eq!(sql.len(), 2);
        assert_eq!(sql[0], "create schema if not exists crm;");
        assert_eq!(
            sql[1],
            r#"create table if not exists crm."accounts" ("id" bigserial not null primary key, "email" varchar(120) unique, "region" text);"#
        );
    }

    #[test]
    fn sqlite_ignores_schema() {
        let sql =
            create_table_statements(&account_table(Some("crm")), &SqliteDialect::default(), false);
        assert_eq!(sql.len(), 1);
        assert!(sql[0].starts_with(r#"create table "accounts" ("#));
    }

    #[test]
    fn compound_key_and_unique_groups() {
        let mut table = account_table(None);
        table.set_keys(false, &["region", "id"]);
        table.set_unique_together(&["email", "region"]);
        let sql = create_table_statements(&table, &MySqlDialect::default(), false);
        assert_eq!(
            sql,
            ["create table `accounts` (`id` bigint not null, `email` varchar(120) unique, `region` varchar(255) not null, primary key (`region`, `id`), unique (`email`, `region`)) engine=InnoDB charset=UTF8;"]
        );
    }

    #[test]
    fn index_type_placement_follows_dialect() {
        let mut table = account_table(None);
        table
            .add_index("idx_accounts_email", "btree", &["email"])
            .set_unique(true);
        let index = &table.indexes()[0];

        assert_eq!(
            create_index_statement(&table, index, &PostgresDialect::default()),
            r#"create unique index idx_accounts_email on "accounts" using btree ("email");"#
        );
        assert_eq!(
            create_index_statement(&table, index, &MySqlDialect::default()),
            "create unique index idx_accounts_email on `accounts` (`email`) using btree;"
        );
        assert_eq!(
            create_index_statement(&table, index, &SqliteDialect::default()),
            r#"create unique index idx_accounts_email on "accounts" ("email");"#
        );
    }

    #[test]
    fn drop_statement_guards() {
        let table = account_table(None);
        assert_eq!(
            drop_table_statement(&table, &SqliteDialect::default(), true),
            r#"drop table if exists "accounts";"#
        );
        assert_eq!(
            drop_table_statement(&table, &SqliteDialect::default(), false),
            r#"drop table "accounts";"#
        );
    }
}
