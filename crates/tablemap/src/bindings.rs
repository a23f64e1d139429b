//! Statement binding plans.
//!
//! A [`BindPlan`] is the SQL text of one CRUD statement plus the order in
//! which record fields are bound to its placeholders. Plans are built from a
//! [`TableMap`] and a [`Dialect`] and cached on the table; binding a plan
//! against a record yields a [`BindInstance`] ready to execute.

use crate::dbmap::TypeConverter;
use crate::record::Record;
use crate::table::{ColumnMap, TableMap};
use tablemap_core::{Result, Value};
use tablemap_dialect::Dialect;

/// Source of one bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindArg {
    /// The current value of the column at this index.
    Field(usize),
    /// The record's version plus one.
    NextVersion,
    /// The record's version as loaded.
    ExistingVersion,
}

/// Cached SQL and argument layout for one operation on one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPlan {
    query: String,
    args: Vec<BindArg>,
    auto_incr: Option<usize>,
    select_columns: Vec<usize>,
}

/// A plan bound to a concrete record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BindInstance {
    pub query: String,
    pub args: Vec<Value>,
    pub keys: Vec<Value>,
    pub existing_version: i64,
}

impl BindPlan {
    /// Generated SQL text.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub(crate) fn auto_incr(&self) -> Option<usize> {
        self.auto_incr
    }

    /// Columns returned by a get plan, in SELECT order.
    pub(crate) fn select_columns(&self) -> &[usize] {
        &self.select_columns
    }

    /// Resolve the plan's arguments against `record`.
    ///
    /// When the record's version is still zero, the next version (1) is
    /// written back before the statement runs so that memory and the row agree.
    pub(crate) fn bind(
        &self,
        table: &TableMap,
        record: &mut dyn Record,
        converter: Option<&dyn TypeConverter>,
    ) -> Result<BindInstance> {
        let existing_version = match table.version() {
            Some(col) => record.field_value(col.field_path())?.as_i64().unwrap_or(0),
            None => 0,
        };

        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let value = match *arg {
                BindArg::Field(idx) => {
                    let col = &table.columns()[idx];
                    to_db(converter, col, record.field_value(col.field_path())?)?
                }
                BindArg::NextVersion => {
                    let next = existing_version + 1;
                    if existing_version == 0 {
                        if let Some(col) = table.version() {
                            record.set_field_value(col.field_path(), Value::BigInt(next))?;
                        }
                    }
                    Value::BigInt(next)
                }
                BindArg::ExistingVersion => Value::BigInt(existing_version),
            };
            args.push(value);
        }

        let mut keys = Vec::with_capacity(table.key_indices().len());
        for col in table.keys() {
            keys.push(to_db(converter, col, record.field_value(col.field_path())?)?);
        }

        Ok(BindInstance {
            query: self.query.clone(),
            args,
            keys,
            existing_version,
        })
    }
}

pub(crate) fn to_db(
    converter: Option<&dyn TypeConverter>,
    column: &ColumnMap,
    value: Value,
) -> Result<Value> {
    match converter {
        Some(conv) => conv.to_db(column, value),
        None => Ok(value),
    }
}

pub(crate) fn from_db(
    converter: Option<&dyn TypeConverter>,
    column: &ColumnMap,
    value: Value,
) -> Result<Value> {
    match converter {
        Some(conv) => conv.from_db(column, value),
        None => Ok(value),
    }
}

// ============================================================================
// Plan builders
// ============================================================================

fn quoted_table(table: &TableMap, dialect: &dyn Dialect) -> String {
    dialect.quoted_table_for_query(table.schema_name(), table.table_name())
}

fn is_version(table: &TableMap, idx: usize) -> bool {
    table.version_index() == Some(idx)
}

/// `"k1"=?1 and "k2"=?2 [and "version"=?n]`, continuing placeholder numbering at `next`.
fn key_predicate(
    table: &TableMap,
    dialect: &dyn Dialect,
    next: &mut usize,
    args: &mut Vec<BindArg>,
    with_version: bool,
) -> String {
    let mut clauses = Vec::new();
    for &idx in table.key_indices() {
        let col = &table.columns()[idx];
        clauses.push(format!(
            "{}={}",
            dialect.quote_field(col.column_name()),
            dialect.bind_var(*next)
        ));
        args.push(BindArg::Field(idx));
        *next += 1;
    }
    if with_version {
        if let Some(col) = table.version() {
            clauses.push(format!(
                "{}={}",
                dialect.quote_field(col.column_name()),
                dialect.bind_var(*next)
            ));
            args.push(BindArg::ExistingVersion);
            *next += 1;
        }
    }
    clauses.join(" and ")
}

pub(crate) fn build_insert(table: &TableMap, dialect: &dyn Dialect) -> BindPlan {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    let mut args = Vec::new();
    let mut auto_incr = None;
    let mut next = 0;

    for (idx, col) in table.columns().iter().enumerate() {
        if col.is_transient() {
            continue;
        }
        if col.is_auto_increment() {
            auto_incr = Some(idx);
            let bind_value = dialect.auto_incr_bind_value();
            if !bind_value.is_empty() {
                columns.push(dialect.quote_field(col.column_name()));
                values.push(bind_value.to_string());
            }
            continue;
        }
        columns.push(dialect.quote_field(col.column_name()));
        values.push(dialect.bind_var(next));
        next += 1;
        args.push(if is_version(table, idx) {
            BindArg::NextVersion
        } else {
            BindArg::Field(idx)
        });
    }

    let mut query = format!(
        "insert into {} ({}) values ({})",
        quoted_table(table, dialect),
        columns.join(","),
        values.join(",")
    );
    if let Some(idx) = auto_incr {
        query.push_str(&dialect.auto_incr_insert_suffix(table.columns()[idx].column_name()));
    }
    query.push_str(dialect.query_suffix());

    tracing::debug!(table = table.table_name(), sql = %query, "Built insert plan");
    BindPlan {
        query,
        args,
        auto_incr,
        select_columns: Vec::new(),
    }
}

/// Build an update plan restricted to columns accepted by `filter`.
///
/// Key columns are never set. The version column is always set, even when the
/// filter rejects it, so optimistic locking keeps working on partial updates.
/// When no column is left to set, the plan's query is empty and callers skip
/// the statement.
pub(crate) fn build_update(
    table: &TableMap,
    dialect: &dyn Dialect,
    filter: &dyn Fn(&ColumnMap) -> bool,
) -> BindPlan {
    let mut sets = Vec::new();
    let mut args = Vec::new();
    let mut next = 0;

    for (idx, col) in table.columns().iter().enumerate() {
        if col.is_transient() || col.is_primary_key() {
            continue;
        }
        let version = is_version(table, idx);
        if !version && !filter(col) {
            continue;
        }
        sets.push(format!(
            "{}={}",
            dialect.quote_field(col.column_name()),
            dialect.bind_var(next)
        ));
        next += 1;
        args.push(if version {
            BindArg::NextVersion
        } else {
            BindArg::Field(idx)
        });
    }

    // Every column is a key: there is nothing to set.
    if sets.is_empty() {
        tracing::debug!(table = table.table_name(), "Update plan has no columns to set");
        return BindPlan {
            query: String::new(),
            args: Vec::new(),
            auto_incr: None,
            select_columns: Vec::new(),
        };
    }

    let predicate = key_predicate(table, dialect, &mut next, &mut args, true);
    let query = format!(
        "update {} set {} where {}{}",
        quoted_table(table, dialect),
        sets.join(", "),
        predicate,
        dialect.query_suffix()
    );

    tracing::debug!(table = table.table_name(), sql = %query, "Built update plan");
    BindPlan {
        query,
        args,
        auto_incr: None,
        select_columns: Vec::new(),
    }
}

pub(crate) fn build_delete(table: &TableMap, dialect: &dyn Dialect) -> BindPlan {
    let mut args = Vec::new();
    let mut next = 0;
    let predicate = key_predicate(table, dialect, &mut next, &mut args, true);
    let query = format!(
        "delete from {} where {}{}",
        quoted_table(table, dialect),
        predicate,
        dialect.query_suffix()
    );

    tracing::debug!(table = table.table_name(), sql = %query, "Built delete plan");
    BindPlan {
        query,
        args,
        auto_incr: None,
        select_columns: Vec::new(),
    }
}

pub(crate) fn build_get(table: &TableMap, dialect: &dyn Dialect) -> BindPlan {
    let mut columns = Vec::new();
    let mut select_columns = Vec::new();
    for (idx, col) in table.columns().iter().enumerate() {
        if !col.is_transient() {
            columns.push(dialect.quote_field(col.column_name()));
            select_columns.push(idx);
        }
    }

    let mut args = Vec::new();
    let mut next = 0;
    let predicate = key_predicate(table, dialect, &mut next, &mut args, false);
    let query = format!(
        "select {} from {} where {}{}",
        columns.join(","),
        quoted_table(table, dialect),
        predicate,
        dialect.query_suffix()
    );

    tracing::debug!(table = table.table_name(), sql = %query, "Built get plan");
    BindPlan {
        query,
        args,
        auto_incr: None,
        select_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldColumn, FieldDef};
    use std::any::TypeId;
    use tablemap_core::FieldType;
    use tablemap_dialect::{CrateDialect, PostgresDialect, SqliteDialect};

    fn invoice_table() -> TableMap {
        let defs = vec![
            FieldDef::Column(FieldColumn::new("id", FieldType::Int64)),
            FieldDef::Column(FieldColumn::new("memo", FieldType::Text)),
            FieldDef::Column(FieldColumn::new("version", FieldType::Int64)),
            FieldDef::Transient { name: "scratch" },
        ];
        let mut table = TableMap::new(TypeId::of::<()>(), "Invoice", "invoices", None, &defs);
        table.set_keys(true, &["id"]);
        table
    }

    #[test]
    fn sqlite_insert_uses_null_for_auto_increment() {
        let plan = build_insert(&invoice_table(), &SqliteDialect::default());
        assert_eq!(
            plan.query(),
            r#"insert into "invoices" ("id","memo","version") values (null,?,?);"#
        );
        assert_eq!(plan.args, [BindArg::Field(1), BindArg::NextVersion]);
        assert_eq!(plan.auto_incr(), Some(0));
    }

    #[test]
    fn postgres_insert_returns_generated_key() {
        let plan = build_insert(&invoice_table(), &PostgresDialect::default());
        assert_eq!(
            plan.query(),
            r#"insert into "invoices" ("id","memo","version") values (default,$1,$2) returning "id";"#
        );
    }

    #[test]
    fn empty_bind_value_omits_auto_increment_column() {
        let plan = build_insert(&invoice_table(), &CrateDialect::default());
        assert_eq!(
            plan.query(),
            r#"insert into "invoices" ("memo","version") values (?,?);"#
        );
    }

    #[test]
    fn update_sets_non_keys_and_checks_version() {
        let plan = build_update(&invoice_table(), &PostgresDialect::default(), &|_: &ColumnMap| true);
        assert_eq!(
            plan.query(),
            r#"update "invoices" set "memo"=$1, "version"=$2 where "id"=$3 and "version"=$4;"#
        );
        assert_eq!(
            plan.args,
            [
                BindArg::Field(1),
                BindArg::NextVersion,
                BindArg::Field(0),
                BindArg::ExistingVersion
            ]
        );
    }

    #[test]
    fn filtered_update_keeps_version() {
        let plan = build_update(&invoice_table(), &SqliteDialect::default(), &|c: &ColumnMap| {
            c.column_name() != "memo"
        });
        assert_eq!(
            plan.query(),
            r#"update "invoices" set "version"=? where "id"=? and "version"=?;"#
        );
    }

    #[test]
    fn update_of_key_only_table_is_empty() {
        let defs = vec![
            FieldDef::Column(FieldColumn::new("a", FieldType::Int64)),
            FieldDef::Column(FieldColumn::new("b", FieldType::Int64)),
        ];
        let mut table = TableMap::new(TypeId::of::<()>(), "Link", "links", None, &defs);
        table.set_keys(false, &["a", "b"]);

        let plan = build_update(&table, &SqliteDialect::default(), &|_: &ColumnMap| true);
        assert_eq!(plan.query(), "");
        assert!(plan.args.is_empty());
    }

    #[test]
    fn delete_and_get_use_key_order() {
        let mut table = invoice_table();
        table.set_keys(false, &["memo", "id"]);
        table.clear_version_col();

        let delete = build_delete(&table, &PostgresDialect::default());
        assert_eq!(
            delete.query(),
            r#"delete from "invoices" where "memo"=$1 and "id"=$2;"#
        );

        let get = build_get(&table, &PostgresDialect::default());
        assert_eq!(
            get.query(),
            r#"select "id","memo","version" from "invoices" where "memo"=$1 and "id"=$2;"#
        );
        assert_eq!(get.select_columns(), [0, 1, 2]);
    }

    #[test]
    fn schema_qualifies_table() {
        let defs = vec![FieldDef::Column(FieldColumn::new("id", FieldType::Int64))];
        let mut table = TableMap::new(
            TypeId::of::<()>(),
            "Invoice",
            "invoices",
            Some("billing".to_string()),
            &defs,
        );
        table.set_keys(false, &["id"]);
        let plan = build_get(&table, &PostgresDialect::default());
        assert_eq!(
            plan.query(),
            r#"select "id" from billing."invoices" where "id"=$1;"#
        );
    }

    #[test]
    fn plans_are_cached_until_metadata_changes() {
        let mut table = invoice_table();
        let dialect = SqliteDialect::default();
        let first = table.update_plan(&dialect).query().to_string();
        let _ = table.get_plan(&dialect);
        assert_eq!(table.cached_plan_count(), 2);

        table.col_map_mut("memo").rename("note");
        assert_eq!(table.cached_plan_count(), 0);
        let second = table.update_plan(&dialect).query().to_string();
        assert_ne!(first, second);
        assert!(second.contains(r#""note"=?"#));
    }
}
