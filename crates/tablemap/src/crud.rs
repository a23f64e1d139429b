//! CRUD engine.
//!
//! Every operation takes the executor as `&dyn SqlExecutor`, which is what
//! lets the same code run against a plain map or an open transaction and
//! what hooks receive for cascading statements.

use crate::bindings::{self, BindInstance};
use crate::executor::SqlExecutor;
use crate::record::Record;
use crate::table::{self, ColumnMap, TableMap};
use tablemap_core::{Error, OptimisticLockError, Result, SqlField, Value};
use tablemap_dialect::AutoIncrStrategy;

// ============================================================================
// Write operations
// ============================================================================

#[tracing::instrument(level = "debug", skip(exec, records), fields(count = records.len()))]
pub(crate) fn insert(exec: &dyn SqlExecutor, records: &mut [&mut dyn Record]) -> Result<()> {
    let dbmap = exec.dbmap();
    let dialect = dbmap.dialect();
    let converter = dbmap.type_converter();

    for record in records.iter_mut() {
        let record: &mut dyn Record = &mut **record;
        let table = dbmap.table_for_record(record);

        record.pre_insert(exec)?;

        let plan = table.insert_plan(dialect);
        let bound = plan.bind(table, record, converter)?;

        match plan.auto_incr() {
            Some(idx) => {
                let col = &table.columns()[idx];
                let generated = match dialect.auto_incr_strategy() {
                    AutoIncrStrategy::Returning => exec
                        .query_row(&bound.query, &bound.args)?
                        .and_then(|row| row.into_values().into_iter().next()),
                    AutoIncrStrategy::LastInsertId => exec
                        .exec(&bound.query, &bound.args)?
                        .last_insert_id
                        .map(Value::BigInt),
                    AutoIncrStrategy::NotReported => {
                        exec.exec(&bound.query, &bound.args)?;
                        None
                    }
                };
                if let Some(id) = generated {
                    tracing::debug!(table = table.table_name(), id = %id, "Generated key");
                    let id = bindings::from_db(converter, col, id)?;
                    record.set_field_value(col.field_path(), id)?;
                }
            }
            None => {
                exec.exec(&bound.query, &bound.args)?;
            }
        }

        record.post_insert(exec)?;
    }
    Ok(())
}

#[tracing::instrument(level = "debug", skip(exec, records, filter), fields(count = records.len()))]
pub(crate) fn update(
    exec: &dyn SqlExecutor,
    records: &mut [&mut dyn Record],
    filter: Option<&dyn Fn(&ColumnMap) -> bool>,
) -> Result<u64> {
    let dbmap = exec.dbmap();
    let dialect = dbmap.dialect();
    let converter = dbmap.type_converter();
    let mut total = 0;

    for record in records.iter_mut() {
        let record: &mut dyn Record = &mut **record;
        let table = dbmap.table_for_record(record);
        table.require_keys()?;

        record.pre_update(exec)?;

        let bound = match filter {
            None => table.update_plan(dialect).bind(table, record, converter)?,
            Some(filter) => {
                bindings::build_update(table, dialect, filter).bind(table, record, converter)?
            }
        };
        // A table made only of key columns has nothing to update.
        let rows = if bound.query.is_empty() {
            0
        } else {
            exec.exec(&bound.query, &bound.args)?.rows_affected
        };

        if rows == 0 && table.version().is_some() && bound.existing_version > 0 {
            return Err(lock_error(exec, table, &bound)?);
        }
        if let Some(col) = table.version() {
            record.set_field_value(col.field_path(), Value::BigInt(bound.existing_version + 1))?;
        }

        total += rows;
        record.post_update(exec)?;
    }
    Ok(total)
}

#[tracing::instrument(level = "debug", skip(exec, records), fields(count = records.len()))]
pub(crate) fn delete(exec: &dyn SqlExecutor, records: &mut [&mut dyn Record]) -> Result<u64> {
    let dbmap = exec.dbmap();
    let dialect = dbmap.dialect();
    let converter = dbmap.type_converter();
    let mut total = 0;

    for record in records.iter_mut() {
        let record: &mut dyn Record = &mut **record;
        let table = dbmap.table_for_record(record);
        table.require_keys()?;

        record.pre_delete(exec)?;

        let bound = table.delete_plan(dialect).bind(table, record, converter)?;
        let rows = exec.exec(&bound.query, &bound.args)?.rows_affected;

        if rows == 0 && table.version().is_some() && bound.existing_version > 0 {
            return Err(lock_error(exec, table, &bound)?);
        }

        total += rows;
        record.post_delete(exec)?;
    }
    Ok(total)
}

/// Classify a version mismatch by looking the row up again.
fn lock_error(exec: &dyn SqlExecutor, table: &TableMap, bound: &BindInstance) -> Result<Error> {
    let plan = table.get_plan(exec.dbmap().dialect());
    let row_exists = exec.query_row(plan.query(), &bound.keys)?.is_some();
    tracing::debug!(
        table = table.table_name(),
        row_exists,
        version = bound.existing_version,
        "Optimistic lock conflict"
    );
    Ok(OptimisticLockError {
        table_name: table.table_name().to_string(),
        keys: bound.keys.clone(),
        row_exists,
        local_version: bound.existing_version,
    }
    .into())
}

// ============================================================================
// Read operations
// ============================================================================

#[tracing::instrument(level = "debug", skip(exec, keys), fields(record = std::any::type_name::<R>()))]
pub(crate) fn get<R: Record>(exec: &dyn SqlExecutor, keys: &[Value]) -> Result<Option<R>> {
    let dbmap = exec.dbmap();
    let table = dbmap.table_for::<R>();
    table.require_keys()?;

    let plan = table.get_plan(dbmap.dialect());
    let Some(row) = exec.query_row(plan.query(), keys)? else {
        return Ok(None);
    };

    let converter = dbmap.type_converter();
    let mut record = R::new_record();
    let mut values = row.into_values().into_iter();
    for &idx in plan.select_columns() {
        let col = &table.columns()[idx];
        let value = values.next().unwrap_or(Value::Null);
        record.set_field_value(col.field_path(), bindings::from_db(converter, col, value)?)?;
    }

    record.post_get(exec)?;
    Ok(Some(record))
}

/// Where one result column is written on the target record.
struct ScanTarget {
    path: String,
    column: Option<usize>,
}

/// Match result columns to record fields.
///
/// Column names are tried before field names and exact matches before
/// case-insensitive ones. Converters only apply when `R` is a registered table.
fn resolve_columns<R: Record>(
    table: Option<&TableMap>,
    names: &[String],
    query: &str,
) -> Result<Vec<ScanTarget>> {
    let described;
    let columns: &[ColumnMap] = match table {
        Some(t) => t.columns(),
        None => {
            described = table::build_columns(&R::describe());
            &described
        }
    };

    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let find = |pred: &dyn Fn(&ColumnMap) -> bool| {
            columns.iter().position(|c| !c.is_transient() && pred(c))
        };
        let found = find(&|c: &ColumnMap| c.column_name() == name.as_str())
            .or_else(|| find(&|c: &ColumnMap| c.field_name() == name.as_str()))
            .or_else(|| find(&|c: &ColumnMap| c.column_name().eq_ignore_ascii_case(name)))
            .or_else(|| find(&|c: &ColumnMap| c.field_name().eq_ignore_ascii_case(name)));

        let Some(idx) = found else {
            return Err(Error::UnmappedColumn {
                column: name.clone(),
                type_name: std::any::type_name::<R>(),
                query: query.to_string(),
            });
        };
        targets.push(ScanTarget {
            path: columns[idx].field_path().to_string(),
            column: table.map(|_| idx),
        });
    }
    Ok(targets)
}

#[tracing::instrument(level = "debug", skip(exec, out, args), fields(record = std::any::type_name::<R>()))]
pub(crate) fn select_into<R: Record>(
    exec: &dyn SqlExecutor,
    out: &mut Vec<R>,
    query: &str,
    args: &[Value],
) -> Result<()> {
    let dbmap = exec.dbmap();
    let rows = exec.query(query, args)?;
    let Some(first) = rows.first() else {
        return Ok(());
    };

    let table = dbmap.try_table_for::<R>();
    let targets = resolve_columns::<R>(table, first.columns(), query)?;
    let converter = dbmap.type_converter();

    out.reserve(rows.len());
    for row in rows {
        let mut record = R::new_record();
        for (target, value) in targets.iter().zip(row.into_values()) {
            let value = match (table, target.column) {
                (Some(table), Some(idx)) => {
                    bindings::from_db(converter, &table.columns()[idx], value)?
                }
                _ => value,
            };
            record.set_field_value(&target.path, value)?;
        }
        record.post_get(exec)?;
        out.push(record);
    }
    Ok(())
}

pub(crate) fn select_one<R: Record>(
    exec: &dyn SqlExecutor,
    query: &str,
    args: &[Value],
) -> Result<Option<R>> {
    let mut out: Vec<R> = Vec::new();
    select_into(exec, &mut out, query, args)?;
    if out.len() > 1 {
        return Err(Error::MultipleRows {
            query: query.to_string(),
        });
    }
    Ok(out.pop())
}

/// First column of the first row, or `T::default()` when nothing matched.
pub(crate) fn select_val<T: SqlField + Default>(
    exec: &dyn SqlExecutor,
    query: &str,
    args: &[Value],
) -> Result<T> {
    let Some(row) = exec.query_row(query, args)? else {
        return Ok(T::default());
    };
    let column = row.columns().first().cloned().unwrap_or_default();
    let value = row.into_values().into_iter().next().unwrap_or(Value::Null);
    T::from_value(value).map_err(|source| Error::Field {
        field: column,
        source,
    })
}
