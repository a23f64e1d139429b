//! SQLite driver for tablemap.
//!
//! [`SqliteConnection`] implements the tablemap [`Connection`] trait over a
//! bundled SQLite through `rusqlite`. The underlying connection sits behind a
//! mutex; an open transaction holds that mutex until it is committed or
//! rolled back, so statements from other threads wait for it to finish.
//!
//! Running a statement on the same connection from the thread that holds an
//! open transaction, other than through the transaction, deadlocks.

use rusqlite::types::Value as SqlValue;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tablemap_core::{Connection, Error, ExecResult, Result, Row, TransactionHandle, Value};

/// A SQLite database connection.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening SQLite database");
        let conn = rusqlite::Connection::open(path).map_err(Error::driver)?;
        Ok(Self::from_rusqlite(conn))
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        tracing::debug!("Opening in-memory SQLite database");
        let conn = rusqlite::Connection::open_in_memory().map_err(Error::driver)?;
        Ok(Self::from_rusqlite(conn))
    }

    /// Wrap an already configured `rusqlite` connection.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Value mapping
// ============================================================================

fn to_sqlite(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::TinyInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::SmallInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int(v) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(v) | Value::Timestamp(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(f64::from(*v)),
        Value::Double(v) => SqlValue::Real(*v),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

fn from_sqlite(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::BigInt(i),
        SqlValue::Real(f) => Value::Double(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

fn params(values: &[Value]) -> impl rusqlite::Params {
    rusqlite::params_from_iter(values.iter().map(to_sqlite).collect::<Vec<_>>())
}

// ============================================================================
// Statement execution
// ============================================================================

fn execute(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> Result<ExecResult> {
    tracing::trace!(sql, args = args.len(), "sqlite execute");
    let mut stmt = conn.prepare_cached(sql).map_err(Error::driver)?;
    let rows = stmt.execute(params(args)).map_err(Error::driver)?;
    Ok(ExecResult {
        rows_affected: rows as u64,
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}

fn query(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
    tracing::trace!(sql, args = args.len(), "sqlite query");
    let mut stmt = conn.prepare_cached(sql).map_err(Error::driver)?;
    let columns: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    );
    let width = columns.len();

    let mut rows = stmt.query(params(args)).map_err(Error::driver)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(Error::driver)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let value: SqlValue = row.get(i).map_err(Error::driver)?;
            values.push(from_sqlite(value));
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(out)
}

impl Connection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        execute(&self.lock(), sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        query(&self.lock(), sql, params)
    }

    fn begin(&self) -> Result<Box<dyn TransactionHandle + '_>> {
        let guard = self.lock();
        guard.execute_batch("begin").map_err(Error::driver)?;
        Ok(Box::new(SqliteTransaction { guard }))
    }
}

/// An open SQLite transaction holding the connection lock.
struct SqliteTransaction<'a> {
    guard: MutexGuard<'a, rusqlite::Connection>,
}

impl TransactionHandle for SqliteTransaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        execute(&self.guard, sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        query(&self.guard, sql, params)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let Err(err) = self.guard.execute_batch("commit") else {
            return Ok(());
        };
        // A failed COMMIT (deferred constraint, busy database) leaves the
        // transaction open; close it so the connection stays usable.
        if !self.guard.is_autocommit() {
            if let Err(rollback_err) = self.guard.execute_batch("rollback") {
                tracing::warn!(error = %rollback_err, "Rollback after failed commit failed");
            }
        }
        Err(Error::driver(err))
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.guard.execute_batch("rollback").map_err(Error::driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute(
            "create table t (id integer primary key autoincrement, name text, score real, data blob)",
            &[],
        )
        .unwrap();
        conn
    }

    #[test]
    fn insert_reports_rowid() {
        let conn = memory();
        let first = conn
            .execute("insert into t (name) values (?)", &[Value::from("a")])
            .unwrap();
        let second = conn
            .execute("insert into t (name) values (?)", &[Value::from("b")])
            .unwrap();
        assert_eq!(first.rows_affected, 1);
        assert_eq!(first.last_insert_id, Some(1));
        assert_eq!(second.last_insert_id, Some(2));
    }

    #[test]
    fn query_maps_storage_classes() {
        let conn = memory();
        conn.execute(
            "insert into t (name, score, data) values (?, ?, ?)",
            &[
                Value::from("x"),
                Value::Double(1.5),
                Value::Bytes(vec![1, 2]),
            ],
        )
        .unwrap();
        conn.execute("insert into t (name) values (null)", &[])
            .unwrap();

        let rows = conn
            .query("select id, name, score, data from t order by id", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), ["id", "name", "score", "data"]);
        assert_eq!(rows[0].get(0), Some(&Value::BigInt(1)));
        assert_eq!(rows[0].get(1), Some(&Value::Text("x".to_string())));
        assert_eq!(rows[0].get(2), Some(&Value::Double(1.5)));
        assert_eq!(rows[0].get(3), Some(&Value::Bytes(vec![1, 2])));
        assert_eq!(rows[1].get(1), Some(&Value::Null));
    }

    #[test]
    fn bool_and_json_are_stored_as_sqlite_types() {
        assert_eq!(to_sqlite(&Value::Bool(true)), SqlValue::Integer(1));
        assert_eq!(
            to_sqlite(&Value::Json(serde_json::json!({"a": 1}))),
            SqlValue::Text(r#"{"a":1}"#.to_string())
        );
        assert_eq!(to_sqlite(&Value::Timestamp(42)), SqlValue::Integer(42));
    }

    #[test]
    fn rollback_discards_and_commit_keeps() {
        let conn = memory();

        let tx = conn.begin().unwrap();
        tx.execute("insert into t (name) values ('gone')", &[])
            .unwrap();
        tx.rollback().unwrap();

        let tx = conn.begin().unwrap();
        tx.execute("insert into t (name) values ('kept')", &[])
            .unwrap();
        assert_eq!(tx.query("select name from t", &[]).unwrap().len(), 1);
        tx.commit().unwrap();

        let rows = conn.query("select name from t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some(&Value::Text("kept".to_string())));
    }

    #[test]
    fn failed_commit_rolls_back_and_frees_connection() {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute("pragma foreign_keys = on", &[]).unwrap();
        conn.execute("create table parent (id integer primary key)", &[])
            .unwrap();
        conn.execute(
            "create table child (id integer primary key, parent_id integer \
             references parent(id) deferrable initially deferred)",
            &[],
        )
        .unwrap();

        let tx = conn.begin().unwrap();
        tx.execute("insert into child (id, parent_id) values (1, 99)", &[])
            .unwrap();
        assert!(matches!(tx.commit(), Err(Error::Driver(_))));

        let tx = conn.begin().expect("begin after failed commit");
        tx.rollback().unwrap();
        assert!(conn.query("select id from child", &[]).unwrap().is_empty());
    }

    #[test]
    fn driver_errors_are_wrapped() {
        let conn = memory();
        let err = conn.execute("insert into missing values (1)", &[]).unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
    }
}
