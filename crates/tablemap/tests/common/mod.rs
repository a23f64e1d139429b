#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use tablemap::prelude::*;
use tablemap::{Connection, ExecResult, Row, TransactionHandle};
use tablemap_sqlite::SqliteConnection;

/// Directory for file-backed test databases. In-memory when unset.
pub const SQLITE_DIR_ENV: &str = "TABLEMAP_TEST_SQLITE_PATH";

// ============================================================================
// Records
// ============================================================================

#[derive(Record, Debug, Clone, Default, PartialEq)]
#[db(table = "invoices")]
pub struct Invoice {
    pub id: i64,
    pub created: i64,
    pub updated: i64,
    pub memo: String,
    pub person_id: i64,
    pub is_paid: bool,
    pub version: i64,
}

#[derive(Record, Debug, Clone, Default, PartialEq)]
#[db(table = "people", hooks)]
pub struct Person {
    pub id: i64,
    pub created: i64,
    pub updated: i64,
    #[db("first_name")]
    pub first: String,
    pub last: String,
    pub version: i64,
    #[db("-")]
    pub loaded: bool,
}

impl Hooks for Person {
    fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.created = 100;
        self.updated = 100;
        Ok(())
    }

    fn pre_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.updated += 1;
        Ok(())
    }

    // Deleting a person removes their invoices first.
    fn pre_delete(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        exec.exec(
            r#"delete from "invoices" where "person_id" = ?"#,
            &[Value::BigInt(self.id)],
        )?;
        Ok(())
    }

    fn post_get(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.loaded = true;
        Ok(())
    }
}

#[derive(Record, Debug, Clone, Default, PartialEq)]
pub struct Audit {
    pub created: i64,
    #[db("audit_note")]
    pub note: String,
}

/// Embeds `Audit`; its own `note` replaces the embedded one.
#[derive(Record, Debug, Clone, Default, PartialEq)]
#[db(table = "widgets")]
pub struct Widget {
    pub id: i64,
    #[db(embed)]
    pub audit: Audit,
    #[db("widget_note")]
    pub note: String,
}

#[derive(Record, Debug, Clone, Default, PartialEq)]
#[db(table = "pairs")]
pub struct Pair {
    pub a: i64,
    pub b: i64,
    pub label: String,
}

#[derive(Record, Debug, Clone, Default, PartialEq)]
#[db(table = "tagged")]
pub struct Tagged {
    pub id: i64,
    pub tags: Json<Vec<String>>,
    pub note: Option<String>,
}

/// Not registered; only used as a select target.
#[derive(Record, Debug, Clone, Default, PartialEq)]
pub struct InvoicePersonView {
    pub invoice_id: i64,
    pub memo: String,
    pub first_name: String,
}

// ============================================================================
// Setup
// ============================================================================

fn connection(name: &str) -> SqliteConnection {
    match std::env::var(SQLITE_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let path = std::path::Path::new(dir.trim()).join(format!("{name}.db"));
            let _ = std::fs::remove_file(&path);
            SqliteConnection::open(&path).expect("open sqlite test database")
        }
        _ => SqliteConnection::open_memory().expect("open sqlite memory db"),
    }
}

/// A map with all test tables registered and created.
pub fn sqlite_dbmap(name: &str) -> DbMap {
    let mut dbmap = DbMap::new(connection(name), SqliteDialect::with_foreign_keys());
    dbmap.add_table::<Invoice>().set_keys(true, &["id"]);
    dbmap.add_table::<Person>().set_keys(true, &["id"]);
    dbmap.add_table::<Widget>().set_keys(true, &["id"]);
    dbmap.add_table::<Pair>().set_keys(false, &["a", "b"]);
    dbmap.add_table::<Tagged>().set_keys(false, &["id"]);
    dbmap
        .create_tables_if_not_exists()
        .expect("create test tables");
    dbmap
}

// ============================================================================
// Recording connection
// ============================================================================

/// A statement seen by [`RecordingConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Connection double that records statements and replays canned results.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnection {
    pub log: Arc<Mutex<Vec<Recorded>>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
    pub rows: Vec<Row>,
}

impl RecordingConnection {
    pub fn statements(&self) -> Vec<Recorded> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                sql: sql.to_string(),
                args: args.to_vec(),
            });
    }
}

impl Connection for RecordingConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.record(sql, params);
        Ok(ExecResult {
            rows_affected: self.rows_affected,
            last_insert_id: self.last_insert_id,
        })
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(sql, params);
        Ok(self.rows.clone())
    }

    fn begin(&self) -> Result<Box<dyn TransactionHandle + '_>> {
        self.record("begin", &[]);
        Ok(Box::new(RecordingTransaction { conn: self }))
    }
}

struct RecordingTransaction<'a> {
    conn: &'a RecordingConnection,
}

impl TransactionHandle for RecordingTransaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.conn.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.conn.query(sql, params)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.conn.record("commit", &[]);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.conn.record("rollback", &[]);
        Ok(())
    }
}

/// A single-row result.
pub fn row(columns: &[&str], values: Vec<Value>) -> Row {
    Row::new(
        Arc::new(columns.iter().map(|c| (*c).to_string()).collect()),
        values,
    )
}
