//! Table mapping and statement binding for Rust structs.
//!
//! `tablemap` maps plain structs to database tables and generates the
//! INSERT, UPDATE, DELETE and key-lookup statements for them. It does not
//! build arbitrary queries: reads beyond "get by key" are plain SQL whose
//! result columns are bound to struct fields by name.
//!
//! # Role In The Architecture
//!
//! - **Records**: `#[derive(Record)]` describes a struct's fields and
//!   generates accessors, so no runtime reflection is needed.
//! - **Registry**: [`DbMap`] owns the connection, the [`Dialect`] and one
//!   [`TableMap`] per registered type.
//! - **Plans**: each table caches the SQL for its four CRUD statements and
//!   the order fields are bound in; any metadata change discards the cache.
//! - **Executors**: [`DbMap`] and [`Transaction`] implement [`SqlExecutor`],
//!   so every operation in [`SqlExecutorExt`] works the same inside or
//!   outside a transaction.
//! - **Optimistic locking**: tables with a version column detect stale
//!   updates and deletes and report them as [`OptimisticLockError`].
//!
//! # Example
//!
//! ```ignore
//! use tablemap::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[db(table = "invoices")]
//! struct Invoice {
//!     id: i64,
//!     memo: String,
//!     version: i64,
//! }
//!
//! let mut dbmap = DbMap::new(SqliteConnection::open_memory()?, SqliteDialect::default());
//! dbmap.add_table::<Invoice>().set_keys(true, &["id"]);
//! dbmap.create_tables()?;
//!
//! let mut inv = Invoice { memo: "first".into(), ..Default::default() };
//! dbmap.insert(&mut [&mut inv])?;          // id assigned, version = 1
//! inv.memo = "second".into();
//! dbmap.update(&mut [&mut inv])?;          // version = 2
//! let loaded: Option<Invoice> = dbmap.get(&[inv.id.into()])?;
//! ```

extern crate self as tablemap;

mod bindings;
mod crud;
pub mod dbmap;
pub mod executor;
pub mod record;
pub mod schema;
pub mod table;
pub mod transaction;

pub use dbmap::{DbMap, TypeConverter};
pub use executor::{SqlExecutor, SqlExecutorExt};
pub use record::{FieldColumn, FieldDef, Hooks, Record};
pub use table::{ColumnMap, IndexMap, TableMap};
pub use transaction::Transaction;

pub use tablemap_core::{
    Connection, Error, ExecResult, FieldType, Json, OptimisticLockError, Result, Row, SqlField,
    TransactionHandle, Value, ValueError,
};
pub use tablemap_dialect::{
    AutoIncrStrategy, CrateDialect, Dialect, MySqlDialect, OracleDialect, PostgresDialect,
    SnowflakeDialect, SqliteDialect,
};
pub use tablemap_macros::Record;

/// Everything needed to declare records and run operations.
pub mod prelude {
    pub use crate::{
        ColumnMap, DbMap, Dialect, Error, Hooks, Json, OptimisticLockError, Record, Result,
        SqlExecutor, SqlExecutorExt, TableMap, Transaction, Value,
    };
    pub use tablemap_dialect::{
        CrateDialect, MySqlDialect, OracleDialect, PostgresDialect, SnowflakeDialect,
        SqliteDialect,
    };
}
