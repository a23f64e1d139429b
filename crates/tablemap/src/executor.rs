//! The executor surface shared by [`DbMap`] and [`Transaction`].
//!
//! [`SqlExecutor`] is the object-safe core: raw statement execution plus
//! access to the owning map. Every CRUD operation lives on
//! [`SqlExecutorExt`], which is implemented for every executor including
//! `dyn SqlExecutor`, so hooks can issue cascading operations through the
//! executor they receive.
//!
//! [`Transaction`]: crate::Transaction

use crate::crud;
use crate::dbmap::DbMap;
use crate::record::Record;
use crate::table::ColumnMap;
use tablemap_core::{ExecResult, Result, Row, Value};

/// Raw statement execution bound to a [`DbMap`].
pub trait SqlExecutor {
    /// Map holding table metadata and the dialect.
    fn dbmap(&self) -> &DbMap;

    /// Execute a statement that returns no rows.
    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult>;

    /// Run a query and collect all rows.
    fn query(&self, query: &str, args: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return the first row, if any.
    fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>>;

    /// This executor as a trait object, for passing to hooks.
    fn as_executor(&self) -> &dyn SqlExecutor;
}

/// CRUD operations available on every [`SqlExecutor`].
pub trait SqlExecutorExt: SqlExecutor {
    /// Insert each record in order.
    ///
    /// Generated keys and the initial version are written back into the
    /// records. Stops at the first failure; earlier records stay inserted
    /// unless the call runs inside a transaction.
    fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        crud::insert(self.as_executor(), records)
    }

    /// Update each record by key and return the total rows affected.
    ///
    /// On tables with a version column a stale record fails with
    /// [`Error::OptimisticLock`](tablemap_core::Error::OptimisticLock).
    fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        crud::update(self.as_executor(), records, None)
    }

    /// Update only the columns accepted by `filter` (plus the version column).
    fn update_columns(
        &self,
        filter: &dyn Fn(&ColumnMap) -> bool,
        records: &mut [&mut dyn Record],
    ) -> Result<u64> {
        crud::update(self.as_executor(), records, Some(filter))
    }

    /// Delete each record by key and return the total rows affected.
    fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        crud::delete(self.as_executor(), records)
    }

    /// Load a record by key values given in key order.
    ///
    /// Returns `Ok(None)` when no row matches.
    fn get<R: Record>(&self, keys: &[Value]) -> Result<Option<R>> {
        crud::get(self.as_executor(), keys)
    }

    /// Run an arbitrary query and map each row to a new `R`.
    fn select<R: Record>(&self, query: &str, args: &[Value]) -> Result<Vec<R>> {
        let mut out = Vec::new();
        crud::select_into(self.as_executor(), &mut out, query, args)?;
        Ok(out)
    }

    /// Run an arbitrary query and append the mapped rows to `out`.
    fn select_into<R: Record>(&self, out: &mut Vec<R>, query: &str, args: &[Value]) -> Result<()> {
        crud::select_into(self.as_executor(), out, query, args)
    }

    /// Run a query expected to match at most one row.
    fn select_one<R: Record>(&self, query: &str, args: &[Value]) -> Result<Option<R>> {
        crud::select_one(self.as_executor(), query, args)
    }

    /// First column of the first row as an integer; zero when no row matches.
    fn select_int(&self, query: &str, args: &[Value]) -> Result<i64> {
        crud::select_val(self.as_executor(), query, args)
    }

    fn select_null_int(&self, query: &str, args: &[Value]) -> Result<Option<i64>> {
        crud::select_val(self.as_executor(), query, args)
    }

    fn select_float(&self, query: &str, args: &[Value]) -> Result<f64> {
        crud::select_val(self.as_executor(), query, args)
    }

    fn select_null_float(&self, query: &str, args: &[Value]) -> Result<Option<f64>> {
        crud::select_val(self.as_executor(), query, args)
    }

    fn select_str(&self, query: &str, args: &[Value]) -> Result<String> {
        crud::select_val(self.as_executor(), query, args)
    }

    fn select_null_str(&self, query: &str, args: &[Value]) -> Result<Option<String>> {
        crud::select_val(self.as_executor(), query, args)
    }
}

impl<E: SqlExecutor + ?Sized> SqlExecutorExt for E {}
