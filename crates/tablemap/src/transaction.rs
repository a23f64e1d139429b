//! Transaction-scoped executor.

use crate::dbmap::DbMap;
use crate::executor::SqlExecutor;
use std::fmt;
use tablemap_core::{Error, ExecResult, Result, Row, TransactionHandle, Value};

/// An open transaction.
///
/// Offers the same operations as [`DbMap`] through
/// [`SqlExecutorExt`](crate::SqlExecutorExt). Once committed or rolled back,
/// a second `commit`/`rollback` returns [`Error::TransactionFinished`], as do
/// any further statements. Dropping an unfinished transaction rolls it back.
pub struct Transaction<'a> {
    dbmap: &'a DbMap,
    handle: Option<Box<dyn TransactionHandle + 'a>>,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(dbmap: &'a DbMap, handle: Box<dyn TransactionHandle + 'a>) -> Self {
        Self {
            dbmap,
            handle: Some(handle),
        }
    }

    /// Whether `commit` or `rollback` has already run.
    pub fn is_finished(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> Result<&(dyn TransactionHandle + 'a)> {
        self.handle.as_deref().ok_or(Error::TransactionFinished)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::TransactionFinished)?;
        tracing::info!("Committing transaction");
        self.dbmap.trace("commit;", &[]);
        handle.commit()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::TransactionFinished)?;
        tracing::info!("Rolling back transaction");
        self.dbmap.trace("rollback;", &[]);
        handle.rollback()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("Rolling back unfinished transaction on drop");
            if let Err(err) = handle.rollback() {
                tracing::warn!(error = %err, "Rollback on drop failed");
            }
        }
    }
}

impl SqlExecutor for Transaction<'_> {
    fn dbmap(&self) -> &DbMap {
        self.dbmap
    }

    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        let handle = self.handle()?;
        self.dbmap.trace(query, args);
        handle.execute(query, args)
    }

    fn query(&self, query: &str, args: &[Value]) -> Result<Vec<Row>> {
        let handle = self.handle()?;
        self.dbmap.trace(query, args);
        handle.query(query, args)
    }

    fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        let handle = self.handle()?;
        self.dbmap.trace(query, args);
        handle.query_row(query, args)
    }

    fn as_executor(&self) -> &dyn SqlExecutor {
        self
    }
}
