//! Storage driver boundary.
//!
//! Drivers implement [`Connection`] and [`TransactionHandle`]. The mapping
//! engine only ever talks to a database through these two traits, which keeps
//! statement generation independent from any particular client library.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of rows changed by the statement.
    pub rows_affected: u64,
    /// Generated key of the last inserted row, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    /// Result carrying only an affected-row count.
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }
}

/// A blocking database connection.
///
/// Implementations must be safe to share between threads; a driver whose
/// client is not `Sync` wraps it in a mutex.
pub trait Connection: Send + Sync {
    /// Execute a statement and report affected rows and generated key.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query and collect all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return its first row, if any.
    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Begin a transaction.
    ///
    /// The handle holds whatever exclusivity the driver needs until it is
    /// committed or rolled back.
    fn begin(&self) -> Result<Box<dyn TransactionHandle + '_>>;
}

/// An open transaction on a [`Connection`].
pub trait TransactionHandle {
    /// Execute a statement inside the transaction.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query inside the transaction.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return its first row, if any.
    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Commit the transaction.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Roll the transaction back.
    fn rollback(self: Box<Self>) -> Result<()>;
}
