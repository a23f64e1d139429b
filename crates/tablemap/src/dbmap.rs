//! The table registry and non-transactional executor.

use crate::executor::SqlExecutor;
use crate::record::Record;
use crate::table::{ColumnMap, TableMap};
use crate::transaction::Transaction;
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tablemap_core::{Connection, ExecResult, Result, Row, Value};
use tablemap_dialect::Dialect;

/// Custom conversion between field values and database values.
///
/// Applied to every bound argument and every scanned column of a mapped
/// table. Both methods pass values through unchanged by default.
pub trait TypeConverter: Send + Sync {
    /// Convert a field value before it is bound to a statement.
    fn to_db(&self, column: &ColumnMap, value: Value) -> Result<Value> {
        let _ = column;
        Ok(value)
    }

    /// Convert a scanned database value before it is written to a field.
    fn from_db(&self, column: &ColumnMap, value: Value) -> Result<Value> {
        let _ = column;
        Ok(value)
    }
}

/// Registry of table mappings bound to one connection and dialect.
///
/// Tables are registered and configured through `&mut DbMap`. Once setup is
/// done, the map can be shared between threads and every CRUD operation runs
/// through `&DbMap` (see [`SqlExecutorExt`](crate::SqlExecutorExt)).
pub struct DbMap {
    conn: Box<dyn Connection>,
    dialect: Box<dyn Dialect>,
    tables: Vec<TableMap>,
    type_converter: Option<Box<dyn TypeConverter>>,
    trace_prefix: Option<String>,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl fmt::Debug for DbMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbMap")
            .field("dialect", &self.dialect.name())
            .field("tables", &self.tables)
            .field("type_converter", &self.type_converter.is_some())
            .field("trace_prefix", &self.trace_prefix)
            .finish_non_exhaustive()
    }
}

impl DbMap {
    /// Create an empty map over `conn` using `dialect`.
    pub fn new(conn: impl Connection + 'static, dialect: impl Dialect + 'static) -> Self {
        tracing::debug!(dialect = dialect.name(), "Creating DbMap");
        Self {
            conn: Box::new(conn),
            dialect: Box::new(dialect),
            tables: Vec::new(),
            type_converter: None,
            trace_prefix: None,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Underlying driver connection.
    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `R` under its default table name.
    pub fn add_table<R: Record>(&mut self) -> &mut TableMap {
        self.register::<R>(None, R::table_name().to_string())
    }

    /// Register `R` under `name`.
    ///
    /// Registering a type again renames the existing mapping instead of
    /// adding a second one.
    pub fn add_table_with_name<R: Record>(&mut self, name: &str) -> &mut TableMap {
        self.register::<R>(None, name.to_string())
    }

    /// Register `R` as `schema.name`.
    pub fn add_table_with_name_and_schema<R: Record>(
        &mut self,
        schema: &str,
        name: &str,
    ) -> &mut TableMap {
        self.register::<R>(Some(schema.to_string()), name.to_string())
    }

    fn register<R: Record>(&mut self, schema: Option<String>, name: String) -> &mut TableMap {
        let type_id = TypeId::of::<R>();
        let type_name = std::any::type_name::<R>();

        let idx = match self.tables.iter().position(|t| t.type_id() == type_id) {
            Some(idx) => {
                tracing::debug!(record = type_name, table = %name, "Re-registering table");
                let table = &mut self.tables[idx];
                table.set_table_name(name);
                table.set_schema_name(schema);
                idx
            }
            None => {
                tracing::info!(record = type_name, table = %name, "Registering table");
                self.tables
                    .push(TableMap::new(type_id, type_name, name, schema, &R::describe()));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// All registered tables, in registration order.
    pub fn tables(&self) -> &[TableMap] {
        &self.tables
    }

    /// Mapping for `R`, or `None` if it was never registered.
    pub fn try_table_for<R: Record>(&self) -> Option<&TableMap> {
        self.find(TypeId::of::<R>())
    }

    /// Mapping for `R`.
    ///
    /// Panics if `R` was never registered.
    pub fn table_for<R: Record>(&self) -> &TableMap {
        match self.try_table_for::<R>() {
            Some(table) => table,
            None => unregistered(std::any::type_name::<R>()),
        }
    }

    /// Mutable mapping for `R`. Panics if `R` was never registered.
    pub fn table_for_mut<R: Record>(&mut self) -> &mut TableMap {
        let type_id = TypeId::of::<R>();
        match self.tables.iter_mut().find(|t| t.type_id() == type_id) {
            Some(table) => table,
            None => unregistered(std::any::type_name::<R>()),
        }
    }

    pub(crate) fn table_for_record(&self, record: &dyn Record) -> &TableMap {
        match self.find(record.as_any().type_id()) {
            Some(table) => table,
            None => unregistered(record.record_name()),
        }
    }

    pub(crate) fn find(&self, type_id: TypeId) -> Option<&TableMap> {
        self.tables.iter().find(|t| t.type_id() == type_id)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Install a converter applied to all mapped values.
    pub fn set_type_converter(&mut self, converter: impl TypeConverter + 'static) -> &mut Self {
        self.type_converter = Some(Box::new(converter));
        self
    }

    pub(crate) fn type_converter(&self) -> Option<&dyn TypeConverter> {
        self.type_converter.as_deref()
    }

    /// Log every statement and its arguments at `info` level under the
    /// `tablemap::sql` target, each line starting with `prefix`.
    pub fn trace_on(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.trace_prefix = Some(prefix.into());
        self
    }

    pub fn trace_off(&mut self) -> &mut Self {
        self.trace_prefix = None;
        self
    }

    pub(crate) fn trace(&self, query: &str, args: &[Value]) {
        if let Some(prefix) = &self.trace_prefix {
            let args = args
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{}:{v}", i + 1))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(target: "tablemap::sql", "{prefix}{query} [{args}]");
        }
    }

    /// Run the dialect's connection init statement if it has not run yet.
    pub(crate) fn ensure_init(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(init) = self.dialect.init_string() {
            tracing::debug!(dialect = self.dialect.name(), sql = %init, "Running connection init");
            self.conn.execute(&init, &[])?;
        }
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start a transaction.
    ///
    /// The transaction rolls back on drop unless committed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&self) -> Result<Transaction<'_>> {
        self.ensure_init()?;
        tracing::info!("Beginning transaction");
        let handle = self.conn.begin()?;
        Ok(Transaction::new(self, handle))
    }
}

fn unregistered(type_name: &str) -> ! {
    tracing::error!(record = type_name, "Type used before registration");
    panic!("no table registered for type {type_name}; call add_table first")
}

impl SqlExecutor for DbMap {
    fn dbmap(&self) -> &DbMap {
        self
    }

    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.ensure_init()?;
        self.trace(query, args);
        self.conn.execute(query, args)
    }

    fn query(&self, query: &str, args: &[Value]) -> Result<Vec<Row>> {
        self.ensure_init()?;
        self.trace(query, args);
        self.conn.query(query, args)
    }

    fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        self.ensure_init()?;
        self.trace(query, args);
        self.conn.query_row(query, args)
    }

    fn as_executor(&self) -> &dyn SqlExecutor {
        self
    }
}
