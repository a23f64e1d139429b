//! Record description and lifecycle hooks.
//!
//! A [`Record`] is a struct whose fields map to table columns. The trait is
//! normally derived with `#[derive(Record)]`, which produces a field-accessor
//! table so that the engine can read and write fields by path without
//! runtime reflection.

use crate::executor::SqlExecutor;
use std::any::Any;
use tablemap_core::{FieldType, Result, Value};

/// One declared field of a record, in declaration order.
#[derive(Debug, Clone, Copy)]
pub enum FieldDef {
    /// A field stored in a column.
    Column(FieldColumn),
    /// A field excluded from all generated SQL.
    Transient {
        /// Rust field name.
        name: &'static str,
    },
    /// A nested record whose columns are flattened into the parent.
    Embedded {
        /// Rust field name holding the nested record.
        name: &'static str,
        /// Description of the nested record.
        describe: fn() -> Vec<FieldDef>,
    },
}

/// A column-backed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldColumn {
    /// Rust field name.
    pub name: &'static str,
    /// Explicit column name from the field's tag.
    pub column: Option<&'static str>,
    /// Semantic type used for DDL.
    pub field_type: FieldType,
    /// Whether the Rust type admits NULL.
    pub nullable: bool,
}

impl FieldColumn {
    /// Column backed by `name` with no tag.
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: None,
            field_type,
            nullable: false,
        }
    }

    /// Set the tagged column name.
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Mark the field nullable.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}

/// A struct that can be mapped to a table.
///
/// The trait is object safe: batch operations take `&mut [&mut dyn Record]`
/// so that records of different types can be written in one call. Methods
/// that construct or describe the type are only available on concrete types.
pub trait Record: Hooks + Any {
    /// Declared fields, in declaration order.
    fn describe() -> Vec<FieldDef>
    where
        Self: Sized;

    /// Default table name used on registration.
    fn table_name() -> &'static str
    where
        Self: Sized;

    /// A fresh record that scanned values are written into.
    fn new_record() -> Self
    where
        Self: Sized;

    /// Struct name, for diagnostics.
    fn record_name(&self) -> &'static str;

    /// Upcast used to look the concrete type up in the registry.
    fn as_any(&self) -> &dyn Any;

    /// Read a field by path (`"name"`, or `"audit.created"` for embedded fields).
    fn field_value(&self, path: &str) -> Result<Value>;

    /// Write a field by path.
    fn set_field_value(&mut self, path: &str, value: Value) -> Result<()>;
}

/// Optional lifecycle callbacks.
///
/// Every method defaults to a no-op. A hook receives the executor running the
/// operation, so it can issue further statements inside the same
/// transaction. Returning an error aborts the operation for this record and
/// the error is handed back to the caller unchanged.
#[allow(unused_variables)]
pub trait Hooks {
    fn pre_insert(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_insert(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn pre_update(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_update(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn pre_delete(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_delete(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    /// Runs after a record is loaded by `get` or `select`.
    fn post_get(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }
}
