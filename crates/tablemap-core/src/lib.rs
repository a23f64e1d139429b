//! Core types and traits for tablemap.
//!
//! `tablemap-core` is the **foundation layer** shared by the mapping engine,
//! the dialects, the derive macro and the drivers.
//!
//! # Role In The Architecture
//!
//! - **Driver boundary**: `Connection` and `TransactionHandle` are implemented by
//!   storage drivers and consumed by the engine.
//! - **Data model**: `Value` and `Row` carry statement parameters and results.
//! - **Field conversions**: `SqlField` maps Rust field types to `Value` and to a
//!   semantic `FieldType` that dialects turn into SQL column types.
//! - **Errors**: the `Error` enum, including `OptimisticLockError`.
//!
//! Applications normally depend on the `tablemap` facade; reach for this crate
//! directly when writing a driver.

pub mod connection;
pub mod error;
pub mod field;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, ExecResult, TransactionHandle};
pub use error::{Error, OptimisticLockError, Result, ValueError};
pub use field::{Json, SqlField};
pub use row::Row;
pub use types::FieldType;
pub use value::Value;
