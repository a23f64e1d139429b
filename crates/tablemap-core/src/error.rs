//! Error types for tablemap operations.

use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the tablemap crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all tablemap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Error reported by the storage driver (constraint violation, I/O, syntax).
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Update or delete matched no row for the version the caller held.
    #[error(transparent)]
    OptimisticLock(#[from] OptimisticLockError),

    /// Update, delete or get on a table that has no key columns configured.
    #[error("table {table} has no keys configured")]
    NoKeys {
        /// Name of the offending table.
        table: String,
    },

    /// A query returned a column that has no matching field on the target type.
    #[error("no field {column} in type {type_name} (query: {query})")]
    UnmappedColumn {
        /// Column name as returned by the driver.
        column: String,
        /// Target record type.
        type_name: &'static str,
        /// Query that produced the column.
        query: String,
    },

    /// A field value could not be converted to or from its Rust type.
    #[error("field {field}: {source}")]
    Field {
        /// Field path on the record.
        field: String,
        /// Underlying conversion failure.
        #[source]
        source: ValueError,
    },

    /// A field path did not resolve on the record.
    #[error("unknown field {field} on {type_name}")]
    UnknownField {
        /// Field path that was requested.
        field: String,
        /// Record type name.
        type_name: &'static str,
    },

    /// A single-row select matched more than one row.
    #[error("multiple rows returned for: {query}")]
    MultipleRows {
        /// Query that was run.
        query: String,
    },

    /// Commit or rollback was attempted on a transaction that already concluded.
    #[error("transaction has already been committed or rolled back")]
    TransactionFinished,

    /// A type was used that was never registered with the map.
    #[error("type {0} was not registered")]
    NotRegistered(&'static str),

    /// Value conversion failure outside of a specific field.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Anything else.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Wrap a driver-level error.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Driver(Box::new(err))
    }

    /// Whether this error is an optimistic lock conflict.
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Error::OptimisticLock(_))
    }

    /// Borrow the optimistic lock details, if this is a lock conflict.
    pub fn as_optimistic_lock(&self) -> Option<&OptimisticLockError> {
        match self {
            Error::OptimisticLock(e) => Some(e),
            _ => None,
        }
    }
}

/// Returned by update/delete when the stored version no longer matches the
/// version held by the caller.
///
/// `row_exists` distinguishes a concurrent modification (the row is still
/// there under a newer version) from a concurrent delete.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticLockError {
    /// Table the statement targeted.
    pub table_name: String,
    /// Key values bound in the WHERE clause.
    pub keys: Vec<Value>,
    /// Whether a row with these keys still exists.
    pub row_exists: bool,
    /// Version value the caller held.
    pub local_version: i64,
}

impl fmt::Display for OptimisticLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self
            .keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if self.row_exists {
            write!(
                f,
                "optimistic lock error: table={} keys=[{}] out of date version={}",
                self.table_name, keys, self.local_version
            )
        } else {
            write!(
                f,
                "optimistic lock error: no row found for table={} keys=[{}]",
                self.table_name, keys
            )
        }
    }
}

impl std::error::Error for OptimisticLockError {}

/// Failure converting a [`Value`] into a Rust field type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// The value variant cannot represent the target type.
    #[error("cannot convert {actual} to {expected}")]
    TypeMismatch {
        /// Rust type the field expects.
        expected: &'static str,
        /// Variant name of the value received.
        actual: &'static str,
    },

    /// NULL was read into a non-nullable field.
    #[error("unexpected NULL for non-nullable {0}")]
    UnexpectedNull(&'static str),

    /// Numeric value does not fit in the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Rendered value.
        value: String,
        /// Rust type the field expects.
        target: &'static str,
    },

    /// JSON payload did not decode.
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ValueError {
    fn from(err: serde_json::Error) -> Self {
        ValueError::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_error_display_distinguishes_missing_row() {
        let mut err = OptimisticLockError {
            table_name: "people".to_string(),
            keys: vec![Value::BigInt(7)],
            row_exists: true,
            local_version: 3,
        };
        assert_eq!(
            err.to_string(),
            "optimistic lock error: table=people keys=[7] out of date version=3"
        );

        err.row_exists = false;
        assert_eq!(
            err.to_string(),
            "optimistic lock error: no row found for table=people keys=[7]"
        );
    }

    #[test]
    fn optimistic_lock_converts_into_error() {
        let err: Error = OptimisticLockError {
            table_name: "t".to_string(),
            keys: vec![],
            row_exists: false,
            local_version: 1,
        }
        .into();
        assert!(err.is_optimistic_lock());
        assert!(!err.as_optimistic_lock().is_some_and(|e| e.row_exists));
    }

    #[test]
    fn field_error_names_the_field() {
        let err = Error::Field {
            field: "id".to_string(),
            source: ValueError::TypeMismatch {
                expected: "i64",
                actual: "Text",
            },
        };
        assert_eq!(err.to_string(), "field id: cannot convert Text to i64");
    }
}
