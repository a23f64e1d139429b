//! Procedural macros for tablemap.
//!
//! `#[derive(Record)]` generates the field-accessor table the mapping engine
//! uses in place of runtime reflection.
//!
//! ```ignore
//! #[derive(Record, Default)]
//! #[db(table = "invoices")]
//! struct Invoice {
//!     id: i64,
//!     #[db("memo_text")]
//!     memo: String,
//!     #[db("-")]
//!     cached_total: f64,
//!     #[db(embed)]
//!     audit: Audit,
//!     version: i64,
//! }
//! ```
//!
//! Field attributes:
//! - `#[db("name")]` or `#[db(column = "name")]` sets the column name
//! - `#[db("-")]` or `#[db(transient)]` excludes the field from SQL
//! - `#[db(embed)]` flattens a nested `Record` into this one
//!
//! Struct attributes:
//! - `#[db(table = "name")]` sets the default table name
//! - `#[db(hooks)]` skips the empty `Hooks` impl so lifecycle hooks can be written by hand

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record_derive;

/// Derive the `Record` trait.
///
/// Every non-transient field must implement `SqlField`; embedded fields must
/// themselves derive `Record`. The struct must implement `Default`.
#[proc_macro_derive(Record, attributes(db))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match record_derive::parse_record(&input) {
        Ok(def) => record_derive::generate_record_impl(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
