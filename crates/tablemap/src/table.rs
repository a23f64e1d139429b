//! Table and column metadata.
//!
//! A [`TableMap`] is built once per registered record type from the record's
//! field description. It owns the column list, key and version selection,
//! table-creation extras (unique groups, indexes) and the four cached
//! binding plans. Every mutating setter clears those plans, so later
//! statements are regenerated from the corrected metadata.

use crate::bindings::{self, BindPlan};
use crate::record::FieldDef;
use std::any::TypeId;
use std::sync::OnceLock;
use tablemap_core::{Error, FieldType, Result};
use tablemap_dialect::Dialect;

/// Name of the field picked as the optimistic-lock version by default.
pub const DEFAULT_VERSION_FIELD: &str = "version";

// ============================================================================
// Column metadata
// ============================================================================

/// Mapping of one record field to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    column_name: String,
    field_name: &'static str,
    field_path: String,
    field_type: FieldType,
    nullable: bool,
    declared_transient: bool,
    transient: bool,
    unique: bool,
    not_null: bool,
    max_size: usize,
    is_pk: bool,
    is_auto_incr: bool,
}

impl ColumnMap {
    fn new(field_name: &'static str, field_path: String, column_name: String) -> Self {
        Self {
            column_name,
            field_name,
            field_path,
            field_type: FieldType::Text,
            nullable: false,
            declared_transient: false,
            transient: false,
            unique: false,
            not_null: false,
            max_size: 0,
            is_pk: false,
            is_auto_incr: false,
        }
    }

    /// Change the column name.
    pub fn rename(&mut self, column_name: impl Into<String>) -> &mut Self {
        self.column_name = column_name.into();
        self
    }

    /// Exclude the column from (or restore it to) generated SQL.
    ///
    /// Fields tagged `-` carry no accessors and cannot be made persistent.
    pub fn set_transient(&mut self, transient: bool) -> &mut Self {
        assert!(
            transient || !self.declared_transient,
            "field {} is declared transient and cannot be mapped to a column",
            self.field_path
        );
        self.transient = transient;
        self
    }

    /// Add a UNIQUE constraint at table creation.
    pub fn set_unique(&mut self, unique: bool) -> &mut Self {
        self.unique = unique;
        self
    }

    /// Add a NOT NULL constraint at table creation.
    pub fn set_not_null(&mut self, not_null: bool) -> &mut Self {
        self.not_null = not_null;
        self
    }

    /// Size hint for the column type. Only affects DDL.
    pub fn set_max_size(&mut self, max_size: usize) -> &mut Self {
        self.max_size = max_size;
        self
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Rust name of the originating field (last path segment).
    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    /// Path used to read and write the field on a record.
    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_pk
    }

    pub fn is_auto_increment(&self) -> bool {
        self.is_auto_incr
    }

    fn matches(&self, name: &str) -> bool {
        self.field_path == name || self.field_name == name || self.column_name == name
    }
}

/// A secondary index created by `DbMap::create_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    /// Index name.
    pub index_name: String,
    /// Index method such as `btree` or `hash`; empty for the database default.
    pub index_type: String,
    /// Indexed column names.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    pub unique: bool,
}

impl IndexMap {
    pub fn set_unique(&mut self, unique: bool) -> &mut Self {
        self.unique = unique;
        self
    }
}

// ============================================================================
// Column construction
// ============================================================================

/// Flatten a field description into columns.
///
/// Embedded records are spliced in place. A later non-embedded field whose
/// name matches an earlier column replaces it at the same position; an
/// embedded column whose name is already present is skipped. Transient
/// fields never replace and are never replaced.
pub fn build_columns(defs: &[FieldDef]) -> Vec<ColumnMap> {
    build_columns_with_prefix(defs, "")
}

fn build_columns_with_prefix(defs: &[FieldDef], prefix: &str) -> Vec<ColumnMap> {
    let mut cols: Vec<ColumnMap> = Vec::new();

    for def in defs {
        match *def {
            FieldDef::Embedded { name, describe } => {
                let nested = describe();
                let sub_prefix = format!("{prefix}{name}.");
                for sub in build_columns_with_prefix(&nested, &sub_prefix) {
                    let collides = !sub.transient
                        && cols
                            .iter()
                            .any(|c| !c.transient && c.field_name == sub.field_name);
                    if !collides {
                        cols.push(sub);
                    }
                }
            }
            FieldDef::Column(field) => {
                let column_name = field.column.unwrap_or(field.name).to_string();
                let mut cm = ColumnMap::new(field.name, format!("{prefix}{}", field.name), column_name);
                cm.field_type = field.field_type;
                cm.nullable = field.nullable;

                match cols
                    .iter()
                    .position(|c| !c.transient && c.field_name == cm.field_name)
                {
                    Some(index) => cols[index] = cm,
                    None => cols.push(cm),
                }
            }
            FieldDef::Transient { name } => {
                let mut cm = ColumnMap::new(name, format!("{prefix}{name}"), "-".to_string());
                cm.declared_transient = true;
                cm.transient = true;
                cols.push(cm);
            }
        }
    }

    cols
}

// ============================================================================
// Table metadata
// ============================================================================

#[derive(Debug, Default)]
struct Plans {
    insert: OnceLock<BindPlan>,
    update: OnceLock<BindPlan>,
    delete: OnceLock<BindPlan>,
    get: OnceLock<BindPlan>,
}

/// Mapping of a record type to a table.
#[derive(Debug)]
pub struct TableMap {
    table_name: String,
    schema_name: Option<String>,
    type_id: TypeId,
    type_name: &'static str,
    columns: Vec<ColumnMap>,
    keys: Vec<usize>,
    version: Option<usize>,
    unique_together: Vec<Vec<String>>,
    indexes: Vec<IndexMap>,
    plans: Plans,
}

impl TableMap {
    /// Build table metadata from a record description.
    pub fn new(
        type_id: TypeId,
        type_name: &'static str,
        table_name: impl Into<String>,
        schema_name: Option<String>,
        defs: &[FieldDef],
    ) -> Self {
        let columns = build_columns(defs);
        let version = columns
            .iter()
            .position(|c| !c.transient && c.field_name == DEFAULT_VERSION_FIELD);

        let table_name = table_name.into();
        tracing::debug!(
            table = %table_name,
            record = type_name,
            columns = columns.len(),
            has_version = version.is_some(),
            "Built table map"
        );

        Self {
            table_name,
            schema_name,
            type_id,
            type_name,
            columns,
            keys: Vec::new(),
            version,
            unique_together: Vec::new(),
            indexes: Vec::new(),
            plans: Plans::default(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Struct name of the mapped record.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn set_table_name(&mut self, name: String) {
        self.table_name = name;
        self.reset_sql();
    }

    pub(crate) fn set_schema_name(&mut self, schema: Option<String>) {
        self.schema_name = schema;
        self.reset_sql();
    }

    /// All columns, transient ones included, in table order.
    pub fn columns(&self) -> &[ColumnMap] {
        &self.columns
    }

    /// Key columns in key order.
    pub fn keys(&self) -> impl Iterator<Item = &ColumnMap> {
        self.keys.iter().map(|&i| &self.columns[i])
    }

    pub(crate) fn key_indices(&self) -> &[usize] {
        &self.keys
    }

    /// The optimistic-lock version column, if any.
    pub fn version(&self) -> Option<&ColumnMap> {
        self.version.map(|i| &self.columns[i])
    }

    pub(crate) fn version_index(&self) -> Option<usize> {
        self.version
    }

    /// Column groups that are unique together.
    pub fn unique_together(&self) -> &[Vec<String>] {
        &self.unique_together
    }

    pub fn indexes(&self) -> &[IndexMap] {
        &self.indexes
    }

    /// Drop all cached statements.
    pub fn reset_sql(&mut self) {
        self.plans = Plans::default();
    }

    /// Configure the primary key.
    ///
    /// `fields` are field names or column names, in the order callers will
    /// pass key values to `get`. Auto-increment requires exactly one key.
    pub fn set_keys(&mut self, auto_incr: bool, fields: &[&str]) -> &mut Self {
        assert!(
            !auto_incr || fields.len() == 1,
            "table {}: an auto-increment key must be the only key column (got {})",
            self.table_name,
            fields.len()
        );

        for col in &mut self.columns {
            col.is_pk = false;
            col.is_auto_incr = false;
        }

        let mut keys = Vec::with_capacity(fields.len());
        for field in fields {
            let idx = self.column_index(field);
            let col = &mut self.columns[idx];
            col.is_pk = true;
            col.is_auto_incr = auto_incr;
            keys.push(idx);
        }
        self.keys = keys;
        self.reset_sql();
        self
    }

    /// Require a set of columns to be unique together. Only affects DDL.
    pub fn set_unique_together(&mut self, fields: &[&str]) -> &mut Self {
        assert!(
            fields.len() >= 2,
            "table {}: set_unique_together needs at least two columns",
            self.table_name
        );
        let columns: Vec<String> = fields
            .iter()
            .map(|f| self.columns[self.column_index(f)].column_name.clone())
            .collect();
        if !self.unique_together.contains(&columns) {
            self.unique_together.push(columns);
        }
        self.reset_sql();
        self
    }

    /// Use `field` as the optimistic-lock version column.
    pub fn set_version_col(&mut self, field: &str) -> &mut ColumnMap {
        let idx = self.column_index(field);
        self.version = Some(idx);
        self.reset_sql();
        &mut self.columns[idx]
    }

    /// Disable optimistic locking for this table.
    pub fn clear_version_col(&mut self) -> &mut Self {
        self.version = None;
        self.reset_sql();
        self
    }

    /// Look up a column by field name, field path or column name.
    ///
    /// Panics if nothing matches: naming a missing field is a setup error.
    pub fn col_map(&self, field: &str) -> &ColumnMap {
        &self.columns[self.column_index(field)]
    }

    /// Mutable access to a column. Cached statements are cleared.
    pub fn col_map_mut(&mut self, field: &str) -> &mut ColumnMap {
        let idx = self.column_index(field);
        self.reset_sql();
        &mut self.columns[idx]
    }

    /// Declare a secondary index over `columns`.
    pub fn add_index(&mut self, name: &str, index_type: &str, columns: &[&str]) -> &mut IndexMap {
        let columns = columns
            .iter()
            .map(|c| self.columns[self.column_index(c)].column_name.clone())
            .collect();
        self.indexes.push(IndexMap {
            index_name: name.to_string(),
            index_type: index_type.to_string(),
            columns,
            unique: false,
        });
        let last = self.indexes.len() - 1;
        &mut self.indexes[last]
    }

    pub fn index(&self, name: &str) -> Option<&IndexMap> {
        self.indexes.iter().find(|i| i.index_name == name)
    }

    pub(crate) fn remove_index(&mut self, name: &str) {
        self.indexes.retain(|i| i.index_name != name);
    }

    fn column_index(&self, field: &str) -> usize {
        match self.columns.iter().position(|c| c.matches(field)) {
            Some(idx) => idx,
            None => panic!(
                "no column in table {} (type {}) for field {}",
                self.table_name, self.type_name, field
            ),
        }
    }

    /// Fail with `NoKeys` if no primary key is configured.
    pub(crate) fn require_keys(&self) -> Result<()> {
        if self.keys.is_empty() {
            Err(Error::NoKeys {
                table: self.table_name.clone(),
            })
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------------
    // Cached plans
    // ------------------------------------------------------------------------

    pub(crate) fn insert_plan(&self, dialect: &dyn Dialect) -> &BindPlan {
        self.plans
            .insert
            .get_or_init(|| bindings::build_insert(self, dialect))
    }

    pub(crate) fn update_plan(&self, dialect: &dyn Dialect) -> &BindPlan {
        self.plans
            .update
            .get_or_init(|| bindings::build_update(self, dialect, &|_: &ColumnMap| true))
    }

    pub(crate) fn delete_plan(&self, dialect: &dyn Dialect) -> &BindPlan {
        self.plans
            .delete
            .get_or_init(|| bindings::build_delete(self, dialect))
    }

    pub(crate) fn get_plan(&self, dialect: &dyn Dialect) -> &BindPlan {
        self.plans.get.get_or_init(|| bindings::build_get(self, dialect))
    }

    #[cfg(test)]
    pub(crate) fn cached_plan_count(&self) -> usize {
        [
            &self.plans.insert,
            &self.plans.update,
            &self.plans.delete,
            &self.plans.get,
        ]
        .iter()
        .filter(|p| p.get().is_some())
        .count()
    }
}
