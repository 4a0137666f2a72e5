//! The [`Model`] trait and the bookkeeping every model carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrmError;
use crate::schema::{
    ColumnConstraint, ColumnDefinition, DataType, IndexDefinition, TableDefinition,
};
use crate::value::Value;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const DELETED_AT: &str = "deleted_at";

/// Identity and timestamps managed by [`crate::Database`].
///
/// `id == 0` means the model has not been persisted. A row is soft-deleted
/// once `deleted_at` is set; it is never physically removed by a soft delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelBase {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ModelBase {
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new(ID, DataType::Integer)
                .with_constraint(ColumnConstraint::PrimaryKey)
                .with_constraint(ColumnConstraint::AutoIncrement),
            ColumnDefinition::new(CREATED_AT, DataType::Timestamp),
            ColumnDefinition::new(UPDATED_AT, DataType::Timestamp),
            ColumnDefinition::new(DELETED_AT, DataType::Timestamp),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(ID)?,
            created_at: row.get(CREATED_AT)?,
            updated_at: row.get(UPDATED_AT)?,
            deleted_at: row.get(DELETED_AT)?,
        })
    }
}

/// A record type persisted to its own table.
///
/// Implementors declare their own columns through [`Model::fields`]; the
/// bookkeeping columns from [`ModelBase`] are added by [`Model::table`].
/// `Default` supplies the zero value of every field, which is what
/// partial-record updates compare against.
pub trait Model: Default + Clone {
    /// Table name in SQL.
    const TABLE: &'static str;

    /// Columns declared by the model itself.
    fn fields() -> Vec<ColumnDefinition>;

    fn base(&self) -> &ModelBase;

    fn base_mut(&mut self) -> &mut ModelBase;

    /// Current value of each declared column, in [`Model::fields`] order.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Assign one declared column. `column` is always the declared name.
    fn set_value(&mut self, column: &str, value: Value) -> Result<(), OrmError>;

    /// Full table definition: bookkeeping columns, declared columns, and an
    /// index on `deleted_at` for the soft-delete filter.
    fn table() -> TableDefinition {
        let table = ModelBase::columns()
            .into_iter()
            .chain(Self::fields())
            .fold(TableDefinition::new(Self::TABLE), TableDefinition::add_column);
        table.add_index(IndexDefinition::new(
            format!("idx_{}_{}", Self::TABLE, DELETED_AT),
            &[DELETED_AT],
        ))
    }
}

/// Resolve a user-supplied name to a declared field, ignoring ASCII case.
pub(crate) fn resolve_field<M: Model>(name: &str) -> Result<String, OrmError> {
    M::fields()
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| c.name)
        .ok_or_else(|| OrmError::UnknownColumn {
            table: M::TABLE,
            column: name.to_string(),
        })
}

/// Materialize a model from a row selected with every table column.
pub(crate) fn from_row<M: Model>(row: &rusqlite::Row<'_>) -> Result<M, OrmError> {
    let mut model = M::default();
    *model.base_mut() = ModelBase::from_row(row)?;
    for column in M::fields() {
        let value = Value::from(row.get_ref(column.name.as_str())?);
        model.set_value(&column.name, value)?;
    }
    Ok(model)
}
