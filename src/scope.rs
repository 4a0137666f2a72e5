//! Updates against a single, already-identified model.
//!
//! The three idioms differ only in which values they apply:
//!
//! - [`ModelScope::update`] sets exactly one column.
//! - [`ModelScope::updates`] applies the non-zero fields of a partial record;
//!   zero values mean "leave unchanged", so it is not a full overwrite.
//! - [`ModelScope::updates_map`] applies every listed column, zero values
//!   included.
//!
//! Every update also refreshes `updated_at`, targets only active rows, and
//! mirrors the new values into the in-memory model once the row changed.

use chrono::Utc;

use crate::error::OrmError;
use crate::model::{resolve_field, Model, DELETED_AT, ID, UPDATED_AT};
use crate::query::Params;
use crate::schema::quote_ident;
use crate::sqlite::Database;
use crate::value::Value;

pub struct ModelScope<'a, M: Model> {
    db: &'a Database,
    model: &'a mut M,
}

impl<'a, M: Model> ModelScope<'a, M> {
    pub(crate) fn new(db: &'a Database, model: &'a mut M) -> Self {
        Self { db, model }
    }

    /// The model as it stands after the updates applied so far.
    pub fn record(&self) -> &M {
        &*self.model
    }

    /// Set one column. `column` may use field or column spelling.
    pub fn update(&mut self, column: &str, value: impl Into<Value>) -> Result<usize, OrmError> {
        self.apply(vec![(column.to_string(), value.into())])
    }

    /// Apply the non-zero fields of `partial`.
    ///
    /// Returns `Ok(0)` without touching storage when every field is zero.
    pub fn updates(&mut self, partial: &M) -> Result<usize, OrmError> {
        let changes = partial
            .values()
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .map(|(column, value)| (column.to_string(), value))
            .collect();
        self.apply(changes)
    }

    /// Apply every entry of `params`, zero values included.
    pub fn updates_map(&mut self, params: Params) -> Result<usize, OrmError> {
        self.apply(params.values.into_iter().collect())
    }

    fn apply(&mut self, changes: Vec<(String, Value)>) -> Result<usize, OrmError> {
        let id = self.model.base().id;
        if id == 0 {
            return Err(OrmError::MissingPrimaryKey { table: M::TABLE });
        }
        if changes.is_empty() {
            return Ok(0);
        }

        // Resolve names and type-check on a copy so a bad value never
        // reaches storage or leaves the model half-updated.
        let mut staged = self.model.clone();
        let mut assignments: Vec<(String, Value)> = Vec::with_capacity(changes.len());
        for (name, value) in changes {
            let column = resolve_field::<M>(&name)?;
            staged.set_value(&column, value.clone())?;
            match assignments.iter_mut().find(|(c, _)| *c == column) {
                Some(existing) => existing.1 = value,
                None => assignments.push((column, value)),
            }
        }

        let now = Utc::now();
        let mut set: Vec<String> = assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", quote_ident(column)))
            .collect();
        set.push(format!("{} = ?", quote_ident(UPDATED_AT)));

        let mut params: Vec<Value> = assignments.into_iter().map(|(_, value)| value).collect();
        params.push(Value::from(now));
        params.push(Value::from(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ? AND {} IS NULL",
            quote_ident(M::TABLE),
            set.join(", "),
            quote_ident(ID),
            quote_ident(DELETED_AT)
        );
        let affected = self.db.execute(&sql, &params)?;

        if affected > 0 {
            staged.base_mut().updated_at = Some(now);
            *self.model = staged;
        }
        Ok(affected)
    }
}
