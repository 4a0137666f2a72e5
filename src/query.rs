//! Query conditions and update parameter maps.
//!
//! A [`Query`] renders to a parameterized `WHERE` clause. Field names are
//! resolved against the model's table so they are never interpolated as
//! given; values are always bound.

use std::collections::BTreeMap;

use crate::error::OrmError;
use crate::model::{Model, DELETED_AT, ID};
use crate::schema::quote_ident;
use crate::value::Value;

/// Named values for a field-map update.
///
/// Unlike a partial record, every entry is applied, zero values included.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

/// Query operators for field conditions
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
}

/// Conditions for reads and deletes. All parts are AND-ed together.
///
/// Soft-deleted rows are excluded unless [`Query::unscoped`] is used.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    conditions: Vec<(String, QueryOperator)>,
    clauses: Vec<(String, Vec<Value>)>,
    unscoped: bool,
}

/// A rendered `WHERE` clause (possibly empty) and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(id: i64) -> Self {
        Self::new().with_condition(ID, QueryOperator::Equal(Value::Integer(id)))
    }

    /// A raw SQL predicate with `?` placeholders, e.g. `"code = ?"`.
    pub fn raw(clause: &str, args: Vec<Value>) -> Self {
        Self::new().with_clause(clause, args)
    }

    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    pub fn with_clause(mut self, clause: &str, args: Vec<Value>) -> Self {
        self.clauses.push((clause.to_string(), args));
        self
    }

    /// Include soft-deleted rows.
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    /// Whether any condition beyond the soft-delete filter is present.
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty() || !self.clauses.is_empty()
    }

    pub(crate) fn filter<M: Model>(&self) -> Result<Filter, OrmError> {
        let table = M::table();
        let mut parts = Vec::new();
        let mut params = Vec::new();

        for (field, op) in &self.conditions {
            let column = table
                .column(field)
                .ok_or_else(|| OrmError::UnknownColumn {
                    table: M::TABLE,
                    column: field.clone(),
                })?;
            let ident = quote_ident(&column.name);
            let (sql_op, value) = match op {
                QueryOperator::Equal(Value::Null) => {
                    parts.push(format!("{} IS NULL", ident));
                    continue;
                }
                QueryOperator::NotEqual(Value::Null) => {
                    parts.push(format!("{} IS NOT NULL", ident));
                    continue;
                }
                QueryOperator::Equal(v) => ("=", v.clone()),
                QueryOperator::NotEqual(v) => ("<>", v.clone()),
                QueryOperator::GreaterThan(v) => (">", v.clone()),
                QueryOperator::GreaterThanOrEqual(v) => (">=", v.clone()),
                QueryOperator::LessThan(v) => ("<", v.clone()),
                QueryOperator::LessThanOrEqual(v) => ("<=", v.clone()),
                QueryOperator::Like(pattern) => ("LIKE", Value::Text(pattern.clone())),
                // An empty set matches nothing.
                QueryOperator::In(values) if values.is_empty() => {
                    parts.push("0".to_string());
                    continue;
                }
                QueryOperator::In(values) => {
                    let marks = vec!["?"; values.len()].join(", ");
                    parts.push(format!("{} IN ({})", ident, marks));
                    params.extend(values.iter().cloned());
                    continue;
                }
            };
            parts.push(format!("{} {} ?", ident, sql_op));
            params.push(value);
        }

        for (clause, args) in &self.clauses {
            parts.push(format!("({})", clause));
            params.extend(args.iter().cloned());
        }

        if !self.unscoped {
            parts.push(format!("{} IS NULL", quote_ident(DELETED_AT)));
        }

        let sql = if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        };
        Ok(Filter { sql, params })
    }
}

impl From<i64> for Query {
    fn from(id: i64) -> Self {
        Query::primary_key(id)
    }
}

impl From<i32> for Query {
    fn from(id: i32) -> Self {
        Query::primary_key(id.into())
    }
}
