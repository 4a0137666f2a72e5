//! Table definitions, DDL rendering and auto-migration.
//!
//! Migration only ever adds: missing tables, missing columns and missing
//! indexes. Existing columns are never dropped, renamed or retyped.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::OrmError;

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn add_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Find a column by name, ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDefinition::sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            columns.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn not_null(self) -> Self {
        self.with_constraint(ColumnConstraint::NotNull)
    }

    pub fn with_default(mut self, default_value: DefaultValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn has(&self, constraint: ColumnConstraint) -> bool {
        self.constraints.contains(&constraint)
    }

    /// Reject definitions that cannot be rendered as valid SQL.
    pub fn validate(&self, table: &str) -> Result<(), OrmError> {
        if let Some(DefaultValue::Real(f)) = &self.default_value {
            if !f.is_finite() {
                return Err(OrmError::Migration {
                    table: table.to_string(),
                    reason: format!("column {:?} has non-finite default {}", self.name, f),
                });
            }
        }
        Ok(())
    }

    /// Column definition as it appears inside `CREATE TABLE`.
    pub fn sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.data_type.sql_type());
        if self.has(ColumnConstraint::PrimaryKey) {
            sql.push_str(" PRIMARY KEY");
            if self.has(ColumnConstraint::AutoIncrement) {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.has(ColumnConstraint::NotNull) {
            sql.push_str(" NOT NULL");
        }
        if self.has(ColumnConstraint::Unique) {
            sql.push_str(" UNIQUE");
        }
        if let Some(default_value) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default_value.sql());
        }
        sql
    }

    /// `ALTER TABLE ... ADD COLUMN` statement for an existing table.
    ///
    /// SQLite cannot add key columns or non-constant defaults after the fact,
    /// and a `NOT NULL` column needs a default so existing rows stay valid.
    pub fn add_column_sql(&self, table: &str) -> Result<String, OrmError> {
        let refuse = |reason: &str| OrmError::Migration {
            table: table.to_string(),
            reason: format!("cannot add column {:?}: {}", self.name, reason),
        };

        if self.has(ColumnConstraint::PrimaryKey) || self.has(ColumnConstraint::Unique) {
            return Err(refuse("key columns must exist when the table is created"));
        }
        if self.default_value == Some(DefaultValue::CurrentTimestamp) {
            return Err(refuse("non-constant default"));
        }

        let mut column = self.clone();
        if column.has(ColumnConstraint::NotNull) && column.default_value.is_none() {
            let zero = column
                .data_type
                .zero_default()
                .ok_or_else(|| refuse("NOT NULL column has no zero value to backfill"))?;
            column.default_value = Some(zero);
        }

        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table),
            column.sql()
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
            DataType::Boolean => "NUMERIC",
            DataType::Timestamp => "DATETIME",
        }
    }

    fn zero_default(self) -> Option<DefaultValue> {
        match self {
            DataType::Integer | DataType::Boolean => Some(DefaultValue::Integer(0)),
            DataType::Text => Some(DefaultValue::Text(String::new())),
            DataType::Blob => Some(DefaultValue::Blob(Vec::new())),
            DataType::Real => Some(DefaultValue::Real(0.0)),
            DataType::Timestamp => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    AutoIncrement,
    NotNull,
    Unique,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Blob(Vec<u8>),
    Null,
    CurrentTimestamp,
}

impl DefaultValue {
    fn sql(&self) -> String {
        match self {
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Real(f) => format!("{:?}", f),
            DefaultValue::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn create_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(&self.name),
            quote_ident(table),
            columns.join(", ")
        )
    }
}

/// Outcome of [`migrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub table: String,
    /// The table did not exist and was created.
    pub created: bool,
    /// Columns added to an existing table, in declaration order.
    pub added_columns: Vec<String>,
}

/// Bring `table` in line with its definition: create it if absent, add any
/// missing columns, then create missing indexes.
///
/// Every statement is rendered before any runs, and all of them run in one
/// transaction: a failed migration leaves the table as it was.
pub fn migrate(conn: &Connection, table: &TableDefinition) -> Result<MigrationReport, OrmError> {
    for column in &table.columns {
        column.validate(&table.name)?;
    }

    let existing = existing_columns(conn, &table.name)?;
    let mut report = MigrationReport {
        table: table.name.clone(),
        created: false,
        added_columns: Vec::new(),
    };

    let mut statements = Vec::new();
    if existing.is_empty() {
        statements.push(table.create_sql());
        report.created = true;
    } else {
        for column in &table.columns {
            if existing.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                continue;
            }
            statements.push(column.add_column_sql(&table.name)?);
            report.added_columns.push(column.name.clone());
        }
    }
    statements.extend(table.indexes.iter().map(|index| index.create_sql(&table.name)));

    let tx = conn.unchecked_transaction()?;
    for sql in &statements {
        debug!(%sql, "migrating");
        tx.execute_batch(sql)?;
    }
    tx.commit()?;

    info!(
        table = %table.name,
        created = report.created,
        added = ?report.added_columns,
        "schema synchronized"
    );
    Ok(report)
}

/// Column names of `table`, empty when the table does not exist.
fn existing_columns(conn: &Connection, table: &str) -> Result<Vec<String>, OrmError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets_v1() -> TableDefinition {
        TableDefinition::new("widgets")
            .add_column(
                ColumnDefinition::new("id", DataType::Integer)
                    .with_constraint(ColumnConstraint::PrimaryKey)
                    .with_constraint(ColumnConstraint::AutoIncrement),
            )
            .add_column(ColumnDefinition::new("name", DataType::Text).not_null())
    }

    #[test]
    fn test_create_sql() {
        let sql = widgets_v1().create_sql();
        assert_eq!(
            sql,
            r#"CREATE TABLE IF NOT EXISTS "widgets" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "name" TEXT NOT NULL)"#
        );
    }

    #[test]
    fn test_add_not_null_column_backfills_zero() {
        let column = ColumnDefinition::new("weight", DataType::Integer).not_null();
        assert_eq!(
            column.add_column_sql("widgets").unwrap(),
            r#"ALTER TABLE "widgets" ADD COLUMN "weight" INTEGER NOT NULL DEFAULT 0"#
        );

        let column = ColumnDefinition::new("label", DataType::Text)
            .not_null()
            .with_default(DefaultValue::Text("it's".into()));
        assert!(column
            .add_column_sql("widgets")
            .unwrap()
            .ends_with("DEFAULT 'it''s'"));
    }

    #[test]
    fn test_add_key_column_is_refused() {
        let column = ColumnDefinition::new("sku", DataType::Text)
            .with_constraint(ColumnConstraint::Unique);
        let err = column.add_column_sql("widgets").unwrap_err();
        assert!(matches!(err, OrmError::Migration { .. }));
    }

    #[test]
    fn test_blob_backfill_is_an_empty_blob() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn, &widgets_v1()).unwrap();
        conn.execute("INSERT INTO widgets (name) VALUES (?1)", ["bolt"])
            .unwrap();

        let v2 = widgets_v1().add_column(ColumnDefinition::new("data", DataType::Blob).not_null());
        migrate(&conn, &v2).unwrap();

        let (kind, len): (String, i64) = conn
            .query_row("SELECT typeof(data), length(data) FROM widgets", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(kind, "blob");
        assert_eq!(len, 0);
    }

    #[test]
    fn test_blob_default_renders_as_hex() {
        let column = ColumnDefinition::new("data", DataType::Blob)
            .with_default(DefaultValue::Blob(vec![0x0a, 0xff]));
        assert!(column.sql().ends_with("DEFAULT X'0AFF'"));
    }

    #[test]
    fn test_failed_migration_leaves_table_unchanged() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn, &widgets_v1()).unwrap();

        let v2 = widgets_v1()
            .add_column(ColumnDefinition::new("weight", DataType::Integer).not_null())
            .add_column(
                ColumnDefinition::new("sku", DataType::Text)
                    .with_constraint(ColumnConstraint::Unique),
            );
        let err = migrate(&conn, &v2).unwrap_err();
        assert!(matches!(err, OrmError::Migration { .. }));
        assert_eq!(existing_columns(&conn, "widgets").unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_failed_statement_rolls_back_earlier_columns() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn, &widgets_v1()).unwrap();

        // The index names a column that does not exist, so it fails after
        // the ALTER for `weight` has already run.
        let v2 = widgets_v1()
            .add_column(ColumnDefinition::new("weight", DataType::Integer).not_null())
            .add_index(IndexDefinition::new("idx_widgets_missing", &["missing"]));
        assert!(matches!(
            migrate(&conn, &v2),
            Err(OrmError::Database(_))
        ));
        assert_eq!(existing_columns(&conn, "widgets").unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_non_finite_default_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        let table = widgets_v1().add_column(
            ColumnDefinition::new("ratio", DataType::Real).with_default(DefaultValue::Real(f64::NAN)),
        );
        let err = migrate(&conn, &table).unwrap_err();
        assert!(matches!(err, OrmError::Migration { .. }));
        assert!(existing_columns(&conn, "widgets").unwrap().is_empty());

        let column = ColumnDefinition::new("ratio", DataType::Real)
            .with_default(DefaultValue::Real(f64::INFINITY));
        assert!(column.validate("widgets").is_err());
    }

    #[test]
    fn test_migrate_creates_then_adds_columns() {
        let conn = Connection::open_in_memory().unwrap();

        let report = migrate(&conn, &widgets_v1()).unwrap();
        assert!(report.created);
        assert!(report.added_columns.is_empty());

        conn.execute("INSERT INTO widgets (name) VALUES (?1)", ["bolt"])
            .unwrap();

        let v2 = widgets_v1()
            .add_column(ColumnDefinition::new("weight", DataType::Integer).not_null())
            .add_index(IndexDefinition::new("idx_widgets_weight", &["weight"]));
        let report = migrate(&conn, &v2).unwrap();
        assert!(!report.created);
        assert_eq!(report.added_columns, vec!["weight".to_string()]);

        // Existing rows survive and pick up the backfilled default.
        let weight: i64 = conn
            .query_row("SELECT weight FROM widgets WHERE name = 'bolt'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(weight, 0);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_widgets_weight'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        // Idempotent.
        let report = migrate(&conn, &v2).unwrap();
        assert!(!report.created);
        assert!(report.added_columns.is_empty());
    }
}
