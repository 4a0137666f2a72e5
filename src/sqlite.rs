use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::SqliteConfig;
use crate::error::OrmError;
use crate::model::{self, Model, CREATED_AT, DELETED_AT, ID, UPDATED_AT};
use crate::query::Query;
use crate::schema::{self, quote_ident, MigrationReport};
use crate::scope::ModelScope;
use crate::value::Value;

/// A handle to one SQLite database file.
///
/// All calls are blocking and run on the caller's thread. The connection is
/// closed when the handle is dropped.
pub struct Database {
    config: SqliteConfig,
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.config.db_path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open the database at `config.db_path`, creating the file when
    /// `create_if_missing` is set.
    pub fn open(config: &SqliteConfig) -> Result<Self, OrmError> {
        info!(path = %config.db_path.display(), "opening sqlite database");
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(&config.db_path, flags)
            .map_err(|source| OrmError::Connection {
                path: config.db_path.clone(),
                source,
            })?;
        Self::configure(conn, config.clone())
    }

    /// Create an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self, OrmError> {
        let config = SqliteConfig::new(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| OrmError::Connection {
            path: config.db_path.clone(),
            source,
        })?;
        Self::configure(conn, config)
    }

    fn configure(conn: Connection, config: SqliteConfig) -> Result<Self, OrmError> {
        let applied = conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .and_then(|_| conn.pragma_update(None, "foreign_keys", config.foreign_keys));
        if let Err(source) = applied {
            return Err(OrmError::Connection {
                path: config.db_path,
                source,
            });
        }
        Ok(Self { config, conn })
    }

    pub fn path(&self) -> &Path {
        &self.config.db_path
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// The underlying connection, for statements this layer does not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create or extend the table backing `M`.
    pub fn auto_migrate<M: Model>(&self) -> Result<MigrationReport, OrmError> {
        schema::migrate(&self.conn, &M::table())
    }

    /// Insert `model` and write the assigned id and timestamps back into it.
    ///
    /// A non-zero id on the model is inserted as given.
    pub fn create<M: Model>(&self, model: &mut M) -> Result<i64, OrmError> {
        let now = Utc::now();
        let base = model.base();
        let created_at = base.created_at.unwrap_or(now);
        let updated_at = base.updated_at.unwrap_or(now);

        let mut columns = vec![CREATED_AT, UPDATED_AT, DELETED_AT];
        let mut params = vec![
            Value::from(created_at),
            Value::from(updated_at),
            Value::from(base.deleted_at),
        ];
        if base.is_persisted() {
            columns.push(ID);
            params.push(Value::from(base.id));
        }
        for (column, value) in model.values() {
            columns.push(column);
            params.push(value);
        }

        let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(M::TABLE),
            quoted.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        self.execute(&sql, &params)?;

        let id = self.conn.last_insert_rowid();
        let base = model.base_mut();
        base.id = id;
        base.created_at = Some(created_at);
        base.updated_at = Some(updated_at);
        info!(table = M::TABLE, id, "record created");
        Ok(id)
    }

    /// Load the first matching active row into `out`, lowest id first.
    ///
    /// Returns [`OrmError::RecordNotFound`] and leaves `out` untouched when
    /// nothing matches.
    pub fn first<M: Model>(&self, out: &mut M, query: impl Into<Query>) -> Result<(), OrmError> {
        match self.select::<M>(&query.into(), Some(1))?.pop() {
            Some(found) => {
                *out = found;
                Ok(())
            }
            None => Err(OrmError::RecordNotFound),
        }
    }

    /// All matching rows, lowest id first.
    pub fn find<M: Model>(&self, query: impl Into<Query>) -> Result<Vec<M>, OrmError> {
        self.select(&query.into(), None)
    }

    pub fn count<M: Model>(&self, query: impl Into<Query>) -> Result<u64, OrmError> {
        let filter = query.into().filter::<M>()?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", quote_ident(M::TABLE), filter.sql);
        debug!(%sql, "count");
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Start an update against an already-identified model.
    pub fn model<'a, M: Model>(&'a self, model: &'a mut M) -> ModelScope<'a, M> {
        ModelScope::new(self, model)
    }

    /// Soft delete: stamp `deleted_at` on matching active rows.
    ///
    /// Rows stay in the table and remain visible to unscoped queries.
    /// `updated_at` keeps the time of the last update.
    pub fn delete<M: Model>(&self, query: impl Into<Query>) -> Result<usize, OrmError> {
        let query = query.into();
        if !query.has_conditions() {
            return Err(OrmError::MissingWhereClause { table: M::TABLE });
        }
        let filter = query.filter::<M>()?;
        let sql = format!(
            "UPDATE {} SET {} = ?{}",
            quote_ident(M::TABLE),
            quote_ident(DELETED_AT),
            filter.sql
        );
        let mut params = vec![Value::from(Utc::now())];
        params.extend(filter.params);

        let affected = self.execute(&sql, &params)?;
        info!(table = M::TABLE, affected, "records soft-deleted");
        Ok(affected)
    }

    /// Physically remove matching rows, soft-deleted ones included.
    pub fn delete_permanently<M: Model>(&self, query: impl Into<Query>) -> Result<usize, OrmError> {
        let query = query.into().unscoped();
        if !query.has_conditions() {
            return Err(OrmError::MissingWhereClause { table: M::TABLE });
        }
        let filter = query.filter::<M>()?;
        let sql = format!("DELETE FROM {}{}", quote_ident(M::TABLE), filter.sql);

        let affected = self.execute(&sql, &filter.params)?;
        info!(table = M::TABLE, affected, "records deleted permanently");
        Ok(affected)
    }

    fn select<M: Model>(&self, query: &Query, limit: Option<usize>) -> Result<Vec<M>, OrmError> {
        let table = M::table();
        let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
        let filter = query.filter::<M>()?;
        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC",
            columns.join(", "),
            quote_ident(M::TABLE),
            filter.sql,
            quote_ident(ID)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        debug!(%sql, params = ?filter.params, "select");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(model::from_row::<M>(row)?);
        }
        Ok(records)
    }

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    pub(crate) fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, OrmError> {
        debug!(%sql, ?params, "execute");
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }
}
