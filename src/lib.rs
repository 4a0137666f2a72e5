//! Model-oriented persistence over a single SQLite file.
//!
//! # Intention
//!
//! - Declare a record type once ([`Model`]) and get its table, auto-migration,
//!   CRUD and soft delete from [`Database`].
//! - Keep every statement parameterized; column names are resolved against
//!   the declared schema, values are always bound.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - Migration only adds tables, columns and indexes; it is not a versioned
//!   migration framework.
//! - Single connection, blocking calls, no cross-operation transactions.
//!
//! # Example
//!
//! ```no_run
//! use sqlite_orm::{Database, Params, Product, Query, SqliteConfig};
//!
//! # fn main() -> Result<(), sqlite_orm::OrmError> {
//! let db = Database::open(&SqliteConfig::default())?;
//! db.auto_migrate::<Product>()?;
//!
//! let mut product = Product::new("D42", 100);
//! db.create(&mut product)?;
//!
//! db.first(&mut product, Query::raw("code = ?", vec!["D42".into()]))?;
//! db.model(&mut product)
//!     .updates_map(Params::new().with_value("price", 200).with_value("code", "F42"))?;
//!
//! db.delete::<Product>(product.id())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod product;
pub mod query;
pub mod schema;
pub mod scope;
pub mod sqlite;
pub mod value;

pub use config::SqliteConfig;
pub use error::OrmError;
pub use model::{Model, ModelBase};
pub use product::Product;
pub use query::{Params, Query, QueryOperator};
pub use schema::{
    ColumnConstraint, ColumnDefinition, DataType, DefaultValue, IndexDefinition, MigrationReport,
    TableDefinition,
};
pub use scope::ModelScope;
pub use sqlite::Database;
pub use value::Value;
