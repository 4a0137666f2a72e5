//! Quickstart walkthrough.
//!
//! Opens `test.db`, migrates the `products` table, then creates, reads,
//! updates and soft-deletes a single product.

use anyhow::{Context, Result};
use sqlite_orm::{Database, OrmError, Params, Product, Query, SqliteConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlite_orm=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SqliteConfig::default();
    let db = Database::open(&config).context("failed to connect database")?;

    // Migrate the schema
    db.auto_migrate::<Product>()
        .context("failed to migrate products")?;

    // Create
    db.create(&mut Product::new("D42", 100))
        .context("failed to create product")?;

    // Read
    let mut product = Product::default();
    read_first(&db, &mut product, Query::from(1))?;
    read_first(&db, &mut product, Query::raw("code = ?", vec!["D42".into()]))?;

    // Update - update product's price to 200
    let mut model = db.model(&mut product);
    model.update("Price", 200).context("failed to update price")?;
    // Update - update multiple fields
    model
        .updates(&Product::new("F42", 200))
        .context("failed to update non-zero fields")?;
    model
        .updates_map(Params::new().with_value("Price", 200).with_value("Code", "F42"))
        .context("failed to update fields from map")?;
    tracing::info!(product = ?model.record(), "product updated");

    // Delete - delete product
    db.delete::<Product>(1).context("failed to delete product")?;

    Ok(())
}

/// A miss leaves `out` as it was and the walkthrough carries on.
fn read_first(db: &Database, out: &mut Product, query: Query) -> Result<()> {
    match db.first(out, query) {
        Ok(()) => {
            tracing::info!(id = out.id(), code = %out.code, price = out.price, "product found");
            Ok(())
        }
        Err(OrmError::RecordNotFound) => {
            tracing::warn!("product not found");
            Ok(())
        }
        Err(e) => Err(e).context("failed to read product"),
    }
}
