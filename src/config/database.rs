//! Database configuration module for the remote store.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{InventoryItem, ItemTag, StorageLocation};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/stowage.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the location, item and tag tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut location_table = schema.create_table_from_entity(StorageLocation);
    let mut item_table = schema.create_table_from_entity(InventoryItem);
    let mut tag_table = schema.create_table_from_entity(ItemTag);

    location_table.if_not_exists();
    item_table.if_not_exists();
    tag_table.if_not_exists();

    db.execute(builder.build(&location_table)).await?;
    db.execute(builder.build(&item_table)).await?;
    db.execute(builder.build(&tag_table)).await?;

    info!("Database tables are ready");
    Ok(())
}
