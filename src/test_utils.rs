//! Shared test utilities for Stowage.
//!
//! Helpers for an in-memory `SQLite` backend and for stores and catalogs with
//! sensible defaults.

#![allow(clippy::clone_on_ref_ptr)]

use crate::{
    cache::LocalCache,
    config::{
        session::Session,
        settings::{Config, SeedLocation},
    },
    core::{Catalog, ItemStore, LocationStore},
    errors::Result,
    remote::DatabaseRemote,
};
use sea_orm::DatabaseConnection;
use std::{future::Future, path::Path, sync::Arc, time::Duration};

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A remote backend over a fresh in-memory database.
pub async fn setup_remote() -> Result<Arc<DatabaseRemote>> {
    Ok(Arc::new(DatabaseRemote::new(setup_test_db().await?)))
}

/// Local-only location store seeded with the default locations.
/// With `dir`, the store mirrors to that directory.
pub fn local_location_store(dir: Option<&Path>) -> LocationStore {
    let seeds = Config::default()
        .locations
        .iter()
        .map(SeedLocation::to_input)
        .collect();
    LocationStore::local(dir.map(LocalCache::locations), seeds)
}

/// Local-only catalog without a mirror or seeds.
pub fn local_catalog() -> Catalog {
    Catalog::new(
        Arc::new(LocationStore::local(None, Vec::new())),
        Arc::new(ItemStore::local(None)),
    )
}

/// Catalog backed by `remote` for `user_id`.
pub fn remote_catalog(remote: &Arc<DatabaseRemote>, user_id: &str) -> Catalog {
    let session = Session::signed_in(user_id);
    Catalog::new(
        Arc::new(LocationStore::remote(remote.clone(), session.clone(), None)),
        Arc::new(ItemStore::remote(remote.clone(), session, None)),
    )
}

/// Lets spawned tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Polls `condition` until it holds, panicking after about two seconds.
#[allow(clippy::panic)]
pub async fn wait_until<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
