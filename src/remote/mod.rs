//! Remote persistence collaborator.
//!
//! The stores talk to the authoritative backend through [`RemoteStore`]. Every call is
//! scoped to one user id, and every committed write is announced on a [`ChangeFeed`] so
//! that subscribed stores can re-fetch their whole collection.

pub mod database;

use crate::errors::Result;
use crate::models::{InventoryItem, StorageLocation};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};

pub use database::DatabaseRemote;

const CHANGE_FEED_CAPACITY: usize = 64;

/// Table a change notification refers to. Tag writes count as item changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `storage_locations`
    Locations,
    /// `inventory_items` and `item_tags`
    Items,
}

/// "Something changed" signal for one user's rows in one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Owner of the changed rows
    pub user_id: String,
    /// Table that changed
    pub table: Table,
}

/// Callback invoked for every matching change.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Per-user CRUD contract of the authoritative backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All locations owned by `user_id`, newest first.
    async fn select_locations(&self, user_id: &str) -> Result<Vec<StorageLocation>>;

    /// Persists a new location and returns the stored row.
    async fn insert_location(
        &self,
        user_id: &str,
        location: &StorageLocation,
    ) -> Result<StorageLocation>;

    /// Overwrites the mutable fields of an existing location.
    async fn update_location(&self, user_id: &str, location: &StorageLocation) -> Result<()>;

    /// Deletes a location. Children and items are left untouched.
    async fn delete_location(&self, user_id: &str, id: &str) -> Result<()>;

    /// All items owned by `user_id` with their tags, newest first.
    async fn select_items(&self, user_id: &str) -> Result<Vec<InventoryItem>>;

    /// Persists a new item together with its tags.
    async fn insert_item(&self, user_id: &str, item: &InventoryItem) -> Result<InventoryItem>;

    /// Overwrites an item and replaces its whole tag set.
    async fn update_item(&self, user_id: &str, item: &InventoryItem) -> Result<()>;

    /// Deletes an item and its tags. Items inside it are left untouched.
    async fn delete_item(&self, user_id: &str, id: &str) -> Result<()>;

    /// Calls `on_change` whenever `table` changes for `user_id`, until the returned
    /// subscription is dropped.
    fn subscribe_to_changes(
        &self,
        user_id: &str,
        table: Table,
        on_change: ChangeCallback,
    ) -> Subscription;
}

/// Broadcast channel carrying committed-write notifications.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// An empty feed.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { sender }
    }

    /// Announces a change. Having no listeners is not an error.
    pub fn publish(&self, user_id: &str, table: Table) {
        let event = ChangeEvent {
            user_id: user_id.to_string(),
            table,
        };
        if self.sender.send(event).is_err() {
            debug!("No listeners for {:?} change of user {}", table, user_id);
        }
    }

    /// Spawns a listener that calls `on_change` for every matching event.
    ///
    /// Must be called from within a tokio runtime. Events published after this returns
    /// are never missed; a lagging listener gets one extra callback instead.
    pub fn subscribe(&self, user_id: &str, table: Table, on_change: ChangeCallback) -> Subscription {
        let mut receiver = self.sender.subscribe();
        let user_id = user_id.to_string();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.user_id == user_id && event.table == table => on_change(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change listener lagged by {} events, reloading", skipped);
                        on_change();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }
}

/// Handle of a change listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stops the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
