//! Item store and the read-only [`Inventory`] snapshot it serves queries from.
//!
//! Items name their location by display label. The resolved [`crate::models::LocationRef`]
//! is set by the catalog before an item reaches this store; the store itself never
//! resolves names.

use crate::{
    cache::LocalCache,
    config::session::Session,
    core::sync::{Backend, SyncState},
    errors::{Error, Result},
    models::{InventoryItem, ItemInput, ItemPatch},
    remote::{RemoteStore, Subscription, Table},
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::{
    cmp::Ordering,
    sync::{Arc, Weak},
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Ordering for [`Inventory::sorted`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    /// Alphabetical by item name
    Name,
    /// Alphabetical by location label
    Location,
    /// Newest first
    #[default]
    Recent,
}

/// Snapshot of all items in collection order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<InventoryItem>,
}

impl Inventory {
    /// Wraps a collection already in display order.
    #[must_use]
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in collection order.
    #[must_use]
    pub fn as_slice(&self) -> &[InventoryItem] {
        &self.items
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// First container-item in collection order with exactly this name.
    #[must_use]
    pub fn find_container_by_name(&self, name: &str) -> Option<&InventoryItem> {
        self.items
            .iter()
            .find(|item| item.is_storage_item && item.name == name)
    }

    /// Case-insensitive search over name, location label, description and tag
    /// names and values. An empty query matches everything.
    #[must_use]
    pub fn filtered_by(&self, query: &str) -> Vec<&InventoryItem> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.items.iter().collect();
        }
        self.items.iter().filter(|item| item.matches(&query)).collect()
    }

    /// Items whose stored label equals `location` exactly.
    #[must_use]
    pub fn by_location(&self, location: &str) -> Vec<&InventoryItem> {
        self.items
            .iter()
            .filter(|item| item.location == location)
            .collect()
    }

    /// Items at `location` that are not themselves containers.
    #[must_use]
    pub fn loose_in(&self, location: &str) -> Vec<&InventoryItem> {
        self.items
            .iter()
            .filter(|item| item.location == location && !item.is_storage_item)
            .collect()
    }

    /// Items that can hold other items.
    #[must_use]
    pub fn storage_items(&self) -> Vec<&InventoryItem> {
        self.items.iter().filter(|item| item.is_storage_item).collect()
    }

    /// Items carrying the tag with id `tag_id`.
    #[must_use]
    pub fn by_tag(&self, tag_id: &str) -> Vec<&InventoryItem> {
        self.items
            .iter()
            .filter(|item| item.tags.iter().any(|tag| tag.id == tag_id))
            .collect()
    }

    /// All items in the requested order. Ties keep collection order.
    #[must_use]
    pub fn sorted(&self, sort: ItemSort) -> Vec<&InventoryItem> {
        let mut items: Vec<&InventoryItem> = self.items.iter().collect();
        items.sort_by(|a, b| match sort {
            ItemSort::Name => compare_labels(&a.name, &b.name),
            ItemSort::Location => compare_labels(&a.location, &b.location),
            ItemSort::Recent => b.created_at.cmp(&a.created_at),
        });
        items
    }

    /// Sum of unit price times quantity over all items.
    ///
    /// # Errors
    /// Returns [`Error::ValueOverflow`] when the sum leaves the decimal range.
    pub fn total_value(&self) -> Result<Decimal> {
        sum_values(&self.items)
    }

    fn insert_front(&mut self, item: InventoryItem) {
        self.items.retain(|existing| existing.id != item.id);
        self.items.insert(0, item);
    }

    fn replace(&mut self, item: InventoryItem) {
        if let Some(slot) = self.items.iter_mut().find(|i| i.id == item.id) {
            *slot = item;
        }
    }

    fn remove(&mut self, id: &str) -> Option<InventoryItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Inventory items of the current user.
pub struct ItemStore {
    inventory: RwLock<Inventory>,
    search_query: RwLock<String>,
    session: RwLock<Session>,
    backend: Backend,
    cache: Option<LocalCache>,
    state: SyncState,
}

impl ItemStore {
    /// A store persisted only to the local mirror.
    #[must_use]
    pub fn local(cache: Option<LocalCache>) -> Self {
        Self::with_backend(Backend::Local, Session::anonymous(), cache)
    }

    /// A store backed by a remote store, scoped to `session`.
    #[must_use]
    pub fn remote(remote: Arc<dyn RemoteStore>, session: Session, cache: Option<LocalCache>) -> Self {
        Self::with_backend(Backend::Remote(remote), session, cache)
    }

    fn with_backend(backend: Backend, session: Session, cache: Option<LocalCache>) -> Self {
        Self {
            inventory: RwLock::new(Inventory::default()),
            search_query: RwLock::new(String::new()),
            session: RwLock::new(session),
            backend,
            cache,
            state: SyncState::default(),
        }
    }

    /// Initial load: the mirror first, then the remote fetch when connected.
    pub async fn load(&self) -> Result<()> {
        if let Some(items) = self
            .cache
            .as_ref()
            .and_then(LocalCache::load_or_discard::<InventoryItem>)
        {
            info!("Loaded {} items from local mirror", items.len());
            *self.inventory.write().await = Inventory::new(items);
        }
        if matches!(self.backend, Backend::Remote(_)) {
            self.reload_all().await?;
        }
        self.state.mark_loaded();
        Ok(())
    }

    /// Replaces the whole collection with a fresh fetch and rewrites the mirror.
    pub async fn reload_all(&self) -> Result<()> {
        let session = self.session.read().await.clone();
        let items = match (&self.backend, session.user_id()) {
            (Backend::Local, _) => {
                let Some(items) = self
                    .cache
                    .as_ref()
                    .and_then(LocalCache::load_or_discard::<InventoryItem>)
                else {
                    self.state.mark_loaded();
                    return Ok(());
                };
                items
            }
            (Backend::Remote(_), None) => {
                debug!("No signed-in user, clearing items");
                Vec::new()
            }
            (Backend::Remote(remote), Some(user_id)) => {
                let _guard = self.state.begin();
                let fetched = remote
                    .select_items(user_id)
                    .await
                    .inspect_err(|e| error!("Failed to fetch items: {}", e));
                self.state.mark_loaded();
                let items = fetched?;
                self.cache_refresh(&items);
                items
            }
        };

        debug!("Item collection replaced with {} entries", items.len());
        *self.inventory.write().await = Inventory::new(items);
        self.state.mark_loaded();
        Ok(())
    }

    /// Switches the current user and reloads.
    pub async fn set_session(&self, session: Session) -> Result<()> {
        *self.session.write().await = session;
        self.reload_all().await
    }

    /// Reloads the collection on every remote item or tag change for the current user.
    pub async fn watch(self: &Arc<Self>) -> Option<Subscription> {
        let Backend::Remote(remote) = &self.backend else {
            return None;
        };
        let user_id = self.session.read().await.user_id()?.to_string();
        let store: Weak<Self> = Arc::downgrade(self);
        Some(remote.subscribe_to_changes(
            &user_id,
            Table::Items,
            Arc::new(move || {
                if let Some(store) = store.upgrade() {
                    tokio::spawn(async move {
                        if let Err(e) = store.reload_all().await {
                            warn!("Item reload after change failed: {}", e);
                        }
                    });
                }
            }),
        ))
    }

    /// Whether the initial load has completed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Whether a remote call is in flight.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.state.is_syncing()
    }

    /// Current search box contents.
    pub async fn search_query(&self) -> String {
        self.search_query.read().await.clone()
    }

    /// Sets the query used by [`ItemStore::filtered`].
    pub async fn set_search_query(&self, query: impl Into<String>) {
        *self.search_query.write().await = query.into();
    }

    /// Creates an item at the head of the collection.
    ///
    /// # Errors
    /// - [`Error::Validation`] for an empty name or location, or a bad price tag
    /// - [`Error::NotAuthenticated`] in remote mode without a user
    /// - [`Error::RemoteOperationFailed`] if the backend rejects the insert
    pub async fn add(&self, input: ItemInput) -> Result<InventoryItem> {
        let item = input.into_item(uuid::Uuid::new_v4().to_string(), Utc::now())?;
        let session = self.session.read().await.clone();

        let item = match self.backend.target(&session)? {
            Some((remote, user_id)) => {
                let _guard = self.state.begin();
                remote
                    .insert_item(user_id, &item)
                    .await
                    .inspect_err(|e| error!("Add item error: {}", e))?
            }
            None => item,
        };

        let mut inventory = self.inventory.write().await;
        inventory.insert_front(item.clone());
        self.cache_refresh(inventory.as_slice());
        info!("Created item {} x{} in {}", item.name, item.quantity, item.location);
        Ok(item)
    }

    /// Merges `patch` into the item. A tag list in the patch replaces every tag.
    /// An unknown id is a no-op.
    ///
    /// # Errors
    /// - [`Error::Validation`] for an empty name or location, or a bad price tag
    /// - [`Error::NotAuthenticated`] in remote mode without a user
    /// - [`Error::RemoteOperationFailed`] if the backend rejects the update
    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<()> {
        let updated = {
            let inventory = self.inventory.read().await;
            let Some(current) = inventory.get(id) else {
                debug!("Update of unknown item {} ignored", id);
                return Ok(());
            };
            patch.apply(current, Utc::now())?
        };

        let session = self.session.read().await.clone();
        if let Some((remote, user_id)) = self.backend.target(&session)? {
            let _guard = self.state.begin();
            remote
                .update_item(user_id, &updated)
                .await
                .inspect_err(|e| error!("Update item error: {}", e))?;
        }

        let mut inventory = self.inventory.write().await;
        inventory.replace(updated);
        self.cache_refresh(inventory.as_slice());
        debug!("Updated item {}", id);
        Ok(())
    }

    /// Deletes an item with its tags. Items inside a deleted container keep their label.
    ///
    /// # Errors
    /// - [`Error::NotAuthenticated`] in remote mode without a user
    /// - [`Error::RemoteOperationFailed`] if the backend rejects the delete
    pub async fn remove(&self, id: &str) -> Result<()> {
        let session = self.session.read().await.clone();
        if let Some((remote, user_id)) = self.backend.target(&session)? {
            let _guard = self.state.begin();
            remote
                .delete_item(user_id, id)
                .await
                .inspect_err(|e| error!("Delete item error: {}", e))?;
        }

        let mut inventory = self.inventory.write().await;
        if let Some(removed) = inventory.remove(id) {
            info!("Deleted item {} ({})", removed.name, removed.id);
        }
        self.cache_refresh(inventory.as_slice());
        Ok(())
    }

    /// A copy of the current collection for multi-step queries.
    pub async fn snapshot(&self) -> Inventory {
        self.inventory.read().await.clone()
    }

    /// All items, newest first.
    pub async fn all(&self) -> Vec<InventoryItem> {
        self.inventory.read().await.as_slice().to_vec()
    }

    /// Looks up an item by id.
    pub async fn get(&self, id: &str) -> Option<InventoryItem> {
        self.inventory.read().await.get(id).cloned()
    }

    /// Items matching the current search query.
    pub async fn filtered(&self) -> Vec<InventoryItem> {
        let query = self.search_query().await;
        self.filtered_by(&query).await
    }

    /// See [`Inventory::filtered_by`].
    pub async fn filtered_by(&self, query: &str) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.filtered_by(query))
    }

    /// See [`Inventory::by_location`].
    pub async fn by_location(&self, location: &str) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.by_location(location))
    }

    /// See [`Inventory::loose_in`].
    pub async fn loose_in(&self, location: &str) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.loose_in(location))
    }

    /// Items that can hold other items.
    pub async fn storage_items(&self) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.storage_items())
    }

    /// Items carrying the tag with id `tag_id`.
    pub async fn by_tag(&self, tag_id: &str) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.by_tag(tag_id))
    }

    /// See [`Inventory::sorted`].
    pub async fn sorted(&self, sort: ItemSort) -> Vec<InventoryItem> {
        cloned(self.inventory.read().await.sorted(sort))
    }

    /// Sum of unit price times quantity over all items.
    ///
    /// # Errors
    /// Returns [`Error::ValueOverflow`] when the sum leaves the decimal range.
    pub async fn total_value(&self) -> Result<Decimal> {
        self.inventory.read().await.total_value()
    }

    /// Pretty-printed JSON array of every item, timestamps in ISO-8601.
    ///
    /// # Errors
    /// Returns [`Error::Cache`] if serialization fails.
    pub async fn export_json(&self) -> Result<String> {
        let inventory = self.inventory.read().await;
        Ok(serde_json::to_string_pretty(inventory.as_slice())?)
    }

    /// Replaces the collection with items parsed from an export. Nothing changes unless
    /// every item is valid.
    ///
    /// # Errors
    /// - [`Error::Config`] when a remote backend is connected
    /// - [`Error::Cache`] for malformed JSON
    /// - [`Error::Validation`] for an item with an empty name or location, or a bad price
    pub async fn import_json(&self, json: &str) -> Result<usize> {
        if matches!(self.backend, Backend::Remote(_)) {
            return Err(Error::Config {
                message: "Import is only available in local-only mode".to_string(),
            });
        }
        let items = serde_json::from_str::<Vec<InventoryItem>>(json)?
            .into_iter()
            .map(InventoryItem::validated)
            .collect::<Result<Vec<_>>>()?;

        let count = items.len();
        self.cache_refresh(&items);
        *self.inventory.write().await = Inventory::new(items);
        info!("Imported {} items", count);
        Ok(count)
    }

    fn cache_refresh(&self, items: &[InventoryItem]) {
        if let Some(cache) = &self.cache {
            cache.refresh(items);
        }
    }
}

/// Checked sum of [`InventoryItem::value`].
pub(crate) fn sum_values<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Result<Decimal> {
    items.into_iter().try_fold(Decimal::ZERO, |total, item| {
        total.checked_add(item.value()).ok_or(Error::ValueOverflow)
    })
}

fn cloned(items: Vec<&InventoryItem>) -> Vec<InventoryItem> {
    items.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::clone_on_ref_ptr)]
    use super::*;
    use crate::models::{MAX_QUANTITY, TagInput, TagType};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_coerces_quantity_and_assigns_tag_ids() -> Result<()> {
        let store = ItemStore::local(None);
        let mut input = ItemInput::new("Socks", "Dresser", 0)
            .with_tag(TagInput::new("Color", Some("blue"), TagType::Custom));
        input.quantity = None;
        let socks = store.add(input).await?;

        assert_eq!(socks.quantity, 1);
        assert!(!socks.tags[0].id.is_empty());
        assert_eq!(store.all().await[0].id, socks.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_rejects_missing_fields_and_bad_price() {
        let store = ItemStore::local(None);
        assert!(matches!(
            store.add(ItemInput::new("", "Dresser", 1)).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            store.add(ItemInput::new("Socks", " ", 1)).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            store
                .add(ItemInput::new("Socks", "Dresser", 1).with_tag(TagInput::price("-2")))
                .await,
            Err(Error::Validation { .. })
        ));
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_total_value() -> Result<()> {
        let store = ItemStore::local(None);
        store
            .add(ItemInput::new("Batteries", "Drawer", 4).with_tag(TagInput::price("2.50")))
            .await?;
        store
            .add(ItemInput::new("Lamp", "Desk", 1).with_tag(TagInput::price("")))
            .await?;
        store.add(ItemInput::new("Rock", "Desk", 3)).await?;
        assert_eq!(store.total_value().await?, Decimal::from(10));
        Ok(())
    }

    #[tokio::test]
    async fn test_price_beyond_decimal_range_is_rejected() -> Result<()> {
        let store = ItemStore::local(None);
        let result = store
            .add(
                ItemInput::new("Gold", "Vault", 2)
                    .with_tag(TagInput::price("79228162514264337593543950335")),
            )
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.all().await.is_empty());
        assert_eq!(store.total_value().await?, Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_value_overflow_is_an_error() -> Result<()> {
        let store = ItemStore::local(None);
        let unit = (Decimal::MAX / Decimal::from(MAX_QUANTITY)).trunc().to_string();
        for name in ["Gold", "Platinum"] {
            store
                .add(
                    ItemInput::new(name, "Vault", i64::from(MAX_QUANTITY))
                        .with_tag(TagInput::price(&unit)),
                )
                .await?;
        }
        assert!(matches!(
            store.total_value().await,
            Err(Error::ValueOverflow)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_largest_quantity_matches_across_backends() -> Result<()> {
        let local = ItemStore::local(None);
        let kept = local.add(ItemInput::new("Rice", "Pantry", 3_000_000_000)).await?;

        let remote = setup_remote().await?;
        let store = ItemStore::remote(remote.clone(), Session::signed_in("alice"), None);
        store.load().await?;
        let stored = store.add(ItemInput::new("Rice", "Pantry", 3_000_000_000)).await?;
        assert_eq!(stored.quantity, kept.quantity);

        let fresh = ItemStore::remote(remote, Session::signed_in("alice"), None);
        fresh.load().await?;
        assert_eq!(fresh.get(&stored.id).await.unwrap().quantity, MAX_QUANTITY);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_whole_tag_set() -> Result<()> {
        let store = ItemStore::local(None);
        let lamp = store
            .add(
                ItemInput::new("Lamp", "Desk", 1)
                    .with_tag(TagInput::price("10"))
                    .with_tag(TagInput::new("Color", Some("red"), TagType::Custom)),
            )
            .await?;

        store
            .update(
                &lamp.id,
                ItemPatch::tags(vec![TagInput::new("Importance", Some("High"), TagType::Importance)]),
            )
            .await?;

        let updated = store.get(&lamp.id).await.unwrap();
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].tag_type, TagType::Importance);
        assert_eq!(store.total_value().await?, Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() -> Result<()> {
        let store = ItemStore::local(None);
        store.update("missing", ItemPatch::default()).await?;
        assert!(store.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_location_queries() -> Result<()> {
        let store = ItemStore::local(None);
        store
            .add(ItemInput::new("Toolbox", "Garage", 1).as_storage_item())
            .await?;
        store.add(ItemInput::new("Hammer", "Toolbox", 1)).await?;
        store.add(ItemInput::new("Bike", "Garage", 1)).await?;

        assert_eq!(store.by_location("Garage").await.len(), 2);
        let loose = store.loose_in("Garage").await;
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].name, "Bike");
        assert_eq!(store.storage_items().await[0].name, "Toolbox");
        assert!(store.by_location("garage").await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_covers_tags() -> Result<()> {
        let store = ItemStore::local(None);
        let scarf = store
            .add(
                ItemInput::new("Scarf", "Closet", 1)
                    .with_tag(TagInput::new("Material", Some("Wool"), TagType::Custom)),
            )
            .await?;
        store.add(ItemInput::new("Umbrella", "Closet", 1)).await?;

        store.set_search_query("WOOL").await;
        let found = store.filtered().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, scarf.id);
        assert_eq!(store.filtered_by("closet").await.len(), 2);

        let tag_id = scarf.tags[0].id.clone();
        assert_eq!(store.by_tag(&tag_id).await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sorted() -> Result<()> {
        let store = ItemStore::local(None);
        store.add(ItemInput::new("banana", "Pantry", 1)).await?;
        store.add(ItemInput::new("Apple", "Fridge", 1)).await?;
        store.add(ItemInput::new("cherry", "Bowl", 1)).await?;

        let names = |items: Vec<InventoryItem>| -> Vec<String> {
            items.into_iter().map(|i| i.name).collect()
        };
        assert_eq!(
            names(store.sorted(ItemSort::Name).await),
            vec!["Apple", "banana", "cherry"]
        );
        assert_eq!(
            names(store.sorted(ItemSort::Location).await),
            vec!["cherry", "Apple", "banana"]
        );
        assert_eq!(store.sorted(ItemSort::Recent).await.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_then_import_replaces_collection() -> Result<()> {
        let store = ItemStore::local(None);
        store
            .add(ItemInput::new("Camera", "Shelf", 1).with_tag(TagInput::price("300")))
            .await?;
        let exported = store.export_json().await?;
        assert!(exported.contains("\"createdAt\""));

        let other = ItemStore::local(None);
        other.add(ItemInput::new("Old", "Box", 1)).await?;
        assert_eq!(other.import_json(&exported).await?, 1);
        assert_eq!(other.all().await, store.all().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_items() -> Result<()> {
        let store = ItemStore::local(None);
        store.add(ItemInput::new("Keep", "Box", 1)).await?;

        let bad = r#"[{"id":"1","name":"","location":"Box","quantity":1,
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}]"#;
        assert!(matches!(
            store.import_json(bad).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            store.import_json("not json").await,
            Err(Error::Cache { .. })
        ));
        assert_eq!(store.all().await[0].name, "Keep");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_requires_local_mode() -> Result<()> {
        let remote = setup_remote().await?;
        let store = ItemStore::remote(remote, Session::signed_in("alice"), None);
        assert!(matches!(
            store.import_json("[]").await,
            Err(Error::Config { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_mirror_survives_restart() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = ItemStore::local(Some(LocalCache::items(dir.path())));
        store.load().await?;
        store.add(ItemInput::new("Tent", "Garage", 1)).await?;

        let reopened = ItemStore::local(Some(LocalCache::items(dir.path())));
        reopened.load().await?;
        assert_eq!(reopened.all().await, store.all().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_requires_user() -> Result<()> {
        let remote = setup_remote().await?;
        let store = ItemStore::remote(remote, Session::anonymous(), None);
        store.load().await?;
        assert!(matches!(
            store.add(ItemInput::new("Tent", "Garage", 1)).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(store.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_update_persists_tags() -> Result<()> {
        let remote = setup_remote().await?;
        let store = ItemStore::remote(remote.clone(), Session::signed_in("alice"), None);
        store.load().await?;
        let tent = store
            .add(ItemInput::new("Tent", "Garage", 1).with_tag(TagInput::price("80")))
            .await?;
        store
            .update(
                &tent.id,
                ItemPatch {
                    quantity: Some(2),
                    ..ItemPatch::default()
                },
            )
            .await?;

        let fresh = ItemStore::remote(remote, Session::signed_in("alice"), None);
        fresh.load().await?;
        assert_eq!(fresh.total_value().await?, Decimal::from(160));
        Ok(())
    }

    #[tokio::test]
    async fn test_watch_reloads_on_remote_change() -> Result<()> {
        let remote = setup_remote().await?;
        let store = Arc::new(ItemStore::remote(
            remote.clone(),
            Session::signed_in("alice"),
            None,
        ));
        store.load().await?;
        let subscription = store.watch().await.unwrap();

        let other_client = ItemStore::remote(remote, Session::signed_in("alice"), None);
        other_client.add(ItemInput::new("Tent", "Garage", 1)).await?;
        wait_until(|| async { store.all().await.len() == 1 }).await;

        subscription.unsubscribe();
        other_client.add(ItemInput::new("Stove", "Garage", 1)).await?;
        settle().await;
        assert_eq!(store.all().await.len(), 1);
        Ok(())
    }
}
