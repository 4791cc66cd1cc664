//! Catalog - the write path that ties items to locations.
//!
//! Item writes go through here so that the location name typed by the user is resolved
//! against the current collections before the item store sees it. Reads refresh item
//! labels from their resolved references.

use crate::{
    core::{
        item::{Inventory, ItemStore},
        location::LocationStore,
        report::{self, LocationSummary},
        resolver::{NamePrecedence, ResolvedLocation, Resolver},
    },
    errors::{Error, Result},
    models::{InventoryItem, ItemInput, ItemPatch, LocationPatch, LocationRef},
    remote::Subscription,
};
use std::{collections::HashSet, sync::Arc};
use tracing::info;

/// Both stores plus the resolver.
pub struct Catalog {
    locations: Arc<LocationStore>,
    items: Arc<ItemStore>,
    resolver: Resolver,
}

impl Catalog {
    /// Catalog where a storage location wins over a container-item of the same name.
    #[must_use]
    pub fn new(locations: Arc<LocationStore>, items: Arc<ItemStore>) -> Self {
        Self::with_precedence(locations, items, NamePrecedence::default())
    }

    /// Catalog with an explicit rule for names shared by a location and a container-item.
    #[must_use]
    pub fn with_precedence(
        locations: Arc<LocationStore>,
        items: Arc<ItemStore>,
        precedence: NamePrecedence,
    ) -> Self {
        Self {
            locations,
            items,
            resolver: Resolver::new(precedence),
        }
    }

    /// The location store.
    #[must_use]
    pub fn locations(&self) -> &Arc<LocationStore> {
        &self.locations
    }

    /// The item store.
    #[must_use]
    pub fn item_store(&self) -> &Arc<ItemStore> {
        &self.items
    }

    /// Loads locations first so item labels can be resolved against them.
    pub async fn load(&self) -> Result<()> {
        self.locations.load().await?;
        self.items.load().await
    }

    /// Reloads both collections.
    pub async fn reload_all(&self) -> Result<()> {
        self.locations.reload_all().await?;
        self.items.reload_all().await
    }

    /// Subscribes both stores to remote changes. Empty in local-only mode.
    pub async fn watch(&self) -> Vec<Subscription> {
        let mut subscriptions = Vec::with_capacity(2);
        subscriptions.extend(self.locations.watch().await);
        subscriptions.extend(self.items.watch().await);
        subscriptions
    }

    /// Resolves `name` against the current collections.
    ///
    /// # Errors
    /// See [`Resolver::resolve`].
    pub async fn resolve(&self, name: &str) -> Result<ResolvedLocation> {
        let tree = self.locations.snapshot().await;
        let inventory = self.items.snapshot().await;
        self.resolver.resolve(name, &tree, &inventory)
    }

    /// Names offered when picking an item's location.
    pub async fn candidate_names(&self) -> Vec<String> {
        let tree = self.locations.snapshot().await;
        let inventory = self.items.snapshot().await;
        Resolver::candidate_names(&tree, &inventory)
    }

    /// Creates an item in the location or container-item named by `input.location`.
    ///
    /// Required fields are checked before the name is resolved.
    ///
    /// # Errors
    /// - [`Error::Validation`] for missing fields or a bad price tag
    /// - [`Error::UnresolvedLocation`] when the location name matches nothing
    /// - any error of [`ItemStore::add`]
    pub async fn add_item(&self, mut input: ItemInput) -> Result<InventoryItem> {
        input.validate()?;
        let resolved = self.resolve(&input.location).await?;
        input.location = resolved.label;
        input.location_ref = Some(resolved.location_ref);
        self.items.add(input).await
    }

    /// Updates an item. A new location name in `patch` is resolved first.
    ///
    /// # Errors
    /// - [`Error::UnresolvedLocation`] when the new location name matches nothing
    /// - [`Error::Validation`] when a container-item would end up inside itself
    /// - any error of [`ItemStore::update`]
    pub async fn update_item(&self, id: &str, mut patch: ItemPatch) -> Result<()> {
        if let Some(name) = patch.location.take() {
            let resolved = self.resolve(&name).await?;
            if let LocationRef::Container { id: container_id } = &resolved.location_ref {
                self.check_not_inside_itself(id, container_id).await?;
            }
            patch.location = Some(resolved.label);
            patch.location_ref = Some(Some(resolved.location_ref));
        }
        self.items.update(id, patch).await
    }

    /// Moves an item to the location or container-item named `location`.
    ///
    /// # Errors
    /// See [`Catalog::update_item`].
    pub async fn move_item(&self, id: &str, location: &str) -> Result<()> {
        info!("Moving item {} to {}", id, location);
        self.update_item(
            id,
            ItemPatch {
                location: Some(location.to_string()),
                ..ItemPatch::default()
            },
        )
        .await
    }

    /// Reparents a location; `None` makes it a root.
    ///
    /// # Errors
    /// - [`Error::UnresolvedLocation`] when `new_parent` names no location
    /// - [`Error::CycleDetected`] when `new_parent` is the location or one of its descendants
    /// - any error of [`LocationStore::update`]
    pub async fn move_location(&self, id: &str, new_parent: Option<&str>) -> Result<()> {
        info!("Moving location {} under {:?}", id, new_parent);
        self.locations
            .update(id, LocationPatch::reparent(new_parent.map(str::to_string)))
            .await
    }

    /// Every item, with its label following renames of the referenced target.
    pub async fn items(&self) -> Vec<InventoryItem> {
        let tree = self.locations.snapshot().await;
        let inventory = self.items.snapshot().await;
        refreshed(&inventory, |item| {
            Resolver::display_label(item, &tree, &inventory)
        })
    }

    /// Items whose current label is `location`.
    pub async fn items_at(&self, location: &str) -> Vec<InventoryItem> {
        self.items()
            .await
            .into_iter()
            .filter(|item| item.location == location)
            .collect()
    }

    /// Items whose current label is `location`, excluding container-items.
    pub async fn loose_items_at(&self, location: &str) -> Vec<InventoryItem> {
        self.items()
            .await
            .into_iter()
            .filter(|item| item.location == location && !item.is_storage_item)
            .collect()
    }

    /// Summary of one location, or `None` for unknown ids.
    ///
    /// # Errors
    /// - [`Error::CycleDetected`] on a corrupt parent chain
    /// - [`Error::ValueOverflow`] when the held value leaves the decimal range
    pub async fn location_summary(&self, id: &str) -> Result<Option<LocationSummary>> {
        let tree = self.locations.snapshot().await;
        let inventory = Inventory::new(self.items().await);
        report::summarize(id, &tree, &inventory)
    }

    /// Summaries of every location.
    ///
    /// # Errors
    /// - [`Error::CycleDetected`] on a corrupt parent chain
    /// - [`Error::ValueOverflow`] when a held value leaves the decimal range
    pub async fn summaries(&self) -> Result<Vec<LocationSummary>> {
        let tree = self.locations.snapshot().await;
        let inventory = Inventory::new(self.items().await);
        report::summarize_all(&tree, &inventory)
    }

    /// Rejects placing `item_id` into `container_id` when the container is the item
    /// itself or sits somewhere inside it.
    async fn check_not_inside_itself(&self, item_id: &str, container_id: &str) -> Result<()> {
        let inventory = self.items.snapshot().await;
        let mut visited = HashSet::new();
        let mut cursor = Some(container_id);

        while let Some(current) = cursor {
            if current == item_id {
                return Err(Error::validation("An item cannot be placed inside itself"));
            }
            if !visited.insert(current) {
                break;
            }
            cursor = match inventory.get(current).and_then(|i| i.location_ref.as_ref()) {
                Some(LocationRef::Container { id }) => Some(id.as_str()),
                _ => None,
            };
        }
        Ok(())
    }
}

fn refreshed(inventory: &Inventory, label: impl Fn(&InventoryItem) -> String) -> Vec<InventoryItem> {
    inventory
        .as_slice()
        .iter()
        .map(|item| InventoryItem {
            location: label(item),
            ..item.clone()
        })
        .collect()
}
