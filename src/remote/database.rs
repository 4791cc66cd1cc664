//! `SeaORM`-backed remote store.
//!
//! Every query filters on `user_id`, which gives each user an isolated view of the
//! shared tables. Item and tag writes run inside one database transaction, so an item is
//! never left persisted with a partial tag set.

use crate::{
    entities::{inventory_item, item_tag, storage_location},
    errors::{Error, Result},
    models::{
        InventoryItem, ItemTag, LocationRef, LocationType, MAX_QUANTITY, StorageLocation,
        TagType, coerce_quantity,
    },
    remote::{ChangeCallback, ChangeFeed, RemoteStore, Subscription, Table},
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Remote store over a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct DatabaseRemote {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl DatabaseRemote {
    /// Wraps a connection whose tables already exist.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            feed: ChangeFeed::new(),
        }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The feed every committed write is published on.
    #[must_use]
    pub const fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Fetches one location owned by `user_id`.
    pub async fn fetch_location(&self, user_id: &str, id: &str) -> Result<Option<StorageLocation>> {
        let row = storage_location::Entity::find_by_id(id.to_string())
            .filter(storage_location::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(row.map(location_from_row))
    }

    /// Fetches one item owned by `user_id`, with its tags.
    pub async fn fetch_item(&self, user_id: &str, id: &str) -> Result<Option<InventoryItem>> {
        let Some(row) = inventory_item::Entity::find_by_id(id.to_string())
            .filter(inventory_item::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let tags = item_tag::Entity::find()
            .filter(item_tag::Column::ItemId.eq(id))
            .order_by_asc(item_tag::Column::Position)
            .all(&self.db)
            .await?
            .into_iter()
            .map(tag_from_row)
            .collect();
        Ok(Some(item_from_row(row, tags)))
    }
}

#[async_trait]
impl RemoteStore for DatabaseRemote {
    async fn select_locations(&self, user_id: &str) -> Result<Vec<StorageLocation>> {
        let rows = storage_location::Entity::find()
            .filter(storage_location::Column::UserId.eq(user_id))
            .order_by_desc(storage_location::Column::CreatedAt)
            .all(&self.db)
            .await?;
        debug!("Fetched {} locations for user {}", rows.len(), user_id);
        Ok(rows.into_iter().map(location_from_row).collect())
    }

    async fn insert_location(
        &self,
        user_id: &str,
        location: &StorageLocation,
    ) -> Result<StorageLocation> {
        let mut row = location_columns(location);
        row.id = Set(location.id.clone());
        row.user_id = Set(user_id.to_string());
        row.created_at = Set(location.created_at);

        storage_location::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await?;
        self.feed.publish(user_id, Table::Locations);
        info!("Inserted location {} ({})", location.name, location.id);

        self.fetch_location(user_id, &location.id)
            .await?
            .ok_or_else(|| Error::RemoteOperationFailed {
                message: format!("Location {} vanished after insert", location.id),
            })
    }

    async fn update_location(&self, user_id: &str, location: &StorageLocation) -> Result<()> {
        let result = storage_location::Entity::update_many()
            .set(location_columns(location))
            .filter(storage_location::Column::Id.eq(location.id.as_str()))
            .filter(storage_location::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::RemoteOperationFailed {
                message: format!("Location {} not found", location.id),
            });
        }
        self.feed.publish(user_id, Table::Locations);
        debug!("Updated location {}", location.id);
        Ok(())
    }

    async fn delete_location(&self, user_id: &str, id: &str) -> Result<()> {
        let result = storage_location::Entity::delete_many()
            .filter(storage_location::Column::Id.eq(id))
            .filter(storage_location::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            self.feed.publish(user_id, Table::Locations);
            info!("Deleted location {}", id);
        }
        Ok(())
    }

    async fn select_items(&self, user_id: &str) -> Result<Vec<InventoryItem>> {
        let rows = inventory_item::Entity::find()
            .filter(inventory_item::Column::UserId.eq(user_id))
            .order_by_desc(inventory_item::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut tags_by_item: HashMap<String, Vec<ItemTag>> = HashMap::new();
        if !rows.is_empty() {
            let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
            let tag_rows = item_tag::Entity::find()
                .filter(item_tag::Column::ItemId.is_in(ids))
                .order_by_asc(item_tag::Column::Position)
                .all(&self.db)
                .await?;
            for row in tag_rows {
                tags_by_item
                    .entry(row.item_id.clone())
                    .or_default()
                    .push(tag_from_row(row));
            }
        }
        debug!("Fetched {} items for user {}", rows.len(), user_id);

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = tags_by_item.remove(&row.id).unwrap_or_default();
                item_from_row(row, tags)
            })
            .collect())
    }

    async fn insert_item(&self, user_id: &str, item: &InventoryItem) -> Result<InventoryItem> {
        let mut row = item_columns(item);
        row.id = Set(item.id.clone());
        row.user_id = Set(user_id.to_string());
        row.created_at = Set(item.created_at);

        let txn = self.db.begin().await?;
        inventory_item::Entity::insert(row)
            .exec_without_returning(&txn)
            .await?;
        insert_tags(&txn, &item.id, &item.tags).await?;
        txn.commit().await?;

        self.feed.publish(user_id, Table::Items);
        info!(
            "Inserted item {} ({}) with {} tags",
            item.name,
            item.id,
            item.tags.len()
        );

        self.fetch_item(user_id, &item.id)
            .await?
            .ok_or_else(|| Error::RemoteOperationFailed {
                message: format!("Item {} vanished after insert", item.id),
            })
    }

    async fn update_item(&self, user_id: &str, item: &InventoryItem) -> Result<()> {
        let txn = self.db.begin().await?;
        let result = inventory_item::Entity::update_many()
            .set(item_columns(item))
            .filter(inventory_item::Column::Id.eq(item.id.as_str()))
            .filter(inventory_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::RemoteOperationFailed {
                message: format!("Item {} not found", item.id),
            });
        }

        item_tag::Entity::delete_many()
            .filter(item_tag::Column::ItemId.eq(item.id.as_str()))
            .exec(&txn)
            .await?;
        insert_tags(&txn, &item.id, &item.tags).await?;
        txn.commit().await?;

        self.feed.publish(user_id, Table::Items);
        debug!("Updated item {}", item.id);
        Ok(())
    }

    async fn delete_item(&self, user_id: &str, id: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        let result = inventory_item::Entity::delete_many()
            .filter(inventory_item::Column::Id.eq(id))
            .filter(inventory_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if result.rows_affected > 0 {
            item_tag::Entity::delete_many()
                .filter(item_tag::Column::ItemId.eq(id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        if result.rows_affected > 0 {
            self.feed.publish(user_id, Table::Items);
            info!("Deleted item {}", id);
        }
        Ok(())
    }

    fn subscribe_to_changes(
        &self,
        user_id: &str,
        table: Table,
        on_change: ChangeCallback,
    ) -> Subscription {
        self.feed.subscribe(user_id, table, on_change)
    }
}

async fn insert_tags<C: ConnectionTrait>(conn: &C, item_id: &str, tags: &[ItemTag]) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }
    let rows = tags.iter().enumerate().map(|(position, tag)| item_tag::ActiveModel {
        id: Set(tag.id.clone()),
        item_id: Set(item_id.to_string()),
        name: Set(tag.name.clone()),
        value: Set(tag.value.clone()),
        tag_type: Set(tag.tag_type.as_str().to_string()),
        position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
    });
    item_tag::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Mutable columns of a location; id, owner and creation time are left unset.
fn location_columns(location: &StorageLocation) -> storage_location::ActiveModel {
    storage_location::ActiveModel {
        name: Set(location.name.clone()),
        location_type: Set(location.location_type.as_str().to_string()),
        description: Set(location.description.clone()),
        color: Set(location.color.clone()),
        icon: Set(location.icon.clone()),
        parent_id: Set(location.parent_id.clone()),
        updated_at: Set(location.updated_at),
        ..Default::default()
    }
}

/// Mutable columns of an item; id, owner and creation time are left unset.
fn item_columns(item: &InventoryItem) -> inventory_item::ActiveModel {
    let (location_id, container_id) = match &item.location_ref {
        Some(LocationRef::Location { id }) => (Some(id.clone()), None),
        Some(LocationRef::Container { id }) => (None, Some(id.clone())),
        None => (None, None),
    };
    inventory_item::ActiveModel {
        name: Set(item.name.clone()),
        description: Set(item.description.clone()),
        location_name: Set(item.location.clone()),
        location_id: Set(location_id),
        container_id: Set(container_id),
        quantity: Set(i32::try_from(item.quantity.min(MAX_QUANTITY)).unwrap_or(i32::MAX)),
        icon: Set(item.icon.clone()),
        color: Set(item.color.clone()),
        is_storage_item: Set(item.is_storage_item),
        updated_at: Set(item.updated_at),
        ..Default::default()
    }
}

fn location_from_row(row: storage_location::Model) -> StorageLocation {
    let location_type = row.location_type.parse().unwrap_or_else(|_| {
        warn!(
            "Unknown location type {:?} on {}, reading it as other",
            row.location_type, row.id
        );
        LocationType::Other
    });
    StorageLocation {
        id: row.id,
        name: row.name,
        location_type,
        description: row.description,
        color: row.color,
        icon: row.icon,
        parent_id: row.parent_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn tag_from_row(row: item_tag::Model) -> ItemTag {
    let tag_type = row.tag_type.parse().unwrap_or_else(|_| {
        warn!("Unknown tag type {:?} on {}, reading it as custom", row.tag_type, row.id);
        TagType::Custom
    });
    ItemTag {
        id: row.id,
        name: row.name,
        value: row.value,
        tag_type,
    }
}

fn item_from_row(row: inventory_item::Model, tags: Vec<ItemTag>) -> InventoryItem {
    let location_ref = match (row.location_id, row.container_id) {
        (Some(id), _) => Some(LocationRef::Location { id }),
        (None, Some(id)) => Some(LocationRef::Container { id }),
        (None, None) => None,
    };
    InventoryItem {
        id: row.id,
        name: row.name,
        description: row.description,
        location: row.location_name,
        location_ref,
        quantity: coerce_quantity(Some(i64::from(row.quantity))),
        icon: row.icon,
        color: row.color,
        is_storage_item: row.is_storage_item,
        tags,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
