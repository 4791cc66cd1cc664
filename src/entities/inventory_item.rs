//! Inventory item entity - A physical item owned by a user.
//!
//! `location_name` is the display label. `location_id` is set when the item sits in a
//! storage location and `container_id` when it sits inside a container-item. Neither
//! is a foreign key, so deleting the target orphans the item instead of failing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    /// UUID assigned at creation
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the row; every query is scoped by it
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Optional free text
    pub description: Option<String>,
    /// Display label of the location or container-item
    pub location_name: String,
    /// Storage location id, when addressed to a storage location
    pub location_id: Option<String>,
    /// Container-item id, when addressed to another item
    pub container_id: Option<String>,
    /// Number of units, at least 1
    pub quantity: i32,
    /// Opaque icon key
    pub icon: Option<String>,
    /// Opaque style token
    pub color: Option<String>,
    /// Whether other items can be placed inside this one
    pub is_storage_item: bool,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `InventoryItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item has many tags
    #[sea_orm(has_many = "super::item_tag::Entity")]
    Tags,
}

impl Related<super::item_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
