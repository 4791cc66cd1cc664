//! Item tag entity - A labelled attribute of an inventory item.
//!
//! Tags are keyed by `(id, item_id)` and removed together with their item.
//! `position` keeps insertion order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item tag database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_tags")]
pub struct Model {
    /// Tag id, unique within its item
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning item
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: String,
    /// Label
    pub name: String,
    /// Optional value; numeric for price tags
    pub value: Option<String>,
    /// One of `price`, `type`, `importance`, `custom`
    pub tag_type: String,
    /// Display order within the item
    pub position: i32,
}

/// Defines relationships between `ItemTag` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each tag belongs to one item
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
