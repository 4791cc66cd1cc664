//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the per-user tables behind the remote store.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod inventory_item;
pub mod item_tag;
pub mod storage_location;

// Re-export specific types to avoid conflicts
pub use inventory_item::{
    Column as InventoryItemColumn, Entity as InventoryItem, Model as InventoryItemModel,
};
pub use item_tag::{Column as ItemTagColumn, Entity as ItemTag, Model as ItemTagModel};
pub use storage_location::{
    Column as StorageLocationColumn, Entity as StorageLocation, Model as StorageLocationModel,
};
