//! Storage location entity - One node of a user's location tree.
//!
//! `parent_id` is deliberately not a foreign key: deleting a location leaves its
//! children in place with a dangling parent, and they are read back as roots.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage location database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_locations")]
pub struct Model {
    /// UUID assigned at creation
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the row; every query is scoped by it
    pub user_id: String,
    /// Display name (e.g., "Bedroom", "Top Drawer")
    pub name: String,
    /// One of `drawer`, `bag`, `room`, `cabinet`, `shelf`, `other`
    pub location_type: String,
    /// Optional free text
    pub description: Option<String>,
    /// Opaque style token
    pub color: Option<String>,
    /// Opaque icon-set key
    pub icon: Option<String>,
    /// Parent location id, `None` for roots
    pub parent_id: Option<String>,
    /// When the location was created
    pub created_at: DateTimeUtc,
    /// When the location was last modified
    pub updated_at: DateTimeUtc,
}

/// Storage locations have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
