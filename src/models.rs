//! Domain records shared by the stores, the resolver and the persistence layer.
//!
//! Serialized field names follow the local mirror format: camelCase keys with
//! ISO-8601 timestamps.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kind of physical storage a location represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    /// A drawer or dresser
    Drawer,
    /// A bag, box or other portable container
    Bag,
    /// A room
    Room,
    /// A cabinet
    Cabinet,
    /// A shelf
    Shelf,
    /// Anything else
    Other,
}

impl LocationType {
    /// Every location type, in display order.
    pub const ALL: [Self; 6] = [
        Self::Drawer,
        Self::Bag,
        Self::Room,
        Self::Cabinet,
        Self::Shelf,
        Self::Other,
    ];

    /// Lowercase name used for persistence and text search.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drawer => "drawer",
            Self::Bag => "bag",
            Self::Room => "room",
            Self::Cabinet => "cabinet",
            Self::Shelf => "shelf",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown location type: {s}")))
    }
}

/// A node in the physical-organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageLocation {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// Display name, not guaranteed unique
    pub name: String,
    /// Kind of storage
    #[serde(rename = "type")]
    pub location_type: LocationType,
    /// Optional free text
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque style token
    #[serde(default)]
    pub color: Option<String>,
    /// Opaque icon-set key
    #[serde(default)]
    pub icon: Option<String>,
    /// Parent location id; `None` marks a root
    #[serde(default)]
    pub parent_id: Option<String>,
    /// When the location was created
    pub created_at: DateTime<Utc>,
    /// When the location was last modified
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInput {
    /// Display name
    pub name: String,
    /// Kind of storage
    pub location_type: LocationType,
    /// Optional free text
    pub description: Option<String>,
    /// Opaque style token
    pub color: Option<String>,
    /// Opaque icon-set key
    pub icon: Option<String>,
    /// Parent location id
    pub parent_id: Option<String>,
}

impl LocationInput {
    /// Input with only a name and type set.
    pub fn new(name: impl Into<String>, location_type: LocationType) -> Self {
        Self {
            name: name.into(),
            location_type,
            description: None,
            color: None,
            icon: None,
            parent_id: None,
        }
    }

    /// Sets the parent location.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn into_location(self, id: String, now: DateTime<Utc>) -> Result<StorageLocation> {
        let name = required(&self.name, "Location name")?;
        Ok(StorageLocation {
            id,
            name,
            location_type: self.location_type,
            description: self.description,
            color: self.color,
            icon: self.icon,
            parent_id: self.parent_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a location. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPatch {
    /// New display name
    pub name: Option<String>,
    /// New kind
    pub location_type: Option<LocationType>,
    /// New description
    pub description: Option<Option<String>>,
    /// New style token
    pub color: Option<Option<String>>,
    /// New icon key
    pub icon: Option<Option<String>>,
    /// New parent; `Some(None)` moves the location to the root
    pub parent_id: Option<Option<String>>,
}

impl LocationPatch {
    /// Patch that only reparents the location.
    #[must_use]
    pub const fn reparent(parent_id: Option<String>) -> Self {
        Self {
            name: None,
            location_type: None,
            description: None,
            color: None,
            icon: None,
            parent_id: Some(parent_id),
        }
    }

    /// Returns the merged record without touching `current`.
    pub(crate) fn apply(self, current: &StorageLocation, now: DateTime<Utc>) -> Result<StorageLocation> {
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = required(&name, "Location name")?;
        }
        if let Some(location_type) = self.location_type {
            next.location_type = location_type;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(color) = self.color {
            next.color = color;
        }
        if let Some(icon) = self.icon {
            next.icon = icon;
        }
        if let Some(parent_id) = self.parent_id {
            next.parent_id = parent_id;
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Category of an item tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// Monetary value per unit; the value must be a non-negative decimal
    Price,
    /// Free-form item type
    Type,
    /// Importance, conventionally one of [`IMPORTANCE_LEVELS`]
    Importance,
    /// Anything else
    Custom,
}

impl TagType {
    /// Lowercase name used for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Type => "type",
            Self::Importance => "importance",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price" => Ok(Self::Price),
            "type" => Ok(Self::Type),
            "importance" => Ok(Self::Importance),
            "custom" => Ok(Self::Custom),
            other => Err(Error::validation(format!("Unknown tag type: {other}"))),
        }
    }
}

/// Conventional importance values. Not enforced.
pub const IMPORTANCE_LEVELS: [&str; 4] = ["Low", "Medium", "High", "Critical"];

/// A labelled attribute attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTag {
    /// Unique within the owning item
    pub id: String,
    /// Label
    pub name: String,
    /// Optional value; numeric for price tags
    #[serde(default)]
    pub value: Option<String>,
    /// Tag category
    #[serde(rename = "type")]
    pub tag_type: TagType,
}

/// Fields supplied when attaching a tag. A missing id is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInput {
    /// Existing id to keep, if any
    pub id: Option<String>,
    /// Label
    pub name: String,
    /// Optional value
    pub value: Option<String>,
    /// Tag category
    pub tag_type: TagType,
}

impl TagInput {
    /// Builds a tag input without an id.
    pub fn new(name: impl Into<String>, value: Option<&str>, tag_type: TagType) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: value.map(str::to_string),
            tag_type,
        }
    }

    /// Price tag shorthand.
    pub fn price(value: &str) -> Self {
        Self::new("Price", Some(value), TagType::Price)
    }

    fn check(&self) -> Result<()> {
        required(&self.name, "Tag name")?;
        if self.tag_type == TagType::Price {
            parse_price(self.value.as_deref())?;
        }
        Ok(())
    }

    fn into_tag(self) -> Result<ItemTag> {
        self.check()?;
        let name = required(&self.name, "Tag name")?;
        Ok(ItemTag {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name,
            value: self.value,
            tag_type: self.tag_type,
        })
    }
}

impl From<ItemTag> for TagInput {
    fn from(tag: ItemTag) -> Self {
        Self {
            id: Some(tag.id),
            name: tag.name,
            value: tag.value,
            tag_type: tag.tag_type,
        }
    }
}

/// Validates a list of tag inputs, keeping their order.
pub(crate) fn build_tags(inputs: Vec<TagInput>) -> Result<Vec<ItemTag>> {
    inputs.into_iter().map(TagInput::into_tag).collect()
}

/// Parses a price tag value. Missing or blank values count as zero.
///
/// # Errors
/// Returns [`Error::Validation`] for non-numeric or negative values.
pub fn parse_price(value: Option<&str>) -> Result<Decimal> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Decimal::ZERO);
    };
    let price = Decimal::from_str(raw)
        .map_err(|_| Error::validation(format!("Price must be a number, got \"{raw}\"")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(Error::validation(format!(
            "Price cannot be negative, got \"{raw}\""
        )));
    }
    if price.checked_mul(Decimal::from(MAX_QUANTITY)).is_none() {
        return Err(Error::validation(format!("Price is too large, got \"{raw}\"")));
    }
    Ok(price)
}

/// Largest quantity an item can hold. Matches the database column range.
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// Coerces a raw quantity to an integer between 1 and [`MAX_QUANTITY`].
/// Missing or invalid input becomes 1.
#[must_use]
pub fn coerce_quantity(raw: Option<i64>) -> u32 {
    match raw {
        Some(q) if q >= 1 => u32::try_from(q).map_or(MAX_QUANTITY, |q| q.min(MAX_QUANTITY)),
        _ => 1,
    }
}

/// Structural reference to what an item sits in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LocationRef {
    /// A storage location, by id
    Location {
        /// Storage location id
        id: String,
    },
    /// A container-item, by id
    #[serde(rename = "item")]
    Container {
        /// Inventory item id
        id: String,
    },
}

impl LocationRef {
    /// Id of the referenced entity, whichever kind it is.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Location { id } | Self::Container { id } => id,
        }
    }
}

/// A physical item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Unique identifier, immutable
    pub id: String,
    /// Display name, never empty
    pub name: String,
    /// Optional free text
    #[serde(default)]
    pub description: Option<String>,
    /// Display label of the location or container-item holding this item
    pub location: String,
    /// Reference resolved at write time; absent for legacy mirror entries
    #[serde(default)]
    pub location_ref: Option<LocationRef>,
    /// Number of units, at least 1
    pub quantity: u32,
    /// Opaque icon key
    #[serde(default)]
    pub icon: Option<String>,
    /// Opaque style token
    #[serde(default)]
    pub color: Option<String>,
    /// Whether other items may be placed inside this one
    #[serde(default)]
    pub is_storage_item: bool,
    /// Tags in insertion order
    #[serde(default)]
    pub tags: Vec<ItemTag>,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// When the item was last modified
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Storage location id when the item sits directly in a storage location.
    #[must_use]
    pub fn location_id(&self) -> Option<&str> {
        match &self.location_ref {
            Some(LocationRef::Location { id }) => Some(id),
            _ => None,
        }
    }

    /// The price tag that counts toward value. When several exist, the first one wins.
    #[must_use]
    pub fn price_tag(&self) -> Option<&ItemTag> {
        self.tags.iter().find(|t| t.tag_type == TagType::Price)
    }

    /// Unit price times quantity. Unparseable or out-of-range mirror data counts as zero.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.price_tag()
            .and_then(|tag| parse_price(tag.value.as_deref()).ok())
            .and_then(|unit| unit.checked_mul(Decimal::from(self.quantity)))
            .unwrap_or(Decimal::ZERO)
    }

    /// Re-checks a record that did not come through [`ItemInput`], such as an import.
    pub(crate) fn validated(mut self) -> Result<Self> {
        self.name = required(&self.name, "Item name")?;
        self.location = required(&self.location, "Item location")?;
        self.quantity = self.quantity.clamp(1, MAX_QUANTITY);
        for tag in &self.tags {
            required(&tag.name, "Tag name")?;
            if tag.tag_type == TagType::Price {
                parse_price(tag.value.as_deref())?;
            }
        }
        Ok(self)
    }

    pub(crate) fn matches(&self, query: &str) -> bool {
        contains_ci(&self.name, query)
            || contains_ci(&self.location, query)
            || self
                .description
                .as_deref()
                .is_some_and(|d| contains_ci(d, query))
            || self.tags.iter().any(|tag| {
                contains_ci(&tag.name, query)
                    || tag.value.as_deref().is_some_and(|v| contains_ci(v, query))
            })
    }
}

/// Fields supplied when creating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    /// Display name
    pub name: String,
    /// Optional free text
    pub description: Option<String>,
    /// Display label of the target location
    pub location: String,
    /// Resolved reference, when known
    pub location_ref: Option<LocationRef>,
    /// Raw quantity, coerced to at least 1
    pub quantity: Option<i64>,
    /// Opaque icon key
    pub icon: Option<String>,
    /// Opaque style token
    pub color: Option<String>,
    /// Whether the item can hold other items
    pub is_storage_item: bool,
    /// Tags in display order
    pub tags: Vec<TagInput>,
}

impl ItemInput {
    /// Input with only a name, location label and quantity set.
    pub fn new(name: impl Into<String>, location: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            location: location.into(),
            location_ref: None,
            quantity: Some(quantity),
            icon: None,
            color: None,
            is_storage_item: false,
            tags: Vec::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: TagInput) -> Self {
        self.tags.push(tag);
        self
    }

    /// Marks the item as a container.
    #[must_use]
    pub const fn as_storage_item(mut self) -> Self {
        self.is_storage_item = true;
        self
    }

    /// Checks the required fields and price tags without building the item.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for an empty name, empty location or bad price.
    pub fn validate(&self) -> Result<()> {
        required(&self.name, "Item name")?;
        required(&self.location, "Item location")?;
        self.tags.iter().try_for_each(TagInput::check)
    }

    pub(crate) fn into_item(self, id: String, now: DateTime<Utc>) -> Result<InventoryItem> {
        let name = required(&self.name, "Item name")?;
        let location = required(&self.location, "Item location")?;
        let tags = build_tags(self.tags)?;
        Ok(InventoryItem {
            id,
            name,
            description: self.description,
            location,
            location_ref: self.location_ref,
            quantity: coerce_quantity(self.quantity),
            icon: self.icon,
            color: self.color,
            is_storage_item: self.is_storage_item,
            tags,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for an item. `tags`, when present, replaces the whole tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<Option<String>>,
    /// New location label. Without `location_ref`, the old reference is dropped.
    pub location: Option<String>,
    /// New resolved reference
    pub location_ref: Option<Option<LocationRef>>,
    /// New raw quantity, coerced to at least 1
    pub quantity: Option<i64>,
    /// New icon key
    pub icon: Option<Option<String>>,
    /// New style token
    pub color: Option<Option<String>>,
    /// New container flag
    pub is_storage_item: Option<bool>,
    /// Replacement tag set
    pub tags: Option<Vec<TagInput>>,
}

impl ItemPatch {
    /// Patch that replaces the tag set.
    #[must_use]
    pub fn tags(tags: Vec<TagInput>) -> Self {
        Self {
            tags: Some(tags),
            ..Self::default()
        }
    }

    /// Returns the merged record without touching `current`.
    pub(crate) fn apply(self, current: &InventoryItem, now: DateTime<Utc>) -> Result<InventoryItem> {
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = required(&name, "Item name")?;
        }
        if let Some(location) = self.location {
            next.location = required(&location, "Item location")?;
            if self.location_ref.is_none() {
                next.location_ref = None;
            }
        }
        if let Some(tags) = self.tags {
            next.tags = build_tags(tags)?;
        }
        if let Some(location_ref) = self.location_ref {
            next.location_ref = location_ref;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(quantity) = self.quantity {
            next.quantity = coerce_quantity(Some(quantity));
        }
        if let Some(icon) = self.icon {
            next.icon = icon;
        }
        if let Some(color) = self.color {
            next.color = color;
        }
        if let Some(is_storage_item) = self.is_storage_item {
            next.is_storage_item = is_storage_item;
        }
        next.updated_at = now;
        Ok(next)
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive substring match. `query` must already be lowercase.
pub(crate) fn contains_ci(haystack: &str, query: &str) -> bool {
    haystack.to_lowercase().contains(query)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(Some("12.50")).unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_price(Some("")).unwrap(), Decimal::ZERO);
        assert_eq!(parse_price(None).unwrap(), Decimal::ZERO);
        assert_eq!(parse_price(Some(" 3 ")).unwrap(), Decimal::from(3));
        assert!(matches!(
            parse_price(Some("cheap")),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            parse_price(Some("-1")),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity(None), 1);
        assert_eq!(coerce_quantity(Some(0)), 1);
        assert_eq!(coerce_quantity(Some(-4)), 1);
        assert_eq!(coerce_quantity(Some(7)), 7);
        assert_eq!(coerce_quantity(Some(3_000_000_000)), MAX_QUANTITY);
        assert_eq!(coerce_quantity(Some(i64::MAX)), MAX_QUANTITY);
    }

    #[test]
    fn test_price_that_cannot_scale_by_quantity_is_rejected() {
        assert!(matches!(
            parse_price(Some("79228162514264337593543950335")),
            Err(Error::Validation { .. })
        ));
        let max = Decimal::MAX / Decimal::from(MAX_QUANTITY);
        let item = ItemInput::new("Gold", "Vault", i64::from(MAX_QUANTITY))
            .with_tag(TagInput::price(&max.trunc().to_string()))
            .into_item("1".to_string(), Utc::now())
            .unwrap();
        assert!(item.value() > Decimal::ZERO);
    }

    #[test]
    fn test_location_change_without_ref_drops_old_ref() {
        let mut shirt = ItemInput::new("Shirt", "Closet", 1)
            .into_item("1".to_string(), Utc::now())
            .unwrap();
        shirt.location_ref = Some(LocationRef::Location {
            id: "closet".to_string(),
        });
        let patch = ItemPatch {
            location: Some("Garage".to_string()),
            ..ItemPatch::default()
        };
        let moved = patch.apply(&shirt, Utc::now()).unwrap();
        assert_eq!(moved.location, "Garage");
        assert_eq!(moved.location_ref, None);

        let renamed = ItemPatch {
            name: Some("Blue shirt".to_string()),
            ..ItemPatch::default()
        }
        .apply(&shirt, Utc::now())
        .unwrap();
        assert_eq!(renamed.location_ref, shirt.location_ref);
    }

    #[test]
    fn test_location_type_round_trips_through_str() {
        for t in LocationType::ALL {
            assert_eq!(t.as_str().parse::<LocationType>().unwrap(), t);
        }
        assert!("garage".parse::<LocationType>().is_err());
    }

    #[test]
    fn test_price_tag_first_occurrence_wins() {
        let item = ItemInput::new("Lamp", "Desk", 2)
            .with_tag(TagInput::new("Color", Some("red"), TagType::Custom))
            .with_tag(TagInput::price("10"))
            .with_tag(TagInput::price("99"))
            .into_item("1".to_string(), Utc::now())
            .unwrap();
        assert_eq!(item.price_tag().unwrap().value.as_deref(), Some("10"));
        assert_eq!(item.value(), Decimal::from(20));
    }

    #[test]
    fn test_item_patch_rejects_without_partial_apply() {
        let item = ItemInput::new("Lamp", "Desk", 1)
            .into_item("1".to_string(), Utc::now())
            .unwrap();
        let patch = ItemPatch {
            name: Some("Desk Lamp".to_string()),
            tags: Some(vec![TagInput::price("abc")]),
            ..ItemPatch::default()
        };
        assert!(patch.apply(&item, Utc::now()).is_err());
        assert_eq!(item.name, "Lamp");
    }

    #[test]
    fn test_location_ref_serializes_with_kind() {
        let json = serde_json::to_string(&LocationRef::Container {
            id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"item","id":"abc"}"#);
    }

    #[test]
    fn test_importance_is_not_enforced() {
        let tag = TagInput::new("Importance", Some("Urgent-ish"), TagType::Importance)
            .into_tag()
            .unwrap();
        assert_eq!(tag.value.as_deref(), Some("Urgent-ish"));
        assert!(!IMPORTANCE_LEVELS.contains(&"Urgent-ish"));
    }
}
