//! Per-location summaries for location cards and detail views.

use crate::{
    core::{
        item::{Inventory, sum_values},
        tree::LocationTree,
    },
    errors::Result,
    models::{InventoryItem, LocationRef, StorageLocation},
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// What a location holds, directly and through its sub-locations.
///
/// An item without a live reference is attributed by label only when that label
/// names exactly one location or container-item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSummary {
    /// The summarized location
    pub location: StorageLocation,
    /// `"A > B > C"` path
    pub path: String,
    /// Number of direct sub-locations
    pub child_count: usize,
    /// Number of loose items labelled with this location
    pub item_count: usize,
    /// Those loose items
    pub loose_items: Vec<InventoryItem>,
    /// Units held anywhere below this location, container-items included
    pub recursive_item_count: u64,
    /// Value held anywhere below this location
    pub recursive_value: Decimal,
}

/// Summarizes one location. Returns `None` for unknown ids.
///
/// Recursive totals cover the location, every descendant location and, transitively,
/// the contents of container-items placed there. Items are attributed by their resolved
/// reference when its target still exists, otherwise by label.
///
/// # Errors
/// - [`crate::errors::Error::CycleDetected`] if the location's parent chain is corrupt
/// - [`crate::errors::Error::ValueOverflow`] if the held value leaves the decimal range
pub fn summarize(
    id: &str,
    locations: &LocationTree,
    items: &Inventory,
) -> Result<Option<LocationSummary>> {
    let Some(location) = locations.get(id) else {
        return Ok(None);
    };
    let path = locations.path_of(id)?;
    let loose_items: Vec<InventoryItem> =
        items.loose_in(&location.name).into_iter().cloned().collect();

    let subtree: Vec<&StorageLocation> = std::iter::once(location)
        .chain(locations.descendants_of(id))
        .collect();
    let held = held_items(&subtree, locations, items);

    Ok(Some(LocationSummary {
        location: location.clone(),
        path,
        child_count: locations.children_of(id).len(),
        item_count: loose_items.len(),
        loose_items,
        recursive_item_count: held.iter().map(|item| u64::from(item.quantity)).sum(),
        recursive_value: sum_values(held)?,
    }))
}

/// Summaries for every location in collection order.
///
/// # Errors
/// Fails like [`summarize`] on the first location that fails.
pub fn summarize_all(locations: &LocationTree, items: &Inventory) -> Result<Vec<LocationSummary>> {
    locations
        .as_slice()
        .iter()
        .filter_map(|location| summarize(&location.id, locations, items).transpose())
        .collect()
}

/// Items inside `subtree`, following container-items until nothing new is added.
fn held_items<'a>(
    subtree: &[&StorageLocation],
    locations: &LocationTree,
    items: &'a Inventory,
) -> Vec<&'a InventoryItem> {
    let unique = unique_names(locations, items);
    let location_ids: HashSet<&str> = subtree.iter().map(|l| l.id.as_str()).collect();
    let location_names: HashSet<&str> = subtree.iter().map(|l| l.name.as_str()).collect();
    let mut container_ids: HashSet<&str> = HashSet::new();
    let mut container_names: HashSet<&str> = HashSet::new();
    let mut held: Vec<&InventoryItem> = Vec::new();
    let mut included: HashSet<&str> = HashSet::new();

    loop {
        let mut changed = false;
        for item in items.as_slice() {
            if included.contains(item.id.as_str()) {
                continue;
            }
            let inside = match &item.location_ref {
                Some(LocationRef::Location { id }) if locations.get(id).is_some() => {
                    location_ids.contains(id.as_str())
                }
                Some(LocationRef::Container { id }) if items.get(id).is_some() => {
                    container_ids.contains(id.as_str())
                }
                _ => {
                    let label = item.location.as_str();
                    unique.contains(label)
                        && (location_names.contains(label) || container_names.contains(label))
                }
            };
            if inside {
                included.insert(&item.id);
                held.push(item);
                if item.is_storage_item {
                    container_ids.insert(&item.id);
                    container_names.insert(&item.name);
                }
                changed = true;
            }
        }
        if !changed {
            return held;
        }
    }
}

/// Names carried by exactly one location or container-item.
fn unique_names<'a>(locations: &'a LocationTree, items: &'a Inventory) -> HashSet<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let names = locations
        .as_slice()
        .iter()
        .map(|l| l.name.as_str())
        .chain(items.storage_items().into_iter().map(|i| i.name.as_str()));
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .filter_map(|(name, count)| (count == 1).then_some(name))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::{ItemInput, LocationInput, LocationType, TagInput};
    use chrono::Utc;

    fn location(id: &str, name: &str, parent: Option<&str>) -> StorageLocation {
        let mut input = LocationInput::new(name, LocationType::Room);
        input.parent_id = parent.map(str::to_string);
        input.into_location(id.to_string(), Utc::now()).unwrap()
    }

    fn item(id: &str, input: ItemInput, location_ref: Option<LocationRef>) -> InventoryItem {
        let mut item = input.into_item(id.to_string(), Utc::now()).unwrap();
        item.location_ref = location_ref;
        item
    }

    fn at_location(id: &str) -> Option<LocationRef> {
        Some(LocationRef::Location { id: id.to_string() })
    }

    fn in_container(id: &str) -> Option<LocationRef> {
        Some(LocationRef::Container { id: id.to_string() })
    }

    #[test]
    fn test_summary_counts_loose_and_recursive() {
        let tree = LocationTree::new(vec![
            location("shelf", "Shelf", Some("garage")),
            location("garage", "Garage", None),
        ]);
        let items = Inventory::new(vec![
            item(
                "drill",
                ItemInput::new("Drill", "Toolbox", 1).with_tag(TagInput::price("50")),
                in_container("toolbox"),
            ),
            item(
                "toolbox",
                ItemInput::new("Toolbox", "Shelf", 1).as_storage_item(),
                at_location("shelf"),
            ),
            item(
                "bike",
                ItemInput::new("Bike", "Garage", 1).with_tag(TagInput::price("200")),
                at_location("garage"),
            ),
            item("rake", ItemInput::new("Rake", "Garage", 2), None),
        ]);

        let summary = summarize("garage", &tree, &items).unwrap().unwrap();
        assert_eq!(summary.path, "Garage");
        assert_eq!(summary.child_count, 1);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.recursive_item_count, 5);
        assert_eq!(summary.recursive_value, Decimal::from(250));

        let shelf = summarize("shelf", &tree, &items).unwrap().unwrap();
        assert_eq!(shelf.path, "Garage > Shelf");
        assert_eq!(shelf.item_count, 0);
        assert_eq!(shelf.recursive_item_count, 2);
    }

    #[test]
    fn test_renamed_location_still_owns_referenced_items() {
        let tree = LocationTree::new(vec![location("closet", "Wardrobe", None)]);
        let items = Inventory::new(vec![item(
            "shirt",
            ItemInput::new("Shirt", "Closet", 3),
            at_location("closet"),
        )]);
        let summary = summarize("closet", &tree, &items).unwrap().unwrap();
        assert_eq!(summary.recursive_item_count, 3);
        // Loose counts go by label, which is stale until the item is saved again.
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn test_shared_label_is_not_attributed_by_name() {
        let tree = LocationTree::new(vec![
            location("garage", "Garage", None),
            location("garage-shelf", "Shelf", Some("garage")),
            location("office", "Office", None),
            location("office-shelf", "Shelf", Some("office")),
        ]);
        let items = Inventory::new(vec![
            item("stapler", ItemInput::new("Stapler", "Shelf", 1), None),
            item(
                "glue",
                ItemInput::new("Glue", "Shelf", 4),
                at_location("office-shelf"),
            ),
            item("paint", ItemInput::new("Paint", "Garage", 2), None),
        ]);

        let garage = summarize("garage", &tree, &items).unwrap().unwrap();
        assert_eq!(garage.recursive_item_count, 2);
        let office = summarize("office", &tree, &items).unwrap().unwrap();
        assert_eq!(office.recursive_item_count, 4);
    }

    #[test]
    fn test_container_cycle_terminates() {
        let tree = LocationTree::new(vec![location("room", "Room", None)]);
        let items = Inventory::new(vec![
            item(
                "a",
                ItemInput::new("A", "B", 1).as_storage_item(),
                in_container("b"),
            ),
            item(
                "b",
                ItemInput::new("B", "A", 1).as_storage_item(),
                in_container("a"),
            ),
        ]);
        let summary = summarize("room", &tree, &items).unwrap().unwrap();
        assert_eq!(summary.recursive_item_count, 0);
    }

    #[test]
    fn test_unknown_location_has_no_summary() {
        let tree = LocationTree::default();
        assert!(summarize("x", &tree, &Inventory::default()).unwrap().is_none());
        assert!(summarize_all(&tree, &Inventory::default()).unwrap().is_empty());
    }
}
