//! Dual addressing: an item's location may be a storage location or a container-item.
//!
//! Users pick a location by name. The name is resolved once, at write time, into a
//! [`LocationRef`] that is stored alongside the label. Reads recompute the label from the
//! reference so renames are followed, and fall back to the stored label when the target
//! has been deleted.

use crate::{
    core::{item::Inventory, tree::LocationTree},
    errors::{Error, Result},
    models::{InventoryItem, LocationRef},
};
use std::collections::HashSet;
use tracing::debug;

/// What wins when a storage location and a container-item share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePrecedence {
    /// The storage location is chosen
    #[default]
    StorageLocationFirst,
    /// The name is rejected as ambiguous
    RejectAmbiguous,
}

/// Outcome of resolving a location name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Label to store on the item
    pub label: String,
    /// What the label pointed at when it was resolved
    pub location_ref: LocationRef,
}

impl ResolvedLocation {
    /// Storage location id, or `None` when the target is a container-item.
    #[must_use]
    pub fn location_id(&self) -> Option<&str> {
        match &self.location_ref {
            LocationRef::Location { id } => Some(id),
            LocationRef::Container { .. } => None,
        }
    }
}

/// Resolves user-facing location names against the current collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    precedence: NamePrecedence,
}

impl Resolver {
    /// Resolver with the given tie-break rule.
    #[must_use]
    pub const fn new(precedence: NamePrecedence) -> Self {
        Self { precedence }
    }

    /// Resolves `name` to a storage location, then to a container-item.
    ///
    /// Matching is exact. With duplicate names the first entry in collection order wins.
    ///
    /// # Errors
    /// - [`Error::Validation`] for an empty name, or a shared name under
    ///   [`NamePrecedence::RejectAmbiguous`]
    /// - [`Error::UnresolvedLocation`] when nothing has this name
    pub fn resolve(
        &self,
        name: &str,
        locations: &LocationTree,
        items: &Inventory,
    ) -> Result<ResolvedLocation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Item location is required"));
        }

        let location = locations.find_by_name(name);
        let container = items.find_container_by_name(name);

        let location_ref = match (location, container) {
            (Some(_), Some(_)) if self.precedence == NamePrecedence::RejectAmbiguous => {
                return Err(Error::validation(format!(
                    "\"{name}\" names both a storage location and a storage item"
                )));
            }
            (Some(location), _) => LocationRef::Location {
                id: location.id.clone(),
            },
            (None, Some(container)) => LocationRef::Container {
                id: container.id.clone(),
            },
            (None, None) => {
                return Err(Error::UnresolvedLocation {
                    name: name.to_string(),
                });
            }
        };

        debug!("Resolved location {:?} to {:?}", name, location_ref);
        Ok(ResolvedLocation {
            label: name.to_string(),
            location_ref,
        })
    }

    /// Names a user may pick as an item location: storage locations first, then
    /// container-items, without repeats.
    #[must_use]
    pub fn candidate_names(locations: &LocationTree, items: &Inventory) -> Vec<String> {
        let mut seen = HashSet::new();
        locations
            .as_slice()
            .iter()
            .map(|location| location.name.as_str())
            .chain(items.storage_items().into_iter().map(|item| item.name.as_str()))
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect()
    }

    /// Current label for `item`, following its reference when the target still exists.
    #[must_use]
    pub fn display_label(item: &InventoryItem, locations: &LocationTree, items: &Inventory) -> String {
        let current = match &item.location_ref {
            Some(LocationRef::Location { id }) => locations.get(id).map(|l| l.name.as_str()),
            Some(LocationRef::Container { id }) => items.get(id).map(|i| i.name.as_str()),
            None => None,
        };
        current.unwrap_or(&item.location).to_string()
    }
}
