//! Location arena - the flat id-to-record map behind every tree query.
//!
//! Locations are stored in collection order (newest first) with an id index. Parent
//! links are followed by id lookups only, and every upward walk carries a visited set,
//! so corrupted data with a parent cycle yields [`Error::CycleDetected`] instead of
//! looping. A parent id that names no location is treated as a root.

use crate::{
    errors::{Error, Result},
    models::{LocationType, StorageLocation, contains_ci},
};
use std::collections::{HashMap, HashSet, VecDeque};

/// Separator used by [`LocationTree::path_of`].
pub const PATH_SEPARATOR: &str = " > ";

/// Snapshot of all storage locations with tree-shaped queries.
#[derive(Debug, Clone, Default)]
pub struct LocationTree {
    locations: Vec<StorageLocation>,
    index: HashMap<String, usize>,
}

impl LocationTree {
    /// Builds the arena from a collection in display order.
    #[must_use]
    pub fn new(locations: Vec<StorageLocation>) -> Self {
        let mut tree = Self {
            locations,
            index: HashMap::new(),
        };
        tree.reindex();
        tree
    }

    fn reindex(&mut self) {
        self.index = self
            .locations
            .iter()
            .enumerate()
            .map(|(i, location)| (location.id.clone(), i))
            .collect();
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether there are no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// All locations in collection order.
    #[must_use]
    pub fn as_slice(&self) -> &[StorageLocation] {
        &self.locations
    }

    /// Looks up a location by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StorageLocation> {
        self.index.get(id).map(|&i| &self.locations[i])
    }

    /// First location in collection order with exactly this name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&StorageLocation> {
        self.locations.iter().find(|location| location.name == name)
    }

    /// Locations whose parent is `parent_id`, in collection order.
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> Vec<&StorageLocation> {
        self.locations
            .iter()
            .filter(|location| location.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Locations without a parent, or whose parent no longer exists.
    #[must_use]
    pub fn roots(&self) -> Vec<&StorageLocation> {
        self.locations
            .iter()
            .filter(|location| {
                location
                    .parent_id
                    .as_deref()
                    .is_none_or(|parent_id| self.get(parent_id).is_none())
            })
            .collect()
    }

    /// The existing parent of `id`, if any.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&StorageLocation> {
        self.get(id)
            .and_then(|location| location.parent_id.as_deref())
            .and_then(|parent_id| self.get(parent_id))
    }

    /// Ancestors of `id` ordered from the root down, excluding `id` itself.
    ///
    /// Returns an empty list for unknown ids. Stops at a dangling parent.
    ///
    /// # Errors
    /// Returns [`Error::CycleDetected`] if the parent chain revisits a location.
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&StorageLocation>> {
        let Some(start) = self.get(id) else {
            return Ok(Vec::new());
        };
        let mut visited: HashSet<&str> = HashSet::from([start.id.as_str()]);
        let mut chain = Vec::new();
        let mut current = start;

        while let Some(parent_id) = current.parent_id.as_deref() {
            if !visited.insert(parent_id) {
                return Err(Error::CycleDetected {
                    id: parent_id.to_string(),
                });
            }
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            chain.push(parent);
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Root-to-node names joined by `" > "`, or an empty string for unknown ids.
    ///
    /// # Errors
    /// Returns [`Error::CycleDetected`] if the parent chain revisits a location.
    pub fn path_of(&self, id: &str) -> Result<String> {
        let Some(location) = self.get(id) else {
            return Ok(String::new());
        };
        let mut names: Vec<&str> = self
            .ancestors_of(id)?
            .into_iter()
            .map(|ancestor| ancestor.name.as_str())
            .collect();
        names.push(&location.name);
        Ok(names.join(PATH_SEPARATOR))
    }

    /// Every location below `id`, breadth first. Never revisits a node.
    #[must_use]
    pub fn descendants_of(&self, id: &str) -> Vec<&StorageLocation> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(parent_id) = queue.pop_front() {
            for child in self.children_of(parent_id) {
                if seen.insert(child.id.as_str()) {
                    queue.push_back(child.id.as_str());
                    found.push(child);
                }
            }
        }
        found
    }

    /// Locations of the given type, in collection order.
    #[must_use]
    pub fn by_type(&self, location_type: LocationType) -> Vec<&StorageLocation> {
        self.locations
            .iter()
            .filter(|location| location.location_type == location_type)
            .collect()
    }

    /// Case-insensitive substring search over name, type and description.
    /// An empty query matches everything.
    #[must_use]
    pub fn filtered(&self, query: &str) -> Vec<&StorageLocation> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.locations.iter().collect();
        }
        self.locations
            .iter()
            .filter(|location| {
                contains_ci(&location.name, &query)
                    || location.location_type.as_str().contains(&query)
                    || location
                        .description
                        .as_deref()
                        .is_some_and(|d| contains_ci(d, &query))
            })
            .collect()
    }

    /// Whether giving `id` the parent `new_parent` would put `id` on its own parent chain.
    #[must_use]
    pub fn would_create_cycle(&self, id: &str, new_parent: Option<&str>) -> bool {
        let Some(mut cursor) = new_parent else {
            return false;
        };
        let mut visited: HashSet<&str> = HashSet::new();
        loop {
            if cursor == id {
                return true;
            }
            if !visited.insert(cursor) {
                // An existing cycle elsewhere; `id` is not part of it.
                return false;
            }
            match self.get(cursor).and_then(|l| l.parent_id.as_deref()) {
                Some(next) => cursor = next,
                None => return false,
            }
        }
    }

    /// Looks up a location that must exist.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedLocation`] for an unknown id.
    pub fn require(&self, id: &str) -> Result<&StorageLocation> {
        self.get(id).ok_or_else(|| Error::UnresolvedLocation {
            name: id.to_string(),
        })
    }

    /// Rejects a reparent that would introduce a cycle.
    ///
    /// # Errors
    /// Returns [`Error::CycleDetected`] when `new_parent` is `id` or one of its descendants.
    pub fn check_reparent(&self, id: &str, new_parent: Option<&str>) -> Result<()> {
        if self.would_create_cycle(id, new_parent) {
            return Err(Error::CycleDetected { id: id.to_string() });
        }
        Ok(())
    }

    /// Puts `location` at the head, dropping a copy already present from a reload.
    pub(crate) fn insert_front(&mut self, location: StorageLocation) {
        if let Some(i) = self.index.get(&location.id).copied() {
            self.locations.remove(i);
        }
        self.locations.insert(0, location);
        self.reindex();
    }

    pub(crate) fn replace(&mut self, location: StorageLocation) {
        if let Some(&i) = self.index.get(&location.id) {
            self.locations[i] = location;
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<StorageLocation> {
        let i = self.index.get(id).copied()?;
        let removed = self.locations.remove(i);
        self.reindex();
        Some(removed)
    }
}
