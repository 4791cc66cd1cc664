//! Location store - owns the storage locations of one user and answers tree queries.
//!
//! In remote mode every mutation is written to the [`RemoteStore`] first and applied to
//! the in-memory tree only after it succeeds. Reloads replace the whole collection and
//! rewrite the local mirror. Concurrent edits are not serialized; the last write wins.

use crate::{
    cache::LocalCache,
    config::session::Session,
    core::{
        sync::{Backend, SyncState},
        tree::LocationTree,
    },
    errors::Result,
    models::{LocationInput, LocationPatch, LocationType, StorageLocation},
    remote::{RemoteStore, Subscription, Table},
};
use chrono::Utc;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Storage locations of the current user.
pub struct LocationStore {
    tree: RwLock<LocationTree>,
    search_query: RwLock<String>,
    session: RwLock<Session>,
    backend: Backend,
    cache: Option<LocalCache>,
    seeds: Vec<LocationInput>,
    state: SyncState,
}

impl LocationStore {
    /// A store persisted only to the local mirror. `seeds` populate a first run.
    #[must_use]
    pub fn local(cache: Option<LocalCache>, seeds: Vec<LocationInput>) -> Self {
        Self::with_backend(Backend::Local, Session::anonymous(), cache, seeds)
    }

    /// A store backed by a remote store, scoped to `session`.
    #[must_use]
    pub fn remote(remote: Arc<dyn RemoteStore>, session: Session, cache: Option<LocalCache>) -> Self {
        Self::with_backend(Backend::Remote(remote), session, cache, Vec::new())
    }

    fn with_backend(
        backend: Backend,
        session: Session,
        cache: Option<LocalCache>,
        seeds: Vec<LocationInput>,
    ) -> Self {
        Self {
            tree: RwLock::new(LocationTree::default()),
            search_query: RwLock::new(String::new()),
            session: RwLock::new(session),
            backend,
            cache,
            seeds,
            state: SyncState::default(),
        }
    }

    /// Initial load: the mirror first for a fast first paint, then the remote fetch.
    ///
    /// In local-only mode an absent mirror is seeded with the configured defaults.
    pub async fn load(&self) -> Result<()> {
        let cached = self
            .cache
            .as_ref()
            .and_then(LocalCache::load_or_discard::<StorageLocation>);

        match (&self.backend, cached) {
            (Backend::Local, Some(locations)) => {
                info!("Loaded {} locations from local mirror", locations.len());
                *self.tree.write().await = LocationTree::new(locations);
            }
            (Backend::Local, None) => self.seed_defaults().await?,
            (Backend::Remote(_), cached) => {
                if let Some(locations) = cached {
                    *self.tree.write().await = LocationTree::new(locations);
                }
                self.reload_all().await?;
            }
        }
        self.state.mark_loaded();
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<()> {
        let now = Utc::now();
        let locations = self
            .seeds
            .iter()
            .cloned()
            .map(|seed| seed.into_location(new_id(), now))
            .collect::<Result<Vec<_>>>()?;
        info!("Seeding {} default locations", locations.len());
        self.cache_refresh(&locations);
        *self.tree.write().await = LocationTree::new(locations);
        Ok(())
    }

    /// Replaces the whole collection with a fresh fetch and rewrites the mirror.
    ///
    /// Without a signed-in user the collection becomes empty. In local-only mode the
    /// mirror is re-read.
    pub async fn reload_all(&self) -> Result<()> {
        let session = self.session.read().await.clone();
        let locations = match (&self.backend, session.user_id()) {
            (Backend::Local, _) => {
                let Some(locations) = self
                    .cache
                    .as_ref()
                    .and_then(LocalCache::load_or_discard::<StorageLocation>)
                else {
                    self.state.mark_loaded();
                    return Ok(());
                };
                locations
            }
            (Backend::Remote(_), None) => {
                debug!("No signed-in user, clearing locations");
                Vec::new()
            }
            (Backend::Remote(remote), Some(user_id)) => {
                let _guard = self.state.begin();
                let fetched = remote
                    .select_locations(user_id)
                    .await
                    .inspect_err(|e| error!("Failed to fetch locations: {}", e));
                self.state.mark_loaded();
                let locations = fetched?;
                self.cache_refresh(&locations);
                locations
            }
        };

        debug!("Location collection replaced with {} entries", locations.len());
        *self.tree.write().await = LocationTree::new(locations);
        self.state.mark_loaded();
        Ok(())
    }

    /// Switches the current user and reloads.
    pub async fn set_session(&self, session: Session) -> Result<()> {
        *self.session.write().await = session;
        self.reload_all().await
    }

    /// Reloads the collection whenever the remote store reports a change for the
    /// current user. Returns `None` in local-only mode or without a user.
    pub async fn watch(self: &Arc<Self>) -> Option<Subscription> {
        let Backend::Remote(remote) = &self.backend else {
            return None;
        };
        let user_id = self.session.read().await.user_id()?.to_string();
        let store: Weak<Self> = Arc::downgrade(self);
        Some(remote.subscribe_to_changes(
            &user_id,
            Table::Locations,
            Arc::new(move || {
                if let Some(store) = store.upgrade() {
                    tokio::spawn(async move {
                        if let Err(e) = store.reload_all().await {
                            warn!("Location reload after change failed: {}", e);
                        }
                    });
                }
            }),
        ))
    }

    /// Whether the initial load has completed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Whether a remote call is in flight.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.state.is_syncing()
    }

    /// Current search box contents.
    pub async fn search_query(&self) -> String {
        self.search_query.read().await.clone()
    }

    /// Sets the search box contents used by [`LocationStore::filtered`].
    pub async fn set_search_query(&self, query: impl Into<String>) {
        *self.search_query.write().await = query.into();
    }

    /// Creates a location at the head of the collection. Names need not be unique.
    ///
    /// # Errors
    /// - [`crate::errors::Error::Validation`] for an empty name
    /// - [`crate::errors::Error::UnresolvedLocation`] when `parent_id` names no location
    /// - [`crate::errors::Error::NotAuthenticated`] in remote mode without a user
    /// - [`crate::errors::Error::RemoteOperationFailed`] if the backend rejects the insert
    pub async fn add(&self, input: LocationInput) -> Result<StorageLocation> {
        let location = input.into_location(new_id(), Utc::now())?;
        if let Some(parent_id) = &location.parent_id {
            self.tree.read().await.require(parent_id)?;
        }
        let session = self.session.read().await.clone();

        let location = match self.backend.target(&session)? {
            Some((remote, user_id)) => {
                let _guard = self.state.begin();
                remote
                    .insert_location(user_id, &location)
                    .await
                    .inspect_err(|e| error!("Add location error: {}", e))?
            }
            None => location,
        };

        let mut tree = self.tree.write().await;
        tree.insert_front(location.clone());
        self.cache_refresh(tree.as_slice());
        info!("Created location {} ({})", location.name, location.id);
        Ok(location)
    }

    /// Merges `patch` into the location and bumps `updated_at`.
    ///
    /// An unknown id is a no-op. A new parent that is the location itself or one of its
    /// descendants is rejected.
    ///
    /// # Errors
    /// - [`crate::errors::Error::Validation`] for an empty name
    /// - [`crate::errors::Error::UnresolvedLocation`] when the new parent names no location
    /// - [`crate::errors::Error::CycleDetected`] for a reparent that would form a cycle
    /// - [`crate::errors::Error::NotAuthenticated`] in remote mode without a user
    /// - [`crate::errors::Error::RemoteOperationFailed`] if the backend rejects the update
    pub async fn update(&self, id: &str, patch: LocationPatch) -> Result<()> {
        let updated = {
            let tree = self.tree.read().await;
            let Some(current) = tree.get(id) else {
                debug!("Update of unknown location {} ignored", id);
                return Ok(());
            };
            if let Some(parent_id) = &patch.parent_id {
                if let Some(parent_id) = parent_id {
                    tree.require(parent_id)?;
                }
                tree.check_reparent(id, parent_id.as_deref())?;
            }
            patch.apply(current, Utc::now())?
        };

        let session = self.session.read().await.clone();
        if let Some((remote, user_id)) = self.backend.target(&session)? {
            let _guard = self.state.begin();
            remote
                .update_location(user_id, &updated)
                .await
                .inspect_err(|e| error!("Update location error: {}", e))?;
        }

        let mut tree = self.tree.write().await;
        tree.replace(updated);
        self.cache_refresh(tree.as_slice());
        debug!("Updated location {}", id);
        Ok(())
    }

    /// Deletes a location. Child locations and items naming it are left orphaned.
    ///
    /// # Errors
    /// - [`crate::errors::Error::NotAuthenticated`] in remote mode without a user
    /// - [`crate::errors::Error::RemoteOperationFailed`] if the backend rejects the delete
    pub async fn remove(&self, id: &str) -> Result<()> {
        let session = self.session.read().await.clone();
        if let Some((remote, user_id)) = self.backend.target(&session)? {
            let _guard = self.state.begin();
            remote
                .delete_location(user_id, id)
                .await
                .inspect_err(|e| error!("Delete location error: {}", e))?;
        }

        let mut tree = self.tree.write().await;
        if let Some(removed) = tree.remove(id) {
            info!("Deleted location {} ({})", removed.name, removed.id);
        }
        self.cache_refresh(tree.as_slice());
        Ok(())
    }

    /// A copy of the current tree for multi-step queries.
    pub async fn snapshot(&self) -> LocationTree {
        self.tree.read().await.clone()
    }

    /// All locations, newest first.
    pub async fn all(&self) -> Vec<StorageLocation> {
        self.tree.read().await.as_slice().to_vec()
    }

    /// Looks up a location by id.
    pub async fn get(&self, id: &str) -> Option<StorageLocation> {
        self.tree.read().await.get(id).cloned()
    }

    /// Direct children of `parent_id`.
    pub async fn children_of(&self, parent_id: &str) -> Vec<StorageLocation> {
        cloned(self.tree.read().await.children_of(parent_id))
    }

    /// Top-level locations, including those whose parent was deleted.
    pub async fn roots(&self) -> Vec<StorageLocation> {
        cloned(self.tree.read().await.roots())
    }

    /// The existing parent of `id`.
    pub async fn parent_of(&self, id: &str) -> Option<StorageLocation> {
        self.tree.read().await.parent_of(id).cloned()
    }

    /// `"A > B > C"` path of a location, empty for unknown ids.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::CycleDetected`] on corrupt parent chains.
    pub async fn path_of(&self, id: &str) -> Result<String> {
        self.tree.read().await.path_of(id)
    }

    /// Ancestors of `id` from the root down.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::CycleDetected`] on corrupt parent chains.
    pub async fn ancestors_of(&self, id: &str) -> Result<Vec<StorageLocation>> {
        Ok(cloned(self.tree.read().await.ancestors_of(id)?))
    }

    /// Every location below `id`, breadth first.
    pub async fn descendants_of(&self, id: &str) -> Vec<StorageLocation> {
        cloned(self.tree.read().await.descendants_of(id))
    }

    /// First location with exactly this name.
    pub async fn find_by_name(&self, name: &str) -> Option<StorageLocation> {
        self.tree.read().await.find_by_name(name).cloned()
    }

    /// Locations of one type.
    pub async fn by_type(&self, location_type: LocationType) -> Vec<StorageLocation> {
        cloned(self.tree.read().await.by_type(location_type))
    }

    /// Locations matching the current search query.
    pub async fn filtered(&self) -> Vec<StorageLocation> {
        let query = self.search_query().await;
        cloned(self.tree.read().await.filtered(&query))
    }

    fn cache_refresh(&self, locations: &[StorageLocation]) {
        if let Some(cache) = &self.cache {
            cache.refresh(locations);
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn cloned(locations: Vec<&StorageLocation>) -> Vec<StorageLocation> {
    locations.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::clone_on_ref_ptr)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_inserts_at_head() -> Result<()> {
        let store = local_location_store(None);
        let first = store.add(LocationInput::new("Garage", LocationType::Room)).await?;
        let second = store.add(LocationInput::new("Attic", LocationType::Room)).await?;

        let all = store.all().await;
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_rejects_empty_name() {
        let store = local_location_store(None);
        let result = store.add(LocationInput::new("  ", LocationType::Shelf)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_are_allowed() -> Result<()> {
        let store = local_location_store(None);
        store.add(LocationInput::new("Box", LocationType::Bag)).await?;
        store.add(LocationInput::new("Box", LocationType::Bag)).await?;
        assert_eq!(store.all().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_path_of_chain() -> Result<()> {
        let store = local_location_store(None);
        let a = store.add(LocationInput::new("A", LocationType::Room)).await?;
        let b = store
            .add(LocationInput::new("B", LocationType::Cabinet).with_parent(&a.id))
            .await?;
        let c = store
            .add(LocationInput::new("C", LocationType::Drawer).with_parent(&b.id))
            .await?;

        assert_eq!(store.path_of(&c.id).await?, "A > B > C");
        assert_eq!(store.path_of("nope").await?, "");
        assert_eq!(store.children_of(&a.id).await, vec![b.clone()]);
        assert_eq!(store.roots().await, vec![a.clone()]);
        assert_eq!(store.parent_of(&c.id).await, Some(b.clone()));

        let ancestors: Vec<String> = store
            .ancestors_of(&c.id)
            .await?
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(ancestors, vec!["A", "B"]);
        assert_eq!(store.descendants_of(&a.id).await.len(), 2);
        assert_eq!(store.find_by_name("B").await, Some(b));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rejects_cycle() -> Result<()> {
        let store = local_location_store(None);
        let a = store.add(LocationInput::new("A", LocationType::Room)).await?;
        let b = store
            .add(LocationInput::new("B", LocationType::Drawer).with_parent(&a.id))
            .await?;

        let result = store
            .update(&a.id, LocationPatch::reparent(Some(b.id.clone())))
            .await;
        assert!(matches!(result, Err(Error::CycleDetected { .. })));

        let result = store
            .update(&a.id, LocationPatch::reparent(Some(a.id.clone())))
            .await;
        assert!(matches!(result, Err(Error::CycleDetected { .. })));

        assert_eq!(store.get(&a.id).await.unwrap().parent_id, None);
        assert_eq!(store.path_of(&b.id).await?, "A > B");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_parent_is_rejected() -> Result<()> {
        let store = local_location_store(None);
        let result = store
            .add(LocationInput::new("Drawer", LocationType::Drawer).with_parent("ghost"))
            .await;
        assert!(matches!(result, Err(Error::UnresolvedLocation { .. })));
        assert!(store.all().await.is_empty());

        let desk = store.add(LocationInput::new("Desk", LocationType::Other)).await?;
        let result = store
            .update(&desk.id, LocationPatch::reparent(Some("ghost".to_string())))
            .await;
        assert!(matches!(result, Err(Error::UnresolvedLocation { .. })));
        assert_eq!(store.get(&desk.id).await.unwrap().parent_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_timestamp() -> Result<()> {
        let store = local_location_store(None);
        let shelf = store
            .add(LocationInput::new("Shelf", LocationType::Shelf).with_description("Pine"))
            .await?;

        let patch = LocationPatch {
            name: Some("Top Shelf".to_string()),
            color: Some(Some("#aabbcc".to_string())),
            ..LocationPatch::default()
        };
        store.update(&shelf.id, patch).await?;

        let updated = store.get(&shelf.id).await.unwrap();
        assert_eq!(updated.name, "Top Shelf");
        assert_eq!(updated.description.as_deref(), Some("Pine"));
        assert_eq!(updated.color.as_deref(), Some("#aabbcc"));
        assert!(updated.updated_at >= shelf.updated_at);
        assert_eq!(updated.created_at, shelf.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() -> Result<()> {
        let store = local_location_store(None);
        store
            .update("missing", LocationPatch::reparent(None))
            .await?;
        assert!(store.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_does_not_cascade() -> Result<()> {
        let store = local_location_store(None);
        let room = store.add(LocationInput::new("Room", LocationType::Room)).await?;
        let drawer = store
            .add(LocationInput::new("Drawer", LocationType::Drawer).with_parent(&room.id))
            .await?;

        store.remove(&room.id).await?;
        let remaining = store.all().await;
        assert_eq!(remaining, vec![drawer.clone()]);
        assert_eq!(store.roots().await, vec![drawer.clone()]);
        assert_eq!(store.path_of(&drawer.id).await?, "Drawer");
        Ok(())
    }

    #[tokio::test]
    async fn test_search_query_filters() -> Result<()> {
        let store = local_location_store(None);
        store.add(LocationInput::new("Garage", LocationType::Room)).await?;
        store
            .add(LocationInput::new("Backpack", LocationType::Bag).with_description("Blue"))
            .await?;

        store.set_search_query("blue").await;
        let found = store.filtered().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Backpack");

        assert_eq!(store.by_type(LocationType::Room).await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_local_first_run_seeds_and_mirrors() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = local_location_store(Some(dir.path()));
        store.load().await?;
        assert!(store.is_loaded());
        let names: Vec<String> = store.all().await.into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Bedroom Drawer", "Kitchen Cabinet"]);

        store.add(LocationInput::new("Garage", LocationType::Room)).await?;

        let reopened = local_location_store(Some(dir.path()));
        reopened.load().await?;
        assert_eq!(reopened.all().await, store.all().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_without_user_is_empty_and_rejects() -> Result<()> {
        let remote = setup_remote().await?;
        let store = LocationStore::remote(remote, Session::anonymous(), None);
        store.load().await?;
        assert!(store.is_loaded());
        assert!(store.all().await.is_empty());

        let result = store.add(LocationInput::new("Garage", LocationType::Room)).await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
        assert!(store.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_write_through_and_reload() -> Result<()> {
        let remote = setup_remote().await?;
        let store = LocationStore::remote(remote.clone(), Session::signed_in("alice"), None);
        store.load().await?;

        let garage = store.add(LocationInput::new("Garage", LocationType::Room)).await?;
        store
            .update(
                &garage.id,
                LocationPatch {
                    name: Some("Workshop".to_string()),
                    ..LocationPatch::default()
                },
            )
            .await?;
        assert!(!store.is_syncing());

        let fresh = LocationStore::remote(remote.clone(), Session::signed_in("alice"), None);
        fresh.load().await?;
        assert_eq!(fresh.all().await[0].name, "Workshop");

        let other = LocationStore::remote(remote, Session::signed_in("bob"), None);
        other.load().await?;
        assert!(other.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_session_reloads() -> Result<()> {
        let remote = setup_remote().await?;
        let store = LocationStore::remote(remote, Session::signed_in("alice"), None);
        store.load().await?;
        store.add(LocationInput::new("Garage", LocationType::Room)).await?;

        store.set_session(Session::anonymous()).await?;
        assert!(store.all().await.is_empty());

        store.set_session(Session::signed_in("alice")).await?;
        assert_eq!(store.all().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_watch_reloads_on_remote_change() -> Result<()> {
        init_test_tracing();
        let remote = setup_remote().await?;
        let store = Arc::new(LocationStore::remote(
            remote.clone(),
            Session::signed_in("alice"),
            None,
        ));
        store.load().await?;
        let _subscription = store.watch().await.unwrap();

        // A second client of the same user writes directly to the backend.
        let other_client = LocationStore::remote(remote, Session::signed_in("alice"), None);
        other_client
            .add(LocationInput::new("Garage", LocationType::Room))
            .await?;

        wait_until(|| async { store.all().await.len() == 1 }).await;
        assert_eq!(store.all().await[0].name, "Garage");
        Ok(())
    }
}
