//! Persistence mode and load/sync flags shared by both stores.

use crate::{
    config::session::Session,
    errors::Result,
    remote::RemoteStore,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Where a store's writes go.
#[derive(Clone)]
pub(crate) enum Backend {
    /// The local mirror is the only persistence.
    Local,
    /// Writes go to the remote store first; the mirror follows successful reads.
    Remote(Arc<dyn RemoteStore>),
}

impl Backend {
    /// The remote store and the signed-in user id, or `None` in local-only mode.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::NotAuthenticated`] in remote mode without a user.
    pub(crate) fn target<'a>(
        &'a self,
        session: &'a Session,
    ) -> Result<Option<(&'a dyn RemoteStore, &'a str)>> {
        match self {
            Self::Local => Ok(None),
            Self::Remote(remote) => Ok(Some((remote.as_ref(), session.require_user()?))),
        }
    }
}

/// Loaded and syncing flags.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    loaded: AtomicBool,
    syncing: AtomicBool,
}

impl SyncState {
    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    pub(crate) fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Raises the syncing flag until the guard is dropped.
    pub(crate) fn begin(&self) -> SyncGuard<'_> {
        self.syncing.store(true, Ordering::Release);
        SyncGuard { state: self }
    }
}

/// Clears the syncing flag on drop, whether the operation succeeded or not.
pub(crate) struct SyncGuard<'a> {
    state: &'a SyncState,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.state.syncing.store(false, Ordering::Release);
    }
}
