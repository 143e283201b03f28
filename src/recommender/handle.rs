//! Process-wide access to the live snapshot.
//!
//! `SnapshotHandle` hands out `Arc<Snapshot>` clones, so a query keeps
//! working on the snapshot it started with while a refresh swaps in a new
//! one. `SnapshotFactory` owns the catalog source and makes sure the first
//! build happens exactly once even with concurrent first callers.

use super::snapshot::{Snapshot, SnapshotOptions};
use crate::catalog_source::{load_catalog, CatalogSource};
use anyhow::Result;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The live snapshot. Readers hold their own `Arc`, never the lock.
    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Replaces the live snapshot, returning the previous one.
    pub fn swap(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    pub fn generation(&self) -> u64 {
        self.current().generation()
    }
}

pub struct SnapshotFactory {
    source: Arc<dyn CatalogSource>,
    options: SnapshotOptions,
    handle: Mutex<Option<Arc<SnapshotHandle>>>,
}

impl SnapshotFactory {
    pub fn new(source: Arc<dyn CatalogSource>, options: SnapshotOptions) -> Self {
        Self {
            source,
            options,
            handle: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    pub fn source(&self) -> &Arc<dyn CatalogSource> {
        &self.source
    }

    /// Loads the catalog and builds a snapshot without touching the handle.
    pub fn build_snapshot(&self) -> Result<Snapshot> {
        let tracks = load_catalog(self.source.as_ref())?;
        Ok(Snapshot::build(tracks, &self.options)?)
    }

    /// Returns the shared handle, building the first snapshot if needed.
    /// Concurrent first callers wait on the lock and share one build. A failed
    /// build leaves the factory empty so the next call retries.
    pub fn get_or_build(&self) -> Result<Arc<SnapshotHandle>> {
        let mut slot = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }
        info!("Building initial snapshot from {}", self.source.describe());
        let handle = Arc::new(SnapshotHandle::new(self.build_snapshot()?));
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// The handle if one was already built.
    pub fn handle(&self) -> Option<Arc<SnapshotHandle>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Builds a fresh snapshot off to the side and swaps it in. The live
    /// snapshot stays in place when the build fails.
    pub fn rebuild(&self) -> Result<Arc<SnapshotHandle>> {
        let handle = match self.handle() {
            Some(handle) => handle,
            None => return self.get_or_build(),
        };
        let snapshot = self.build_snapshot()?;
        let previous = handle.swap(snapshot);
        info!(
            "Swapped snapshot generation {} for {}",
            previous.generation(),
            handle.generation()
        );
        Ok(handle)
    }
}
