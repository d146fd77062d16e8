//! Process-wide, load-once access to the artifacts.
//!
//! The artifacts never change under a running process, so the first
//! successful load is kept for the process lifetime. Initialization is
//! serialized by a mutex; after that, reads go through the `OnceLock` and
//! never touch the mutex.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

use crate::error::Result;
use crate::loader::{self, ArtifactPaths};
use crate::types::ArtifactBundle;

/// Memoizing wrapper around [`loader::load`]
#[derive(Debug)]
pub struct ArtifactCache {
    paths: ArtifactPaths,
    bundle: OnceLock<Arc<ArtifactBundle>>,
    init_lock: Mutex<()>,
    loads: AtomicUsize,
}

impl ArtifactCache {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            bundle: OnceLock::new(),
            init_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Return the cached bundle, loading it first if needed.
    ///
    /// Concurrent first callers block on the init lock; exactly one of them
    /// reads the files. A failed load leaves the cache empty.
    pub fn get_or_load(&self) -> Result<Arc<ArtifactBundle>> {
        if let Some(bundle) = self.bundle.get() {
            return Ok(Arc::clone(bundle));
        }

        // The guarded data is `()`, so a poisoned lock carries no broken state
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(bundle) = self.bundle.get() {
            debug!("Artifacts loaded by another caller while waiting");
            return Ok(Arc::clone(bundle));
        }

        self.loads.fetch_add(1, Ordering::SeqCst);
        let bundle = Arc::new(loader::load(&self.paths)?);
        // Only this thread can set the cell while holding the lock
        let _ = self.bundle.set(Arc::clone(&bundle));
        Ok(bundle)
    }

    /// The cached bundle, if a load has already succeeded
    pub fn get(&self) -> Option<Arc<ArtifactBundle>> {
        self.bundle.get().cloned()
    }

    /// How many times the files were actually read
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
