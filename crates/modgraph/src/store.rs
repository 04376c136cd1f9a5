//! Shared descriptor store
//!
//! Readers take an `Arc` snapshot of the current set and resolve against it
//! without holding any lock. A reload builds a complete new set first and
//! swaps it in as a whole, so in-flight resolutions keep the set they
//! started with.

use crate::descriptor::{DescriptorError, DescriptorSet};
use crate::resolver::{resolve, ResolveError, ResolvedPlan, TargetRequest};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Single-writer, multiple-reader holder of the current descriptor set
#[derive(Debug, Default)]
pub struct DescriptorStore {
    current: RwLock<Arc<DescriptorSet>>,
    generation: AtomicU64,
}

impl DescriptorStore {
    /// Create a store holding `set`
    pub fn new(set: DescriptorSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
            generation: AtomicU64::new(0),
        }
    }

    /// Load a store from a descriptor file
    pub fn open(path: &Path) -> Result<Self, DescriptorError> {
        Ok(Self::new(DescriptorSet::from_file(path)?))
    }

    /// Current set; stays valid even if the store is reloaded afterwards
    pub fn snapshot(&self) -> Arc<DescriptorSet> {
        Arc::clone(&self.current.read())
    }

    /// Number of successful swaps since creation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Swap in a new set, returning the previous one
    pub fn replace(&self, set: DescriptorSet) -> Arc<DescriptorSet> {
        let modules = set.len();
        let next = Arc::new(set);
        let (previous, generation) = {
            let mut current = self.current.write();
            let previous = std::mem::replace(&mut *current, next);
            // Bumped under the write lock so a snapshot never runs ahead of it
            (previous, self.generation.fetch_add(1, Ordering::AcqRel) + 1)
        };
        log::info!(
            "Swapped descriptor set ({} modules, generation {})",
            modules, generation
        );
        previous
    }

    /// Re-read a descriptor file and swap it in
    ///
    /// The file is fully parsed and validated before the swap; on error the
    /// current set is left untouched.
    pub fn reload_from_file(&self, path: &Path) -> Result<Arc<DescriptorSet>, DescriptorError> {
        let set = DescriptorSet::from_file(path).inspect_err(|err| {
            log::warn!("Reload of {} failed, keeping current set: {}", path.display(), err)
        })?;
        Ok(self.replace(set))
    }

    /// Resolve against the current snapshot
    pub fn resolve(&self, request: &TargetRequest) -> Result<ResolvedPlan, ResolveError> {
        let set = self.snapshot();
        resolve(&set, request)
    }
}
