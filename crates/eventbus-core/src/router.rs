//! Lazily-instantiated, per-category segment store lookup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::error::{validate_category, StoreError};
use crate::hook::SharedHook;
use crate::store::{Fs, Memory, SegmentStore};

/// Where a router's category stores persist their data.
#[derive(Clone)]
pub enum Backend {
    /// One directory per category under `root`, each an [`Fs`] store.
    Disk { root: PathBuf },
    /// Ephemeral, process-lifetime [`Memory`] stores.
    Memory,
}

/// Maps category name to segment store instance, constructing (and
/// recovering) a store on first access and caching it thereafter.
///
/// The mapping is guarded by a single mutex; entry creation is one-shot and
/// the first access for a category is the point at which that category's
/// startup recovery happens.
pub struct CategoryRouter {
    backend: Backend,
    hook: SharedHook,
    stores: Mutex<HashMap<String, Arc<dyn SegmentStore>>>,
}

impl CategoryRouter {
    pub fn new(backend: Backend, hook: SharedHook) -> Self {
        Self {
            backend,
            hook,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Look up (or lazily create) the store for `category`.
    pub fn get_or_create(&self, category: &str) -> Result<Arc<dyn SegmentStore>, StoreError> {
        validate_category(category)?;

        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(category) {
            return Ok(store.clone());
        }

        debug!("category {category:?}: first access, constructing store");
        let store: Arc<dyn SegmentStore> = match &self.backend {
            Backend::Disk { root } => {
                Arc::new(Fs::open(root.join(category), category, self.hook.clone()).map_err(StoreError::Io)?)
            }
            Backend::Memory => Arc::new(Memory::new(category, self.hook.clone())),
        };
        stores.insert(category.to_string(), store.clone());
        Ok(store)
    }
}
