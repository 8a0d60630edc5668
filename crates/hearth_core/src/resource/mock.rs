//! Resource source backed by in-memory cells.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_shared::ResRef;
use parking_lot::Mutex;

use super::{Resource, ResourceSource};
use crate::deferred::{Deferred, LoadCell};

/// Resources that can be declared ready, or pending and completed later.
#[derive(Default)]
pub struct MockResources {
    cells: Mutex<HashMap<ResRef, LoadCell<Resource>>>,
}

impl MockResources {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn cell(&self, res: ResRef) -> LoadCell<Resource> {
        self.cells
            .lock()
            .entry(res)
            .or_insert_with(|| LoadCell::pending(res.to_string()))
            .clone()
    }

    /// Makes `resource` available immediately.
    pub fn define(&self, res: ResRef, resource: Resource) {
        self.cell(res).set(resource);
    }

    /// Declares `res` as still loading.
    pub fn pending(&self, res: ResRef) {
        let _ = self.cell(res);
    }

    /// Finishes loading `res`, waking everyone waiting on it.
    pub fn complete(&self, res: ResRef, resource: Resource) {
        self.define(res, resource);
    }
}

impl ResourceSource for MockResources {
    fn resolve(&self, res: ResRef) -> Deferred<Arc<Resource>> {
        self.cell(res).get()
    }
}
