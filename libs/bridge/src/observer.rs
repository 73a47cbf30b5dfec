use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use tracing::debug;

use cwb_core::{MutationCallback, MutationRecord, NodeRef, ObserverHandle, SharedDocument};

/// Watches the parent of a widget's host element for the element's removal.
pub struct TeardownObserver {
    document: SharedDocument,
}

impl TeardownObserver {
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }

    /// Attaches a child-list watcher to the parent of `element_id` and runs
    /// `on_removed` whenever a mutation batch lists the element as removed.
    ///
    /// Returns `None` when the element or its parent cannot be found.
    pub fn watch<F>(&self, element_id: &str, on_removed: F) -> Option<Box<dyn ObserverHandle>>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let Some(target) = self.document.element_by_id(element_id) else {
            debug!(element_id, "host element not found; no observer created");
            return None;
        };
        let Some(parent) = self.document.parent_of(target) else {
            debug!(element_id, "host element has no parent; no observer created");
            return None;
        };

        let on_removed = Arc::new(on_removed);
        let callback: MutationCallback = Arc::new(move |records: Vec<MutationRecord>| {
            if was_removed(&records, target) {
                on_removed()
            } else {
                async {}.boxed()
            }
        });
        Some(self.document.observe_children(parent, callback))
    }
}

fn was_removed(records: &[MutationRecord], target: NodeRef) -> bool {
    records
        .iter()
        .any(|record| record.removed_nodes.contains(&target))
}
