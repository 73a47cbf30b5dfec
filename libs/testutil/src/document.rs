use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use cwb_core::{Document, MutationCallback, MutationRecord, NodeRef, ObserverHandle};

use crate::lock;

struct Observation {
    parent: NodeRef,
    callback: MutationCallback,
    disconnected: Arc<AtomicBool>,
}

#[derive(Default)]
struct Tree {
    next_node: u64,
    parents: HashMap<NodeRef, NodeRef>,
    ids: HashMap<String, NodeRef>,
    observations: Vec<Observation>,
}

impl Tree {
    fn allocate(&mut self) -> NodeRef {
        self.next_node += 1;
        NodeRef(self.next_node)
    }

    fn live_callbacks(&mut self, parent: NodeRef) -> Vec<MutationCallback> {
        self.observations
            .retain(|observation| !observation.disconnected.load(Ordering::SeqCst));
        self.observations
            .iter()
            .filter(|observation| observation.parent == parent)
            .map(|observation| observation.callback.clone())
            .collect()
    }
}

/// Minimal document tree with child-list observation.
///
/// Removed elements stop resolving through `element_by_id`, as in a browser.
#[derive(Default)]
pub struct FakeDocument {
    tree: Mutex<Tree>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node with no parent, standing in for `<body>`.
    pub fn create_root(&self) -> NodeRef {
        lock(&self.tree).allocate()
    }

    /// Attaches a new element with `id` under `parent` without notifying
    /// observers.
    pub fn append_element(&self, parent: NodeRef, id: &str) -> NodeRef {
        let mut tree = lock(&self.tree);
        let node = tree.allocate();
        tree.parents.insert(node, parent);
        tree.ids.insert(id.to_string(), node);
        node
    }

    /// Element registered under `id` that has no parent.
    pub fn create_detached(&self, id: &str) -> NodeRef {
        let mut tree = lock(&self.tree);
        let node = tree.allocate();
        tree.ids.insert(id.to_string(), node);
        node
    }

    /// Body plus one child element with `id`; returns `(body, element)`.
    pub fn mount_host(&self, id: &str) -> (NodeRef, NodeRef) {
        let body = self.create_root();
        let element = self.append_element(body, id);
        (body, element)
    }

    /// Attaches a new element and reports the insertion to observers.
    pub async fn insert_element(&self, parent: NodeRef, id: &str) -> NodeRef {
        let node = self.append_element(parent, id);
        let record = MutationRecord {
            target: Some(parent),
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        };
        self.notify(parent, record).await;
        node
    }

    /// Detaches `node` from its parent and reports the removal to observers
    /// of that parent. Returns `false` when the node was not attached.
    pub async fn remove(&self, node: NodeRef) -> bool {
        let parent = {
            let mut tree = lock(&self.tree);
            let Some(parent) = tree.parents.remove(&node) else {
                return false;
            };
            tree.ids.retain(|_, existing| *existing != node);
            parent
        };
        let record = MutationRecord {
            target: Some(parent),
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        };
        self.notify(parent, record).await;
        true
    }

    pub fn active_observers(&self) -> usize {
        lock(&self.tree)
            .observations
            .iter()
            .filter(|observation| !observation.disconnected.load(Ordering::SeqCst))
            .count()
    }

    async fn notify(&self, parent: NodeRef, record: MutationRecord) {
        let callbacks = lock(&self.tree).live_callbacks(parent);
        for callback in callbacks {
            callback(vec![record.clone()]).await;
        }
    }
}

impl Document for FakeDocument {
    fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        lock(&self.tree).ids.get(id).copied()
    }

    fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        lock(&self.tree).parents.get(&node).copied()
    }

    fn observe_children(
        &self,
        parent: NodeRef,
        callback: MutationCallback,
    ) -> Box<dyn ObserverHandle> {
        let disconnected = Arc::new(AtomicBool::new(false));
        lock(&self.tree).observations.push(Observation {
            parent,
            callback,
            disconnected: disconnected.clone(),
        });
        Box::new(FakeObserverHandle { disconnected })
    }
}

pub struct FakeObserverHandle {
    disconnected: Arc<AtomicBool>,
}

impl FakeObserverHandle {
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl ObserverHandle for FakeObserverHandle {
    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
