use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};

use cwb_core::{ObserverHandle, SharedCallbacks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancePhase {
    Initializing,
    Ready,
}

/// Per-element record held while a widget instance is alive.
pub struct InstanceState {
    phase: InstancePhase,
    generation: u64,
    callbacks: SharedCallbacks,
    observer: Option<Box<dyn ObserverHandle>>,
}

impl InstanceState {
    pub fn phase(&self) -> InstancePhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn callbacks(&self) -> &SharedCallbacks {
        &self.callbacks
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Returns `true` when an observer was attached.
    pub fn disconnect_observer(&mut self) -> bool {
        match self.observer.take() {
            Some(observer) => {
                observer.disconnect();
                true
            }
            None => false,
        }
    }
}

/// Element id → [`InstanceState`].
///
/// Membership, not readiness, is the init guard: an element that is still
/// initializing already occupies its slot.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: DashMap<String, InstanceState>,
    next_generation: AtomicU64,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `element_id` for a new instance. Returns its generation, or
    /// `None` when the element is already registered.
    pub fn try_begin(&self, element_id: &str, callbacks: SharedCallbacks) -> Option<u64> {
        match self.instances.entry(element_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
                slot.insert(InstanceState {
                    phase: InstancePhase::Initializing,
                    generation,
                    callbacks,
                    observer: None,
                });
                Some(generation)
            }
        }
    }

    /// Flips an initializing instance to ready. Fails when the slot was torn
    /// down or re-claimed in the meantime.
    pub fn mark_ready(&self, element_id: &str, generation: u64) -> bool {
        match self.instances.get_mut(element_id) {
            Some(mut state) if state.generation == generation => {
                state.phase = InstancePhase::Ready;
                true
            }
            _ => false,
        }
    }

    /// Whether the slot for `element_id` still belongs to `generation`.
    pub fn holds_generation(&self, element_id: &str, generation: u64) -> bool {
        self.instances
            .get(element_id)
            .is_some_and(|state| state.generation == generation)
    }

    pub fn phase(&self, element_id: &str) -> Option<InstancePhase> {
        self.instances.get(element_id).map(|state| state.phase)
    }

    pub fn is_ready(&self, element_id: &str) -> bool {
        self.phase(element_id) == Some(InstancePhase::Ready)
    }

    pub fn contains(&self, element_id: &str) -> bool {
        self.instances.contains_key(element_id)
    }

    pub fn has_observer(&self, element_id: &str) -> bool {
        self.instances
            .get(element_id)
            .map(|state| state.has_observer())
            .unwrap_or(false)
    }

    /// Stores `observer` on the instance, disconnecting any previous one.
    /// Hands the observer back when the element is not registered.
    pub fn attach_observer(
        &self,
        element_id: &str,
        observer: Box<dyn ObserverHandle>,
    ) -> Result<(), Box<dyn ObserverHandle>> {
        match self.instances.get_mut(element_id) {
            Some(mut state) => {
                state.disconnect_observer();
                state.observer = Some(observer);
                Ok(())
            }
            None => Err(observer),
        }
    }

    pub fn remove(&self, element_id: &str) -> Option<InstanceState> {
        self.instances.remove(element_id).map(|(_, state)| state)
    }

    /// Removes the entry only if it still belongs to `generation`.
    pub fn remove_generation(&self, element_id: &str, generation: u64) -> Option<InstanceState> {
        self.instances
            .remove_if(element_id, |_, state| state.generation == generation)
            .map(|(_, state)| state)
    }

    pub fn element_ids(&self) -> Vec<String> {
        self.instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
