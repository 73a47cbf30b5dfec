use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::FutureExt;
use tracing::{Instrument, debug, warn};

use cwb_core::{
    BridgeError, BridgeResult, EventListener, EventPayload, ListenerId, SharedCallbacks,
    SharedEventSource, WidgetEvent, deliver,
};
use cwb_telemetry::span_for_event;

struct ListenerSet {
    generation: u64,
    listeners: Vec<(WidgetEvent, ListenerId)>,
}

/// Attaches one listener per [`WidgetEvent`] for each instance and keeps the
/// listener ids so they can be removed deterministically.
pub struct EventFanout {
    source: SharedEventSource,
    attached: DashMap<String, ListenerSet>,
}

impl EventFanout {
    pub fn new(source: SharedEventSource) -> Self {
        Self {
            source,
            attached: DashMap::new(),
        }
    }

    /// Subscribes every widget event for `element_id`. Either all listeners
    /// end up attached or none are. A set left by an older generation is
    /// replaced; a newer generation's set is never touched.
    pub fn attach(
        &self,
        element_id: &str,
        generation: u64,
        callbacks: SharedCallbacks,
    ) -> BridgeResult<()> {
        let element: Arc<str> = Arc::from(element_id);
        let mut listeners = Vec::with_capacity(WidgetEvent::ALL.len());
        for event in WidgetEvent::ALL {
            let listener = listener_for(element.clone(), event, callbacks.clone());
            match self.source.add_listener(event.event_name(), listener) {
                Ok(id) => listeners.push((event, id)),
                Err(source) => {
                    self.remove_all(&listeners);
                    return Err(BridgeError::Subscription {
                        event: event.event_name(),
                        source,
                    });
                }
            }
        }

        match self.attached.entry(element_id.to_string()) {
            Entry::Occupied(slot) if slot.get().generation > generation => {
                drop(slot);
                debug!(element_id, generation, "newer instance already subscribed");
                self.remove_all(&listeners);
                Err(BridgeError::Cancelled)
            }
            Entry::Occupied(mut slot) => {
                let stale = slot.insert(ListenerSet {
                    generation,
                    listeners,
                });
                drop(slot);
                debug!(element_id, "replacing stale listener set");
                self.remove_all(&stale.listeners);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(ListenerSet {
                    generation,
                    listeners,
                });
                Ok(())
            }
        }
    }

    /// Removes every listener attached for `element_id`; returns how many.
    pub fn detach(&self, element_id: &str) -> usize {
        match self.attached.remove(element_id) {
            Some((_, set)) => self.remove_all(&set.listeners),
            None => 0,
        }
    }

    /// Like [`Self::detach`] but leaves a newer instance's listeners alone.
    pub fn detach_generation(&self, element_id: &str, generation: u64) -> usize {
        match self
            .attached
            .remove_if(element_id, |_, set| set.generation == generation)
        {
            Some((_, set)) => self.remove_all(&set.listeners),
            None => 0,
        }
    }

    pub fn attached_count(&self, element_id: &str) -> usize {
        self.attached
            .get(element_id)
            .map(|set| set.listeners.len())
            .unwrap_or(0)
    }

    fn remove_all(&self, listeners: &[(WidgetEvent, ListenerId)]) -> usize {
        listeners
            .iter()
            .filter(|(event, id)| {
                let removed = self.source.remove_listener(event.event_name(), *id);
                if !removed {
                    warn!(event = %event, listener = id.0, "listener was already detached");
                }
                removed
            })
            .count()
    }
}

fn listener_for(element: Arc<str>, event: WidgetEvent, callbacks: SharedCallbacks) -> EventListener {
    Arc::new(move |payload: EventPayload| {
        let span = span_for_event(event.event_name(), &element);
        let element = element.clone();
        let callbacks = callbacks.clone();
        async move {
            let outcome = AssertUnwindSafe(deliver(callbacks.as_ref(), event, payload))
                .catch_unwind()
                .await;
            let failure = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(source)) => BridgeError::CallbackFailure {
                    method: event.callback_name(),
                    source,
                },
                Err(panic) => BridgeError::CallbackFailure {
                    method: event.callback_name(),
                    source: anyhow::anyhow!("callback panicked: {}", panic_message(panic.as_ref())),
                },
            };
            warn!(element_id = %element, event = %event, error = %failure, "chatwoot callback error");
        }
        .instrument(span)
        .boxed()
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwb_testutil::{InMemoryEventSource, RecordingCallbacks};

    fn fanout() -> (Arc<InMemoryEventSource>, EventFanout) {
        let source = Arc::new(InMemoryEventSource::new());
        let fanout = EventFanout::new(source.clone());
        (source, fanout)
    }

    #[test]
    fn older_generation_cannot_displace_newer_listeners() {
        let (source, fanout) = fanout();
        fanout
            .attach("chat", 2, Arc::new(RecordingCallbacks::new()))
            .unwrap();

        let err = fanout
            .attach("chat", 1, Arc::new(RecordingCallbacks::new()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
        assert_eq!(fanout.attached_count("chat"), 5);
        assert_eq!(source.total_listeners(), 5);

        assert_eq!(fanout.detach_generation("chat", 1), 0);
        assert_eq!(fanout.detach_generation("chat", 2), 5);
        assert_eq!(source.total_listeners(), 0);
    }

    #[test]
    fn newer_generation_replaces_stale_listeners() {
        let (source, fanout) = fanout();
        fanout
            .attach("chat", 1, Arc::new(RecordingCallbacks::new()))
            .unwrap();
        fanout
            .attach("chat", 2, Arc::new(RecordingCallbacks::new()))
            .unwrap();

        assert_eq!(source.total_listeners(), 5);
        assert_eq!(fanout.detach_generation("chat", 1), 0);
        assert_eq!(fanout.attached_count("chat"), 5);
    }
}
