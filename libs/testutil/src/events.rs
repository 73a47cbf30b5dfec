use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::{Result, bail};

use cwb_core::{EventListener, EventPayload, EventSource, ListenerId};

use crate::lock;

/// Global event target keyed by event name.
#[derive(Default)]
pub struct InMemoryEventSource {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<&'static str, Vec<(ListenerId, EventListener)>>>,
    remaining_adds: Mutex<Option<usize>>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `count` more subscriptions succeed, then rejects the rest.
    pub fn fail_add_after(&self, count: usize) {
        *lock(&self.remaining_adds) = Some(count);
    }

    /// Fires `event_name` at every attached listener and awaits them in
    /// attach order. Returns how many listeners ran.
    pub async fn dispatch(&self, event_name: &str, payload: EventPayload) -> usize {
        let snapshot: Vec<EventListener> = lock(&self.listeners)
            .get(event_name)
            .map(|attached| attached.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in &snapshot {
            listener(payload.clone()).await;
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        lock(&self.listeners)
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        lock(&self.listeners).values().map(Vec::len).sum()
    }
}

impl EventSource for InMemoryEventSource {
    fn add_listener(&self, event_name: &'static str, listener: EventListener) -> Result<ListenerId> {
        if let Some(remaining) = lock(&self.remaining_adds).as_mut() {
            if *remaining == 0 {
                bail!("addEventListener rejected {event_name}");
            }
            *remaining -= 1;
        }
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.listeners)
            .entry(event_name)
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    fn remove_listener(&self, event_name: &'static str, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let Some(attached) = listeners.get_mut(event_name) else {
            return false;
        };
        let before = attached.len();
        attached.retain(|(existing, _)| *existing != id);
        let removed = attached.len() != before;
        if attached.is_empty() {
            listeners.remove(event_name);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::{Arc, atomic::AtomicUsize};

    fn counting(counter: Arc<AtomicUsize>) -> EventListener {
        Arc::new(move |_payload: EventPayload| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        })
    }

    #[tokio::test]
    async fn dispatch_reaches_only_named_listeners() {
        let source = InMemoryEventSource::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = source
            .add_listener("chatwoot:open", counting(hits.clone()))
            .unwrap();
        source
            .add_listener("chatwoot:close", counting(hits.clone()))
            .unwrap();

        assert_eq!(source.dispatch("chatwoot:open", None).await, 1);
        assert_eq!(source.dispatch("chatwoot:error", Some(json!(1))).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(source.remove_listener("chatwoot:open", id));
        assert!(!source.remove_listener("chatwoot:open", id));
        assert_eq!(source.total_listeners(), 1);
    }

    #[test]
    fn rejects_adds_past_the_limit() {
        let source = InMemoryEventSource::new();
        source.fail_add_after(1);
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(source.add_listener("a", counting(hits.clone())).is_ok());
        assert!(source.add_listener("b", counting(hits)).is_err());
    }
}
