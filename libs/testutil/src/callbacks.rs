use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use cwb_core::{WidgetCallbacks, WidgetEvent};

use crate::lock;

/// Host callbacks that record each delivery, and can be told to fail or
/// panic after recording it.
#[derive(Default)]
pub struct RecordingCallbacks {
    received: Mutex<Vec<(WidgetEvent, Value)>>,
    failing: AtomicBool,
    panicking: AtomicBool,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<(WidgetEvent, Value)> {
        lock(&self.received).clone()
    }

    pub fn count(&self, event: WidgetEvent) -> usize {
        lock(&self.received)
            .iter()
            .filter(|(seen, _)| *seen == event)
            .count()
    }

    pub fn payloads(&self, event: WidgetEvent) -> Vec<Value> {
        lock(&self.received)
            .iter()
            .filter(|(seen, _)| *seen == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn record(&self, event: WidgetEvent, payload: Value) -> Result<()> {
        lock(&self.received).push((event, payload));
        if self.panicking.load(Ordering::SeqCst) {
            panic!("{} panicked", event.callback_name());
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("{} failed", event.callback_name());
        }
        Ok(())
    }
}

#[async_trait]
impl WidgetCallbacks for RecordingCallbacks {
    async fn on_ready(&self) -> Result<()> {
        self.record(WidgetEvent::Ready, Value::Null)
    }

    async fn on_open(&self) -> Result<()> {
        self.record(WidgetEvent::Open, Value::Null)
    }

    async fn on_close(&self) -> Result<()> {
        self.record(WidgetEvent::Close, Value::Null)
    }

    async fn on_message(&self, payload: Value) -> Result<()> {
        self.record(WidgetEvent::Message, payload)
    }

    async fn on_error(&self, payload: Value) -> Result<()> {
        self.record(WidgetEvent::Error, payload)
    }
}
