//! In-memory stand-ins for the page: script loader, widget runtime, global
//! event target and document tree. Each double records what the bridge did to
//! it so tests can assert on calls instead of timing.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod callbacks;
mod document;
mod events;
mod loader;
mod runtime;

pub use callbacks::RecordingCallbacks;
pub use document::{FakeDocument, FakeObserverHandle};
pub use events::InMemoryEventSource;
pub use loader::{FakeResourceLoader, LoadBehavior};
pub use runtime::{RecordingRuntime, RuntimeCall};

/// One fresh instance of every page double.
#[derive(Clone, Default)]
pub struct TestDoubles {
    pub loader: Arc<FakeResourceLoader>,
    pub runtime: Arc<RecordingRuntime>,
    pub events: Arc<InMemoryEventSource>,
    pub document: Arc<FakeDocument>,
}

impl TestDoubles {
    pub fn new() -> Self {
        Self::default()
    }
}

// A panicking test callback must not wedge the other doubles.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
