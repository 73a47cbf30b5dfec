//! Seams between the bridge and the browser it drives.
//!
//! Production binds these to the page (`window`, `document`, the SDK globals);
//! tests bind them to the in-memory doubles from `cwb-testutil`.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{EventPayload, LoadError, WidgetCommand};

/// Global the SDK script defines once it has executed.
pub const SDK_GLOBAL: &str = "chatwootSDK";
/// Static asset path of the bridge module shipped with the host package.
pub const MODULE_PATH: &str = "chatwoot-bridge/js/chatwootinterop.js";
/// Name the bridge module registers itself under once imported.
pub const MODULE_EXPORT: &str = "ChatwootInterop";

/// Fetches scripts and modules into the page.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Injects a `<script>` for `url` and resolves once `global` is defined.
    async fn load_script_and_wait_for_global(
        &self,
        url: &str,
        global: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError>;

    /// Imports `module_path` and polls every `poll_interval` until
    /// `export_name` is reachable.
    async fn import_module_and_wait_until_available(
        &self,
        module_path: &str,
        export_name: &str,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError>;

    async fn dispose_module(&self, module_path: &str);
}

pub type SharedResourceLoader = Arc<dyn ResourceLoader>;

/// The process-global widget handle (`window.chatwootSDK` / `window.$chatwoot`).
///
/// The vendor runtime keeps one global widget per page, so implementations
/// are not expected to host more than one live widget at a time.
#[async_trait]
pub trait WidgetRuntime: Send + Sync {
    /// Publishes the settings object the runtime reads on start.
    async fn apply_settings(&self, settings: &Value) -> anyhow::Result<()>;

    /// Starts the widget with the previously applied settings.
    async fn run(&self, settings: &Value) -> anyhow::Result<()>;

    async fn invoke(&self, command: &WidgetCommand) -> anyhow::Result<()>;
}

pub type SharedWidgetRuntime = Arc<dyn WidgetRuntime>;

/// Opaque handle returned by [`EventSource::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type EventListener = Arc<dyn Fn(EventPayload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Named global event target (`window.addEventListener`).
pub trait EventSource: Send + Sync {
    fn add_listener(
        &self,
        event_name: &'static str,
        listener: EventListener,
    ) -> anyhow::Result<ListenerId>;

    /// Returns `false` when the listener was not attached.
    fn remove_listener(&self, event_name: &'static str, id: ListenerId) -> bool;
}

pub type SharedEventSource = Arc<dyn EventSource>;

/// Opaque reference to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

/// One child-list change reported to an observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: Option<NodeRef>,
    pub added_nodes: Vec<NodeRef>,
    pub removed_nodes: Vec<NodeRef>,
}

pub type MutationCallback =
    Arc<dyn Fn(Vec<MutationRecord>) -> BoxFuture<'static, ()> + Send + Sync>;

pub trait ObserverHandle: Send + Sync {
    fn disconnect(&self);
}

/// Structural view of the host document.
pub trait Document: Send + Sync {
    fn element_by_id(&self, id: &str) -> Option<NodeRef>;

    fn parent_of(&self, node: NodeRef) -> Option<NodeRef>;

    /// Watches direct-child insertions and removals under `parent`.
    fn observe_children(
        &self,
        parent: NodeRef,
        callback: MutationCallback,
    ) -> Box<dyn ObserverHandle>;
}

pub type SharedDocument = Arc<dyn Document>;
