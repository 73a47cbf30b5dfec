#![allow(dead_code)]

use std::sync::Arc;

use cwb_bridge::{BridgeDeps, ChatwootBridge};
use cwb_core::{BridgeResult, BridgeSettings, NodeRef, WidgetConfiguration};
use cwb_testutil::{RecordingCallbacks, TestDoubles};
use tokio_util::sync::CancellationToken;

pub const SDK_URL: &str = "https://chat.example.com/packs/js/sdk.js";

pub fn config() -> WidgetConfiguration {
    WidgetConfiguration::builder("site-token")
        .base_url("https://chat.example.com/")
        .build()
}

pub fn deps(doubles: &TestDoubles) -> BridgeDeps {
    BridgeDeps {
        loader: doubles.loader.clone(),
        runtime: doubles.runtime.clone(),
        events: doubles.events.clone(),
        document: doubles.document.clone(),
    }
}

pub struct Harness {
    pub doubles: TestDoubles,
    pub bridge: ChatwootBridge,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(BridgeSettings::default())
    }

    pub fn with_settings(settings: BridgeSettings) -> Self {
        let doubles = TestDoubles::new();
        let bridge = ChatwootBridge::new(deps(&doubles), settings);
        Self { doubles, bridge }
    }

    pub async fn init(
        &self,
        element_id: &str,
        callbacks: &Arc<RecordingCallbacks>,
    ) -> BridgeResult<()> {
        self.bridge
            .init(
                element_id,
                &config(),
                callbacks.clone(),
                &CancellationToken::new(),
            )
            .await
    }

    /// Host element in the document plus a ready instance bound to it.
    pub async fn ready(&self, element_id: &str) -> (Arc<RecordingCallbacks>, NodeRef) {
        let (_, element) = self.doubles.document.mount_host(element_id);
        let callbacks = Arc::new(RecordingCallbacks::new());
        self.init(element_id, &callbacks)
            .await
            .expect("instance starts");
        (callbacks, element)
    }

    /// Starts `init` on a separate task.
    pub fn spawn_init(
        &self,
        element_id: &'static str,
        callbacks: &Arc<RecordingCallbacks>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<BridgeResult<()>> {
        let bridge = self.bridge.clone();
        let callbacks = callbacks.clone();
        tokio::spawn(async move { bridge.init(element_id, &config(), callbacks, &cancel).await })
    }
}

pub fn token() -> CancellationToken {
    CancellationToken::new()
}
