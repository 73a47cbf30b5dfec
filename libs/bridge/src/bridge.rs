use std::{
    future::Future,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, instrument, warn};

use cwb_core::{
    BridgeError, BridgeResult, BridgeSettings, MODULE_PATH, SharedCallbacks, SharedDocument,
    SharedEventSource, SharedResourceLoader, SharedWidgetRuntime, WidgetCommand,
    WidgetConfiguration,
};
use cwb_telemetry::{span_for_command, span_for_instance};

use crate::{
    fanout::EventFanout,
    initializer::SharedInitializer,
    observer::TeardownObserver,
    registry::{InstancePhase, InstanceRegistry},
};

/// Page-side collaborators the bridge drives.
#[derive(Clone)]
pub struct BridgeDeps {
    pub loader: SharedResourceLoader,
    pub runtime: SharedWidgetRuntime,
    pub events: SharedEventSource,
    pub document: SharedDocument,
}

/// Lifecycle bridge between host components and the Chatwoot widget runtime.
///
/// Clones share one set of instances and one SDK load. Commands for an
/// element that is not ready (unknown, still initializing, or torn down) are
/// dropped without error because hosts fire them without awaiting readiness.
///
/// The vendor runtime is a page-global singleton: several instances can be
/// registered, but they all drive the same underlying widget.
#[derive(Clone)]
pub struct ChatwootBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    settings: BridgeSettings,
    loader: SharedResourceLoader,
    runtime: SharedWidgetRuntime,
    initializer: SharedInitializer,
    registry: InstanceRegistry,
    fanout: EventFanout,
    observer: TeardownObserver,
    scope: CancellationToken,
    disposed: AtomicBool,
}

impl ChatwootBridge {
    pub fn new(deps: BridgeDeps, settings: BridgeSettings) -> Self {
        let scope = CancellationToken::new();
        let initializer =
            SharedInitializer::new(deps.loader.clone(), settings.clone(), scope.clone());
        Self {
            inner: Arc::new(BridgeInner {
                settings,
                loader: deps.loader,
                runtime: deps.runtime,
                initializer,
                registry: InstanceRegistry::new(),
                fanout: EventFanout::new(deps.events),
                observer: TeardownObserver::new(deps.document),
                scope,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.inner.settings
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self, element_id: &str) -> bool {
        self.inner.registry.is_ready(element_id)
    }

    pub fn instance_phase(&self, element_id: &str) -> Option<InstancePhase> {
        self.inner.registry.phase(element_id)
    }

    pub fn instance_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn has_observer(&self, element_id: &str) -> bool {
        self.inner.registry.has_observer(element_id)
    }

    pub fn attached_listeners(&self, element_id: &str) -> usize {
        self.inner.fanout.attached_count(element_id)
    }

    /// Loads the SDK (once per bridge), subscribes the widget events for
    /// `element_id`, and starts the runtime.
    ///
    /// No-op when `element_id` is already registered. A failed or cancelled
    /// init leaves neither listeners nor an instance behind.
    #[instrument(name = "chatwoot.init", skip(self, configuration, callbacks, cancel))]
    pub async fn init(
        &self,
        element_id: &str,
        configuration: &WidgetConfiguration,
        callbacks: SharedCallbacks,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.ensure_live()?;
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        let Some(generation) = self.inner.registry.try_begin(element_id, callbacks.clone())
        else {
            debug!("instance already registered; init skipped");
            return Ok(());
        };

        let guard = InitGuard {
            inner: &self.inner,
            element_id,
            generation,
            committed: false,
        };
        let started = self.cancellable(
            cancel,
            self.inner
                .start_instance(element_id, generation, configuration, callbacks, cancel),
        );
        match started.await {
            Ok(()) => {
                guard.commit();
                info!("widget instance ready");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "widget instance failed to start");
                Err(err)
            }
        }
    }

    /// Detaches listeners, disconnects the observer, resets the runtime and
    /// forgets the instance. No-op for unknown elements and after disposal.
    pub async fn shutdown(&self, element_id: &str, cancel: &CancellationToken) -> BridgeResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.inner.teardown(element_id, Some(cancel)).await
    }

    pub async fn toggle(&self, element_id: &str, cancel: &CancellationToken) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::Toggle, cancel).await
    }

    pub async fn set_user(
        &self,
        element_id: &str,
        identifier: impl Into<String>,
        attributes: Value,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        let command = WidgetCommand::SetUser {
            identifier: identifier.into(),
            attributes,
        };
        self.forward(element_id, command, cancel).await
    }

    pub async fn set_user_attributes(
        &self,
        element_id: &str,
        attributes: Value,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::SetUserAttributes(attributes), cancel)
            .await
    }

    pub async fn set_label(
        &self,
        element_id: &str,
        label: impl Into<String>,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::SetLabel(label.into()), cancel)
            .await
    }

    pub async fn remove_label(
        &self,
        element_id: &str,
        label: impl Into<String>,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::RemoveLabel(label.into()), cancel)
            .await
    }

    pub async fn set_locale(
        &self,
        element_id: &str,
        locale: impl Into<String>,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::SetLocale(locale.into()), cancel)
            .await
    }

    pub async fn delete_custom_attribute(
        &self,
        element_id: &str,
        key: impl Into<String>,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        let command = WidgetCommand::DeleteCustomAttribute(key.into());
        self.forward(element_id, command, cancel).await
    }

    pub async fn reset(&self, element_id: &str, cancel: &CancellationToken) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::Reset, cancel).await
    }

    pub async fn set_custom_attributes(
        &self,
        element_id: &str,
        attributes: Value,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        let command = WidgetCommand::SetCustomAttributes(attributes);
        self.forward(element_id, command, cancel).await
    }

    pub async fn popout_chat_window(
        &self,
        element_id: &str,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.forward(element_id, WidgetCommand::PopoutChatWindow, cancel)
            .await
    }

    /// Tears the instance down once its host element is removed from its
    /// parent. Returns `false` when no observer was created: the element, its
    /// parent, or the instance itself is missing.
    pub async fn create_observer(
        &self,
        element_id: &str,
        cancel: &CancellationToken,
    ) -> BridgeResult<bool> {
        self.ensure_live()?;
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        if !self.inner.registry.contains(element_id) {
            debug!(element_id, "no instance registered; observer not created");
            return Ok(false);
        }

        let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
        let owned_id = element_id.to_string();
        let handle = self.inner.observer.watch(element_id, move || {
            let weak = weak.clone();
            let element_id = owned_id.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                info!(element_id = %element_id, "host element removed; tearing widget down");
                if let Err(err) = inner.teardown(&element_id, None).await {
                    warn!(element_id = %element_id, error = %err, "observer teardown failed");
                }
            }
            .boxed()
        });
        let Some(handle) = handle else {
            return Ok(false);
        };

        match self.inner.registry.attach_observer(element_id, handle) {
            Ok(()) => Ok(true),
            Err(orphan) => {
                orphan.disconnect();
                Ok(false)
            }
        }
    }

    /// Tears down every remaining instance and releases the shared SDK load.
    /// Safe to call more than once; only the first call does any work.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.scope.cancel();

        let remaining = self.inner.registry.element_ids();
        info!(instances = remaining.len(), "disposing chatwoot bridge");
        for element_id in remaining {
            if let Err(err) = self.inner.teardown(&element_id, None).await {
                warn!(element_id = %element_id, error = %err, "teardown during dispose failed");
            }
        }
        self.inner.loader.dispose_module(MODULE_PATH).await;
        self.inner.initializer.reset().await;
    }

    async fn forward(
        &self,
        element_id: &str,
        command: WidgetCommand,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.ensure_live()?;
        let method = command.method_name();
        if !self.inner.registry.is_ready(element_id) {
            if self.inner.settings.warn_on_dropped_commands {
                warn!(element_id, method, "command dropped: widget instance is not ready");
            } else {
                debug!(element_id, method, "command dropped: widget instance is not ready");
            }
            return Ok(());
        }

        let runtime = self.inner.runtime.clone();
        let call = async move {
            runtime
                .invoke(&command)
                .await
                .map_err(|source| BridgeError::runtime(method, source))
        };
        self.cancellable(cancel, call)
            .instrument(span_for_command(method, element_id))
            .await
    }

    fn ensure_live(&self) -> BridgeResult<()> {
        if self.is_disposed() {
            return Err(BridgeError::AlreadyDisposed);
        }
        Ok(())
    }

    async fn cancellable<T>(
        &self,
        cancel: &CancellationToken,
        operation: impl Future<Output = BridgeResult<T>>,
    ) -> BridgeResult<T> {
        cancellable(&self.inner.scope, Some(cancel), operation).await
    }
}

impl BridgeInner {
    async fn start_instance(
        &self,
        element_id: &str,
        generation: u64,
        configuration: &WidgetConfiguration,
        callbacks: SharedCallbacks,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        self.initializer
            .ensure_loaded(configuration, cancel)
            .await?;

        let settings = configuration.to_value()?;
        self.ensure_current(element_id, generation)?;
        self.runtime
            .apply_settings(&settings)
            .await
            .map_err(|source| BridgeError::runtime("chatwootSettings", source))?;
        self.ensure_current(element_id, generation)?;
        self.fanout.attach(element_id, generation, callbacks)?;
        self.ensure_current(element_id, generation)?;
        self.runtime
            .run(&settings)
            .await
            .map_err(|source| BridgeError::runtime("chatwootSDK.run", source))?;

        if !self.registry.mark_ready(element_id, generation) {
            debug!(element_id, "instance was shut down while initializing");
            return Err(BridgeError::Cancelled);
        }
        Ok(())
    }

    /// Fails once `generation` no longer owns the registry slot, i.e. the
    /// instance was shut down (and possibly re-initialized) mid-startup.
    fn ensure_current(&self, element_id: &str, generation: u64) -> BridgeResult<()> {
        if self.registry.holds_generation(element_id, generation) {
            return Ok(());
        }
        debug!(element_id, generation, "instance was shut down while initializing");
        Err(BridgeError::Cancelled)
    }

    /// Shared by `shutdown`, observer-detected removal and disposal.
    async fn teardown(
        &self,
        element_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> BridgeResult<()> {
        let span = span_for_instance("teardown", element_id);
        let detached = self.fanout.detach(element_id);
        let Some(mut state) = self.registry.remove(element_id) else {
            if detached > 0 {
                debug!(parent: &span, detached, "removed listeners of an unregistered element");
            }
            return Ok(());
        };
        let observed = state.disconnect_observer();
        debug!(parent: &span, detached, observed, phase = ?state.phase(), "instance removed");

        let runtime = self.runtime.clone();
        let reset = async move {
            runtime
                .invoke(&WidgetCommand::Reset)
                .await
                .map_err(|source| BridgeError::runtime("reset", source))
        };
        match cancel {
            Some(cancel) => cancellable(&self.scope, Some(cancel), reset).instrument(span).await,
            None => reset.instrument(span).await,
        }
    }
}

async fn cancellable<T>(
    scope: &CancellationToken,
    cancel: Option<&CancellationToken>,
    operation: impl Future<Output = BridgeResult<T>>,
) -> BridgeResult<T> {
    let caller = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => futures::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        result = operation => result,
        _ = scope.cancelled() => Err(BridgeError::AlreadyDisposed),
        _ = caller => Err(BridgeError::Cancelled),
    }
}

/// Rolls an unfinished init back when dropped: listeners first, then the
/// registry slot, both scoped to the init's generation.
struct InitGuard<'a> {
    inner: &'a BridgeInner,
    element_id: &'a str,
    generation: u64,
    committed: bool,
}

impl InitGuard<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let detached = self
            .inner
            .fanout
            .detach_generation(self.element_id, self.generation);
        if let Some(mut state) = self
            .inner
            .registry
            .remove_generation(self.element_id, self.generation)
        {
            state.disconnect_observer();
        }
        debug!(
            element_id = self.element_id,
            generation = self.generation,
            detached,
            "rolled back unfinished init"
        );
    }
}
