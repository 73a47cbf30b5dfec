//! Process-wide, once-only loading of the widget SDK and the bridge module.

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cwb_core::{
    BridgeSettings, LoadError, MODULE_EXPORT, MODULE_PATH, SDK_GLOBAL, SharedResourceLoader,
    WidgetConfiguration,
};

type LoadFuture = Shared<BoxFuture<'static, Result<(), LoadError>>>;

/// Single-flight gate in front of the [`cwb_core::ResourceLoader`].
///
/// The first caller's configuration picks the SDK URL. Everyone after that,
/// concurrent or not, awaits the same load and receives the same cached
/// outcome until [`SharedInitializer::reset`] is called.
pub struct SharedInitializer {
    loader: SharedResourceLoader,
    settings: BridgeSettings,
    scope: CancellationToken,
    slot: Mutex<Option<LoadFuture>>,
}

impl SharedInitializer {
    /// `scope` cancels the in-flight load for every caller at once.
    pub fn new(
        loader: SharedResourceLoader,
        settings: BridgeSettings,
        scope: CancellationToken,
    ) -> Self {
        Self {
            loader,
            settings,
            scope,
            slot: Mutex::new(None),
        }
    }

    /// Triggers the load or joins the one already started.
    ///
    /// `cancel` only stops this caller from waiting; the shared load keeps
    /// going for the others.
    pub async fn ensure_loaded(
        &self,
        config: &WidgetConfiguration,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError> {
        let load = self.trigger_or_join(config).await;
        tokio::select! {
            biased;
            result = load => result,
            _ = cancel.cancelled() => {
                debug!("caller stopped waiting for the widget SDK");
                Err(LoadError::cancelled(SDK_GLOBAL))
            }
        }
    }

    /// Whether a load has been started since construction or the last reset.
    pub async fn is_started(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Outcome of the load when it has already finished.
    pub async fn outcome(&self) -> Option<Result<(), LoadError>> {
        self.slot
            .lock()
            .await
            .as_ref()
            .and_then(|load| load.peek().cloned())
    }

    /// Forgets the cached load so the next caller starts a fresh one.
    pub async fn reset(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!("shared widget SDK load state released");
        }
    }

    async fn trigger_or_join(&self, config: &WidgetConfiguration) -> LoadFuture {
        let mut slot = self.slot.lock().await;
        if let Some(load) = slot.as_ref() {
            return load.clone();
        }
        let load = load_sdk(
            self.loader.clone(),
            config.sdk_url(),
            self.settings.clone(),
            self.scope.child_token(),
        )
        .boxed()
        .shared();
        *slot = Some(load.clone());
        load
    }
}

async fn load_sdk(
    loader: SharedResourceLoader,
    sdk_url: String,
    settings: BridgeSettings,
    cancel: CancellationToken,
) -> Result<(), LoadError> {
    info!(sdk_url = %sdk_url, "loading widget SDK");
    let steps = async {
        loader
            .load_script_and_wait_for_global(&sdk_url, SDK_GLOBAL, &cancel)
            .await?;
        loader
            .import_module_and_wait_until_available(
                MODULE_PATH,
                MODULE_EXPORT,
                settings.module_poll_interval,
                &cancel,
            )
            .await
    };

    let result = match settings.load_timeout {
        Some(limit) => match tokio::time::timeout(limit, steps).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(LoadError::TimedOut {
                    resource: sdk_url.clone(),
                    waited: limit,
                })
            }
        },
        None => steps.await,
    };

    match &result {
        Ok(()) => info!(sdk_url = %sdk_url, "widget SDK ready"),
        Err(err) => warn!(sdk_url = %sdk_url, error = %err, "widget SDK failed to load"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwb_testutil::{FakeResourceLoader, LoadBehavior};
    use std::{sync::Arc, time::Duration};

    fn initializer(loader: &Arc<FakeResourceLoader>) -> SharedInitializer {
        SharedInitializer::new(
            loader.clone(),
            BridgeSettings::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn outcome_is_cached_until_reset() {
        let loader = Arc::new(FakeResourceLoader::new());
        loader.set_script_behavior(LoadBehavior::Fail("offline".into()));
        let gate = initializer(&loader);
        let config = WidgetConfiguration::new("token");
        let cancel = CancellationToken::new();

        assert!(!gate.is_started().await);
        let first = gate.ensure_loaded(&config, &cancel).await.unwrap_err();
        let second = gate.ensure_loaded(&config, &cancel).await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(gate.outcome().await, Some(Err(first)));
        assert_eq!(loader.script_loads(), 1);

        gate.reset().await;
        assert!(!gate.is_started().await);
        loader.set_script_behavior(LoadBehavior::Available);
        gate.ensure_loaded(&config, &cancel).await.unwrap();
        assert_eq!(gate.outcome().await, Some(Ok(())));
        assert_eq!(loader.script_loads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_callers_config_picks_the_sdk_url() {
        let loader = Arc::new(FakeResourceLoader::new());
        loader.set_delay(Duration::from_millis(10));
        let gate = initializer(&loader);
        let cancel = CancellationToken::new();
        let first = WidgetConfiguration::builder("a")
            .base_url("https://one.example.com/")
            .build();
        let second = WidgetConfiguration::builder("b")
            .base_url("https://two.example.com")
            .build();

        let (a, b) = tokio::join!(
            gate.ensure_loaded(&first, &cancel),
            gate.ensure_loaded(&second, &cancel)
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(
            loader.requested_urls(),
            vec!["https://one.example.com/packs/js/sdk.js"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scope_cancellation_aborts_the_load_for_everyone() {
        let loader = Arc::new(FakeResourceLoader::new());
        loader.set_script_behavior(LoadBehavior::Never);
        let scope = CancellationToken::new();
        let gate = SharedInitializer::new(loader.clone(), BridgeSettings::default(), scope.clone());
        let config = WidgetConfiguration::new("token");
        let cancel = CancellationToken::new();

        let waiting = gate.ensure_loaded(&config, &cancel);
        let cancelling = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            scope.cancel();
        };
        let (result, ()) = tokio::join!(waiting, cancelling);
        assert!(matches!(result, Err(LoadError::Cancelled { .. })));
    }
}
