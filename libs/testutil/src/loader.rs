use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cwb_core::{LoadError, ResourceLoader};

use crate::lock;

/// How a fake script or module responds once requested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadBehavior {
    #[default]
    Available,
    /// The global never appears; the load only ends through cancellation.
    Never,
    Fail(String),
}

/// Loader that counts requests and resolves according to [`LoadBehavior`].
#[derive(Default)]
pub struct FakeResourceLoader {
    script: Mutex<LoadBehavior>,
    module: Mutex<LoadBehavior>,
    delay: Mutex<Duration>,
    module_ready_after_polls: AtomicUsize,
    script_loads: AtomicUsize,
    module_imports: AtomicUsize,
    module_polls: AtomicUsize,
    requested_urls: Mutex<Vec<String>>,
    disposed: Mutex<Vec<String>>,
}

impl FakeResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_script_behavior(&self, behavior: LoadBehavior) {
        *lock(&self.script) = behavior;
    }

    pub fn set_module_behavior(&self, behavior: LoadBehavior) {
        *lock(&self.module) = behavior;
    }

    /// Delay before the script global appears.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    /// Number of polls before the module export becomes reachable.
    pub fn set_module_ready_after_polls(&self, polls: usize) {
        self.module_ready_after_polls.store(polls, Ordering::SeqCst);
    }

    pub fn script_loads(&self) -> usize {
        self.script_loads.load(Ordering::SeqCst)
    }

    pub fn module_imports(&self) -> usize {
        self.module_imports.load(Ordering::SeqCst)
    }

    pub fn module_polls(&self) -> usize {
        self.module_polls.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        lock(&self.requested_urls).clone()
    }

    pub fn disposed_modules(&self) -> Vec<String> {
        lock(&self.disposed).clone()
    }
}

async fn sleep_or_cancel(
    delay: Duration,
    cancel: &CancellationToken,
    resource: &str,
) -> Result<(), LoadError> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = cancel.cancelled() => Err(LoadError::cancelled(resource)),
    }
}

#[async_trait]
impl ResourceLoader for FakeResourceLoader {
    async fn load_script_and_wait_for_global(
        &self,
        url: &str,
        global: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError> {
        self.script_loads.fetch_add(1, Ordering::SeqCst);
        lock(&self.requested_urls).push(url.to_string());

        let delay = *lock(&self.delay);
        sleep_or_cancel(delay, cancel, url).await?;
        let behavior = lock(&self.script).clone();
        match behavior {
            LoadBehavior::Available => Ok(()),
            LoadBehavior::Never => {
                cancel.cancelled().await;
                Err(LoadError::cancelled(global))
            }
            LoadBehavior::Fail(reason) => Err(LoadError::Unavailable {
                resource: url.to_string(),
                reason,
            }),
        }
    }

    async fn import_module_and_wait_until_available(
        &self,
        module_path: &str,
        export_name: &str,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError> {
        self.module_imports.fetch_add(1, Ordering::SeqCst);
        let behavior = lock(&self.module).clone();
        if let LoadBehavior::Fail(reason) = behavior {
            return Err(LoadError::Unavailable {
                resource: module_path.to_string(),
                reason,
            });
        }

        let ready_after = self.module_ready_after_polls.load(Ordering::SeqCst);
        let mut polls = 0usize;
        loop {
            self.module_polls.fetch_add(1, Ordering::SeqCst);
            polls += 1;
            if behavior == LoadBehavior::Available && polls >= ready_after {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = cancel.cancelled() => return Err(LoadError::cancelled(export_name)),
            }
        }
    }

    async fn dispose_module(&self, module_path: &str) {
        lock(&self.disposed).push(module_path.to_string());
    }
}
