use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use cwb_core::{WidgetCommand, WidgetRuntime};

use crate::lock;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    ApplySettings(Value),
    Run(Value),
    Invoke(WidgetCommand),
}

/// Widget runtime that records every call in order.
#[derive(Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    run_delay: Mutex<Duration>,
    next_apply_delay: Mutex<Option<Duration>>,
    fail_run: AtomicBool,
    fail_commands: AtomicBool,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `run` busy for `delay` before it records and returns.
    pub fn set_run_delay(&self, delay: Duration) {
        *lock(&self.run_delay) = delay;
    }

    /// Holds only the next `apply_settings` call for `delay`.
    pub fn delay_next_apply(&self, delay: Duration) {
        *lock(&self.next_apply_delay) = Some(delay);
    }

    pub fn fail_run(&self, fail: bool) {
        self.fail_run.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        lock(&self.calls).clone()
    }

    pub fn run_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, RuntimeCall::Run(_)))
            .count()
    }

    pub fn commands(&self) -> Vec<WidgetCommand> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Invoke(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn invoked_methods(&self) -> Vec<&'static str> {
        self.commands()
            .iter()
            .map(WidgetCommand::method_name)
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl WidgetRuntime for RecordingRuntime {
    async fn apply_settings(&self, settings: &Value) -> Result<()> {
        let delay = lock(&self.next_apply_delay).take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.calls).push(RuntimeCall::ApplySettings(settings.clone()));
        Ok(())
    }

    async fn run(&self, settings: &Value) -> Result<()> {
        let delay = *lock(&self.run_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_run.load(Ordering::SeqCst) {
            bail!("chatwootSDK.run threw");
        }
        lock(&self.calls).push(RuntimeCall::Run(settings.clone()));
        Ok(())
    }

    async fn invoke(&self, command: &WidgetCommand) -> Result<()> {
        if self.fail_commands.load(Ordering::SeqCst) {
            bail!("$chatwoot.{} threw", command.method_name());
        }
        lock(&self.calls).push(RuntimeCall::Invoke(command.clone()));
        Ok(())
    }
}
