//! Host-side widget component: one element id, one configuration, typed
//! event handlers, and commands that need no element id.
use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use cwb_core::{BridgeResult, ChatwootMessage, WidgetCallbacks, WidgetConfiguration};

use crate::ChatwootBridge;

type Handler = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;
type PayloadHandler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Typed event handlers. Unset handlers ignore their event.
#[derive(Clone, Default)]
pub struct WidgetHandlers {
    on_ready: Option<Handler>,
    on_open: Option<Handler>,
    on_close: Option<Handler>,
    on_message: Option<PayloadHandler<ChatwootMessage>>,
    on_error: Option<PayloadHandler<Value>>,
}

impl WidgetHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_ready<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_ready = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn handle_open<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_open = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn handle_close<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_close = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn handle_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ChatwootMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_message = Some(Arc::new(move |message| handler(message).boxed()));
        self
    }

    pub fn handle_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |payload| handler(payload).boxed()));
        self
    }
}

async fn call(handler: &Option<Handler>) -> Result<()> {
    match handler {
        Some(handler) => handler().await,
        None => Ok(()),
    }
}

#[async_trait]
impl WidgetCallbacks for WidgetHandlers {
    async fn on_ready(&self) -> Result<()> {
        call(&self.on_ready).await
    }

    async fn on_open(&self) -> Result<()> {
        call(&self.on_open).await
    }

    async fn on_close(&self) -> Result<()> {
        call(&self.on_close).await
    }

    async fn on_message(&self, payload: Value) -> Result<()> {
        let Some(handler) = &self.on_message else {
            return Ok(());
        };
        let message =
            ChatwootMessage::from_value(payload).context("decode chatwoot message payload")?;
        handler(message).await
    }

    async fn on_error(&self, payload: Value) -> Result<()> {
        match &self.on_error {
            Some(handler) => handler(payload).await,
            None => Ok(()),
        }
    }
}

/// A widget bound to one host element.
///
/// `mount` initializes the instance and starts watching the element for
/// removal; `unmount` cancels anything still pending and shuts it down. A
/// widget can be mounted again after `unmount`; each mount gets a fresh
/// cancellation token.
pub struct ChatwootWidget {
    bridge: ChatwootBridge,
    element_id: String,
    configuration: WidgetConfiguration,
    handlers: Arc<WidgetHandlers>,
    cancel: Mutex<CancellationToken>,
}

impl ChatwootWidget {
    pub fn new(
        bridge: ChatwootBridge,
        element_id: impl Into<String>,
        configuration: WidgetConfiguration,
    ) -> Self {
        Self {
            bridge,
            element_id: element_id.into(),
            configuration,
            handlers: Arc::new(WidgetHandlers::default()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_handlers(mut self, handlers: WidgetHandlers) -> Self {
        self.handlers = Arc::new(handlers);
        self
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn configuration(&self) -> &WidgetConfiguration {
        &self.configuration
    }

    pub fn is_ready(&self) -> bool {
        self.bridge.is_ready(&self.element_id)
    }

    /// Token of the current mount, cancelled on unmount; pass it to work tied
    /// to this widget.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts the instance and its removal observer. Either both are in place
    /// afterwards or neither is.
    pub async fn mount(&self) -> BridgeResult<()> {
        let cancel = {
            let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_cancelled() {
                *slot = CancellationToken::new();
            }
            slot.clone()
        };
        self.bridge
            .init(
                &self.element_id,
                &self.configuration,
                self.handlers.clone(),
                &cancel,
            )
            .await?;
        if let Err(err) = self.bridge.create_observer(&self.element_id, &cancel).await {
            self.bridge
                .shutdown(&self.element_id, &CancellationToken::new())
                .await?;
            return Err(err);
        }
        Ok(())
    }

    pub async fn unmount(&self) -> BridgeResult<()> {
        self.cancellation_token().cancel();
        self.bridge
            .shutdown(&self.element_id, &CancellationToken::new())
            .await
    }

    pub async fn toggle(&self) -> BridgeResult<()> {
        self.bridge.toggle(&self.element_id, &self.cancellation_token()).await
    }

    pub async fn set_user(
        &self,
        identifier: impl Into<String>,
        attributes: &impl Serialize,
    ) -> BridgeResult<()> {
        let attributes = serde_json::to_value(attributes)?;
        self.bridge
            .set_user(&self.element_id, identifier, attributes, &self.cancellation_token())
            .await
    }

    pub async fn set_user_attributes(&self, attributes: &impl Serialize) -> BridgeResult<()> {
        let attributes = serde_json::to_value(attributes)?;
        self.bridge
            .set_user_attributes(&self.element_id, attributes, &self.cancellation_token())
            .await
    }

    pub async fn set_label(&self, label: impl Into<String>) -> BridgeResult<()> {
        self.bridge
            .set_label(&self.element_id, label, &self.cancellation_token())
            .await
    }

    pub async fn remove_label(&self, label: impl Into<String>) -> BridgeResult<()> {
        self.bridge
            .remove_label(&self.element_id, label, &self.cancellation_token())
            .await
    }

    pub async fn set_locale(&self, locale: impl Into<String>) -> BridgeResult<()> {
        self.bridge
            .set_locale(&self.element_id, locale, &self.cancellation_token())
            .await
    }

    pub async fn delete_custom_attribute(&self, key: impl Into<String>) -> BridgeResult<()> {
        self.bridge
            .delete_custom_attribute(&self.element_id, key, &self.cancellation_token())
            .await
    }

    pub async fn reset(&self) -> BridgeResult<()> {
        self.bridge.reset(&self.element_id, &self.cancellation_token()).await
    }

    pub async fn set_custom_attributes(&self, attributes: &impl Serialize) -> BridgeResult<()> {
        let attributes = serde_json::to_value(attributes)?;
        self.bridge
            .set_custom_attributes(&self.element_id, attributes, &self.cancellation_token())
            .await
    }

    pub async fn popout_chat_window(&self) -> BridgeResult<()> {
        self.bridge
            .popout_chat_window(&self.element_id, &self.cancellation_token())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn message_handler_receives_decoded_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handlers = WidgetHandlers::new().handle_message(move |message: ChatwootMessage| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(message.content);
                anyhow::Ok(())
            }
        });

        handlers
            .on_message(json!({"id": 1, "content": "hi"}))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn undecodable_message_is_a_callback_error() {
        let handlers = WidgetHandlers::new().handle_message(|_| async { anyhow::Ok(()) });
        let err = handlers
            .on_message(json!({"content": 5}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("decode chatwoot message payload"));
    }

    #[tokio::test]
    async fn unset_handlers_ignore_events() {
        let handlers = WidgetHandlers::new();
        handlers.on_ready().await.unwrap();
        handlers.on_message(json!("not a message")).await.unwrap();
        handlers.on_error(json!({"code": 500})).await.unwrap();
    }
}
