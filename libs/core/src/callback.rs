use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::{EventPayload, WidgetEvent};

/// Host-side receiver for widget events.
///
/// Every method defaults to a no-op so hosts only implement what they use.
#[async_trait]
pub trait WidgetCallbacks: Send + Sync {
    async fn on_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn on_open(&self) -> Result<()> {
        Ok(())
    }

    async fn on_close(&self) -> Result<()> {
        Ok(())
    }

    async fn on_message(&self, _payload: Value) -> Result<()> {
        Ok(())
    }

    async fn on_error(&self, _payload: Value) -> Result<()> {
        Ok(())
    }
}

pub type SharedCallbacks = Arc<dyn WidgetCallbacks>;

/// Routes one event occurrence to the matching callback method.
///
/// A missing detail on `message`/`error` is delivered as `Value::Null`.
pub async fn deliver(
    callbacks: &dyn WidgetCallbacks,
    event: WidgetEvent,
    payload: EventPayload,
) -> Result<()> {
    match event {
        WidgetEvent::Ready => callbacks.on_ready().await,
        WidgetEvent::Open => callbacks.on_open().await,
        WidgetEvent::Close => callbacks.on_close().await,
        WidgetEvent::Message => callbacks.on_message(payload.unwrap_or(Value::Null)).await,
        WidgetEvent::Error => callbacks.on_error(payload.unwrap_or(Value::Null)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(&'static str, Value)>>,
    }

    #[async_trait]
    impl WidgetCallbacks for Recorder {
        async fn on_open(&self) -> Result<()> {
            self.seen.lock().unwrap().push(("open", Value::Null));
            Ok(())
        }

        async fn on_error(&self, payload: Value) -> Result<()> {
            self.seen.lock().unwrap().push(("error", payload));
            Ok(())
        }
    }

    #[tokio::test]
    async fn routes_by_event_and_defaults_missing_detail() {
        let recorder = Recorder::default();
        deliver(&recorder, WidgetEvent::Open, None).await.unwrap();
        deliver(&recorder, WidgetEvent::Error, Some(json!({"code": 1})))
            .await
            .unwrap();
        deliver(&recorder, WidgetEvent::Error, None).await.unwrap();
        deliver(&recorder, WidgetEvent::Ready, None).await.unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("open", Value::Null),
                ("error", json!({"code": 1})),
                ("error", Value::Null),
            ]
        );
    }
}
