mod support;

use std::sync::{Arc, Mutex};

use cwb_bridge::{ChatwootWidget, WidgetHandlers};
use cwb_core::{ChatwootMessage, WidgetCommand};
use serde::Serialize;
use serde_json::json;
use support::{Harness, config};

#[derive(Serialize)]
struct Profile {
    email: String,
    name: String,
}

fn message_sink() -> (WidgetHandlers, Arc<Mutex<Vec<ChatwootMessage>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handlers = WidgetHandlers::new().handle_message(move |message| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(message);
            anyhow::Ok(())
        }
    });
    (handlers, seen)
}

#[tokio::test]
async fn mounted_widget_receives_typed_messages() {
    let harness = Harness::new();
    harness.doubles.document.mount_host("support");
    let (handlers, seen) = message_sink();
    let widget =
        ChatwootWidget::new(harness.bridge.clone(), "support", config()).with_handlers(handlers);

    widget.mount().await.unwrap();
    assert!(widget.is_ready());
    assert!(harness.bridge.has_observer("support"));

    harness
        .doubles
        .events
        .dispatch(
            "chatwoot:on-message",
            Some(json!({
                "id": 7,
                "content": "hello from support",
                "message_type": 1,
                "created_at": 1_700_000_000,
                "sender": {"id": 3, "name": "Agent"}
            })),
        )
        .await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, 7);
    assert_eq!(seen[0].content, "hello from support");
    assert!(!seen[0].is_incoming());
}

#[tokio::test]
async fn widget_commands_need_no_element_id() {
    let harness = Harness::new();
    harness.doubles.document.mount_host("support");
    let widget = ChatwootWidget::new(harness.bridge.clone(), "support", config());
    widget.mount().await.unwrap();

    let profile = Profile {
        email: "a@example.com".into(),
        name: "Ada".into(),
    };
    widget.set_user("u-1", &profile).await.unwrap();
    widget.set_locale("fr").await.unwrap();
    widget.toggle().await.unwrap();

    assert_eq!(
        harness.doubles.runtime.commands(),
        vec![
            WidgetCommand::SetUser {
                identifier: "u-1".into(),
                attributes: json!({"email": "a@example.com", "name": "Ada"}),
            },
            WidgetCommand::SetLocale("fr".into()),
            WidgetCommand::Toggle,
        ]
    );
}

#[tokio::test]
async fn unmount_cancels_and_tears_down() {
    let harness = Harness::new();
    harness.doubles.document.mount_host("support");
    let widget = ChatwootWidget::new(harness.bridge.clone(), "support", config());
    widget.mount().await.unwrap();

    widget.unmount().await.unwrap();
    widget.unmount().await.unwrap();

    assert!(widget.cancellation_token().is_cancelled());
    assert!(!widget.is_ready());
    assert_eq!(harness.doubles.events.total_listeners(), 0);
    assert_eq!(harness.doubles.document.active_observers(), 0);
}

#[tokio::test]
async fn removed_host_element_silences_the_widget() {
    let harness = Harness::new();
    let (_, element) = harness.doubles.document.mount_host("support");
    let widget = ChatwootWidget::new(harness.bridge.clone(), "support", config());
    widget.mount().await.unwrap();

    harness.doubles.document.remove(element).await;
    harness.doubles.runtime.clear();
    widget.toggle().await.unwrap();

    assert!(!widget.is_ready());
    assert!(harness.doubles.runtime.calls().is_empty());
}

#[tokio::test]
async fn widget_can_be_mounted_again_after_unmount() {
    let harness = Harness::new();
    harness.doubles.document.mount_host("support");
    let widget = ChatwootWidget::new(harness.bridge.clone(), "support", config());

    widget.mount().await.unwrap();
    let first_token = widget.cancellation_token();
    widget.unmount().await.unwrap();
    assert!(first_token.is_cancelled());

    widget.mount().await.unwrap();
    assert!(widget.is_ready());
    assert!(!widget.cancellation_token().is_cancelled());
    assert!(harness.bridge.has_observer("support"));
    assert_eq!(harness.doubles.events.total_listeners(), 5);
    assert_eq!(harness.doubles.document.active_observers(), 1);

    widget.toggle().await.unwrap();
    assert_eq!(
        harness.doubles.runtime.commands(),
        vec![WidgetCommand::Reset, WidgetCommand::Toggle]
    );
}
