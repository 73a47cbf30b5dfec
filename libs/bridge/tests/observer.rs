mod support;

use cwb_core::{Document, WidgetCommand};
use support::{Harness, token};

#[tokio::test]
async fn removing_the_host_element_equals_shutdown() {
    let removed = Harness::new();
    let (_, element) = removed.ready("chat").await;
    assert!(removed.bridge.create_observer("chat", &token()).await.unwrap());
    assert!(removed.bridge.has_observer("chat"));
    assert_eq!(removed.doubles.document.active_observers(), 1);

    assert!(removed.doubles.document.remove(element).await);

    let explicit = Harness::new();
    explicit.ready("chat").await;
    explicit.bridge.create_observer("chat", &token()).await.unwrap();
    explicit.bridge.shutdown("chat", &token()).await.unwrap();

    for harness in [&removed, &explicit] {
        assert_eq!(harness.bridge.instance_phase("chat"), None);
        assert!(!harness.bridge.has_observer("chat"));
        assert_eq!(harness.doubles.events.total_listeners(), 0);
        assert_eq!(harness.doubles.document.active_observers(), 0);
        assert_eq!(
            harness.doubles.runtime.commands(),
            vec![WidgetCommand::Reset]
        );
    }
}

#[tokio::test]
async fn sibling_changes_leave_the_instance_alone() {
    let harness = Harness::new();
    let (_, element) = harness.ready("chat").await;
    harness.bridge.create_observer("chat", &token()).await.unwrap();

    let document = &harness.doubles.document;
    let body = document.parent_of(element).unwrap();
    let sibling = document.insert_element(body, "banner").await;
    assert!(document.remove(sibling).await);

    assert!(harness.bridge.is_ready("chat"));
    assert!(harness.bridge.has_observer("chat"));
    assert_eq!(harness.doubles.events.total_listeners(), 5);
}

#[tokio::test]
async fn no_observer_without_element_or_instance() {
    let harness = Harness::new();
    let callbacks = std::sync::Arc::new(cwb_testutil::RecordingCallbacks::new());
    harness.init("detached", &callbacks).await.unwrap();
    assert!(!harness.bridge.create_observer("detached", &token()).await.unwrap());

    let orphan = harness.doubles.document.create_detached("orphan");
    assert_eq!(harness.doubles.document.parent_of(orphan), None);
    harness.init("orphan", &callbacks).await.unwrap();
    assert!(!harness.bridge.create_observer("orphan", &token()).await.unwrap());

    harness.doubles.document.mount_host("unregistered");
    assert!(!harness.bridge.create_observer("unregistered", &token()).await.unwrap());

    assert_eq!(harness.doubles.document.active_observers(), 0);
    assert!(harness.bridge.is_ready("detached"));
}

#[tokio::test]
async fn recreating_an_observer_replaces_the_previous_one() {
    let harness = Harness::new();
    harness.ready("chat").await;
    harness.bridge.create_observer("chat", &token()).await.unwrap();
    harness.bridge.create_observer("chat", &token()).await.unwrap();
    assert_eq!(harness.doubles.document.active_observers(), 1);
}

#[tokio::test]
async fn cancelled_token_creates_no_observer() {
    let harness = Harness::new();
    harness.ready("chat").await;
    let cancel = token();
    cancel.cancel();

    let err = harness
        .bridge
        .create_observer("chat", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, cwb_core::BridgeError::Cancelled));
    assert_eq!(harness.doubles.document.active_observers(), 0);
}
