//! Drives the widget bridge against the in-memory page doubles and logs every
//! lifecycle step, command and callback.
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cwb_bridge::{BridgeDeps, ChatwootBridge, ChatwootWidget, WidgetHandlers};
use cwb_core::{BridgeSettings, NodeRef, WidgetConfiguration};
use cwb_testutil::TestDoubles;
use futures::future::try_join_all;
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a scripted Chatwoot widget session", long_about = None)]
struct Opts {
    /// Chatwoot installation the SDK is loaded from
    #[arg(long, default_value = cwb_core::DEFAULT_BASE_URL)]
    base_url: String,

    /// Website inbox token
    #[arg(long, default_value = "demo-website-token")]
    website_token: String,

    #[arg(long, default_value = "en")]
    locale: String,

    /// Number of widget instances mounted concurrently
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    instances: u16,

    /// Simulated SDK download time in milliseconds
    #[arg(long, default_value_t = 150)]
    load_delay_ms: u64,

    /// Remove the first host element instead of unmounting it
    #[arg(long)]
    remove_first: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    cwb_telemetry::install("bridge-demo", env!("CARGO_PKG_VERSION"))?;

    let doubles = TestDoubles::new();
    doubles
        .loader
        .set_delay(Duration::from_millis(opts.load_delay_ms));
    let bridge = ChatwootBridge::new(
        BridgeDeps {
            loader: doubles.loader.clone(),
            runtime: doubles.runtime.clone(),
            events: doubles.events.clone(),
            document: doubles.document.clone(),
        },
        BridgeSettings::from_env(),
    );
    let config = WidgetConfiguration::builder(&opts.website_token)
        .base_url(&opts.base_url)
        .locale(&opts.locale)
        .build();
    info!(sdk_url = %config.sdk_url(), instances = opts.instances, "starting session");

    let mut widgets = Vec::new();
    let mut hosts: Vec<NodeRef> = Vec::new();
    for index in 0..opts.instances {
        let element_id = format!("chatwoot-{index}");
        let (_, host) = doubles.document.mount_host(&element_id);
        hosts.push(host);
        widgets.push(
            ChatwootWidget::new(bridge.clone(), element_id.clone(), config.clone())
                .with_handlers(logging_handlers(&element_id)),
        );
    }

    try_join_all(widgets.iter().map(ChatwootWidget::mount)).await?;
    info!(
        script_loads = doubles.loader.script_loads(),
        module_imports = doubles.loader.module_imports(),
        ready = bridge.instance_count(),
        "widgets mounted"
    );

    let first = &widgets[0];
    first
        .set_user("demo-user", &json!({"email": "demo@example.com", "name": "Demo"}))
        .await?;
    first.set_label("demo").await?;
    first.toggle().await?;

    let events = &doubles.events;
    events.dispatch("chatwoot:ready", None).await;
    events.dispatch("chatwoot:open", None).await;
    events
        .dispatch(
            "chatwoot:on-message",
            Some(json!({
                "id": 1,
                "content": "Hi, how can we help?",
                "message_type": 1,
                "sender": {"id": 1, "name": "Support"}
            })),
        )
        .await;
    events
        .dispatch("chatwoot:on-message", Some(json!({"content": 42})))
        .await;
    events.dispatch("chatwoot:close", None).await;

    if opts.remove_first {
        doubles.document.remove(hosts[0]).await;
        info!(
            element_id = first.element_id(),
            ready = first.is_ready(),
            "host element removed"
        );
        first.toggle().await?;
    }

    for widget in &widgets {
        widget.unmount().await?;
    }
    bridge.dispose().await;

    info!(
        commands = ?doubles.runtime.invoked_methods(),
        listeners = doubles.events.total_listeners(),
        observers = doubles.document.active_observers(),
        "session finished"
    );
    Ok(())
}

fn logging_handlers(element_id: &str) -> WidgetHandlers {
    let ready = element_id.to_string();
    let open = element_id.to_string();
    let close = element_id.to_string();
    let message = element_id.to_string();
    let error = element_id.to_string();
    WidgetHandlers::new()
        .handle_ready(move || {
            info!(element_id = %ready, "widget ready");
            async { anyhow::Ok(()) }
        })
        .handle_open(move || {
            info!(element_id = %open, "widget opened");
            async { anyhow::Ok(()) }
        })
        .handle_close(move || {
            info!(element_id = %close, "widget closed");
            async { anyhow::Ok(()) }
        })
        .handle_message(move |msg| {
            info!(element_id = %message, id = msg.id, content = %msg.content, "message received");
            async { anyhow::Ok(()) }
        })
        .handle_error(move |payload| {
            warn!(element_id = %error, %payload, "widget reported an error");
            async { anyhow::Ok(()) }
        })
}
