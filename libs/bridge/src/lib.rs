//! Lifecycle bridge between host components and the embeddable Chatwoot
//! widget.
//!
//! The bridge loads the widget SDK once per process, keeps one registry entry
//! per host element, fans the widget's global events out to the matching
//! host callbacks, forwards commands to ready instances, and tears an
//! instance down when its host element leaves the document.
//!
//! ```no_run
//! # async fn demo(deps: cwb_bridge::BridgeDeps) -> Result<(), cwb_core::BridgeError> {
//! use cwb_bridge::{ChatwootBridge, ChatwootWidget, WidgetHandlers};
//! use cwb_core::{BridgeSettings, WidgetConfiguration};
//!
//! let bridge = ChatwootBridge::new(deps, BridgeSettings::from_env());
//! let widget = ChatwootWidget::new(bridge.clone(), "support-chat", WidgetConfiguration::new("token"))
//!     .with_handlers(WidgetHandlers::new().handle_open(|| async { anyhow::Ok(()) }));
//! widget.mount().await?;
//! widget.toggle().await?;
//! widget.unmount().await?;
//! bridge.dispose().await;
//! # Ok(())
//! # }
//! ```
pub mod bridge;
pub mod component;
pub mod fanout;
pub mod initializer;
pub mod observer;
pub mod registry;

pub use bridge::{BridgeDeps, ChatwootBridge};
pub use component::{ChatwootWidget, WidgetHandlers};
pub use fanout::EventFanout;
pub use initializer::SharedInitializer;
pub use observer::TeardownObserver;
pub use registry::{InstancePhase, InstanceRegistry, InstanceState};
