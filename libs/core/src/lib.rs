//! Chatwoot widget bridge core contracts and value types.
//!
//! This crate holds the configuration contract shared with the host, the event
//! and command vocabularies of the widget runtime, the chat payload types, and
//! the collaborator traits the bridge is written against.
pub mod callback;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod types;

pub use callback::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use interfaces::*;
pub use types::*;
