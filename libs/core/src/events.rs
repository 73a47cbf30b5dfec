use std::fmt;

use serde_json::Value;

/// Payload carried by a widget event. Parameterless events deliver `None`.
pub type EventPayload = Option<Value>;

/// Global events raised by the widget runtime on `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetEvent {
    Ready,
    Open,
    Close,
    Message,
    Error,
}

impl WidgetEvent {
    pub const ALL: [WidgetEvent; 5] = [
        WidgetEvent::Ready,
        WidgetEvent::Open,
        WidgetEvent::Close,
        WidgetEvent::Message,
        WidgetEvent::Error,
    ];

    /// DOM event name dispatched by the widget runtime.
    pub fn event_name(&self) -> &'static str {
        match self {
            WidgetEvent::Ready => "chatwoot:ready",
            WidgetEvent::Open => "chatwoot:open",
            WidgetEvent::Close => "chatwoot:close",
            WidgetEvent::Message => "chatwoot:on-message",
            WidgetEvent::Error => "chatwoot:error",
        }
    }

    /// Host callback method the event is routed to.
    pub fn callback_name(&self) -> &'static str {
        match self {
            WidgetEvent::Ready => "OnReadyCallback",
            WidgetEvent::Open => "OnOpenCallback",
            WidgetEvent::Close => "OnCloseCallback",
            WidgetEvent::Message => "OnMessageCallback",
            WidgetEvent::Error => "OnErrorCallback",
        }
    }

    /// Whether the event carries a JSON detail document.
    pub fn carries_payload(&self) -> bool {
        matches!(self, WidgetEvent::Message | WidgetEvent::Error)
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.event_name() == name)
    }
}

impl fmt::Display for WidgetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn table_is_one_to_one() {
        let names: BTreeSet<_> = WidgetEvent::ALL.iter().map(|e| e.event_name()).collect();
        let callbacks: BTreeSet<_> = WidgetEvent::ALL.iter().map(|e| e.callback_name()).collect();
        assert_eq!(names.len(), 5);
        assert_eq!(callbacks.len(), 5);
        for event in WidgetEvent::ALL {
            assert_eq!(WidgetEvent::from_event_name(event.event_name()), Some(event));
        }
        assert_eq!(WidgetEvent::from_event_name("chatwoot:unknown"), None);
    }

    #[test]
    fn only_message_and_error_carry_payloads() {
        let with_payload: Vec<_> = WidgetEvent::ALL
            .into_iter()
            .filter(WidgetEvent::carries_payload)
            .collect();
        assert_eq!(with_payload, vec![WidgetEvent::Message, WidgetEvent::Error]);
    }
}
