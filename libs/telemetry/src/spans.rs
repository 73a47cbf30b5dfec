use tracing::info_span;

/// Span covering one lifecycle step of a widget instance.
pub fn span_for_instance(action: &'static str, element_id: &str) -> tracing::Span {
    info_span!("chatwoot.instance", action, element_id = element_or_dash(element_id))
}

/// Span covering one forwarded widget command.
pub fn span_for_command(method: &'static str, element_id: &str) -> tracing::Span {
    info_span!("chatwoot.command", method, element_id = element_or_dash(element_id))
}

/// Span covering delivery of one widget event to a host callback.
pub fn span_for_event(event: &'static str, element_id: &str) -> tracing::Span {
    info_span!("chatwoot.event", event, element_id = element_or_dash(element_id))
}

fn element_or_dash(element_id: &str) -> &str {
    if element_id.trim().is_empty() {
        "-"
    } else {
        element_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_element_ids_render_as_dash() {
        assert_eq!(element_or_dash("chat"), "chat");
        assert_eq!(element_or_dash("  "), "-");
    }
}
