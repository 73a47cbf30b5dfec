use serde_json::Value;

/// Imperative call forwarded to `window.$chatwoot`.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    Toggle,
    SetUser { identifier: String, attributes: Value },
    SetUserAttributes(Value),
    SetLabel(String),
    RemoveLabel(String),
    SetLocale(String),
    DeleteCustomAttribute(String),
    Reset,
    SetCustomAttributes(Value),
    PopoutChatWindow,
}

impl WidgetCommand {
    /// Method name on the widget's global API.
    pub fn method_name(&self) -> &'static str {
        match self {
            WidgetCommand::Toggle => "toggle",
            WidgetCommand::SetUser { .. } => "setUser",
            WidgetCommand::SetUserAttributes(_) => "setUserAttributes",
            WidgetCommand::SetLabel(_) => "setLabel",
            WidgetCommand::RemoveLabel(_) => "removeLabel",
            WidgetCommand::SetLocale(_) => "setLocale",
            WidgetCommand::DeleteCustomAttribute(_) => "deleteCustomAttribute",
            WidgetCommand::Reset => "reset",
            WidgetCommand::SetCustomAttributes(_) => "setCustomAttributes",
            WidgetCommand::PopoutChatWindow => "popoutChatWindow",
        }
    }

    /// Positional arguments in the order the global API expects them.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            WidgetCommand::Toggle | WidgetCommand::Reset | WidgetCommand::PopoutChatWindow => {
                Vec::new()
            }
            WidgetCommand::SetUser {
                identifier,
                attributes,
            } => vec![Value::String(identifier.clone()), attributes.clone()],
            WidgetCommand::SetUserAttributes(attributes)
            | WidgetCommand::SetCustomAttributes(attributes) => vec![attributes.clone()],
            WidgetCommand::SetLabel(value)
            | WidgetCommand::RemoveLabel(value)
            | WidgetCommand::SetLocale(value)
            | WidgetCommand::DeleteCustomAttribute(value) => vec![Value::String(value.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_user_passes_identifier_then_attributes() {
        let command = WidgetCommand::SetUser {
            identifier: "u-1".into(),
            attributes: json!({"email": "a@b.c"}),
        };
        assert_eq!(command.method_name(), "setUser");
        assert_eq!(command.arguments(), vec![json!("u-1"), json!({"email": "a@b.c"})]);
    }

    #[test]
    fn parameterless_commands_have_no_arguments() {
        for command in [
            WidgetCommand::Toggle,
            WidgetCommand::Reset,
            WidgetCommand::PopoutChatWindow,
        ] {
            assert!(command.arguments().is_empty(), "{}", command.method_name());
        }
    }
}
