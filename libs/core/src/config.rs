use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Path appended to the trimmed base URL to locate the widget SDK script.
pub const SDK_SCRIPT_PATH: &str = "/packs/js/sdk.js";
/// Chatwoot cloud endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://app.chatwoot.com";

const POLL_INTERVAL_ENV: &str = "CHATWOOT_MODULE_POLL_MS";
const LOAD_TIMEOUT_ENV: &str = "CHATWOOT_LOAD_TIMEOUT_SECS";
const WARN_DROPPED_ENV: &str = "CHATWOOT_WARN_DROPPED_COMMANDS";

/// Side of the screen the launcher bubble is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetPosition {
    Left,
    #[default]
    Right,
}

/// Launcher display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    #[default]
    Standard,
    ExpandedBubble,
}

/// Colour scheme handling inside the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DarkMode {
    Light,
    #[default]
    Auto,
}

/// Deployment settings handed to `window.chatwootSettings` and the SDK loader.
///
/// The wire names are part of the host integration contract. `sdkUrl` is
/// emitted on serialization but always derived from `baseUrl`; it is ignored
/// when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfiguration {
    pub website_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub hide_message_bubble: bool,
    #[serde(default)]
    pub show_unread_messages_dialog: bool,
    #[serde(default)]
    pub position: WidgetPosition,
    #[serde(default)]
    pub use_browser_language: bool,
    #[serde(default, rename = "type")]
    pub widget_type: WidgetType,
    #[serde(default)]
    pub dark_mode: DarkMode,
    #[serde(default)]
    pub base_domain: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

impl WidgetConfiguration {
    pub fn new(website_token: impl Into<String>) -> Self {
        Self {
            website_token: website_token.into(),
            base_url: default_base_url(),
            locale: default_locale(),
            hide_message_bubble: false,
            show_unread_messages_dialog: false,
            position: WidgetPosition::default(),
            use_browser_language: false,
            widget_type: WidgetType::default(),
            dark_mode: DarkMode::default(),
            base_domain: None,
        }
    }

    pub fn builder(website_token: impl Into<String>) -> WidgetConfigurationBuilder {
        WidgetConfigurationBuilder {
            inner: Self::new(website_token),
        }
    }

    /// SDK script location derived from [`Self::base_url`].
    ///
    /// ```
    /// use cwb_core::WidgetConfiguration;
    ///
    /// let mut config = WidgetConfiguration::new("token");
    /// config.base_url = "https://x.example.com/".into();
    /// assert_eq!(config.sdk_url(), "https://x.example.com/packs/js/sdk.js");
    /// ```
    pub fn sdk_url(&self) -> String {
        let base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        format!("{base}{SDK_SCRIPT_PATH}")
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfiguration<'a> {
    website_token: &'a str,
    base_url: &'a str,
    locale: &'a str,
    sdk_url: String,
    hide_message_bubble: bool,
    show_unread_messages_dialog: bool,
    position: WidgetPosition,
    use_browser_language: bool,
    #[serde(rename = "type")]
    widget_type: WidgetType,
    dark_mode: DarkMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_domain: Option<&'a str>,
}

impl Serialize for WidgetConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireConfiguration {
            website_token: &self.website_token,
            base_url: &self.base_url,
            locale: &self.locale,
            sdk_url: self.sdk_url(),
            hide_message_bubble: self.hide_message_bubble,
            show_unread_messages_dialog: self.show_unread_messages_dialog,
            position: self.position,
            use_browser_language: self.use_browser_language,
            widget_type: self.widget_type,
            dark_mode: self.dark_mode,
            base_domain: self.base_domain.as_deref(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub struct WidgetConfigurationBuilder {
    inner: WidgetConfiguration,
}

impl WidgetConfigurationBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into();
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.inner.locale = locale.into();
        self
    }

    pub fn hide_message_bubble(mut self, hide: bool) -> Self {
        self.inner.hide_message_bubble = hide;
        self
    }

    pub fn show_unread_messages_dialog(mut self, show: bool) -> Self {
        self.inner.show_unread_messages_dialog = show;
        self
    }

    pub fn position(mut self, position: WidgetPosition) -> Self {
        self.inner.position = position;
        self
    }

    pub fn use_browser_language(mut self, enabled: bool) -> Self {
        self.inner.use_browser_language = enabled;
        self
    }

    pub fn widget_type(mut self, widget_type: WidgetType) -> Self {
        self.inner.widget_type = widget_type;
        self
    }

    pub fn dark_mode(mut self, dark_mode: DarkMode) -> Self {
        self.inner.dark_mode = dark_mode;
        self
    }

    pub fn base_domain(mut self, domain: impl Into<String>) -> Self {
        self.inner.base_domain = Some(domain.into());
        self
    }

    pub fn build(self) -> WidgetConfiguration {
        self.inner
    }
}

/// Bridge tuning knobs that are not part of the widget contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Interval between availability checks while the bridge module loads.
    pub module_poll_interval: Duration,
    /// Upper bound for the shared SDK load. `None` waits until cancelled.
    pub load_timeout: Option<Duration>,
    /// Emit a warning when a command targets an instance that is not ready.
    pub warn_on_dropped_commands: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            module_poll_interval: Duration::from_millis(100),
            load_timeout: Some(Duration::from_secs(30)),
            warn_on_dropped_commands: false,
        }
    }
}

impl BridgeSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(ms) = env_parse::<u64>(POLL_INTERVAL_ENV) {
            settings.module_poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = env_parse::<u64>(LOAD_TIMEOUT_ENV) {
            settings.load_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Ok(raw) = std::env::var(WARN_DROPPED_ENV) {
            settings.warn_on_dropped_commands =
                matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        settings
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
}
