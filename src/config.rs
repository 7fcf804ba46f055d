//! Client configuration, fixed once a [crate::Client] is built.

use crate::error::ConfigError;
use dotenvy::dotenv;
use std::env;
use tracing::warn;
use url::Url;

/// Fields whose title and value are both at most this many bytes are marked
/// short unless configured otherwise.
pub const DEFAULT_MAX_LENGTH_FOR_SHORT_FIELD: usize = 40;

/// Where and as whom to post.
///
/// ```
/// use slack_hook::ClientConfig;
///
/// let config = ClientConfig::parse("https://hooks.slack.com/services/T0/B0/x")?
///     .with_channel("#puppies")
///     .with_icon_emoji("thumbsup");
/// assert_eq!(config.icon_emoji(), Some(":thumbsup:"));
/// # Ok::<(), slack_hook::ConfigError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    webhook_url: Url,
    // Passed through as is. This may be an opaque channel ID, so no leading
    // hash is added.
    channel: Option<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
    icon_url: Option<Url>,
    // Only read when a client is built.
    max_length_for_short_field: usize,
}

impl ClientConfig {
    pub fn new(webhook_url: Url) -> Self {
        ClientConfig {
            webhook_url,
            channel: None,
            username: None,
            icon_emoji: None,
            icon_url: None,
            max_length_for_short_field: DEFAULT_MAX_LENGTH_FOR_SHORT_FIELD,
        }
    }

    /// Parse and validate a webhook URL, which must be an absolute http(s)
    /// URL.
    pub fn parse(webhook_url: &str) -> Result<Self, ConfigError> {
        let raw = webhook_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingWebhookUrl);
        }

        let url = parse_url("webhook URL", raw)?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
        }

        Ok(ClientConfig::new(url))
    }

    /// Load configuration from the environment, reading a `.env` file first
    /// if one exists.
    ///
    /// - `SLACK_WEBHOOK_URL` (required)
    /// - `SLACK_CHANNEL`
    /// - `SLACK_USERNAME`
    /// - `SLACK_ICON_EMOJI`
    /// - `SLACK_ICON_URL`
    /// - `SLACK_MAX_SHORT_FIELD_LENGTH`
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv().is_err() {
            warn!("No .env found");
        }

        ClientConfig::from_lookup(|k| env::var(k).ok())
    }

    /// As [ClientConfig::from_env], but reading variables via `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_url = lookup("SLACK_WEBHOOK_URL").ok_or(ConfigError::MissingWebhookUrl)?;
        let mut config = ClientConfig::parse(&webhook_url)?;

        if let Some(x) = lookup("SLACK_CHANNEL") {
            config = config.with_channel(x);
        }
        if let Some(x) = lookup("SLACK_USERNAME") {
            config = config.with_username(x);
        }
        if let Some(x) = lookup("SLACK_ICON_EMOJI") {
            config = config.with_icon_emoji(x);
        }
        if let Some(x) = lookup("SLACK_ICON_URL") {
            config = config.with_icon_url(parse_url("icon URL", x.trim())?);
        }
        if let Some(x) = lookup("SLACK_MAX_SHORT_FIELD_LENGTH") {
            let n = x
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold(x.clone()))?;
            config = config.with_max_length_for_short_field(n);
        }

        Ok(config)
    }

    pub fn with_channel<T: Into<String>>(mut self, channel: T) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_username<T: Into<String>>(mut self, username: T) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the icon emoji, wrapping it in colons where they're missing. An
    /// empty string clears it.
    pub fn with_icon_emoji<T: Into<String>>(mut self, icon_emoji: T) -> Self {
        let x = icon_emoji.into();
        self.icon_emoji = if x.is_empty() {
            None
        } else {
            Some(normalize_icon_emoji(x))
        };
        self
    }

    pub fn with_icon_url(mut self, icon_url: Url) -> Self {
        self.icon_url = Some(icon_url);
        self
    }

    /// The short field threshold a [crate::Client] starts with. The client
    /// owns it from then on; see [crate::Client::set_max_length_for_short_field].
    pub fn with_max_length_for_short_field(mut self, n: usize) -> Self {
        self.max_length_for_short_field = n;
        self
    }

    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn icon_emoji(&self) -> Option<&str> {
        self.icon_emoji.as_deref()
    }

    pub fn icon_url(&self) -> Option<&Url> {
        self.icon_url.as_ref()
    }

    pub(crate) fn initial_max_length_for_short_field(&self) -> usize {
        self.max_length_for_short_field
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })
}

/// Prepend a colon unless the first character is one, then append a colon
/// unless the last character is one.
///
/// The two checks are independent, so a lone `":"` is left untouched.
///
/// ```
/// use slack_hook::config::normalize_icon_emoji;
///
/// assert_eq!(normalize_icon_emoji("thumbsup".into()), ":thumbsup:");
/// assert_eq!(normalize_icon_emoji("thumbsup:".into()), ":thumbsup:");
/// ```
pub fn normalize_icon_emoji(mut emoji: String) -> String {
    if !emoji.starts_with(':') {
        emoji.insert(0, ':');
    }

    if !emoji.ends_with(':') {
        emoji.push(':');
    }

    emoji
}
