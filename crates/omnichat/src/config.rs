use std::env;
use std::fmt::{self, Debug};

use omnichat_core::{ChatBuilder, ChatError, ChatSession, SessionConfig};
use omnichat_gemini_model::{GeminiConfig, GeminiConfigBuilder, GeminiProvider};

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Checked when [`API_KEY_VAR`] is not set.
pub const FALLBACK_API_KEY_VAR: &str = "API_KEY";
/// Environment variable overriding the model.
pub const MODEL_VAR: &str = "GEMINI_MODEL";
/// Environment variable overriding the API endpoint.
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Settings of the Gemini connection.
///
/// Nothing is validated until a session is created, so a missing key shows
/// up as an initialization error in the chat rather than at startup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// API key, required.
    pub api_key: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Endpoint override.
    pub base_url: Option<String>,
}

impl Settings {
    /// Reads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_key: var(API_KEY_VAR).or_else(|| var(FALLBACK_API_KEY_VAR)),
            model: var(MODEL_VAR),
            base_url: var(BASE_URL_VAR),
        }
    }

    /// Builds the provider configuration.
    pub fn gemini_config(&self) -> Result<GeminiConfig, ChatError> {
        let api_key = self.api_key.clone().unwrap_or_default();
        let mut builder = GeminiConfigBuilder::with_api_key(api_key);
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        builder
            .build()
            .map_err(|err| ChatError::Initialization(err.to_string()))
    }

    /// Creates a chat builder whose sessions talk to Gemini.
    pub fn into_chat_builder(
        self,
        session_config: SessionConfig,
    ) -> ChatBuilder {
        ChatBuilder::with_connector(move || {
            let config = self.gemini_config()?;
            debug!("connecting to {}", config.model());
            let provider = GeminiProvider::new(config);
            Ok(ChatSession::create(provider, session_config.clone()))
        })
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_from_lookup() {
        let s = settings(&[
            (API_KEY_VAR, " key-1 "),
            (FALLBACK_API_KEY_VAR, "key-2"),
            (MODEL_VAR, "gemini-2.5-flash"),
            (BASE_URL_VAR, ""),
        ]);
        assert_eq!(s.api_key.as_deref(), Some("key-1"));
        assert_eq!(s.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(s.base_url, None);
        assert_eq!(s.gemini_config().unwrap().model(), "gemini-2.5-flash");

        let s =
            settings(&[(API_KEY_VAR, "  "), (FALLBACK_API_KEY_VAR, "key-2")]);
        assert_eq!(s.api_key.as_deref(), Some("key-2"));
    }

    #[test]
    fn test_missing_key() {
        let s = settings(&[(MODEL_VAR, "gemini-2.5-flash")]);
        assert!(matches!(
            s.gemini_config(),
            Err(ChatError::Initialization(_))
        ));

        let chat = s.into_chat_builder(SessionConfig::default()).build();
        assert!(matches!(chat.error(), Some(ChatError::Initialization(_))));
        assert!(!chat.is_connected());
    }

    #[test]
    fn test_debug_hides_key() {
        let s = settings(&[(API_KEY_VAR, "secret")]);
        assert!(!format!("{s:?}").contains("secret"));
    }
}
