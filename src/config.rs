use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADMIN_HANDLE: &str = "@AAU_STUDENTSBOT";
pub const DEFAULT_MODULES_HANDLE: &str = "@Savvysocietybot";
pub const DEFAULT_CHANNEL_HANDLE: &str = "@Savvy_Society";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_MODEL: &str = "llama-3.1-8b-instant";

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A numeric variable failed to parse.
    InvalidNumber {
        key: &'static str,
        value: String,
        source: ParseIntError,
    },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{} not set in environment variables", key),
            Self::InvalidNumber { key, value, source } => {
                write!(f, "invalid value '{}' for {}: {}", value, key, source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidNumber { source, .. } => Some(source),
            Self::Missing(_) | Self::Validation(_) => None,
        }
    }
}

/// Contact handles the assistant points users to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contacts {
    /// General admin bot, also the escalation target.
    pub admin: String,
    /// Course modules and study materials.
    pub modules: String,
    /// Promotion channel appended to every answered reply.
    pub channel: String,
}

impl Default for Contacts {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN_HANDLE.to_string(),
            modules: DEFAULT_MODULES_HANDLE.to_string(),
            channel: DEFAULT_CHANNEL_HANDLE.to_string(),
        }
    }
}

/// Credentials and endpoint for one OpenAI-compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Name used in logs and diagnostic notes ("OpenAI", "Groq").
    pub label: &'static str,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Upper bound for one completion request.
    pub timeout: Duration,
}

pub struct Config {
    /// Telegram bot token. Only the bot binary requires it.
    pub telegram_bot_token: Option<String>,
    /// Primary provider, tried first. `None` disables the stage.
    pub primary: Option<ProviderConfig>,
    /// Secondary provider, tried after the primary.
    pub secondary: Option<ProviderConfig>,
    pub contacts: Contacts,
    /// Directory holding knowledge documents and the journal files.
    pub data_dir: PathBuf,
    /// Port for the health endpoint.
    pub port: u16,
}

impl Config {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN");
        if let Some(ref token) = telegram_bot_token {
            validate_token(token)?;
        }

        let timeout_secs = match get("PROVIDER_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|source| ConfigError::InvalidNumber {
                key: "PROVIDER_TIMEOUT_SECS",
                value,
                source,
            })?,
            None => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "PROVIDER_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        let timeout = Duration::from_secs(timeout_secs);

        let primary = get("OPENAI_API_KEY").map(|api_key| ProviderConfig {
            label: "OpenAI",
            api_key,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| OPENAI_MODEL.to_string()),
            timeout,
        });

        let secondary = get("GROQ_API_KEY").map(|api_key| ProviderConfig {
            label: "Groq",
            api_key,
            base_url: get("GROQ_BASE_URL").unwrap_or_else(|| GROQ_BASE_URL.to_string()),
            model: get("GROQ_MODEL").unwrap_or_else(|| GROQ_MODEL.to_string()),
            timeout,
        });

        let contacts = Contacts {
            admin: get("ADMIN_HANDLE").unwrap_or_else(|| DEFAULT_ADMIN_HANDLE.to_string()),
            modules: get("MODULES_HANDLE").unwrap_or_else(|| DEFAULT_MODULES_HANDLE.to_string()),
            channel: get("CHANNEL_HANDLE").unwrap_or_else(|| DEFAULT_CHANNEL_HANDLE.to_string()),
        };

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let port = match get("PORT") {
            Some(value) => value.parse::<u16>().map_err(|source| ConfigError::InvalidNumber {
                key: "PORT",
                value,
                source,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            telegram_bot_token,
            primary,
            secondary,
            contacts,
            data_dir,
            port,
        })
    }

    /// The bot token, or an error naming the missing variable.
    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        self.telegram_bot_token
            .as_deref()
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
    }
}

// Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
fn validate_token(token: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 2 || parts[0].parse::<u64>().is_err() || parts[1].is_empty() {
        return Err(ConfigError::Validation(
            "TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).expect("empty environment is valid");
        assert!(config.telegram_bot_token.is_none());
        assert!(config.primary.is_none());
        assert!(config.secondary.is_none());
        assert_eq!(config.contacts, Contacts::default());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.port, 10000);
    }

    #[test]
    fn test_providers_from_keys() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-one"),
            ("GROQ_API_KEY", "gsk-two"),
            ("GROQ_MODEL", "llama-3.3-70b"),
        ])
        .unwrap();

        let primary = config.primary.unwrap();
        assert_eq!(primary.label, "OpenAI");
        assert_eq!(primary.api_key, "sk-one");
        assert_eq!(primary.base_url, "https://api.openai.com/v1");
        assert_eq!(primary.model, "gpt-4o-mini");

        let secondary = config.secondary.unwrap();
        assert_eq!(secondary.label, "Groq");
        assert_eq!(secondary.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(secondary.model, "llama-3.3-70b");
        assert_eq!(secondary.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_provider_timeout_override() {
        let config = load(&[("OPENAI_API_KEY", "sk"), ("PROVIDER_TIMEOUT_SECS", "15")]).unwrap();
        assert_eq!(config.primary.unwrap().timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_provider_timeout() {
        let err = assert_err(load(&[("PROVIDER_TIMEOUT_SECS", "soon")]));
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PROVIDER_TIMEOUT_SECS", .. }));

        let err = assert_err(load(&[("PROVIDER_TIMEOUT_SECS", "0")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_key_disables_provider() {
        let config = load(&[("OPENAI_API_KEY", "   "), ("GROQ_API_KEY", "")]).unwrap();
        assert!(config.primary.is_none());
        assert!(config.secondary.is_none());
    }

    #[test]
    fn test_handle_overrides() {
        let config = load(&[("ADMIN_HANDLE", "@help_desk"), ("CHANNEL_HANDLE", "@news")]).unwrap();
        assert_eq!(config.contacts.admin, "@help_desk");
        assert_eq!(config.contacts.modules, DEFAULT_MODULES_HANDLE);
        assert_eq!(config.contacts.channel, "@news");
    }

    #[test]
    fn test_valid_token() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123456789:ABCdefGHIjklMNOpqrsTUVwxyz")]).unwrap();
        assert_eq!(config.require_bot_token().unwrap(), "123456789:ABCdefGHIjklMNOpqrsTUVwxyz");
    }

    #[test]
    fn test_missing_token() {
        let config = load(&[]).unwrap();
        let err = assert_err(config.require_bot_token());
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let err = assert_err(load(&[("TELEGRAM_BOT_TOKEN", "invalid_token_no_colon")]));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let err = assert_err(load(&[("TELEGRAM_BOT_TOKEN", "notanumber:ABCdef")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let err = assert_err(load(&[("TELEGRAM_BOT_TOKEN", "123456789:")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_port() {
        let err = assert_err(load(&[("PORT", "eighty")]));
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PORT", .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
