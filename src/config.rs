use std::env;
use thiserror::Error;
use tracing::info;

pub const DATABASE_PATH_VAR: &str = "VOICE_DATABASE_PATH";
pub const ALLOW_BOTS_VAR: &str = "VOICE_ALLOW_BOTS";
pub const DEBUG_VAR: &str = "VOICE_DEBUG";
pub const TOKEN_VAR: &str = "DISCORD_TOKEN";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("VOICE_DATABASE_PATH is not set; a voice database location is required")]
    MissingDatabasePath,
    #[error("DISCORD_TOKEN is not set; the bot cannot log in without it")]
    MissingToken,
    #[error("Invalid value for {key}: {value:?}")]
    InvalidFlag { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Where the voice store keeps its snapshot.
    pub database_path: String,
    /// Track users flagged as bots.
    pub allow_bots: bool,
    /// Log every join, leave and credited session.
    pub debug: bool,
}

impl TrackerConfig {
    pub fn new(database_path: impl Into<String>) -> Result<Self, ConfigError> {
        let database_path = database_path.into();
        if database_path.trim().is_empty() {
            return Err(ConfigError::MissingDatabasePath);
        }

        Ok(Self {
            database_path,
            allow_bots: false,
            debug: false,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(DATABASE_PATH_VAR).unwrap_or_default())?;
        config.allow_bots = flag(&lookup, ALLOW_BOTS_VAR)?;
        config.debug = flag(&lookup, DEBUG_VAR)?;
        Ok(config)
    }
}

pub fn discord_token() -> Result<String, ConfigError> {
    discord_token_from(|key| env::var(key).ok())
}

pub fn discord_token_from<F>(lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(TOKEN_VAR)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(ConfigError::MissingToken)
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: false");
        return Ok(false);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_database_path_is_rejected() {
        assert_eq!(
            TrackerConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingDatabasePath)
        );
        assert_eq!(
            TrackerConfig::from_lookup(lookup(&[(DATABASE_PATH_VAR, "  ")])),
            Err(ConfigError::MissingDatabasePath)
        );
    }

    #[test]
    fn flags_default_to_off() {
        let config = TrackerConfig::from_lookup(lookup(&[(DATABASE_PATH_VAR, "data/voice.db")]))
            .unwrap();
        assert_eq!(config.database_path, "data/voice.db");
        assert!(!config.allow_bots);
        assert!(!config.debug);
    }

    #[test]
    fn flags_accept_common_spellings() {
        let config = TrackerConfig::from_lookup(lookup(&[
            (DATABASE_PATH_VAR, "data/voice.db"),
            (ALLOW_BOTS_VAR, "Yes"),
            (DEBUG_VAR, "1"),
        ]))
        .unwrap();
        assert!(config.allow_bots);
        assert!(config.debug);
    }

    #[test]
    fn garbage_flag_is_an_error() {
        let err = TrackerConfig::from_lookup(lookup(&[
            (DATABASE_PATH_VAR, "data/voice.db"),
            (DEBUG_VAR, "loud"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidFlag {
                key: DEBUG_VAR.to_string(),
                value: "loud".to_string(),
            }
        );
    }

    #[test]
    fn token_must_be_present() {
        assert_eq!(discord_token_from(lookup(&[])), Err(ConfigError::MissingToken));
        assert_eq!(
            discord_token_from(lookup(&[(TOKEN_VAR, " ")])),
            Err(ConfigError::MissingToken)
        );
        assert_eq!(
            discord_token_from(lookup(&[(TOKEN_VAR, "abc.def\n")])),
            Ok("abc.def".to_string())
        );
    }
}
