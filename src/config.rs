//! Dispatcher configuration.
//!
//! The process-wide dispatcher reads its configuration from the environment
//! the first time it is used; embedded dispatchers take a [`Config`] directly,
//! which can also be deserialized from any serde format.

use std::env;

use lazy_static::lazy_static;
use serde_derive::{Deserialize, Serialize};

pub const ENV_STRICT_UNGUARDED: &str = "INTENTS_STRICT_UNGUARDED";
pub const ENV_DETECT_SAME_AS_CYCLES: &str = "INTENTS_DETECT_SAME_AS_CYCLES";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Treat checks on objects the dispatcher never observed as violations
    /// instead of letting them through unchecked.
    pub strict_unguarded: bool,

    /// Refuse to install a same-as permission that would make an object
    /// delegate, directly or transitively, to itself.
    pub detect_same_as_cycles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_unguarded: false,
            detect_same_as_cycles: true,
        }
    }
}

lazy_static! {
    static ref ENV_CONFIG: Config = Config::from_env();
}

impl Config {
    /// The environment configuration, read once per process.
    pub fn global() -> &'static Config {
        &ENV_CONFIG
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            strict_unguarded: env_flag(ENV_STRICT_UNGUARDED, defaults.strict_unguarded),
            detect_same_as_cycles: env_flag(
                ENV_DETECT_SAME_AS_CYCLES,
                defaults.detect_same_as_cycles,
            ),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(val) => parse_flag(&val).unwrap_or_else(|| {
            log::warn!("ignoring {}={:?}: expected a boolean", name, val);
            default
        }),
        Err(_) => default,
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_unguarded_and_detect_cycles() {
        let cfg = Config::default();
        assert!(!cfg.strict_unguarded);
        assert!(cfg.detect_same_as_cycles);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"strict_unguarded": true}"#).unwrap();
        assert!(cfg.strict_unguarded);
        assert!(cfg.detect_same_as_cycles);
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("On"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn global_is_read_once() {
        assert!(std::ptr::eq(Config::global(), Config::global()));
        assert_eq!(*Config::global(), Config::from_env());
    }
}
