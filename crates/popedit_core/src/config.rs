//! Configuration loading from environment variables.

use crate::blank::ResetPolicy;
use crate::constants::{
    DEFAULT_DEMO_INITIAL, DEMO_INITIAL_ENV, DEMO_PREVIOUS_ENV, LIFECYCLE_LOG_ENV,
    RESET_POLICY_ENV,
};
use serde::Deserialize;
use std::env;

/// Runtime configuration for popedit hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub reset_policy: ResetPolicy,
    pub lifecycle_log: bool,
    pub demo_initial: String,
    pub demo_previous: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_policy: ResetPolicy::default(),
            lifecycle_log: false,
            demo_initial: DEFAULT_DEMO_INITIAL.to_string(),
            demo_previous: None,
        }
    }
}

/// Read the lifecycle log switch; `None` for spellings it does not know.
fn lifecycle_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unparseable values fall back to defaults with a warning.
    ///
    /// # Arguments
    /// - `lookup`: Returns the raw value for a variable name, if set.
    ///
    /// # Returns
    /// A populated [`Config`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let reset_policy = match lookup(RESET_POLICY_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("Ignoring {}: {}", RESET_POLICY_ENV, err);
                defaults.reset_policy
            }),
            None => defaults.reset_policy,
        };
        Self {
            reset_policy,
            lifecycle_log: match lookup(LIFECYCLE_LOG_ENV) {
                Some(raw) => lifecycle_flag(&raw).unwrap_or_else(|| {
                    tracing::warn!("Ignoring {}: unrecognized value {:?}", LIFECYCLE_LOG_ENV, raw);
                    defaults.lifecycle_log
                }),
                None => defaults.lifecycle_log,
            },
            demo_initial: lookup(DEMO_INITIAL_ENV).unwrap_or(defaults.demo_initial),
            demo_previous: lookup(DEMO_PREVIOUS_ENV),
        }
    }
}
