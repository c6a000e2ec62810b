use crate::error::{ModgateError, Result};
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const TRACE_TRANSITIONS_KEY: &str = "MODGATE_TRACE_TRANSITIONS";
pub const TRACER_HANDSHAKE_KEY: &str = "MODGATE_TRACER_HANDSHAKE";
pub const PHASE_TIMEOUT_KEY: &str = "MODGATE_PHASE_TIMEOUT_MS";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Service seeded from the process environment
    pub fn new() -> Self {
        let service = Self::empty();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// Service with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    /// Set a value, replacing any previous one
    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse a value, `Ok(None)` when the key is absent
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ModgateError::invalid_config(key, format!("{:?}: {}", raw, e))),
        }
    }
}

/// Knobs for gates and the startup driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Spawn a task per module that logs each of its phase changes.
    pub trace_transitions: bool,
    /// Wait for that task to start observing before committing `PRE_INIT`.
    pub await_tracer_handshake: bool,
    /// Upper bound for one host phase worth of module transitions.
    pub phase_timeout: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            trace_transitions: true,
            await_tracer_handshake: true,
            phase_timeout: None,
        }
    }
}

impl LifecycleConfig {
    /// Read overrides from `config`, keeping defaults for absent keys
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            trace_transitions: config
                .get_parsed(TRACE_TRANSITIONS_KEY)?
                .unwrap_or(defaults.trace_transitions),
            await_tracer_handshake: config
                .get_parsed(TRACER_HANDSHAKE_KEY)?
                .unwrap_or(defaults.await_tracer_handshake),
            phase_timeout: config
                .get_parsed::<u64>(PHASE_TIMEOUT_KEY)?
                .map(Duration::from_millis)
                .or(defaults.phase_timeout),
        })
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ConfigService::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = LifecycleConfig::from_config(&ConfigService::empty()).unwrap();
        assert_eq!(config, LifecycleConfig::default());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let service = ConfigService::empty();
        service.set(TRACE_TRANSITIONS_KEY, "false");
        service.set(TRACER_HANDSHAKE_KEY, " false ");
        service.set(PHASE_TIMEOUT_KEY, "250");

        let config = LifecycleConfig::from_config(&service).unwrap();
        assert!(!config.trace_transitions);
        assert!(!config.await_tracer_handshake);
        assert_eq!(config.phase_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let service = ConfigService::empty();
        service.set(PHASE_TIMEOUT_KEY, "soon");

        let err = LifecycleConfig::from_config(&service).unwrap_err();
        match err {
            ModgateError::InvalidConfig { key, .. } => assert_eq!(key, PHASE_TIMEOUT_KEY),
            other => panic!("unexpected error: {other}"),
        }
    }
}
