//! Runtime Configuration
//!
//! Knobs that change how the tracking core behaves. The active configuration
//! is thread-local, like the tracking context itself: each thread that
//! drives reactive data carries its own settings.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings read by the dependency registry, the scheduler and the
/// mutation helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// When true, watchers are batched through the scheduler and the
    /// scheduler owns ordering. When false, updates run synchronously and
    /// `Dep::notify` sorts subscribers by creation order itself.
    pub async_notification: bool,

    /// Silences development diagnostics (refused mutations, custom setter
    /// hooks).
    pub production: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            async_notification: true,
            production: false,
        }
    }
}

impl ReactiveConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

thread_local! {
    static CONFIG: RefCell<ReactiveConfig> = RefCell::new(ReactiveConfig::default());
}

/// Install `config` for the current thread.
pub fn configure(config: ReactiveConfig) {
    CONFIG.with(|slot| *slot.borrow_mut() = config);
}

/// A copy of the current thread's configuration.
pub fn config() -> ReactiveConfig {
    CONFIG.with(|slot| slot.borrow().clone())
}

/// Switch between batched and synchronous notification.
pub fn set_async_notification(enabled: bool) {
    CONFIG.with(|slot| slot.borrow_mut().async_notification = enabled);
}

pub(crate) fn async_notification() -> bool {
    CONFIG.with(|slot| slot.borrow().async_notification)
}

pub(crate) fn is_production() -> bool {
    CONFIG.with(|slot| slot.borrow().production)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_async_and_development() {
        let cfg = ReactiveConfig::default();
        assert!(cfg.async_notification);
        assert!(!cfg.production);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let cfg = ReactiveConfig::from_json(r#"{ "production": true }"#).unwrap();
        assert!(cfg.async_notification);
        assert!(cfg.production);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(ReactiveConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn configure_is_thread_local() {
        set_async_notification(false);
        assert!(!config().async_notification);

        let other = std::thread::spawn(|| config().async_notification)
            .join()
            .unwrap();
        assert!(other);

        configure(ReactiveConfig::default());
        assert!(async_notification());
    }
}
