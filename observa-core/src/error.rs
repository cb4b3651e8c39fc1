//! Error types.
//!
//! Nothing in the tracking hot path fails loudly. Refused structural
//! mutations are reported as [`ReactiveError`] by the `try_*` helpers and
//! downgraded to a warning by their infallible counterparts.

use thiserror::Error;

/// A structural mutation that the reactive helpers refused to perform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// The target of `set`/`delete` is not a record or sequence.
    #[error("cannot {op} reactive property on null or primitive value: {found}")]
    NotAContainer {
        /// `"set"` or `"delete"`.
        op: &'static str,
        /// Short description of the offending value.
        found: String,
    },

    /// Adding a key to an owner instance or to an observed root record.
    #[error(
        "avoid adding reactive properties to an owner instance or its root data \
         at runtime; declare `{key}` upfront"
    )]
    RootAddition { key: String },

    /// Deleting a key from an owner instance or from an observed root record.
    #[error(
        "avoid deleting properties on an owner instance or its root data; \
         set `{key}` to null instead"
    )]
    RootDeletion { key: String },

    /// A sequence was addressed with a named key.
    #[error("sequence targets need an index key, got `{key}`")]
    NonIndexKey { key: String },
}

/// Failure to load a [`ReactiveConfig`](crate::config::ReactiveConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid reactive config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
