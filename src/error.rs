//! Error types for the forestkit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when forest configuration parameters are
//!   invalid (e.g. a non-positive fill factor, a growth base ≤ 1).
//! - [`InvariantError`]: Returned by `check_invariants` methods when internal
//!   forest invariants are violated (capacity envelope, metadata
//!   consistency, cross-level ordering).
//!
//! ## Example Usage
//!
//! ```
//! use forestkit::capacity::Capacity;
//! use forestkit::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let policy: Result<Capacity, ConfigError> = Capacity::try_new(1.0, 1.1, 256);
//! assert!(policy.is_ok());
//!
//! // Invalid fill factor is caught without panicking
//! let bad = Capacity::try_new(-0.5, 1.1, 256);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when forest configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`Capacity::try_new`](crate::capacity::Capacity::try_new) and
/// [`ForestBuilder::try_build`](crate::builder::ForestBuilder::try_build).
/// Carries a human-readable description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal forest invariants are violated.
///
/// Produced by `check_invariants` methods on forest types (e.g.
/// [`FrequencyForest::check_invariants`](crate::forest::FrequencyForest::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("fill_factor must be > 0");
        assert_eq!(err.to_string(), "fill_factor must be > 0");
    }

    #[test]
    fn config_debug_includes_message() {
        let err = ConfigError::new("bad base");
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("bad base"));
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("level size exceeds max capacity");
        assert_eq!(err.to_string(), "level size exceeds max capacity");
    }

    #[test]
    fn invariant_debug_includes_message() {
        let err = InvariantError::new("dangling metadata");
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("dangling metadata"));
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }
}
