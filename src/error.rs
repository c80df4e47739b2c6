//! Error types for the connection pool.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use streampool::{Result, Error};
//!
//! fn example(pool: &ConnectionPool) -> Result<()> {
//!     let conn = pool.checkout("host", port, timeout)?;
//!     pool.checkin(conn)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Acquisition | [`Error::CheckoutTimeout`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::Io`] |
//! | Misuse | [`Error::InvalidArgument`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pool configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Acquisition Errors
    // ========================================================================
    /// Checkout could not obtain a channel within the deadline.
    ///
    /// Raised either because all channels for the endpoint stayed checked
    /// out for the whole wait, or because creating a new channel failed
    /// (the original transport error is chained as the source).
    #[error("Checkout timed out after {timeout_ms}ms for {endpoint}")]
    CheckoutTimeout {
        /// The endpoint the checkout targeted, as `host:port`.
        endpoint: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Transport failure that surfaced during the checkout, if any.
        #[source]
        source: Option<Box<Error>>,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport-level failure on a channel.
    ///
    /// Returned when a channel cannot establish or use its transport.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the transport failure.
        message: String,
    },

    /// The channel (or a pool queue behind it) is no longer usable.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Misuse Errors
    // ========================================================================
    /// A channel was handed to the wrong pool, or destroyed twice.
    ///
    /// Indicates a caller bug; fatal to the call but not to the pool.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the misuse.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error from a socket operation.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a checkout timeout error.
    #[inline]
    pub fn checkout_timeout(endpoint: impl Into<String>, timeout_ms: u64) -> Self {
        Self::CheckoutTimeout {
            endpoint: endpoint.into(),
            timeout_ms,
            source: None,
        }
    }

    /// Creates a checkout timeout error chained to a transport failure.
    #[inline]
    pub fn checkout_timeout_caused(
        endpoint: impl Into<String>,
        timeout_ms: u64,
        cause: Error,
    ) -> Self {
        Self::CheckoutTimeout {
            endpoint: endpoint.into(),
            timeout_ms,
            source: Some(Box::new(cause)),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a checkout timeout.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CheckoutTimeout { .. })
    }

    /// Returns `true` if this is a transport-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::Io(_)
        )
    }

    /// Returns `true` if this signals caller misuse.
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as StdError;
    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::checkout_timeout("node7:2000", 50);
        assert_eq!(err.to_string(), "Checkout timed out after 50ms for node7:2000");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("cap must be non-zero");
        assert_eq!(err.to_string(), "Configuration error: cap must be non-zero");
    }

    #[test]
    fn test_checkout_timeout_chains_cause() {
        let cause = Error::connection("refused");
        let err = Error::checkout_timeout_caused("node7:2000", 50, cause);

        let source = err.source().expect("cause should be chained");
        assert_eq!(source.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_plain_timeout_has_no_source() {
        let err = Error::checkout_timeout("node7:2000", 50);
        assert!(err.source().is_none());
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::checkout_timeout("h:1", 20);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let closed_err = Error::ConnectionClosed;
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_invalid_argument() {
        let err = Error::invalid_argument("foreign channel");
        assert!(err.is_invalid_argument());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_error());
    }
}
