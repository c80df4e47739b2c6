//! Pool configuration.
//!
//! Provides an immutable configuration record consumed by
//! [`ConnectionPool`](crate::ConnectionPool) and forwarded to every channel
//! it creates.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use streampool::PoolConfig;
//!
//! let config = PoolConfig::new()
//!     .with_max_connections_per_host(8)
//!     .with_read_timeout(Duration::from_secs(5));
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default cap on live channels per endpoint.
const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 5;

/// Default receive/send buffer size (64 KiB).
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default per-channel socket read timeout.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// PoolConfig
// ============================================================================

/// Connection pool configuration.
///
/// Shared by the whole pool; every per-endpoint pool sizes its queues from
/// `max_connections_per_host` and passes the buffer sizes and read timeout
/// to each new channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Cap on live channels per endpoint; also the capacity of the
    /// available queue.
    pub max_connections_per_host: usize,

    /// Receive buffer size in bytes for each channel.
    pub read_buffer_size: usize,

    /// Send buffer size in bytes for each channel.
    pub write_buffer_size: usize,

    /// Socket read timeout for each channel.
    pub read_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PoolConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolConfig {
    /// Sets the cap on live channels per endpoint.
    #[inline]
    #[must_use]
    pub const fn with_max_connections_per_host(mut self, max: usize) -> Self {
        self.max_connections_per_host = max;
        self
    }

    /// Sets the receive buffer size in bytes.
    #[inline]
    #[must_use]
    pub const fn with_read_buffer_size(mut self, bytes: usize) -> Self {
        self.read_buffer_size = bytes;
        self
    }

    /// Sets the send buffer size in bytes.
    #[inline]
    #[must_use]
    pub const fn with_write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    /// Sets the per-channel socket read timeout.
    #[inline]
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PoolConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the cap, a buffer size, or the read
    /// timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections_per_host == 0 {
            return Err(Error::config("max_connections_per_host must be at least 1"));
        }
        if self.read_buffer_size == 0 || self.write_buffer_size == 0 {
            return Err(Error::config("buffer sizes must be greater than zero"));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::config("read_timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_defaults() {
        let config = PoolConfig::new();
        assert_eq!(config.max_connections_per_host, 5);
        assert_eq!(config.read_buffer_size, 64 * 1024);
        assert_eq!(config.write_buffer_size, 64 * 1024);
        assert_eq!(config.read_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_chain() {
        let config = PoolConfig::new()
            .with_max_connections_per_host(2)
            .with_read_buffer_size(4096)
            .with_write_buffer_size(8192)
            .with_read_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections_per_host, 2);
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.write_buffer_size, 8192);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate_valid() {
        assert!(PoolConfig::new().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_cap() {
        let config = PoolConfig::new().with_max_connections_per_host(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_zero_buffer() {
        let config = PoolConfig::new().with_read_buffer_size(0);
        assert!(config.validate().is_err());

        let config = PoolConfig::new().with_write_buffer_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_read_timeout() {
        let config = PoolConfig::new().with_read_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
