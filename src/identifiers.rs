//! Type-safe identifiers for endpoints and pooled channels.
//!
//! Newtype wrappers prevent mixing incompatible values at compile time:
//! a [`PortDescriptor`] is not a bare `u16`, and an [`EndpointKey`] is a
//! real tuple key rather than a concatenated string (which would alias
//! host `"a1"` port `2` with host `"a"` port `12`).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// SecurityMode
// ============================================================================

/// Security mode of a remote port.
///
/// The pool does not negotiate TLS itself; the mode is an opaque tag
/// carried on the [`PortDescriptor`] and forwarded to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMode {
    /// Unencrypted transport.
    #[default]
    Plaintext,
    /// Encrypted transport.
    Secure,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => write!(f, "plaintext"),
            Self::Secure => write!(f, "secure"),
        }
    }
}

// ============================================================================
// PortDescriptor
// ============================================================================

/// A TCP port number tagged with its [`SecurityMode`].
///
/// Compared by value; two descriptors are equal only if both the number
/// and the mode match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortDescriptor {
    number: u16,
    mode: SecurityMode,
}

impl PortDescriptor {
    /// Creates a descriptor for a plaintext port.
    #[inline]
    #[must_use]
    pub const fn plaintext(number: u16) -> Self {
        Self {
            number,
            mode: SecurityMode::Plaintext,
        }
    }

    /// Creates a descriptor for a secure port.
    #[inline]
    #[must_use]
    pub const fn secure(number: u16) -> Self {
        Self {
            number,
            mode: SecurityMode::Secure,
        }
    }

    /// Returns the port number.
    #[inline]
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    /// Returns the security mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Returns `true` if the port uses a secure transport.
    #[inline]
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        matches!(self.mode, SecurityMode::Secure)
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.mode)
    }
}

// ============================================================================
// EndpointKey
// ============================================================================

/// Identity of one remote peer: host plus [`PortDescriptor`].
///
/// Used as the registry key for per-endpoint pools. Being a tuple key it is
/// collision-free for distinct (host, port) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    host: String,
    port: PortDescriptor,
}

impl EndpointKey {
    /// Creates a key from a host and port descriptor.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: PortDescriptor) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port descriptor.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> PortDescriptor {
        self.port
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port.number())
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Process-unique identity of a pooled channel.
///
/// Assigned by the pool when a channel is created; used to track which
/// channels are currently checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Returns the next unique id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
