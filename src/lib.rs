//! Streampool - Blocking multi-host connection pool.
//!
//! This library hands out persistent, stream-oriented channels to remote
//! endpoints, recycles them after use, and bounds resource consumption
//! per endpoint.
//!
//! # Architecture
//!
//! The pool is layered:
//!
//! - **[`ConnectionPool`]**: the caller-facing registry, one per process.
//!   Maps each (host, port) endpoint to its per-endpoint pool, created
//!   lazily on first checkout.
//! - **[`EndpointPool`]**: owns a bounded set of channels to one endpoint.
//!   Checkout blocks up to the caller's deadline when the cap is reached;
//!   checkin recycles; destroy disconnects and replaces.
//! - **[`Channel`]**: the transport contract (connect, disconnect, remote
//!   identity). [`TcpChannel`] is the production implementation; anything
//!   satisfying the contract can be pooled via a custom [`ChannelFactory`].
//!
//! Key design principles:
//!
//! - Fully blocking: operations run on the calling thread, no executor
//! - Exact accounting: the per-endpoint channel count never exceeds the
//!   configured cap, even across connect failures and forced teardown
//! - Callers borrow channels and must return each one via checkin or
//!   destroy; the pool never reclaims behind a caller's back
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use streampool::{ConnectionPool, PoolConfig, PortDescriptor};
//!
//! fn main() -> streampool::Result<()> {
//!     let config = PoolConfig::new().with_max_connections_per_host(4);
//!     let pool = ConnectionPool::new(config)?;
//!     pool.start();
//!
//!     // Borrow a channel, talk to the peer, hand the channel back.
//!     let port = PortDescriptor::plaintext(2000);
//!     let mut conn = pool.checkout("storage-7", port, Duration::from_secs(2))?;
//!     conn.send(b"ping")?;
//!     pool.checkin(conn)?;
//!
//!     pool.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Pool configuration record |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe endpoint and channel identifiers |
//! | [`transport`] | Channel contract, endpoint pools, registry |

// ============================================================================
// Modules
// ============================================================================

/// Pool configuration record.
///
/// Use [`PoolConfig::new()`] and the `with_*` builders.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for endpoints and pooled channels.
///
/// Newtype wrappers prevent mixing incompatible values at compile time.
pub mod identifiers;

/// Blocking transport layer.
///
/// Channel contract, per-endpoint pools, and the multi-host registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, EndpointKey, PortDescriptor, SecurityMode};

// Transport types
pub use transport::{
    Channel, ChannelFactory, ConnectionPool, EndpointPool, PooledChannel, TcpChannel,
    TcpChannelFactory,
};
