//! Blocking transport layer.
//!
//! This module contains the channel contract, the per-endpoint pool, and
//! the multi-host registry that callers interact with.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ConnectionPool                         │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ host-a:2000 → EndpointPool ──► channels to host-a   │    │
//! │  │ host-b:2000 → EndpointPool ──► channels to host-b   │    │
//! │  │ host-b:2443 → EndpointPool ──► channels to host-b   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Channel Lifecycle
//!
//! 1. `ConnectionPool::checkout` - resolve (or lazily create) the
//!    endpoint pool and obtain a connected channel
//! 2. Use the channel for payload I/O
//! 3. `ConnectionPool::checkin` - return it for reuse, or
//!    `ConnectionPool::destroy` - disconnect it and let the pool replace it
//! 4. `ConnectionPool::shutdown` - disconnect everything
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Channel contract and blocking TCP implementation |
//! | `endpoint_pool` | Bounded per-endpoint pool with blocking checkout |
//! | `pool` | Multi-host registry and routing |

// ============================================================================
// Submodules
// ============================================================================

/// Channel contract and blocking TCP implementation.
pub mod channel;

/// Bounded per-endpoint pool with blocking checkout.
pub mod endpoint_pool;

/// Multi-host registry and routing.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, ChannelFactory, TcpChannel, TcpChannelFactory};
pub use endpoint_pool::{EndpointPool, PooledChannel};
pub use pool::ConnectionPool;
