//! Multi-host connection pool.
//!
//! The [`ConnectionPool`] is the caller-facing registry: it maps endpoint
//! keys to per-endpoint pools, creating each [`EndpointPool`] lazily on
//! the first checkout for that endpoint, and routes checkin/destroy back
//! by the channel's remote identity.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ConnectionPool                  │
//! │  ┌──────────────────────────────────────┐    │
//! │  │ host-a:2000 → EndpointPool (cap N)   │    │
//! │  │ host-b:2000 → EndpointPool (cap N)   │    │
//! │  │ host-b:2443 → EndpointPool (cap N)   │    │
//! │  └──────────────────────────────────────┘    │
//! └──────────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{error, info, trace};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::identifiers::{EndpointKey, PortDescriptor};
use crate::transport::channel::{Channel, ChannelFactory, TcpChannelFactory};
use crate::transport::endpoint_pool::{EndpointPool, PooledChannel};

// ============================================================================
// ConnectionPool
// ============================================================================

/// Blocking connection pool over many endpoints.
///
/// Thread-safe; share it behind an [`Arc`] and call it from any number of
/// threads. Checked-out channels must be handed back via
/// [`checkin`](ConnectionPool::checkin) or
/// [`destroy`](ConnectionPool::destroy); the pool does not track
/// borrowers and cannot reclaim leaked channels.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use streampool::{ConnectionPool, PoolConfig, PortDescriptor};
///
/// # fn example() -> streampool::Result<()> {
/// let pool = ConnectionPool::new(PoolConfig::new())?;
/// pool.start();
///
/// let port = PortDescriptor::plaintext(2000);
/// let mut conn = pool.checkout("storage-7", port, Duration::from_secs(2))?;
/// conn.send(b"ping")?;
/// pool.checkin(conn)?;
///
/// pool.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionPool<F: ChannelFactory = TcpChannelFactory> {
    /// Per-endpoint pools, created lazily on first checkout.
    pools: RwLock<FxHashMap<EndpointKey, Arc<EndpointPool<F>>>>,

    /// Shared channel factory.
    factory: Arc<F>,

    /// Shared configuration.
    config: PoolConfig,
}

// ============================================================================
// ConnectionPool - Constructors
// ============================================================================

impl ConnectionPool<TcpChannelFactory> {
    /// Creates a pool producing blocking TCP channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_factory(config, TcpChannelFactory)
    }
}

impl<F: ChannelFactory> ConnectionPool<F> {
    /// Creates a pool with a custom channel factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_factory(config: PoolConfig, factory: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pools: RwLock::new(FxHashMap::default()),
            factory: Arc::new(factory),
            config,
        })
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl<F: ChannelFactory> ConnectionPool<F> {
    /// Lifecycle hook; opens no connections.
    ///
    /// Idempotent. Present so callers can treat the pool like the other
    /// services they start and stop.
    pub fn start(&self) {
        info!("Connection pool started");
    }

    /// Checks out a connected channel to `host`:`port`.
    ///
    /// Creates the endpoint pool on first use, then delegates to
    /// [`EndpointPool::checkout`]. Blocks up to `timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::CheckoutTimeout`] if no channel could be obtained within
    ///   the deadline
    pub fn checkout(
        &self,
        host: &str,
        port: PortDescriptor,
        timeout: Duration,
    ) -> Result<PooledChannel<F::Chan>> {
        self.endpoint_pool(host, port).checkout(timeout)
    }

    /// Returns a checked-out channel to its endpoint pool.
    ///
    /// Routed by the channel's remote identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no endpoint pool matches the
    /// channel's remote identity.
    pub fn checkin(&self, channel: PooledChannel<F::Chan>) -> Result<()> {
        let pool = self.route(channel.remote_host(), channel.remote_port())?;
        pool.checkin(channel)
    }

    /// Destroys a checked-out channel, letting its endpoint pool replace it.
    ///
    /// Routed by the channel's remote identity.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if no endpoint pool matches, or the
    ///   channel is not currently checked out
    pub fn destroy(&self, channel: PooledChannel<F::Chan>) -> Result<()> {
        let pool = self.route(channel.remote_host(), channel.remote_port())?;
        pool.destroy(channel)
    }

    /// Cleans up every endpoint pool.
    ///
    /// Behavior of checkouts issued after shutdown is unspecified.
    pub fn shutdown(&self) {
        info!("Shutting down connection pool");
        let pools: Vec<_> = self.pools.read().values().cloned().collect();
        for pool in pools {
            pool.cleanup();
        }
        info!("Connection pool shutdown complete");
    }

    /// Returns the number of endpoint pools created so far.
    #[inline]
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.pools.read().len()
    }
}

// ============================================================================
// ConnectionPool - Internals
// ============================================================================

impl<F: ChannelFactory> ConnectionPool<F> {
    /// Resolves the endpoint pool for `host`:`port`, creating it on first
    /// use.
    fn endpoint_pool(&self, host: &str, port: PortDescriptor) -> Arc<EndpointPool<F>> {
        let key = EndpointKey::new(host, port);

        if let Some(pool) = self.pools.read().get(&key) {
            return Arc::clone(pool);
        }

        // Re-check under the write lock; a concurrent caller may have
        // created the pool while we upgraded.
        let mut pools = self.pools.write();
        let pool = pools.entry(key).or_insert_with_key(|key| {
            trace!(host = %key.host(), port = %key.port(), "Creating endpoint pool");
            Arc::new(EndpointPool::new(
                key.host(),
                key.port(),
                self.config.clone(),
                Arc::clone(&self.factory),
            ))
        });
        Arc::clone(pool)
    }

    /// Resolves the endpoint pool owning a channel's remote identity.
    fn route(&self, host: &str, port: PortDescriptor) -> Result<Arc<EndpointPool<F>>> {
        let key = EndpointKey::new(host, port);
        self.pools.read().get(&key).map(Arc::clone).ok_or_else(|| {
            error!(
                host = %key.host(),
                port = %key.port(),
                "No endpoint pool for channel"
            );
            Error::invalid_argument(format!("channel for {key} does not belong to the pool"))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // Mock transport
    // ------------------------------------------------------------------

    struct TestChannel {
        host: String,
        port: PortDescriptor,
    }

    impl Channel for TestChannel {
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        fn disconnect(&mut self) {}

        fn remote_host(&self) -> &str {
            &self.host
        }

        fn remote_port(&self) -> PortDescriptor {
            self.port
        }
    }

    struct TestFactory;

    impl ChannelFactory for TestFactory {
        type Chan = TestChannel;

        fn create(&self, host: &str, port: PortDescriptor, _config: &PoolConfig) -> TestChannel {
            TestChannel {
                host: host.to_string(),
                port,
            }
        }
    }

    fn test_pool(max: usize) -> ConnectionPool<TestFactory> {
        let config = PoolConfig::new().with_max_connections_per_host(max);
        ConnectionPool::with_factory(config, TestFactory).expect("valid config")
    }

    const TIMEOUT: Duration = Duration::from_millis(200);

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn test_invalid_config_rejected() {
        let config = PoolConfig::new().with_max_connections_per_host(0);
        let err = ConnectionPool::new(config).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_endpoint_pools_created_lazily() {
        let pool = test_pool(2);
        assert_eq!(pool.endpoint_count(), 0);

        let port = PortDescriptor::plaintext(2000);
        let conn = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        assert_eq!(pool.endpoint_count(), 1);

        // Same endpoint reuses the pool.
        let conn2 = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        assert_eq!(pool.endpoint_count(), 1);

        // A different port on the same host is a different endpoint.
        let conn3 = pool
            .checkout("host-a", PortDescriptor::secure(2443), TIMEOUT)
            .expect("checkout");
        assert_eq!(pool.endpoint_count(), 2);

        pool.checkin(conn).expect("checkin");
        pool.checkin(conn2).expect("checkin");
        pool.checkin(conn3).expect("checkin");
    }

    #[test]
    fn test_endpoints_do_not_alias() {
        let pool = test_pool(1);

        let a = pool
            .checkout("a1", PortDescriptor::plaintext(2), TIMEOUT)
            .expect("checkout a1:2");
        let b = pool
            .checkout("a", PortDescriptor::plaintext(12), TIMEOUT)
            .expect("checkout a:12");

        assert_eq!(pool.endpoint_count(), 2);

        pool.checkin(a).expect("checkin");
        pool.checkin(b).expect("checkin");
    }

    #[test]
    fn test_checkin_routes_by_remote_identity() {
        let pool = test_pool(1);
        let port = PortDescriptor::plaintext(2000);

        let conn = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        let id = conn.id();
        pool.checkin(conn).expect("checkin");

        let again = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        assert_eq!(again.id(), id);
        pool.checkin(again).expect("checkin");
    }

    #[test]
    fn test_checkin_unknown_endpoint_rejected() {
        let pool = test_pool(1);

        let ghost = PooledChannel::new(TestChannel {
            host: "ghost".to_string(),
            port: PortDescriptor::plaintext(2000),
        });

        let err = pool.checkin(ghost).unwrap_err();
        assert!(err.is_invalid_argument());
        // Routing a foreign channel must not create an endpoint pool.
        assert_eq!(pool.endpoint_count(), 0);
    }

    #[test]
    fn test_destroy_unknown_endpoint_rejected() {
        let pool = test_pool(1);

        let ghost = PooledChannel::new(TestChannel {
            host: "ghost".to_string(),
            port: PortDescriptor::plaintext(2000),
        });

        let err = pool.destroy(ghost).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(pool.endpoint_count(), 0);
    }

    #[test]
    fn test_destroy_routes_and_replaces() {
        let pool = test_pool(1);
        let port = PortDescriptor::plaintext(2000);

        let conn = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        let old_id = conn.id();
        pool.destroy(conn).expect("destroy");

        let replacement = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        assert_ne!(replacement.id(), old_id);
        pool.checkin(replacement).expect("checkin");
    }

    #[test]
    fn test_start_is_idempotent() {
        let pool = test_pool(1);
        pool.start();
        pool.start();
        assert_eq!(pool.endpoint_count(), 0);
    }

    #[test]
    fn test_shutdown_cleans_all_endpoints() {
        let pool = test_pool(2);
        let port = PortDescriptor::plaintext(2000);

        let a = pool.checkout("host-a", port, TIMEOUT).expect("checkout");
        let b = pool.checkout("host-b", port, TIMEOUT).expect("checkout");
        pool.checkin(a).expect("checkin");
        pool.checkin(b).expect("checkin");

        pool.shutdown();

        // Registry slots survive shutdown; the pools themselves are empty.
        assert_eq!(pool.endpoint_count(), 2);
        let pools = pool.pools.read();
        for endpoint in pools.values() {
            assert_eq!(endpoint.connection_count(), 0);
            assert_eq!(endpoint.available_count(), 0);
            assert_eq!(endpoint.active_count(), 0);
        }
    }
}
