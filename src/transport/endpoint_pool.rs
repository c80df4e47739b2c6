//! Per-endpoint channel pool.
//!
//! One [`EndpointPool`] exists per (host, port) pair. It owns a bounded set
//! of channels and enforces the per-endpoint cap: checkout either reuses a
//! pooled channel, creates a new one below the cap, or blocks on the
//! available queue until a channel is returned or the timeout elapses.
//!
//! # Locking
//!
//! Two layers, always acquired in this order:
//!
//! 1. Lifecycle `RwLock`: checkout, checkin and destroy take the read
//!    side and may run concurrently; [`cleanup`](EndpointPool::cleanup)
//!    takes the write side and runs exclusively.
//! 2. Construction `Mutex`: serializes channel creation and `count`
//!    updates, nested strictly inside the read side. It never covers the
//!    blocking wait, so a parked checkout cannot starve checkins.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tracing::{error, info, trace};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, PortDescriptor};
use crate::transport::channel::{Channel, ChannelFactory};

// ============================================================================
// PooledChannel
// ============================================================================

/// A channel checked out of (or owned by) an endpoint pool.
///
/// Carries the pool-assigned [`ConnectionId`] alongside the underlying
/// channel and derefs to it for payload I/O. Every handle returned by
/// checkout must be given back through checkin or destroy; the pool does
/// not track borrowers and cannot reclaim leaked handles.
pub struct PooledChannel<C: Channel> {
    id: ConnectionId,
    channel: C,
}

impl<C: Channel> PooledChannel<C> {
    /// Wraps a freshly created channel under a new id.
    pub(crate) fn new(channel: C) -> Self {
        Self {
            id: ConnectionId::next(),
            channel,
        }
    }

    /// Returns the pool-assigned id of this channel.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Consumes the handle, returning the underlying channel.
    fn into_channel(self) -> C {
        self.channel
    }
}

impl<C: Channel> Deref for PooledChannel<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.channel
    }
}

impl<C: Channel> DerefMut for PooledChannel<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

impl<C: Channel> fmt::Debug for PooledChannel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledChannel")
            .field("id", &self.id)
            .field("host", &self.channel.remote_host())
            .field("port", &self.channel.remote_port())
            .finish()
    }
}

// ============================================================================
// EndpointPool
// ============================================================================

/// Bounded pool of channels to one endpoint.
///
/// Created lazily by [`ConnectionPool`](crate::ConnectionPool) on first
/// checkout for the endpoint and kept for the life of the registry.
pub struct EndpointPool<F: ChannelFactory> {
    host: String,
    port: PortDescriptor,
    config: PoolConfig,
    factory: Arc<F>,

    /// Channels ready for use. The bounded channel doubles as the blocking
    /// primitive: checkout parks in `recv_timeout` on the receiver.
    available_tx: Sender<PooledChannel<F::Chan>>,
    available_rx: Receiver<PooledChannel<F::Chan>>,

    /// Ids of channels currently in callers' hands.
    active: Mutex<FxHashSet<ConnectionId>>,

    /// Live channels owned by this pool: available + active + in-flight
    /// construction. Never exceeds `max_connections_per_host`.
    count: AtomicUsize,

    /// Lifecycle lock; see the module docs.
    lifecycle: RwLock<()>,

    /// Construction lock guarding creation and `count` updates.
    create_lock: Mutex<()>,
}

impl<F: ChannelFactory> EndpointPool<F> {
    /// Creates an empty pool for `host`:`port`.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: PortDescriptor,
        config: PoolConfig,
        factory: Arc<F>,
    ) -> Self {
        let host = host.into();
        let (available_tx, available_rx) =
            crossbeam_channel::bounded(config.max_connections_per_host);

        info!(host = %host, port = %port, "Starting endpoint pool");

        Self {
            host,
            port,
            config,
            factory,
            available_tx,
            available_rx,
            active: Mutex::new(FxHashSet::default()),
            count: AtomicUsize::new(0),
            lifecycle: RwLock::new(()),
            create_lock: Mutex::new(()),
        }
    }
}

// ============================================================================
// EndpointPool - Public API
// ============================================================================

impl<F: ChannelFactory> EndpointPool<F> {
    /// Checks out a connected channel, blocking up to `timeout`.
    ///
    /// Reuses a pooled channel when one is available; below the cap a new
    /// channel is created and connected first. The returned channel is
    /// tracked as active until checked in or destroyed.
    ///
    /// Each queue wait uses the caller's full timeout, so a checkout that
    /// creates a channel and then loses it to a faster waiter can block up
    /// to twice the timeout in the degenerate case.
    ///
    /// # Errors
    ///
    /// - [`Error::CheckoutTimeout`] if no channel became available within
    ///   the deadline, or if creating a new channel failed (the transport
    ///   error is chained as the source)
    /// - [`Error::ConnectionClosed`] if the pool's queue is gone
    pub fn checkout(&self, timeout: Duration) -> Result<PooledChannel<F::Chan>> {
        let _lifecycle = self.lifecycle.read();

        // Fast path: the cap is reached, or a channel already sits in the
        // available queue. The queue check is approximate; if a competing
        // caller drains it first we park below and rely on a checkin.
        if self.count.load(Ordering::SeqCst) >= self.config.max_connections_per_host
            || !self.available_rx.is_empty()
        {
            return self.wait_for_available(timeout);
        }

        {
            let _create = self.create_lock.lock();
            // Re-check under the lock; another caller may have taken the
            // last slot between the fast-path check and here.
            if self.count.load(Ordering::SeqCst) < self.config.max_connections_per_host {
                let mut channel = self.factory.create(&self.host, self.port, &self.config);
                if let Err(cause) = channel.connect() {
                    error!(
                        host = %self.host,
                        port = %self.port,
                        error = %cause,
                        "Failed to connect a new channel during checkout"
                    );
                    return Err(Error::checkout_timeout_caused(
                        self.endpoint_label(),
                        timeout.as_millis() as u64,
                        cause,
                    ));
                }

                let pooled = PooledChannel::new(channel);
                trace!(
                    host = %self.host,
                    port = %self.port,
                    id = %pooled.id(),
                    count = self.count.load(Ordering::SeqCst) + 1,
                    "Created a new channel"
                );
                self.push_available(pooled)?;
                self.count.fetch_add(1, Ordering::SeqCst);
            }
        }

        self.wait_for_available(timeout)
    }

    /// Returns a checked-out channel to the pool.
    ///
    /// The channel moves from active back to available; a parked checkout
    /// may unblock as a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the available queue cannot
    /// accept the channel, which indicates it never belonged to this pool.
    pub fn checkin(&self, channel: PooledChannel<F::Chan>) -> Result<()> {
        let _lifecycle = self.lifecycle.read();

        self.active.lock().remove(&channel.id());
        self.push_available(channel)?;
        trace!(
            host = %self.host,
            port = %self.port,
            available = self.available_rx.len(),
            "Channel returned to pool"
        );
        Ok(())
    }

    /// Destroys a checked-out channel and replaces it.
    ///
    /// The channel is removed from the active set and disconnected. A
    /// replacement is created and connected to preserve the connection
    /// count; if the replacement fails, the count is decremented instead
    /// and the failure is swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the channel is not currently
    /// checked out from this pool.
    pub fn destroy(&self, channel: PooledChannel<F::Chan>) -> Result<()> {
        let _lifecycle = self.lifecycle.read();

        if !self.active.lock().remove(&channel.id()) {
            error!(
                host = %self.host,
                port = %self.port,
                id = %channel.id(),
                channel_host = %channel.remote_host(),
                channel_port = %channel.remote_port(),
                "Destroy of a channel that is not checked out"
            );
            return Err(Error::invalid_argument(
                "channel is not checked out from this endpoint pool",
            ));
        }

        let mut old = channel.into_channel();
        old.disconnect();

        // Preserve the connection count by replacing the destroyed channel.
        let mut replacement = self.factory.create(&self.host, self.port, &self.config);
        match replacement.connect() {
            Ok(()) => {
                trace!(
                    host = %self.host,
                    port = %self.port,
                    "Destroyed channel replaced with a fresh one"
                );
                if self.push_available(PooledChannel::new(replacement)).is_err() {
                    self.forfeit_slot();
                }
            }
            Err(cause) => {
                error!(
                    host = %self.host,
                    port = %self.port,
                    error = %cause,
                    "Replacement failed while destroying a channel"
                );
                self.forfeit_slot();
            }
        }
        Ok(())
    }

    /// Disconnects and drops every channel the pool can observe.
    ///
    /// Runs exclusively: in-flight checkouts, checkins and destroys finish
    /// first, and none may start until cleanup returns. Channels still in
    /// callers' hands are not reclaimed; they become the caller's
    /// responsibility and will fail on next use.
    pub fn cleanup(&self) {
        let _lifecycle = self.lifecycle.write();

        info!(host = %self.host, port = %self.port, "Cleaning up endpoint pool");
        while let Ok(pooled) = self.available_rx.try_recv() {
            let mut channel = pooled.into_channel();
            channel.disconnect();
        }
        self.active.lock().clear();
        self.count.store(0, Ordering::SeqCst);
        info!(host = %self.host, port = %self.port, "Endpoint pool cleanup complete");
    }
}

// ============================================================================
// EndpointPool - Introspection
// ============================================================================

impl<F: ChannelFactory> EndpointPool<F> {
    /// Returns the number of live channels owned by this pool.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns the number of channels ready for checkout.
    #[inline]
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available_rx.len()
    }

    /// Returns the number of channels currently checked out.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Returns the remote host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the remote port descriptor.
    #[inline]
    #[must_use]
    pub fn port(&self) -> PortDescriptor {
        self.port
    }
}

// ============================================================================
// EndpointPool - Internals
// ============================================================================

impl<F: ChannelFactory> EndpointPool<F> {
    /// Blocks on the available queue, moving a dequeued channel to active.
    fn wait_for_available(&self, timeout: Duration) -> Result<PooledChannel<F::Chan>> {
        match self.available_rx.recv_timeout(timeout) {
            Ok(pooled) => {
                self.active.lock().insert(pooled.id());
                trace!(
                    host = %self.host,
                    port = %self.port,
                    id = %pooled.id(),
                    available = self.available_rx.len(),
                    "Channel checked out"
                );
                Ok(pooled)
            }
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    host = %self.host,
                    port = %self.port,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for a channel"
                );
                Err(Error::checkout_timeout(
                    self.endpoint_label(),
                    timeout.as_millis() as u64,
                ))
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::ConnectionClosed),
        }
    }

    /// Enqueues a channel into the available queue.
    ///
    /// A bounce can only happen on misuse (a foreign channel overflowing
    /// the queue); the bounced channel is disconnected before reporting.
    fn push_available(&self, channel: PooledChannel<F::Chan>) -> Result<()> {
        match self.available_tx.try_send(channel) {
            Ok(()) => Ok(()),
            Err(err) => {
                let full = matches!(err, TrySendError::Full(_));
                let mut bounced = err.into_inner().into_channel();
                bounced.disconnect();
                Err(if full {
                    Error::invalid_argument(format!(
                        "available queue for {} is full; channel does not belong to this pool",
                        self.endpoint_label()
                    ))
                } else {
                    Error::ConnectionClosed
                })
            }
        }
    }

    /// Gives up one connection slot after a failed replacement.
    fn forfeit_slot(&self) {
        let _create = self.create_lock.lock();
        self.count.fetch_sub(1, Ordering::SeqCst);
    }

    /// Formats the endpoint for error messages.
    fn endpoint_label(&self) -> String {
        format!("{}:{}", self.host, self.port.number())
    }
}

impl<F: ChannelFactory> fmt::Debug for EndpointPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointPool")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("count", &self.connection_count())
            .field("available", &self.available_count())
            .field("active", &self.active_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
