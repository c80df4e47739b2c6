//! Channel contract and blocking TCP implementation.
//!
//! A channel is a persistent, stream-oriented, bidirectional link to one
//! remote endpoint. The pool only depends on the [`Channel`] trait
//! (connect, disconnect, and remote identity) and never inspects the
//! payload carried over it. [`TcpChannel`] is the production transport;
//! tests inject their own [`ChannelFactory`] implementations.

// ============================================================================
// Imports
// ============================================================================

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::identifiers::PortDescriptor;

// ============================================================================
// Channel
// ============================================================================

/// Operations the pool requires from any concrete transport.
///
/// A channel is constructed disconnected; [`connect`](Channel::connect)
/// establishes the transport and [`disconnect`](Channel::disconnect)
/// releases it. After disconnect the instance is not reused. The remote
/// identity must stay stable for the channel's whole lifetime: the pool
/// uses it to route checkin and destroy back to the owning endpoint pool.
pub trait Channel: Send {
    /// Establishes the transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the remote endpoint is unreachable.
    /// The pool reports this as an acquisition failure.
    fn connect(&mut self) -> Result<()>;

    /// Releases the transport.
    ///
    /// The pool calls this at most once per channel; calling it on a
    /// never-connected channel is not an error.
    fn disconnect(&mut self);

    /// Returns the remote host.
    fn remote_host(&self) -> &str;

    /// Returns the remote port descriptor.
    fn remote_port(&self) -> PortDescriptor;
}

// ============================================================================
// ChannelFactory
// ============================================================================

/// Creates disconnected channels for an endpoint.
///
/// Construction is infallible; failures surface from the subsequent
/// [`Channel::connect`] call. This split is what lets the pool count only
/// channels that actually connected, and what tests hook to inject
/// connect failures.
pub trait ChannelFactory: Send + Sync + 'static {
    /// Concrete channel type produced by this factory.
    type Chan: Channel + 'static;

    /// Creates a disconnected channel to `host`:`port`.
    fn create(&self, host: &str, port: PortDescriptor, config: &PoolConfig) -> Self::Chan;
}

// ============================================================================
// TcpChannel
// ============================================================================

/// Blocking TCP channel.
///
/// Wraps a [`TcpStream`] with buffered reader and writer sized from the
/// pool configuration. All operations block the calling thread; reads are
/// bounded by the configured socket read timeout.
pub struct TcpChannel {
    host: String,
    port: PortDescriptor,
    read_buffer_size: usize,
    write_buffer_size: usize,
    read_timeout: Duration,
    reader: Option<BufReader<TcpStream>>,
    writer: Option<BufWriter<TcpStream>>,
}

impl TcpChannel {
    /// Creates a disconnected channel.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: PortDescriptor,
        read_buffer_size: usize,
        write_buffer_size: usize,
        read_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            read_buffer_size,
            write_buffer_size,
            read_timeout,
            reader: None,
            writer: None,
        }
    }

    /// Returns `true` if the transport is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// Sends a payload over the channel.
    ///
    /// The payload is written in full and flushed before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not connected
    /// - [`Error::Io`] on socket failure
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::ConnectionClosed)?;
        writer.write_all(payload)?;
        writer.flush()?;
        trace!(host = %self.host, port = %self.port, bytes = payload.len(), "Payload sent");
        Ok(())
    }

    /// Receives up to `buf.len()` bytes from the channel.
    ///
    /// Blocks until data arrives, the read timeout elapses, or the remote
    /// side closes. Returns the number of bytes read; zero means the
    /// remote side closed the stream.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not connected
    /// - [`Error::Io`] on socket failure or read timeout
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let reader = self.reader.as_mut().ok_or(Error::ConnectionClosed)?;
        let read = reader.read(buf)?;
        trace!(host = %self.host, port = %self.port, bytes = read, "Payload received");
        Ok(read)
    }
}

impl Channel for TcpChannel {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            debug!(host = %self.host, port = %self.port, "Channel already connected");
            return Ok(());
        }

        let stream = TcpStream::connect((self.host.as_str(), self.port.number()))?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_nodelay(true)?;

        let reader = BufReader::with_capacity(self.read_buffer_size, stream.try_clone()?);
        self.writer = Some(BufWriter::with_capacity(self.write_buffer_size, stream));
        self.reader = Some(reader);

        debug!(host = %self.host, port = %self.port, "Channel connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.writer = None;
        if let Some(reader) = self.reader.take() {
            // Best effort; the peer may already be gone.
            let _ = reader.get_ref().shutdown(Shutdown::Both);
            debug!(host = %self.host, port = %self.port, "Channel disconnected");
        }
    }

    #[inline]
    fn remote_host(&self) -> &str {
        &self.host
    }

    #[inline]
    fn remote_port(&self) -> PortDescriptor {
        self.port
    }
}

impl std::fmt::Debug for TcpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpChannel")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ============================================================================
// TcpChannelFactory
// ============================================================================

/// Default factory producing [`TcpChannel`]s from the pool configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpChannelFactory;

impl ChannelFactory for TcpChannelFactory {
    type Chan = TcpChannel;

    fn create(&self, host: &str, port: PortDescriptor, config: &PoolConfig) -> TcpChannel {
        TcpChannel::new(
            host,
            port,
            config.read_buffer_size,
            config.write_buffer_size,
            config.read_timeout,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener;
    use std::thread;

    fn channel_to(port: u16) -> TcpChannel {
        TcpChannel::new(
            "127.0.0.1",
            PortDescriptor::plaintext(port),
            4096,
            4096,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_new_channel_is_disconnected() {
        let channel = channel_to(9);
        assert!(!channel.is_connected());
        assert_eq!(channel.remote_host(), "127.0.0.1");
        assert_eq!(channel.remote_port(), PortDescriptor::plaintext(9));
    }

    #[test]
    fn test_send_before_connect_fails() {
        let mut channel = channel_to(9);
        let err = channel.send(b"hello").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let mut channel = channel_to(port);
        let err = channel.connect().unwrap_err();
        assert!(err.is_connection_error());
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_connect_send_receive_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let echo = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).expect("read");
            stream.write_all(&buf).expect("write");
        });

        let mut channel = channel_to(port);
        channel.connect().expect("connect");
        assert!(channel.is_connected());

        channel.send(b"hello").expect("send");
        let mut buf = [0u8; 5];
        let mut got = 0;
        while got < buf.len() {
            got += channel.receive(&mut buf[got..]).expect("receive");
        }
        assert_eq!(&buf, b"hello");

        channel.disconnect();
        assert!(!channel.is_connected());
        echo.join().expect("echo thread");
    }

    #[test]
    fn test_disconnect_without_connect_is_noop() {
        let mut channel = channel_to(9);
        channel.disconnect();
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_factory_uses_config() {
        let config = PoolConfig::new()
            .with_read_buffer_size(1024)
            .with_write_buffer_size(2048)
            .with_read_timeout(Duration::from_millis(750));

        let channel =
            TcpChannelFactory.create("node7", PortDescriptor::secure(2443), &config);

        assert_eq!(channel.remote_host(), "node7");
        assert!(channel.remote_port().is_secure());
        assert_eq!(channel.read_buffer_size, 1024);
        assert_eq!(channel.write_buffer_size, 2048);
        assert_eq!(channel.read_timeout, Duration::from_millis(750));
    }
}
