//! Monitored wrappers for blocking listeners.
//!
//! [`MonitoredListener`] decorates anything implementing [`Accept`] (by
//! default [`std::net::TcpListener`]). Every successful accept notifies the
//! monitor with the peer's IP and returns a [`MonitoredStream`] whose close
//! (or drop) releases it again. Reads and writes pass straight through.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use tracing::trace;

use crate::port::ConnectionMonitor;

use super::registry::{ConnectionRegistry, Registration};

/// A blocking source of connections.
pub trait Accept {
    type Stream;

    /// Block until a connection arrives.
    fn accept_raw(&self) -> io::Result<(Self::Stream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    fn accept_raw(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.accept()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Explicit close for a connection type.
pub trait Close {
    fn close(&mut self) -> io::Result<()>;
}

impl Close for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// Listener decorator that reports accepted connections to a monitor.
pub struct MonitoredListener<L, M: ConnectionMonitor<IpAddr> + ?Sized> {
    inner: L,
    monitor: Arc<M>,
    registry: Arc<ConnectionRegistry>,
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredListener<TcpListener, M> {
    /// Bind a TCP listener and wrap it.
    pub fn bind<A: ToSocketAddrs>(addr: A, monitor: Arc<M>) -> io::Result<Self> {
        Ok(Self::new(TcpListener::bind(addr)?, monitor))
    }
}

impl<L: Accept, M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredListener<L, M> {
    #[must_use]
    pub fn new(inner: L, monitor: Arc<M>) -> Self {
        Self {
            inner,
            monitor,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Accept one connection and register it with the monitor.
    ///
    /// Errors from the underlying listener are returned unchanged and leave
    /// the monitor untouched.
    pub fn accept(&self) -> io::Result<MonitoredStream<L::Stream, M>> {
        let (stream, peer) = self.inner.accept_raw()?;
        let registration = Registration::open(&self.registry, &self.monitor, peer.ip());
        trace!(peer = %peer, "Accepted monitored connection");
        Ok(MonitoredStream {
            inner: stream,
            peer,
            registration,
        })
    }

    /// Iterator over accepted connections, like [`TcpListener::incoming`].
    pub fn incoming(&self) -> impl Iterator<Item = io::Result<MonitoredStream<L::Stream, M>>> + '_ {
        std::iter::repeat_with(move || self.accept())
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Connections accepted by this listener and not yet released.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.registry.len()
    }

    /// Hosts of the currently open connections, one per connection.
    #[must_use]
    pub fn open_hosts(&self) -> Vec<IpAddr> {
        self.registry.hosts()
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<M> {
        &self.monitor
    }

    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

/// Accepted connection bound to a monitor registration.
pub struct MonitoredStream<S, M: ConnectionMonitor<IpAddr> + ?Sized> {
    // Declared before `registration` so the socket drops first.
    inner: S,
    peer: SocketAddr,
    registration: Registration<M>,
}

impl<S, M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredStream<S, M> {
    /// Monitoring key this connection was registered under.
    #[must_use]
    pub fn peer_host(&self) -> IpAddr {
        self.registration.host()
    }

    /// Peer address as reported at accept time.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.registration.is_released()
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Close, M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredStream<S, M> {
    /// Close the connection, then release it from the monitor.
    ///
    /// The release happens once even if the close fails or is repeated.
    pub fn close(&mut self) -> io::Result<()> {
        let result = if self.registration.is_released() {
            Ok(())
        } else {
            self.inner.close()
        };
        self.registration.release();
        result
    }
}

impl<S: Read, M: ConnectionMonitor<IpAddr> + ?Sized> Read for MonitoredStream<S, M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write, M: ConnectionMonitor<IpAddr> + ?Sized> Write for MonitoredStream<S, M> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::monitor::{MonitorEvent, RecordingMonitor};
    use std::cell::Cell;
    use std::net::Ipv4Addr;

    const PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)), 4000);

    /// Listener that fails a fixed number of times before succeeding.
    struct FlakyListener {
        failures: Cell<u32>,
    }

    struct FakeStream {
        closes: u32,
        fail_close: bool,
    }

    impl Accept for FlakyListener {
        type Stream = FakeStream;

        fn accept_raw(&self) -> io::Result<(FakeStream, SocketAddr)> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "aborted"));
            }
            Ok((
                FakeStream {
                    closes: 0,
                    fail_close: false,
                },
                PEER,
            ))
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok(PEER)
        }
    }

    impl Close for FakeStream {
        fn close(&mut self) -> io::Result<()> {
            self.closes += 1;
            if self.fail_close {
                Err(io::Error::other("close failed"))
            } else {
                Ok(())
            }
        }
    }

    fn listener(failures: u32) -> (MonitoredListener<FlakyListener, RecordingMonitor>, Arc<RecordingMonitor>) {
        let monitor = Arc::new(RecordingMonitor::new());
        let listener = MonitoredListener::new(
            FlakyListener {
                failures: Cell::new(failures),
            },
            Arc::clone(&monitor),
        );
        (listener, monitor)
    }

    #[test]
    fn failed_accept_propagates_without_notification() {
        let (listener, monitor) = listener(1);

        let err = listener.accept().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(monitor.events().is_empty());
        assert_eq!(listener.open_connections(), 0);

        assert!(listener.accept().is_ok());
    }

    #[test]
    fn accept_notifies_with_peer_ip() {
        let (listener, monitor) = listener(0);

        let stream = listener.accept().unwrap();
        assert_eq!(stream.peer_host(), PEER.ip());
        assert_eq!(stream.peer_addr(), PEER);
        assert_eq!(monitor.events(), vec![MonitorEvent::Connected(PEER.ip())]);
        assert_eq!(listener.open_hosts(), vec![PEER.ip()]);
    }

    #[test]
    fn repeated_close_releases_once() {
        let (listener, monitor) = listener(0);

        let mut stream = listener.accept().unwrap();
        stream.close().unwrap();
        stream.close().unwrap();
        assert_eq!(stream.get_ref().closes, 1);
        drop(stream);

        assert_eq!(monitor.released_count(PEER.ip()), 1);
        assert_eq!(listener.open_connections(), 0);
    }

    #[test]
    fn failed_close_still_releases() {
        let (listener, monitor) = listener(0);

        let mut stream = listener.accept().unwrap();
        stream.get_mut().fail_close = true;
        assert!(stream.close().is_err());
        assert!(stream.is_released());
        assert_eq!(monitor.released_count(PEER.ip()), 1);
    }

    #[test]
    fn drop_without_close_releases() {
        let (listener, monitor) = listener(0);

        let first = listener.accept().unwrap();
        let second = listener.accept().unwrap();
        assert_eq!(listener.open_connections(), 2);

        drop(first);
        assert_eq!(listener.open_connections(), 1);
        drop(second);

        assert_eq!(monitor.connected_count(PEER.ip()), 2);
        assert_eq!(monitor.released_count(PEER.ip()), 2);
    }
}
