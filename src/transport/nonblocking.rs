//! Monitored wrappers for tokio TCP listeners.
//!
//! Same lifecycle as [`blocking`](super::blocking): accept registers the
//! peer's IP, [`MonitoredTcpStream::close`] or drop releases it once.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::trace;

use crate::port::ConnectionMonitor;

use super::registry::{ConnectionRegistry, Registration};

/// Async listener decorator that reports accepted connections to a monitor.
pub struct MonitoredTcpListener<M: ConnectionMonitor<IpAddr> + ?Sized> {
    inner: TcpListener,
    monitor: Arc<M>,
    registry: Arc<ConnectionRegistry>,
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredTcpListener<M> {
    pub async fn bind<A: ToSocketAddrs>(addr: A, monitor: Arc<M>) -> io::Result<Self> {
        Ok(Self::from_listener(TcpListener::bind(addr).await?, monitor))
    }

    #[must_use]
    pub fn from_listener(inner: TcpListener, monitor: Arc<M>) -> Self {
        Self {
            inner,
            monitor,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Wait for one connection and register it with the monitor.
    ///
    /// Errors from the underlying listener are returned unchanged and leave
    /// the monitor untouched. Cancel-safe: a dropped future registers
    /// nothing.
    pub async fn accept(&self) -> io::Result<MonitoredTcpStream<M>> {
        let (stream, peer) = self.inner.accept().await?;
        let registration = Registration::open(&self.registry, &self.monitor, peer.ip());
        trace!(peer = %peer, "Accepted monitored connection");
        Ok(MonitoredTcpStream {
            inner: stream,
            peer,
            registration,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn open_hosts(&self) -> Vec<IpAddr> {
        self.registry.hosts()
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<M> {
        &self.monitor
    }

    pub fn get_ref(&self) -> &TcpListener {
        &self.inner
    }
}

/// Accepted tokio connection bound to a monitor registration.
pub struct MonitoredTcpStream<M: ConnectionMonitor<IpAddr> + ?Sized> {
    inner: TcpStream,
    peer: SocketAddr,
    registration: Registration<M>,
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> MonitoredTcpStream<M> {
    #[must_use]
    pub fn peer_host(&self) -> IpAddr {
        self.registration.host()
    }

    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.registration.is_released()
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut TcpStream {
        &mut self.inner
    }

    /// Shut down the write half, then release from the monitor.
    ///
    /// Later calls are no-ops.
    pub async fn close(&mut self) -> io::Result<()> {
        if self.registration.is_released() {
            return Ok(());
        }
        let result = match self.inner.shutdown().await {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        };
        self.registration.release();
        result
    }
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> AsyncRead for MonitoredTcpStream<M> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> AsyncWrite for MonitoredTcpStream<M> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
