//! Open-connection bookkeeping shared by a listener and its streams.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::port::ConnectionMonitor;

/// Maps connection ids to the remote host they were accepted from.
///
/// The release path resolves the host through this map instead of asking
/// the socket, which may no longer report a peer address once closed.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    next_id: AtomicU64,
    open: DashMap<u64, IpAddr>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn register(&self, host: IpAddr) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.open.insert(id, host);
        id
    }

    /// Remove `id`, returning its host the first time only.
    fn unregister(&self, id: u64) -> Option<IpAddr> {
        self.open.remove(&id).map(|(_, host)| host)
    }

    pub(crate) fn len(&self) -> usize {
        self.open.len()
    }

    pub(crate) fn hosts(&self) -> Vec<IpAddr> {
        self.open.iter().map(|entry| *entry.value()).collect()
    }
}

/// One accepted connection's registration with a monitor.
///
/// Created in the `CONNECTED` state; [`release`](Self::release) moves it to
/// `RELEASED` exactly once. Dropping an unreleased registration releases it.
pub(crate) struct Registration<M: ConnectionMonitor<IpAddr> + ?Sized> {
    id: u64,
    host: IpAddr,
    released: AtomicBool,
    registry: Arc<ConnectionRegistry>,
    monitor: Arc<M>,
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> Registration<M> {
    pub(crate) fn open(registry: &Arc<ConnectionRegistry>, monitor: &Arc<M>, host: IpAddr) -> Self {
        let id = registry.register(host);
        monitor.connected(&host);
        Self {
            id,
            host,
            released: AtomicBool::new(false),
            registry: Arc::clone(registry),
            monitor: Arc::clone(monitor),
        }
    }

    pub(crate) fn host(&self) -> IpAddr {
        self.host
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(host) = self.registry.unregister(self.id) {
            self.monitor.released(&host);
        }
    }
}

impl<M: ConnectionMonitor<IpAddr> + ?Sized> Drop for Registration<M> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::monitor::{MonitorEvent, RecordingMonitor};
    use std::net::Ipv4Addr;

    const HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 9));

    #[test]
    fn open_registers_and_notifies() {
        let registry = Arc::new(ConnectionRegistry::new());
        let monitor = Arc::new(RecordingMonitor::new());

        let registration = Registration::open(&registry, &monitor, HOST);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.hosts(), vec![HOST]);
        assert_eq!(registration.host(), HOST);
        assert_eq!(monitor.events(), vec![MonitorEvent::Connected(HOST)]);
    }

    #[test]
    fn release_notifies_once() {
        let registry = Arc::new(ConnectionRegistry::new());
        let monitor = Arc::new(RecordingMonitor::new());

        let registration = Registration::open(&registry, &monitor, HOST);
        registration.release();
        registration.release();
        drop(registration);

        assert_eq!(registry.len(), 0);
        assert_eq!(
            monitor.events(),
            vec![MonitorEvent::Connected(HOST), MonitorEvent::Released(HOST)]
        );
    }

    #[test]
    fn drop_releases_unreleased_registration() {
        let registry = Arc::new(ConnectionRegistry::new());
        let monitor = Arc::new(RecordingMonitor::new());

        let registration = Registration::open(&registry, &monitor, HOST);
        assert!(!registration.is_released());
        drop(registration);

        assert_eq!(monitor.released_count(HOST), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn ids_are_unique_per_registry() {
        let registry = Arc::new(ConnectionRegistry::new());
        let monitor = Arc::new(RecordingMonitor::new());

        let first = Registration::open(&registry, &monitor, HOST);
        let second = Registration::open(&registry, &monitor, HOST);
        assert_eq!(registry.len(), 2);

        first.release();
        assert_eq!(registry.len(), 1);
        drop(second);
        assert_eq!(monitor.released_count(HOST), 2);
    }
}
