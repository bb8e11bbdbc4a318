//! Recording connection monitor.

use std::net::IpAddr;

use parking_lot::Mutex;

use crate::port::ConnectionMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Connected(IpAddr),
    Released(IpAddr),
}

/// Monitor that keeps every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().clone()
    }

    pub fn connected_count(&self, host: IpAddr) -> usize {
        self.count(MonitorEvent::Connected(host))
    }

    pub fn released_count(&self, host: IpAddr) -> usize {
        self.count(MonitorEvent::Released(host))
    }

    fn count(&self, event: MonitorEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }
}

impl ConnectionMonitor<IpAddr> for RecordingMonitor {
    fn connected(&self, key: &IpAddr) {
        self.events.lock().push(MonitorEvent::Connected(*key));
    }

    fn released(&self, key: &IpAddr) {
        self.events.lock().push(MonitorEvent::Released(*key));
    }
}
