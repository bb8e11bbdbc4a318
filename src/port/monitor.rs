//! Connection lifecycle port consumed by transport wrappers.

use std::sync::Arc;

/// Receives connection lifecycle notifications for a traffic key.
///
/// Transport wrappers call [`connected`](Self::connected) once per accepted
/// connection and [`released`](Self::released) once when it closes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; notifications arrive from accept
/// loops and from whichever thread closes a connection.
pub trait ConnectionMonitor<K>: Send + Sync {
    /// A connection for `key` was opened.
    fn connected(&self, key: &K);

    /// A connection for `key` was closed.
    ///
    /// May arrive without a matching `connected` and must not fail.
    fn released(&self, key: &K);
}

impl<K, M> ConnectionMonitor<K> for Arc<M>
where
    M: ConnectionMonitor<K> + ?Sized,
{
    fn connected(&self, key: &K) {
        (**self).connected(key);
    }

    fn released(&self, key: &K) {
        (**self).released(key);
    }
}
