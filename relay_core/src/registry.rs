//! Shared registry of accepted connections.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};

use crate::error::RegistryError;
use crate::protocol::{Frame, PeerInfo};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one accepted connection.
///
/// Addresses are not unique on their own: a peer reconnecting from the same
/// address can overlap with the teardown of its previous connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a connection's outbound side.
///
/// Frames pushed into `outbox` are written to the socket, in order, by the
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    outbox: mpsc::Sender<Frame>,
}

impl Connection {
    pub fn new(id: ConnectionId, addr: SocketAddr, outbox: mpsc::Sender<Frame>) -> Self {
        Self { id, addr, outbox }
    }

    /// Queue a frame for this connection. Fails once the writer has shut down.
    pub async fn send(&self, frame: Frame) -> Result<(), mpsc::error::SendError<Frame>> {
        self.outbox.send(frame).await
    }

    /// Queue a frame without waiting. Fails when the outbox is full or the
    /// writer has shut down.
    pub fn try_send(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.outbox.try_send(frame)
    }

    /// Resolves once the writer has shut down
    pub async fn closed(&self) {
        self.outbox.closed().await
    }
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    members: Mutex<BTreeMap<ConnectionId, Connection>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, conn: Connection) -> Result<(), RegistryError> {
        let mut members = self.members.lock().await;
        if members.contains_key(&conn.id) {
            return Err(RegistryError::DuplicateConnection(conn.id));
        }
        members.insert(conn.id, conn);
        Ok(())
    }

    /// Remove a connection. Returns false if it was not registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.members.lock().await.remove(&id).is_some()
    }

    /// Point-in-time copy of the members, safe to iterate while sending
    pub async fn snapshot(&self) -> Vec<Connection> {
        self.members.lock().await.values().cloned().collect()
    }

    pub async fn peer_list(&self) -> Vec<PeerInfo> {
        self.snapshot()
            .await
            .into_iter()
            .map(|conn| PeerInfo {
                ip: conn.addr.ip().to_string(),
                port: conn.addr.port(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn connection(port: u16) -> (Connection, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        (Connection::new(ConnectionId::next(), addr, tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_peer_list() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = connection(4001);
        let (b, _rx_b) = connection(4002);
        registry.register(a).await.unwrap();
        registry.register(b).await.unwrap();

        let peers = registry.peer_list().await;
        assert_eq!(
            peers,
            vec![
                PeerInfo {
                    ip: "127.0.0.1".to_string(),
                    port: 4001
                },
                PeerInfo {
                    ip: "127.0.0.1".to_string(),
                    port: 4002
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ClientRegistry::new();
        let (a, _rx) = connection(4001);
        registry.register(a.clone()).await.unwrap();

        let err = registry.register(a.clone()).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateConnection(id) if id == a.id));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_address_distinct_connections() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = connection(4001);
        let (b, _rx_b) = connection(4001);
        registry.register(a.clone()).await.unwrap();
        registry.register(b).await.unwrap();
        assert_eq!(registry.len().await, 2);

        // Removing the stale connection leaves the reconnected one in place
        assert!(registry.unregister(a.id).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = connection(4001);
        let (b, _rx_b) = connection(4002);
        registry.register(a.clone()).await.unwrap();

        assert!(!registry.unregister(b.id).await);
        assert!(registry.unregister(a.id).await);
        assert!(!registry.unregister(a.id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = connection(4001);
        registry.register(a.clone()).await.unwrap();

        let snapshot = registry.snapshot().await;
        registry.unregister(a.id).await;
        let (b, _rx_b) = connection(4002);
        registry.register(b).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, a.id);
    }

    #[tokio::test]
    async fn test_concurrent_churn_keeps_entries_consistent() {
        let registry = Arc::new(ClientRegistry::new());
        let mut handles = vec![];

        // Even-numbered connections stay, odd ones leave again
        for i in 0..64u16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (conn, rx) = connection(5000 + i);
                let id = conn.id;
                registry.register(conn).await.unwrap();
                if i % 2 == 1 {
                    assert!(registry.unregister(id).await);
                }
                (id, i % 2 == 0, rx)
            }));
        }

        let mut expected = HashSet::new();
        let mut receivers = vec![];
        for h in handles {
            let (id, stays, rx) = h.await.unwrap();
            if stays {
                expected.insert(id);
            }
            receivers.push(rx);
        }

        let snapshot = registry.snapshot().await;
        let ids: HashSet<_> = snapshot.iter().map(|c| c.id).collect();
        assert_eq!(snapshot.len(), ids.len(), "no duplicated entries");
        assert_eq!(ids, expected, "no lost entries");
    }
}
