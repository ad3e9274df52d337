/// The table of admitted peers, keyed by identity key.
///
/// A record exists only after a successful round-2 confirmation; the
/// handshake keeps no partially-admitted state here. Reads run
/// concurrently, mutations take the write lock for their whole duration.
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use damnet_common::protocol::CHALLENGE_LEN;
use damnet_common::{PortMapping, Timestamp};

use crate::crypto::random_ascii;
use crate::identity::PublicKey;

/// An admitted remote node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    /// The identity key, derived from the peer's address at admission
    pub public_key: PublicKey,

    /// Ports the peer forwards through its hidden service
    pub portmap: Vec<PortMapping>,

    /// Last challenge value exchanged; kept for rotation, no longer secret
    pub nonce: String,

    /// Token the peer presents to update or withdraw its own record
    pub self_revoke: String,

    /// Token this node holds to flag the record as revoked
    pub peer_revoke: String,

    /// Completion time of the last successful handshake; never decreases
    pub last_seen: Timestamp,

    /// Ordered trust, 0 = untrusted; changed only administratively
    pub trust_level: i32,
}

/// Concurrency-safe store of admitted peers
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: RwLock<HashMap<PublicKey, Peer>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup(&self, key: &PublicKey) -> Option<Peer> {
        self.peers.read().await.get(key).cloned()
    }

    /// Insert or refresh the record for `key` after a confirmed handshake.
    ///
    /// A new record starts at trust 0 with a directory-side revoke token.
    /// A refresh updates portmap, nonce and `last_seen` in place and
    /// preserves trust and both revoke tokens.
    pub async fn admit(
        &self,
        key: PublicKey,
        portmap: Vec<PortMapping>,
        nonce: String,
        self_revoke: Option<String>,
    ) -> Peer {
        let mut peers = self.peers.write().await;
        let now = Timestamp::now();

        let peer = peers
            .entry(key)
            .and_modify(|peer| {
                peer.portmap = portmap.clone();
                peer.nonce = nonce.clone();
                peer.last_seen = peer.last_seen.max(now);
            })
            .or_insert_with(|| Peer {
                public_key: key,
                portmap,
                nonce,
                self_revoke: self_revoke
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| random_ascii(CHALLENGE_LEN)),
                peer_revoke: random_ascii(CHALLENGE_LEN),
                last_seen: now,
                trust_level: 0,
            });

        peer.clone()
    }

    /// Remove the record iff the presented token matches its self-revoke
    pub async fn revoke(
        &self,
        key: &PublicKey,
        presented: &str,
    ) -> Result<(), PeerTableError> {
        let mut peers = self.peers.write().await;

        let peer = peers.get(key).ok_or(PeerTableError::UnknownPeer)?;
        if peer.self_revoke != presented {
            return Err(PeerTableError::RevokeKeyMismatch);
        }

        peers.remove(key);
        Ok(())
    }

    /// Rotate the self-revoke token, gated on the current one
    pub async fn rotate_self_revoke(
        &self,
        key: &PublicKey,
        presented: &str,
        replacement: String,
    ) -> Result<(), PeerTableError> {
        let mut peers = self.peers.write().await;

        let peer = peers.get_mut(key).ok_or(PeerTableError::UnknownPeer)?;
        if peer.self_revoke != presented {
            return Err(PeerTableError::RevokeKeyMismatch);
        }

        peer.self_revoke = replacement;
        Ok(())
    }

    /// Administrative trust promotion; the protocol itself never calls this
    pub async fn set_trust(&self, key: &PublicKey, level: i32) -> Result<(), PeerTableError> {
        let mut peers = self.peers.write().await;
        let peer = peers.get_mut(key).ok_or(PeerTableError::UnknownPeer)?;
        peer.trust_level = level;
        Ok(())
    }

    /// Remove records not refreshed within `max_age`. Returns the count.
    pub async fn prune(&self, max_age: Duration) -> usize {
        let mut peers = self.peers.write().await;
        let before = peers.len();
        peers.retain(|_, peer| peer.last_seen.elapsed() <= max_age);
        before - peers.len()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Snapshot of all records, for diagnostics
    pub async fn snapshot(&self) -> Vec<Peer> {
        self.peers.read().await.values().cloned().collect()
    }
}

/// Peer table errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PeerTableError {
    #[error("no peer record for this identity")]
    UnknownPeer,

    #[error("presented revoke key does not match")]
    RevokeKeyMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KeyPair;

    fn key() -> PublicKey {
        KeyPair::generate().public_key()
    }

    #[tokio::test]
    async fn admit_creates_untrusted_record() {
        let table = PeerTable::new();
        let key = key();
        let start = Timestamp::now();

        let peer = table
            .admit(key, vec![PortMapping::new(80, 8080)], "nonce".into(), None)
            .await;

        assert_eq!(peer.trust_level, 0);
        assert!(peer.last_seen >= start);
        assert!(!peer.peer_revoke.is_empty());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn readmit_refreshes_without_duplicating() {
        let table = PeerTable::new();
        let key = key();

        let first = table
            .admit(key, vec![PortMapping::new(80, 8080)], "n1".into(), None)
            .await;
        table.set_trust(&key, 3).await.unwrap();

        let second = table
            .admit(key, vec![PortMapping::new(443, 8443)], "n2".into(), None)
            .await;

        assert_eq!(table.len().await, 1);
        assert_eq!(second.portmap, vec![PortMapping::new(443, 8443)]);
        assert_eq!(second.nonce, "n2");
        assert!(second.last_seen >= first.last_seen);
        // Trust and revoke tokens survive the refresh
        assert_eq!(second.trust_level, 3);
        assert_eq!(second.self_revoke, first.self_revoke);
        assert_eq!(second.peer_revoke, first.peer_revoke);
    }

    #[tokio::test]
    async fn admit_honors_presented_self_revoke() {
        let table = PeerTable::new();
        let key = key();

        let peer = table
            .admit(key, vec![], "n".into(), Some("my-token".into()))
            .await;
        assert_eq!(peer.self_revoke, "my-token");
    }

    #[tokio::test]
    async fn revoke_requires_exact_token() {
        let table = PeerTable::new();
        let key = key();

        let peer = table.admit(key, vec![], "n".into(), None).await;

        let err = table.revoke(&key, "wrong").await.unwrap_err();
        assert_eq!(err, PeerTableError::RevokeKeyMismatch);
        assert_eq!(table.len().await, 1);

        table.revoke(&key, &peer.self_revoke).await.unwrap();
        assert!(table.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn revoke_unknown_peer_fails() {
        let table = PeerTable::new();
        let err = table.revoke(&key(), "anything").await.unwrap_err();
        assert_eq!(err, PeerTableError::UnknownPeer);
    }

    #[tokio::test]
    async fn rotate_self_revoke_gated_on_current() {
        let table = PeerTable::new();
        let key = key();

        let peer = table.admit(key, vec![], "n".into(), None).await;

        let err = table
            .rotate_self_revoke(&key, "wrong", "new".into())
            .await
            .unwrap_err();
        assert_eq!(err, PeerTableError::RevokeKeyMismatch);

        table
            .rotate_self_revoke(&key, &peer.self_revoke, "new".into())
            .await
            .unwrap();
        assert_eq!(table.lookup(&key).await.unwrap().self_revoke, "new");
    }

    #[tokio::test]
    async fn prune_drops_stale_records() {
        let table = PeerTable::new();
        table.admit(key(), vec![], "n".into(), None).await;
        table.admit(key(), vec![], "n".into(), None).await;

        // Nothing is older than an hour yet
        assert_eq!(table.prune(Duration::from_secs(3600)).await, 0);
        assert_eq!(table.len().await, 2);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(table.prune(Duration::from_secs(0)).await, 2);
        assert!(table.is_empty().await);
    }
}
