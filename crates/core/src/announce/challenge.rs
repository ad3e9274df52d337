/// Pending-challenge bookkeeping for the announce handshake.
///
/// One challenge may be outstanding per address at a time; issuing again
/// overwrites the previous one (last writer wins — only the holder of the
/// matching private key can produce a valid confirmation, so concurrent
/// round-1 requests from one address are a race without a correctness
/// hazard). Challenges are single-use and expire after a fixed TTL.
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use damnet_common::protocol::CHALLENGE_LEN;
use damnet_common::Timestamp;

use crate::crypto::random_ascii;

#[derive(Debug, Clone)]
struct PendingChallenge {
    expected: String,
    issued_at: Timestamp,
}

/// Store of challenges issued in round 1 and consumed in round 2
#[derive(Debug)]
pub struct ChallengeStore {
    ttl: Duration,
    pending: Mutex<HashMap<String, PendingChallenge>>,
}

impl ChallengeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh challenge for `address`, invalidating any prior one.
    /// Returns the plaintext the initiator must echo back decrypted.
    pub async fn issue(&self, address: &str) -> String {
        let secret = random_ascii(CHALLENGE_LEN);

        let mut pending = self.pending.lock().await;
        pending.insert(
            address.to_string(),
            PendingChallenge {
                expected: secret.clone(),
                issued_at: Timestamp::now(),
            },
        );

        secret
    }

    /// Consume the pending challenge for `address`. The entry is removed
    /// whether the presented value matches or not; a failed confirmation
    /// must restart from round 1.
    pub async fn consume(&self, address: &str, presented: &str) -> Result<(), ChallengeError> {
        let mut pending = self.pending.lock().await;

        let challenge = pending
            .remove(address)
            .ok_or(ChallengeError::NotFound)?;

        if challenge.issued_at.elapsed() > self.ttl {
            return Err(ChallengeError::NotFound);
        }

        if challenge.expected != presented {
            return Err(ChallengeError::Mismatch);
        }

        Ok(())
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        let ttl = self.ttl;
        pending.retain(|_, c| c.issued_at.elapsed() <= ttl);
        before - pending.len()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Challenge consumption failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("no pending challenge for this address")]
    NotFound,

    #[error("challenge value does not match")]
    Mismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChallengeStore {
        ChallengeStore::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn issue_then_consume_succeeds_once() {
        let store = store();
        let secret = store.issue("peer.onion:49371").await;
        assert_eq!(secret.len(), CHALLENGE_LEN);

        store.consume("peer.onion:49371", &secret).await.unwrap();

        // Single use: the same value cannot be consumed again
        let err = store.consume("peer.onion:49371", &secret).await.unwrap_err();
        assert_eq!(err, ChallengeError::NotFound);
    }

    #[tokio::test]
    async fn mismatch_burns_the_challenge() {
        let store = store();
        let secret = store.issue("peer.onion:49371").await;

        let err = store.consume("peer.onion:49371", "wrong").await.unwrap_err();
        assert_eq!(err, ChallengeError::Mismatch);

        // The failed attempt removed the entry; the real value is now gone
        let err = store.consume("peer.onion:49371", &secret).await.unwrap_err();
        assert_eq!(err, ChallengeError::NotFound);
    }

    #[tokio::test]
    async fn unknown_address_is_not_found() {
        let store = store();
        let err = store.consume("other.onion:80", "anything").await.unwrap_err();
        assert_eq!(err, ChallengeError::NotFound);
    }

    #[tokio::test]
    async fn reissue_overwrites_previous_challenge() {
        let store = store();
        let first = store.issue("peer.onion:49371").await;
        let second = store.issue("peer.onion:49371").await;
        assert_ne!(first, second);
        assert_eq!(store.len().await, 1);

        let err = store.consume("peer.onion:49371", &first).await.unwrap_err();
        assert_eq!(err, ChallengeError::Mismatch);
    }

    #[tokio::test]
    async fn expired_challenge_is_treated_as_absent() {
        let store = ChallengeStore::new(Duration::from_secs(0));
        let secret = store.issue("peer.onion:49371").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let err = store.consume("peer.onion:49371", &secret).await.unwrap_err();
        assert_eq!(err, ChallengeError::NotFound);
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let store = ChallengeStore::new(Duration::from_secs(0));
        store.issue("a.onion:1").await;
        store.issue("b.onion:2").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.sweep().await, 2);
        assert_eq!(store.len().await, 0);
    }
}
