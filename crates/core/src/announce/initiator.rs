/// Client-side announce driver.
///
/// Performs both handshake rounds against a remote peer through an
/// injected transport, and fans out over a seed list with one concurrent
/// unit per peer. Individual peer failures are logged and absorbed; only
/// a fan-out where every seed fails is fatal to the caller.
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use damnet_common::protocol;
use damnet_common::{NodeConfig, PortMapping};

use crate::announce::{AnnounceRequest, AnnounceResponse, PeerTable, Status};
use crate::crypto::{self, CryptoError};
use crate::identity::{AddressError, KeyPair, OnionAddress};

/// Carries announce requests to a remote peer.
///
/// The daemon backs this with an HTTP client; tests wire it straight to a
/// responder. The transport owns its own timeout policy — none is applied
/// at this layer.
#[async_trait]
pub trait AnnounceTransport: Send + Sync {
    async fn announce(
        &self,
        peer: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TransportError>;
}

/// Transport-level failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    #[error("invalid response from peer: {0}")]
    BadResponse(String),
}

/// Drives the announce handshake against remote peers
pub struct AnnounceInitiator {
    keypair: KeyPair,
    address: OnionAddress,
    portmap: Vec<PortMapping>,
    peers: Arc<PeerTable>,
    transport: Arc<dyn AnnounceTransport>,
}

impl AnnounceInitiator {
    pub fn new(
        config: &NodeConfig,
        keypair: KeyPair,
        address: OnionAddress,
        peers: Arc<PeerTable>,
        transport: Arc<dyn AnnounceTransport>,
    ) -> Self {
        Self {
            keypair,
            address,
            portmap: config.portmap.clone(),
            peers,
            transport,
        }
    }

    /// Run both rounds against one peer. A server-error reply means the
    /// peer could not resolve our identity right now; that is retryable.
    /// Everything else that goes wrong is terminal for this peer only.
    pub async fn announce(&self, peer: &str) -> Result<(), AnnounceError> {
        let peer_address = OnionAddress::parse(peer)?;

        let init = AnnounceRequest::init(&self.keypair, &self.address);
        let response = self.transport.announce(peer, &init).await?;

        let sealed_b64 = match response.status {
            Status::Success => response.secret,
            Status::ServerError => {
                return Err(AnnounceError::ResolutionUnavailable(response.secret))
            }
            Status::ClientError => return Err(AnnounceError::Rejected(response.secret)),
        };

        let sealed = data_encoding::BASE64
            .decode(sealed_b64.as_bytes())
            .map_err(|_| AnnounceError::BadChallenge("secret is not base64".to_string()))?;
        let plaintext = crypto::open(&sealed, &self.keypair)?;

        if plaintext.len() != protocol::CHALLENGE_LEN {
            return Err(AnnounceError::BadChallenge(format!(
                "challenge is {} bytes, expected {}",
                plaintext.len(),
                protocol::CHALLENGE_LEN
            )));
        }
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| AnnounceError::BadChallenge("challenge is not ASCII".to_string()))?;

        let challenge = data_encoding::BASE64.encode(plaintext.as_bytes());
        let revoke = crypto::random_ascii(protocol::CHALLENGE_LEN);
        let confirm =
            AnnounceRequest::confirm(&self.keypair, &self.address, &challenge, &self.portmap, revoke);

        let response = self.transport.announce(peer, &confirm).await?;
        match response.status {
            Status::Success if response.secret == protocol::WELCOME_MESSAGE => {
                // Remember the peer that welcomed us
                self.peers
                    .admit(peer_address.public_key(), Vec::new(), plaintext, None)
                    .await;
                Ok(())
            }
            _ => Err(AnnounceError::Rejected(response.secret)),
        }
    }

    /// Announce to every seed concurrently and wait for all of them.
    /// Succeeds with the number of confirmed peers; fails only when no
    /// seed confirms us.
    pub async fn announce_all(&self, seeds: &[String]) -> Result<usize, AnnounceError> {
        let results = join_all(seeds.iter().map(|seed| async move {
            (seed.as_str(), self.announce(seed).await)
        }))
        .await;

        let mut confirmed = 0;
        for (seed, result) in results {
            match result {
                Ok(()) => {
                    info!(peer = %seed, "announce confirmed");
                    confirmed += 1;
                }
                Err(err) => {
                    warn!(peer = %seed, %err, "announce failed");
                }
            }
        }

        if confirmed == 0 {
            return Err(AnnounceError::AllSeedsFailed);
        }
        Ok(confirmed)
    }
}

/// Announce failures, per peer except for the fan-out terminal case
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("invalid peer address: {0}")]
    InvalidPeer(#[from] AddressError),

    #[error("peer could not resolve our identity: {0}")]
    ResolutionUnavailable(String),

    #[error("announce rejected: {0}")]
    Rejected(String),

    #[error("malformed challenge payload: {0}")]
    BadChallenge(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no successful announces")]
    AllSeedsFailed,
}
