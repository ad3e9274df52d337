/// Server-side announce state machine.
///
/// A request moves through validation, identity-proof checks and the
/// challenge store; a peer record appears only after the round-2
/// confirmation passes every gate. All failures come back as structured
/// responses — nothing in here is fatal to the process.
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use damnet_common::protocol;
use damnet_common::PortMapping;

use crate::announce::{validate, AnnounceRequest, AnnounceResponse, ChallengeStore, PeerTable};
use crate::crypto;
use crate::identity::{OnionAddress, PublicKey};

/// Resolves a claimed address to its identity key.
///
/// The default resolver answers from the key embedded in the address. A
/// transport-backed implementation may need a network round trip to fetch
/// descriptor data and can fail with `Unavailable`; that maps to the
/// server-error class and is retryable from the initiator's side.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, address: &OnionAddress) -> Result<PublicKey, ResolveError>;
}

/// Resolution failure: the network cannot produce the descriptor right now
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("identity resolution unavailable: {0}")]
    Unavailable(String),
}

/// Answers directly from the self-certifying address, no network
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalResolver;

#[async_trait]
impl IdentityResolver for LocalResolver {
    async fn resolve(&self, address: &OnionAddress) -> Result<PublicKey, ResolveError> {
        Ok(address.public_key())
    }
}

/// Handles inbound announce requests for the directory role of a node
pub struct AnnounceResponder {
    peers: Arc<PeerTable>,
    challenges: Arc<ChallengeStore>,
    resolver: Arc<dyn IdentityResolver>,
}

impl AnnounceResponder {
    pub fn new(
        peers: Arc<PeerTable>,
        challenges: Arc<ChallengeStore>,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            peers,
            challenges,
            resolver,
        }
    }

    pub fn with_local_resolver(peers: Arc<PeerTable>, challenges: Arc<ChallengeStore>) -> Self {
        Self::new(peers, challenges, Arc::new(LocalResolver))
    }

    /// Drive one request through the handshake. Round 1 has an empty
    /// `secret`; round 2 carries the decrypted challenge back.
    pub async fn handle(&self, request: &AnnounceRequest) -> AnnounceResponse {
        let valid = match validate(request) {
            Ok(valid) => valid,
            Err(err) => {
                debug!(address = %request.address, %err, "rejecting invalid announce");
                return AnnounceResponse::client_error(err.to_string());
            }
        };

        let key = match self.resolver.resolve(&valid.address).await {
            Ok(key) => key,
            Err(err) => {
                debug!(address = %valid.address, %err, "identity resolution failed");
                return AnnounceResponse::server_error(protocol::RESOLVE_FAILURE_MESSAGE);
            }
        };

        if request.is_confirmation() {
            self.confirm(request, &valid.address, key, &valid.signature, valid.portmap)
                .await
        } else {
            self.challenge(request, &valid.address, key, &valid.signature)
                .await
        }
    }

    /// Round 1: prove liveness, receive a sealed challenge
    async fn challenge(
        &self,
        request: &AnnounceRequest,
        address: &OnionAddress,
        key: PublicKey,
        signature: &[u8; 64],
    ) -> AnnounceResponse {
        // The proof message is a protocol constant; an attacker-chosen
        // message signed with the peer's own key proves nothing extra.
        if request.message != protocol::PROOF_MESSAGE {
            return AnnounceResponse::client_error("Invalid message.");
        }

        if !key.verify(request.message.as_bytes(), signature) {
            return AnnounceResponse::client_error("Invalid signature.");
        }

        let plaintext = self.challenges.issue(&address.to_string()).await;
        let sealed = match crypto::seal(plaintext.as_bytes(), &key) {
            Ok(sealed) => sealed,
            Err(err) => {
                debug!(address = %address, %err, "challenge sealing failed");
                return AnnounceResponse::server_error("Encryption failed.");
            }
        };

        debug!(address = %address, "issued challenge");
        AnnounceResponse::success(data_encoding::BASE64.encode(&sealed))
    }

    /// Round 2: consume the challenge, admit the peer
    async fn confirm(
        &self,
        request: &AnnounceRequest,
        address: &OnionAddress,
        key: PublicKey,
        signature: &[u8; 64],
        portmap: Vec<PortMapping>,
    ) -> AnnounceResponse {
        if request.message != request.secret {
            return AnnounceResponse::client_error("Invalid message.");
        }

        if !key.verify(request.message.as_bytes(), signature) {
            return AnnounceResponse::client_error("Invalid signature.");
        }

        let decoded = match data_encoding::BASE64.decode(request.secret.as_bytes()) {
            Ok(decoded) => decoded,
            Err(_) => return AnnounceResponse::client_error("Invalid secret."),
        };
        let presented = match String::from_utf8(decoded) {
            Ok(presented) if presented.len() == protocol::CHALLENGE_LEN => presented,
            _ => return AnnounceResponse::client_error("Invalid secret."),
        };

        if let Err(err) = self
            .challenges
            .consume(&address.to_string(), &presented)
            .await
        {
            debug!(address = %address, %err, "confirmation rejected");
            return AnnounceResponse::client_error(err.to_string());
        }

        self.peers
            .admit(key, portmap, presented, request.revoke.clone())
            .await;

        debug!(address = %address, "peer admitted");
        AnnounceResponse::success(protocol::WELCOME_MESSAGE)
    }
}
