use serde::{Deserialize, Serialize};

use damnet_common::protocol;
use damnet_common::PortMapping;

use crate::identity::{KeyPair, OnionAddress};

/// The announce request, exchanged in both directions of the handshake.
///
/// `signature` is base64 over `message`. In round 1 `secret` is empty and
/// `message` is the fixed proof-of-life string; in round 2 both carry the
/// base64 form of the decrypted challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub nodetype: String,
    pub address: String,
    pub message: String,
    pub signature: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portmap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke: Option<String>,
}

impl AnnounceRequest {
    /// Build the round-1 request: the proof literal signed with our key
    pub fn init(keypair: &KeyPair, address: &OnionAddress) -> Self {
        let message = protocol::PROOF_MESSAGE.to_string();
        let signature = data_encoding::BASE64.encode(&keypair.sign(message.as_bytes()));

        Self {
            nodetype: "node".to_string(),
            address: address.to_string(),
            message,
            signature,
            secret: String::new(),
            portmap: None,
            revoke: None,
        }
    }

    /// Build the round-2 confirmation carrying the decrypted challenge
    pub fn confirm(
        keypair: &KeyPair,
        address: &OnionAddress,
        challenge: &str,
        portmap: &[PortMapping],
        revoke: String,
    ) -> Self {
        let signature = data_encoding::BASE64.encode(&keypair.sign(challenge.as_bytes()));

        Self {
            nodetype: "node".to_string(),
            address: address.to_string(),
            message: challenge.to_string(),
            signature,
            secret: challenge.to_string(),
            portmap: (!portmap.is_empty()).then(|| PortMapping::format_map(portmap)),
            revoke: Some(revoke),
        }
    }

    pub fn is_confirmation(&self) -> bool {
        !self.secret.is_empty()
    }
}

/// HTTP-equivalent status class of an announce response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    ClientError,
    ServerError,
}

/// The announce response: a status class and the `secret` payload.
///
/// On round-1 success `secret` holds the sealed challenge (base64); on
/// round-2 success the welcome literal; on failure a literal reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceResponse {
    pub status: Status,
    pub secret: String,
}

impl AnnounceResponse {
    pub fn success(secret: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            secret: secret.into(),
        }
    }

    pub fn client_error(reason: impl Into<String>) -> Self {
        Self {
            status: Status::ClientError,
            secret: reason.into(),
        }
    }

    pub fn server_error(reason: impl Into<String>) -> Self {
        Self {
            status: Status::ServerError,
            secret: reason.into(),
        }
    }
}
