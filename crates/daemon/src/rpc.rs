/// HTTP client side of the announce protocol.
///
/// Speaks to a remote node's /announce endpoint and translates the HTTP
/// status class back into the protocol status the initiator expects.
use async_trait::async_trait;

use damnet_core::{AnnounceRequest, AnnounceResponse, AnnounceTransport, Status, TransportError};

use crate::api::SecretBody;

/// Announce transport backed by an HTTP client
pub struct HttpAnnounceClient {
    client: reqwest::Client,
}

impl HttpAnnounceClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpAnnounceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnounceTransport for HttpAnnounceClient {
    async fn announce(
        &self,
        peer: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TransportError> {
        let url = format!("http://{}/announce", peer);

        let reply = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = if reply.status().is_success() {
            Status::Success
        } else if reply.status().is_client_error() {
            Status::ClientError
        } else {
            Status::ServerError
        };

        let body: SecretBody = reply
            .json()
            .await
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;

        Ok(AnnounceResponse {
            status,
            secret: body.secret,
        })
    }
}
