/// Syntactic validation of announce requests.
///
/// Validation is pure: it never touches the peer table or the challenge
/// store, and it performs no network access. It yields the parsed address
/// and decoded signature so the responder does not re-parse.
use damnet_common::protocol;
use damnet_common::{PortMapError, PortMapping};

use crate::announce::AnnounceRequest;
use crate::identity::{AddressError, OnionAddress};

/// The validated, decoded parts of an announce request
#[derive(Debug, Clone)]
pub struct ValidRequest {
    pub address: OnionAddress,
    pub signature: [u8; 64],
    pub portmap: Vec<PortMapping>,
}

/// Check request field shapes: nodetype whitelist, address grammar,
/// signature encoding and length, and portmap syntax when present.
pub fn validate(request: &AnnounceRequest) -> Result<ValidRequest, ValidationError> {
    if !protocol::ALLOWED_NODETYPES.contains(&request.nodetype.as_str()) {
        return Err(ValidationError::InvalidNodeType);
    }

    let address = OnionAddress::parse(&request.address)?;

    let sig_bytes = data_encoding::BASE64
        .decode(request.signature.as_bytes())
        .map_err(|_| ValidationError::MalformedSignature)?;
    let signature: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| ValidationError::MalformedSignature)?;

    let portmap = match &request.portmap {
        Some(map) => PortMapping::parse_map(map)?,
        None => Vec::new(),
    };

    Ok(ValidRequest {
        address,
        signature,
        portmap,
    })
}

/// Validation failures, each with the literal reason sent to the client
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", protocol::INVALID_NODETYPE_MESSAGE)]
    InvalidNodeType,

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("malformed signature: expected base64 of 64 bytes")]
    MalformedSignature,

    #[error(transparent)]
    InvalidPortMap(#[from] PortMapError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KeyPair;

    fn valid_request() -> AnnounceRequest {
        let keypair = KeyPair::generate();
        let address = OnionAddress::from_public_key(keypair.public_key(), 49371);
        AnnounceRequest::init(&keypair, &address)
    }

    #[test]
    fn accepts_valid_init_request() {
        let req = valid_request();
        let valid = validate(&req).unwrap();
        assert_eq!(valid.address.to_string(), req.address);
        assert!(valid.portmap.is_empty());
    }

    #[test]
    fn rejects_unknown_nodetype_with_literal() {
        let mut req = valid_request();
        req.nodetype = "foobar".to_string();

        let err = validate(&req).unwrap_err();
        assert_eq!(err, ValidationError::InvalidNodeType);
        assert_eq!(err.to_string(), protocol::INVALID_NODETYPE_MESSAGE);
    }

    #[test]
    fn rejects_malformed_address() {
        let mut req = valid_request();
        req.address = "not-an-onion:80".to_string();

        assert!(matches!(
            validate(&req).unwrap_err(),
            ValidationError::Address(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_bad_signature_encoding() {
        let mut req = valid_request();
        req.signature = "!!not-base64!!".to_string();
        assert_eq!(validate(&req).unwrap_err(), ValidationError::MalformedSignature);

        let mut req = valid_request();
        req.signature = data_encoding::BASE64.encode(&[0u8; 32]);
        assert_eq!(validate(&req).unwrap_err(), ValidationError::MalformedSignature);
    }

    #[test]
    fn rejects_bad_portmap() {
        let mut req = valid_request();
        req.portmap = Some("80:0".to_string());

        assert!(matches!(
            validate(&req).unwrap_err(),
            ValidationError::InvalidPortMap(PortMapError::InvalidPort(_))
        ));
    }

    #[test]
    fn accepts_confirmation_portmap() {
        let mut req = valid_request();
        req.portmap = Some("13010:13010,13011:13011".to_string());

        let valid = validate(&req).unwrap();
        assert_eq!(valid.portmap.len(), 2);
    }

    #[test]
    fn accepts_confirmation_without_forwards() {
        let keypair = KeyPair::generate();
        let address = OnionAddress::from_public_key(keypair.public_key(), 49371);

        // A node advertising no forwards still gets through validation
        let req =
            AnnounceRequest::confirm(&keypair, &address, "Y2hhbGxlbmdl", &[], "r".to_string());
        let valid = validate(&req).unwrap();
        assert!(valid.portmap.is_empty());
    }
}
