/// Self-certifying onion service addresses.
///
/// An address is `<56 base32 chars>.onion:<port>` where the base32 body
/// decodes to `pubkey(32) || checksum(2) || version(1)`. The embedded
/// ed25519 key is the peer's identity; the checksum binds the body to the
/// key bytes, so parsing an address yields a trust-anchored public key
/// without any PKI. This codec is the only source of a peer's key — the
/// announce protocol never accepts a caller-supplied key.
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

use crate::identity::PublicKey;

/// Length of the base32 body of a v3 onion hostname
const BODY_LEN: usize = 56;

/// Decoded body: key + checksum + version
const RAW_LEN: usize = 35;

/// Onion address version byte
const VERSION: u8 = 0x03;

/// Domain separator fed into the checksum hash
const CHECKSUM_PREFIX: &[u8] = b".onion checksum";

/// A parsed onion address: identity key plus announce port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OnionAddress {
    key: PublicKey,
    port: u16,
}

impl OnionAddress {
    /// Build the address embedding the given identity key
    pub fn from_public_key(key: PublicKey, port: u16) -> Self {
        Self { key, port }
    }

    /// Parse and validate an address string. Purely local, no network.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::Malformed("missing port".to_string()))?;

        let port: u16 = port
            .parse()
            .map_err(|_| AddressError::Malformed(format!("invalid port {port:?}")))?;
        if port == 0 {
            return Err(AddressError::Malformed("port must be nonzero".to_string()));
        }

        let host = host.to_lowercase();
        let body = host
            .strip_suffix(".onion")
            .ok_or_else(|| AddressError::Malformed("missing .onion label".to_string()))?;

        if body.len() != BODY_LEN {
            return Err(AddressError::Malformed(format!(
                "hostname body is {} chars, expected {}",
                body.len(),
                BODY_LEN
            )));
        }

        let raw = data_encoding::BASE32_NOPAD
            .decode(body.to_uppercase().as_bytes())
            .map_err(|_| AddressError::Malformed("invalid base32 body".to_string()))?;

        if raw.len() != RAW_LEN {
            return Err(AddressError::Malformed(format!(
                "decoded body is {} bytes, expected {}",
                raw.len(),
                RAW_LEN
            )));
        }

        if raw[34] != VERSION {
            return Err(AddressError::Malformed(format!(
                "unsupported address version {}",
                raw[34]
            )));
        }

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&raw[..32]);

        if raw[32..34] != checksum(&key_bytes) {
            return Err(AddressError::ChecksumMismatch);
        }

        let key = PublicKey::from_bytes(&key_bytes).map_err(|_| {
            AddressError::Malformed("embedded key is not a valid ed25519 point".to_string())
        })?;

        Ok(Self { key, port })
    }

    /// The identity key embedded in the address
    pub fn public_key(&self) -> PublicKey {
        self.key
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The hostname without the port
    pub fn host(&self) -> String {
        let key_bytes = self.key.as_bytes();
        let mut raw = [0u8; RAW_LEN];
        raw[..32].copy_from_slice(&key_bytes);
        raw[32..34].copy_from_slice(&checksum(&key_bytes));
        raw[34] = VERSION;

        let body = data_encoding::BASE32_NOPAD.encode(&raw).to_lowercase();
        format!("{body}.onion")
    }
}

impl fmt::Display for OnionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host(), self.port)
    }
}

impl FromStr for OnionAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// First two bytes of SHA3-256(".onion checksum" || pubkey || version)
fn checksum(key_bytes: &[u8; 32]) -> [u8; 2] {
    let mut hasher = Sha3_256::new();
    hasher.update(CHECKSUM_PREFIX);
    hasher.update(key_bytes);
    hasher.update([VERSION]);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

/// Address parsing errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address: {0}")]
    Malformed(String),

    #[error("address checksum does not match embedded key")]
    ChecksumMismatch,
}
