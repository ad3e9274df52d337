/// Challenge sealing.
///
/// The responder encrypts the challenge plaintext so that only the holder
/// of the private key behind the announced address can read it. Sealing is
/// an ephemeral X25519 exchange against the Montgomery form of the peer's
/// ed25519 identity key, a BLAKE3 KDF, and one ChaCha20-Poly1305 box. The
/// AEAD key is used exactly once, so the nonce is fixed at zero.
///
/// Wire form: `ephemeral_pub(32) || aead_ciphertext(plaintext + 16)`.
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use curve25519_dalek::MontgomeryPoint;
use rand::{distributions::Alphanumeric, Rng, RngCore};
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

use crate::identity::{KeyPair, PublicKey};

const EPH_PUB_LEN: usize = 32;
const TAG_LEN: usize = 16;
const KDF_DOMAIN: &[u8] = b"DAM-ANNOUNCE-SEAL-V1";

/// Sealed size for a given plaintext size
pub const fn sealed_len(plaintext_len: usize) -> usize {
    EPH_PUB_LEN + plaintext_len + TAG_LEN
}

/// Encrypt `plaintext` so only the holder of `recipient`'s private key
/// can open it.
pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    let mut eph = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut eph);

    let eph_pub = x25519(eph, X25519_BASEPOINT_BYTES);
    let recipient_u = recipient.montgomery_bytes();
    let shared = x25519(eph, recipient_u);

    let key = derive_key(&shared, &eph_pub, &recipient_u);
    let cipher = ChaCha20Poly1305::new(&key.into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&[0u8; 12]), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(EPH_PUB_LEN + ciphertext.len());
    sealed.extend_from_slice(&eph_pub);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a value sealed to our identity key.
pub fn open(sealed: &[u8], keypair: &KeyPair) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < EPH_PUB_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(sealed.len()));
    }

    let mut eph_pub = [0u8; 32];
    eph_pub.copy_from_slice(&sealed[..EPH_PUB_LEN]);

    // The ed25519 scalar is canonical mod l, so plain Montgomery
    // multiplication is the correct DH here; the clamping x25519() applies
    // would corrupt a reduced scalar.
    let shared = (&MontgomeryPoint(eph_pub) * &keypair.dh_scalar()).to_bytes();
    if shared == [0u8; 32] {
        return Err(CryptoError::DecryptionFailed);
    }

    let our_u = keypair.public_key().montgomery_bytes();
    let key = derive_key(&shared, &eph_pub, &our_u);
    let cipher = ChaCha20Poly1305::new(&key.into());

    cipher
        .decrypt(Nonce::from_slice(&[0u8; 12]), &sealed[EPH_PUB_LEN..])
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// BLAKE3 keyed KDF binding the shared secret to both public values
fn derive_key(shared: &[u8; 32], eph_pub: &[u8; 32], recipient_u: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_keyed(shared);
    hasher.update(KDF_DOMAIN);
    hasher.update(eph_pub);
    hasher.update(recipient_u);
    *hasher.finalize().as_bytes()
}

/// A random printable-ASCII string, used for challenges and revoke tokens
pub fn random_ascii(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Sealing errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("sealed value too short: {0} bytes")]
    MalformedCiphertext(usize),

    #[error("decryption failed")]
    DecryptionFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use damnet_common::protocol::CHALLENGE_LEN;

    #[test]
    fn seal_open_roundtrip() {
        let keypair = KeyPair::generate();
        let plaintext = random_ascii(CHALLENGE_LEN);

        let sealed = seal(plaintext.as_bytes(), &keypair.public_key()).unwrap();
        assert_eq!(sealed.len(), sealed_len(CHALLENGE_LEN));

        let opened = open(&sealed, &keypair).unwrap();
        assert_eq!(opened, plaintext.as_bytes());
    }

    #[test]
    fn roundtrip_holds_across_fresh_keypairs() {
        for _ in 0..8 {
            let keypair = KeyPair::generate();
            let mut value = [0u8; CHALLENGE_LEN];
            rand::thread_rng().fill_bytes(&mut value);

            let sealed = seal(&value, &keypair.public_key()).unwrap();
            assert_eq!(open(&sealed, &keypair).unwrap(), value);
        }
    }

    #[test]
    fn wrong_key_cannot_open() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();

        let sealed = seal(b"secret challenge", &keypair.public_key()).unwrap();
        assert_eq!(open(&sealed, &other).unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let keypair = KeyPair::generate();
        let mut sealed = seal(b"secret challenge", &keypair.public_key()).unwrap();

        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(open(&sealed, &keypair).unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn truncated_ciphertext_is_malformed() {
        let keypair = KeyPair::generate();
        let err = open(&[0u8; 40], &keypair).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedCiphertext(40)));
    }

    #[test]
    fn random_ascii_is_printable_and_sized() {
        let s = random_ascii(CHALLENGE_LEN);
        assert_eq!(s.len(), CHALLENGE_LEN);
        assert!(s.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(s, random_ascii(CHALLENGE_LEN));
    }
}
