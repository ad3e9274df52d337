pub mod announce;
pub mod crypto;
pub mod identity;

pub use announce::{
    AnnounceError, AnnounceInitiator, AnnounceRequest, AnnounceResponder, AnnounceResponse,
    AnnounceTransport, ChallengeError, ChallengeStore, IdentityResolver, LocalResolver, Peer,
    PeerTable, PeerTableError, ResolveError, Status, TransportError, ValidationError,
};
pub use crypto::CryptoError;
pub use identity::{AddressError, KeyPair, KeyPairError, OnionAddress, PublicKey};
