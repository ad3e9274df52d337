/// The announce protocol: a two-round challenge-response handshake that
/// admits peers into the routing table only after they prove control of
/// the key embedded in their announced address.
mod challenge;
mod initiator;
mod peers;
mod request;
mod responder;
mod validate;

pub use challenge::{ChallengeError, ChallengeStore};
pub use initiator::{AnnounceError, AnnounceInitiator, AnnounceTransport, TransportError};
pub use peers::{Peer, PeerTable, PeerTableError};
pub use request::{AnnounceRequest, AnnounceResponse, Status};
pub use responder::{AnnounceResponder, IdentityResolver, LocalResolver, ResolveError};
pub use validate::{validate, ValidRequest, ValidationError};
