/// DAM daemon library
///
/// This crate wires the announce protocol to the outside world: an HTTP
/// endpoint for incoming announces, an HTTP client for outgoing ones,
/// and on-disk identity key management.

pub mod api;
pub mod keys;
pub mod rpc;

pub use api::ApiServer;
pub use rpc::HttpAnnounceClient;
