/// HTTP surface of the announce protocol
///
/// One endpoint: POST /announce. Both handshake rounds arrive here and
/// are dispatched to the responder; the HTTP status code mirrors the
/// protocol status class.

pub mod handlers;
pub mod server;

pub use handlers::SecretBody;
pub use server::ApiServer;
