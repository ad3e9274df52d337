mod address;
mod keypair;

pub use address::{AddressError, OnionAddress};
pub use keypair::{KeyPair, KeyPairError, PublicKey};
