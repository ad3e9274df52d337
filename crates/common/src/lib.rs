pub mod config;
pub mod types;

pub use config::{protocol, ConfigError, NodeConfig};
pub use types::{PortMapError, PortMapping, Timestamp};
