use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{PortMapError, PortMapping};

/// Announce protocol constants
pub mod protocol {
    /// Message every node signs to prove liveness in round 1
    pub const PROOF_MESSAGE: &str = "I am a DAM node!";

    /// Reply sent when a node has completed round 2 and is admitted
    pub const WELCOME_MESSAGE: &str = "Welcome to the DAM network!";

    /// Literal reason for a request with an unknown nodetype
    pub const INVALID_NODETYPE_MESSAGE: &str = "Invalid nodetype.";

    /// Diagnostic returned when the peer's descriptor cannot be fetched.
    /// This is the recoverable server-error case, not a protocol failure.
    pub const RESOLVE_FAILURE_MESSAGE: &str =
        "Could not get a descriptor for the given address.";

    /// Node types allowed to announce
    pub const ALLOWED_NODETYPES: &[&str] = &["node"];

    /// Length in bytes of the challenge plaintext (legacy-compatible)
    pub const CHALLENGE_LEN: usize = 64;

    /// How long an issued challenge stays valid
    pub const CHALLENGE_TTL_SECS: u64 = 300;

    /// Peers whose last handshake is older than this get pruned
    pub const PEER_MAX_AGE_SECS: u64 = 86400;

    /// Interval between prune/sweep passes in the daemon
    pub const MAINTENANCE_INTERVAL_SECS: u64 = 600;

    /// Default hidden-service port map
    pub const DEFAULT_PORTMAP: &str = "13010:13010,13011:13011";

    /// Default local listen address for the announce endpoint
    pub const DEFAULT_LISTEN: &str = "127.0.0.1:49371";

    /// Name of the ed25519 seed file inside the data directory
    pub const SEED_FILE: &str = "ed25519.seed";
}

/// Node configuration
///
/// Built once at startup (from CLI flags or a TOML file) and passed by
/// reference into the announce responder and initiator. Nothing in the
/// protocol core reads configuration from ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Local listen address for the announce endpoint
    pub listen: String,

    /// Ports forwarded to/from the hidden service
    pub portmap: Vec<PortMapping>,

    /// Data directory (key seed, hidden service state)
    pub data_dir: PathBuf,

    /// Initial seed peers to announce to, "host.onion:port" form
    pub seeds: Vec<String>,

    /// Do not announce to seeds on startup
    pub no_announce: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: protocol::DEFAULT_LISTEN.to_string(),
            portmap: PortMapping::parse_map(protocol::DEFAULT_PORTMAP)
                .expect("default portmap is well-formed"),
            data_dir: PathBuf::from(".dam"),
            seeds: Vec::new(),
            no_announce: false,
        }
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn with_portmap(mut self, portmap: &str) -> Result<Self, PortMapError> {
        self.portmap = PortMapping::parse_map(portmap)?;
        Ok(self)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn seed_path(&self) -> PathBuf {
        self.data_dir.join(protocol::SEED_FILE)
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(protocol::CHALLENGE_TTL_SECS)
    }

    pub fn peer_max_age(&self) -> Duration {
        Duration::from_secs(protocol::PEER_MAX_AGE_SECS)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(protocol::MAINTENANCE_INTERVAL_SECS)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_legacy_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.listen, protocol::DEFAULT_LISTEN);
        assert_eq!(config.portmap.len(), 2);
        assert!(!config.no_announce);
    }

    #[test]
    fn config_builder() {
        let config = NodeConfig::new()
            .with_listen("127.0.0.1:5000")
            .with_portmap("80:8080")
            .unwrap()
            .with_data_dir("/tmp/dam")
            .with_seeds(vec!["peer.onion:49371".to_string()]);

        assert_eq!(config.listen, "127.0.0.1:5000");
        assert_eq!(config.portmap, vec![PortMapping::new(80, 8080)]);
        assert_eq!(config.seed_path(), PathBuf::from("/tmp/dam/ed25519.seed"));
        assert_eq!(config.seeds.len(), 1);
    }

    #[test]
    fn config_rejects_bad_portmap() {
        assert!(NodeConfig::new().with_portmap("nope").is_err());
    }
}
