use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Timestamp in Unix epoch seconds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System time before Unix epoch");
        Self(duration.as_secs())
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn elapsed(&self) -> Duration {
        let now = Self::now();
        Duration::from_secs(now.0.saturating_sub(self.0))
    }
}

/// A single "remote:local" port-forwarding pair advertised by a node.
///
/// The remote side is the port opened on the hidden service, the local
/// side is where traffic is delivered on the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    pub remote: u16,
    pub local: u16,
}

impl PortMapping {
    pub fn new(remote: u16, local: u16) -> Self {
        Self { remote, local }
    }

    /// Parse a full comma-separated portmap string, e.g. "80:49371,13010:13010".
    pub fn parse_map(s: &str) -> Result<Vec<PortMapping>, PortMapError> {
        s.split(',').map(|pair| pair.trim().parse()).collect()
    }

    /// Render a list of mappings back into the comma-separated wire form.
    pub fn format_map(map: &[PortMapping]) -> String {
        map.iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote, self.local)
    }
}

impl FromStr for PortMapping {
    type Err = PortMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (remote, local) = s
            .split_once(':')
            .ok_or_else(|| PortMapError::MissingSeparator(s.to_string()))?;

        let remote: u16 = remote
            .parse()
            .map_err(|_| PortMapError::InvalidPort(remote.to_string()))?;
        let local: u16 = local
            .parse()
            .map_err(|_| PortMapError::InvalidPort(local.to_string()))?;

        // u16 already caps at 65535; port 0 is not forwardable
        if remote == 0 || local == 0 {
            return Err(PortMapError::InvalidPort("0".to_string()));
        }

        Ok(Self { remote, local })
    }
}

/// Port map parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortMapError {
    #[error("port mapping {0:?} is missing the ':' separator")]
    MissingSeparator(String),

    #[error("invalid port {0:?}: expected an integer in [1,65535]")]
    InvalidPort(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portmap_parses_single_pair() {
        let m: PortMapping = "80:49371".parse().unwrap();
        assert_eq!(m, PortMapping::new(80, 49371));
    }

    #[test]
    fn portmap_parses_full_map() {
        let map = PortMapping::parse_map("13010:13010,13011:13011").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[0], PortMapping::new(13010, 13010));
        assert_eq!(map[1], PortMapping::new(13011, 13011));
    }

    #[test]
    fn portmap_roundtrips_wire_form() {
        let wire = "80:49371,13010:13010";
        let map = PortMapping::parse_map(wire).unwrap();
        assert_eq!(PortMapping::format_map(&map), wire);
    }

    #[test]
    fn portmap_rejects_missing_separator() {
        let err = PortMapping::parse_map("8049371").unwrap_err();
        assert!(matches!(err, PortMapError::MissingSeparator(_)));
    }

    #[test]
    fn portmap_rejects_out_of_range_port() {
        assert!(matches!(
            PortMapping::parse_map("0:80").unwrap_err(),
            PortMapError::InvalidPort(_)
        ));
        assert!(matches!(
            PortMapping::parse_map("80:70000").unwrap_err(),
            PortMapError::InvalidPort(_)
        ));
        assert!(matches!(
            PortMapping::parse_map("80:banana").unwrap_err(),
            PortMapError::InvalidPort(_)
        ));
    }

    #[test]
    fn timestamp_is_monotonic_enough() {
        let ts1 = Timestamp::now();
        let ts2 = Timestamp::from_secs(ts1.as_secs() - 10);
        assert!(ts2 < ts1);
        assert!(ts2.elapsed() >= Duration::from_secs(10));
    }
}
