//! Upstream network prefix tracking.
//!
//! Keeps the set of IPv4 prefixes currently observed on each upstream
//! network, fed by snapshots from the upstream observer. Snapshots are
//! normalized defensively: VPN transports are ignored outright (tunnel
//! addresses are not physical-segment conflicts), and snapshots with missing
//! capability information or no usable IPv4 address clear the network's
//! entry instead of recording anything new.

use crate::addr::prefix::{AddrParseError, Ipv4Prefix};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Handle identifying one upstream network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net{}", self.0)
    }
}

/// Transport an upstream network runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Cellular,
    Wifi,
    Ethernet,
    Bluetooth,
    Vpn,
    Lowpan,
}

/// One address observed on an upstream network, IPv4 or IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedAddress {
    pub addr: IpAddr,
    pub prefix_len: u8,
}

impl fmt::Display for ObservedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for ObservedAddress {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| AddrParseError::Notation(s.to_string()))?;
        let addr = addr
            .parse::<IpAddr>()
            .map_err(|_| AddrParseError::Address(addr.to_string()))?;
        let len = len
            .parse::<u8>()
            .map_err(|_| AddrParseError::PrefixLen(len.to_string()))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if len > max {
            return Err(AddrParseError::PrefixLen(len.to_string()));
        }
        Ok(ObservedAddress { addr, prefix_len: len })
    }
}

/// The current address state of one upstream network.
///
/// `transport` is `None` when the capability information has not arrived
/// yet; such snapshots carry no usable IPv4 information.
#[derive(Debug, Clone)]
pub struct UpstreamSnapshot {
    pub network: NetworkId,
    pub transport: Option<TransportKind>,
    pub addresses: Vec<ObservedAddress>,
}

impl UpstreamSnapshot {
    fn ipv4_prefixes(&self) -> HashSet<Ipv4Prefix> {
        let mut prefixes = HashSet::new();
        for observed in &self.addresses {
            match observed.addr {
                IpAddr::V4(v4) => {
                    if observed.prefix_len > 32 {
                        warn!(
                            "ignoring {} on {}: bad IPv4 prefix length",
                            observed, self.network
                        );
                        continue;
                    }
                    prefixes.insert(Ipv4Prefix::new(v4, observed.prefix_len));
                }
                IpAddr::V6(_) => {}
            }
        }
        prefixes
    }
}

/// Per-network map of currently observed IPv4 prefixes.
#[derive(Debug, Default)]
pub struct UpstreamPrefixTracker {
    prefixes: HashMap<NetworkId, HashSet<Ipv4Prefix>>,
}

impl UpstreamPrefixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a snapshot and return the prefix set now recorded for that
    /// network (empty when the snapshot was ignored or cleared the entry).
    pub fn update(&mut self, snapshot: &UpstreamSnapshot) -> HashSet<Ipv4Prefix> {
        match snapshot.transport {
            Some(TransportKind::Vpn) => {
                debug!("ignoring VPN upstream {}", snapshot.network);
                HashSet::new()
            }
            None => {
                debug!(
                    "upstream {} has no capability information yet, clearing",
                    snapshot.network
                );
                self.prefixes.remove(&snapshot.network);
                HashSet::new()
            }
            Some(_) => {
                let v4 = snapshot.ipv4_prefixes();
                if v4.is_empty() {
                    debug!("upstream {} has no IPv4 address, clearing", snapshot.network);
                    self.prefixes.remove(&snapshot.network);
                } else {
                    self.prefixes.insert(snapshot.network, v4.clone());
                }
                v4
            }
        }
    }

    /// Forget a disconnected network. Idempotent.
    pub fn remove(&mut self, network: NetworkId) {
        self.prefixes.remove(&network);
    }

    /// Flattened view of every tracked prefix across all networks.
    pub fn all_prefixes(&self) -> HashSet<Ipv4Prefix> {
        self.prefixes.values().flatten().copied().collect()
    }

    pub fn prefixes_for(&self, network: NetworkId) -> Option<&HashSet<Ipv4Prefix>> {
        self.prefixes.get(&network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        network: u32,
        transport: Option<TransportKind>,
        addresses: &[&str],
    ) -> UpstreamSnapshot {
        UpstreamSnapshot {
            network: NetworkId(network),
            transport,
            addresses: addresses.iter().map(|a| a.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn test_update_records_ipv4_prefixes() {
        let mut tracker = UpstreamPrefixTracker::new();
        let recorded = tracker.update(&snapshot(
            1,
            Some(TransportKind::Wifi),
            &["192.168.43.5/24", "2001:db8::1/64"],
        ));
        assert_eq!(recorded.len(), 1);
        assert!(recorded.contains(&"192.168.43.0/24".parse().unwrap()));
        assert_eq!(tracker.all_prefixes(), recorded);
    }

    #[test]
    fn test_vpn_snapshot_is_a_no_op() {
        let mut tracker = UpstreamPrefixTracker::new();
        tracker.update(&snapshot(1, Some(TransportKind::Wifi), &["10.0.0.8/24"]));

        // The same network flapping to VPN must not disturb the entry.
        let recorded = tracker.update(&snapshot(1, Some(TransportKind::Vpn), &["192.168.43.5/24"]));
        assert!(recorded.is_empty());
        let expected: HashSet<Ipv4Prefix> = ["10.0.0.0/24".parse().unwrap()].into_iter().collect();
        assert_eq!(tracker.prefixes_for(NetworkId(1)), Some(&expected));
    }

    #[test]
    fn test_missing_capability_clears_entry() {
        let mut tracker = UpstreamPrefixTracker::new();
        tracker.update(&snapshot(2, Some(TransportKind::Cellular), &["10.0.0.8/24"]));
        tracker.update(&snapshot(2, None, &["10.0.0.8/24"]));
        assert!(tracker.prefixes_for(NetworkId(2)).is_none());
        assert!(tracker.all_prefixes().is_empty());
    }

    #[test]
    fn test_v6_only_snapshot_clears_entry() {
        let mut tracker = UpstreamPrefixTracker::new();
        tracker.update(&snapshot(2, Some(TransportKind::Cellular), &["10.0.0.8/24"]));
        tracker.update(&snapshot(2, Some(TransportKind::Cellular), &["2001:db8::1/64"]));
        assert!(tracker.prefixes_for(NetworkId(2)).is_none());
    }

    #[test]
    fn test_update_replaces_previous_set() {
        let mut tracker = UpstreamPrefixTracker::new();
        tracker.update(&snapshot(1, Some(TransportKind::Wifi), &["10.0.0.8/24"]));
        tracker.update(&snapshot(1, Some(TransportKind::Wifi), &["172.16.5.9/16"]));
        let all = tracker.all_prefixes();
        assert_eq!(all.len(), 1);
        assert!(all.contains(&"172.16.0.0/16".parse().unwrap()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut tracker = UpstreamPrefixTracker::new();
        tracker.update(&snapshot(1, Some(TransportKind::Wifi), &["10.0.0.8/24"]));
        tracker.remove(NetworkId(1));
        tracker.remove(NetworkId(1));
        assert!(tracker.all_prefixes().is_empty());
    }

    #[test]
    fn test_observed_address_parsing() {
        let v4: ObservedAddress = "10.0.0.8/24".parse().unwrap();
        assert!(v4.addr.is_ipv4());
        let v6: ObservedAddress = "2001:db8::1/64".parse().unwrap();
        assert!(v6.addr.is_ipv6());
        assert!("10.0.0.8/33".parse::<ObservedAddress>().is_err());
        assert!("10.0.0.8".parse::<ObservedAddress>().is_err());
    }
}
