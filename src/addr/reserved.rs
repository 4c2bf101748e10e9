//! Permanently reserved downstream prefixes.
//!
//! Two legacy link roles keep fixed, well-known addresses that peers may
//! hard-code: bluetooth tethering on 192.168.44.1/24 and the legacy wifi-p2p
//! group owner on 192.168.49.1/24. Both prefixes are excluded from dynamic
//! allocation whether or not the legacy role is currently active.

use super::prefix::{Ipv4Prefix, LinkAddress, DOWNSTREAM_PREFIX_LEN};
use std::net::Ipv4Addr;

/// Fixed address of the bluetooth tethering link.
pub const BLUETOOTH_TETHER_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 44, 1);

/// Fixed address of the legacy wifi-p2p group owner.
pub const LEGACY_WIFI_P2P_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 49, 1);

/// Downstream link roles with a permanently reserved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyRole {
    BluetoothTether,
    WifiP2p,
}

/// The set of prefixes excluded from dynamic allocation.
#[derive(Debug)]
pub struct ReservedRangeSet {
    prefixes: [Ipv4Prefix; 2],
}

impl ReservedRangeSet {
    pub fn new() -> Self {
        ReservedRangeSet {
            prefixes: [
                Ipv4Prefix::new(BLUETOOTH_TETHER_ADDR, DOWNSTREAM_PREFIX_LEN),
                Ipv4Prefix::new(LEGACY_WIFI_P2P_ADDR, DOWNSTREAM_PREFIX_LEN),
            ],
        }
    }

    /// Whether `prefix` overlaps any reserved range.
    pub fn is_reserved(&self, prefix: &Ipv4Prefix) -> bool {
        self.prefixes.iter().any(|p| p.intersects(prefix))
    }

    /// The immutable address assigned to a legacy role.
    pub fn fixed_address_for(&self, role: LegacyRole) -> LinkAddress {
        match role {
            LegacyRole::BluetoothTether => {
                LinkAddress::new(BLUETOOTH_TETHER_ADDR, DOWNSTREAM_PREFIX_LEN)
            }
            LegacyRole::WifiP2p => LinkAddress::new(LEGACY_WIFI_P2P_ADDR, DOWNSTREAM_PREFIX_LEN),
        }
    }
}

impl Default for ReservedRangeSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_prefixes_are_reserved() {
        let reserved = ReservedRangeSet::new();
        assert!(reserved.is_reserved(&"192.168.44.0/24".parse().unwrap()));
        assert!(reserved.is_reserved(&"192.168.49.0/24".parse().unwrap()));
        assert!(!reserved.is_reserved(&"192.168.43.0/24".parse().unwrap()));
        assert!(!reserved.is_reserved(&"192.168.45.0/24".parse().unwrap()));
    }

    #[test]
    fn test_wider_prefix_covering_a_reserved_range_is_reserved() {
        let reserved = ReservedRangeSet::new();
        assert!(reserved.is_reserved(&"192.168.0.0/16".parse().unwrap()));
    }

    #[test]
    fn test_fixed_addresses() {
        let reserved = ReservedRangeSet::new();
        assert_eq!(
            reserved.fixed_address_for(LegacyRole::BluetoothTether),
            "192.168.44.1/24".parse().unwrap()
        );
        assert_eq!(
            reserved.fixed_address_for(LegacyRole::WifiP2p),
            "192.168.49.1/24".parse().unwrap()
        );
    }
}
