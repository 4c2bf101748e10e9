//! Downstream reservation table.
//!
//! Tracks which downstream client currently holds which address, plus a
//! last-known-address cache keyed by the same client id. The cache survives
//! release so that re-enabling the same kind of link can recover its
//! previous address; only a new reservation for the same client overwrites
//! it.

use crate::addr::prefix::{Ipv4Prefix, LinkAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identity of a downstream-link owner, derived from the link's
/// functional role rather than any per-session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownstreamClient {
    Hotspot,
    Usb,
    Ethernet,
    WifiP2p,
    Bluetooth,
    Ncm,
}

impl fmt::Display for DownstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownstreamClient::Hotspot => "hotspot",
            DownstreamClient::Usb => "usb",
            DownstreamClient::Ethernet => "ethernet",
            DownstreamClient::WifiP2p => "wifi-p2p",
            DownstreamClient::Bluetooth => "bluetooth",
            DownstreamClient::Ncm => "ncm",
        };
        f.write_str(name)
    }
}

/// Live reservations plus the per-client last-address cache.
#[derive(Debug, Default)]
pub struct ReservationTable {
    live: HashMap<DownstreamClient, LinkAddress>,
    last_address: HashMap<DownstreamClient, LinkAddress>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live reservation for `client` and refresh its cache entry.
    pub fn reserve(&mut self, client: DownstreamClient, address: LinkAddress) {
        self.live.insert(client, address);
        self.last_address.insert(client, address);
    }

    /// Drop the live reservation only; the cache entry persists.
    /// Returns whether a reservation existed.
    pub fn release(&mut self, client: DownstreamClient) -> bool {
        self.live.remove(&client).is_some()
    }

    /// The address currently reserved by `client`, if any.
    pub fn address_of(&self, client: DownstreamClient) -> Option<LinkAddress> {
        self.live.get(&client).copied()
    }

    /// The last address ever reserved by `client`, live or not.
    pub fn cached_address(&self, client: DownstreamClient) -> Option<LinkAddress> {
        self.last_address.get(&client).copied()
    }

    /// Prefixes of every live reservation other than `client`'s own, for
    /// conflict scanning during allocation.
    pub fn live_prefixes_except(&self, client: DownstreamClient) -> Vec<Ipv4Prefix> {
        self.live
            .iter()
            .filter(|(owner, _)| **owner != client)
            .map(|(_, address)| address.prefix())
            .collect()
    }

    /// Prefixes of every cached last-address entry, live or not. Cached
    /// prefixes stay off-limits to dynamic allocation so a returning client
    /// can reclaim its previous address.
    pub fn cached_prefixes(&self) -> Vec<Ipv4Prefix> {
        self.last_address
            .values()
            .map(|address| address.prefix())
            .collect()
    }

    /// All live reservations.
    pub fn live(&self) -> impl Iterator<Item = (DownstreamClient, LinkAddress)> + '_ {
        self.live.iter().map(|(client, address)| (*client, *address))
    }
}
