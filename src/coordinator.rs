//! The downstream address coordinator.
//!
//! Hands out non-overlapping /24 prefixes from 192.168.0.0/16 to downstream
//! links, checking each candidate against the statically reserved ranges,
//! every other live reservation, every cached last-address prefix and every
//! prefix currently observed on an upstream network. When an upstream change collides with a live
//! reservation the affected client is notified through the conflict sink;
//! the reservation itself stays in place and its owner is expected to
//! release and re-request.
//!
//! The coordinator is driven by a single control-plane thread. It holds no
//! internal lock; callers in a multithreaded environment must serialize all
//! operations behind one mutex.

use crate::addr::prefix::{Ipv4Prefix, LinkAddress, DOWNSTREAM_PREFIX_LEN};
use crate::addr::reserved::{LegacyRole, ReservedRangeSet};
use crate::addr::sanitizer::{sanitize_sub_addr, SubAddrSource, ThreadRngSource};
use crate::config::CoordinatorConfig;
use crate::reservation::{DownstreamClient, ReservationTable};
use crate::upstream::{NetworkId, UpstreamPrefixTracker, UpstreamSnapshot};
use log::{debug, info, warn};
use std::net::Ipv4Addr;

/// Upper bound on random draws per allocation before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 100;

/// All dynamic downstream prefixes are carved out of this block.
const BASE_OCTETS: [u8; 2] = [192, 168];

/// Errors surfaced by [`Coordinator::request_downstream_address`]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("no non-conflicting /24 prefix found after {attempts} attempts")]
    Exhausted { attempts: usize },
}

/// Receiver of prefix-conflict signals.
///
/// Invoked synchronously during [`Coordinator::update_upstream_prefix`] for
/// every live reservation that the updated network now collides with. Any
/// `FnMut(DownstreamClient)` closure qualifies.
pub trait ConflictSink {
    fn on_prefix_conflict(&mut self, client: DownstreamClient);
}

impl<F: FnMut(DownstreamClient)> ConflictSink for F {
    fn on_prefix_conflict(&mut self, client: DownstreamClient) {
        self(client)
    }
}

/// Owner of all allocation state: reserved ranges, live reservations with
/// their last-address cache, and the upstream prefix tracker.
pub struct Coordinator {
    config: CoordinatorConfig,
    random: Box<dyn SubAddrSource>,
    sink: Box<dyn ConflictSink>,
    reserved: ReservedRangeSet,
    upstream: UpstreamPrefixTracker,
    reservations: ReservationTable,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        random: Box<dyn SubAddrSource>,
        sink: Box<dyn ConflictSink>,
    ) -> Self {
        Coordinator {
            config,
            random,
            sink,
            reserved: ReservedRangeSet::new(),
            upstream: UpstreamPrefixTracker::new(),
            reservations: ReservationTable::new(),
        }
    }

    /// Coordinator with the production randomness source.
    pub fn with_defaults(config: CoordinatorConfig, sink: Box<dyn ConflictSink>) -> Self {
        Self::new(config, Box::new(ThreadRngSource), sink)
    }

    /// Allocate an address for a downstream link.
    ///
    /// With `reuse_last` set, the client's previous address is handed back
    /// unchanged when it is still conflict-free. Otherwise candidates are
    /// drawn from the random source until one avoids the reserved ranges,
    /// every other live reservation, every cached last-address prefix and
    /// every tracked upstream prefix, up to [`MAX_ALLOCATION_ATTEMPTS`]
    /// draws.
    pub fn request_downstream_address(
        &mut self,
        client: DownstreamClient,
        reuse_last: bool,
    ) -> Result<LinkAddress, AllocationError> {
        // Policy branch: a dedicated wifi-p2p link always owns its fixed
        // legacy address. The prefix is permanently reserved, so no scan or
        // table entry is needed.
        if client == DownstreamClient::WifiP2p && self.config.wifi_p2p_dedicated_ip {
            let address = self.reserved.fixed_address_for(LegacyRole::WifiP2p);
            info!("dedicated wifi-p2p policy active, handing out {}", address);
            return Ok(address);
        }

        if reuse_last {
            if let Some(cached) = self.reservations.cached_address(client) {
                if !self.conflicts_with_any(client, &cached.prefix()) {
                    debug!("reusing last address {} for {}", cached, client);
                    self.reservations.reserve(client, cached);
                    return Ok(cached);
                }
                debug!("last address {} for {} is no longer usable", cached, client);
            }
        }

        self.choose_downstream_address(client)
    }

    /// Release the live reservation for `client`, keeping its cache entry.
    /// A release with no live reservation is a no-op.
    pub fn release_downstream(&mut self, client: DownstreamClient) {
        if self.reservations.release(client) {
            info!("released downstream address of {}", client);
        } else {
            debug!("release for {} with no live reservation, ignoring", client);
        }
    }

    /// Ingest an upstream snapshot and notify every downstream client whose
    /// prefix now collides with the updated network. Reservations on other
    /// subnets are left untouched.
    pub fn update_upstream_prefix(&mut self, snapshot: &UpstreamSnapshot) {
        let updated = self.upstream.update(snapshot);
        if updated.is_empty() {
            return;
        }

        let conflicted: Vec<DownstreamClient> = self
            .reservations
            .live()
            .filter(|(_, address)| {
                let prefix = address.prefix();
                updated.iter().any(|p| p.intersects(&prefix))
            })
            .map(|(client, _)| client)
            .collect();

        for client in conflicted {
            warn!(
                "upstream {} now collides with downstream {}, notifying",
                snapshot.network, client
            );
            self.sink.on_prefix_conflict(client);
        }
    }

    /// Forget a disconnected upstream network. Removal cannot create a new
    /// conflict, so no signals are emitted.
    pub fn remove_upstream_prefix(&mut self, network: NetworkId) {
        self.upstream.remove(network);
    }

    /// The address currently held by `client`, if any.
    pub fn downstream_address(&self, client: DownstreamClient) -> Option<LinkAddress> {
        self.reservations.address_of(client)
    }

    fn conflicts_with_any(&self, client: DownstreamClient, prefix: &Ipv4Prefix) -> bool {
        if self.reserved.is_reserved(prefix) {
            return true;
        }
        if self
            .reservations
            .live_prefixes_except(client)
            .iter()
            .any(|p| p.intersects(prefix))
        {
            return true;
        }
        self.upstream
            .all_prefixes()
            .iter()
            .any(|p| p.intersects(prefix))
    }

    fn choose_downstream_address(
        &mut self,
        client: DownstreamClient,
    ) -> Result<LinkAddress, AllocationError> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let draw = self.random.next_sub_addr();
            let (subnet, host) = sanitize_sub_addr(draw);
            let candidate = Ipv4Prefix::new(
                Ipv4Addr::new(BASE_OCTETS[0], BASE_OCTETS[1], subnet, 0),
                DOWNSTREAM_PREFIX_LEN,
            );
            // Cached prefixes are in use too: every client keeps a claim on
            // its last prefix so reuse-last can recover it later. That
            // includes the requester's own entry, so a repeated dynamic
            // request always lands on a fresh subnet.
            if self.conflicts_with_any(client, &candidate)
                || self
                    .reservations
                    .cached_prefixes()
                    .iter()
                    .any(|p| p.intersects(&candidate))
            {
                debug!("candidate {} for {} conflicts, redrawing", candidate, client);
                continue;
            }

            let address = LinkAddress::new(
                Ipv4Addr::new(BASE_OCTETS[0], BASE_OCTETS[1], subnet, host),
                DOWNSTREAM_PREFIX_LEN,
            );
            self.reservations.reserve(client, address);
            info!("assigned {} to downstream {}", address, client);
            return Ok(address);
        }

        warn!(
            "no usable /24 for {} after {} draws",
            client, MAX_ALLOCATION_ATTEMPTS
        );
        Err(AllocationError::Exhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}
