//! # Tetheraddr - Private IPv4 address coordination for shared connections
//!
//! This library hands out non-overlapping private /24 prefixes to downstream
//! network links (hotspot, USB, Ethernet, wifi-p2p and similar) on a device
//! that shares a single upstream connection, and detects collisions between
//! those prefixes and the prefixes observed on upstream networks.
//!
//! ## Overview
//!
//! Each downstream link owner asks the [`coordinator::Coordinator`] for an
//! address when bringing its link up and releases it on tear-down. An
//! upstream observer feeds the coordinator snapshots of every upstream
//! network's addresses; when an upstream prefix starts colliding with a live
//! downstream reservation, the affected owner is told to release and
//! re-request. Legacy bluetooth and wifi-p2p links keep their well-known
//! fixed addresses, which are permanently excluded from dynamic allocation.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `addr`: prefix/address types, draw sanitization, reserved ranges
//! - `upstream`: per-network tracking of observed upstream IPv4 prefixes
//! - `reservation`: live downstream reservations and the last-address cache
//! - `coordinator`: the public allocation/conflict contract
//! - `config`: device policy configuration
//! - `scenario`: YAML scenario replay backing the CLI binary
//!
//! ## Example Usage
//!
//! ```rust
//! use tetheraddr::config::CoordinatorConfig;
//! use tetheraddr::coordinator::Coordinator;
//! use tetheraddr::reservation::DownstreamClient;
//!
//! let mut coordinator = Coordinator::with_defaults(
//!     CoordinatorConfig::default(),
//!     Box::new(|client: DownstreamClient| {
//!         println!("prefix conflict on {client}, release and re-request");
//!     }),
//! );
//!
//! let address = coordinator.request_downstream_address(DownstreamClient::Hotspot, true)?;
//! println!("hotspot address: {address}");
//! coordinator.release_downstream(DownstreamClient::Hotspot);
//! # Ok::<(), tetheraddr::coordinator::AllocationError>(())
//! ```
//!
//! ## Concurrency
//!
//! The coordinator is built for a single control-plane thread and holds no
//! internal lock. Allocation and conflict scanning read and write the same
//! tables, so a multithreaded caller must serialize every operation behind
//! one mutex or task queue.
//!
//! ## Error Handling
//!
//! Allocation failure is the only error surfaced to callers
//! ([`coordinator::AllocationError`]); malformed or incomplete upstream
//! snapshots are normalized to "no usable IPv4 information" instead of being
//! rejected, so the coordinator stays available on stale input. The CLI
//! layer uses `color_eyre` for error reporting with context.

pub mod addr;
pub mod config;
pub mod coordinator;
pub mod reservation;
pub mod scenario;
pub mod upstream;
