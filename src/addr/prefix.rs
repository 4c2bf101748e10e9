//! IPv4 prefix and link address types.
//!
//! Downstream links always use a /24, so prefix conflict between two
//! downstream reservations reduces to equality of the network address.
//! Upstream networks may advertise other mask lengths, so intersection is
//! computed generally by masking with the shorter prefix.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Mask length used for every downstream link.
pub const DOWNSTREAM_PREFIX_LEN: u8 = 24;

/// Errors that can occur when parsing prefixes or link addresses
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("expected CIDR notation 'address/len': {0}")]
    Notation(String),

    #[error("invalid IP address: {0}")]
    Address(String),

    #[error("invalid prefix length: {0}")]
    PrefixLen(String),
}

/// An IPv4 network prefix: a network address plus a mask length.
///
/// The constructor masks off host bits, so two prefixes built from any
/// address inside the same network compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Prefix {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Prefix {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(32);
        let network = Ipv4Addr::from(u32::from(addr) & prefix_mask(prefix_len));
        Ipv4Prefix { network, prefix_len }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `addr` falls inside this prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & prefix_mask(self.prefix_len) == u32::from(self.network)
    }

    /// Whether the address ranges of the two prefixes overlap.
    pub fn intersects(&self, other: &Ipv4Prefix) -> bool {
        let mask = prefix_mask(self.prefix_len.min(other.prefix_len));
        u32::from(self.network) & mask == u32::from(other.network) & mask
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = split_cidr(s)?;
        Ok(Ipv4Prefix::new(addr, len))
    }
}

/// An IPv4 host address plus its owning prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddress {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl LinkAddress {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        LinkAddress { addr, prefix_len: prefix_len.min(32) }
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The network prefix this address belongs to.
    pub fn prefix(&self) -> Ipv4Prefix {
        Ipv4Prefix::new(self.addr, self.prefix_len)
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for LinkAddress {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = split_cidr(s)?;
        Ok(LinkAddress::new(addr, len))
    }
}

fn split_cidr(s: &str) -> Result<(Ipv4Addr, u8), AddrParseError> {
    let (addr, len) = s
        .split_once('/')
        .ok_or_else(|| AddrParseError::Notation(s.to_string()))?;
    let addr = addr
        .parse::<Ipv4Addr>()
        .map_err(|_| AddrParseError::Address(addr.to_string()))?;
    let len = len
        .parse::<u8>()
        .map_err(|_| AddrParseError::PrefixLen(len.to_string()))?;
    if len > 32 {
        return Err(AddrParseError::PrefixLen(len.to_string()));
    }
    Ok((addr, len))
}

fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        (!0u32) << (32 - prefix_len)
    }
}
