//! Address types, sanitization and reserved ranges.
//!
//! This module holds the building blocks of downstream address allocation:
//! prefix/address types with conflict checks, the random-draw sanitizer with
//! its injectable draw sources, and the statically reserved legacy ranges.

pub mod prefix;
pub mod reserved;
pub mod sanitizer;

// Re-export commonly used types
pub use prefix::{AddrParseError, Ipv4Prefix, LinkAddress, DOWNSTREAM_PREFIX_LEN};
pub use reserved::{LegacyRole, ReservedRangeSet};
pub use sanitizer::{sanitize_sub_addr, ScriptedSource, SeededSource, SubAddrSource, ThreadRngSource};
