//! Random sub-address draws and sanitization.
//!
//! Dynamic allocation draws a 16-bit value per attempt: the high byte is the
//! candidate subnet octet and the low byte the candidate host octet. The host
//! octet must land in the unicast range [2, 254]; draws outside it are
//! replaced with a fixed default rather than producing the network, gateway
//! or broadcast host id. The subnet octet is passed through unchanged, since
//! every subnet value is a legitimate choice and unavailable ones are handled
//! by the caller's retry loop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Replacement host octet for draws outside the unicast host range.
pub const DEFAULT_HOST_OCTET: u8 = 42;

/// Split a 16-bit draw into a sanitized `(subnet_octet, host_octet)` pair.
pub fn sanitize_sub_addr(draw: u16) -> (u8, u8) {
    let subnet = (draw >> 8) as u8;
    let host = (draw & 0xff) as u8;
    let host = if (2..=254).contains(&host) {
        host
    } else {
        DEFAULT_HOST_OCTET
    };
    (subnet, host)
}

/// Source of 16-bit sub-address draws.
///
/// Injected into the coordinator so allocation is reproducible under test
/// and in scenario replay.
pub trait SubAddrSource {
    fn next_sub_addr(&mut self) -> u16;
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRngSource;

impl SubAddrSource for ThreadRngSource {
    fn next_sub_addr(&mut self) -> u16 {
        rand::thread_rng().gen()
    }
}

/// Deterministic source seeded from a scenario file, for reproducible runs.
#[derive(Debug)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        SeededSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SubAddrSource for SeededSource {
    fn next_sub_addr(&mut self) -> u16 {
        self.rng.gen()
    }
}

/// Source that replays a fixed sequence of draws, repeating the final value
/// once the sequence is exhausted.
#[derive(Debug)]
pub struct ScriptedSource {
    draws: VecDeque<u16>,
    last: u16,
}

impl ScriptedSource {
    pub fn new(draws: &[u16]) -> Self {
        ScriptedSource {
            draws: draws.iter().copied().collect(),
            last: draws.last().copied().unwrap_or(0),
        }
    }
}

impl SubAddrSource for ScriptedSource {
    fn next_sub_addr(&mut self) -> u16 {
        self.draws.pop_front().unwrap_or(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_host_octets_replaced() {
        assert_eq!(sanitize_sub_addr(0x2b00), (43, 42));
        assert_eq!(sanitize_sub_addr(0x2d01), (45, 42));
        assert_eq!(sanitize_sub_addr(0x2eff), (46, 42));
    }

    #[test]
    fn test_valid_host_octets_pass_through() {
        assert_eq!(sanitize_sub_addr(0x2f05), (47, 5));
        assert_eq!(sanitize_sub_addr(0x2b02), (43, 2));
        assert_eq!(sanitize_sub_addr(0x2bfe), (43, 254));
    }

    #[test]
    fn test_subnet_octet_never_replaced() {
        assert_eq!(sanitize_sub_addr(0x0005).0, 0);
        assert_eq!(sanitize_sub_addr(0xff05).0, 255);
        assert_eq!(sanitize_sub_addr(0x2c05).0, 44);
    }

    #[test]
    fn test_scripted_source_repeats_last_draw() {
        let mut source = ScriptedSource::new(&[0x2b05, 0x2d0a]);
        assert_eq!(source.next_sub_addr(), 0x2b05);
        assert_eq!(source.next_sub_addr(), 0x2d0a);
        assert_eq!(source.next_sub_addr(), 0x2d0a);
        assert_eq!(source.next_sub_addr(), 0x2d0a);
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = SeededSource::new(7);
        let mut b = SeededSource::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_sub_addr(), b.next_sub_addr());
        }
    }
}
