//! Slot Mapper Module
//!
//! Maps keys onto a fixed set of hash slots, one shard per slot.
//!
//! The hash is CRC16/XMODEM reduced modulo [`MAX_SLOT`], the same scheme
//! Redis Cluster uses. Slot values are stable across process runs, so tests
//! may pin exact slots for fixed keys.

use std::fmt;

// == Public Constants ==
/// Total number of hash slots (and therefore shards).
pub const MAX_SLOT: u16 = 16384;

/// CRC16/XMODEM lookup table (polynomial 0x1021).
const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |crc, &byte| {
        (crc << 8) ^ CRC16_TABLE[usize::from((crc >> 8) as u8 ^ byte)]
    })
}

// == Slot ==
/// A hash slot index in `[0, MAX_SLOT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Slot(pub u16);

impl Slot {
    /// Index of this slot into the shard array.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The slot following this one, wrapping back to zero after the last slot.
    pub fn next(self) -> Slot {
        Slot((self.0 + 1) % MAX_SLOT)
    }

    /// Iterates over every slot in ascending order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..MAX_SLOT).map(Slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Slot {
    fn from(value: u16) -> Self {
        Slot(value)
    }
}

// == Slot Of ==
/// Returns the slot owning `key`.
///
/// If the key contains a hash tag (a non-empty `{...}` section), only the tag
/// is hashed so related keys can be pinned to one shard.
pub fn slot_of(key: &str) -> Slot {
    Slot(crc16(hash_tag(key.as_bytes())) % MAX_SLOT)
}

/// Returns the bytes that participate in hashing.
fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    match key[open + 1..].iter().position(|&b| b == b'}') {
        Some(len) if len > 0 => &key[open + 1..open + 1 + len],
        _ => key,
    }
}

// == Range ==
/// An inclusive range of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub begin: Slot,
    pub end: Slot,
}

impl Range {
    pub fn new(begin: u16, end: u16) -> Self {
        Self {
            begin: Slot(begin),
            end: Slot(end),
        }
    }

    /// True if `slot` lies within the range, both ends included.
    pub fn contains(&self, slot: Slot) -> bool {
        self.begin <= slot && slot <= self.end
    }

    /// True if the two ranges share at least one slot.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }
}
