use serde::{Deserialize, Serialize};

use crate::Format;

/// An acceptance filter on 29-bit identifiers with SocketCAN semantics: an
/// identifier matches when `raw & mask == id & mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub id: u32,
    pub mask: u32,
}

const PDU1_PGN_BITS: u32 = 0x3ff_0000;
const PDU2_PGN_BITS: u32 = 0x3ff_ff00;

impl Filter {
    #[inline]
    #[must_use]
    pub const fn new(id: u32, mask: u32) -> Self {
        Self { id, mask }
    }

    /// Matches every frame carrying `pgn`, whatever its priority and source
    /// (and destination, for addressed PGNs).
    #[must_use]
    pub const fn pgn(pgn: u32) -> Self {
        let mask = match Format::from_pgn(pgn) {
            Format::Pdu1 => PDU1_PGN_BITS,
            Format::Pdu2 => PDU2_PGN_BITS,
        };

        Self {
            id: (pgn & 0x3ffff) << 8,
            mask,
        }
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, id: embedded_can::Id) -> bool {
        match id {
            embedded_can::Id::Extended(id) => id.as_raw() & self.mask == self.id & self.mask,
            embedded_can::Id::Standard(_) => false,
        }
    }
}

/// Whether `id` passes `filters`. An empty list accepts everything.
#[must_use]
pub fn accepts(filters: &[Filter], id: embedded_can::Id) -> bool {
    filters.is_empty() || filters.iter().any(|filter| filter.matches(id))
}
