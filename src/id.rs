use embedded_can::ExtendedId;

use crate::{Error, FrameRejection};

/// A NMEA 2000 message identifier. According to N2K specification, this is a
/// 29-bit extended CAN ID with a 3-bit priority, a 18-bit parameter group
/// number (PGN), and an 8-bit source address.
///
/// Which bits of the PGN are addressing depends on the PDU format byte, see
/// [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(ExtendedId);

/// The two addressing conventions of a 29-bit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Peer to peer. The PDU specific byte is the destination address.
    Pdu1,
    /// Broadcast. The PDU specific byte extends the PGN and the destination
    /// is implied global.
    Pdu2,
}

/// Highest PDU format value that still uses PDU1 addressing.
pub const PDU1_MAX_FORMAT: u8 = 239;

pub const DESTINATION_BROADCAST: u8 = 0xff;

const PGN_MASK: u32 = 0x3ffff;
const PDU1_PGN_MASK: u32 = 0x3ff00;

impl Format {
    #[inline]
    #[must_use]
    pub const fn from_pdu_format(pdu_format: u8) -> Self {
        if pdu_format <= PDU1_MAX_FORMAT {
            Self::Pdu1
        } else {
            Self::Pdu2
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_pgn(pgn: u32) -> Self {
        Self::from_pdu_format((pgn >> 8) as u8)
    }
}

impl Id {
    /// Compose an identifier from its fields. For PDU2 PGNs the destination
    /// is ignored; for PDU1 PGNs the lowest byte of the PGN is ignored.
    #[inline]
    #[must_use]
    pub const fn new(priority: u8, pgn: u32, source: u8, destination: u8) -> Self {
        debug_assert!(priority <= 7, "Priority must be in the range 0-7");
        debug_assert!(pgn <= PGN_MASK, "PGN must be less than 0x3ffff (18 bits)");

        let raw = match Format::from_pgn(pgn) {
            Format::Pdu1 => {
                (priority as u32 & 0x7) << 26
                    | (pgn & PDU1_PGN_MASK) << 8
                    | (destination as u32) << 8
                    | source as u32
            }
            // The priority is in bits 26-28, the PGN in bits 8-25, and the
            // source address in bits 0-7.
            Format::Pdu2 => (priority as u32 & 0x7) << 26 | (pgn & PGN_MASK) << 8 | source as u32,
        };

        match ExtendedId::new(raw) {
            Some(id) => Self(id),
            None => panic!("masked identifier does not fit in 29 bits"),
        }
    }

    /// Create a new identifier from an extended CAN ID.
    #[inline]
    #[must_use]
    pub const fn from_can_id(can_id: ExtendedId) -> Self {
        Self(can_id)
    }

    #[inline]
    #[must_use]
    pub const fn as_can_id(self) -> ExtendedId {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_raw(self) -> u32 {
        self.0.as_raw()
    }

    #[inline]
    #[must_use]
    pub fn priority(self) -> u8 {
        (self.0.as_raw() >> 26) as u8 & 0x7
    }

    /// The PF byte, bits 16-23.
    #[inline]
    #[must_use]
    pub fn pdu_format(self) -> u8 {
        (self.0.as_raw() >> 16) as u8
    }

    /// The PS byte, bits 8-15.
    #[inline]
    #[must_use]
    pub fn pdu_specific(self) -> u8 {
        (self.0.as_raw() >> 8) as u8
    }

    #[inline]
    #[must_use]
    pub fn format(self) -> Format {
        Format::from_pdu_format(self.pdu_format())
    }

    #[inline]
    #[must_use]
    pub fn pgn(self) -> u32 {
        match self.format() {
            Format::Pdu1 => (self.0.as_raw() >> 8) & PDU1_PGN_MASK,
            Format::Pdu2 => (self.0.as_raw() >> 8) & PGN_MASK,
        }
    }

    #[inline]
    #[must_use]
    pub fn source(self) -> u8 {
        self.0.as_raw() as u8
    }

    #[inline]
    #[must_use]
    pub fn destination(self) -> u8 {
        match self.format() {
            Format::Pdu1 => self.pdu_specific(),
            Format::Pdu2 => DESTINATION_BROADCAST, // implied global
        }
    }
}

impl From<ExtendedId> for Id {
    fn from(id: ExtendedId) -> Self {
        Self::from_can_id(id)
    }
}

impl From<Id> for embedded_can::Id {
    fn from(id: Id) -> Self {
        Self::Extended(id.as_can_id())
    }
}

impl TryFrom<embedded_can::Id> for Id {
    type Error = Error;

    fn try_from(id: embedded_can::Id) -> Result<Self, Self::Error> {
        match id {
            embedded_can::Id::Extended(extended) => Ok(Self(extended)),
            embedded_can::Id::Standard(_) => Err(Error::InvalidFrame(FrameRejection::StandardId)),
        }
    }
}
