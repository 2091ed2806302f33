use chrono::{DateTime, Utc};
use embedded_can::Frame;

use crate::{Error, FrameRejection, Id, Result};

/// Maximum payload of a classic CAN frame.
pub const MAX_DATA_LEN: usize = 8;

pub type Payload = heapless::Vec<u8, MAX_DATA_LEN>;

/// A physical CAN frame as handed over by the bus transport, stamped with the
/// time it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub id: embedded_can::Id,
    /// Declared data length.
    pub dlc: u8,
    pub data: Payload,
    pub timestamp: DateTime<Utc>,
}

impl RawFrame {
    /// Create a frame whose declared length matches `data`. Returns `None`
    /// if `data` is longer than 8 bytes.
    pub fn new(id: impl Into<embedded_can::Id>, data: &[u8], timestamp: DateTime<Utc>) -> Option<Self> {
        let data = Payload::from_slice(data).ok()?;

        Some(Self {
            id: id.into(),
            dlc: data.len() as u8,
            data,
            timestamp,
        })
    }

    /// Capture any [`embedded_can::Frame`]. Only the first `dlc` bytes of the
    /// frame's data are kept, so drivers that always hand out an 8-byte
    /// buffer are handled.
    pub fn from_can_frame<F: Frame>(frame: &F, timestamp: DateTime<Utc>) -> Result<Self> {
        if frame.is_remote_frame() {
            return Err(FrameRejection::RemoteFrame.into());
        }

        let dlc = frame.dlc();
        if dlc > MAX_DATA_LEN {
            return Err(FrameRejection::DlcOutOfRange { dlc: dlc.min(u8::MAX as usize) as u8 }.into());
        }

        let data = frame.data();
        let data = data.get(..dlc).unwrap_or(data);
        let data = Payload::from_slice(data)
            .map_err(|()| FrameRejection::PayloadTooLong { len: data.len() })?;

        Ok(Self {
            id: frame.id(),
            dlc: dlc as u8,
            data,
            timestamp,
        })
    }

    #[inline]
    #[must_use]
    pub fn is_extended(&self) -> bool {
        matches!(self.id, embedded_can::Id::Extended(_))
    }
}

/// The NMEA 2000 view of a CAN frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub priority: u8,
    pub pgn: u32,
    pub source: u8,
    pub destination: u8,
    /// Whether the PDU1 (addressed) branch was taken, in which case the PGN
    /// does not carry the PDU specific byte.
    pub is_short_pgn: bool,
    pub timestamp: DateTime<Utc>,
    pub dlc: u8,
    pub data: Payload,
}

/// Extract the NMEA 2000 fields of a frame.
///
/// Fails with [`Error::InvalidFrame`] for standard identifiers and for frames
/// whose declared length does not match the payload.
pub fn decode(id: embedded_can::Id, data: &[u8], dlc: u8, timestamp: DateTime<Utc>) -> Result<DecodedFrame> {
    let id = Id::try_from(id)?;

    if dlc as usize > MAX_DATA_LEN {
        return Err(FrameRejection::DlcOutOfRange { dlc }.into());
    }
    if dlc as usize != data.len() {
        return Err(FrameRejection::DlcMismatch { dlc, len: data.len() }.into());
    }

    Ok(DecodedFrame {
        priority: id.priority(),
        pgn: id.pgn(),
        source: id.source(),
        destination: id.destination(),
        is_short_pgn: matches!(id.format(), crate::Format::Pdu1),
        timestamp,
        dlc,
        data: Payload::from_slice(data).map_err(|()| FrameRejection::PayloadTooLong { len: data.len() })?,
    })
}

impl DecodedFrame {
    pub fn decode(frame: &RawFrame) -> Result<Self> {
        decode(frame.id, &frame.data, frame.dlc, frame.timestamp)
    }

    /// Rebuild the 29-bit identifier the frame was decoded from. The PDU
    /// specific byte comes from `destination` for short PGNs and from the PGN
    /// otherwise.
    #[must_use]
    pub fn id(&self) -> Id {
        Id::new(self.priority, self.pgn, self.source, self.destination)
    }
}

impl TryFrom<&RawFrame> for DecodedFrame {
    type Error = Error;

    fn try_from(frame: &RawFrame) -> Result<Self> {
        Self::decode(frame)
    }
}
