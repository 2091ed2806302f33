//! Text serialization of decoded frames.
//!
//! The persisted format is the canboat "plain" format: one comma separated
//! line per physical frame, preceded by a single header line at the top of
//! every newly created file.
//!
//! ```text
//! timestamp,priority,pgn,source,destination,dlc,data
//! 2020-10-04 21:48:20.582346,3,129029,9,255,8,80,2B,B3,6D,48,A0,E2,A8
//! ```

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::frame::{Payload, MAX_DATA_LEN};
use crate::{DecodedFrame, Error, Result};

/// Column names, written once at the top of a new file.
pub const HEADER: &str = "timestamp,priority,pgn,source,destination,dlc,data";

/// UTC, microsecond resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One serialized line, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    line: String,
}

impl LogRecord {
    #[must_use]
    pub fn format(frame: &DecodedFrame) -> Self {
        Self {
            line: format!("{}\n", Plain(frame)),
        }
    }

    /// The header line, terminator included.
    #[must_use]
    pub fn header() -> Self {
        Self {
            line: format!("{HEADER}\n"),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.line
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// Number of bytes this record adds to a file.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.line.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }
}

impl From<&DecodedFrame> for LogRecord {
    fn from(frame: &DecodedFrame) -> Self {
        Self::format(frame)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

struct Plain<'a>(&'a DecodedFrame);

impl fmt::Display for Plain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0;
        write!(
            f,
            "{},{},{},{},{},{}",
            frame.timestamp.format(TIMESTAMP_FORMAT),
            frame.priority,
            frame.pgn,
            frame.source,
            frame.destination,
            frame.dlc,
        )?;
        for byte in &frame.data {
            write!(f, ",{byte:02X}")?;
        }
        Ok(())
    }
}

/// The fields of a persisted line, as read back by downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub timestamp: DateTime<Utc>,
    pub priority: u8,
    pub pgn: u32,
    pub source: u8,
    pub destination: u8,
    pub dlc: u8,
    pub data: Payload,
}

impl FromStr for ParsedRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let mut fields = line.split(',');

        let mut next = |name: &str| {
            fields
                .next()
                .ok_or_else(|| Error::malformed(format!("missing {name} field")))
        };

        let timestamp = next("timestamp")?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| Error::malformed(format!("bad timestamp {timestamp:?}: {e}")))?
            .and_utc();
        let priority = parse_field::<u8>("priority", next("priority")?)?;
        let pgn = parse_field::<u32>("pgn", next("pgn")?)?;
        let source = parse_field::<u8>("source", next("source")?)?;
        let destination = parse_field::<u8>("destination", next("destination")?)?;
        let dlc = parse_field::<u8>("dlc", next("dlc")?)?;

        if priority > 7 {
            return Err(Error::malformed(format!("priority {priority} out of range")));
        }
        if pgn > 0x3ffff {
            return Err(Error::malformed(format!("pgn {pgn} out of range")));
        }
        if dlc as usize > MAX_DATA_LEN {
            return Err(Error::malformed(format!("dlc {dlc} out of range")));
        }

        let mut data = Payload::new();
        for byte in fields {
            let byte = u8::from_str_radix(byte, 16)
                .ok()
                .filter(|_| byte.len() == 2)
                .ok_or_else(|| Error::malformed(format!("bad data byte {byte:?}")))?;
            data.push(byte)
                .map_err(|_| Error::malformed(format!("more than {MAX_DATA_LEN} data bytes")))?;
        }
        if data.len() != dlc as usize {
            return Err(Error::malformed(format!(
                "dlc {dlc} but {} data bytes",
                data.len()
            )));
        }

        Ok(Self {
            timestamp,
            priority,
            pgn,
            source,
            destination,
            dlc,
            data,
        })
    }
}

fn parse_field<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::malformed(format!("bad {name} field {value:?}")))
}

/// Whether `line` is the header line.
#[must_use]
pub fn is_header(line: &str) -> bool {
    line.strip_suffix('\n').unwrap_or(line) == HEADER
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use embedded_can::ExtendedId;
    use proptest::prelude::*;

    use super::{is_header, LogRecord, ParsedRecord, HEADER};
    use crate::frame::decode;
    use crate::Error;

    fn sample_timestamp() -> chrono::DateTime<Utc> {
        NaiveDate::from_ymd_opt(2020, 10, 4)
            .unwrap()
            .and_hms_micro_opt(21, 48, 20, 582_346)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn formats_canboat_plain_line() {
        let frame = decode(
            ExtendedId::new(0x0DF8_0509).unwrap().into(),
            &[0x80, 0x2b, 0xb3, 0x6d, 0x48, 0xa0, 0xe2, 0xa8],
            8,
            sample_timestamp(),
        )
        .unwrap();

        let record = LogRecord::format(&frame);

        assert_eq!(
            record.as_str(),
            "2020-10-04 21:48:20.582346,3,129029,9,255,8,80,2B,B3,6D,48,A0,E2,A8\n"
        );
        assert_eq!(record.len(), 68);
    }

    #[test]
    fn empty_payload_has_no_trailing_comma() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap();
        let frame = decode(ExtendedId::new(0x18EA_2301).unwrap().into(), &[], 0, ts).unwrap();

        let record = LogRecord::format(&frame);

        assert_eq!(record.as_str(), "2021-03-01 12:00:00.000000,6,59904,1,35,0\n");
        let parsed: ParsedRecord = record.as_str().parse().unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn header_is_one_line() {
        let header = LogRecord::header();

        assert_eq!(header.as_str(), "timestamp,priority,pgn,source,destination,dlc,data\n");
        assert!(is_header(header.as_str()));
        assert_eq!(HEADER.split(',').count(), 7);
    }

    #[test]
    fn rejects_data_count_mismatch() {
        let err = "2020-10-04 21:48:20.582346,3,129029,9,255,8,80,2B"
            .parse::<ParsedRecord>()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn rejects_bad_hex_and_missing_fields() {
        assert!("2020-10-04 21:48:20.582346,3,129029,9,255,1,G0"
            .parse::<ParsedRecord>()
            .is_err());
        assert!("2020-10-04 21:48:20.582346,3,129029".parse::<ParsedRecord>().is_err());
        assert!(HEADER.parse::<ParsedRecord>().is_err());
    }

    proptest! {
        #[test]
        fn parsed_line_matches_decoded_frame(
            raw in 0u32..=0x1fff_ffff,
            data in prop::collection::vec(any::<u8>(), 0..=8),
            micros in 0i64..4_000_000_000_000_000,
        ) {
            let ts = Utc.timestamp_micros(micros).unwrap();
            let frame = decode(ExtendedId::new(raw).unwrap().into(), &data, data.len() as u8, ts).unwrap();

            let record = LogRecord::format(&frame);
            prop_assert!(record.as_str().ends_with('\n'));
            prop_assert_eq!(record.as_str().matches('\n').count(), 1);

            let parsed: ParsedRecord = record.as_str().parse().unwrap();
            prop_assert_eq!(parsed.timestamp, frame.timestamp);
            prop_assert_eq!(parsed.priority, frame.priority);
            prop_assert_eq!(parsed.pgn, frame.pgn);
            prop_assert_eq!(parsed.source, frame.source);
            prop_assert_eq!(parsed.destination, frame.destination);
            prop_assert_eq!(parsed.dlc, frame.dlc);
            prop_assert_eq!(&parsed.data[..], &data[..]);
        }
    }
}
