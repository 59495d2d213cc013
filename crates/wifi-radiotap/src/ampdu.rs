//! A-MPDU subframe delimiter
//!
//! Every MPDU inside an aggregate is preceded by a four byte delimiter:
//!
//! ```text
//! [eof:1 | reserved:1 | length:14] (u16 LE)  [crc u8]  [signature 0x4E]
//! ```
//!
//! Capture records describe the MPDU alone, so the encoder strips the
//! delimiter and trims the frame to the announced length.

use crate::error::ParseError;

/// Size of the delimiter on the wire
pub const DELIMITER_LEN: usize = 4;
/// Delimiter signature byte (ASCII 'N')
pub const DELIMITER_SIGNATURE: u8 = 0x4E;
/// CRC value written by the simulator
pub const DELIMITER_CRC: u8 = 1;
/// Largest MPDU length the 14-bit field can carry
pub const MAX_MPDU_LEN: u16 = 0x3FFF;

const EOF_BIT: u16 = 0x8000;

/// Position of an MPDU relative to its aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MpduType {
    /// Not aggregated
    #[default]
    Normal,
    /// Sole MPDU of an aggregate
    Single,
    First,
    Middle,
    Last,
}

/// Aggregation metadata handed to the capture encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MpduInfo {
    pub mpdu_type: MpduType,
    /// A-MPDU reference number shared by every MPDU of one aggregate
    pub reference: u32,
}

impl MpduInfo {
    pub fn new(mpdu_type: MpduType, reference: u32) -> Self {
        Self {
            mpdu_type,
            reference,
        }
    }
}

/// Parsed subframe delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmpduSubframeHeader {
    /// MPDU length in bytes (14 bits)
    pub length: u16,
    /// End-of-frame flag
    pub eof: bool,
    pub crc: u8,
    pub signature: u8,
}

impl AmpduSubframeHeader {
    /// Delimiter for an MPDU of `length` bytes
    ///
    /// Lengths wider than 14 bits are masked, as on the wire.
    pub fn new(length: u16, eof: bool) -> Self {
        Self {
            length: length & MAX_MPDU_LEN,
            eof,
            crc: DELIMITER_CRC,
            signature: DELIMITER_SIGNATURE,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> [u8; DELIMITER_LEN] {
        let mut field = self.length & MAX_MPDU_LEN;
        if self.eof {
            field |= EOF_BIT;
        }
        let [lo, hi] = field.to_le_bytes();
        [lo, hi, self.crc, self.signature]
    }

    /// Decode from the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < DELIMITER_LEN {
            return Err(ParseError::Incomplete {
                needed: DELIMITER_LEN - data.len(),
            });
        }
        if data[3] != DELIMITER_SIGNATURE {
            return Err(ParseError::BadSignature {
                expected: DELIMITER_SIGNATURE,
                actual: data[3],
            });
        }
        let field = u16::from_le_bytes([data[0], data[1]]);
        Ok(Self {
            length: field & MAX_MPDU_LEN,
            eof: field & EOF_BIT != 0,
            crc: data[2],
            signature: data[3],
        })
    }
}

/// Prefix an MPDU with its delimiter
pub fn prepend_delimiter(mpdu: &[u8], eof: bool) -> Vec<u8> {
    let length = u16::try_from(mpdu.len()).unwrap_or(MAX_MPDU_LEN);
    let mut out = Vec::with_capacity(DELIMITER_LEN + mpdu.len());
    out.extend_from_slice(&AmpduSubframeHeader::new(length, eof).encode());
    out.extend_from_slice(mpdu);
    out
}

/// Split a delimited subframe into its delimiter and the MPDU bytes
///
/// Bytes past the announced length (padding, following subframes) are
/// not returned.
pub fn strip_delimiter(data: &[u8]) -> Result<(AmpduSubframeHeader, &[u8]), ParseError> {
    let header = AmpduSubframeHeader::decode(data)?;
    let body = &data[DELIMITER_LEN..];
    let length = header.length as usize;
    if body.len() < length {
        return Err(ParseError::Incomplete {
            needed: length - body.len(),
        });
    }
    Ok((header, &body[..length]))
}
