//! Error types for capture header encoding and parsing

use thiserror::Error;

/// Errors that can occur while parsing radiotap or delimiter bytes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Radiotap version other than 0
    #[error("unsupported radiotap version: {0}")]
    UnsupportedVersion(u8),

    /// Declared header length shorter than the fixed preamble
    #[error("invalid radiotap length: {0}")]
    InvalidLength(u16),

    /// Present bits this decoder has no layout for
    #[error("unsupported present bits: 0x{0:08X}")]
    UnsupportedPresent(u32),

    /// A field every capture record carries is absent
    #[error("missing {0} field")]
    MissingField(&'static str),

    /// None of rate, MCS, VHT or HE is present
    #[error("no modulation family block present")]
    MissingFamilyBlock,

    /// More than one of rate, MCS, VHT or HE is present
    #[error("conflicting modulation family blocks: present 0x{0:08X}")]
    ConflictingFamilyBlocks(u32),

    /// A-MPDU delimiter signature mismatch
    #[error("bad delimiter signature: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadSignature { expected: u8, actual: u8 },
}

/// Errors that can occur while building a capture record
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Channel width with no code in the family's bandwidth field
    #[error("{family} capture cannot describe a {width} MHz channel")]
    UnsupportedBandwidth { family: &'static str, width: u16 },

    /// Aggregated frame without a usable subframe delimiter
    #[error("aggregated frame: {0}")]
    Delimiter(#[from] ParseError),
}
