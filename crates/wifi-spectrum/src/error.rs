//! Error types for PHY configuration
//!
//! Everything in here describes a setup bug: a channel, standard or
//! transmission vector that the model cannot represent. Per-signal decode
//! outcomes are not errors; they are reported through
//! [`PhyEvent::RxFailed`](crate::events::PhyEvent::RxFailed).

use thiserror::Error;

use crate::channel::{ChannelWidth, Standard};

/// Errors raised while configuring channels, bands and transmissions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Channel width not supported by the configured standard
    #[error("{width} not supported by {standard}")]
    UnsupportedWidth {
        standard: Standard,
        width: ChannelWidth,
    },

    /// Channel width not supported by a modulation family
    #[error("{family} cannot be transmitted on a {width} channel")]
    UnsupportedFamilyWidth {
        family: &'static str,
        width: ChannelWidth,
    },

    /// Modulation family not available under the configured standard
    #[error("{family} not available with {standard}")]
    UnsupportedFamily {
        family: &'static str,
        standard: Standard,
    },

    /// Channel width value does not name a known width
    #[error("invalid channel width: {0} MHz")]
    InvalidWidthMhz(u16),

    /// Sub-band index lies outside the channel
    #[error("band index {index} of width {band_mhz} MHz is out of a {channel_mhz} MHz channel")]
    BandIndexOutOfRange {
        band_mhz: u16,
        index: u16,
        channel_mhz: u16,
    },

    /// Bin counts must be odd to keep the grid symmetric about DC
    #[error("even bin count {0} breaks symmetry around the center bin")]
    EvenBinCount(usize),

    /// Elementary bin width must divide the channel width
    #[error("bin width {bin_hz} Hz does not divide {width_mhz} MHz")]
    BinWidthMismatch { bin_hz: u32, width_mhz: u16 },

    /// Resource unit not defined for this channel width
    #[error("RU {ru} does not exist in a {width} channel")]
    InvalidRu { ru: String, width: ChannelWidth },

    /// Trigger-based payload requested without an RU assignment
    #[error("OFDMA payload requires an HE TB transmission with an RU assignment")]
    MissingRuAssignment,

    /// MCS index out of range for the family
    #[error("MCS {mcs} invalid for {family}")]
    InvalidMcs { family: &'static str, mcs: u8 },

    /// Spatial stream count out of range for the family
    #[error("{nss} spatial streams invalid for {family}")]
    InvalidStreams { family: &'static str, nss: u8 },

    /// Guard interval not defined for the family
    #[error("guard interval {gi_ns} ns invalid for {family}")]
    InvalidGuardInterval { family: &'static str, gi_ns: u16 },

    /// Transmit mask rejection levels out of order
    #[error("invalid TX mask: {0}")]
    InvalidMask(String),

    /// Two spectra cannot be mapped onto each other
    #[error("spectrum grids are incompatible: {0}")]
    GridMismatch(String),
}
