//! Channel widths and PHY standards
//!
//! The standard fixes the elementary bin width used to slice the spectrum
//! (one OFDM subcarrier spacing) and the set of channel widths a PHY may be
//! configured with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Channel width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelWidth {
    /// 5 MHz (quarter-rate OFDM)
    Mhz5,
    /// 10 MHz (half-rate OFDM)
    Mhz10,
    /// 20 MHz
    Mhz20,
    /// 40 MHz
    Mhz40,
    /// 80 MHz
    Mhz80,
    /// 160 MHz
    Mhz160,
}

impl ChannelWidth {
    /// Width in MHz
    pub const fn mhz(&self) -> u16 {
        match self {
            ChannelWidth::Mhz5 => 5,
            ChannelWidth::Mhz10 => 10,
            ChannelWidth::Mhz20 => 20,
            ChannelWidth::Mhz40 => 40,
            ChannelWidth::Mhz80 => 80,
            ChannelWidth::Mhz160 => 160,
        }
    }

    /// Width in Hz
    pub const fn hz(&self) -> u64 {
        self.mhz() as u64 * 1_000_000
    }

    /// Parse a width given in MHz
    pub fn from_mhz(mhz: u16) -> Result<Self, ConfigError> {
        match mhz {
            5 => Ok(ChannelWidth::Mhz5),
            10 => Ok(ChannelWidth::Mhz10),
            20 => Ok(ChannelWidth::Mhz20),
            40 => Ok(ChannelWidth::Mhz40),
            80 => Ok(ChannelWidth::Mhz80),
            160 => Ok(ChannelWidth::Mhz160),
            other => Err(ConfigError::InvalidWidthMhz(other)),
        }
    }

    /// Number of 20 MHz sub-channels (zero for narrow channels)
    pub const fn subchannels_20mhz(&self) -> u16 {
        self.mhz() / 20
    }

    /// Guard band modeled on each side of the channel (MHz)
    ///
    /// The modeled span reaches the outermost point of the transmit
    /// spectrum mask, which is one channel width beyond each edge.
    pub const fn guard_mhz(&self) -> u16 {
        self.mhz()
    }
}

impl fmt::Display for ChannelWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

/// 802.11 PHY standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standard {
    /// 802.11a (5 GHz OFDM)
    Ieee80211a,
    /// 802.11b (2.4 GHz DSSS/HR-DSSS)
    Ieee80211b,
    /// 802.11g (2.4 GHz ERP-OFDM and DSSS)
    Ieee80211g,
    /// 802.11p-style 10 MHz OFDM
    Ieee80211_10Mhz,
    /// 5 MHz OFDM
    Ieee80211_5Mhz,
    /// 802.11n in the 2.4 GHz band
    Ieee80211n2_4Ghz,
    /// 802.11n in the 5 GHz band
    Ieee80211n5Ghz,
    /// 802.11ac
    Ieee80211ac,
    /// 802.11ax in the 2.4 GHz band
    Ieee80211ax2_4Ghz,
    /// 802.11ax in the 5 GHz band
    Ieee80211ax5Ghz,
}

impl Standard {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Standard::Ieee80211a => "802.11a",
            Standard::Ieee80211b => "802.11b",
            Standard::Ieee80211g => "802.11g",
            Standard::Ieee80211_10Mhz => "802.11 10 MHz",
            Standard::Ieee80211_5Mhz => "802.11 5 MHz",
            Standard::Ieee80211n2_4Ghz => "802.11n (2.4 GHz)",
            Standard::Ieee80211n5Ghz => "802.11n (5 GHz)",
            Standard::Ieee80211ac => "802.11ac",
            Standard::Ieee80211ax2_4Ghz => "802.11ax (2.4 GHz)",
            Standard::Ieee80211ax5Ghz => "802.11ax (5 GHz)",
        }
    }

    /// Width of one elementary spectrum bin in Hz
    pub const fn band_bandwidth_hz(&self) -> u32 {
        match self {
            Standard::Ieee80211a
            | Standard::Ieee80211b
            | Standard::Ieee80211g
            | Standard::Ieee80211n2_4Ghz
            | Standard::Ieee80211n5Ghz
            | Standard::Ieee80211ac => 312_500,
            Standard::Ieee80211_10Mhz => 156_250,
            Standard::Ieee80211_5Mhz
            | Standard::Ieee80211ax2_4Ghz
            | Standard::Ieee80211ax5Ghz => 78_125,
        }
    }

    /// Channel widths a PHY running this standard can be tuned to
    pub fn supported_widths(&self) -> &'static [ChannelWidth] {
        use ChannelWidth::*;
        match self {
            Standard::Ieee80211a | Standard::Ieee80211b | Standard::Ieee80211g => &[Mhz20],
            Standard::Ieee80211_10Mhz => &[Mhz10],
            Standard::Ieee80211_5Mhz => &[Mhz5],
            Standard::Ieee80211n2_4Ghz
            | Standard::Ieee80211n5Ghz
            | Standard::Ieee80211ax2_4Ghz => &[Mhz20, Mhz40],
            Standard::Ieee80211ac | Standard::Ieee80211ax5Ghz => &[Mhz20, Mhz40, Mhz80, Mhz160],
        }
    }

    /// Whether `width` is usable with this standard
    pub fn supports_width(&self, width: ChannelWidth) -> bool {
        self.supported_widths().contains(&width)
    }

    /// Default channel width
    pub fn default_width(&self) -> ChannelWidth {
        match self {
            Standard::Ieee80211_10Mhz => ChannelWidth::Mhz10,
            Standard::Ieee80211_5Mhz => ChannelWidth::Mhz5,
            _ => ChannelWidth::Mhz20,
        }
    }

    /// Default center frequency in MHz
    pub fn default_frequency_mhz(&self) -> u16 {
        match self {
            Standard::Ieee80211b
            | Standard::Ieee80211g
            | Standard::Ieee80211n2_4Ghz
            | Standard::Ieee80211ax2_4Ghz => 2412,
            Standard::Ieee80211_10Mhz | Standard::Ieee80211_5Mhz => 5860,
            Standard::Ieee80211a
            | Standard::Ieee80211n5Ghz
            | Standard::Ieee80211ac
            | Standard::Ieee80211ax5Ghz => 5180,
        }
    }

    /// 802.11ax standards also track every resource unit band
    pub fn is_he(&self) -> bool {
        matches!(self, Standard::Ieee80211ax2_4Ghz | Standard::Ieee80211ax5Ghz)
    }

    /// Standards operating in the 2.4 GHz band (DSSS capable)
    pub fn is_2_4ghz(&self) -> bool {
        matches!(
            self,
            Standard::Ieee80211b
                | Standard::Ieee80211g
                | Standard::Ieee80211n2_4Ghz
                | Standard::Ieee80211ax2_4Ghz
        )
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_from_mhz() {
        assert_eq!(ChannelWidth::from_mhz(80).unwrap(), ChannelWidth::Mhz80);
        assert_eq!(
            ChannelWidth::from_mhz(22),
            Err(ConfigError::InvalidWidthMhz(22))
        );
    }

    #[test]
    fn test_bin_width_divides_supported_widths() {
        let standards = [
            Standard::Ieee80211a,
            Standard::Ieee80211b,
            Standard::Ieee80211g,
            Standard::Ieee80211_10Mhz,
            Standard::Ieee80211_5Mhz,
            Standard::Ieee80211n2_4Ghz,
            Standard::Ieee80211n5Ghz,
            Standard::Ieee80211ac,
            Standard::Ieee80211ax2_4Ghz,
            Standard::Ieee80211ax5Ghz,
        ];
        for standard in standards {
            assert!(standard.supports_width(standard.default_width()));
            for width in standard.supported_widths() {
                assert_eq!(
                    width.hz() % standard.band_bandwidth_hz() as u64,
                    0,
                    "{} / {}",
                    standard,
                    width
                );
            }
        }
    }

    #[test]
    fn test_he_standards() {
        assert!(Standard::Ieee80211ax5Ghz.is_he());
        assert!(!Standard::Ieee80211ac.is_he());
        assert_eq!(Standard::Ieee80211ax5Ghz.band_bandwidth_hz(), 78_125);
    }
}
