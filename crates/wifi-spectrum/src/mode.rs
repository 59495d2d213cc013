//! Modulation families and transmission vectors
//!
//! [`Modulation`] is the tagged union of every PHY family the model knows.
//! Encoders and synthesizers match on it exhaustively, so a new family is a
//! compile error everywhere it needs handling.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelWidth, Standard};
use crate::error::ConfigError;
use crate::ru::RuSpec;

/// DSSS / HR-DSSS data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DsssRate {
    Mbps1,
    Mbps2,
    Mbps5_5,
    Mbps11,
}

impl DsssRate {
    pub const fn bps(&self) -> u64 {
        match self {
            DsssRate::Mbps1 => 1_000_000,
            DsssRate::Mbps2 => 2_000_000,
            DsssRate::Mbps5_5 => 5_500_000,
            DsssRate::Mbps11 => 11_000_000,
        }
    }
}

/// Legacy OFDM data rate on a 20 MHz channel
///
/// Half and quarter rate channels scale these down with the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfdmRate {
    Mbps6,
    Mbps9,
    Mbps12,
    Mbps18,
    Mbps24,
    Mbps36,
    Mbps48,
    Mbps54,
}

impl OfdmRate {
    pub const fn bps_20mhz(&self) -> u64 {
        match self {
            OfdmRate::Mbps6 => 6_000_000,
            OfdmRate::Mbps9 => 9_000_000,
            OfdmRate::Mbps12 => 12_000_000,
            OfdmRate::Mbps18 => 18_000_000,
            OfdmRate::Mbps24 => 24_000_000,
            OfdmRate::Mbps36 => 36_000_000,
            OfdmRate::Mbps48 => 48_000_000,
            OfdmRate::Mbps54 => 54_000_000,
        }
    }
}

/// HE PPDU format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeFormat {
    /// Single user
    Su,
    /// Extended range single user
    ErSu,
    /// Downlink multi-user
    Mu,
    /// Uplink trigger-based, sent by `sta_id` on its assigned RU
    Tb { sta_id: u16, ru: RuSpec },
}

/// Modulation family with its family-specific parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Modulation {
    /// 802.11b DSSS / HR-DSSS (CCK)
    Dsss { rate: DsssRate, short_preamble: bool },
    /// Legacy (non-HT) OFDM, including ERP-OFDM
    Ofdm { rate: OfdmRate },
    /// 802.11n high throughput; `mcs` 0-31
    Ht { mcs: u8, greenfield: bool },
    /// 802.11ac very high throughput
    Vht { mcs: u8 },
    /// 802.11ax high efficiency
    He { mcs: u8, format: HeFormat },
}

/// Coarse modulation class, as used by the transmit mask and capture code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulationClass {
    Dsss,
    Ofdm,
    Ht,
    Vht,
    He,
}

impl ModulationClass {
    pub fn name(&self) -> &'static str {
        match self {
            ModulationClass::Dsss => "DSSS",
            ModulationClass::Ofdm => "OFDM",
            ModulationClass::Ht => "HT",
            ModulationClass::Vht => "VHT",
            ModulationClass::He => "HE",
        }
    }
}

impl fmt::Display for ModulationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Modulation {
    pub fn class(&self) -> ModulationClass {
        match self {
            Modulation::Dsss { .. } => ModulationClass::Dsss,
            Modulation::Ofdm { .. } => ModulationClass::Ofdm,
            Modulation::Ht { .. } => ModulationClass::Ht,
            Modulation::Vht { .. } => ModulationClass::Vht,
            Modulation::He { .. } => ModulationClass::He,
        }
    }

    /// Minimum SNR (dB) for the payload to decode
    pub fn min_snr_db(&self) -> f64 {
        const MCS_MIN_SNR: [f64; 12] = [
            2.0, 5.0, 9.0, 11.0, 15.0, 18.0, 20.0, 25.0, 29.0, 31.0, 34.0, 37.0,
        ];
        match self {
            Modulation::Dsss { rate, .. } => match rate {
                DsssRate::Mbps1 => -2.0,
                DsssRate::Mbps2 => 1.0,
                DsssRate::Mbps5_5 => 4.0,
                DsssRate::Mbps11 => 7.0,
            },
            Modulation::Ofdm { rate } => match rate {
                OfdmRate::Mbps6 => 2.0,
                OfdmRate::Mbps9 | OfdmRate::Mbps12 => 5.0,
                OfdmRate::Mbps18 => 9.0,
                OfdmRate::Mbps24 => 11.0,
                OfdmRate::Mbps36 => 15.0,
                OfdmRate::Mbps48 => 18.0,
                OfdmRate::Mbps54 => 20.0,
            },
            Modulation::Ht { mcs, .. } => MCS_MIN_SNR[(*mcs % 8) as usize],
            Modulation::Vht { mcs } | Modulation::He { mcs, .. } => {
                MCS_MIN_SNR[(*mcs as usize).min(MCS_MIN_SNR.len() - 1)]
            }
        }
    }

    /// HE trigger-based uplink portion, if any
    pub fn trigger_based(&self) -> Option<(u16, RuSpec)> {
        match self {
            Modulation::He {
                format: HeFormat::Tb { sta_id, ru },
                ..
            } => Some((*sta_id, *ru)),
            _ => None,
        }
    }
}

/// Parameters a PPDU was transmitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxVector {
    pub modulation: Modulation,
    pub channel_width: ChannelWidth,
    #[serde(default = "default_nss")]
    pub nss: u8,
    #[serde(default = "default_guard_interval")]
    pub guard_interval_ns: u16,
    #[serde(default)]
    pub aggregation: bool,
    #[serde(default)]
    pub stbc: bool,
    /// HT extension spatial streams (0-3)
    #[serde(default)]
    pub ness: u8,
}

fn default_nss() -> u8 {
    1
}

fn default_guard_interval() -> u16 {
    800
}

impl TxVector {
    /// Single stream, long guard interval, no aggregation
    pub fn new(modulation: Modulation, channel_width: ChannelWidth) -> Self {
        Self {
            modulation,
            channel_width,
            nss: 1,
            guard_interval_ns: 800,
            aggregation: false,
            stbc: false,
            ness: 0,
        }
    }

    pub fn with_nss(mut self, nss: u8) -> Self {
        self.nss = nss;
        self
    }

    pub fn with_guard_interval(mut self, ns: u16) -> Self {
        self.guard_interval_ns = ns;
        self
    }

    pub fn with_aggregation(mut self, aggregation: bool) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_stbc(mut self, stbc: bool) -> Self {
        self.stbc = stbc;
        self
    }

    pub fn class(&self) -> ModulationClass {
        self.modulation.class()
    }

    /// HE TB sender and RU, if this is an uplink trigger-based PPDU
    pub fn trigger_based(&self) -> Option<(u16, RuSpec)> {
        self.modulation.trigger_based()
    }

    /// Whether the PPDU is a single-stream legacy short-preamble DSSS frame
    pub fn is_short_preamble(&self) -> bool {
        matches!(
            self.modulation,
            Modulation::Dsss {
                short_preamble: true,
                ..
            }
        )
    }

    /// Check the vector against a standard
    pub fn validate(&self, standard: Standard) -> Result<(), ConfigError> {
        let class = self.class();
        let family = class.name();
        let width = self.channel_width;

        if !standard.supports_width(width) {
            return Err(ConfigError::UnsupportedWidth { standard, width });
        }

        let family_allowed = match class {
            ModulationClass::Dsss => standard.is_2_4ghz(),
            ModulationClass::Ofdm => standard != Standard::Ieee80211b,
            ModulationClass::Ht => matches!(
                standard,
                Standard::Ieee80211n2_4Ghz
                    | Standard::Ieee80211n5Ghz
                    | Standard::Ieee80211ac
                    | Standard::Ieee80211ax2_4Ghz
                    | Standard::Ieee80211ax5Ghz
            ),
            ModulationClass::Vht => {
                matches!(standard, Standard::Ieee80211ac | Standard::Ieee80211ax5Ghz)
            }
            ModulationClass::He => standard.is_he(),
        };
        if !family_allowed {
            return Err(ConfigError::UnsupportedFamily { family, standard });
        }

        let invalid_gi = Err(ConfigError::InvalidGuardInterval {
            family,
            gi_ns: self.guard_interval_ns,
        });
        let invalid_nss = Err(ConfigError::InvalidStreams {
            family,
            nss: self.nss,
        });

        match self.modulation {
            Modulation::Dsss { .. } | Modulation::Ofdm { .. } => {
                if class == ModulationClass::Dsss && width != ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                if self.nss != 1 {
                    return invalid_nss;
                }
                if self.guard_interval_ns != 800 {
                    return invalid_gi;
                }
            }
            Modulation::Ht { mcs, .. } => {
                if mcs > 31 {
                    return Err(ConfigError::InvalidMcs { family, mcs });
                }
                if self.nss != mcs / 8 + 1 {
                    return invalid_nss;
                }
                if width > ChannelWidth::Mhz40 || width < ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                if !matches!(self.guard_interval_ns, 400 | 800) {
                    return invalid_gi;
                }
            }
            Modulation::Vht { mcs } => {
                if mcs > 9 {
                    return Err(ConfigError::InvalidMcs { family, mcs });
                }
                if mcs == 9 && width == ChannelWidth::Mhz20 && !matches!(self.nss, 3 | 6) {
                    return Err(ConfigError::InvalidMcs { family, mcs });
                }
                if !(1..=8).contains(&self.nss) {
                    return invalid_nss;
                }
                if width < ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                if !matches!(self.guard_interval_ns, 400 | 800) {
                    return invalid_gi;
                }
            }
            Modulation::He { mcs, format } => {
                if mcs > 11 {
                    return Err(ConfigError::InvalidMcs { family, mcs });
                }
                if !(1..=8).contains(&self.nss) {
                    return invalid_nss;
                }
                if width < ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                if !matches!(self.guard_interval_ns, 800 | 1600 | 3200) {
                    return invalid_gi;
                }
                match format {
                    HeFormat::ErSu => {
                        if width != ChannelWidth::Mhz20 {
                            return Err(ConfigError::UnsupportedFamilyWidth {
                                family: "HE ER SU",
                                width,
                            });
                        }
                        if mcs > 2 {
                            return Err(ConfigError::InvalidMcs {
                                family: "HE ER SU",
                                mcs,
                            });
                        }
                    }
                    HeFormat::Tb { ru, .. } => {
                        if !ru.is_valid_for(width) {
                            return Err(ConfigError::InvalidRu {
                                ru: ru.to_string(),
                                width,
                            });
                        }
                    }
                    HeFormat::Su | HeFormat::Mu => {}
                }
            }
        }
        Ok(())
    }

    /// Number of long training fields sent for `nss` streams
    fn n_ltf(&self) -> u64 {
        let nss = self.nss.max(1) as u64;
        if nss > 1 && nss % 2 == 1 {
            nss + 1
        } else {
            nss
        }
    }

    /// Airtime of the preamble plus PHY header(s)
    pub fn preamble_and_header_duration(&self) -> Duration {
        let us = match self.modulation {
            Modulation::Dsss { short_preamble, .. } => {
                if short_preamble {
                    96
                } else {
                    192
                }
            }
            Modulation::Ofdm { .. } => match self.channel_width {
                ChannelWidth::Mhz5 => 80,
                ChannelWidth::Mhz10 => 40,
                _ => 20,
            },
            Modulation::Ht { greenfield, .. } => {
                if greenfield {
                    24 + 4 * (self.n_ltf() - 1)
                } else {
                    32 + 4 * self.n_ltf()
                }
            }
            Modulation::Vht { .. } => 36 + 4 * self.n_ltf(),
            Modulation::He { format, .. } => {
                // L-STF + L-LTF, L-SIG, RL-SIG
                let legacy = 16 + 4 + 4;
                let sig_a = if format == HeFormat::ErSu { 16 } else { 8 };
                let sig_b = if format == HeFormat::Mu { 4 } else { 0 };
                let stf = if matches!(format, HeFormat::Tb { .. }) {
                    8
                } else {
                    4
                };
                legacy + sig_a + sig_b + stf + 8 * self.n_ltf()
            }
        };
        Duration::from_micros(us)
    }

    /// Data rate of legacy (DSSS / non-HT OFDM) transmissions in bit/s
    pub fn legacy_data_rate_bps(&self) -> Option<u64> {
        match self.modulation {
            Modulation::Dsss { rate, .. } => Some(rate.bps()),
            Modulation::Ofdm { rate } => {
                let scale = self.channel_width.mhz().min(20) as u64;
                Some(rate.bps_20mhz() * scale / 20)
            }
            Modulation::Ht { .. } | Modulation::Vht { .. } | Modulation::He { .. } => None,
        }
    }
}
