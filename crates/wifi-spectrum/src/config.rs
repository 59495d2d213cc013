//! PHY configuration

use serde::{Deserialize, Serialize};

use crate::band::SpectrumGrid;
use crate::channel::{ChannelWidth, Standard};
use crate::error::ConfigError;
use crate::psd::TxMaskConfig;

/// Configuration of a [`SpectrumPhy`](crate::phy::SpectrumPhy)
///
/// Every field has a default, so a scenario file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyConfig {
    /// PHY standard (default 802.11ax, 5 GHz)
    pub standard: Standard,
    /// Channel width; the standard's default when unset
    pub channel_width: Option<ChannelWidth>,
    /// Center frequency (MHz); the standard's default when unset
    pub frequency_mhz: Option<u16>,
    /// Signals weaker than this are ignored outright (default -101 dBm)
    pub rx_sensitivity_dbm: f64,
    /// Energy detection threshold for CCA on the primary channel (default -62 dBm)
    pub cca_ed_threshold_dbm: f64,
    /// Receive antenna gain (default 0 dB)
    pub rx_gain_db: f64,
    /// Receiver noise figure (default 7 dB)
    pub noise_figure_db: f64,
    /// Minimum SINR over the preamble to stay synchronized (default 4 dB)
    pub preamble_detection_snr_db: f64,
    /// Transmit spectral mask rejection levels
    pub tx_mask: TxMaskConfig,
    /// Treat every signal as foreign energy
    pub disable_reception: bool,
    /// This PHY triggered uplink MU transmissions and expects their payloads
    pub ul_mu_receiver: bool,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            standard: Standard::Ieee80211ax5Ghz,
            channel_width: None,
            frequency_mhz: None,
            rx_sensitivity_dbm: -101.0,
            cca_ed_threshold_dbm: -62.0,
            rx_gain_db: 0.0,
            noise_figure_db: 7.0,
            preamble_detection_snr_db: 4.0,
            tx_mask: TxMaskConfig::default(),
            disable_reception: false,
            ul_mu_receiver: false,
        }
    }
}

impl PhyConfig {
    /// Default configuration for `standard`
    pub fn for_standard(standard: Standard) -> Self {
        Self {
            standard,
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: ChannelWidth) -> Self {
        self.channel_width = Some(width);
        self
    }

    pub fn with_frequency(mut self, mhz: u16) -> Self {
        self.frequency_mhz = Some(mhz);
        self
    }

    /// Effective channel width
    pub fn width(&self) -> ChannelWidth {
        self.channel_width
            .unwrap_or_else(|| self.standard.default_width())
    }

    /// Effective center frequency (MHz)
    pub fn frequency(&self) -> u16 {
        self.frequency_mhz
            .unwrap_or_else(|| self.standard.default_frequency_mhz())
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.width();
        if !self.standard.supports_width(width) {
            return Err(ConfigError::UnsupportedWidth {
                standard: self.standard,
                width,
            });
        }
        self.tx_mask.validate()
    }

    /// Spectrum grid of the configured channel
    pub fn grid(&self) -> Result<SpectrumGrid, ConfigError> {
        let width = self.width();
        SpectrumGrid::new(
            self.frequency(),
            width,
            self.standard.band_bandwidth_hz(),
            width.guard_mhz(),
        )
    }
}
