//! Virtual transmitter
//!
//! Turns a PPDU into the emissions that go on the air. Most PPDUs are one
//! emission for their whole airtime. An HE trigger-based PPDU is two: the
//! shared preamble spread over the whole channel, then the OFDMA payload
//! confined to the sender's resource unit.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use wifi_spectrum::units::{db_to_ratio, dbm_to_w};
use wifi_spectrum::{
    ChannelWidth, NodeId, PowerSpectrum, Ppdu, PsdSynthesizer, SpectrumGrid, Standard,
    TxMaskConfig,
};

use crate::error::SimError;

/// Transmit side settings of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitterConfig {
    /// Conducted transmit power (default 16.0206 dBm, i.e. 40 mW)
    pub tx_power_dbm: f64,
    /// Transmit antenna gain (default 0 dB)
    pub tx_gain_db: f64,
    /// Spectral mask rejection levels
    pub tx_mask: TxMaskConfig,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: 16.0206,
            tx_gain_db: 0.0,
            tx_mask: TxMaskConfig::default(),
        }
    }
}

/// One contiguous piece of a transmission
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub sender: NodeId,
    /// Start relative to the start of the PPDU
    pub offset: Duration,
    pub duration: Duration,
    /// Radiated power per bin, on the transmitter's grid (W)
    pub psd: PowerSpectrum,
    pub ppdu: Ppdu,
}

/// Transmit chain of one node
#[derive(Debug, Clone)]
pub struct VirtualTransmitter {
    node: NodeId,
    standard: Standard,
    frequency_mhz: u16,
    config: TransmitterConfig,
    synthesizer: PsdSynthesizer,
}

impl VirtualTransmitter {
    pub fn new(
        node: NodeId,
        standard: Standard,
        frequency_mhz: u16,
        config: TransmitterConfig,
    ) -> Result<Self, SimError> {
        let synthesizer = PsdSynthesizer::new(config.tx_mask)?;
        Ok(Self {
            node,
            standard,
            frequency_mhz,
            config,
            synthesizer,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn frequency_mhz(&self) -> u16 {
        self.frequency_mhz
    }

    /// Retune to another channel center
    pub fn set_frequency(&mut self, mhz: u16) {
        self.frequency_mhz = mhz;
    }

    /// Radiated power: conducted power plus antenna gain (W)
    pub fn tx_power_w(&self) -> f64 {
        dbm_to_w(self.config.tx_power_dbm) * db_to_ratio(self.config.tx_gain_db)
    }

    fn grid(&self, width: ChannelWidth) -> Result<SpectrumGrid, SimError> {
        Ok(SpectrumGrid::new(
            self.frequency_mhz,
            width,
            self.standard.band_bandwidth_hz(),
            width.guard_mhz(),
        )?)
    }

    /// Emissions making up `ppdu`, in airtime order
    pub fn transmit(&self, ppdu: Ppdu) -> Result<Vec<Emission>, SimError> {
        let tx = &ppdu.tx_vector;
        tx.validate(self.standard)?;
        let grid = self.grid(tx.channel_width)?;
        let tx_w = self.tx_power_w();

        if tx.trigger_based().is_none() {
            debug!(
                "Node {} transmits PPDU {} ({}, {}) for {:?}",
                self.node,
                ppdu.uid,
                tx.class(),
                tx.channel_width,
                ppdu.duration
            );
            return Ok(vec![Emission {
                sender: self.node,
                offset: Duration::ZERO,
                duration: ppdu.duration,
                psd: self.synthesizer.build_mask(&grid, tx_w, tx, false)?,
                ppdu,
            }]);
        }

        let header = tx.preamble_and_header_duration().min(ppdu.duration);
        let payload = ppdu.payload_duration();
        debug!(
            "Node {} transmits HE TB PPDU {}: {:?} preamble, {:?} OFDMA payload",
            self.node, ppdu.uid, header, payload
        );

        let mut emissions = vec![Emission {
            sender: self.node,
            offset: Duration::ZERO,
            duration: header,
            psd: self.synthesizer.build_mask(&grid, tx_w, tx, false)?,
            ppdu,
        }];
        if !payload.is_zero() {
            emissions.push(Emission {
                sender: self.node,
                offset: header,
                duration: payload,
                psd: self.synthesizer.build_mask(&grid, tx_w, tx, true)?,
                ppdu,
            });
        }
        Ok(emissions)
    }
}
