//! Virtual medium
//!
//! Carries emissions from a transmitter to every other node. Path loss is
//! an input: a fixed default with optional per-link overrides. There is no
//! propagation delay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use wifi_spectrum::units::db_to_ratio;
use wifi_spectrum::{ConfigError, NodeId, PowerSpectrum, SignalObservation, SpectrumGrid};

use crate::transmitter::Emission;

/// Loss of one directed link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkLoss {
    pub from: NodeId,
    pub to: NodeId,
    pub loss_db: f64,
}

/// Medium settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediumConfig {
    /// Loss applied to every link without an override (default 50 dB)
    pub loss_db: f64,
    /// Per-link overrides
    pub links: Vec<LinkLoss>,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            loss_db: 50.0,
            links: Vec::new(),
        }
    }
}

/// Fixed-loss medium shared by all nodes
#[derive(Debug, Clone, Default)]
pub struct VirtualMedium {
    default_loss_db: f64,
    links: HashMap<(NodeId, NodeId), f64>,
}

impl VirtualMedium {
    pub fn new(config: &MediumConfig) -> Self {
        Self {
            default_loss_db: config.loss_db,
            links: config
                .links
                .iter()
                .map(|l| ((l.from, l.to), l.loss_db))
                .collect(),
        }
    }

    /// Override the loss of the link `from` -> `to`
    pub fn set_loss(&mut self, from: NodeId, to: NodeId, loss_db: f64) {
        self.links.insert((from, to), loss_db);
    }

    pub fn loss_db(&self, from: NodeId, to: NodeId) -> f64 {
        self.links
            .get(&(from, to))
            .copied()
            .unwrap_or(self.default_loss_db)
    }

    /// What `to`, tuned to `grid`, observes of `emission`
    pub fn propagate(
        &self,
        emission: &Emission,
        to: NodeId,
        grid: &SpectrumGrid,
    ) -> Result<SignalObservation, ConfigError> {
        let mut psd = emission.psd.convert_to(grid)?;
        psd.scale(db_to_ratio(-self.loss_db(emission.sender, to)));
        Ok(SignalObservation::wifi(
            emission.sender,
            emission.duration,
            psd,
            emission.ppdu,
        ))
    }
}

/// Flat PSD of `power_w` spread over `[center - width/2, center + width/2)`
///
/// Used for non-Wi-Fi interferers, whose power is given as received.
pub fn flat_psd(grid: &SpectrumGrid, center_mhz: f64, width_mhz: f64, power_w: f64) -> PowerSpectrum {
    let mut psd = PowerSpectrum::zeros(*grid);
    let low_hz = (center_mhz - width_mhz / 2.0) * 1e6;
    let high_hz = (center_mhz + width_mhz / 2.0) * 1e6;
    let lit: Vec<usize> = (0..grid.num_bins())
        .filter(|&bin| {
            let f = grid.frequency_hz(bin);
            f >= low_hz && f < high_hz
        })
        .collect();
    if lit.is_empty() {
        return psd;
    }
    let per_bin = power_w / lit.len() as f64;
    let values = psd.values_mut();
    for bin in lit {
        values[bin] = per_bin;
    }
    psd
}
