//! Transmit power spectral density
//!
//! Spreads a transmit power over the bins of a [`SpectrumGrid`] following
//! the spectral mask of the modulation family. Masks are expressed in dBr
//! (relative to the in-band peak) and normalized so the integral equals the
//! requested power.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::band::{PowerSpectrum, SpectrumGrid};
use crate::channel::ChannelWidth;
use crate::error::ConfigError;
use crate::mode::{Modulation, TxVector};
use crate::ru;
use crate::units::db_to_ratio;

/// Rejection levels of the transmit spectral mask (dBr)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxMaskConfig {
    /// Level reached at the edge of the occupied band
    pub inner_band_dbr: f64,
    /// Level reached one channel width from the center
    pub outer_band_min_dbr: f64,
    /// Floor reached 1.5 channel widths from the center and beyond
    pub outer_band_max_dbr: f64,
}

impl Default for TxMaskConfig {
    fn default() -> Self {
        Self {
            inner_band_dbr: -20.0,
            outer_band_min_dbr: -28.0,
            outer_band_max_dbr: -40.0,
        }
    }
}

impl TxMaskConfig {
    /// Levels must decrease moving away from the channel
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 >= self.inner_band_dbr
            && self.inner_band_dbr >= self.outer_band_min_dbr
            && self.outer_band_min_dbr >= self.outer_band_max_dbr;
        if !ordered || !self.outer_band_max_dbr.is_finite() {
            return Err(ConfigError::InvalidMask(format!(
                "expected 0 >= {} >= {} >= {}",
                self.inner_band_dbr, self.outer_band_min_dbr, self.outer_band_max_dbr
            )));
        }
        Ok(())
    }

    /// Piecewise-linear OFDM mask at `offset_mhz` from the center
    fn ofdm_dbr(&self, offset_mhz: f64, width_mhz: f64, flat_mhz: f64, edge_mhz: f64) -> f64 {
        let f = offset_mhz.abs();
        let lerp = |from: f64, to: f64, start: f64, end: f64| {
            from + (to - from) * (f - start) / (end - start)
        };
        if f <= flat_mhz {
            0.0
        } else if f <= edge_mhz {
            lerp(0.0, self.inner_band_dbr, flat_mhz, edge_mhz)
        } else if f <= width_mhz {
            lerp(self.inner_band_dbr, self.outer_band_min_dbr, edge_mhz, width_mhz)
        } else if f <= 1.5 * width_mhz {
            lerp(
                self.outer_band_min_dbr,
                self.outer_band_max_dbr,
                width_mhz,
                1.5 * width_mhz,
            )
        } else {
            self.outer_band_max_dbr
        }
    }
}

/// Builds transmit PSDs
#[derive(Debug, Clone, Default)]
pub struct PsdSynthesizer {
    mask: TxMaskConfig,
}

impl PsdSynthesizer {
    pub fn new(mask: TxMaskConfig) -> Result<Self, ConfigError> {
        mask.validate()?;
        Ok(Self { mask })
    }

    pub fn mask(&self) -> &TxMaskConfig {
        &self.mask
    }

    /// PSD of a transmission of `tx_w` watts described by `tx_vector`
    ///
    /// `grid` must be centered on the transmit channel and sized for the
    /// transmit width. With `ofdma_payload` set, the power is confined to the
    /// RU assigned to the HE TB sender.
    pub fn build_mask(
        &self,
        grid: &SpectrumGrid,
        tx_w: f64,
        tx_vector: &TxVector,
        ofdma_payload: bool,
    ) -> Result<PowerSpectrum, ConfigError> {
        let width = tx_vector.channel_width;
        if grid.width() != width {
            return Err(ConfigError::GridMismatch(format!(
                "{} grid for a {} transmission",
                grid.width(),
                width
            )));
        }

        let mut psd = PowerSpectrum::zeros(*grid);

        if ofdma_payload {
            let (sta_id, ru_spec) = tx_vector
                .trigger_based()
                .ok_or(ConfigError::MissingRuAssignment)?;
            let band = ru::ru_band(grid, ru_spec)?;
            let per_bin = tx_w / band.len() as f64;
            for v in &mut psd.values_mut()[band.first..=band.last] {
                *v = per_bin;
            }
            trace!("OFDMA PSD for STA {} on {} bins {}", sta_id, ru_spec, band);
            return Ok(psd);
        }

        let w = width.mhz() as f64;
        let family = tx_vector.class().name();
        let shape: Box<dyn Fn(f64) -> f64 + '_> = match tx_vector.modulation {
            Modulation::Dsss { .. } => {
                if width != ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                Box::new(|f: f64| {
                    let f = f.abs();
                    if f <= 11.0 {
                        0.0
                    } else if f <= 22.0 {
                        -30.0
                    } else {
                        -50.0
                    }
                })
            }
            Modulation::Ofdm { .. } if width <= ChannelWidth::Mhz20 => {
                Box::new(move |f| self.mask.ofdm_dbr(f, w, 0.45 * w, 0.55 * w))
            }
            Modulation::Ofdm { .. } => {
                let n = width.subchannels_20mhz();
                Box::new(move |f| {
                    (0..n)
                        .map(|k| {
                            let center = -w / 2.0 + 10.0 + 20.0 * k as f64;
                            self.mask.ofdm_dbr(f - center, 20.0, 9.0, 11.0)
                        })
                        .fold(f64::NEG_INFINITY, f64::max)
                })
            }
            Modulation::Ht { .. } | Modulation::Vht { .. } => {
                if width < ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                Box::new(move |f| self.mask.ofdm_dbr(f, w, w / 2.0 - 1.0, w / 2.0 + 1.0))
            }
            Modulation::He { .. } => {
                if width < ChannelWidth::Mhz20 {
                    return Err(ConfigError::UnsupportedFamilyWidth { family, width });
                }
                let flat = if width == ChannelWidth::Mhz20 {
                    w / 2.0 - 0.25
                } else {
                    w / 2.0 - 0.5
                };
                Box::new(move |f| self.mask.ofdm_dbr(f, w, flat, w / 2.0 + 0.5))
            }
        };

        for (bin, v) in psd.values_mut().iter_mut().enumerate() {
            *v = db_to_ratio(shape(grid.offset_hz(bin) / 1e6));
        }
        let total = psd.integral();
        if total > 0.0 {
            psd.scale(tx_w / total);
        }
        trace!(
            "{} PSD over {} bins, {:.3e} W",
            family,
            grid.num_bins(),
            tx_w
        );
        Ok(psd)
    }
}
