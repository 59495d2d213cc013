//! Decode evaluation
//!
//! Turns the SINR history of a reception into an outcome. The checks run in
//! a fixed order: a signal that would fail even on a quiet channel is
//! [`TooWeak`](RxFailureReason::TooWeak); one that loses its preamble to
//! other energy failed on
//! [`Interference`](RxFailureReason::Interference); one that kept sync but
//! whose payload dipped below the modulation's requirement is
//! [`Corrupted`](RxFailureReason::Corrupted).

use crate::events::{RxFailureReason, SignalQuality};
use crate::interference::SinrChunk;
use crate::units::{ratio_to_db, w_to_dbm};

/// SINR requirements of one reception
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeThresholds {
    /// Needed over the preamble to detect and hold sync (dB)
    pub preamble_db: f64,
    /// Needed over the payload by the modulation (dB)
    pub payload_db: f64,
}

impl DecodeThresholds {
    fn quiet_channel_db(&self) -> f64 {
        self.preamble_db.max(self.payload_db)
    }
}

fn min_sinr_db(chunks: &[SinrChunk]) -> Option<f64> {
    chunks
        .iter()
        .map(|c| ratio_to_db(c.sinr))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}

/// Duration-weighted mean of the linear SINR
fn mean_sinr(chunks: &[SinrChunk]) -> Option<f64> {
    let total: f64 = chunks.iter().map(|c| c.duration().as_secs_f64()).sum();
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = chunks
        .iter()
        .map(|c| c.sinr * c.duration().as_secs_f64())
        .sum();
    Some(weighted / total)
}

/// Check the preamble portion of a reception
///
/// `snr` is the linear signal-to-noise ratio without interference.
pub fn check_preamble(
    snr: f64,
    preamble: &[SinrChunk],
    thresholds: &DecodeThresholds,
) -> Result<(), RxFailureReason> {
    if ratio_to_db(snr) < thresholds.quiet_channel_db() {
        return Err(RxFailureReason::TooWeak);
    }
    match min_sinr_db(preamble) {
        Some(worst) if worst < thresholds.preamble_db => Err(RxFailureReason::Interference),
        _ => Ok(()),
    }
}

/// Check the payload portion and summarize the link quality
pub fn check_payload(
    snr: f64,
    payload: &[SinrChunk],
    thresholds: &DecodeThresholds,
    rx_power_w: f64,
) -> Result<SignalQuality, RxFailureReason> {
    if ratio_to_db(snr) < thresholds.payload_db {
        return Err(RxFailureReason::TooWeak);
    }
    let worst = min_sinr_db(payload).unwrap_or_else(|| ratio_to_db(snr));
    if worst < thresholds.payload_db {
        return Err(RxFailureReason::Corrupted);
    }
    let mean = mean_sinr(payload).unwrap_or(snr);
    Ok(SignalQuality {
        rssi_dbm: w_to_dbm(rx_power_w),
        sinr_db: ratio_to_db(mean),
        min_sinr_db: worst,
    })
}

/// Evaluate a whole single-user reception
pub fn assess(
    snr: f64,
    preamble: &[SinrChunk],
    payload: &[SinrChunk],
    thresholds: &DecodeThresholds,
    rx_power_w: f64,
) -> Result<SignalQuality, RxFailureReason> {
    check_preamble(snr, preamble, thresholds)?;
    check_payload(snr, payload, thresholds, rx_power_w)
}
