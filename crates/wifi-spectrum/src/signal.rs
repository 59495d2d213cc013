//! Signals arriving at a PHY

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::band::PowerSpectrum;
use crate::mode::TxVector;

/// Identifier of a simulated device
pub type NodeId = u32;

/// A Wi-Fi PPDU as seen on the air
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ppdu {
    /// Transmission-unique id; shared by every part of an uplink MU PPDU
    pub uid: u64,
    pub tx_vector: TxVector,
    /// Airtime of the whole PPDU
    pub duration: Duration,
}

impl Ppdu {
    pub fn new(uid: u64, tx_vector: TxVector, duration: Duration) -> Self {
        Self {
            uid,
            tx_vector,
            duration,
        }
    }

    /// Airtime left once the preamble and PHY headers are on the air
    pub fn payload_duration(&self) -> Duration {
        self.duration
            .saturating_sub(self.tx_vector.preamble_and_header_duration())
    }

    /// Whether an observation lasting `duration` carries only the payload
    ///
    /// HE TB PPDUs are emitted in two parts; the second (OFDMA) part starts
    /// after the shared preamble and lasts exactly the payload duration.
    pub fn is_payload_portion(&self, duration: Duration) -> bool {
        self.tx_vector.trigger_based().is_some()
            && duration == self.payload_duration()
            && duration != self.duration
    }
}

/// One signal as delivered to a receiving PHY
#[derive(Debug, Clone, PartialEq)]
pub struct SignalObservation {
    /// Originator, absent for non-cooperating interferers
    pub sender: Option<NodeId>,
    /// How long the signal stays on the air from now
    pub duration: Duration,
    /// Received power per elementary bin (W)
    pub psd: PowerSpectrum,
    /// Present when the signal is a Wi-Fi PPDU the PHY may decode
    pub ppdu: Option<Ppdu>,
}

impl SignalObservation {
    /// Non-decodable energy, such as a microwave oven or a radar pulse
    pub fn foreign(duration: Duration, psd: PowerSpectrum) -> Self {
        Self {
            sender: None,
            duration,
            psd,
            ppdu: None,
        }
    }

    /// A decodable Wi-Fi signal
    pub fn wifi(sender: NodeId, duration: Duration, psd: PowerSpectrum, ppdu: Ppdu) -> Self {
        Self {
            sender: Some(sender),
            duration,
            psd,
            ppdu: Some(ppdu),
        }
    }

    pub fn is_decodable(&self) -> bool {
        self.ppdu.is_some()
    }
}
