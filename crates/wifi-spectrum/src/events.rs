//! Event stream of a PHY
//!
//! Everything the PHY has to tell its upper layer (decoded frames, failures,
//! state changes, channel busy indications) is buffered as [`PhyEvent`]s and
//! drained by the owner after each callback.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mode::TxVector;
use crate::signal::NodeId;

/// Receive state, without the per-state bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RxStateKind {
    Idle,
    SyncInProgress,
    MultiUserHeader,
    PayloadPending,
}

impl fmt::Display for RxStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RxStateKind::Idle => "IDLE",
            RxStateKind::SyncInProgress => "SYNC",
            RxStateKind::MultiUserHeader => "MU_HEADER",
            RxStateKind::PayloadPending => "PAYLOAD_PENDING",
        };
        f.write_str(name)
    }
}

/// Why a reception did not produce a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RxFailureReason {
    /// Not enough energy over noise to decode, even without interference
    TooWeak,
    /// Lost to a concurrent signal
    Interference,
    /// Decodable, but arrived while the PHY was busy with another reception
    NotSynchronized,
    /// Synchronized, but the payload did not survive
    Corrupted,
}

impl fmt::Display for RxFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RxFailureReason::TooWeak => "too weak",
            RxFailureReason::Interference => "interference",
            RxFailureReason::NotSynchronized => "not synchronized",
            RxFailureReason::Corrupted => "corrupted",
        };
        f.write_str(name)
    }
}

/// Link quality of a successful reception
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    /// Received signal strength over the measurement bands
    pub rssi_dbm: f64,
    /// Duration-weighted average SINR over the payload
    pub sinr_db: f64,
    /// Worst SINR seen over the payload
    pub min_sinr_db: f64,
}

/// Events emitted by a [`SpectrumPhy`](crate::phy::SpectrumPhy)
#[derive(Debug, Clone, PartialEq)]
pub enum PhyEvent {
    // -------------------------------------------------------------------------
    // Air activity
    // -------------------------------------------------------------------------
    /// A signal reached the antenna, before any sensitivity check
    SignalArrival {
        /// Whether the signal is a PPDU this PHY could decode
        decodable: bool,
        /// Originator, if known
        sender: Option<NodeId>,
        /// Total received power over the channel bands
        rx_power_dbm: f64,
        /// Time on air
        duration: Duration,
    },

    /// Energy detection holds the channel busy
    CcaBusy {
        /// Simulation time the channel is expected to clear
        until: Duration,
    },

    // -------------------------------------------------------------------------
    // Reception outcomes
    // -------------------------------------------------------------------------
    /// Preamble synchronization started
    RxStart {
        /// PPDU uid
        uid: u64,
        /// Station whose part of the PPDU is being received (HE TB only)
        sta_id: Option<u16>,
        /// Power over the measurement bands
        rx_power_dbm: f64,
    },

    /// A PPDU (or one station's part of it) was decoded
    RxOk {
        uid: u64,
        sta_id: Option<u16>,
        sender: Option<NodeId>,
        tx_vector: TxVector,
        quality: SignalQuality,
    },

    /// A decodable PPDU was not received
    RxFailed {
        uid: u64,
        sta_id: Option<u16>,
        sender: Option<NodeId>,
        reason: RxFailureReason,
    },

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------
    /// The receive state machine changed state
    StateChanged { from: RxStateKind, to: RxStateKind },
}

impl PhyEvent {
    /// Check if this event closes out a reception
    pub fn is_outcome(&self) -> bool {
        matches!(self, PhyEvent::RxOk { .. } | PhyEvent::RxFailed { .. })
    }

    /// PPDU uid the event refers to, if any
    pub fn uid(&self) -> Option<u64> {
        match self {
            PhyEvent::RxStart { uid, .. }
            | PhyEvent::RxOk { uid, .. }
            | PhyEvent::RxFailed { uid, .. } => Some(*uid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        let failed = PhyEvent::RxFailed {
            uid: 3,
            sta_id: None,
            sender: Some(1),
            reason: RxFailureReason::TooWeak,
        };
        assert!(failed.is_outcome());
        assert_eq!(failed.uid(), Some(3));

        let busy = PhyEvent::CcaBusy {
            until: Duration::from_micros(40),
        };
        assert!(!busy.is_outcome());
        assert_eq!(busy.uid(), None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RxStateKind::MultiUserHeader.to_string(), "MU_HEADER");
        assert_eq!(RxFailureReason::Corrupted.to_string(), "corrupted");
        assert_eq!(
            RxFailureReason::NotSynchronized.to_string(),
            "not synchronized"
        );
    }
}
