//! Receive state machine
//!
//! One explicit state enum carries all reception bookkeeping. The decision of
//! what to do with an arriving signal is a pure function of the current state
//! ([`decide`]), so every transition can be checked without a scheduler; the
//! PHY applies the decision and owns the side effects.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::events::RxStateKind;
use crate::interference::{BandId, SignalId};
use crate::signal::{NodeId, Ppdu};

/// One reception in progress
#[derive(Debug, Clone, PartialEq)]
pub struct RxContext {
    /// Ledger contribution of the signal being received
    pub signal: SignalId,
    pub ppdu: Ppdu,
    pub sender: Option<NodeId>,
    pub start: Duration,
    pub end: Duration,
    /// Bands the signal is measured over
    pub bands: Vec<BandId>,
    /// Received power over `bands` (W)
    pub rx_power_w: f64,
    /// HE TB sender, for uplink MU parts
    pub sta_id: Option<u16>,
}

impl RxContext {
    /// Timer id of this reception
    pub fn rx_id(&self) -> u64 {
        self.signal.0
    }
}

/// Per-station header context of an uplink MU PPDU
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSlot {
    pub ctx: RxContext,
    /// Set once the header survived evaluation
    pub passed: bool,
}

/// Receive state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RxState {
    /// Nothing being received
    #[default]
    Idle,
    /// Synchronized on a single PPDU
    SyncInProgress { ctx: RxContext },
    /// Receiving the shared preamble of an uplink MU PPDU, per station
    MultiUserHeader {
        uid: u64,
        pending: BTreeMap<u16, HeaderSlot>,
        /// OFDMA payloads that arrived before their header was evaluated
        payloads: BTreeMap<u16, RxContext>,
        ppdu_end: Duration,
    },
    /// Headers done, waiting for (or receiving) the OFDMA payloads
    PayloadPending {
        uid: u64,
        payloads: BTreeMap<u16, RxContext>,
        expected: BTreeSet<u16>,
        ppdu_end: Duration,
    },
}

impl RxState {
    pub fn kind(&self) -> RxStateKind {
        match self {
            RxState::Idle => RxStateKind::Idle,
            RxState::SyncInProgress { .. } => RxStateKind::SyncInProgress,
            RxState::MultiUserHeader { .. } => RxStateKind::MultiUserHeader,
            RxState::PayloadPending { .. } => RxStateKind::PayloadPending,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RxState::Idle)
    }

    /// Uplink MU PPDU this state belongs to, if any
    pub fn mu_uid(&self) -> Option<u64> {
        match self {
            RxState::MultiUserHeader { uid, .. } | RxState::PayloadPending { uid, .. } => {
                Some(*uid)
            }
            _ => None,
        }
    }

    /// Earliest start of any open reception
    pub fn earliest_start(&self) -> Option<Duration> {
        match self {
            RxState::Idle => None,
            RxState::SyncInProgress { ctx } => Some(ctx.start),
            RxState::MultiUserHeader {
                pending, payloads, ..
            } => pending
                .values()
                .map(|s| s.ctx.start)
                .chain(payloads.values().map(|c| c.start))
                .min(),
            RxState::PayloadPending { payloads, .. } => {
                payloads.values().map(|c| c.start).min()
            }
        }
    }
}

/// What to do with an arriving signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not a signal this PHY can decode; energy only
    Foreign,
    /// Decodable, but the PHY is busy with another reception
    Busy,
    /// Synchronize on a single PPDU
    BeginSync,
    /// First station of an uplink MU PPDU; open the header table
    BeginMuHeader,
    /// Another station of the uplink MU PPDU already being received
    JoinMuHeader,
    /// OFDMA payload of a station whose header context is open
    RoutePayload { sta_id: u16 },
    /// OFDMA payload nobody here waits for
    DropMuPayload { uid: u64 },
}

/// Classify an arriving signal
///
/// `ppdu` is `None` for non-decodable energy. `reception_enabled` is false
/// when reception is disabled or the PPDU cannot be handled by this PHY.
pub fn decide(
    state: &RxState,
    ppdu: Option<&Ppdu>,
    duration: Duration,
    ul_mu_receiver: bool,
    reception_enabled: bool,
) -> Decision {
    let ppdu = match ppdu {
        Some(p) if reception_enabled => p,
        _ => return Decision::Foreign,
    };

    let Some((sta_id, _)) = ppdu.tx_vector.trigger_based() else {
        return if state.is_idle() {
            Decision::BeginSync
        } else {
            Decision::Busy
        };
    };

    if ppdu.is_payload_portion(duration) {
        let open = match state {
            RxState::MultiUserHeader { uid, pending, .. } => {
                *uid == ppdu.uid && ul_mu_receiver && pending.contains_key(&sta_id)
            }
            RxState::PayloadPending {
                uid,
                expected,
                payloads,
                ..
            } => *uid == ppdu.uid && expected.contains(&sta_id) && !payloads.contains_key(&sta_id),
            _ => false,
        };
        return if open {
            Decision::RoutePayload { sta_id }
        } else {
            Decision::DropMuPayload { uid: ppdu.uid }
        };
    }

    match state {
        RxState::Idle => Decision::BeginMuHeader,
        RxState::MultiUserHeader { uid, pending, .. }
            if *uid == ppdu.uid && !pending.contains_key(&sta_id) =>
        {
            Decision::JoinMuHeader
        }
        _ => Decision::Busy,
    }
}
