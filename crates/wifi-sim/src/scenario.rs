//! JSON scenarios
//!
//! A scenario lists the nodes, the medium and the timed transmissions of one
//! run. Everything but the node list has a default:
//!
//! ```json
//! {
//!   "medium": { "loss_db": 60.0 },
//!   "nodes": [ { "id": 1 }, { "id": 2, "capture": true } ],
//!   "transmissions": [
//!     {
//!       "at_us": 0,
//!       "sender": 1,
//!       "duration_us": 200,
//!       "tx_vector": {
//!         "modulation": { "family": "he", "mcs": 3, "format": "Su" },
//!         "channel_width": "Mhz20"
//!       },
//!       "payload": "hello"
//!     }
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use wifi_radiotap::MpduInfo;
use wifi_spectrum::{NodeId, Ppdu, TxVector};

use crate::error::SimError;
use crate::medium::{MediumConfig, VirtualMedium};
use crate::simulator::{ForeignSignal, Frame, NodeConfig, Simulator};

/// One node of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(flatten)]
    pub config: NodeConfig,
}

/// One PPDU to send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionSpec {
    pub at_us: u64,
    pub sender: NodeId,
    /// Shared by every station of one uplink MU PPDU; assigned when absent
    #[serde(default)]
    pub uid: Option<u64>,
    pub tx_vector: TxVector,
    pub duration_us: u64,
    /// MPDU body, as text
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub mpdu: MpduInfo,
}

/// Non-Wi-Fi energy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfererSpec {
    pub at_us: u64,
    pub duration_us: u64,
    pub center_mhz: f64,
    pub width_mhz: f64,
    /// Power received at every node
    pub power_dbm: f64,
}

/// A complete run description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub medium: MediumConfig,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub transmissions: Vec<TransmissionSpec>,
    #[serde(default)]
    pub interferers: Vec<InterfererSpec>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a simulator with every node added and every event queued
    pub fn build(&self) -> Result<Simulator, SimError> {
        let mut sim = Simulator::new(VirtualMedium::new(&self.medium));
        for node in &self.nodes {
            sim.add_node(node.id, node.config.clone())?;
        }

        let mut next_uid = self
            .transmissions
            .iter()
            .filter_map(|t| t.uid)
            .max()
            .map_or(1, |max| max + 1);

        for t in &self.transmissions {
            let uid = t.uid.unwrap_or_else(|| {
                next_uid += 1;
                next_uid - 1
            });
            let ppdu = Ppdu::new(uid, t.tx_vector, Duration::from_micros(t.duration_us));
            let frame = Frame {
                mpdu: t.payload.as_bytes().to_vec(),
                info: t.mpdu,
            };
            sim.schedule_ppdu(Duration::from_micros(t.at_us), t.sender, ppdu, frame)?;
        }

        for i in &self.interferers {
            sim.schedule_foreign(
                Duration::from_micros(i.at_us),
                ForeignSignal {
                    center_mhz: i.center_mhz,
                    width_mhz: i.width_mhz,
                    power_dbm: i.power_dbm,
                    duration: Duration::from_micros(i.duration_us),
                },
            );
        }

        Ok(sim)
    }

    /// Build and run to completion
    pub fn run(&self) -> Result<Simulator, SimError> {
        let mut sim = self.build()?;
        sim.run()?;
        Ok(sim)
    }
}
