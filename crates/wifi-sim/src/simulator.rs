//! Simulation driver
//!
//! Owns the nodes, the medium and the event queue, and pumps events until
//! the queue runs dry. Every PHY event is logged with its time and node;
//! nodes with capture enabled also get a radiotap record for each frame
//! they decode.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wifi_radiotap::ampdu::prepend_delimiter;
use wifi_radiotap::{encode, CaptureRecord, MpduInfo, MpduType};
use wifi_spectrum::units::{dbm_to_w, thermal_noise_w, w_to_dbm};
use wifi_spectrum::{
    NodeId, PhyConfig, PhyEvent, Ppdu, SignalObservation, SpectrumPhy, TxVector,
};

use crate::error::SimError;
use crate::medium::{flat_psd, VirtualMedium};
use crate::scheduler::{EventQueue, NodeScheduler, NodeTimer};
use crate::transmitter::{Emission, TransmitterConfig, VirtualTransmitter};

/// Settings of one simulated node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub phy: PhyConfig,
    pub transmitter: TransmitterConfig,
    /// Record a radiotap capture of every decoded frame
    pub capture: bool,
}

/// Non-Wi-Fi energy, given as power received at every node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForeignSignal {
    pub center_mhz: f64,
    pub width_mhz: f64,
    pub power_dbm: f64,
    pub duration: Duration,
}

/// MPDU carried by a PPDU, for captures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub mpdu: Vec<u8>,
    pub info: MpduInfo,
}

/// Queued simulation work
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A node starts sending a PPDU
    Transmit { sender: NodeId, ppdu: Ppdu },
    /// One emission goes on the air
    Emit(Emission),
    /// Foreign energy starts
    Foreign(ForeignSignal),
    /// A PHY timer fires
    Timer(NodeTimer),
}

impl From<NodeTimer> for SimEvent {
    fn from(timer: NodeTimer) -> Self {
        SimEvent::Timer(timer)
    }
}

/// PHY event with where and when it happened
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub at: Duration,
    pub node: NodeId,
    pub event: PhyEvent,
}

/// Radiotap capture taken at one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub node: NodeId,
    pub record: CaptureRecord,
}

struct Node {
    phy: SpectrumPhy,
    transmitter: VirtualTransmitter,
    capture: bool,
}

/// A set of nodes sharing one medium
pub struct Simulator {
    nodes: BTreeMap<NodeId, Node>,
    medium: VirtualMedium,
    queue: EventQueue<SimEvent>,
    /// Packet as handed to the PHY, per (PPDU uid, sender)
    packets: HashMap<(u64, NodeId), (Vec<u8>, MpduInfo)>,
    log: Vec<LoggedEvent>,
    captures: Vec<Capture>,
}

impl Simulator {
    pub fn new(medium: VirtualMedium) -> Self {
        Self {
            nodes: BTreeMap::new(),
            medium,
            queue: EventQueue::new(),
            packets: HashMap::new(),
            log: Vec::new(),
            captures: Vec::new(),
        }
    }

    /// Add a node; its transmitter shares the PHY's standard and channel
    pub fn add_node(&mut self, id: NodeId, config: NodeConfig) -> Result<(), SimError> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        let phy = SpectrumPhy::new(config.phy)?;
        let transmitter = VirtualTransmitter::new(
            id,
            phy.standard(),
            phy.frequency_mhz(),
            config.transmitter,
        )?;
        info!(
            "Added node {}: {} on {} MHz, {}",
            id,
            phy.standard(),
            phy.frequency_mhz(),
            phy.channel_width()
        );
        self.nodes.insert(
            id,
            Node {
                phy,
                transmitter,
                capture: config.capture,
            },
        );
        Ok(())
    }

    pub fn phy(&self, id: NodeId) -> Option<&SpectrumPhy> {
        self.nodes.get(&id).map(|n| &n.phy)
    }

    /// Mutable PHY access, e.g. to retune between runs
    pub fn phy_mut(&mut self, id: NodeId) -> Option<&mut SpectrumPhy> {
        self.nodes.get_mut(&id).map(|n| &mut n.phy)
    }

    pub fn medium_mut(&mut self) -> &mut VirtualMedium {
        &mut self.medium
    }

    pub fn now(&self) -> Duration {
        self.queue.now()
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.log
    }

    /// Events logged at one node
    pub fn events_at(&self, node: NodeId) -> impl Iterator<Item = &PhyEvent> {
        self.log
            .iter()
            .filter(move |e| e.node == node)
            .map(|e| &e.event)
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    /// Queue a PPDU from `sender` starting at `at`
    pub fn schedule_ppdu(
        &mut self,
        at: Duration,
        sender: NodeId,
        ppdu: Ppdu,
        frame: Frame,
    ) -> Result<(), SimError> {
        if !self.nodes.contains_key(&sender) {
            return Err(SimError::UnknownNode(sender));
        }
        let packet = if ppdu.tx_vector.aggregation {
            let eof = matches!(frame.info.mpdu_type, MpduType::Single | MpduType::Last);
            prepend_delimiter(&frame.mpdu, eof)
        } else {
            frame.mpdu
        };
        self.packets.insert((ppdu.uid, sender), (packet, frame.info));
        self.queue.push(at, SimEvent::Transmit { sender, ppdu });
        Ok(())
    }

    /// Queue foreign energy starting at `at`
    pub fn schedule_foreign(&mut self, at: Duration, signal: ForeignSignal) {
        self.queue.push(at, SimEvent::Foreign(signal));
    }

    /// Handle the next queued event; false once the queue is empty
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some((now, event)) = self.queue.pop() else {
            return Ok(false);
        };

        match event {
            SimEvent::Transmit { sender, ppdu } => {
                let node = self
                    .nodes
                    .get(&sender)
                    .ok_or(SimError::UnknownNode(sender))?;
                for emission in node.transmitter.transmit(ppdu)? {
                    self.queue.push(now + emission.offset, SimEvent::Emit(emission));
                }
            }
            SimEvent::Emit(emission) => {
                for (&id, node) in self.nodes.iter_mut() {
                    if id == emission.sender {
                        continue;
                    }
                    let obs = self.medium.propagate(&emission, id, node.phy.grid())?;
                    let mut sched = NodeScheduler::new(id, &mut self.queue);
                    node.phy.deliver(&mut sched, obs)?;
                }
            }
            SimEvent::Foreign(signal) => {
                debug!(
                    "Foreign signal: {:.1} dBm over {} MHz at {} MHz for {:?}",
                    signal.power_dbm, signal.width_mhz, signal.center_mhz, signal.duration
                );
                for (&id, node) in self.nodes.iter_mut() {
                    let psd = flat_psd(
                        node.phy.grid(),
                        signal.center_mhz,
                        signal.width_mhz,
                        dbm_to_w(signal.power_dbm),
                    );
                    let obs = SignalObservation::foreign(signal.duration, psd);
                    let mut sched = NodeScheduler::new(id, &mut self.queue);
                    node.phy.deliver(&mut sched, obs)?;
                }
            }
            SimEvent::Timer(NodeTimer { node: id, timer }) => {
                let node = self.nodes.get_mut(&id).ok_or(SimError::UnknownNode(id))?;
                let mut sched = NodeScheduler::new(id, &mut self.queue);
                node.phy.on_timer(&mut sched, timer);
            }
        }

        self.collect(now)?;
        Ok(true)
    }

    /// Run until no events are left
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()? {}
        Ok(())
    }

    /// Run every event due at or before `until`
    pub fn run_until(&mut self, until: Duration) -> Result<(), SimError> {
        while self.queue.peek_time().is_some_and(|t| t <= until) {
            self.step()?;
        }
        Ok(())
    }

    fn collect(&mut self, now: Duration) -> Result<(), SimError> {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            for event in node.phy.drain_events() {
                match &event {
                    PhyEvent::RxOk {
                        uid,
                        sender,
                        tx_vector,
                        quality,
                        ..
                    } => {
                        info!(
                            "Node {} received PPDU {} from {:?}: {:.1} dBm, SINR {:.1} dB",
                            id, uid, sender, quality.rssi_dbm, quality.sinr_db
                        );
                        if self.nodes.get(&id).is_some_and(|n| n.capture) {
                            self.capture(now, id, *uid, *sender, tx_vector, quality.rssi_dbm)?;
                        }
                    }
                    PhyEvent::RxFailed {
                        uid, sender, reason, ..
                    } => {
                        info!(
                            "Node {} lost PPDU {} from {:?}: {}",
                            id, uid, sender, reason
                        );
                    }
                    _ => {}
                }
                self.log.push(LoggedEvent {
                    at: now,
                    node: id,
                    event,
                });
            }
        }
        Ok(())
    }

    fn capture(
        &mut self,
        now: Duration,
        id: NodeId,
        uid: u64,
        sender: Option<NodeId>,
        tx_vector: &TxVector,
        rssi_dbm: f64,
    ) -> Result<(), SimError> {
        let Some(node) = self.nodes.get(&id) else {
            return Ok(());
        };
        let Some((packet, info)) = sender.and_then(|s| self.packets.get(&(uid, s))) else {
            warn!("Node {} decoded PPDU {} with no frame to capture", id, uid);
            return Ok(());
        };
        let noise_dbm = w_to_dbm(thermal_noise_w(
            tx_vector.channel_width.hz() as f64,
            node.phy.config().noise_figure_db,
        ));
        let record = encode(
            tx_vector,
            node.phy.frequency_mhz(),
            Some(rssi_dbm),
            Some(noise_dbm),
            *info,
            packet,
        )?
        .with_tsft(now.as_micros() as u64);
        self.captures.push(Capture { node: id, record });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MediumConfig;
    use wifi_spectrum::{ChannelWidth, HeFormat, Modulation, RxFailureReason};

    fn us(v: u64) -> Duration {
        Duration::from_micros(v)
    }

    fn he_su(mcs: u8) -> TxVector {
        TxVector::new(
            Modulation::He {
                mcs,
                format: HeFormat::Su,
            },
            ChannelWidth::Mhz20,
        )
    }

    fn sim(nodes: &[NodeId]) -> Simulator {
        let mut sim = Simulator::new(VirtualMedium::new(&MediumConfig::default()));
        for &id in nodes {
            let config = NodeConfig {
                capture: true,
                ..Default::default()
            };
            sim.add_node(id, config).unwrap();
        }
        sim
    }

    #[test]
    fn test_duplicate_and_unknown_nodes() {
        let mut sim = sim(&[1]);
        assert!(matches!(
            sim.add_node(1, NodeConfig::default()),
            Err(SimError::DuplicateNode(1))
        ));
        let ppdu = Ppdu::new(1, he_su(0), us(100));
        assert!(matches!(
            sim.schedule_ppdu(us(0), 9, ppdu, Frame::default()),
            Err(SimError::UnknownNode(9))
        ));
    }

    #[test]
    fn test_frame_is_received_and_captured() {
        let mut sim = sim(&[1, 2]);
        let ppdu = Ppdu::new(7, he_su(3), us(200));
        let frame = Frame {
            mpdu: b"hello".to_vec(),
            info: MpduInfo::default(),
        };
        sim.schedule_ppdu(us(10), 1, ppdu, frame).unwrap();
        sim.run().unwrap();

        assert!(sim
            .events_at(2)
            .any(|e| matches!(e, PhyEvent::RxOk { uid: 7, .. })));
        assert_eq!(sim.captures().len(), 1);
        let capture = &sim.captures()[0];
        assert_eq!(capture.node, 2);
        assert_eq!(capture.record.payload, b"hello");
        assert_eq!(capture.record.header.tsft, 210);
        // 16 dBm sent, 50 dB lost
        let signal = capture.record.header.antenna_signal_dbm.unwrap();
        assert!((-35..=-34).contains(&signal), "signal {}", signal);
        assert_eq!(sim.now(), us(210));
    }

    #[test]
    fn test_collision_reports_both_failures() {
        let mut sim = sim(&[1, 2, 3]);
        sim.schedule_ppdu(us(0), 1, Ppdu::new(1, he_su(0), us(200)), Frame::default())
            .unwrap();
        sim.schedule_ppdu(us(0), 2, Ppdu::new(2, he_su(0), us(200)), Frame::default())
            .unwrap();
        sim.run().unwrap();

        let failures: Vec<_> = sim
            .events_at(3)
            .filter_map(|e| match e {
                PhyEvent::RxFailed { uid, reason, .. } => Some((*uid, *reason)),
                _ => None,
            })
            .collect();
        // The second arrival is blocked at once, the synchronized one fails at its end
        assert_eq!(
            failures,
            vec![
                (2, RxFailureReason::NotSynchronized),
                (1, RxFailureReason::Interference)
            ]
        );
    }

    #[test]
    fn test_foreign_signal_reaches_every_node() {
        let mut sim = sim(&[1, 2]);
        sim.schedule_foreign(
            us(5),
            ForeignSignal {
                center_mhz: 5180.0,
                width_mhz: 20.0,
                power_dbm: -50.0,
                duration: us(40),
            },
        );
        sim.run().unwrap();
        for id in [1, 2] {
            assert!(sim
                .events_at(id)
                .any(|e| matches!(e, PhyEvent::CcaBusy { until } if *until == us(45))));
        }
    }

    #[test]
    fn test_run_until_stops_early() {
        let mut sim = sim(&[1, 2]);
        sim.schedule_ppdu(us(0), 1, Ppdu::new(1, he_su(0), us(200)), Frame::default())
            .unwrap();
        sim.run_until(us(100)).unwrap();
        assert!(!sim.phy(2).unwrap().state().is_idle());
        sim.run().unwrap();
        assert!(sim.phy(2).unwrap().state().is_idle());
    }
}
