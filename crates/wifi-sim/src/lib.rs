//! Spectrum PHY Simulation Library
//!
//! This crate drives [`wifi_spectrum::SpectrumPhy`] instances without a full
//! network simulator. It includes:
//!
//! - **VirtualTransmitter**: turns PPDUs into spectrum emissions, splitting
//!   HE trigger-based PPDUs into preamble and OFDMA parts
//! - **VirtualMedium**: fixed-loss links between nodes
//! - **EventQueue**: deterministic clock implementing the PHY scheduler seam
//! - **Simulator**: pumps emissions and timers, logs PHY events and takes
//!   radiotap captures
//! - **Scenario**: JSON run descriptions
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use wifi_sim::{Frame, MediumConfig, NodeConfig, Simulator, VirtualMedium};
//! use wifi_spectrum::{ChannelWidth, HeFormat, Modulation, PhyEvent, Ppdu, TxVector};
//!
//! let mut sim = Simulator::new(VirtualMedium::new(&MediumConfig::default()));
//! sim.add_node(1, NodeConfig::default()).unwrap();
//! sim.add_node(2, NodeConfig::default()).unwrap();
//!
//! let tx = TxVector::new(Modulation::He { mcs: 3, format: HeFormat::Su }, ChannelWidth::Mhz20);
//! let ppdu = Ppdu::new(1, tx, Duration::from_micros(200));
//! sim.schedule_ppdu(Duration::ZERO, 1, ppdu, Frame::default()).unwrap();
//! sim.run().unwrap();
//!
//! assert!(sim.events_at(2).any(|e| matches!(e, PhyEvent::RxOk { uid: 1, .. })));
//! ```

pub mod error;
pub mod medium;
pub mod scenario;
pub mod scheduler;
pub mod simulator;
pub mod transmitter;

pub use error::SimError;
pub use medium::{LinkLoss, MediumConfig, VirtualMedium};
pub use scenario::{InterfererSpec, NodeSpec, Scenario, TransmissionSpec};
pub use scheduler::{EventQueue, NodeScheduler, NodeTimer};
pub use simulator::{Capture, ForeignSignal, Frame, LoggedEvent, NodeConfig, SimEvent, Simulator};
pub use transmitter::{Emission, TransmitterConfig, VirtualTransmitter};
