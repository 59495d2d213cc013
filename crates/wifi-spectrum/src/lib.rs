//! Spectrum-aware Wi-Fi PHY model
//!
//! This crate models the receive side of a Wi-Fi PHY attached to a
//! frequency-resolved channel: received power is tracked per frequency band
//! rather than as a single number, so adjacent-channel leakage, partial
//! overlap and uplink OFDMA all fall out of the same arithmetic.
//!
//! # Architecture
//!
//! - [`SpectrumGrid`] slices the channel (plus guard bands) into elementary
//!   bins and hands out [`Band`]s: one per 20 MHz sub-channel and, for
//!   802.11ax, one per resource unit ([`ru`]).
//! - [`InterferenceLedger`] keeps a time-stamped sum of every signal on the
//!   air per band.
//! - [`PsdSynthesizer`] turns a transmit power and a [`TxVector`] into a
//!   power spectral density shaped by the spectral mask.
//! - [`SpectrumPhy`] drives the receive state machine ([`state`]) and
//!   reports outcomes as [`PhyEvent`]s.
//!
//! Time is simulation time since start, as a [`std::time::Duration`]; the
//! PHY never sleeps and defers work through the [`Scheduler`] seam.
//!
//! # Example
//!
//! ```rust,no_run
//! use wifi_spectrum::{PhyConfig, SpectrumPhy, Standard, ChannelWidth};
//!
//! let config = PhyConfig::for_standard(Standard::Ieee80211ax5Ghz)
//!     .with_width(ChannelWidth::Mhz40);
//! let mut phy = SpectrumPhy::new(config).unwrap();
//!
//! // Feed signals with phy.deliver(&mut scheduler, observation) and
//! // timers with phy.on_timer(&mut scheduler, timer), then:
//! for event in phy.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod band;
pub mod channel;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod interference;
pub mod mode;
pub mod phy;
pub mod psd;
pub mod ru;
pub mod signal;
pub mod state;
pub mod timer;
pub mod units;

pub use band::{Band, PowerSpectrum, SpectrumGrid};
pub use channel::{ChannelWidth, Standard};
pub use config::PhyConfig;
pub use error::ConfigError;
pub use events::{PhyEvent, RxFailureReason, RxStateKind, SignalQuality};
pub use interference::{BandId, Exclusion, InterferenceLedger, SignalId, SinrChunk};
pub use mode::{DsssRate, HeFormat, Modulation, ModulationClass, OfdmRate, TxVector};
pub use phy::SpectrumPhy;
pub use psd::{PsdSynthesizer, TxMaskConfig};
pub use ru::{RuSpec, RuType, SubcarrierRange};
pub use signal::{NodeId, Ppdu, SignalObservation};
pub use state::{decide, Decision, RxState};
pub use timer::{PhyTimer, Scheduler};
