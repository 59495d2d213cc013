//! Radiotap capture records for simulated 802.11 frames
//!
//! This crate turns the transmission parameters of a simulated PPDU into a
//! radiotap header, the radio metadata block trace readers such as
//! Wireshark expect in front of each captured 802.11 frame.
//!
//! - [`encode`] derives the header (flags, legacy rate, channel, antenna
//!   power and exactly one HT / VHT / HE block) from a [`TxVector`].
//! - [`RadiotapHeader`] writes and parses the bit-exact layout.
//! - [`ampdu`] handles the A-MPDU subframe delimiter stripped from
//!   aggregated frames.
//!
//! # Example
//!
//! ```rust
//! use wifi_radiotap::{encode, MpduInfo, RadiotapHeader};
//! use wifi_spectrum::{ChannelWidth, Modulation, TxVector};
//!
//! let tx = TxVector::new(Modulation::Vht { mcs: 7 }, ChannelWidth::Mhz80).with_nss(2);
//! let record = encode(&tx, 5210, Some(-52.0), Some(-93.0), MpduInfo::default(), b"frame")
//!     .unwrap()
//!     .with_tsft(1_000);
//!
//! let bytes = record.to_bytes();
//! let (header, len) = RadiotapHeader::parse(&bytes).unwrap();
//! assert_eq!(header, record.header);
//! assert_eq!(&bytes[len..], b"frame");
//! ```
//!
//! [`TxVector`]: wifi_spectrum::TxVector

pub mod ampdu;
pub mod encoder;
pub mod error;
pub mod header;

pub use ampdu::{AmpduSubframeHeader, MpduInfo, MpduType};
pub use encoder::{encode, CaptureRecord};
pub use error::{EncodeError, ParseError};
pub use header::{AmpduStatus, Channel, FamilyBlock, HeField, McsField, RadiotapHeader, VhtField};
