//! Radiotap header layout
//!
//! # Frame Format
//! ```text
//! [version u8] [pad u8] [length u16] [present u32] [fields...]
//! ```
//!
//! All multi-byte values are little-endian. Fields follow in present-bit
//! order, each aligned to its natural boundary relative to the start of the
//! header:
//!
//! | bit | field           | align | size |
//! |-----|-----------------|-------|------|
//! | 0   | TSFT            | 8     | 8    |
//! | 1   | flags           | 1     | 1    |
//! | 2   | rate            | 1     | 1    |
//! | 3   | channel         | 2     | 4    |
//! | 5   | antenna signal  | 1     | 1    |
//! | 6   | antenna noise   | 1     | 1    |
//! | 19  | MCS             | 1     | 3    |
//! | 20  | A-MPDU status   | 4     | 8    |
//! | 21  | VHT             | 2     | 12   |
//! | 23  | HE              | 2     | 12   |

use crate::error::ParseError;

/// Only radiotap version in use
pub const RADIOTAP_VERSION: u8 = 0;
/// Version, pad, length and present word
pub const PREAMBLE_LEN: usize = 8;

pub const PRESENT_TSFT: u32 = 1 << 0;
pub const PRESENT_FLAGS: u32 = 1 << 1;
pub const PRESENT_RATE: u32 = 1 << 2;
pub const PRESENT_CHANNEL: u32 = 1 << 3;
pub const PRESENT_ANTENNA_SIGNAL: u32 = 1 << 5;
pub const PRESENT_ANTENNA_NOISE: u32 = 1 << 6;
pub const PRESENT_MCS: u32 = 1 << 19;
pub const PRESENT_AMPDU_STATUS: u32 = 1 << 20;
pub const PRESENT_VHT: u32 = 1 << 21;
pub const PRESENT_HE: u32 = 1 << 23;

const SUPPORTED_PRESENT: u32 = PRESENT_TSFT
    | PRESENT_FLAGS
    | PRESENT_RATE
    | PRESENT_CHANNEL
    | PRESENT_ANTENNA_SIGNAL
    | PRESENT_ANTENNA_NOISE
    | PRESENT_MCS
    | PRESENT_AMPDU_STATUS
    | PRESENT_VHT
    | PRESENT_HE;

const FAMILY_PRESENT: u32 = PRESENT_RATE | PRESENT_MCS | PRESENT_VHT | PRESENT_HE;

// Frame flags
pub const FLAG_SHORT_PREAMBLE: u8 = 0x02;
pub const FLAG_FCS_INCLUDED: u8 = 0x10;
pub const FLAG_SHORT_GUARD: u8 = 0x80;

// Channel flags
pub const CHANNEL_FLAG_CCK: u16 = 0x0020;
pub const CHANNEL_FLAG_OFDM: u16 = 0x0040;
pub const CHANNEL_FLAG_SPECTRUM_2GHZ: u16 = 0x0080;
pub const CHANNEL_FLAG_SPECTRUM_5GHZ: u16 = 0x0100;

// MCS known
pub const MCS_KNOWN_BANDWIDTH: u8 = 0x01;
pub const MCS_KNOWN_INDEX: u8 = 0x02;
pub const MCS_KNOWN_GUARD_INTERVAL: u8 = 0x04;
pub const MCS_KNOWN_HT_FORMAT: u8 = 0x08;
pub const MCS_KNOWN_FEC_TYPE: u8 = 0x10;
pub const MCS_KNOWN_STBC: u8 = 0x20;
pub const MCS_KNOWN_NESS: u8 = 0x40;
pub const MCS_KNOWN_NESS_BIT_1: u8 = 0x80;

// MCS flags
pub const MCS_FLAGS_BANDWIDTH_40: u8 = 0x01;
pub const MCS_FLAGS_GUARD_INTERVAL: u8 = 0x04;
pub const MCS_FLAGS_HT_GREENFIELD: u8 = 0x08;
pub const MCS_FLAGS_STBC_STREAMS: u8 = 0x60;
pub const MCS_FLAGS_NESS_BIT_0: u8 = 0x80;

// A-MPDU status flags
pub const AMPDU_STATUS_LAST_KNOWN: u16 = 0x0004;
pub const AMPDU_STATUS_LAST: u16 = 0x0008;

// VHT known
pub const VHT_KNOWN_STBC: u16 = 0x0001;
pub const VHT_KNOWN_GUARD_INTERVAL: u16 = 0x0004;
pub const VHT_KNOWN_BEAMFORMED: u16 = 0x0020;
pub const VHT_KNOWN_BANDWIDTH: u16 = 0x0040;

// VHT flags
pub const VHT_FLAGS_STBC: u8 = 0x01;
pub const VHT_FLAGS_GUARD_INTERVAL: u8 = 0x04;

// HE data1
pub const HE_DATA1_FORMAT_EXT_SU: u16 = 0x0001;
pub const HE_DATA1_FORMAT_MU: u16 = 0x0002;
pub const HE_DATA1_FORMAT_TRIG: u16 = 0x0003;
pub const HE_DATA1_DATA_MCS_KNOWN: u16 = 0x0020;
pub const HE_DATA1_STBC_KNOWN: u16 = 0x0200;

// HE data2
pub const HE_DATA2_GI_KNOWN: u16 = 0x0002;
pub const HE_DATA2_NUM_LTF_SYMS_KNOWN: u16 = 0x0004;

// HE data3
pub const HE_DATA3_STBC: u16 = 0x8000;

// HE data5
pub const HE_DATA5_DATA_BW_RU_ALLOC_40MHZ: u16 = 0x0001;
pub const HE_DATA5_DATA_BW_RU_ALLOC_80MHZ: u16 = 0x0002;
pub const HE_DATA5_DATA_BW_RU_ALLOC_160MHZ: u16 = 0x0003;
pub const HE_DATA5_GI_1_6: u16 = 0x0010;
pub const HE_DATA5_GI_3_2: u16 = 0x0020;

/// Channel field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    pub frequency_mhz: u16,
    pub flags: u16,
}

/// HT MCS field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct McsField {
    pub known: u8,
    pub flags: u8,
    pub mcs: u8,
}

/// A-MPDU status field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmpduStatus {
    pub reference: u32,
    pub flags: u16,
    pub delimiter_crc: u8,
}

/// VHT field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VhtField {
    pub known: u16,
    pub flags: u8,
    pub bandwidth: u8,
    /// Per user: low nibble NSS, high nibble MCS
    pub mcs_nss: [u8; 4],
    pub coding: u8,
    pub group_id: u8,
    pub partial_aid: u16,
}

/// HE field: six little-endian data words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeField {
    pub data: [u16; 6],
}

impl HeField {
    /// Field with data1, data2, data3 and data5 set; data4 and data6 are zero
    pub fn new(data1: u16, data2: u16, data3: u16, data5: u16) -> Self {
        Self {
            data: [data1, data2, data3, 0, data5, 0],
        }
    }

    /// Data word `n`, counting from 1 like the field names
    pub fn word(&self, n: usize) -> u16 {
        n.checked_sub(1)
            .and_then(|i| self.data.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// The one modulation-specific block of a capture record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FamilyBlock {
    /// DSSS / OFDM: rate in 500 kbps units
    Legacy { rate: u8 },
    Ht(McsField),
    Vht(VhtField),
    He(HeField),
}

impl FamilyBlock {
    fn present(&self) -> u32 {
        match self {
            FamilyBlock::Legacy { .. } => PRESENT_RATE,
            FamilyBlock::Ht(_) => PRESENT_MCS,
            FamilyBlock::Vht(_) => PRESENT_VHT,
            FamilyBlock::He(_) => PRESENT_HE,
        }
    }
}

/// Decoded or to-be-encoded radiotap header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadiotapHeader {
    /// Capture timestamp in microseconds, filled in by the trace sink
    pub tsft: u64,
    pub flags: u8,
    pub channel: Channel,
    pub antenna_signal_dbm: Option<i8>,
    pub antenna_noise_dbm: Option<i8>,
    pub ampdu: Option<AmpduStatus>,
    pub family: FamilyBlock,
}

struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    fn align(&mut self, to: usize) {
        while self.buf.len() % to != 0 {
            self.buf.push(0);
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.align(2);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
}

struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn align(&mut self, to: usize) {
        self.pos = self.pos.div_ceil(to) * to;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(ParseError::Incomplete {
                needed: end - self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ParseError> {
        self.align(2);
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        self.align(4);
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, ParseError> {
        self.align(8);
        let b = self.take(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(b);
        Ok(u64::from_le_bytes(word))
    }
}

impl RadiotapHeader {
    /// Same header with the capture timestamp set
    pub fn with_tsft(mut self, tsft_us: u64) -> Self {
        self.tsft = tsft_us;
        self
    }

    /// Present bitmap this header encodes with
    pub fn present(&self) -> u32 {
        let mut present = PRESENT_TSFT | PRESENT_FLAGS | PRESENT_CHANNEL | self.family.present();
        if self.antenna_signal_dbm.is_some() {
            present |= PRESENT_ANTENNA_SIGNAL;
        }
        if self.antenna_noise_dbm.is_some() {
            present |= PRESENT_ANTENNA_NOISE;
        }
        if self.ampdu.is_some() {
            present |= PRESENT_AMPDU_STATUS;
        }
        present
    }

    /// Encoded size in bytes, including the preamble
    pub fn encoded_len(&self) -> usize {
        self.to_bytes().len()
    }

    /// Encode to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = FieldWriter {
            buf: Vec::with_capacity(40),
        };
        w.u8(RADIOTAP_VERSION);
        w.u8(0);
        w.u16(0);
        w.u32(self.present());

        w.u64(self.tsft);
        w.u8(self.flags);
        if let FamilyBlock::Legacy { rate } = self.family {
            w.u8(rate);
        }
        w.u16(self.channel.frequency_mhz);
        w.u16(self.channel.flags);
        if let Some(signal) = self.antenna_signal_dbm {
            w.u8(signal as u8);
        }
        if let Some(noise) = self.antenna_noise_dbm {
            w.u8(noise as u8);
        }
        if let FamilyBlock::Ht(mcs) = self.family {
            w.u8(mcs.known);
            w.u8(mcs.flags);
            w.u8(mcs.mcs);
        }
        if let Some(ampdu) = self.ampdu {
            w.u32(ampdu.reference);
            w.u16(ampdu.flags);
            w.u8(ampdu.delimiter_crc);
            w.u8(0);
        }
        if let FamilyBlock::Vht(vht) = self.family {
            w.u16(vht.known);
            w.u8(vht.flags);
            w.u8(vht.bandwidth);
            for b in vht.mcs_nss {
                w.u8(b);
            }
            w.u8(vht.coding);
            w.u8(vht.group_id);
            w.u16(vht.partial_aid);
        }
        if let FamilyBlock::He(he) = self.family {
            for word in he.data {
                w.u16(word);
            }
        }

        let mut buf = w.buf;
        let len = buf.len() as u16;
        buf[2..4].copy_from_slice(&len.to_le_bytes());
        buf
    }

    /// Parse a header from the start of `data`
    ///
    /// Returns the header and the number of bytes it occupies; the frame
    /// follows at that offset.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), ParseError> {
        if data.len() < PREAMBLE_LEN {
            return Err(ParseError::Incomplete {
                needed: PREAMBLE_LEN - data.len(),
            });
        }
        if data[0] != RADIOTAP_VERSION {
            return Err(ParseError::UnsupportedVersion(data[0]));
        }
        let declared = u16::from_le_bytes([data[2], data[3]]);
        let len = declared as usize;
        if len < PREAMBLE_LEN {
            return Err(ParseError::InvalidLength(declared));
        }
        if data.len() < len {
            return Err(ParseError::Incomplete {
                needed: len - data.len(),
            });
        }
        let present = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let unsupported = present & !SUPPORTED_PRESENT;
        if unsupported != 0 {
            return Err(ParseError::UnsupportedPresent(unsupported));
        }
        match (present & FAMILY_PRESENT).count_ones() {
            0 => return Err(ParseError::MissingFamilyBlock),
            1 => {}
            _ => return Err(ParseError::ConflictingFamilyBlocks(present)),
        }
        for (bit, name) in [
            (PRESENT_TSFT, "TSFT"),
            (PRESENT_FLAGS, "flags"),
            (PRESENT_CHANNEL, "channel"),
        ] {
            if present & bit == 0 {
                return Err(ParseError::MissingField(name));
            }
        }

        let mut r = FieldReader {
            data: &data[..len],
            pos: PREAMBLE_LEN,
        };
        let tsft = r.u64()?;
        let flags = r.u8()?;
        let rate = if present & PRESENT_RATE != 0 {
            Some(r.u8()?)
        } else {
            None
        };
        let channel = Channel {
            frequency_mhz: r.u16()?,
            flags: r.u16()?,
        };
        let antenna_signal_dbm = if present & PRESENT_ANTENNA_SIGNAL != 0 {
            Some(r.u8()? as i8)
        } else {
            None
        };
        let antenna_noise_dbm = if present & PRESENT_ANTENNA_NOISE != 0 {
            Some(r.u8()? as i8)
        } else {
            None
        };
        let mcs = if present & PRESENT_MCS != 0 {
            Some(McsField {
                known: r.u8()?,
                flags: r.u8()?,
                mcs: r.u8()?,
            })
        } else {
            None
        };
        let ampdu = if present & PRESENT_AMPDU_STATUS != 0 {
            let status = AmpduStatus {
                reference: r.u32()?,
                flags: r.u16()?,
                delimiter_crc: r.u8()?,
            };
            r.u8()?;
            Some(status)
        } else {
            None
        };
        let vht = if present & PRESENT_VHT != 0 {
            let known = r.u16()?;
            let flags = r.u8()?;
            let bandwidth = r.u8()?;
            let mut mcs_nss = [0u8; 4];
            mcs_nss.copy_from_slice(r.take(4)?);
            Some(VhtField {
                known,
                flags,
                bandwidth,
                mcs_nss,
                coding: r.u8()?,
                group_id: r.u8()?,
                partial_aid: r.u16()?,
            })
        } else {
            None
        };
        let he = if present & PRESENT_HE != 0 {
            let mut field = HeField::default();
            for word in field.data.iter_mut() {
                *word = r.u16()?;
            }
            Some(field)
        } else {
            None
        };

        let family = match (rate, mcs, vht, he) {
            (Some(rate), ..) => FamilyBlock::Legacy { rate },
            (_, Some(mcs), ..) => FamilyBlock::Ht(mcs),
            (_, _, Some(vht), _) => FamilyBlock::Vht(vht),
            (_, _, _, Some(he)) => FamilyBlock::He(he),
            _ => return Err(ParseError::MissingFamilyBlock),
        };

        Ok((
            Self {
                tsft,
                flags,
                channel,
                antenna_signal_dbm,
                antenna_noise_dbm,
                ampdu,
                family,
            },
            len,
        ))
    }
}
