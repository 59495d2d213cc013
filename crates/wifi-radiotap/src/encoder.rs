//! Capture record encoder
//!
//! Derives a radiotap header from the parameters a PPDU was sent with. The
//! derivation is fixed so that traces stay byte-compatible with existing
//! capture readers.

use tracing::trace;

use wifi_spectrum::{ChannelWidth, HeFormat, Modulation, TxVector};

use crate::ampdu::{strip_delimiter, MpduInfo, MpduType, DELIMITER_CRC};
use crate::error::EncodeError;
use crate::header::*;

/// Frequencies below this are in the 2.4 GHz band
pub const SPECTRUM_2GHZ_LIMIT_MHZ: u16 = 2500;

/// Legacy rates (500 kbps units) flagged as CCK
const CCK_RATES: [u8; 4] = [2, 4, 10, 22];

/// A captured frame: radiotap header plus the MPDU bytes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureRecord {
    pub header: RadiotapHeader,
    pub payload: Vec<u8>,
}

impl CaptureRecord {
    /// Header bytes followed by the payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Same record stamped with the capture time
    pub fn with_tsft(mut self, tsft_us: u64) -> Self {
        self.header = self.header.with_tsft(tsft_us);
        self
    }
}

/// Antenna power in whole dBm, saturated to the field range
fn antenna_dbm(dbm: f64) -> i8 {
    dbm.round().clamp(i8::MIN as f64, i8::MAX as f64) as i8
}

/// Legacy rate field in 500 kbps units
fn legacy_rate(tx_vector: &TxVector) -> Option<u8> {
    let bps = tx_vector.legacy_data_rate_bps()?;
    let rate = bps * tx_vector.nss.max(1) as u64 / 500_000;
    Some(u8::try_from(rate).unwrap_or(u8::MAX))
}

fn channel(frequency_mhz: u16, rate: Option<u8>) -> Channel {
    let mut flags = if CCK_RATES.contains(&rate.unwrap_or(0)) {
        CHANNEL_FLAG_CCK
    } else {
        CHANNEL_FLAG_OFDM
    };
    flags |= if frequency_mhz < SPECTRUM_2GHZ_LIMIT_MHZ {
        CHANNEL_FLAG_SPECTRUM_2GHZ
    } else {
        CHANNEL_FLAG_SPECTRUM_5GHZ
    };
    Channel {
        frequency_mhz,
        flags,
    }
}

fn ht_field(tx_vector: &TxVector, mcs: u8, greenfield: bool) -> McsField {
    let mut known = MCS_KNOWN_INDEX
        | MCS_KNOWN_BANDWIDTH
        | MCS_KNOWN_GUARD_INTERVAL
        | MCS_KNOWN_HT_FORMAT
        | MCS_KNOWN_NESS
        | MCS_KNOWN_FEC_TYPE
        | MCS_KNOWN_STBC;
    let mut flags = 0;

    if tx_vector.channel_width == ChannelWidth::Mhz40 {
        flags |= MCS_FLAGS_BANDWIDTH_40;
    }
    if tx_vector.guard_interval_ns == 400 {
        flags |= MCS_FLAGS_GUARD_INTERVAL;
    }
    if greenfield {
        flags |= MCS_FLAGS_HT_GREENFIELD;
    }
    if tx_vector.ness & 0x01 != 0 {
        flags |= MCS_FLAGS_NESS_BIT_0;
    }
    if tx_vector.ness & 0x02 != 0 {
        known |= MCS_KNOWN_NESS_BIT_1;
    }
    if tx_vector.stbc {
        flags |= MCS_FLAGS_STBC_STREAMS;
    }

    McsField { known, flags, mcs }
}

fn vht_field(tx_vector: &TxVector, mcs: u8) -> Result<VhtField, EncodeError> {
    let known =
        VHT_KNOWN_STBC | VHT_KNOWN_GUARD_INTERVAL | VHT_KNOWN_BEAMFORMED | VHT_KNOWN_BANDWIDTH;
    let mut flags = 0;
    if tx_vector.stbc {
        flags |= VHT_FLAGS_STBC;
    }
    if tx_vector.guard_interval_ns == 400 {
        flags |= VHT_FLAGS_GUARD_INTERVAL;
    }

    let bandwidth = match tx_vector.channel_width {
        ChannelWidth::Mhz20 => 0,
        ChannelWidth::Mhz40 => 1,
        ChannelWidth::Mhz80 => 4,
        ChannelWidth::Mhz160 => 11,
        other => {
            return Err(EncodeError::UnsupportedBandwidth {
                family: "VHT",
                width: other.mhz(),
            })
        }
    };

    // Single user only
    let mcs_nss = [(tx_vector.nss & 0x0f) | ((mcs << 4) & 0xf0), 0, 0, 0];

    Ok(VhtField {
        known,
        flags,
        bandwidth,
        mcs_nss,
        coding: 0,
        group_id: 0,
        partial_aid: 0,
    })
}

fn he_field(tx_vector: &TxVector, format: HeFormat) -> Result<HeField, EncodeError> {
    let mut data1 = HE_DATA1_STBC_KNOWN | HE_DATA1_DATA_MCS_KNOWN;
    data1 |= match format {
        HeFormat::Su => 0,
        HeFormat::ErSu => HE_DATA1_FORMAT_EXT_SU,
        HeFormat::Mu => HE_DATA1_FORMAT_MU,
        HeFormat::Tb { .. } => HE_DATA1_FORMAT_TRIG,
    };

    let data2 = HE_DATA2_NUM_LTF_SYMS_KNOWN | HE_DATA2_GI_KNOWN;

    let data3 = if tx_vector.stbc { HE_DATA3_STBC } else { 0 };

    let mut data5 = match tx_vector.channel_width {
        ChannelWidth::Mhz20 => 0,
        ChannelWidth::Mhz40 => HE_DATA5_DATA_BW_RU_ALLOC_40MHZ,
        ChannelWidth::Mhz80 => HE_DATA5_DATA_BW_RU_ALLOC_80MHZ,
        ChannelWidth::Mhz160 => HE_DATA5_DATA_BW_RU_ALLOC_160MHZ,
        other => {
            return Err(EncodeError::UnsupportedBandwidth {
                family: "HE",
                width: other.mhz(),
            })
        }
    };
    data5 |= match tx_vector.guard_interval_ns {
        1600 => HE_DATA5_GI_1_6,
        3200 => HE_DATA5_GI_3_2,
        _ => 0,
    };

    Ok(HeField::new(data1, data2, data3, data5))
}

/// Build the capture record of one MPDU
///
/// `packet` is the MPDU as handed to the PHY; for aggregated transmissions
/// it still carries its subframe delimiter, which is stripped here. The
/// TSFT field is left at zero for the trace sink to stamp.
pub fn encode(
    tx_vector: &TxVector,
    frequency_mhz: u16,
    signal_dbm: Option<f64>,
    noise_dbm: Option<f64>,
    mpdu: MpduInfo,
    packet: &[u8],
) -> Result<CaptureRecord, EncodeError> {
    let mut flags = FLAG_FCS_INCLUDED;
    if tx_vector.is_short_preamble() {
        flags |= FLAG_SHORT_PREAMBLE;
    }
    if tx_vector.guard_interval_ns == 400 {
        flags |= FLAG_SHORT_GUARD;
    }

    let rate = legacy_rate(tx_vector);
    let channel = channel(frequency_mhz, rate);

    let family = match tx_vector.modulation {
        Modulation::Dsss { .. } | Modulation::Ofdm { .. } => FamilyBlock::Legacy {
            rate: rate.unwrap_or(0),
        },
        Modulation::Ht { mcs, greenfield } => FamilyBlock::Ht(ht_field(tx_vector, mcs, greenfield)),
        Modulation::Vht { mcs } => FamilyBlock::Vht(vht_field(tx_vector, mcs)?),
        Modulation::He { format, .. } => FamilyBlock::He(he_field(tx_vector, format)?),
    };

    let (ampdu, payload) = if tx_vector.aggregation {
        let (delimiter, body) = strip_delimiter(packet)?;
        let mut status = AMPDU_STATUS_LAST_KNOWN;
        if mpdu.mpdu_type == MpduType::Last || (delimiter.eof && delimiter.length > 0) {
            status |= AMPDU_STATUS_LAST;
        }
        trace!(
            "stripped A-MPDU delimiter: ref={} length={} eof={}",
            mpdu.reference,
            delimiter.length,
            delimiter.eof
        );
        (
            Some(AmpduStatus {
                reference: mpdu.reference,
                flags: status,
                delimiter_crc: DELIMITER_CRC,
            }),
            body.to_vec(),
        )
    } else {
        (None, packet.to_vec())
    };

    let header = RadiotapHeader {
        tsft: 0,
        flags,
        channel,
        antenna_signal_dbm: signal_dbm.map(antenna_dbm),
        antenna_noise_dbm: noise_dbm.map(antenna_dbm),
        ampdu,
        family,
    };
    trace!(
        "encoded {} capture header: {} MHz, {} bytes",
        tx_vector.class(),
        frequency_mhz,
        header.encoded_len()
    );

    Ok(CaptureRecord { header, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ampdu::prepend_delimiter;
    use wifi_spectrum::{DsssRate, OfdmRate};

    fn dsss(rate: DsssRate, short_preamble: bool) -> TxVector {
        TxVector::new(
            Modulation::Dsss {
                rate,
                short_preamble,
            },
            ChannelWidth::Mhz20,
        )
    }

    fn encode_plain(tx_vector: &TxVector, frequency_mhz: u16) -> RadiotapHeader {
        encode(tx_vector, frequency_mhz, None, None, MpduInfo::default(), b"frame")
            .unwrap()
            .header
    }

    #[test]
    fn test_dsss_long_preamble() {
        let header = encode_plain(&dsss(DsssRate::Mbps1, false), 2412);
        assert_eq!(header.flags, FLAG_FCS_INCLUDED);
        assert_eq!(header.family, FamilyBlock::Legacy { rate: 2 });
        assert_eq!(
            header.channel.flags,
            CHANNEL_FLAG_CCK | CHANNEL_FLAG_SPECTRUM_2GHZ
        );
    }

    #[test]
    fn test_dsss_short_preamble() {
        let header = encode_plain(&dsss(DsssRate::Mbps11, true), 2437);
        assert_eq!(header.flags, FLAG_FCS_INCLUDED | FLAG_SHORT_PREAMBLE);
        assert_eq!(header.family, FamilyBlock::Legacy { rate: 22 });
        assert_eq!(header.channel.flags & CHANNEL_FLAG_CCK, CHANNEL_FLAG_CCK);
    }

    #[test]
    fn test_rate_set_decides_cck() {
        // 5.5 Mbps is 11 units, outside the CCK rate set
        let header = encode_plain(&dsss(DsssRate::Mbps5_5, false), 2412);
        assert_eq!(header.family, FamilyBlock::Legacy { rate: 11 });
        assert_eq!(header.channel.flags & CHANNEL_FLAG_OFDM, CHANNEL_FLAG_OFDM);
    }

    #[test]
    fn test_ofdm_half_rate() {
        let tx = TxVector::new(
            Modulation::Ofdm {
                rate: OfdmRate::Mbps54,
            },
            ChannelWidth::Mhz10,
        );
        let header = encode_plain(&tx, 5860);
        assert_eq!(header.family, FamilyBlock::Legacy { rate: 54 });
        assert_eq!(
            header.channel.flags,
            CHANNEL_FLAG_OFDM | CHANNEL_FLAG_SPECTRUM_5GHZ
        );
    }

    #[test]
    fn test_band_threshold() {
        let tx = TxVector::new(
            Modulation::Ofdm {
                rate: OfdmRate::Mbps6,
            },
            ChannelWidth::Mhz20,
        );
        let flags = |f| encode_plain(&tx, f).channel.flags;
        assert_ne!(flags(2412) & CHANNEL_FLAG_SPECTRUM_2GHZ, 0);
        assert_ne!(flags(2499) & CHANNEL_FLAG_SPECTRUM_2GHZ, 0);
        assert_ne!(flags(2500) & CHANNEL_FLAG_SPECTRUM_5GHZ, 0);
        assert_ne!(flags(5180) & CHANNEL_FLAG_SPECTRUM_5GHZ, 0);
    }

    #[test]
    fn test_ht_fields() {
        let mut tx = TxVector::new(
            Modulation::Ht {
                mcs: 13,
                greenfield: true,
            },
            ChannelWidth::Mhz40,
        )
        .with_guard_interval(400)
        .with_stbc(true);
        tx.ness = 3;

        let header = encode_plain(&tx, 5190);
        let FamilyBlock::Ht(mcs) = header.family else {
            panic!("expected HT block, got {:?}", header.family);
        };
        assert_eq!(mcs.mcs, 13);
        assert_eq!(mcs.known, 0xFF);
        assert_eq!(
            mcs.flags,
            MCS_FLAGS_BANDWIDTH_40
                | MCS_FLAGS_GUARD_INTERVAL
                | MCS_FLAGS_HT_GREENFIELD
                | MCS_FLAGS_NESS_BIT_0
                | MCS_FLAGS_STBC_STREAMS
        );
        assert_eq!(header.flags, FLAG_FCS_INCLUDED | FLAG_SHORT_GUARD);
        assert_eq!(header.present() & PRESENT_RATE, 0);
        assert_ne!(header.channel.flags & CHANNEL_FLAG_OFDM, 0);
    }

    #[test]
    fn test_ht_without_options() {
        let tx = TxVector::new(
            Modulation::Ht {
                mcs: 0,
                greenfield: false,
            },
            ChannelWidth::Mhz20,
        );
        let FamilyBlock::Ht(mcs) = encode_plain(&tx, 2412).family else {
            panic!("expected HT block");
        };
        assert_eq!(mcs.flags, 0);
        assert_eq!(mcs.known & MCS_KNOWN_NESS_BIT_1, 0);
    }

    #[test]
    fn test_vht_mcs_nss_byte() {
        let tx = TxVector::new(Modulation::Vht { mcs: 7 }, ChannelWidth::Mhz80).with_nss(2);
        let FamilyBlock::Vht(vht) = encode_plain(&tx, 5210).family else {
            panic!("expected VHT block");
        };
        assert_eq!(vht.mcs_nss[0], 0x72);
        assert_eq!(vht.mcs_nss[0] & 0x0f, 2);
        assert_eq!(vht.mcs_nss[0] >> 4, 7);
        assert_eq!(vht.bandwidth, 4);
        assert_eq!(
            vht.known,
            VHT_KNOWN_STBC | VHT_KNOWN_GUARD_INTERVAL | VHT_KNOWN_BEAMFORMED | VHT_KNOWN_BANDWIDTH
        );
    }

    #[test]
    fn test_vht_bandwidth_codes() {
        for (width, code) in [
            (ChannelWidth::Mhz20, 0),
            (ChannelWidth::Mhz40, 1),
            (ChannelWidth::Mhz80, 4),
            (ChannelWidth::Mhz160, 11),
        ] {
            let tx = TxVector::new(Modulation::Vht { mcs: 0 }, width);
            let FamilyBlock::Vht(vht) = encode_plain(&tx, 5250).family else {
                panic!("expected VHT block");
            };
            assert_eq!(vht.bandwidth, code, "{:?}", width);
        }
    }

    #[test]
    fn test_vht_narrow_channel_fails() {
        let tx = TxVector::new(Modulation::Vht { mcs: 0 }, ChannelWidth::Mhz10);
        assert_eq!(
            encode(&tx, 5180, None, None, MpduInfo::default(), b""),
            Err(EncodeError::UnsupportedBandwidth {
                family: "VHT",
                width: 10
            })
        );
    }

    #[test]
    fn test_he_fields() {
        let tx = TxVector::new(
            Modulation::He {
                mcs: 9,
                format: HeFormat::ErSu,
            },
            ChannelWidth::Mhz80,
        )
        .with_guard_interval(1600)
        .with_stbc(true);
        let FamilyBlock::He(he) = encode_plain(&tx, 5210).family else {
            panic!("expected HE block");
        };
        assert_eq!(
            he.word(1),
            HE_DATA1_STBC_KNOWN | HE_DATA1_DATA_MCS_KNOWN | HE_DATA1_FORMAT_EXT_SU
        );
        assert_eq!(he.word(2), HE_DATA2_NUM_LTF_SYMS_KNOWN | HE_DATA2_GI_KNOWN);
        assert_eq!(he.word(3), HE_DATA3_STBC);
        assert_eq!(he.word(5), HE_DATA5_DATA_BW_RU_ALLOC_80MHZ | HE_DATA5_GI_1_6);
    }

    #[test]
    fn test_he_format_codes() {
        use wifi_spectrum::{RuSpec, RuType};
        for (format, code) in [
            (HeFormat::Su, 0),
            (HeFormat::ErSu, HE_DATA1_FORMAT_EXT_SU),
            (HeFormat::Mu, HE_DATA1_FORMAT_MU),
            (
                HeFormat::Tb {
                    sta_id: 1,
                    ru: RuSpec::new(RuType::Ru26, 1),
                },
                HE_DATA1_FORMAT_TRIG,
            ),
        ] {
            let tx = TxVector::new(Modulation::He { mcs: 0, format }, ChannelWidth::Mhz20)
                .with_guard_interval(3200);
            let FamilyBlock::He(he) = encode_plain(&tx, 5180).family else {
                panic!("expected HE block");
            };
            assert_eq!(he.word(1) & 0x0003, code);
            assert_eq!(he.word(5), HE_DATA5_GI_3_2);
        }
    }

    #[test]
    fn test_antenna_power_rounded_and_clamped() {
        let tx = dsss(DsssRate::Mbps1, false);
        let record = encode(
            &tx,
            2412,
            Some(-40.6),
            Some(-200.0),
            MpduInfo::default(),
            b"",
        )
        .unwrap();
        assert_eq!(record.header.antenna_signal_dbm, Some(-41));
        assert_eq!(record.header.antenna_noise_dbm, Some(-128));
        assert_eq!(record.header.encoded_len(), 24);
    }

    #[test]
    fn test_aggregate_strips_delimiter() {
        let tx = TxVector::new(
            Modulation::Ht {
                mcs: 7,
                greenfield: false,
            },
            ChannelWidth::Mhz20,
        )
        .with_aggregation(true);

        let framed = prepend_delimiter(b"mpdu-one", false);
        let record = encode(
            &tx,
            5180,
            None,
            None,
            MpduInfo::new(MpduType::First, 12),
            &framed,
        )
        .unwrap();
        assert_eq!(record.payload, b"mpdu-one");
        assert_eq!(
            record.header.ampdu,
            Some(AmpduStatus {
                reference: 12,
                flags: AMPDU_STATUS_LAST_KNOWN,
                delimiter_crc: 1,
            })
        );

        let record = encode(
            &tx,
            5180,
            None,
            None,
            MpduInfo::new(MpduType::Last, 12),
            &prepend_delimiter(b"mpdu-two", false),
        )
        .unwrap();
        let status = record.header.ampdu.unwrap();
        assert_eq!(status.flags, AMPDU_STATUS_LAST_KNOWN | AMPDU_STATUS_LAST);
    }

    #[test]
    fn test_eof_delimiter_marks_last() {
        let tx = TxVector::new(Modulation::Vht { mcs: 3 }, ChannelWidth::Mhz20).with_aggregation(true);
        let record = encode(
            &tx,
            5180,
            None,
            None,
            MpduInfo::new(MpduType::Single, 1),
            &prepend_delimiter(b"x", true),
        )
        .unwrap();
        assert_ne!(record.header.ampdu.unwrap().flags & AMPDU_STATUS_LAST, 0);

        // EOF with zero length is padding, not a last MPDU
        let record = encode(
            &tx,
            5180,
            None,
            None,
            MpduInfo::new(MpduType::Middle, 1),
            &prepend_delimiter(b"", true),
        )
        .unwrap();
        assert_eq!(record.header.ampdu.unwrap().flags & AMPDU_STATUS_LAST, 0);
    }

    #[test]
    fn test_aggregate_without_delimiter_fails() {
        let tx = TxVector::new(Modulation::Vht { mcs: 3 }, ChannelWidth::Mhz20).with_aggregation(true);
        let err = encode(&tx, 5180, None, None, MpduInfo::default(), b"ab").unwrap_err();
        assert!(matches!(err, EncodeError::Delimiter(_)));
    }
}
