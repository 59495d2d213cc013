//! Integration tests for the simulation harness
//!
//! These tests run complete multi-node exchanges:
//! - Uplink OFDMA from two stations to an access point, with a bystander
//! - Adjacent-channel leakage between neighbouring channels
//! - A-MPDU captures and their radiotap encoding
//! - The bundled demo scenarios

use std::time::Duration;

use wifi_radiotap::header::{AMPDU_STATUS_LAST, AMPDU_STATUS_LAST_KNOWN, HE_DATA1_FORMAT_TRIG};
use wifi_radiotap::{FamilyBlock, MpduInfo, MpduType, RadiotapHeader};
use wifi_sim::{Frame, MediumConfig, NodeConfig, Scenario, Simulator, VirtualMedium};
use wifi_spectrum::{
    ChannelWidth, HeFormat, Modulation, NodeId, PhyConfig, PhyEvent, Ppdu, RuSpec, RuType,
    RxFailureReason, TxVector,
};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn us(v: u64) -> Duration {
        Duration::from_micros(v)
    }

    pub fn simulator(loss_db: f64) -> Simulator {
        Simulator::new(VirtualMedium::new(&MediumConfig {
            loss_db,
            ..Default::default()
        }))
    }

    pub fn node(phy: PhyConfig, capture: bool) -> NodeConfig {
        NodeConfig {
            phy,
            capture,
            ..Default::default()
        }
    }

    pub fn he_su(mcs: u8) -> TxVector {
        TxVector::new(
            Modulation::He {
                mcs,
                format: HeFormat::Su,
            },
            ChannelWidth::Mhz20,
        )
    }

    pub fn tb(sta_id: u16) -> TxVector {
        TxVector::new(
            Modulation::He {
                mcs: 2,
                format: HeFormat::Tb {
                    sta_id,
                    ru: RuSpec::new(RuType::Ru106, sta_id),
                },
            },
            ChannelWidth::Mhz20,
        )
    }

    pub fn frame(body: &[u8]) -> Frame {
        Frame {
            mpdu: body.to_vec(),
            info: MpduInfo::default(),
        }
    }

    pub fn received(sim: &Simulator, node: NodeId) -> Vec<(u64, Option<u16>)> {
        sim.events_at(node)
            .filter_map(|e| match e {
                PhyEvent::RxOk { uid, sta_id, .. } => Some((*uid, *sta_id)),
                _ => None,
            })
            .collect()
    }

    pub fn failures(sim: &Simulator, node: NodeId) -> Vec<(u64, RxFailureReason)> {
        sim.events_at(node)
            .filter_map(|e| match e {
                PhyEvent::RxFailed { uid, reason, .. } => Some((*uid, *reason)),
                _ => None,
            })
            .collect()
    }

    /// Power `node` saw when `sender`'s first emission arrived
    pub fn arrival_dbm(sim: &Simulator, node: NodeId, sender: NodeId) -> Option<f64> {
        sim.events_at(node).find_map(|e| match e {
            PhyEvent::SignalArrival {
                sender: Some(s),
                rx_power_dbm,
                ..
            } if *s == sender => Some(*rx_power_dbm),
            _ => None,
        })
    }

    pub fn all_idle(sim: &Simulator, nodes: &[NodeId]) -> bool {
        nodes
            .iter()
            .all(|id| sim.phy(*id).is_some_and(|phy| phy.state().is_idle()))
    }
}

use helpers::us;

// ============================================================================
// Uplink OFDMA Tests
// ============================================================================

mod uplink_ofdma_tests {
    use super::*;

    const UID: u64 = 42;
    const AP: NodeId = 10;
    const BYSTANDER: NodeId = 20;

    fn run() -> Simulator {
        let mut sim = helpers::simulator(50.0);
        sim.add_node(1, NodeConfig::default()).unwrap();
        sim.add_node(2, NodeConfig::default()).unwrap();
        let ap = PhyConfig {
            ul_mu_receiver: true,
            ..PhyConfig::default()
        };
        sim.add_node(AP, helpers::node(ap, true)).unwrap();
        sim.add_node(BYSTANDER, helpers::node(PhyConfig::default(), true))
            .unwrap();

        for sta in [1u16, 2] {
            let ppdu = Ppdu::new(UID, helpers::tb(sta), us(248));
            let body = format!("station {}", sta);
            sim.schedule_ppdu(us(0), sta as NodeId, ppdu, helpers::frame(body.as_bytes()))
                .unwrap();
        }
        sim.run().unwrap();
        sim
    }

    #[test]
    fn access_point_receives_every_station() {
        let sim = run();
        let mut received = helpers::received(&sim, AP);
        received.sort();
        assert_eq!(received, vec![(UID, Some(1)), (UID, Some(2))]);
        assert!(helpers::failures(&sim, AP).is_empty());
    }

    #[test]
    fn access_point_captures_trigger_based_frames() {
        let sim = run();
        let mut bodies: Vec<&[u8]> = sim
            .captures()
            .iter()
            .filter(|c| c.node == AP)
            .map(|c| c.record.payload.as_slice())
            .collect();
        bodies.sort();
        assert_eq!(bodies, vec![&b"station 1"[..], &b"station 2"[..]]);

        for capture in sim.captures() {
            assert_eq!(capture.record.header.tsft, 248);
            match capture.record.header.family {
                FamilyBlock::He(he) => assert_eq!(he.word(1) & 0x0003, HE_DATA1_FORMAT_TRIG),
                other => panic!("expected an HE block, got {:?}", other),
            }
        }
    }

    #[test]
    fn bystander_drops_payloads() {
        let sim = run();
        assert!(helpers::received(&sim, BYSTANDER).is_empty());
        assert!(sim.captures().iter().all(|c| c.node != BYSTANDER));
        assert!(helpers::failures(&sim, BYSTANDER)
            .iter()
            .any(|(uid, reason)| *uid == UID && *reason == RxFailureReason::Interference));
    }

    #[test]
    fn everyone_ends_idle() {
        let sim = run();
        assert!(helpers::all_idle(&sim, &[1, 2, AP, BYSTANDER]));
        assert_eq!(sim.now(), us(248));
    }
}

// ============================================================================
// Adjacent Channel Tests
// ============================================================================

mod adjacent_channel_tests {
    use super::*;

    #[test]
    fn neighbour_sees_only_leakage() {
        let mut sim = helpers::simulator(50.0);
        sim.add_node(1, NodeConfig::default()).unwrap();
        sim.add_node(2, NodeConfig::default()).unwrap();
        let neighbour = PhyConfig::default().with_frequency(5200);
        sim.add_node(3, helpers::node(neighbour, false)).unwrap();

        sim.schedule_ppdu(us(0), 1, Ppdu::new(1, helpers::he_su(3), us(200)), Frame::default())
            .unwrap();
        sim.run().unwrap();

        let co_channel = helpers::arrival_dbm(&sim, 2, 1).unwrap();
        let adjacent = helpers::arrival_dbm(&sim, 3, 1).unwrap();
        assert!((-35.0..=-33.0).contains(&co_channel), "co-channel {}", co_channel);
        assert!(
            adjacent < co_channel - 15.0,
            "adjacent {} vs co-channel {}",
            adjacent,
            co_channel
        );
        assert_eq!(helpers::received(&sim, 2), vec![(1, None)]);
    }

    #[test]
    fn link_override_drops_below_sensitivity() {
        let mut sim = helpers::simulator(50.0);
        sim.add_node(1, NodeConfig::default()).unwrap();
        sim.add_node(2, NodeConfig::default()).unwrap();
        sim.medium_mut().set_loss(1, 2, 140.0);

        sim.schedule_ppdu(us(0), 1, Ppdu::new(1, helpers::he_su(0), us(100)), Frame::default())
            .unwrap();
        sim.run().unwrap();

        assert!(helpers::received(&sim, 2).is_empty());
        assert!(helpers::failures(&sim, 2).is_empty());
        assert!(helpers::arrival_dbm(&sim, 2, 1).is_some_and(|dbm| dbm < -101.0));
    }
}

// ============================================================================
// Capture Tests
// ============================================================================

mod capture_tests {
    use super::*;

    #[test]
    fn aggregated_frame_is_captured_without_delimiter() {
        let mut sim = helpers::simulator(50.0);
        sim.add_node(1, NodeConfig::default()).unwrap();
        sim.add_node(2, helpers::node(PhyConfig::default(), true))
            .unwrap();

        let tx = helpers::he_su(4).with_aggregation(true);
        let frame = Frame {
            mpdu: b"abc".to_vec(),
            info: MpduInfo::new(MpduType::Last, 3),
        };
        sim.schedule_ppdu(us(100), 1, Ppdu::new(5, tx, us(150)), frame)
            .unwrap();
        sim.run().unwrap();

        assert_eq!(sim.captures().len(), 1);
        let record = &sim.captures()[0].record;
        assert_eq!(record.payload, b"abc");
        assert_eq!(record.header.tsft, 250);

        let ampdu = record.header.ampdu.unwrap();
        assert_eq!(ampdu.reference, 3);
        assert_eq!(
            ampdu.flags & (AMPDU_STATUS_LAST_KNOWN | AMPDU_STATUS_LAST),
            AMPDU_STATUS_LAST_KNOWN | AMPDU_STATUS_LAST
        );

        let bytes = record.to_bytes();
        let (parsed, len) = RadiotapHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, record.header);
        assert_eq!(&bytes[len..], b"abc");
    }

    #[test]
    fn failed_receptions_are_not_captured() {
        let mut sim = helpers::simulator(50.0);
        for id in 1..=3 {
            sim.add_node(id, helpers::node(PhyConfig::default(), true))
                .unwrap();
        }
        sim.schedule_ppdu(us(0), 1, Ppdu::new(1, helpers::he_su(0), us(200)), Frame::default())
            .unwrap();
        sim.schedule_ppdu(us(0), 2, Ppdu::new(2, helpers::he_su(0), us(200)), Frame::default())
            .unwrap();
        sim.run().unwrap();

        assert!(sim.captures().iter().all(|c| c.node != 3));
    }
}

// ============================================================================
// Demo Scenario Tests
// ============================================================================

mod demo_tests {
    use super::*;

    const UL_OFDMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/ul_ofdma.json"));
    const COLLISION: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/collision.json"));

    #[test]
    fn ul_ofdma_demo() {
        let sim = Scenario::from_json(UL_OFDMA).unwrap().run().unwrap();
        let mut received = helpers::received(&sim, 10);
        received.sort();
        assert_eq!(received, vec![(42, Some(1)), (42, Some(2))]);
        assert_eq!(sim.captures().len(), 2);
        assert!(helpers::received(&sim, 20).is_empty());
    }

    #[test]
    fn collision_demo() {
        let sim = Scenario::from_json(COLLISION).unwrap().run().unwrap();

        // Only the PPDU sent after the collision gets through
        assert_eq!(helpers::received(&sim, 3), vec![(3, None)]);
        let failed: Vec<u64> = helpers::failures(&sim, 3).iter().map(|(uid, _)| *uid).collect();
        assert!(failed.contains(&1));
        assert!(failed.contains(&2));

        assert_eq!(sim.captures().len(), 1);
        assert_eq!(sim.captures()[0].record.payload, b"after the collision");
        assert!(sim.captures()[0].record.header.ampdu.is_some());

        for id in [1, 2, 3] {
            assert!(sim
                .events_at(id)
                .any(|e| matches!(e, PhyEvent::CcaBusy { until } if *until == us(650))));
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn modulation() -> impl Strategy<Value = Modulation> {
        prop_oneof![
            (0u8..=5).prop_map(|mcs| Modulation::He {
                mcs,
                format: HeFormat::Su
            }),
            (0u8..=5).prop_map(|mcs| Modulation::Vht { mcs }),
            Just(Modulation::He {
                mcs: 0,
                format: HeFormat::ErSu
            }),
        ]
    }

    proptest! {
        #[test]
        fn lone_frame_is_received(
            modulation in modulation(),
            loss_db in 40.0f64..80.0,
            start_us in 0u64..1_000,
        ) {
            let mut sim = helpers::simulator(loss_db);
            sim.add_node(1, NodeConfig::default()).unwrap();
            sim.add_node(2, helpers::node(PhyConfig::default(), true)).unwrap();

            let tx = TxVector::new(modulation, ChannelWidth::Mhz20);
            sim.schedule_ppdu(us(start_us), 1, Ppdu::new(1, tx, us(300)), helpers::frame(b"x"))
                .unwrap();
            sim.run().unwrap();

            prop_assert_eq!(helpers::received(&sim, 2), vec![(1, None)]);
            prop_assert_eq!(sim.captures().len(), 1);
            let signal = sim.captures()[0].record.header.antenna_signal_dbm.unwrap();
            let expected = 16.0206 - loss_db;
            prop_assert!((f64::from(signal) - expected).abs() <= 1.0);
        }

        #[test]
        fn runs_are_reproducible(
            offsets in proptest::collection::vec(0u64..300, 1..5),
        ) {
            let build = || {
                let mut sim = helpers::simulator(50.0);
                for id in 1..=4 {
                    sim.add_node(id, NodeConfig::default()).unwrap();
                }
                for (i, offset) in offsets.iter().enumerate() {
                    let sender = (i % 3) as NodeId + 1;
                    let ppdu = Ppdu::new(i as u64 + 1, helpers::he_su(1), us(200));
                    sim.schedule_ppdu(us(*offset), sender, ppdu, Frame::default()).unwrap();
                }
                sim.run().unwrap();
                sim
            };
            let first = build();
            let second = build();
            prop_assert_eq!(first.events(), second.events());
            prop_assert!(helpers::all_idle(&first, &[1, 2, 3, 4]));
        }
    }
}
