//! Replay a JSON scenario through spectrum PHYs
//!
//! ```text
//! spectrum-replay <scenario.json> [--hex]
//! ```
//!
//! Prints every PHY outcome and a summary of the radiotap captures; with
//! `--hex` the capture records are dumped as well.

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wifi_sim::Scenario;
use wifi_spectrum::PhyEvent;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "spectrum_replay=info,wifi_spectrum=info,wifi_radiotap=info,wifi_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut path = None;
    let mut hex = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--hex" => hex = true,
            other if path.is_none() => path = Some(other.to_string()),
            other => bail!("unexpected argument: {}", other),
        }
    }
    let Some(path) = path else {
        bail!("usage: spectrum-replay <scenario.json> [--hex]");
    };

    let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let scenario = Scenario::from_json(&json).with_context(|| format!("parsing {}", path))?;
    tracing::info!(
        "Replaying {} with {} nodes, {} transmissions",
        path,
        scenario.nodes.len(),
        scenario.transmissions.len()
    );

    let sim = scenario.run().context("running scenario")?;

    for logged in sim.events().iter().filter(|e| e.event.is_outcome()) {
        let at = logged.at.as_micros();
        match &logged.event {
            PhyEvent::RxOk {
                uid,
                sta_id,
                sender,
                quality,
                ..
            } => println!(
                "{:>8} us  node {:>3}  RX OK    ppdu {} sta {:?} from {:?}  rssi {:.1} dBm  sinr {:.1} dB",
                at, logged.node, uid, sta_id, sender, quality.rssi_dbm, quality.sinr_db
            ),
            PhyEvent::RxFailed {
                uid,
                sta_id,
                sender,
                reason,
            } => println!(
                "{:>8} us  node {:>3}  RX FAIL  ppdu {} sta {:?} from {:?}  {}",
                at, logged.node, uid, sta_id, sender, reason
            ),
            _ => {}
        }
    }

    println!("{} captures", sim.captures().len());
    for capture in sim.captures() {
        let bytes = capture.record.to_bytes();
        println!(
            "  node {:>3}  tsft {:>8}  {} MHz  {} bytes",
            capture.node,
            capture.record.header.tsft,
            capture.record.header.channel.frequency_mhz,
            bytes.len()
        );
        if hex {
            println!("    {:02X?}", bytes);
        }
    }

    Ok(())
}
