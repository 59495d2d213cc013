//! Interference accumulator
//!
//! Tracks, per registered band, every signal currently on the air together
//! with its validity interval. Queries only count contributions whose
//! interval `[start, end)` contains the query time, so expired signals never
//! leak into a result even before [`InterferenceLedger::prune`] runs.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};

use crate::band::Band;

/// Stable index of a registered band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BandId(pub usize);

/// Ledger-assigned id of one contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub u64);

/// Contributions left out of a power query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Count everything
    None,
    /// Leave out one contribution (the signal being received)
    Signal(SignalId),
    /// Leave out every part of one PPDU (all stations of an uplink MU PPDU)
    Ppdu(u64),
}

#[derive(Debug, Clone)]
struct Contribution {
    id: SignalId,
    ppdu_uid: Option<u64>,
    start: Duration,
    end: Duration,
    /// Power per band, indexed by `BandId`
    powers: Vec<f64>,
}

impl Contribution {
    fn active_at(&self, at: Duration) -> bool {
        self.start <= at && at < self.end
    }

    fn excluded_by(&self, exclusion: Exclusion) -> bool {
        match exclusion {
            Exclusion::None => false,
            Exclusion::Signal(id) => self.id == id,
            Exclusion::Ppdu(uid) => self.ppdu_uid == Some(uid),
        }
    }
}

/// One stretch of constant SINR
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinrChunk {
    pub start: Duration,
    pub end: Duration,
    /// Linear SINR
    pub sinr: f64,
}

impl SinrChunk {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Per-band time-stamped sum of concurrent signal powers
#[derive(Debug, Default)]
pub struct InterferenceLedger {
    bands: Vec<Band>,
    index: HashMap<Band, BandId>,
    contributions: Vec<Contribution>,
    next_signal: u64,
}

impl InterferenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a band; registering the same band twice returns the same id
    pub fn add_band(&mut self, band: Band) -> BandId {
        if let Some(id) = self.index.get(&band) {
            return *id;
        }
        let id = BandId(self.bands.len());
        self.bands.push(band);
        self.index.insert(band, id);
        for c in &mut self.contributions {
            c.powers.push(0.0);
        }
        id
    }

    /// Look up the id of a registered band
    pub fn band_id(&self, band: &Band) -> Option<BandId> {
        self.index.get(band).copied()
    }

    pub fn band(&self, id: BandId) -> Option<Band> {
        self.bands.get(id.0).copied()
    }

    /// Registered bands in id order
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Forget every band and every contribution
    pub fn remove_all_bands(&mut self) {
        debug!(
            "Clearing {} bands and {} contributions",
            self.bands.len(),
            self.contributions.len()
        );
        self.bands.clear();
        self.index.clear();
        self.contributions.clear();
    }

    /// Record a Wi-Fi signal on the air over `[start, end)`
    ///
    /// `powers` holds one value per registered band, in id order.
    pub fn add_signal(
        &mut self,
        start: Duration,
        end: Duration,
        powers: Vec<f64>,
        ppdu_uid: Option<u64>,
    ) -> SignalId {
        let id = SignalId(self.next_signal);
        self.next_signal += 1;

        let mut powers = powers;
        powers.resize(self.bands.len(), 0.0);
        trace!(
            "Signal {} ({:?}) on air {:?}..{:?}",
            id.0,
            ppdu_uid,
            start,
            end
        );
        self.contributions.push(Contribution {
            id,
            ppdu_uid,
            start,
            end,
            powers,
        });
        id
    }

    /// Record non-decodable energy starting now
    pub fn add_foreign_signal(
        &mut self,
        now: Duration,
        duration: Duration,
        powers: Vec<f64>,
    ) -> SignalId {
        self.add_signal(now, now + duration, powers, None)
    }

    /// Total power in `band` at time `at`
    pub fn query_interference_power(&self, band: BandId, at: Duration) -> f64 {
        self.power_excluding(band, at, Exclusion::None)
    }

    /// Power in `band` at `at`, leaving out the excluded contributions
    pub fn power_excluding(&self, band: BandId, at: Duration, exclusion: Exclusion) -> f64 {
        self.contributions
            .iter()
            .filter(|c| c.active_at(at) && !c.excluded_by(exclusion))
            .map(|c| c.powers.get(band.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Power summed over several bands
    pub fn power_over(&self, bands: &[BandId], at: Duration, exclusion: Exclusion) -> f64 {
        bands
            .iter()
            .map(|b| self.power_excluding(*b, at, exclusion))
            .sum()
    }

    /// Sorted, de-duplicated times inside `(from, to)` at which the set of
    /// active contributions changes
    pub fn change_points(&self, from: Duration, to: Duration) -> Vec<Duration> {
        let mut points: Vec<Duration> = self
            .contributions
            .iter()
            .flat_map(|c| [c.start, c.end])
            .filter(|t| *t > from && *t < to)
            .collect();
        points.sort();
        points.dedup();
        points
    }

    /// Earliest time at or after `now` when the power in `band` drops below
    /// `threshold_w`
    pub fn energy_end(&self, band: BandId, now: Duration, threshold_w: f64) -> Duration {
        if self.query_interference_power(band, now) < threshold_w {
            return now;
        }
        let mut ends: Vec<Duration> = self
            .contributions
            .iter()
            .flat_map(|c| [c.start, c.end])
            .filter(|t| *t > now)
            .collect();
        ends.sort();
        ends.dedup();
        for t in ends {
            if self.query_interference_power(band, t) < threshold_w {
                return t;
            }
        }
        // only a non-positive threshold gets here
        self.contributions
            .iter()
            .map(|c| c.end)
            .max()
            .unwrap_or(now)
    }

    /// Split `[from, to)` at every change point and compute the SINR of a
    /// signal of `signal_w` over `bands` in each piece
    pub fn sinr_chunks(
        &self,
        bands: &[BandId],
        signal_w: f64,
        noise_w: f64,
        exclusion: Exclusion,
        from: Duration,
        to: Duration,
    ) -> Vec<SinrChunk> {
        if to <= from {
            return Vec::new();
        }
        let mut edges = vec![from];
        edges.extend(self.change_points(from, to));
        edges.push(to);

        edges
            .windows(2)
            .map(|w| {
                let interference = self.power_over(bands, w[0], exclusion);
                SinrChunk {
                    start: w[0],
                    end: w[1],
                    sinr: signal_w / (noise_w + interference),
                }
            })
            .collect()
    }

    /// Drop contributions that ended at or before `before`
    pub fn prune(&mut self, before: Duration) {
        let len = self.contributions.len();
        self.contributions.retain(|c| c.end > before);
        let dropped = len - self.contributions.len();
        if dropped > 0 {
            trace!("Pruned {} expired contributions", dropped);
        }
    }

    /// Number of contributions still stored
    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}
