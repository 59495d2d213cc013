//! Spectrum-aware PHY
//!
//! [`SpectrumPhy`] receives [`SignalObservation`]s, integrates their power
//! over its registered bands, keeps the interference ledger up to date and
//! drives the receive state machine. Outcomes are buffered as
//! [`PhyEvent`]s; deferred work goes through a [`Scheduler`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::band::SpectrumGrid;
use crate::channel::{ChannelWidth, Standard};
use crate::config::PhyConfig;
use crate::decode::{self, DecodeThresholds};
use crate::error::ConfigError;
use crate::events::{PhyEvent, RxFailureReason, RxStateKind, SignalQuality};
use crate::interference::{BandId, Exclusion, InterferenceLedger, SignalId};
use crate::ru::{self, RuSpec};
use crate::signal::{NodeId, Ppdu, SignalObservation};
use crate::state::{decide, Decision, HeaderSlot, RxContext, RxState};
use crate::timer::{PhyTimer, Scheduler};
use crate::units::{db_to_ratio, dbm_to_w, thermal_noise_w, w_to_dbm};

/// A receiving Wi-Fi PHY attached to a spectrum channel
pub struct SpectrumPhy {
    config: PhyConfig,
    grid: SpectrumGrid,
    ledger: InterferenceLedger,
    /// Narrow-channel band, or one band per 20 MHz sub-channel (primary first)
    channel_bands: Vec<BandId>,
    /// RU bands per transmission width, for PPDUs up to the channel width
    ru_bands: HashMap<(ChannelWidth, RuSpec), BandId>,
    state: RxState,
    cca_busy_until: Duration,
    event_buffer: Vec<PhyEvent>,
}

impl SpectrumPhy {
    /// Create a PHY tuned as described by `config`
    pub fn new(config: PhyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = config.grid()?;
        let mut phy = Self {
            config,
            grid,
            ledger: InterferenceLedger::new(),
            channel_bands: Vec::new(),
            ru_bands: HashMap::new(),
            state: RxState::Idle,
            cca_busy_until: Duration::ZERO,
            event_buffer: Vec::new(),
        };
        phy.register_bands()?;
        Ok(phy)
    }

    /// Get the current configuration
    pub fn config(&self) -> &PhyConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpectrumGrid {
        &self.grid
    }

    pub fn standard(&self) -> Standard {
        self.config.standard
    }

    pub fn channel_width(&self) -> ChannelWidth {
        self.grid.width()
    }

    pub fn frequency_mhz(&self) -> u16 {
        self.grid.center_mhz()
    }

    pub fn ledger(&self) -> &InterferenceLedger {
        &self.ledger
    }

    pub fn state(&self) -> &RxState {
        &self.state
    }

    pub fn state_kind(&self) -> RxStateKind {
        self.state.kind()
    }

    /// Bands total received power is summed over
    pub fn channel_bands(&self) -> &[BandId] {
        &self.channel_bands
    }

    /// Ledger band of an RU of a full-width PPDU (HE standards only)
    pub fn ru_band_id(&self, ru: &RuSpec) -> Option<BandId> {
        self.ru_band_id_for(self.grid.width(), ru)
    }

    /// Ledger band of an RU of a `width` PPDU (HE standards only)
    pub fn ru_band_id_for(&self, width: ChannelWidth, ru: &RuSpec) -> Option<BandId> {
        self.ru_bands.get(&(width, *ru)).copied()
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<PhyEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    /// Whether the channel is busy at `now`, either receiving or by energy
    pub fn is_cca_busy(&self, now: Duration) -> bool {
        !self.state.is_idle() || now < self.cca_busy_until
    }

    /// Time energy detection last reported the channel busy until
    pub fn cca_busy_until(&self) -> Duration {
        self.cca_busy_until
    }

    // -------------------------------------------------------------------------
    // Reconfiguration
    // -------------------------------------------------------------------------

    /// Change the channel width
    pub fn set_channel_width(&mut self, width: ChannelWidth) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.channel_width = Some(width);
        self.reconfigure(config)
    }

    /// Retune to another center frequency
    pub fn set_frequency(&mut self, mhz: u16) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.frequency_mhz = Some(mhz);
        self.reconfigure(config)
    }

    /// Switch standard; a width the new standard lacks falls back to its default
    pub fn configure_standard(&mut self, standard: Standard) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.standard = standard;
        if !standard.supports_width(config.width()) {
            config.channel_width = None;
        }
        self.reconfigure(config)
    }

    fn reconfigure(&mut self, config: PhyConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let grid = config.grid()?;
        self.config = config;
        self.grid = grid;
        self.register_bands()?;
        self.transition(RxState::Idle);
        self.cca_busy_until = Duration::ZERO;
        info!(
            "PHY tuned to {} MHz, {}, {} ({} bins)",
            self.grid.center_mhz(),
            self.grid.width(),
            self.config.standard,
            self.grid.num_bins()
        );
        Ok(())
    }

    fn register_bands(&mut self) -> Result<(), ConfigError> {
        self.ledger.remove_all_bands();
        self.channel_bands = self
            .grid
            .channel_bands()?
            .into_iter()
            .map(|band| self.ledger.add_band(band))
            .collect();

        self.ru_bands.clear();
        if self.config.standard.is_he() && self.grid.width() >= ChannelWidth::Mhz20 {
            for width in ru::ru_widths(&self.grid) {
                for (ru, band) in ru::ru_bands_for_width(&self.grid, width)? {
                    let id = self.ledger.add_band(band);
                    self.ru_bands.insert((width, ru), id);
                }
            }
        }
        debug!(
            "Registered {} channel bands and {} RU bands",
            self.channel_bands.len(),
            self.ru_bands.len()
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reception
    // -------------------------------------------------------------------------

    /// Handle a signal starting to arrive now
    ///
    /// Only a spectrum that cannot be mapped onto this PHY's grid is an
    /// error; every per-signal outcome is reported as an event.
    pub fn deliver(
        &mut self,
        sched: &mut dyn Scheduler,
        obs: SignalObservation,
    ) -> Result<(), ConfigError> {
        let now = sched.now();
        let decodable = obs.is_decodable();
        let psd = if *obs.psd.grid() == self.grid {
            obs.psd
        } else {
            obs.psd.convert_to(&self.grid)?
        };

        let gain = db_to_ratio(self.config.rx_gain_db);
        let powers: Vec<f64> = self
            .ledger
            .bands()
            .iter()
            .map(|band| psd.band_power(band) * gain)
            .collect();
        let total_w: f64 = self.channel_bands.iter().map(|b| powers[b.0]).sum();
        let rx_power_dbm = w_to_dbm(total_w);

        self.event_buffer.push(PhyEvent::SignalArrival {
            decodable,
            sender: obs.sender,
            rx_power_dbm,
            duration: obs.duration,
        });

        if rx_power_dbm < self.config.rx_sensitivity_dbm {
            debug!(
                "Ignoring signal from {:?}: {:.1} dBm below sensitivity {:.1} dBm",
                obs.sender, rx_power_dbm, self.config.rx_sensitivity_dbm
            );
            return Ok(());
        }

        let horizon = self.state.earliest_start().unwrap_or(now).min(now);
        self.ledger.prune(horizon);
        let signal = self.ledger.add_signal(
            now,
            now + obs.duration,
            powers.clone(),
            obs.ppdu.map(|p| p.uid),
        );

        let enabled = !self.config.disable_reception
            && obs.ppdu.as_ref().is_some_and(|p| self.can_receive(p));
        let decision = decide(
            &self.state,
            obs.ppdu.as_ref(),
            obs.duration,
            self.config.ul_mu_receiver,
            enabled,
        );
        trace!("Signal {:?} -> {:?}", signal, decision);

        let Some(ppdu) = obs.ppdu else {
            debug!("Foreign signal at {:.1} dBm for {:?}", rx_power_dbm, obs.duration);
            self.mark_cca_busy(now, obs.duration);
            return Ok(());
        };
        let sta_id = ppdu.tx_vector.trigger_based().map(|(sta, _)| sta);

        match decision {
            Decision::Foreign => {
                debug!(
                    "Handling PPDU {} from {:?} as foreign energy",
                    ppdu.uid, obs.sender
                );
                self.mark_cca_busy(now, obs.duration);
            }
            Decision::Busy => {
                debug!(
                    "PPDU {} arrived while {}; not synchronizing",
                    ppdu.uid,
                    self.state.kind()
                );
                self.event_buffer.push(PhyEvent::RxFailed {
                    uid: ppdu.uid,
                    sta_id,
                    sender: obs.sender,
                    reason: RxFailureReason::NotSynchronized,
                });
                self.mark_cca_busy(now, obs.duration);
            }
            Decision::BeginSync => {
                let bands = self.measurement_bands(&ppdu, false)?;
                let ctx = self.context(
                    signal,
                    ppdu,
                    obs.sender,
                    now,
                    obs.duration,
                    bands,
                    &powers,
                    None,
                );
                self.emit_rx_start(&ctx);
                sched.schedule(obs.duration, PhyTimer::RxEnd { rx_id: ctx.rx_id() });
                self.transition(RxState::SyncInProgress { ctx });
            }
            Decision::BeginMuHeader | Decision::JoinMuHeader => {
                let sta = sta_id.unwrap_or_default();
                let bands = self.measurement_bands(&ppdu, false)?;
                let ctx = self.context(
                    signal,
                    ppdu,
                    obs.sender,
                    now,
                    obs.duration,
                    bands,
                    &powers,
                    sta_id,
                );
                self.emit_rx_start(&ctx);
                sched.schedule(
                    obs.duration,
                    PhyTimer::MuHeaderEnd {
                        uid: ppdu.uid,
                        sta_id: sta,
                        rx_id: ctx.rx_id(),
                    },
                );
                let slot = HeaderSlot { ctx, passed: false };

                if decision == Decision::BeginMuHeader {
                    sched.schedule(ppdu.duration, PhyTimer::MuPpduEnd { uid: ppdu.uid });
                    let mut pending = BTreeMap::new();
                    pending.insert(sta, slot);
                    self.transition(RxState::MultiUserHeader {
                        uid: ppdu.uid,
                        pending,
                        payloads: BTreeMap::new(),
                        ppdu_end: now + ppdu.duration,
                    });
                } else if let RxState::MultiUserHeader { pending, .. } = &mut self.state {
                    pending.insert(sta, slot);
                }
            }
            Decision::RoutePayload { sta_id: sta } => {
                let bands = self.measurement_bands(&ppdu, true)?;
                let ctx = self.context(
                    signal,
                    ppdu,
                    obs.sender,
                    now,
                    obs.duration,
                    bands,
                    &powers,
                    Some(sta),
                );
                debug!("OFDMA payload of STA {} for PPDU {}", sta, ppdu.uid);
                sched.schedule(
                    obs.duration,
                    PhyTimer::PayloadEnd {
                        uid: ppdu.uid,
                        sta_id: sta,
                        rx_id: ctx.rx_id(),
                    },
                );
                match &mut self.state {
                    RxState::MultiUserHeader { payloads, .. }
                    | RxState::PayloadPending { payloads, .. } => {
                        payloads.insert(sta, ctx);
                    }
                    _ => warn!("Payload routed without an open MU context"),
                }
            }
            Decision::DropMuPayload { uid } => {
                debug!(
                    "OFDMA payload of PPDU {} not expected here; dropping as interference",
                    uid
                );
                self.event_buffer.push(PhyEvent::RxFailed {
                    uid,
                    sta_id,
                    sender: obs.sender,
                    reason: RxFailureReason::Interference,
                });
                if matches!(&self.state, RxState::MultiUserHeader { uid: open, .. } if *open == uid)
                {
                    self.transition(RxState::Idle);
                }
                self.mark_cca_busy(now, obs.duration);
            }
        }
        Ok(())
    }

    /// Handle a timer previously handed to the scheduler
    pub fn on_timer(&mut self, sched: &mut dyn Scheduler, timer: PhyTimer) {
        let now = sched.now();
        match timer {
            PhyTimer::RxEnd { rx_id } => self.end_single(rx_id),
            PhyTimer::MuHeaderEnd { uid, sta_id, rx_id } => self.end_mu_header(uid, sta_id, rx_id),
            PhyTimer::PayloadEnd { uid, sta_id, rx_id } => self.end_payload(uid, sta_id, rx_id),
            PhyTimer::MuPpduEnd { uid } => self.end_mu_ppdu(uid),
        }
        trace!("Timer {:?} handled at {:?}", timer, now);
    }

    fn end_single(&mut self, rx_id: u64) {
        let ctx = match &self.state {
            RxState::SyncInProgress { ctx } if ctx.rx_id() == rx_id => ctx.clone(),
            _ => {
                trace!("Stale RX end for {}", rx_id);
                return;
            }
        };
        let outcome = self.evaluate_full(&ctx);
        self.report(&ctx, outcome);
        self.transition(RxState::Idle);
    }

    fn end_mu_header(&mut self, uid: u64, sta_id: u16, rx_id: u64) {
        let ctx = match &self.state {
            RxState::MultiUserHeader {
                uid: open, pending, ..
            } if *open == uid => match pending.get(&sta_id) {
                Some(slot) if slot.ctx.rx_id() == rx_id && !slot.passed => slot.ctx.clone(),
                _ => return,
            },
            _ => {
                trace!("Stale MU header end for PPDU {} STA {}", uid, sta_id);
                return;
            }
        };

        let outcome = self.evaluate_header(&ctx);
        let ul_mu_receiver = self.config.ul_mu_receiver;
        let next = match &mut self.state {
            RxState::MultiUserHeader {
                pending,
                payloads,
                ppdu_end,
                ..
            } => {
                match outcome {
                    Ok(()) => {
                        if let Some(slot) = pending.get_mut(&sta_id) {
                            slot.passed = true;
                        }
                        debug!("MU header of STA {} for PPDU {} received", sta_id, uid);
                    }
                    Err(reason) => {
                        pending.remove(&sta_id);
                        payloads.remove(&sta_id);
                        self.event_buffer.push(PhyEvent::RxFailed {
                            uid,
                            sta_id: Some(sta_id),
                            sender: ctx.sender,
                            reason,
                        });
                    }
                }
                if pending.is_empty() {
                    Some(RxState::Idle)
                } else if ul_mu_receiver && pending.values().all(|s| s.passed) {
                    Some(RxState::PayloadPending {
                        uid,
                        payloads: std::mem::take(payloads),
                        expected: pending.keys().copied().collect::<BTreeSet<_>>(),
                        ppdu_end: *ppdu_end,
                    })
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(next) = next {
            self.transition(next);
        }
    }

    fn end_payload(&mut self, uid: u64, sta_id: u16, rx_id: u64) {
        let ctx = match &self.state {
            RxState::MultiUserHeader {
                uid: open, payloads, ..
            }
            | RxState::PayloadPending {
                uid: open, payloads, ..
            } if *open == uid => match payloads.get(&sta_id) {
                Some(ctx) if ctx.rx_id() == rx_id => ctx.clone(),
                _ => return,
            },
            _ => {
                trace!("Stale payload end for PPDU {} STA {}", uid, sta_id);
                return;
            }
        };

        let outcome = self.evaluate_payload(&ctx);
        self.report(&ctx, outcome);

        let done = match &mut self.state {
            RxState::PayloadPending {
                payloads, expected, ..
            } => {
                payloads.remove(&sta_id);
                expected.remove(&sta_id);
                payloads.is_empty() && expected.is_empty()
            }
            RxState::MultiUserHeader {
                payloads, pending, ..
            } => {
                payloads.remove(&sta_id);
                pending.remove(&sta_id);
                pending.is_empty()
            }
            _ => false,
        };
        if done {
            self.transition(RxState::Idle);
        }
    }

    fn end_mu_ppdu(&mut self, uid: u64) {
        let next = match &mut self.state {
            RxState::MultiUserHeader { uid: open, .. } if *open == uid => {
                debug!("PPDU {} over without a payload for us", uid);
                Some(RxState::Idle)
            }
            RxState::PayloadPending {
                uid: open,
                payloads,
                expected,
                ..
            } if *open == uid => {
                // stations that never sent their payload
                expected.retain(|sta| payloads.contains_key(sta));
                if payloads.is_empty() {
                    Some(RxState::Idle)
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(next) = next {
            self.transition(next);
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Whether this PHY can decode a PPDU sent with `ppdu`'s parameters
    fn can_receive(&self, ppdu: &Ppdu) -> bool {
        let tx = &ppdu.tx_vector;
        match tx.validate(self.config.standard) {
            Ok(()) => tx.channel_width <= self.grid.width(),
            Err(e) => {
                debug!("Cannot receive PPDU {}: {}", ppdu.uid, e);
                false
            }
        }
    }

    fn measurement_bands(
        &self,
        ppdu: &Ppdu,
        ofdma_payload: bool,
    ) -> Result<Vec<BandId>, ConfigError> {
        if ofdma_payload {
            let (_, ru) = ppdu
                .tx_vector
                .trigger_based()
                .ok_or(ConfigError::MissingRuAssignment)?;
            let width = ppdu.tx_vector.channel_width;
            let id = self
                .ru_band_id_for(width, &ru)
                .ok_or_else(|| ConfigError::InvalidRu {
                    ru: ru.to_string(),
                    width,
                })?;
            return Ok(vec![id]);
        }
        if self.grid.width() < ChannelWidth::Mhz20 {
            return Ok(self.channel_bands.clone());
        }
        let n = ppdu.tx_vector.channel_width.subchannels_20mhz().max(1) as usize;
        Ok(self.channel_bands.iter().take(n).copied().collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn context(
        &self,
        signal: SignalId,
        ppdu: Ppdu,
        sender: Option<NodeId>,
        now: Duration,
        duration: Duration,
        bands: Vec<BandId>,
        powers: &[f64],
        sta_id: Option<u16>,
    ) -> RxContext {
        let rx_power_w = bands.iter().map(|b| powers[b.0]).sum();
        RxContext {
            signal,
            ppdu,
            sender,
            start: now,
            end: now + duration,
            bands,
            rx_power_w,
            sta_id,
        }
    }

    fn noise_w(&self, bands: &[BandId]) -> f64 {
        let bins: usize = bands
            .iter()
            .filter_map(|b| self.ledger.band(*b))
            .map(|band| band.len())
            .sum();
        thermal_noise_w(bins as f64 * self.grid.bin_hz() as f64, self.config.noise_figure_db)
    }

    fn thresholds(&self, ppdu: &Ppdu) -> DecodeThresholds {
        DecodeThresholds {
            preamble_db: self.config.preamble_detection_snr_db,
            payload_db: ppdu.tx_vector.modulation.min_snr_db(),
        }
    }

    fn evaluate_full(&self, ctx: &RxContext) -> Result<SignalQuality, RxFailureReason> {
        let noise = self.noise_w(&ctx.bands);
        let split = (ctx.start + ctx.ppdu.tx_vector.preamble_and_header_duration()).min(ctx.end);
        let exclusion = Exclusion::Signal(ctx.signal);
        let preamble =
            self.ledger
                .sinr_chunks(&ctx.bands, ctx.rx_power_w, noise, exclusion, ctx.start, split);
        let payload =
            self.ledger
                .sinr_chunks(&ctx.bands, ctx.rx_power_w, noise, exclusion, split, ctx.end);
        decode::assess(
            ctx.rx_power_w / noise,
            &preamble,
            &payload,
            &self.thresholds(&ctx.ppdu),
            ctx.rx_power_w,
        )
    }

    fn evaluate_header(&self, ctx: &RxContext) -> Result<(), RxFailureReason> {
        let noise = self.noise_w(&ctx.bands);
        let chunks = self.ledger.sinr_chunks(
            &ctx.bands,
            ctx.rx_power_w,
            noise,
            Exclusion::Ppdu(ctx.ppdu.uid),
            ctx.start,
            ctx.end,
        );
        decode::check_preamble(ctx.rx_power_w / noise, &chunks, &self.thresholds(&ctx.ppdu))
    }

    fn evaluate_payload(&self, ctx: &RxContext) -> Result<SignalQuality, RxFailureReason> {
        let noise = self.noise_w(&ctx.bands);
        let chunks = self.ledger.sinr_chunks(
            &ctx.bands,
            ctx.rx_power_w,
            noise,
            Exclusion::Signal(ctx.signal),
            ctx.start,
            ctx.end,
        );
        decode::check_payload(
            ctx.rx_power_w / noise,
            &chunks,
            &self.thresholds(&ctx.ppdu),
            ctx.rx_power_w,
        )
    }

    fn report(&mut self, ctx: &RxContext, outcome: Result<SignalQuality, RxFailureReason>) {
        match outcome {
            Ok(quality) => {
                debug!(
                    "Received PPDU {} ({:?}) at {:.1} dBm, SINR {:.1} dB",
                    ctx.ppdu.uid, ctx.sta_id, quality.rssi_dbm, quality.sinr_db
                );
                self.event_buffer.push(PhyEvent::RxOk {
                    uid: ctx.ppdu.uid,
                    sta_id: ctx.sta_id,
                    sender: ctx.sender,
                    tx_vector: ctx.ppdu.tx_vector,
                    quality,
                });
            }
            Err(reason) => {
                debug!("PPDU {} ({:?}) failed: {}", ctx.ppdu.uid, ctx.sta_id, reason);
                self.event_buffer.push(PhyEvent::RxFailed {
                    uid: ctx.ppdu.uid,
                    sta_id: ctx.sta_id,
                    sender: ctx.sender,
                    reason,
                });
            }
        }
    }

    fn emit_rx_start(&mut self, ctx: &RxContext) {
        self.event_buffer.push(PhyEvent::RxStart {
            uid: ctx.ppdu.uid,
            sta_id: ctx.sta_id,
            rx_power_dbm: w_to_dbm(ctx.rx_power_w),
        });
    }

    fn mark_cca_busy(&mut self, now: Duration, duration: Duration) {
        let Some(primary) = self.channel_bands.first().copied() else {
            return;
        };
        let threshold_w = dbm_to_w(self.config.cca_ed_threshold_dbm);
        let until = (now + duration).max(self.ledger.energy_end(primary, now, threshold_w));
        if until > self.cca_busy_until {
            self.cca_busy_until = until;
        }
        self.event_buffer.push(PhyEvent::CcaBusy {
            until: self.cca_busy_until,
        });
    }

    fn transition(&mut self, next: RxState) {
        let from = self.state.kind();
        let to = next.kind();
        self.state = next;
        if from != to {
            debug!("RX state {} -> {}", from, to);
            self.event_buffer.push(PhyEvent::StateChanged { from, to });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::PowerSpectrum;
    use crate::mode::{HeFormat, Modulation, TxVector};
    use crate::psd::PsdSynthesizer;

    struct ManualScheduler {
        now: Duration,
        timers: Vec<(Duration, PhyTimer)>,
    }

    impl Scheduler for ManualScheduler {
        fn now(&self) -> Duration {
            self.now
        }

        fn schedule(&mut self, delay: Duration, timer: PhyTimer) {
            self.timers.push((self.now + delay, timer));
        }
    }

    fn sched() -> ManualScheduler {
        ManualScheduler {
            now: Duration::ZERO,
            timers: Vec::new(),
        }
    }

    fn he_su(phy: &SpectrumPhy, uid: u64, rx_dbm: f64) -> SignalObservation {
        let tx = TxVector::new(
            Modulation::He {
                mcs: 0,
                format: HeFormat::Su,
            },
            ChannelWidth::Mhz20,
        );
        let psd = PsdSynthesizer::default()
            .build_mask(phy.grid(), dbm_to_w(rx_dbm), &tx, false)
            .unwrap();
        let ppdu = Ppdu::new(uid, tx, Duration::from_micros(300));
        SignalObservation::wifi(1, ppdu.duration, psd, ppdu)
    }

    #[test]
    fn test_band_registration_he() {
        let phy = SpectrumPhy::new(PhyConfig::default()).unwrap();
        assert_eq!(phy.channel_bands().len(), 1);
        assert_eq!(phy.ledger().bands().len(), 1 + 9 + 4 + 2 + 1);
    }

    #[test]
    fn test_band_registration_non_he() {
        let config =
            PhyConfig::for_standard(Standard::Ieee80211ac).with_width(ChannelWidth::Mhz80);
        let phy = SpectrumPhy::new(config).unwrap();
        assert_eq!(phy.channel_bands().len(), 4);
        assert_eq!(phy.ledger().bands().len(), 4);
    }

    #[test]
    fn test_single_reception() {
        let mut phy = SpectrumPhy::new(PhyConfig::default()).unwrap();
        let mut s = sched();
        let obs = he_su(&phy, 1, -60.0);
        phy.deliver(&mut s, obs).unwrap();
        assert_eq!(phy.state_kind(), RxStateKind::SyncInProgress);

        let (at, timer) = s.timers.pop().unwrap();
        s.now = at;
        phy.on_timer(&mut s, timer);
        assert_eq!(phy.state_kind(), RxStateKind::Idle);

        let events = phy.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, PhyEvent::RxOk { uid: 1, .. })));
    }

    #[test]
    fn test_below_sensitivity_not_recorded() {
        let mut phy = SpectrumPhy::new(PhyConfig::default()).unwrap();
        let mut s = sched();
        let psd = PowerSpectrum::zeros(*phy.grid());
        phy.deliver(&mut s, SignalObservation::foreign(Duration::from_micros(40), psd))
            .unwrap();
        assert!(phy.ledger().is_empty());
        assert!(s.timers.is_empty());
        assert_eq!(phy.drain_events().len(), 1);
    }

    #[test]
    fn test_reconfigure_resets_state() {
        let mut phy = SpectrumPhy::new(PhyConfig::default()).unwrap();
        let mut s = sched();
        let obs = he_su(&phy, 1, -60.0);
        phy.deliver(&mut s, obs).unwrap();
        phy.set_channel_width(ChannelWidth::Mhz40).unwrap();
        assert_eq!(phy.state_kind(), RxStateKind::Idle);
        assert_eq!(phy.channel_bands().len(), 2);
        assert!(phy.ledger().is_empty());

        // the old reception's timer is now stale
        let (at, timer) = s.timers.pop().unwrap();
        s.now = at;
        phy.drain_events();
        phy.on_timer(&mut s, timer);
        assert!(phy.drain_events().is_empty());
    }

    #[test]
    fn test_unsupported_width_rejected() {
        let mut phy = SpectrumPhy::new(PhyConfig::for_standard(Standard::Ieee80211a)).unwrap();
        assert!(matches!(
            phy.set_channel_width(ChannelWidth::Mhz80),
            Err(ConfigError::UnsupportedWidth { .. })
        ));
        assert_eq!(phy.channel_width(), ChannelWidth::Mhz20);
    }

    #[test]
    fn test_configure_standard_falls_back_to_default_width() {
        let config =
            PhyConfig::for_standard(Standard::Ieee80211ac).with_width(ChannelWidth::Mhz160);
        let mut phy = SpectrumPhy::new(config).unwrap();
        phy.configure_standard(Standard::Ieee80211n5Ghz).unwrap();
        assert_eq!(phy.channel_width(), ChannelWidth::Mhz20);
        assert_eq!(phy.grid().bin_hz(), 312_500);
    }
}
