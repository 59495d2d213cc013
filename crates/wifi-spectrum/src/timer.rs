//! Scheduler seam
//!
//! The PHY never waits. Anything that must happen later is handed to a
//! [`Scheduler`] as a [`PhyTimer`]; the owner of the event loop hands the
//! timer back through [`SpectrumPhy::on_timer`](crate::phy::SpectrumPhy::on_timer)
//! once the delay has elapsed.

use std::time::Duration;

/// Deferred PHY work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhyTimer {
    /// End of a single-user reception
    RxEnd { rx_id: u64 },
    /// End of the shared preamble of one station's HE TB PPDU
    MuHeaderEnd { uid: u64, sta_id: u16, rx_id: u64 },
    /// End of one station's OFDMA payload
    PayloadEnd { uid: u64, sta_id: u16, rx_id: u64 },
    /// End of the whole uplink MU PPDU; drops whatever is left of it
    MuPpduEnd { uid: u64 },
}

/// Simulated clock plus delayed callbacks
pub trait Scheduler {
    /// Current simulation time
    fn now(&self) -> Duration;

    /// Deliver `timer` back to the PHY after `delay`
    fn schedule(&mut self, delay: Duration, timer: PhyTimer);
}
