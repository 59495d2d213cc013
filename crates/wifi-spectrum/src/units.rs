//! Power and ratio conversions

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Reference noise temperature (K)
pub const NOISE_TEMPERATURE_K: f64 = 290.0;

/// Convert dBm to watts
pub fn dbm_to_w(dbm: f64) -> f64 {
    10f64.powf((dbm - 30.0) / 10.0)
}

/// Convert watts to dBm
pub fn w_to_dbm(w: f64) -> f64 {
    10.0 * w.log10() + 30.0
}

/// Convert dB to a linear ratio
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear ratio to dB
pub fn ratio_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Thermal noise over `bandwidth_hz` scaled by the receiver noise figure (W)
pub fn thermal_noise_w(bandwidth_hz: f64, noise_figure_db: f64) -> f64 {
    BOLTZMANN * NOISE_TEMPERATURE_K * bandwidth_hz * db_to_ratio(noise_figure_db)
}
