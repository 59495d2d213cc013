//! Spectrum grid and band indexing
//!
//! A [`SpectrumGrid`] slices the modeled span (channel plus a guard band on
//! each side) into elementary bins of one subcarrier spacing. The bin count is
//! always odd so that the grid is symmetric around a center "DC" bin.
//!
//! # Band layout
//! ```text
//!  guard            channel            guard
//! |-----|[  band 0  ][  band 1  ] DC [  band 2  ][  band 3  ]|-----|
//!                                ^ skipped bin
//! ```

use std::fmt;

use crate::channel::ChannelWidth;
use crate::error::ConfigError;

/// Inclusive range of elementary bin indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Band {
    /// First bin (inclusive)
    pub first: usize,
    /// Last bin (inclusive)
    pub last: usize,
}

impl Band {
    /// Create a band; `first` must not exceed `last`
    pub fn new(first: usize, last: usize) -> Self {
        debug_assert!(first <= last, "band [{}, {}] is inverted", first, last);
        Self { first, last }
    }

    /// Number of bins covered
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Bands are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `bin` falls inside the band
    pub fn contains(&self, bin: usize) -> bool {
        (self.first..=self.last).contains(&bin)
    }

    /// Whether the two bands share at least one bin
    pub fn overlaps(&self, other: &Band) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}; {}]", self.first, self.last)
    }
}

/// Frequency grid of a tuned PHY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumGrid {
    center_mhz: u16,
    width: ChannelWidth,
    bin_hz: u32,
    guard_mhz: u16,
    num_bins: usize,
}

impl SpectrumGrid {
    /// Build the grid for a channel
    pub fn new(
        center_mhz: u16,
        width: ChannelWidth,
        bin_hz: u32,
        guard_mhz: u16,
    ) -> Result<Self, ConfigError> {
        if bin_hz == 0 || width.hz() % bin_hz as u64 != 0 {
            return Err(ConfigError::BinWidthMismatch {
                bin_hz,
                width_mhz: width.mhz(),
            });
        }

        let span_hz = (width.mhz() as u64 + 2 * guard_mhz as u64) * 1_000_000;
        let mut num_bins = (span_hz as f64 / bin_hz as f64).round() as usize;
        if num_bins % 2 == 0 {
            num_bins += 1;
        }

        Ok(Self {
            center_mhz,
            width,
            bin_hz,
            guard_mhz,
            num_bins,
        })
    }

    /// Center frequency in MHz
    pub fn center_mhz(&self) -> u16 {
        self.center_mhz
    }

    /// Channel width
    pub fn width(&self) -> ChannelWidth {
        self.width
    }

    /// Elementary bin width in Hz
    pub fn bin_hz(&self) -> u32 {
        self.bin_hz
    }

    /// Guard band on each side in MHz
    pub fn guard_mhz(&self) -> u16 {
        self.guard_mhz
    }

    /// Total number of bins in the modeled span
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Index of the DC bin
    pub fn center_bin(&self) -> usize {
        self.num_bins / 2
    }

    /// Offset of a bin's center from the channel center, in Hz
    pub fn offset_hz(&self, bin: usize) -> f64 {
        (bin as f64 - self.center_bin() as f64) * self.bin_hz as f64
    }

    /// Absolute frequency of a bin's center, in Hz
    pub fn frequency_hz(&self, bin: usize) -> f64 {
        self.center_mhz as f64 * 1e6 + self.offset_hz(bin)
    }

    /// Bins spanning `index`-th sub-band of width `band_mhz`
    ///
    /// Sub-bands at or above DC start one bin higher, so the DC bin is never
    /// part of a sub-band. A band covering the whole channel keeps its length
    /// and therefore includes DC but not the topmost channel bin.
    pub fn band(&self, band_mhz: u16, index: u16) -> Result<Band, ConfigError> {
        let channel_mhz = self.width.mhz();
        if band_mhz == 0 || band_mhz > channel_mhz || index * band_mhz >= channel_mhz {
            return Err(ConfigError::BandIndexOutOfRange {
                band_mhz,
                index,
                channel_mhz,
            });
        }

        let bin_hz = self.bin_hz as u64;
        let mut channel_bins = (self.width.hz() / bin_hz) as usize;
        let band_bins = (band_mhz as u64 * 1_000_000 / bin_hz) as usize;
        if band_bins % 2 == 0 {
            channel_bins += 1;
        }
        if channel_bins % 2 == 0 {
            return Err(ConfigError::EvenBinCount(channel_bins));
        }
        if self.num_bins % 2 == 0 {
            return Err(ConfigError::EvenBinCount(self.num_bins));
        }

        let center = self.center_bin();
        let mut first = (self.num_bins - channel_bins) / 2 + index as usize * band_bins;
        if first >= center {
            // step past DC
            first += 1;
        }
        Ok(Band::new(first, first + band_bins - 1))
    }

    /// All bands of width `band_mhz` tiling the channel, in frequency order
    pub fn bands(&self, band_mhz: u16) -> Result<Vec<Band>, ConfigError> {
        if band_mhz == 0 {
            return Err(ConfigError::BandIndexOutOfRange {
                band_mhz,
                index: 0,
                channel_mhz: self.width.mhz(),
            });
        }
        (0..self.width.mhz() / band_mhz)
            .map(|index| self.band(band_mhz, index))
            .collect()
    }

    /// The bands a PHY integrates received power over
    ///
    /// Narrow channels are tracked as a single band; wider ones as one band
    /// per 20 MHz sub-channel.
    pub fn channel_bands(&self) -> Result<Vec<Band>, ConfigError> {
        if self.width.mhz() < 20 {
            Ok(vec![self.band(self.width.mhz(), 0)?])
        } else {
            self.bands(20)
        }
    }
}

/// Power per elementary bin (W) laid out on a [`SpectrumGrid`]
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    grid: SpectrumGrid,
    values: Vec<f64>,
}

impl PowerSpectrum {
    /// All-zero spectrum on `grid`
    pub fn zeros(grid: SpectrumGrid) -> Self {
        Self {
            values: vec![0.0; grid.num_bins()],
            grid,
        }
    }

    /// Wrap per-bin values; the length must match the grid
    pub fn from_values(grid: SpectrumGrid, values: Vec<f64>) -> Result<Self, ConfigError> {
        if values.len() != grid.num_bins() {
            return Err(ConfigError::GridMismatch(format!(
                "{} values for a grid of {} bins",
                values.len(),
                grid.num_bins()
            )));
        }
        Ok(Self { grid, values })
    }

    /// Grid the values are laid out on
    pub fn grid(&self) -> &SpectrumGrid {
        &self.grid
    }

    /// Per-bin power values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable per-bin power values
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Total power over the whole span
    pub fn integral(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Power falling inside `band`
    pub fn band_power(&self, band: &Band) -> f64 {
        let last = band.last.min(self.values.len().saturating_sub(1));
        if band.first > last {
            return 0.0;
        }
        self.values[band.first..=last].iter().sum()
    }

    /// Multiply every bin by `factor`
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    /// Project this spectrum onto another grid with the same bin width
    ///
    /// Each bin lands on the target bin nearest its absolute frequency; power
    /// falling outside the target span is dropped.
    pub fn convert_to(&self, target: &SpectrumGrid) -> Result<PowerSpectrum, ConfigError> {
        if target.bin_hz() != self.grid.bin_hz() {
            return Err(ConfigError::GridMismatch(format!(
                "bin width {} Hz vs {} Hz",
                self.grid.bin_hz(),
                target.bin_hz()
            )));
        }
        if *target == self.grid {
            return Ok(self.clone());
        }

        let mut out = PowerSpectrum::zeros(*target);
        let bin_hz = target.bin_hz() as f64;
        let target_center_hz = target.center_mhz() as f64 * 1e6;
        let center = target.center_bin() as i64;
        for (i, &power) in self.values.iter().enumerate() {
            if power == 0.0 {
                continue;
            }
            let offset = (self.grid.frequency_hz(i) - target_center_hz) / bin_hz;
            let j = center + offset.round() as i64;
            if j >= 0 && (j as usize) < out.values.len() {
                out.values[j as usize] += power;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn he_grid(width: ChannelWidth) -> SpectrumGrid {
        SpectrumGrid::new(5180, width, 78_125, width.guard_mhz()).unwrap()
    }

    #[test]
    fn test_grid_is_odd() {
        let grid = he_grid(ChannelWidth::Mhz20);
        assert_eq!(grid.num_bins(), 769);
        assert_eq!(grid.center_bin(), 384);

        let grid = SpectrumGrid::new(5180, ChannelWidth::Mhz20, 312_500, 20).unwrap();
        assert_eq!(grid.num_bins(), 193);
    }

    #[test]
    fn test_band_80mhz_20mhz_granularity() {
        let grid = he_grid(ChannelWidth::Mhz80);
        let bands = grid.bands(20).unwrap();
        assert_eq!(
            bands,
            vec![
                Band::new(1024, 1279),
                Band::new(1280, 1535),
                Band::new(1537, 1792),
                Band::new(1793, 2048),
            ]
        );
    }

    #[test]
    fn test_full_channel_band_keeps_its_length() {
        let grid = he_grid(ChannelWidth::Mhz20);
        let band = grid.band(20, 0).unwrap();
        assert_eq!(band, Band::new(256, 511));
        assert_eq!(band.len(), 256);
        assert!(band.contains(grid.center_bin()));

        let legacy = SpectrumGrid::new(5180, ChannelWidth::Mhz20, 312_500, 20).unwrap();
        assert_eq!(legacy.band(20, 0).unwrap(), Band::new(64, 127));
    }

    #[test]
    fn test_sub_bands_have_equal_length() {
        for width in [ChannelWidth::Mhz40, ChannelWidth::Mhz80, ChannelWidth::Mhz160] {
            let grid = he_grid(width);
            let bands = grid.bands(20).unwrap();
            assert!(bands.iter().all(|b| b.len() == 256), "{}", width);
            assert!(bands.iter().all(|b| !b.contains(grid.center_bin())), "{}", width);
        }
    }

    #[test]
    fn test_band_index_out_of_range() {
        let grid = he_grid(ChannelWidth::Mhz40);
        assert!(matches!(
            grid.band(20, 2),
            Err(ConfigError::BandIndexOutOfRange { index: 2, .. })
        ));
        assert!(grid.band(80, 0).is_err());
    }

    #[test]
    fn test_bin_width_must_divide_channel() {
        assert!(matches!(
            SpectrumGrid::new(5180, ChannelWidth::Mhz20, 300_000, 20),
            Err(ConfigError::BinWidthMismatch { .. })
        ));
    }

    #[test]
    fn test_narrow_channel_single_band() {
        let grid = SpectrumGrid::new(5860, ChannelWidth::Mhz10, 156_250, 10).unwrap();
        let bands = grid.channel_bands().unwrap();
        assert_eq!(bands.len(), 1);
        assert!(bands[0].contains(grid.center_bin()));
    }

    #[test]
    fn test_band_power() {
        let grid = he_grid(ChannelWidth::Mhz20);
        let mut psd = PowerSpectrum::zeros(grid);
        psd.values_mut()[300] = 1.0;
        psd.values_mut()[700] = 2.0;
        assert_eq!(psd.band_power(&Band::new(256, 511)), 1.0);
        assert_eq!(psd.integral(), 3.0);
    }

    #[test]
    fn test_convert_to_wider_grid() {
        let narrow = he_grid(ChannelWidth::Mhz20);
        let wide = SpectrumGrid::new(5190, ChannelWidth::Mhz40, 78_125, 40).unwrap();
        let mut psd = PowerSpectrum::zeros(narrow);
        psd.values_mut()[narrow.center_bin()] = 1.0;

        let converted = psd.convert_to(&wide).unwrap();
        // 5180 MHz sits 10 MHz (128 bins) below the 40 MHz channel center
        assert_eq!(converted.values()[wide.center_bin() - 128], 1.0);
        assert!((converted.integral() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_convert_rejects_other_bin_width() {
        let a = he_grid(ChannelWidth::Mhz20);
        let b = SpectrumGrid::new(5180, ChannelWidth::Mhz20, 312_500, 20).unwrap();
        assert!(PowerSpectrum::zeros(a).convert_to(&b).is_err());
    }
}
