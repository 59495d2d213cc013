//! HE resource units
//!
//! Subcarrier layout of the 802.11ax OFDMA resource units (RUs) for every
//! channel width, and the mapping from subcarrier ranges to spectrum bins.
//! Subcarrier indices are relative to the channel center (DC = 0).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::band::{Band, SpectrumGrid};
use crate::channel::ChannelWidth;
use crate::error::ConfigError;

/// Inclusive range of subcarrier indices relative to DC
pub type SubcarrierRange = (i16, i16);

/// Resource unit size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuType {
    Ru26,
    Ru52,
    Ru106,
    Ru242,
    Ru484,
    Ru996,
    Ru2x996,
}

impl RuType {
    /// All RU types, smallest first
    pub const ALL: [RuType; 7] = [
        RuType::Ru26,
        RuType::Ru52,
        RuType::Ru106,
        RuType::Ru242,
        RuType::Ru484,
        RuType::Ru996,
        RuType::Ru2x996,
    ];

    /// Number of tones in the RU
    pub const fn tones(&self) -> u16 {
        match self {
            RuType::Ru26 => 26,
            RuType::Ru52 => 52,
            RuType::Ru106 => 106,
            RuType::Ru242 => 242,
            RuType::Ru484 => 484,
            RuType::Ru996 => 996,
            RuType::Ru2x996 => 1992,
        }
    }

    /// Channel width occupied by an RU of this size used on its own
    pub fn approx_width(&self) -> ChannelWidth {
        match self {
            RuType::Ru26 | RuType::Ru52 | RuType::Ru106 | RuType::Ru242 => ChannelWidth::Mhz20,
            RuType::Ru484 => ChannelWidth::Mhz40,
            RuType::Ru996 => ChannelWidth::Mhz80,
            RuType::Ru2x996 => ChannelWidth::Mhz160,
        }
    }
}

impl fmt::Display for RuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuType::Ru2x996 => f.write_str("2x996-tone"),
            other => write!(f, "{}-tone", other.tones()),
        }
    }
}

/// A specific resource unit: size plus 1-based index across the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuSpec {
    pub ru_type: RuType,
    pub index: u16,
}

impl RuSpec {
    pub fn new(ru_type: RuType, index: u16) -> Self {
        Self { ru_type, index }
    }

    /// Whether this RU exists in a channel of `width`
    pub fn is_valid_for(&self, width: ChannelWidth) -> bool {
        self.index >= 1 && self.index <= n_rus(width, self.ru_type)
    }
}

impl fmt::Display for RuSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.ru_type, self.index)
    }
}

const RU26_20: &[&[SubcarrierRange]] = &[
    &[(-121, -96)],
    &[(-95, -70)],
    &[(-68, -43)],
    &[(-42, -17)],
    &[(-16, -4), (4, 16)],
    &[(17, 42)],
    &[(43, 68)],
    &[(70, 95)],
    &[(96, 121)],
];
const RU52_20: &[&[SubcarrierRange]] = &[&[(-121, -70)], &[(-68, -17)], &[(17, 68)], &[(70, 121)]];
const RU106_20: &[&[SubcarrierRange]] = &[&[(-122, -17)], &[(17, 122)]];
const RU242_20: &[&[SubcarrierRange]] = &[&[(-122, -2), (2, 122)]];

const RU26_40: &[&[SubcarrierRange]] = &[
    &[(-243, -218)],
    &[(-217, -192)],
    &[(-189, -164)],
    &[(-163, -138)],
    &[(-136, -111)],
    &[(-109, -84)],
    &[(-83, -58)],
    &[(-55, -30)],
    &[(-29, -4)],
    &[(4, 29)],
    &[(30, 55)],
    &[(58, 83)],
    &[(84, 109)],
    &[(111, 136)],
    &[(138, 163)],
    &[(164, 189)],
    &[(192, 217)],
    &[(218, 243)],
];
const RU52_40: &[&[SubcarrierRange]] = &[
    &[(-243, -192)],
    &[(-189, -138)],
    &[(-109, -58)],
    &[(-55, -4)],
    &[(4, 55)],
    &[(58, 109)],
    &[(138, 189)],
    &[(192, 243)],
];
const RU106_40: &[&[SubcarrierRange]] =
    &[&[(-243, -138)], &[(-109, -4)], &[(4, 109)], &[(138, 243)]];
const RU242_40: &[&[SubcarrierRange]] = &[&[(-244, -3)], &[(3, 244)]];
const RU484_40: &[&[SubcarrierRange]] = &[&[(-244, -3), (3, 244)]];

const RU26_80: &[&[SubcarrierRange]] = &[
    &[(-499, -474)],
    &[(-473, -448)],
    &[(-445, -420)],
    &[(-419, -394)],
    &[(-392, -367)],
    &[(-365, -340)],
    &[(-339, -314)],
    &[(-311, -286)],
    &[(-285, -260)],
    &[(-257, -232)],
    &[(-231, -206)],
    &[(-203, -178)],
    &[(-177, -152)],
    &[(-150, -125)],
    &[(-123, -98)],
    &[(-97, -72)],
    &[(-69, -44)],
    &[(-43, -18)],
    &[(-16, -4), (4, 16)],
    &[(18, 43)],
    &[(44, 69)],
    &[(72, 97)],
    &[(98, 123)],
    &[(125, 150)],
    &[(152, 177)],
    &[(178, 203)],
    &[(206, 231)],
    &[(232, 257)],
    &[(260, 285)],
    &[(286, 311)],
    &[(314, 339)],
    &[(340, 365)],
    &[(367, 392)],
    &[(394, 419)],
    &[(420, 445)],
    &[(448, 473)],
    &[(474, 499)],
];
const RU52_80: &[&[SubcarrierRange]] = &[
    &[(-499, -448)],
    &[(-445, -394)],
    &[(-365, -314)],
    &[(-311, -260)],
    &[(-257, -206)],
    &[(-203, -152)],
    &[(-123, -72)],
    &[(-69, -18)],
    &[(18, 69)],
    &[(72, 123)],
    &[(152, 203)],
    &[(206, 257)],
    &[(260, 311)],
    &[(314, 365)],
    &[(394, 445)],
    &[(448, 499)],
];
const RU106_80: &[&[SubcarrierRange]] = &[
    &[(-499, -394)],
    &[(-365, -260)],
    &[(-257, -152)],
    &[(-123, -18)],
    &[(18, 123)],
    &[(152, 257)],
    &[(260, 365)],
    &[(394, 499)],
];
const RU242_80: &[&[SubcarrierRange]] =
    &[&[(-500, -259)], &[(-258, -17)], &[(17, 258)], &[(259, 500)]];
const RU484_80: &[&[SubcarrierRange]] = &[&[(-500, -17)], &[(17, 500)]];
const RU996_80: &[&[SubcarrierRange]] = &[&[(-500, -3), (3, 500)]];

const RU2X996_160: &[&[SubcarrierRange]] =
    &[&[(-1012, -515), (-509, -12), (12, 509), (515, 1012)]];

fn table(width: ChannelWidth, ru_type: RuType) -> &'static [&'static [SubcarrierRange]] {
    use ChannelWidth::*;
    use RuType::*;
    match (width, ru_type) {
        (Mhz20, Ru26) => RU26_20,
        (Mhz20, Ru52) => RU52_20,
        (Mhz20, Ru106) => RU106_20,
        (Mhz20, Ru242) => RU242_20,
        (Mhz40, Ru26) => RU26_40,
        (Mhz40, Ru52) => RU52_40,
        (Mhz40, Ru106) => RU106_40,
        (Mhz40, Ru242) => RU242_40,
        (Mhz40, Ru484) => RU484_40,
        (Mhz80, Ru26) => RU26_80,
        (Mhz80, Ru52) => RU52_80,
        (Mhz80, Ru106) => RU106_80,
        (Mhz80, Ru242) => RU242_80,
        (Mhz80, Ru484) => RU484_80,
        (Mhz80, Ru996) => RU996_80,
        (Mhz160, Ru2x996) => RU2X996_160,
        _ => &[],
    }
}

/// Number of RUs of `ru_type` in a channel of `width`
pub fn n_rus(width: ChannelWidth, ru_type: RuType) -> u16 {
    match (width, ru_type) {
        (ChannelWidth::Mhz160, RuType::Ru2x996) => 1,
        (ChannelWidth::Mhz160, other) => 2 * table(ChannelWidth::Mhz80, other).len() as u16,
        (w, t) => table(w, t).len() as u16,
    }
}

/// Subcarrier ranges making up the RU
///
/// On 160 MHz channels the lower half of the index space maps onto the
/// lower 80 MHz segment, the upper half onto the upper one.
pub fn subcarrier_group(
    width: ChannelWidth,
    ru: RuSpec,
) -> Result<Vec<SubcarrierRange>, ConfigError> {
    if !ru.is_valid_for(width) {
        return Err(ConfigError::InvalidRu {
            ru: ru.to_string(),
            width,
        });
    }

    if width == ChannelWidth::Mhz160 && ru.ru_type != RuType::Ru2x996 {
        let per_segment = n_rus(ChannelWidth::Mhz80, ru.ru_type);
        let (index, shift) = if ru.index > per_segment {
            (ru.index - per_segment, 512)
        } else {
            (ru.index, -512)
        };
        let group = table(ChannelWidth::Mhz80, ru.ru_type)[index as usize - 1];
        return Ok(group.iter().map(|&(a, b)| (a + shift, b + shift)).collect());
    }

    Ok(table(width, ru.ru_type)[ru.index as usize - 1].to_vec())
}

/// Outer subcarrier span of the RU (lowest to highest tone)
pub fn subcarrier_span(width: ChannelWidth, ru: RuSpec) -> Result<SubcarrierRange, ConfigError> {
    let group = subcarrier_group(width, ru)?;
    match (group.first(), group.last()) {
        (Some(first), Some(last)) => Ok((first.0, last.1)),
        _ => Err(ConfigError::InvalidRu {
            ru: ru.to_string(),
            width,
        }),
    }
}

/// Map a subcarrier range onto absolute bins of `grid`
///
/// Only HE channel widths (20/40/80/160 MHz) carry RUs.
pub fn convert_subcarriers(grid: &SpectrumGrid, range: SubcarrierRange) -> Result<Band, ConfigError> {
    let layout_offset: i64 = match grid.width() {
        ChannelWidth::Mhz20 => 6 + 122,
        ChannelWidth::Mhz40 => 12 + 244,
        ChannelWidth::Mhz80 => 12 + 500,
        ChannelWidth::Mhz160 => 12 + 1012,
        other => {
            return Err(ConfigError::UnsupportedFamilyWidth {
                family: "HE RU",
                width: other,
            })
        }
    };
    let guard_bins =
        (2.0 * grid.guard_mhz() as f64 * 1e6 / grid.bin_hz() as f64).round() as i64;
    let anchor = guard_bins / 2 + layout_offset;

    let first = anchor + range.0 as i64;
    let last = anchor + range.1 as i64;
    if first < 0 || last < first || last as usize >= grid.num_bins() {
        return Err(ConfigError::GridMismatch(format!(
            "subcarriers [{}, {}] fall outside the grid",
            range.0, range.1
        )));
    }
    Ok(Band::new(first as usize, last as usize))
}

/// Bins covered by an RU on `grid`
pub fn ru_band(grid: &SpectrumGrid, ru: RuSpec) -> Result<Band, ConfigError> {
    ru_band_for_width(grid, grid.width(), ru)
}

/// Bins covered by an RU of a `width` transmission received on `grid`
///
/// The RU layout is the one of `width`; the tones are counted from the
/// grid's center, so a PPDU narrower than the receiver lands around DC.
pub fn ru_band_for_width(
    grid: &SpectrumGrid,
    width: ChannelWidth,
    ru: RuSpec,
) -> Result<Band, ConfigError> {
    if width > grid.width() {
        return Err(ConfigError::InvalidRu {
            ru: ru.to_string(),
            width,
        });
    }
    let span = subcarrier_span(width, ru)?;
    convert_subcarriers(grid, span)
}

/// HE widths whose RUs fit on `grid`, narrowest first
pub fn ru_widths(grid: &SpectrumGrid) -> Vec<ChannelWidth> {
    [
        ChannelWidth::Mhz20,
        ChannelWidth::Mhz40,
        ChannelWidth::Mhz80,
        ChannelWidth::Mhz160,
    ]
    .into_iter()
    .filter(|w| *w <= grid.width())
    .collect()
}

/// Every RU band of every RU type that fits the grid's channel width
pub fn all_ru_bands(grid: &SpectrumGrid) -> Result<Vec<(RuSpec, Band)>, ConfigError> {
    ru_bands_for_width(grid, grid.width())
}

/// Every RU band of a `width` transmission received on `grid`
pub fn ru_bands_for_width(
    grid: &SpectrumGrid,
    width: ChannelWidth,
) -> Result<Vec<(RuSpec, Band)>, ConfigError> {
    let mut bands = Vec::new();
    for ru_type in RuType::ALL {
        for index in 1..=n_rus(width, ru_type) {
            let ru = RuSpec::new(ru_type, index);
            bands.push((ru, ru_band_for_width(grid, width, ru)?));
        }
    }
    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn he_grid(width: ChannelWidth) -> SpectrumGrid {
        SpectrumGrid::new(5180, width, 78_125, width.guard_mhz()).unwrap()
    }

    #[test]
    fn test_ru_counts() {
        use ChannelWidth::*;
        let expected = [
            (Mhz20, [9, 4, 2, 1, 0, 0, 0]),
            (Mhz40, [18, 8, 4, 2, 1, 0, 0]),
            (Mhz80, [37, 16, 8, 4, 2, 1, 0]),
            (Mhz160, [74, 32, 16, 8, 4, 2, 1]),
        ];
        for (width, counts) in expected {
            for (ru_type, count) in RuType::ALL.iter().zip(counts) {
                assert_eq!(n_rus(width, *ru_type), count, "{} {}", width, ru_type);
            }
        }
        assert_eq!(n_rus(Mhz10, RuType::Ru26), 0);
    }

    #[test]
    fn test_160mhz_segments_shift() {
        let lower = subcarrier_group(ChannelWidth::Mhz160, RuSpec::new(RuType::Ru26, 1)).unwrap();
        assert_eq!(lower, vec![(-1011, -986)]);
        let upper =
            subcarrier_group(ChannelWidth::Mhz160, RuSpec::new(RuType::Ru996, 2)).unwrap();
        assert_eq!(upper, vec![(12, 509), (515, 1012)]);
    }

    #[test]
    fn test_invalid_ru() {
        let err = subcarrier_group(ChannelWidth::Mhz20, RuSpec::new(RuType::Ru484, 1));
        assert!(matches!(err, Err(ConfigError::InvalidRu { .. })));
        assert!(!RuSpec::new(RuType::Ru26, 0).is_valid_for(ChannelWidth::Mhz20));
    }

    #[test]
    fn test_anchor_is_center_bin() {
        for width in [
            ChannelWidth::Mhz20,
            ChannelWidth::Mhz40,
            ChannelWidth::Mhz80,
            ChannelWidth::Mhz160,
        ] {
            let grid = he_grid(width);
            let band = convert_subcarriers(&grid, (0, 0)).unwrap();
            assert_eq!(band.first, grid.center_bin(), "{}", width);
        }
    }

    #[test]
    fn test_ru_band_20mhz() {
        let grid = he_grid(ChannelWidth::Mhz20);
        let band = ru_band(&grid, RuSpec::new(RuType::Ru106, 1)).unwrap();
        assert_eq!(band, Band::new(384 - 122, 384 - 17));
        let full = ru_band(&grid, RuSpec::new(RuType::Ru242, 1)).unwrap();
        assert_eq!(full, Band::new(262, 506));
    }

    #[test]
    fn test_convert_rejects_narrow_width() {
        let grid = SpectrumGrid::new(5860, ChannelWidth::Mhz10, 156_250, 10).unwrap();
        assert!(convert_subcarriers(&grid, (0, 0)).is_err());
    }

    #[test]
    fn test_narrow_ru_on_wider_grid() {
        let grid = SpectrumGrid::new(5190, ChannelWidth::Mhz40, 78_125, 40).unwrap();
        let center = grid.center_bin();
        let ru = RuSpec::new(RuType::Ru106, 1);

        let narrow = ru_band_for_width(&grid, ChannelWidth::Mhz20, ru).unwrap();
        assert_eq!(narrow, Band::new(center - 122, center - 17));
        let own = ru_band(&grid, ru).unwrap();
        assert_eq!(own, Band::new(center - 243, center - 138));

        assert!(ru_band_for_width(&grid, ChannelWidth::Mhz80, ru).is_err());
        assert_eq!(
            ru_widths(&grid),
            vec![ChannelWidth::Mhz20, ChannelWidth::Mhz40]
        );
    }

    #[test]
    fn test_all_ru_bands_80mhz() {
        let grid = he_grid(ChannelWidth::Mhz80);
        let bands = all_ru_bands(&grid).unwrap();
        assert_eq!(bands.len(), 37 + 16 + 8 + 4 + 2 + 1);
        for (_, band) in bands {
            assert!(band.last < grid.num_bins());
        }
    }
}
