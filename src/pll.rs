//! PLL divider resolution.
//!
//! Dividers relate the external input clock to the pixel/system clocks:
//!
//! ```text
//! target_freq = (ext_freq x M) / (N x P1 x P2)
//! vco_freq    = (ext_freq x M) / N
//! ```
//!
//! subject to M in 32..=384, N in 1..=64, P1 in 1..=16, P2 in 4..=16 and
//! the VCO staying inside 384..=768 MHz.
//!
//! Dividers are never computed at runtime. Supported clock combinations are
//! rows of a known-good table; supporting a new external oscillator means
//! adding a row, not searching divider space in a control path.

/// Divider quadruple for one (external, target) frequency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllDividers {
    pub m: u16,
    pub n: u16,
    pub p1: u16,
    pub p2: u16,
}

struct PllRow {
    ext_freq: u32,
    target_freq: u32,
    divs: PllDividers,
}

const fn row(ext_freq: u32, target_freq: u32, m: u16, n: u16, p1: u16, p2: u16) -> PllRow {
    PllRow {
        ext_freq,
        target_freq,
        divs: PllDividers { m, n, p1, p2 },
    }
}

static DIVIDER_TABLE: &[PllRow] = &[
    row(20_250_000, 74_250_000, 44, 2, 1, 6),
    row(24_000_000, 48_000_000, 32, 2, 2, 4),
    row(24_000_000, 66_000_000, 44, 2, 2, 4),
    row(24_000_000, 74_250_000, 99, 4, 1, 8),
    row(27_000_000, 74_250_000, 44, 2, 1, 8),
    row(48_000_000, 48_000_000, 40, 5, 2, 4),
];

pub const VCO_MIN_HZ: u64 = 384_000_000;
pub const VCO_MAX_HZ: u64 = 768_000_000;

/// Looks up the divider quadruple for the given frequency pair.
///
/// Both frequencies must match a table row exactly; there is no analytic
/// fallback.
pub fn resolve(ext_freq: u32, target_freq: u32) -> Option<PllDividers> {
    DIVIDER_TABLE
        .iter()
        .find(|row| row.ext_freq == ext_freq && row.target_freq == target_freq)
        .map(|row| row.divs)
}
