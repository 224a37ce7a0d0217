//! Match candidates, time windows and the sentinel values reported when no
//! match is found.

use crate::hit::TaggerHit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sentinel returned by the single-value t0 query and stored in the null
/// candidate.
pub const NO_MATCH: f64 = -99999.0;

/// Sentinel returned by the t0 + DCA query.
///
/// Differs from [`NO_MATCH`]; downstream consumers key on both values.
pub const NO_MATCH_PAIR: f64 = -9999.0;

/// A CRT hit that passed all gates for a track, with its match metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchCandidate {
    /// The matched hit.
    pub hit: TaggerHit,
    /// Track t0 implied by the hit (µs).
    pub t0: f64,
    /// Distance of closest approach between the extrapolated track and the hit (cm).
    pub dca: f64,
    /// Distance from the chosen track end to the hit (cm).
    pub extrapolation_length: f64,
}

impl MatchCandidate {
    /// The "no match" candidate.
    #[must_use]
    pub fn null() -> Self {
        Self {
            hit: TaggerHit::default(),
            t0: NO_MATCH,
            dca: NO_MATCH,
            extrapolation_length: NO_MATCH,
        }
    }

    /// True for the null candidate (or any candidate with a negative DCA).
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.dca < 0.0
    }

    /// Angle-like quality ratio `dca / extrapolation_length`.
    ///
    /// Zero for a zero DCA, including a hit sitting on the track end.
    #[inline]
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn dca_over_length(&self) -> f64 {
        if self.dca == 0.0 {
            0.0
        } else {
            self.dca / self.extrapolation_length
        }
    }

    /// Returns `None` for the null candidate.
    #[must_use]
    pub fn into_option(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }
}

impl Default for MatchCandidate {
    fn default() -> Self {
        Self::null()
    }
}

/// Admissible t0 interval for a track (µs).
///
/// A degenerate window (`t0_min == t0_max`) places no constraint on hit time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeWindow {
    /// Earliest admissible t0.
    pub t0_min: f64,
    /// Latest admissible t0.
    pub t0_max: f64,
}

impl TimeWindow {
    /// Slack added on both sides of the window when gating hit times (µs).
    pub const PADDING_US: f64 = 10.0;

    /// Creates a window; bounds are stored as given.
    #[must_use]
    pub fn new(t0_min: f64, t0_max: f64) -> Self {
        Self { t0_min, t0_max }
    }

    /// Window that accepts every hit time.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::new(0.0, 0.0)
    }

    /// True when both bounds coincide.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.t0_min == self.t0_max
    }

    /// Time gate: inside the padded window, or any time for a degenerate window.
    #[must_use]
    pub fn accepts(&self, time_us: f64) -> bool {
        (time_us >= self.t0_min - Self::PADDING_US && time_us <= self.t0_max + Self::PADDING_US)
            || self.is_degenerate()
    }
}
