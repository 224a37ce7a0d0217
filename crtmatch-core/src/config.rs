//! Matching configuration.
//!
//! The configuration is built once and then only read; every strategy switch
//! is an enum chosen here rather than an integer flag tested inside the
//! matching loop.

use crate::hit::ClockDomain;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the outward track directions at both ends are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DirectionMethod {
    /// Chords from the drift-shifted ends to a fractional midpoint; supports
    /// space-charge correction.
    #[default]
    EndpointMidpoint,
    /// Average of the local trajectory directions near each end.
    Averaged,
    /// Chords between valid positions near each end.
    AveragedPoints,
}

impl DirectionMethod {
    /// Maps the legacy integer selector: 2 is the averaged method, anything
    /// else the endpoint/midpoint method.
    #[must_use]
    pub fn from_legacy(method: i32) -> Self {
        if method == 2 {
            Self::Averaged
        } else {
            Self::EndpointMidpoint
        }
    }
}

/// Shape assigned to a CRT hit when computing the distance of closest approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DcaShape {
    /// Distance to the hit centre.
    #[default]
    Point,
    /// Distance to the box spanned by the hit uncertainties.
    Box,
}

/// Rule used to pick the best candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectionPolicy {
    /// Smallest distance of closest approach.
    #[default]
    Dca,
    /// Smallest DCA divided by extrapolation length.
    DcaOverLength,
}

/// Configuration for CRT t0 matching.
///
/// Lengths in cm, times in µs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Tracks shorter than this are never matched.
    pub min_track_length: f64,
    /// Fraction of the track used when estimating end directions.
    pub track_direction_frac: f64,
    /// Maximum DCA for a hit to become a candidate.
    pub distance_limit: f64,
    /// Clock the hit time is read from.
    pub clock_domain: ClockDomain,
    /// Constant added to every hit time.
    pub time_correction: f64,
    /// Apply the space-charge position correction when the service is enabled.
    pub sce_position_correction: bool,
    pub direction_method: DirectionMethod,
    pub dca_shape: DcaShape,
    pub selection: SelectionPolicy,
    /// Maximum DCA / extrapolation length accepted by the t0 queries.
    pub dca_over_length_limit: f64,
    /// Minimum light yield of a usable hit.
    pub pe_cut: f64,
    /// Maximum per-axis position uncertainty of a usable hit.
    pub max_uncertainty: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_track_length: 20.0,
            track_direction_frac: 0.5,
            distance_limit: 100.0,
            clock_domain: ClockDomain::Ts1,
            time_correction: 0.0,
            sce_position_correction: true,
            direction_method: DirectionMethod::EndpointMidpoint,
            dca_shape: DcaShape::Point,
            selection: SelectionPolicy::Dca,
            dca_over_length_limit: 1.0,
            pe_cut: 0.0,
            max_uncertainty: 1000.0,
        }
    }
}

impl MatchConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum track length (cm).
    #[must_use]
    pub fn with_min_track_length(mut self, length: f64) -> Self {
        self.min_track_length = length;
        self
    }

    /// Sets the fraction of points used for direction estimates.
    #[must_use]
    pub fn with_track_direction_frac(mut self, frac: f64) -> Self {
        self.track_direction_frac = frac;
        self
    }

    /// Sets the DCA limit (cm).
    #[must_use]
    pub fn with_distance_limit(mut self, limit: f64) -> Self {
        self.distance_limit = limit;
        self
    }

    /// Sets the hit timestamp domain.
    #[must_use]
    pub fn with_clock_domain(mut self, domain: ClockDomain) -> Self {
        self.clock_domain = domain;
        self
    }

    /// Sets the offset added to hit times (µs).
    #[must_use]
    pub fn with_time_correction(mut self, correction: f64) -> Self {
        self.time_correction = correction;
        self
    }

    /// Enables or disables the space-charge position correction.
    #[must_use]
    pub fn with_sce_position_correction(mut self, enabled: bool) -> Self {
        self.sce_position_correction = enabled;
        self
    }

    /// Sets the track direction estimate.
    #[must_use]
    pub fn with_direction_method(mut self, method: DirectionMethod) -> Self {
        self.direction_method = method;
        self
    }

    /// Sets the hit shape used for the DCA.
    #[must_use]
    pub fn with_dca_shape(mut self, shape: DcaShape) -> Self {
        self.dca_shape = shape;
        self
    }

    /// Sets the best-candidate rule.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the DCA over extrapolation length limit.
    #[must_use]
    pub fn with_dca_over_length_limit(mut self, limit: f64) -> Self {
        self.dca_over_length_limit = limit;
        self
    }

    /// Sets the minimum hit light yield (PE).
    #[must_use]
    pub fn with_pe_cut(mut self, pe: f64) -> Self {
        self.pe_cut = pe;
        self
    }

    /// Sets the largest accepted position uncertainty (cm).
    #[must_use]
    pub fn with_max_uncertainty(mut self, uncertainty: f64) -> Self {
        self.max_uncertainty = uncertainty;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFraction`] for a direction fraction outside
    /// (0, 1] and [`Error::ConfigError`] for negative or NaN limits.
    pub fn validate(&self) -> Result<()> {
        let frac = self.track_direction_frac;
        if !(frac > 0.0 && frac <= 1.0) {
            return Err(Error::InvalidFraction(frac));
        }
        let limits = [
            ("min_track_length", self.min_track_length),
            ("distance_limit", self.distance_limit),
            ("dca_over_length_limit", self.dca_over_length_limit),
            ("max_uncertainty", self.max_uncertainty),
        ];
        for (name, value) in limits {
            if value.is_nan() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !self.time_correction.is_finite() {
            return Err(Error::ConfigError(format!(
                "time_correction must be finite, got {}",
                self.time_correction
            )));
        }
        Ok(())
    }
}
