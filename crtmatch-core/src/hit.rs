//! CRT hit types.

use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which of the two CRT clocks a hit time is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClockDomain {
    /// Absolute timestamp (`ts0_ns`).
    Ts0,
    /// Trigger-relative timestamp (`ts1_ns`).
    #[default]
    Ts1,
}

impl ClockDomain {
    /// Maps the legacy integer timestamp mode: 1 selects `ts1`, anything else `ts0`.
    #[must_use]
    pub fn from_ts_mode(mode: i32) -> Self {
        if mode == 1 {
            Self::Ts1
        } else {
            Self::Ts0
        }
    }
}

/// A reconstructed hit on the cosmic ray tagger.
///
/// Positions and uncertainties are in cm, timestamps in ns.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TaggerHit {
    /// Hit position.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Half-width of the position uncertainty along each axis.
    pub x_err: f64,
    pub y_err: f64,
    pub z_err: f64,
    /// Absolute timestamp.
    pub ts0_ns: i64,
    /// Trigger-relative timestamp.
    pub ts1_ns: i64,
    /// Total light yield in photo-electrons.
    pub pe: f64,
}

impl TaggerHit {
    /// Creates a hit at `(x, y, z)` with zero uncertainty and zero light yield.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    /// Sets the per-axis position uncertainty.
    #[must_use]
    pub fn with_errors(mut self, x_err: f64, y_err: f64, z_err: f64) -> Self {
        self.x_err = x_err;
        self.y_err = y_err;
        self.z_err = z_err;
        self
    }

    /// Sets both timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, ts0_ns: i64, ts1_ns: i64) -> Self {
        self.ts0_ns = ts0_ns;
        self.ts1_ns = ts1_ns;
        self
    }

    /// Sets the light yield.
    #[must_use]
    pub fn with_pe(mut self, pe: f64) -> Self {
        self.pe = pe;
        self
    }

    /// Hit position as a vector.
    #[inline]
    #[must_use]
    pub fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Position uncertainty as a vector of half-widths.
    #[inline]
    #[must_use]
    pub fn errors(&self) -> DVec3 {
        DVec3::new(self.x_err, self.y_err, self.z_err)
    }

    /// Raw timestamp in the given clock domain (ns).
    #[inline]
    #[must_use]
    pub fn timestamp_ns(&self, domain: ClockDomain) -> i64 {
        match domain {
            ClockDomain::Ts0 => self.ts0_ns,
            ClockDomain::Ts1 => self.ts1_ns,
        }
    }

    /// Hit time in µs in the given clock domain, shifted by `correction_us`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_us(&self, domain: ClockDomain, correction_us: f64) -> f64 {
        self.timestamp_ns(domain) as f64 * 1e-3 + correction_us
    }

    /// Largest per-axis position uncertainty.
    #[inline]
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.x_err.max(self.y_err).max(self.z_err)
    }
}
