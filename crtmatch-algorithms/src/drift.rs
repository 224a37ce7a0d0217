//! Drift-time position shift with optional space-charge correction.

use crtmatch_core::DetectorServices;
use glam::DVec3;

/// Moves reconstructed positions to where they lie for a given t0.
///
/// A track reconstructed assuming t0 = 0 is displaced along the drift axis
/// (x) by `drift_direction * t0 * drift_velocity`. The shifted point is then
/// optionally corrected for spatial distortions in the volume it falls in.
#[derive(Clone, Copy, Debug)]
pub struct DriftShift<'a> {
    x_shift: f64,
    correction: Option<DetectorServices<'a>>,
}

impl<'a> DriftShift<'a> {
    /// Shift for `t0` (µs). The correction is applied only when `correct` is
    /// set and the distortion service reports itself enabled.
    #[must_use]
    pub fn new(services: &DetectorServices<'a>, drift_direction: i32, t0: f64, correct: bool) -> Self {
        let x_shift = f64::from(drift_direction) * t0 * services.drift_velocity();
        let correction = (correct && services.distortion.enabled()).then_some(*services);
        Self {
            x_shift,
            correction,
        }
    }

    /// No shift, no correction.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            x_shift: 0.0,
            correction: None,
        }
    }

    /// Drift displacement along x (cm).
    #[must_use]
    pub fn x_shift(&self) -> f64 {
        self.x_shift
    }

    /// True when positions are distortion corrected.
    #[must_use]
    pub fn is_corrected(&self) -> bool {
        self.correction.is_some()
    }

    /// Shifts `point` and applies the distortion correction if requested.
    #[must_use]
    pub fn apply(&self, point: DVec3) -> DVec3 {
        let shifted = DVec3::new(point.x + self.x_shift, point.y, point.z);
        match &self.correction {
            Some(services) => services.correct(shifted),
            None => shifted,
        }
    }
}
