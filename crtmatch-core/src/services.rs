//! Detector services the matcher depends on.
//!
//! The matcher only sees these traits. Implementations must be reentrant:
//! one matcher may be shared between threads.

use crate::track::Track;
use glam::DVec3;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a drift volume (TPC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeId(pub u32);

/// Electron drift velocity.
pub trait DriftVelocityProvider: Send + Sync {
    /// Drift velocity in cm/µs.
    fn drift_velocity(&self) -> f64;
}

/// Maps a point to the drift volume containing it.
pub trait VolumeLookup: Send + Sync {
    /// Returns `None` for points outside every volume.
    fn locate_volume(&self, point: DVec3) -> Option<VolumeId>;
}

/// Space-charge spatial distortion correction.
pub trait DistortionCorrection: Send + Sync {
    /// Whether the correction is active at all.
    fn enabled(&self) -> bool;

    /// Offset to add to a reconstructed position inside `volume`.
    fn offset_at(&self, point: DVec3, volume: VolumeId) -> DVec3;
}

/// Drift direction and active-volume x bounds of a track, derived from the
/// volumes its hits lie in.
pub trait DriftGeometry: Send + Sync {
    /// +1 or -1 for a track inside volumes with a common drift direction,
    /// 0 for a track crossing the cathode or with unknown direction.
    fn drift_direction(&self, track: &Track) -> i32;

    /// Minimum and maximum x of the drift volumes the track lies in.
    fn x_limits(&self, track: &Track) -> (f64, f64);
}

/// Drift velocity that does not vary over the run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstantDriftVelocity(pub f64);

impl ConstantDriftVelocity {
    /// Nominal liquid argon drift velocity at 500 V/cm (cm/µs).
    pub const NOMINAL: f64 = 0.157;
}

impl Default for ConstantDriftVelocity {
    fn default() -> Self {
        Self(Self::NOMINAL)
    }
}

impl DriftVelocityProvider for ConstantDriftVelocity {
    fn drift_velocity(&self) -> f64 {
        self.0
    }
}

/// Disabled distortion correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDistortion;

impl DistortionCorrection for NoDistortion {
    fn enabled(&self) -> bool {
        false
    }

    fn offset_at(&self, _point: DVec3, _volume: VolumeId) -> DVec3 {
        DVec3::ZERO
    }
}

/// Constant offset per volume; volumes without an entry are not shifted.
#[derive(Debug, Clone, Default)]
pub struct UniformDistortion {
    offsets: HashMap<VolumeId, DVec3>,
}

impl UniformDistortion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the offset applied inside `volume`.
    #[must_use]
    pub fn with_offset(mut self, volume: VolumeId, offset: DVec3) -> Self {
        self.offsets.insert(volume, offset);
        self
    }
}

impl DistortionCorrection for UniformDistortion {
    fn enabled(&self) -> bool {
        true
    }

    fn offset_at(&self, _point: DVec3, volume: VolumeId) -> DVec3 {
        self.offsets.get(&volume).copied().unwrap_or(DVec3::ZERO)
    }
}

/// Drift direction and x limits supplied directly instead of derived.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedDrift {
    pub drift_direction: i32,
    pub x_limits: (f64, f64),
}

impl FixedDrift {
    #[must_use]
    pub fn new(drift_direction: i32, x_limits: (f64, f64)) -> Self {
        Self {
            drift_direction,
            x_limits,
        }
    }
}

impl DriftGeometry for FixedDrift {
    fn drift_direction(&self, _track: &Track) -> i32 {
        self.drift_direction
    }

    fn x_limits(&self, _track: &Track) -> (f64, f64) {
        self.x_limits
    }
}

/// The drift-related services the matcher calls, bundled for convenience.
#[derive(Clone, Copy)]
pub struct DetectorServices<'a> {
    pub drift: &'a dyn DriftVelocityProvider,
    pub volumes: &'a dyn VolumeLookup,
    pub distortion: &'a dyn DistortionCorrection,
}

impl<'a> DetectorServices<'a> {
    #[must_use]
    pub fn new(
        drift: &'a dyn DriftVelocityProvider,
        volumes: &'a dyn VolumeLookup,
        distortion: &'a dyn DistortionCorrection,
    ) -> Self {
        Self {
            drift,
            volumes,
            distortion,
        }
    }

    /// Drift velocity in cm/µs.
    #[inline]
    #[must_use]
    pub fn drift_velocity(&self) -> f64 {
        self.drift.drift_velocity()
    }

    /// Applies the distortion offset of the volume containing `point`.
    ///
    /// Points outside every volume are returned unchanged.
    #[must_use]
    pub fn correct(&self, point: DVec3) -> DVec3 {
        match self.volumes.locate_volume(point) {
            Some(volume) => point + self.distortion.offset_at(point, volume),
            None => point,
        }
    }
}

impl std::fmt::Debug for DetectorServices<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorServices")
            .field("drift_velocity", &self.drift.drift_velocity())
            .field("distortion_enabled", &self.distortion.enabled())
            .finish_non_exhaustive()
    }
}
