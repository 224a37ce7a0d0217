//! Drift volume layout of a multi-TPC detector.

use crtmatch_core::{DriftGeometry, Track, VolumeId, VolumeLookup};
use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One TPC drift volume.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tpc {
    /// Volume identifier reported by [`VolumeLookup`].
    pub id: VolumeId,
    /// Lower corner of the active volume (cm).
    pub min: DVec3,
    /// Upper corner of the active volume (cm).
    pub max: DVec3,
    /// Sign of the electron drift along x: +1 or -1.
    pub drift_direction: i32,
}

impl Tpc {
    /// Creates a TPC with the given volume id.
    #[must_use]
    pub fn new(id: u32, min: DVec3, max: DVec3, drift_direction: i32) -> Self {
        Self {
            id: VolumeId(id),
            min,
            max,
            drift_direction,
        }
    }

    /// Inclusive containment test.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// A set of TPCs with axis-aligned active volumes.
///
/// Implements [`VolumeLookup`] by containment and [`DriftGeometry`] from the
/// TPCs the valid trajectory points fall in.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TpcLayout {
    tpcs: Vec<Tpc>,
}

impl TpcLayout {
    /// Creates a layout from explicit TPCs.
    #[must_use]
    pub fn new(tpcs: Vec<Tpc>) -> Self {
        Self { tpcs }
    }

    /// Two cryostats with two TPCs each, the TPCs of a cryostat sharing a
    /// central cathode and drifting away from it.
    #[must_use]
    pub fn two_cryostat() -> Self {
        const Y: (f64, f64) = (-181.86, 134.96);
        const Z: (f64, f64) = (-894.95, 894.95);
        let tpc = |id, x_lo: f64, x_hi: f64, drift| {
            Tpc::new(
                id,
                DVec3::new(x_lo, Y.0, Z.0),
                DVec3::new(x_hi, Y.1, Z.1),
                drift,
            )
        };
        Self::new(vec![
            tpc(0, -358.49, -210.29, -1),
            tpc(1, -210.14, -61.94, 1),
            tpc(2, 61.94, 210.14, -1),
            tpc(3, 210.29, 358.49, 1),
        ])
    }

    /// All TPCs in lookup order.
    #[must_use]
    pub fn tpcs(&self) -> &[Tpc] {
        &self.tpcs
    }

    /// True when the layout holds no TPC.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tpcs.is_empty()
    }

    /// First TPC containing `point`.
    #[must_use]
    pub fn tpc_at(&self, point: DVec3) -> Option<&Tpc> {
        self.tpcs.iter().find(|tpc| tpc.contains(point))
    }

    /// TPCs holding the valid points of `track`, one entry per point inside.
    fn track_tpcs<'s>(&'s self, track: &'s Track) -> impl Iterator<Item = &'s Tpc> + 's {
        track
            .valid_points()
            .filter_map(move |point| self.tpc_at(point.position))
    }
}

impl VolumeLookup for TpcLayout {
    fn locate_volume(&self, point: DVec3) -> Option<VolumeId> {
        self.tpc_at(point).map(|tpc| tpc.id)
    }
}

impl DriftGeometry for TpcLayout {
    fn drift_direction(&self, track: &Track) -> i32 {
        let mut direction = 0;
        for tpc in self.track_tpcs(track) {
            if direction == 0 {
                direction = tpc.drift_direction;
            } else if tpc.drift_direction != direction {
                return 0;
            }
        }
        direction
    }

    fn x_limits(&self, track: &Track) -> (f64, f64) {
        let limits = self
            .track_tpcs(track)
            .fold(None, |acc: Option<(f64, f64)>, tpc| {
                Some(match acc {
                    Some((lo, hi)) => (lo.min(tpc.min.x), hi.max(tpc.max.x)),
                    None => (tpc.min.x, tpc.max.x),
                })
            });
        limits.unwrap_or((0.0, 0.0))
    }
}
