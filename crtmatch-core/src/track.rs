//! Reconstructed TPC track types.

use crate::{Error, Result};
use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One point of a track trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryPoint {
    /// Position in cm.
    pub position: DVec3,
    /// Local direction of the trajectory at this point.
    pub direction: DVec3,
    /// False when the point has no associated hit and should be skipped.
    #[cfg_attr(feature = "serde", serde(default = "default_valid"))]
    pub valid: bool,
}

#[cfg(feature = "serde")]
fn default_valid() -> bool {
    true
}

impl TrajectoryPoint {
    /// Creates a valid trajectory point.
    #[must_use]
    pub fn new(position: DVec3, direction: DVec3) -> Self {
        Self {
            position,
            direction,
            valid: true,
        }
    }

    /// Creates a point flagged as invalid.
    #[must_use]
    pub fn invalid(position: DVec3, direction: DVec3) -> Self {
        Self {
            position,
            direction,
            valid: false,
        }
    }
}

/// A reconstructed track: an ordered trajectory with per-point validity.
///
/// Start and end are the first and last *valid* points; indexed access
/// through [`Track::location_at`] is raw and ignores validity.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Track identifier, used by drift-geometry lookups.
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: u32,
    /// Trajectory points in order.
    pub points: Vec<TrajectoryPoint>,
}

impl Track {
    /// Creates a track from trajectory points.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTrack`] when fewer than two points are valid.
    pub fn new(id: u32, points: Vec<TrajectoryPoint>) -> Result<Self> {
        let track = Self { id, points };
        let valid = track.valid_points().count();
        if valid < 2 {
            return Err(Error::InvalidTrack(format!(
                "track {id} has {valid} valid points, need at least 2"
            )));
        }
        Ok(track)
    }

    /// Builds a straight track from positions, deriving each direction from
    /// the first to the last position.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTrack`] when fewer than two positions are given.
    pub fn from_positions(id: u32, positions: &[DVec3]) -> Result<Self> {
        let (Some(first), Some(last)) = (positions.first(), positions.last()) else {
            return Err(Error::InvalidTrack(format!("track {id} has no points")));
        };
        let direction = (*last - *first).normalize_or_zero();
        let points = positions
            .iter()
            .map(|&p| TrajectoryPoint::new(p, direction))
            .collect();
        Self::new(id, points)
    }

    /// Total number of trajectory points, valid or not.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Iterator over the valid points.
    pub fn valid_points(&self) -> impl DoubleEndedIterator<Item = &TrajectoryPoint> {
        self.points.iter().filter(|p| p.valid)
    }

    /// Position of the first valid point.
    #[must_use]
    pub fn start(&self) -> DVec3 {
        self.valid_points()
            .next()
            .map_or(DVec3::ZERO, |p| p.position)
    }

    /// Position of the last valid point.
    #[must_use]
    pub fn end(&self) -> DVec3 {
        self.valid_points()
            .next_back()
            .map_or(DVec3::ZERO, |p| p.position)
    }

    /// Position at a raw point index, clamped into range.
    #[must_use]
    pub fn location_at(&self, index: usize) -> DVec3 {
        match self.points.len() {
            0 => DVec3::ZERO,
            n => self.points[index.min(n - 1)].position,
        }
    }

    /// Path length summed over consecutive valid points.
    #[must_use]
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        let mut previous: Option<DVec3> = None;
        for point in self.valid_points() {
            if let Some(prev) = previous {
                total += point.position.distance(prev);
            }
            previous = Some(point.position);
        }
        total
    }
}
