//! Track direction estimates at both ends.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::drift::DriftShift;
use crtmatch_core::{DirectionMethod, Track};
use glam::DVec3;

/// Directions of the track line at its start and end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDirections {
    /// Direction at the track start.
    pub start: DVec3,
    /// Direction at the track end.
    pub end: DVec3,
}

impl TrackDirections {
    /// Both directions zero; the DCA of a zero direction is undefined.
    pub const ZERO: Self = Self {
        start: DVec3::ZERO,
        end: DVec3::ZERO,
    };
}

/// Scales `v` to unit length; a zero vector is returned as is.
#[inline]
fn unit_or_unchanged(v: DVec3) -> DVec3 {
    let norm = v.length();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

/// Number of points in a block covering `frac` of `n` points.
#[inline]
fn block_len(n: usize, frac: f64) -> usize {
    ((n as f64 * frac).floor() as usize).min(n)
}

/// Dispatches to the configured direction strategy.
///
/// `shift` is only used by [`DirectionMethod::EndpointMidpoint`]; the averaged
/// methods work on the unshifted trajectory.
#[must_use]
pub fn estimate_directions(
    method: DirectionMethod,
    track: &Track,
    frac: f64,
    shift: &DriftShift<'_>,
) -> TrackDirections {
    match method {
        DirectionMethod::EndpointMidpoint => endpoint_midpoint_directions(track, frac, shift),
        DirectionMethod::Averaged => averaged_directions(track, frac),
        DirectionMethod::AveragedPoints => averaged_point_directions(track, frac),
    }
}

/// Averages the local trajectory directions over the first and last
/// `floor(frac * n_valid)` valid points.
///
/// The start direction is negated so both directions point out of the track.
#[must_use]
pub fn averaged_directions(track: &Track, frac: f64) -> TrackDirections {
    let directions: Vec<DVec3> = track.valid_points().map(|p| p.direction).collect();
    let n = directions.len();
    let k = block_len(n, frac);
    if k == 0 {
        return TrackDirections::ZERO;
    }

    let start_sum: DVec3 = directions[..k].iter().copied().sum();
    let end_sum: DVec3 = directions[n - k..].iter().copied().sum();
    let count = k as f64;

    TrackDirections {
        start: unit_or_unchanged(-start_sum / count),
        end: unit_or_unchanged(end_sum / count),
    }
}

/// Chords between valid positions: `p[0] - p[k-1]` at the start and
/// `p[n-1] - p[n-k]` at the end, with `k = floor(frac * n_valid)`.
#[must_use]
pub fn averaged_point_directions(track: &Track, frac: f64) -> TrackDirections {
    let positions: Vec<DVec3> = track.valid_points().map(|p| p.position).collect();
    let n = positions.len();
    let k = block_len(n, frac);
    if k == 0 {
        return TrackDirections::ZERO;
    }

    TrackDirections {
        start: unit_or_unchanged(positions[0] - positions[k - 1]),
        end: unit_or_unchanged(positions[n - 1] - positions[n - k]),
    }
}

/// Chords from the start and end to the point at raw index
/// `floor(frac * n_points)`, after shifting all three by `shift`.
///
/// Both directions point into the track. A chord of zero length is returned
/// unnormalized (zero); callers must check before relying on unit length.
#[must_use]
pub fn endpoint_midpoint_directions(
    track: &Track,
    frac: f64,
    shift: &DriftShift<'_>,
) -> TrackDirections {
    let mid_index = (track.num_points() as f64 * frac).floor() as usize;

    let start = shift.apply(track.start());
    let end = shift.apply(track.end());
    let mid = shift.apply(track.location_at(mid_index));

    TrackDirections {
        start: unit_or_unchanged(mid - start),
        end: unit_or_unchanged(mid - end),
    }
}
