//! Geometry primitives for track/hit distances.
//!
//! All lines here are infinite unless stated otherwise. Functions are pure;
//! degenerate inputs (zero-length directions) are not guarded and yield NaN.
#![allow(clippy::many_single_char_names, clippy::similar_names)]

use crtmatch_core::{DcaShape, TaggerHit};
use glam::DVec3;

/// Below this the two-line determinant is treated as zero and parameter
/// numerators are snapped to zero.
pub const PARALLEL_TOLERANCE: f64 = 1e-5;

/// Perpendicular distance from `point` to the line through `line_start` with
/// direction `line_direction`.
#[inline]
#[must_use]
pub fn point_to_line_distance(point: DVec3, line_start: DVec3, line_direction: DVec3) -> f64 {
    let line_end = line_start + line_direction;
    (point - line_start).cross(point - line_end).length() / line_direction.length()
}

/// Minimum distance between the finite segment `seg_start..seg_end` and the
/// infinite line through `line_start` and `line_end`.
///
/// The segment parameter is clamped to `[0, 1]`; the line parameter is not.
#[must_use]
pub fn segment_to_line_distance(
    seg_start: DVec3,
    seg_end: DVec3,
    line_start: DVec3,
    line_end: DVec3,
) -> f64 {
    let u = seg_end - seg_start;
    let v = line_end - line_start;
    let w = seg_start - line_start;

    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(w);
    let e = v.dot(w);
    let det = a * c - b * b;

    // sc = s_num / s_den, tc = t_num / t_den
    let (s_num, s_den, t_num, t_den) = if det < PARALLEL_TOLERANCE {
        (0.0, 1.0, e, c)
    } else {
        let s_num = b * e - c * d;
        let t_num = a * e - b * d;
        if s_num < 0.0 {
            // s = 0 end is closest
            (0.0, det, e, c)
        } else if s_num > det {
            // s = 1 end is closest
            (det, det, e + b, c)
        } else {
            (s_num, det, t_num, det)
        }
    };

    let sc = if s_num.abs() < PARALLEL_TOLERANCE {
        0.0
    } else {
        s_num / s_den
    };
    let tc = if t_num.abs() < PARALLEL_TOLERANCE {
        0.0
    } else {
        t_num / t_den
    };

    (w + sc * u - tc * v).length()
}

/// Intersection of the infinite line through `start` and `end` with the
/// axis-aligned box `box_min..box_max` (slab method).
///
/// Returns the entry and exit points in line-parameter order, or `None` if
/// the line misses the box. Zero direction components produce infinite
/// reciprocals and fall through the comparisons correctly.
#[must_use]
pub fn ray_box_intersection(
    box_min: DVec3,
    box_max: DVec3,
    start: DVec3,
    end: DVec3,
) -> Option<(DVec3, DVec3)> {
    let dir = end - start;
    let inv = dir.recip();

    let slab = |inv: f64, lo: f64, hi: f64, origin: f64| {
        if inv >= 0.0 {
            ((lo - origin) * inv, (hi - origin) * inv)
        } else {
            ((hi - origin) * inv, (lo - origin) * inv)
        }
    };

    let (mut tmin, mut tmax) = slab(inv.x, box_min.x, box_max.x, start.x);
    let (tymin, tymax) = slab(inv.y, box_min.y, box_max.y, start.y);

    if tmin > tymax || tymin > tmax {
        return None;
    }
    if tymin > tmin {
        tmin = tymin;
    }
    if tymax < tmax {
        tmax = tymax;
    }

    let (tzmin, tzmax) = slab(inv.z, box_min.z, box_max.z, start.z);

    if tmin > tzmax || tzmin > tmax {
        return None;
    }
    if tzmin > tmin {
        tmin = tzmin;
    }
    if tzmax < tmax {
        tmax = tzmax;
    }

    Some((start + tmin * dir, start + tmax * dir))
}

/// Distance from the hit centre to the track line.
#[inline]
#[must_use]
pub fn point_dca(hit: &TaggerHit, track_point: DVec3, track_direction: DVec3) -> f64 {
    point_to_line_distance(hit.position(), track_point, track_direction)
}

/// Distance from the track line (through `start` and `end`) to the box
/// spanned by the hit position uncertainties.
///
/// Zero when the line enters the box. Otherwise the hit is treated as the
/// face perpendicular to its most precisely measured axis (the tagger plane)
/// and the distance to the nearest of that face's four edges is returned.
/// Exact ties between uncertainties keep the x face, then the y face.
#[must_use]
pub fn box_dca(hit: &TaggerHit, start: DVec3, end: DVec3) -> f64 {
    let centre = hit.position();
    let err = hit.errors();

    if ray_box_intersection(centre - err, centre + err, start, end).is_some() {
        return 0.0;
    }

    let (x, y, z) = (hit.x, hit.y, hit.z);
    let (ex, ey, ez) = (hit.x_err, hit.y_err, hit.z_err);

    let mut corners = [
        DVec3::new(x, y - ey, z - ez),
        DVec3::new(x, y + ey, z - ez),
        DVec3::new(x, y - ey, z + ez),
        DVec3::new(x, y + ey, z + ez),
    ];
    if ey < ex && ey < ez {
        corners = [
            DVec3::new(x - ex, y, z - ez),
            DVec3::new(x + ex, y, z - ez),
            DVec3::new(x - ex, y, z + ez),
            DVec3::new(x + ex, y, z + ez),
        ];
    }
    if ez < ex && ez < ey {
        corners = [
            DVec3::new(x - ex, y - ey, z),
            DVec3::new(x + ex, y - ey, z),
            DVec3::new(x - ex, y + ey, z),
            DVec3::new(x + ex, y + ey, z),
        ];
    }

    let [v1, v2, v3, v4] = corners;
    let edges = [(v1, v2), (v1, v3), (v4, v2), (v4, v3)];
    edges
        .iter()
        .map(|&(a, b)| segment_to_line_distance(a, b, start, end))
        .fold(f64::INFINITY, f64::min)
}

/// Distance of closest approach for the configured hit shape.
///
/// The track line passes through `track_point` with direction
/// `track_direction`.
#[inline]
#[must_use]
pub fn dca(shape: DcaShape, hit: &TaggerHit, track_point: DVec3, track_direction: DVec3) -> f64 {
    match shape {
        DcaShape::Point => point_dca(hit, track_point, track_direction),
        DcaShape::Box => box_dca(hit, track_point, track_point + track_direction),
    }
}
