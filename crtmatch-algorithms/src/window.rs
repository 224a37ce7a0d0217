//! Admissible t0 range of a track.

use crtmatch_core::TimeWindow;

/// Range of t0 values that keep a track inside the active volume.
///
/// Shifting the track by `t0 * v` along x (`v = drift_direction * drift_velocity`)
/// must keep its most positive end below the most positive limit and its most
/// negative end above the most negative limit. A zero drift direction
/// (cathode-crossing or unknown) returns the degenerate `(0, 0)` window,
/// which accepts any hit time.
#[must_use]
pub fn track_t0_range(
    start_x: f64,
    end_x: f64,
    drift_direction: i32,
    x_limits: (f64, f64),
    drift_velocity: f64,
) -> TimeWindow {
    if drift_direction == 0 {
        return TimeWindow::unconstrained();
    }

    let vd = f64::from(drift_direction) * drift_velocity;

    let max_shift = x_limits.0.max(x_limits.1) - start_x.max(end_x);
    let min_shift = x_limits.0.min(x_limits.1) - start_x.min(end_x);

    let t0_max = max_shift / vd;
    let t0_min = min_shift / vd;

    TimeWindow::new(t0_min.min(t0_max), t0_min.max(t0_max))
}
