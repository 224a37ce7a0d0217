//! Track to CRT hit matching.
//!
//! For one track the matcher walks the CRT hits, keeps those that pass the
//! time, quality and proximity gates, and selects the best remaining hit.
//! The matcher holds no mutable state: one instance can serve any number of
//! tracks, from any number of threads.

use crate::direction::estimate_directions;
use crate::drift::DriftShift;
use crate::geometry;
use crate::window;
use crtmatch_core::{
    DetectorServices, DriftGeometry, MatchCandidate, MatchConfig, Result, SelectionPolicy,
    TaggerHit, TimeWindow, Track,
};
use glam::DVec3;
use log::{debug, trace};

/// Matches TPC tracks to CRT hits.
#[derive(Debug, Clone)]
pub struct CrtT0Matcher<'a> {
    config: MatchConfig,
    services: DetectorServices<'a>,
}

impl<'a> CrtT0Matcher<'a> {
    /// Creates a matcher after validating the configuration.
    ///
    /// # Errors
    /// Returns the validation error of [`MatchConfig::validate`].
    pub fn new(config: MatchConfig, services: DetectorServices<'a>) -> Result<Self> {
        config.validate()?;
        debug!(
            "CRT t0 matcher: directions {:?}, dca {:?}, selection {:?}, {:?}",
            config.direction_method, config.dca_shape, config.selection, services
        );
        Ok(Self { config, services })
    }

    /// The configuration this matcher was built with.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Detector services used for drift and distortion.
    #[must_use]
    pub fn services(&self) -> &DetectorServices<'a> {
        &self.services
    }

    /// Hit time (µs) in the configured clock domain, including the time correction.
    #[must_use]
    pub fn hit_time(&self, hit: &TaggerHit) -> f64 {
        hit.time_us(self.config.clock_domain, self.config.time_correction)
    }

    /// Light yield and position uncertainty cuts.
    #[must_use]
    pub fn passes_quality(&self, hit: &TaggerHit) -> bool {
        hit.pe >= self.config.pe_cut && hit.max_error() <= self.config.max_uncertainty
    }

    /// Admissible t0 window of `track` for the given drift direction and
    /// active-volume x limits.
    #[must_use]
    pub fn track_t0_range(
        &self,
        track: &Track,
        drift_direction: i32,
        x_limits: (f64, f64),
    ) -> TimeWindow {
        window::track_t0_range(
            track.start().x,
            track.end().x,
            drift_direction,
            x_limits,
            self.services.drift_velocity(),
        )
    }

    /// Best candidate for `track`, deriving the drift direction and t0 window
    /// from `geometry`.
    #[must_use]
    pub fn closest_hit(
        &self,
        track: &Track,
        hits: &[TaggerHit],
        geometry: &dyn DriftGeometry,
    ) -> MatchCandidate {
        let drift_direction = geometry.drift_direction(track);
        let x_limits = geometry.x_limits(track);
        let window = self.track_t0_range(track, drift_direction, x_limits);
        trace!(
            "track {}: drift direction {drift_direction}, x limits {x_limits:?}, window {window:?}",
            track.id
        );
        self.closest_hit_in_window(track, window, hits, drift_direction)
    }

    /// Best candidate for `track` among `hits`, or the null candidate.
    #[must_use]
    pub fn closest_hit_in_window(
        &self,
        track: &Track,
        window: TimeWindow,
        hits: &[TaggerHit],
        drift_direction: i32,
    ) -> MatchCandidate {
        let candidates: Vec<MatchCandidate> = hits
            .iter()
            .filter_map(|hit| self.evaluate_hit(track, window, hit, drift_direction))
            .collect();

        let best = select_best(&candidates, self.config.selection);
        debug!(
            "track {}: {} of {} hits are candidates, best dca {:.2}",
            track.id,
            candidates.len(),
            hits.len(),
            best.dca
        );
        best
    }

    /// Applies all gates to one hit; `Some` when the hit becomes a candidate.
    #[must_use]
    pub fn evaluate_hit(
        &self,
        track: &Track,
        window: TimeWindow,
        hit: &TaggerHit,
        drift_direction: i32,
    ) -> Option<MatchCandidate> {
        let time = self.hit_time(hit);
        if !window.accepts(time) {
            trace!("track {}: hit at {time:.2} us outside {window:?}", track.id);
            return None;
        }
        if !self.passes_quality(hit) {
            trace!("track {}: hit at {time:.2} us fails quality cuts", track.id);
            return None;
        }

        let shift = DriftShift::new(
            &self.services,
            drift_direction,
            time,
            self.config.sce_position_correction,
        );
        trace!(
            "track {}: hit at {time:.2} us, x shift {:.2} cm, corrected {}",
            track.id,
            shift.x_shift(),
            shift.is_corrected()
        );
        let directions = estimate_directions(
            self.config.direction_method,
            track,
            self.config.track_direction_frac,
            &shift,
        );

        let start = shift.apply(track.start());
        let end = shift.apply(track.end());

        let start_dca = self.end_dca(hit, start, directions.start);
        let end_dca = self.end_dca(hit, end, directions.end);

        let limit = self.config.distance_limit;
        if !(start_dca < limit || end_dca < limit) {
            return None;
        }

        let position = hit.position();
        let start_length = start.distance(position);
        let end_length = end.distance(position);

        let (dca, extrapolation_length) = if start_length <= end_length {
            (start_dca, start_length)
        } else {
            (end_dca, end_length)
        };

        Some(MatchCandidate {
            hit: *hit,
            t0: time,
            dca,
            extrapolation_length,
        })
    }

    /// DCA of the line through `point` along `direction`; a zero direction
    /// never yields a candidate.
    fn end_dca(&self, hit: &TaggerHit, point: DVec3, direction: DVec3) -> f64 {
        if direction.length_squared() == 0.0 {
            return f64::INFINITY;
        }
        geometry::dca(self.config.dca_shape, hit, point, direction)
    }
}

/// Picks the best candidate under `policy`.
///
/// Ties keep the earlier candidate. A candidate with negative DCA never
/// replaces a valid best, while a negative best is always replaced. NaN
/// scores rank last. An empty list yields the null candidate.
#[must_use]
pub fn select_best(candidates: &[MatchCandidate], policy: SelectionPolicy) -> MatchCandidate {
    let score = |candidate: &MatchCandidate| match policy {
        SelectionPolicy::Dca => candidate.dca,
        SelectionPolicy::DcaOverLength => candidate.dca_over_length(),
    };

    let mut best = MatchCandidate::null();
    for candidate in candidates {
        if best.is_null() {
            best = *candidate;
        } else if candidate.dca >= 0.0 && ranks_before(score(candidate), score(&best)) {
            best = *candidate;
        }
    }
    best
}

#[inline]
fn ranks_before(score: f64, best: f64) -> bool {
    score < best || (best.is_nan() && !score.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crtmatch_core::{
        ClockDomain, ConstantDriftVelocity, DcaShape, NoDistortion, UniformDistortion, VolumeId,
        VolumeLookup,
    };

    struct AnyVolume;

    impl VolumeLookup for AnyVolume {
        fn locate_volume(&self, _point: DVec3) -> Option<VolumeId> {
            Some(VolumeId(0))
        }
    }

    const DRIFT: ConstantDriftVelocity = ConstantDriftVelocity(0.1);

    fn services() -> DetectorServices<'static> {
        DetectorServices::new(&DRIFT, &AnyVolume, &NoDistortion)
    }

    fn candidate(dca: f64, extrapolation_length: f64) -> MatchCandidate {
        MatchCandidate {
            hit: TaggerHit::new(dca, extrapolation_length, 0.0),
            t0: 0.0,
            dca,
            extrapolation_length,
        }
    }

    /// Vertical track from y = -100 to y = 100 at x = z = 0.
    fn vertical_track() -> Track {
        let positions: Vec<DVec3> = (0..=20)
            .map(|i| DVec3::new(0.0, -100.0 + 10.0 * f64::from(i), 0.0))
            .collect();
        Track::from_positions(4, &positions).unwrap()
    }

    #[test]
    fn test_select_best_by_dca() {
        let list = [candidate(5.0, 10.0), candidate(3.0, 100.0), candidate(4.0, 1000.0)];
        let best = select_best(&list, SelectionPolicy::Dca);
        assert_relative_eq!(best.dca, 3.0);
    }

    #[test]
    fn test_select_best_by_ratio() {
        let list = [candidate(5.0, 10.0), candidate(3.0, 100.0), candidate(4.0, 1000.0)];
        let best = select_best(&list, SelectionPolicy::DcaOverLength);
        assert_relative_eq!(best.dca, 4.0);
    }

    #[test]
    fn test_select_best_never_prefers_negative() {
        let list = [candidate(7.0, 10.0), candidate(-1.0, 10.0), candidate(-99999.0, 1.0)];
        for policy in [SelectionPolicy::Dca, SelectionPolicy::DcaOverLength] {
            let best = select_best(&list, policy);
            assert_relative_eq!(best.dca, 7.0);
        }

        let negative_first = [candidate(-1.0, 10.0), candidate(8.0, 10.0)];
        assert_relative_eq!(select_best(&negative_first, SelectionPolicy::Dca).dca, 8.0);
    }

    #[test]
    fn test_select_best_ties_keep_first() {
        let list = [candidate(2.0, 10.0), candidate(2.0, 20.0)];
        let best = select_best(&list, SelectionPolicy::Dca);
        assert_relative_eq!(best.extrapolation_length, 10.0);
        assert!(select_best(&[], SelectionPolicy::Dca).is_null());
    }

    #[test]
    fn test_hit_on_track_line() {
        let matcher = CrtT0Matcher::new(MatchConfig::default(), services()).unwrap();
        let hit = TaggerHit::new(0.0, 150.0, 0.0)
            .with_errors(1.0, 1.0, 1.0)
            .with_timestamps(0, 0);

        let best = matcher.closest_hit_in_window(
            &vertical_track(),
            TimeWindow::unconstrained(),
            &[hit],
            1,
        );
        assert!(best.dca.abs() < 1e-6);
        assert_relative_eq!(best.extrapolation_length, 50.0);
        assert_eq!(best.hit, hit);
    }

    #[test]
    fn test_time_gate() {
        let matcher = CrtT0Matcher::new(MatchConfig::default(), services()).unwrap();
        let track = vertical_track();
        let window = TimeWindow::new(0.0, 100.0);
        let inside = TaggerHit::new(0.0, 150.0, 0.0).with_timestamps(0, 105_000);
        let outside = TaggerHit::new(0.0, 150.0, 0.0).with_timestamps(0, 111_000);

        assert!(matcher.evaluate_hit(&track, window, &inside, 0).is_some());
        assert!(matcher.evaluate_hit(&track, window, &outside, 0).is_none());
    }

    #[test]
    fn test_quality_gates() {
        let config = MatchConfig::default()
            .with_pe_cut(50.0)
            .with_max_uncertainty(20.0);
        let matcher = CrtT0Matcher::new(config, services()).unwrap();
        let good = TaggerHit::new(0.0, 150.0, 0.0)
            .with_errors(20.0, 1.0, 20.0)
            .with_pe(50.0);

        assert!(matcher.passes_quality(&good));
        assert!(!matcher.passes_quality(&good.with_pe(49.9)));
        assert!(!matcher.passes_quality(&good.with_errors(20.1, 1.0, 1.0)));
        assert!(!matcher.passes_quality(&good.with_errors(1.0, 1.0, 25.0)));
    }

    #[test]
    fn test_distance_gate_and_end_choice() {
        let config = MatchConfig::default().with_distance_limit(30.0);
        let matcher = CrtT0Matcher::new(config, services()).unwrap();
        let track = vertical_track();

        // 20 cm off the line, beyond the bottom end
        let near = TaggerHit::new(20.0, -180.0, 0.0);
        let cand = matcher
            .evaluate_hit(&track, TimeWindow::unconstrained(), &near, 1)
            .unwrap();
        assert_relative_eq!(cand.dca, 20.0, epsilon = 1e-9);
        assert_relative_eq!(cand.extrapolation_length, (400.0_f64 + 6400.0).sqrt());

        let far = TaggerHit::new(40.0, -180.0, 0.0);
        assert!(matcher
            .evaluate_hit(&track, TimeWindow::unconstrained(), &far, 1)
            .is_none());
    }

    #[test]
    fn test_drift_shift_moves_track() {
        let matcher = CrtT0Matcher::new(MatchConfig::default(), services()).unwrap();
        let track = vertical_track();
        // t0 = 100 us at 0.1 cm/us shifts the track 10 cm along +x
        let hit = TaggerHit::new(10.0, 150.0, 0.0).with_timestamps(0, 100_000);

        let shifted = matcher
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, 1)
            .unwrap();
        assert!(shifted.dca.abs() < 1e-9);
        assert_relative_eq!(shifted.t0, 100.0);

        let opposite = matcher
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, -1)
            .unwrap();
        assert_relative_eq!(opposite.dca, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_box_shape_gives_zero_inside_uncertainty() {
        let config = MatchConfig::default().with_dca_shape(DcaShape::Box);
        let matcher = CrtT0Matcher::new(config, services()).unwrap();
        let hit = TaggerHit::new(5.0, 150.0, 0.0).with_errors(10.0, 1.0, 10.0);
        let cand = matcher
            .evaluate_hit(&vertical_track(), TimeWindow::unconstrained(), &hit, 1)
            .unwrap();
        assert_eq!(cand.dca, 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MatchConfig::default().with_track_direction_frac(0.0);
        assert!(CrtT0Matcher::new(config, services()).is_err());
    }

    #[test]
    fn test_nan_score_ranks_last() {
        let undefined = candidate(f64::NAN, 10.0);
        let list = [undefined, candidate(6.0, 10.0), candidate(9.0, 10.0)];
        for policy in [SelectionPolicy::Dca, SelectionPolicy::DcaOverLength] {
            assert_relative_eq!(select_best(&list, policy).dca, 6.0);
        }
    }

    #[test]
    fn test_distortion_correction_moves_track_ends() {
        let sce = UniformDistortion::new().with_offset(VolumeId(0), DVec3::new(5.0, 0.0, 0.0));
        let services = DetectorServices::new(&DRIFT, &AnyVolume, &sce);
        let hit = TaggerHit::new(5.0, 150.0, 0.0);
        let track = vertical_track();

        let corrected = CrtT0Matcher::new(MatchConfig::default(), services)
            .unwrap()
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, 1)
            .unwrap();
        assert!(corrected.dca.abs() < 1e-9);
        assert_relative_eq!(corrected.extrapolation_length, 50.0);

        let raw_config = MatchConfig::default().with_sce_position_correction(false);
        let raw = CrtT0Matcher::new(raw_config, services)
            .unwrap()
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, 1)
            .unwrap();
        assert_relative_eq!(raw.dca, 5.0, epsilon = 1e-9);
        assert_relative_eq!(raw.extrapolation_length, (25.0_f64 + 2500.0).sqrt());
    }

    #[test]
    fn test_clock_domain_selects_timestamp() {
        let hit = TaggerHit::new(0.0, 150.0, 0.0).with_timestamps(250_000, 4_000);
        let track = vertical_track();

        let absolute = MatchConfig::default().with_clock_domain(ClockDomain::Ts0);
        let cand = CrtT0Matcher::new(absolute, services())
            .unwrap()
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, 0)
            .unwrap();
        assert_relative_eq!(cand.t0, 250.0);

        let relative = CrtT0Matcher::new(MatchConfig::default(), services())
            .unwrap()
            .evaluate_hit(&track, TimeWindow::unconstrained(), &hit, 0)
            .unwrap();
        assert_relative_eq!(relative.t0, 4.0);
    }
}
