//! Track-level queries with the sentinel conventions used by downstream
//! reconstruction.

use crate::matcher::CrtT0Matcher;
use crtmatch_core::{
    DriftGeometry, MatchCandidate, TaggerHit, TimeWindow, Track, NO_MATCH, NO_MATCH_PAIR,
};
use log::debug;

impl CrtT0Matcher<'_> {
    /// Whether `candidate` passes the final DCA and DCA/length cuts.
    #[must_use]
    pub fn accepts(&self, candidate: &MatchCandidate) -> bool {
        let config = self.config();
        !candidate.is_null()
            && candidate.dca < config.distance_limit
            && candidate.dca_over_length() < config.dca_over_length_limit
    }

    fn accepted_match(
        &self,
        track: &Track,
        hits: &[TaggerHit],
        geometry: &dyn DriftGeometry,
    ) -> Option<MatchCandidate> {
        let length = track.length();
        if length < self.config().min_track_length {
            debug!(
                "track {}: length {length:.1} cm below minimum, not matched",
                track.id
            );
            return None;
        }
        self.closest_hit(track, hits, geometry)
            .into_option()
            .filter(|best| self.accepts(best))
    }

    /// t0 (µs) of the matched CRT hit, or [`NO_MATCH`].
    ///
    /// Tracks shorter than the configured minimum length are not matched and
    /// their hits are never examined.
    #[must_use]
    pub fn t0_from_crt_hits(
        &self,
        track: &Track,
        hits: &[TaggerHit],
        geometry: &dyn DriftGeometry,
    ) -> f64 {
        self.accepted_match(track, hits, geometry)
            .map_or(NO_MATCH, |best| self.hit_time(&best.hit))
    }

    /// `(t0, dca)` of the matched CRT hit, or `(NO_MATCH_PAIR, NO_MATCH_PAIR)`.
    #[must_use]
    pub fn t0_and_dca_from_crt_hits(
        &self,
        track: &Track,
        hits: &[TaggerHit],
        geometry: &dyn DriftGeometry,
    ) -> (f64, f64) {
        self.accepted_match(track, hits, geometry)
            .map_or((NO_MATCH_PAIR, NO_MATCH_PAIR), |best| (best.t0, best.dca))
    }

    /// Best hit and its DCA without the final acceptance cuts. The hit is
    /// default-constructed and the DCA negative when there is no candidate.
    #[must_use]
    pub fn closest_crt_hit(
        &self,
        track: &Track,
        hits: &[TaggerHit],
        geometry: &dyn DriftGeometry,
    ) -> (TaggerHit, f64) {
        let best = self.closest_hit(track, hits, geometry);
        (best.hit, best.dca)
    }

    /// As [`closest_crt_hit`](Self::closest_crt_hit) with an explicit window
    /// and drift direction.
    #[must_use]
    pub fn closest_crt_hit_in_window(
        &self,
        track: &Track,
        window: TimeWindow,
        hits: &[TaggerHit],
        drift_direction: i32,
    ) -> (TaggerHit, f64) {
        let best = self.closest_hit_in_window(track, window, hits, drift_direction);
        (best.hit, best.dca)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crtmatch_core::{
        ConstantDriftVelocity, DetectorServices, FixedDrift, MatchConfig, NoDistortion,
        SelectionPolicy, VolumeId, VolumeLookup,
    };
    use glam::DVec3;

    struct Everywhere;

    impl VolumeLookup for Everywhere {
        fn locate_volume(&self, _point: DVec3) -> Option<VolumeId> {
            Some(VolumeId(0))
        }
    }

    const DRIFT: ConstantDriftVelocity = ConstantDriftVelocity(0.1);

    fn matcher(config: MatchConfig) -> CrtT0Matcher<'static> {
        CrtT0Matcher::new(config, DetectorServices::new(&DRIFT, &Everywhere, &NoDistortion))
            .unwrap()
    }

    fn vertical_track(length: f64) -> Track {
        let positions: Vec<DVec3> = (0..=10)
            .map(|i| DVec3::new(0.0, length * (f64::from(i) / 10.0 - 0.5), 0.0))
            .collect();
        Track::from_positions(7, &positions).unwrap()
    }

    #[test]
    fn test_t0_from_matching_hit() {
        let m = matcher(MatchConfig::default().with_time_correction(2.0));
        let hit = TaggerHit::new(3.0, 150.0, 0.0).with_timestamps(0, 40_000);
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));

        assert_relative_eq!(m.t0_from_crt_hits(&track, &[hit], &geometry), 42.0);
        let (t0, dca) = m.t0_and_dca_from_crt_hits(&track, &[hit], &geometry);
        assert_relative_eq!(t0, 42.0);
        assert_relative_eq!(dca, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_track_not_matched() {
        let m = matcher(MatchConfig::default());
        let hit = TaggerHit::new(0.0, 50.0, 0.0);
        let track = vertical_track(10.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));

        assert_eq!(m.t0_from_crt_hits(&track, &[hit], &geometry), NO_MATCH);
        assert_eq!(
            m.t0_and_dca_from_crt_hits(&track, &[hit], &geometry),
            (NO_MATCH_PAIR, NO_MATCH_PAIR)
        );
        // the unfiltered query still sees the hit
        let (_, dca) = m.closest_crt_hit(&track, &[hit], &geometry);
        assert!(dca >= 0.0);
    }

    #[test]
    fn test_no_hits_gives_sentinels() {
        let m = matcher(MatchConfig::default());
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));

        assert_eq!(m.t0_from_crt_hits(&track, &[], &geometry), NO_MATCH);
        let (hit, dca) = m.closest_crt_hit(&track, &[], &geometry);
        assert_eq!(hit, TaggerHit::default());
        assert!(dca < 0.0);
    }

    #[test]
    fn test_dca_over_length_cut() {
        let config = MatchConfig::default()
            .with_selection(SelectionPolicy::DcaOverLength)
            .with_dca_over_length_limit(0.05);
        let m = matcher(config);
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));

        // dca 10 at 50 cm: ratio 0.2 fails
        let close = TaggerHit::new(10.0, 150.0, 0.0);
        assert_eq!(m.t0_from_crt_hits(&track, &[close], &geometry), NO_MATCH);

        // dca 10 at 400 cm: ratio below 0.05 passes
        let far = TaggerHit::new(10.0, 500.0, 0.0).with_timestamps(0, 7_000);
        assert_relative_eq!(m.t0_from_crt_hits(&track, &[close, far], &geometry), 7.0);
    }

    #[test]
    fn test_window_rejects_late_hit() {
        let m = matcher(MatchConfig::default());
        let track = vertical_track(200.0);
        let hit = TaggerHit::new(0.0, 150.0, 0.0).with_timestamps(0, 500_000);
        let window = TimeWindow::new(0.0, 100.0);

        let (_, dca) = m.closest_crt_hit_in_window(&track, window, &[hit], 0);
        assert!(dca < 0.0);
        let (matched, dca) =
            m.closest_crt_hit_in_window(&track, TimeWindow::unconstrained(), &[hit], 0);
        assert_eq!(matched, hit);
        assert!(dca.abs() < 1e-9);
    }

    #[test]
    fn test_repeated_queries_agree() {
        let m = matcher(MatchConfig::default());
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(1, (-200.0, 200.0));
        let hits = [
            TaggerHit::new(2.0, 150.0, 1.0).with_timestamps(0, 1_000),
            TaggerHit::new(-4.0, -140.0, 0.0).with_timestamps(0, 2_000),
        ];

        let first = m.t0_and_dca_from_crt_hits(&track, &hits, &geometry);
        let second = m.t0_and_dca_from_crt_hits(&track, &hits, &geometry);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hit_on_track_end_matches() {
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));
        let on_end = TaggerHit::new(0.0, 100.0, 0.0).with_timestamps(0, 3_000);
        let beside = TaggerHit::new(4.0, 160.0, 0.0).with_timestamps(0, 9_000);

        let m = matcher(MatchConfig::default());
        assert_relative_eq!(m.t0_from_crt_hits(&track, &[on_end], &geometry), 3.0);
        let (t0, dca) = m.t0_and_dca_from_crt_hits(&track, &[on_end], &geometry);
        assert_relative_eq!(t0, 3.0);
        assert!(dca.abs() < 1e-9);

        let m = matcher(MatchConfig::default().with_selection(SelectionPolicy::DcaOverLength));
        assert_relative_eq!(
            m.t0_from_crt_hits(&track, &[on_end, beside], &geometry),
            3.0
        );
        assert_relative_eq!(
            m.t0_from_crt_hits(&track, &[beside, on_end], &geometry),
            3.0
        );
    }

    #[test]
    fn test_pe_cut_rejects_dim_hit() {
        let m = matcher(MatchConfig::default().with_pe_cut(50.0));
        let track = vertical_track(200.0);
        let geometry = FixedDrift::new(0, (0.0, 0.0));

        let dim = TaggerHit::new(0.0, 150.0, 0.0)
            .with_timestamps(0, 5_000)
            .with_pe(10.0);
        assert_eq!(m.t0_from_crt_hits(&track, &[dim], &geometry), NO_MATCH);
        let (_, dca) = m.closest_crt_hit(&track, &[dim], &geometry);
        assert!(dca < 0.0);

        let bright = dim.with_pe(60.0);
        assert_relative_eq!(m.t0_from_crt_hits(&track, &[bright], &geometry), 5.0);
    }
}
