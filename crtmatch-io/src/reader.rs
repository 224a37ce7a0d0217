//! JSON readers for events, matcher configuration and detector layouts.

use crate::{Error, Result};
use crtmatch_algorithms::TpcLayout;
use crtmatch_core::{
    DVec3, FixedDrift, MatchConfig, TaggerHit, Track, TrajectoryPoint, UniformDistortion, VolumeId,
};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A track as stored in an event file.
///
/// Either full trajectory `points` or bare `positions` may be given. With
/// bare positions every point carries the first-to-last direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTrack {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<TrajectoryPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<DVec3>,
    /// Drift direction override; the detector layout decides when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_direction: Option<i32>,
    /// Active-volume x limits override, `[x_min, x_max]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_limits: Option<[f64; 2]>,
}

impl EventTrack {
    /// Builds the matcher-facing track.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] when both or neither of `points` and
    /// `positions` are given, and the core error for tracks with fewer than
    /// two valid points.
    pub fn to_track(&self) -> Result<Track> {
        match (self.points.is_empty(), self.positions.is_empty()) {
            (false, true) => Ok(Track::new(self.id, self.points.clone())?),
            (true, false) => Ok(Track::from_positions(self.id, &self.positions)?),
            (false, false) => Err(Error::InvalidFormat(format!(
                "track {}: both points and positions given",
                self.id
            ))),
            (true, true) => Err(Error::InvalidFormat(format!(
                "track {}: no trajectory",
                self.id
            ))),
        }
    }

    /// Drift geometry fixed by the file, when both overrides are present.
    #[must_use]
    pub fn drift_override(&self) -> Option<FixedDrift> {
        match (self.drift_direction, self.x_limits) {
            (Some(direction), Some([lo, hi])) => Some(FixedDrift::new(direction, (lo, hi))),
            _ => None,
        }
    }
}

/// One readout event: tracks and the CRT hits recorded with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u32,
    #[serde(default)]
    pub tracks: Vec<EventTrack>,
    #[serde(default)]
    pub hits: Vec<TaggerHit>,
}

impl Event {
    /// Range of hit timestamps (ns) in the trigger-relative clock.
    #[must_use]
    pub fn ts1_range(&self) -> Option<(i64, i64)> {
        let mut times = self.hits.iter().map(|hit| hit.ts1_ns);
        let first = times.next()?;
        Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

/// Top-level event file document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFile {
    pub events: Vec<Event>,
}

impl EventFile {
    /// Parses and validates an event file from a JSON string.
    ///
    /// # Errors
    /// Returns a JSON error for malformed input and
    /// [`Error::InvalidFormat`] for invalid drift overrides.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    /// Checks the drift overrides of every track.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] naming the first offending track.
    pub fn validate(&self) -> Result<()> {
        for event in &self.events {
            for track in &event.tracks {
                if let Some(direction) = track.drift_direction {
                    if !(-1..=1).contains(&direction) {
                        return Err(Error::InvalidFormat(format!(
                            "event {} track {}: drift direction {direction} not in -1..=1",
                            event.id, track.id
                        )));
                    }
                }
                if let Some([lo, hi]) = track.x_limits {
                    if !(lo.is_finite() && hi.is_finite()) {
                        return Err(Error::InvalidFormat(format!(
                            "event {} track {}: non-finite x limits",
                            event.id, track.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Total number of tracks over all events.
    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.events.iter().map(|e| e.tracks.len()).sum()
    }

    /// Total number of CRT hits over all events.
    #[must_use]
    pub fn num_hits(&self) -> usize {
        self.events.iter().map(|e| e.hits.len()).sum()
    }
}

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Reads and validates an event file.
///
/// # Errors
/// Returns I/O, JSON or format errors.
pub fn read_event_file<P: AsRef<Path>>(path: P) -> Result<EventFile> {
    let path = path.as_ref();
    let file: EventFile = read_json(path)?;
    file.validate()?;
    info!(
        "Read {} events ({} tracks, {} hits) from {}",
        file.events.len(),
        file.num_tracks(),
        file.num_hits(),
        path.display()
    );
    Ok(file)
}

/// Writes an event file as pretty-printed JSON.
///
/// # Errors
/// Returns I/O or JSON errors.
pub fn write_event_file<P: AsRef<Path>>(path: P, events: &EventFile) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, events)?;
    writer.flush()?;
    Ok(())
}

/// Reads a matcher configuration. Fields missing from the file keep their
/// defaults.
///
/// # Errors
/// Returns I/O or JSON errors, or the validation error of the parsed config.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<MatchConfig> {
    let path = path.as_ref();
    let config: MatchConfig = read_json(path)?;
    config.validate()?;
    debug!("Loaded matcher configuration from {}", path.display());
    Ok(config)
}

/// Reads a TPC layout, `{"tpcs": [{"id", "min", "max", "drift_direction"}]}`.
///
/// # Errors
/// Returns I/O or JSON errors, or [`Error::InvalidFormat`] for an empty layout
/// or a TPC with an inverted box or a drift direction other than ±1.
pub fn read_layout<P: AsRef<Path>>(path: P) -> Result<TpcLayout> {
    let layout: TpcLayout = read_json(path)?;
    if layout.is_empty() {
        return Err(Error::InvalidFormat("layout has no TPC".into()));
    }
    for tpc in layout.tpcs() {
        if tpc.drift_direction.abs() != 1 {
            return Err(Error::InvalidFormat(format!(
                "TPC {}: drift direction must be +1 or -1",
                tpc.id.0
            )));
        }
        if !tpc.min.cmple(tpc.max).all() {
            return Err(Error::InvalidFormat(format!(
                "TPC {}: min corner exceeds max corner",
                tpc.id.0
            )));
        }
    }
    Ok(layout)
}

#[derive(Deserialize)]
struct VolumeOffset {
    volume: u32,
    offset: DVec3,
}

#[derive(Deserialize)]
struct DistortionFile {
    offsets: Vec<VolumeOffset>,
}

/// Reads per-volume space-charge offsets,
/// `{"offsets": [{"volume": 0, "offset": [dx, dy, dz]}]}`.
///
/// # Errors
/// Returns I/O or JSON errors, or [`Error::InvalidFormat`] for a non-finite
/// offset or a volume listed twice.
pub fn read_distortion<P: AsRef<Path>>(path: P) -> Result<UniformDistortion> {
    let path = path.as_ref();
    let file: DistortionFile = read_json(path)?;
    let mut seen = Vec::with_capacity(file.offsets.len());
    let mut distortion = UniformDistortion::new();
    for entry in file.offsets {
        if !entry.offset.is_finite() {
            return Err(Error::InvalidFormat(format!(
                "volume {}: non-finite offset",
                entry.volume
            )));
        }
        if seen.contains(&entry.volume) {
            return Err(Error::InvalidFormat(format!(
                "volume {} listed twice",
                entry.volume
            )));
        }
        seen.push(entry.volume);
        distortion = distortion.with_offset(VolumeId(entry.volume), entry.offset);
    }
    debug!(
        "Loaded distortion offsets for {} volumes from {}",
        seen.len(),
        path.display()
    );
    Ok(distortion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crtmatch_core::{DcaShape, DistortionCorrection, DriftGeometry, Error as CoreError};
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    const EVENTS: &str = r#"{
        "events": [
            {
                "id": 7,
                "tracks": [
                    { "id": 1, "positions": [[100, -50, 0], [110, 50, 10]] },
                    {
                        "id": 2,
                        "points": [
                            { "position": [0, 0, 0], "direction": [0, 1, 0] },
                            { "position": [0, 5, 0], "direction": [0, 1, 0], "valid": false },
                            { "position": [0, 10, 0], "direction": [0, 1, 0] }
                        ],
                        "drift_direction": -1,
                        "x_limits": [-100, 0]
                    }
                ],
                "hits": [
                    { "x": 1, "y": 200, "z": 3, "ts1_ns": 5000, "pe": 80 },
                    { "x": 1, "y": -200, "z": 3, "ts1_ns": -2500 }
                ]
            },
            { "id": 8 }
        ]
    }"#;

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_event_file() {
        let file = EventFile::from_json(EVENTS).unwrap();
        assert_eq!(file.events.len(), 2);
        assert_eq!(file.num_tracks(), 2);
        assert_eq!(file.num_hits(), 2);

        let event = &file.events[0];
        let hit = event.hits[0];
        assert_eq!(hit.ts1_ns, 5000);
        assert_relative_eq!(hit.x_err, 0.0);
        assert_relative_eq!(hit.pe, 80.0);
        assert_eq!(event.ts1_range(), Some((-2500, 5000)));
        assert!(file.events[1].tracks.is_empty());
        assert_eq!(file.events[1].ts1_range(), None);
    }

    #[test]
    fn test_track_conversion() {
        let file = EventFile::from_json(EVENTS).unwrap();
        let tracks = &file.events[0].tracks;

        let bare = tracks[0].to_track().unwrap();
        assert_eq!(bare.num_points(), 2);
        assert!(tracks[0].drift_override().is_none());

        let full = tracks[1].to_track().unwrap();
        assert_eq!(full.num_points(), 3);
        assert_eq!(full.valid_points().count(), 2);
        let drift = tracks[1].drift_override().unwrap();
        assert_eq!(drift.drift_direction(&full), -1);
        assert_eq!(drift.x_limits(&full), (-100.0, 0.0));
    }

    #[test]
    fn test_track_without_trajectory() {
        let track = EventTrack {
            id: 3,
            ..EventTrack::default()
        };
        assert!(matches!(track.to_track(), Err(Error::InvalidFormat(_))));

        let single = EventTrack {
            id: 4,
            positions: vec![DVec3::ZERO],
            ..EventTrack::default()
        };
        assert!(matches!(
            single.to_track(),
            Err(Error::CoreError(CoreError::InvalidTrack(_)))
        ));
    }

    #[test]
    fn test_invalid_drift_direction_rejected() {
        let json = r#"{"events": [{"id": 1, "tracks": [
            {"id": 1, "positions": [[0,0,0],[1,1,1]], "drift_direction": 2}
        ]}]}"#;
        assert!(matches!(
            EventFile::from_json(json),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            EventFile::from_json("{\"events\": 3}"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_event_file_round_trip_on_disk() {
        let original = EventFile::from_json(EVENTS).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_event_file(file.path(), &original).unwrap();
        let read = read_event_file(file.path()).unwrap();
        assert_eq!(read, original);
    }

    #[test]
    fn test_read_partial_config() {
        let file = temp_file(r#"{"distance_limit": 40.0, "dca_shape": "box"}"#);
        let config = read_config(file.path()).unwrap();
        assert_relative_eq!(config.distance_limit, 40.0);
        assert_eq!(config.dca_shape, DcaShape::Box);
        assert_relative_eq!(
            config.min_track_length,
            MatchConfig::default().min_track_length
        );
    }

    #[test]
    fn test_read_invalid_config() {
        let file = temp_file(r#"{"track_direction_frac": 1.5}"#);
        assert!(matches!(
            read_config(file.path()),
            Err(Error::CoreError(CoreError::InvalidFraction(_)))
        ));
        assert!(matches!(
            read_config("/nonexistent/config.json"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_read_layout() {
        let file = temp_file(
            r#"{"tpcs": [
                {"id": 0, "min": [-100, -50, -50], "max": [0, 50, 50], "drift_direction": -1},
                {"id": 1, "min": [0, -50, -50], "max": [100, 50, 50], "drift_direction": 1}
            ]}"#,
        );
        let layout = read_layout(file.path()).unwrap();
        assert_eq!(layout.tpcs().len(), 2);

        let inverted = temp_file(
            r#"{"tpcs": [{"id": 0, "min": [1, 0, 0], "max": [0, 1, 1], "drift_direction": 1}]}"#,
        );
        assert!(matches!(
            read_layout(inverted.path()),
            Err(Error::InvalidFormat(_))
        ));
        let empty = temp_file(r#"{"tpcs": []}"#);
        assert!(read_layout(empty.path()).is_err());
    }

    #[test]
    fn test_read_distortion() {
        let file = temp_file(
            r#"{"offsets": [
                {"volume": 0, "offset": [1.5, 0, -2]},
                {"volume": 3, "offset": [0, 0.25, 0]}
            ]}"#,
        );
        let sce = read_distortion(file.path()).unwrap();
        assert!(sce.enabled());
        let first = sce.offset_at(DVec3::ZERO, VolumeId(0));
        assert_relative_eq!(first.x, 1.5);
        assert_relative_eq!(first.z, -2.0);
        assert_relative_eq!(sce.offset_at(DVec3::ZERO, VolumeId(3)).y, 0.25);
        assert_eq!(sce.offset_at(DVec3::ZERO, VolumeId(1)), DVec3::ZERO);

        let twice = temp_file(
            r#"{"offsets": [
                {"volume": 2, "offset": [1, 0, 0]},
                {"volume": 2, "offset": [0, 1, 0]}
            ]}"#,
        );
        assert!(matches!(
            read_distortion(twice.path()),
            Err(Error::InvalidFormat(_))
        ));
    }
}
