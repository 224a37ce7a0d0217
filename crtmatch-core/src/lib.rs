//! crtmatch-core: Core types and traits for CRT t0 matching.
//!
//! This crate provides the data model shared by the matching algorithms:
//! CRT hits, TPC tracks, match candidates, the matching configuration and
//! the detector service traits the matcher is parameterised over.
//!

pub mod candidate;
pub mod config;
pub mod error;
pub mod hit;
pub mod services;
pub mod track;

pub use candidate::{MatchCandidate, TimeWindow, NO_MATCH, NO_MATCH_PAIR};
pub use config::{DcaShape, DirectionMethod, MatchConfig, SelectionPolicy};
pub use error::{Error, Result};
pub use hit::{ClockDomain, TaggerHit};
pub use services::{
    ConstantDriftVelocity, DetectorServices, DistortionCorrection, DriftGeometry,
    DriftVelocityProvider, FixedDrift, NoDistortion, UniformDistortion, VolumeId, VolumeLookup,
};
pub use track::{Track, TrajectoryPoint};

// Re-export the vector type used throughout the public API
pub use glam::DVec3;
