//! crtmatch-algorithms: Matching of TPC tracks to CRT hits.
//!
//! This crate provides the matching pipeline:
//! - **Geometry** - point/segment/line distances and the ray-box test
//! - **Window** - admissible t0 range of a track
//! - **Direction** - endpoint-midpoint, averaged and averaged-point estimates
//! - **Matcher** - candidate gating, best-hit selection and t0 queries
//! - **Detector** - multi-TPC drift volume layout
//!
#![warn(missing_docs)]

mod detector;
mod direction;
mod drift;
mod facade;
pub mod geometry;
mod matcher;
mod window;

pub use detector::{Tpc, TpcLayout};
pub use direction::{
    averaged_directions, averaged_point_directions, endpoint_midpoint_directions,
    estimate_directions, TrackDirections,
};
pub use drift::DriftShift;
pub use matcher::{select_best, CrtT0Matcher};
pub use window::track_t0_range;

// Re-export the core types the matcher API is expressed in
pub use crtmatch_core::{
    DcaShape, DetectorServices, DirectionMethod, MatchCandidate, MatchConfig, SelectionPolicy,
    TaggerHit, TimeWindow, Track,
};
