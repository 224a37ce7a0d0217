//! crtmatch-io: File I/O for crtmatch.
//!
//! This crate reads event files, matcher configurations, TPC layouts and
//! distortion offsets from JSON and writes per-track match results as CSV or JSON lines.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{
    read_config, read_distortion, read_event_file, read_layout, write_event_file, Event,
    EventFile, EventTrack,
};
pub use writer::{MatchRecord, MatchWriter, OutputFormat, CSV_HEADER};
