//! Writers for match results.

use crate::Result;
use crtmatch_core::MatchCandidate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column header of the CSV output.
pub const CSV_HEADER: &str = "event,track,t0,dca,extrapolation_length,hit_x,hit_y,hit_z,matched";

/// Match result of one track, flattened for output.
///
/// Unmatched tracks keep the metrics of their closest candidate, or the
/// null-candidate sentinels when no hit qualified. JSON has no encoding for
/// non-finite numbers: they are written as `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub event: u32,
    pub track: u32,
    #[serde(deserialize_with = "nullable_f64")]
    pub t0: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub dca: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub extrapolation_length: f64,
    pub hit_x: f64,
    pub hit_y: f64,
    pub hit_z: f64,
    pub matched: bool,
}

fn nullable_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl MatchRecord {
    /// Flattens `candidate` for `track` of `event`.
    #[must_use]
    pub fn new(event: u32, track: u32, candidate: &MatchCandidate, matched: bool) -> Self {
        Self {
            event,
            track,
            t0: candidate.t0,
            dca: candidate.dca,
            extrapolation_length: candidate.extrapolation_length,
            hit_x: candidate.hit.x,
            hit_y: candidate.hit.y,
            hit_z: candidate.hit.z,
            matched,
        }
    }

    /// Record for a track that had no candidate at all.
    #[must_use]
    pub fn unmatched(event: u32, track: u32) -> Self {
        Self::new(event, track, &MatchCandidate::null(), false)
    }
}

/// Output encoding of a [`MatchWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// One JSON object per line.
    JsonLines,
}

impl OutputFormat {
    /// JSON lines for `.jsonl`/`.json` paths, CSV otherwise.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "json") => Self::JsonLines,
            _ => Self::Csv,
        }
    }
}

/// Streams [`MatchRecord`]s to a file or any writer.
pub struct MatchWriter<W: Write = BufWriter<File>> {
    writer: W,
    format: OutputFormat,
    header_written: bool,
    records: usize,
}

impl MatchWriter {
    /// Creates a file writer, choosing the format from the extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = OutputFormat::from_path(&path);
        Self::create_with_format(path, format)
    }

    /// Creates a file writer with an explicit format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create_with_format<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), format))
    }
}

impl<W: Write> MatchWriter<W> {
    /// Wraps an existing writer.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            header_written: false,
            records: 0,
        }
    }

    /// Encoding in use.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Writes one record.
    ///
    /// # Errors
    /// Returns I/O or JSON encoding errors.
    pub fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        match self.format {
            OutputFormat::Csv => {
                if !self.header_written {
                    writeln!(self.writer, "{CSV_HEADER}")?;
                    self.header_written = true;
                }
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{},{},{}",
                    record.event,
                    record.track,
                    record.t0,
                    record.dca,
                    record.extrapolation_length,
                    record.hit_x,
                    record.hit_y,
                    record.hit_z,
                    u8::from(record.matched)
                )?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.records += 1;
        Ok(())
    }

    /// Writes all records in order.
    ///
    /// # Errors
    /// Returns the first write error.
    pub fn write_all(&mut self, records: &[MatchRecord]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the number of records written.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.records)
    }
}
