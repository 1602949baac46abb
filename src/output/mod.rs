//! Result output
//!
//! The coordinator emits one value per round through a [`ResultSink`] as soon
//! as the round completes, so a failing run never prints values past the
//! round that failed.

pub mod json;
pub mod text;

use crate::config::OutputFormat;
use std::io::{self, Write};

/// Destination of per-round results
pub trait ResultSink {
    /// Emit p(x)
    fn emit(&mut self, x: u64, value: i64) -> io::Result<()>;
}

/// Collects results in memory
impl ResultSink for Vec<(u64, i64)> {
    fn emit(&mut self, x: u64, value: i64) -> io::Result<()> {
        self.push((x, value));
        Ok(())
    }
}

/// Build the sink for the configured output format
pub fn sink_for<'a, W: Write + 'a>(format: OutputFormat, writer: W) -> Box<dyn ResultSink + 'a> {
    match format {
        OutputFormat::Text => Box::new(text::TextSink::new(writer)),
        OutputFormat::Json => Box::new(json::JsonSink::new(writer)),
    }
}
