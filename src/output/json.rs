//! JSON lines output
//!
//! Each round becomes one compact JSON object on its own line:
//!
//! ```text
//! {"x":0,"value":1}
//! {"x":1,"value":6}
//! ```

use super::ResultSink;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// One evaluated point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub x: u64,
    pub value: i64,
}

/// Writes a [`RoundRecord`] per line and flushes immediately
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn emit(&mut self, x: u64, value: i64) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &RoundRecord { x, value })?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
