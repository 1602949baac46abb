//! Plain text output: one integer per line

use super::ResultSink;
use std::io::{self, Write};

/// Writes each value on its own line and flushes immediately
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ResultSink for TextSink<W> {
    fn emit(&mut self, _x: u64, value: i64) -> io::Result<()> {
        writeln!(self.writer, "{}", value)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_value_per_line() {
        let mut buf = Vec::new();
        {
            let mut sink = TextSink::new(&mut buf);
            for (x, v) in [(0, 1), (1, 6), (2, 17)] {
                sink.emit(x, v).unwrap();
            }
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n6\n17\n");
    }

    #[test]
    fn test_negative_values() {
        let mut buf = Vec::new();
        TextSink::new(&mut buf).emit(0, -12).unwrap();
        assert_eq!(buf, b"-12\n");
    }
}
