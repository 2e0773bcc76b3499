//! Stream guards for property values written in pieces.

use crate::error::WriterResult;
use crate::writer::ODataWriter;
use std::fmt;
use std::io;
use tracing::warn;

/// A binary property value, written as base64 as bytes arrive.
///
/// Call [`BinaryStream::finish`] before ending the property scope.
pub struct BinaryStream<'a, W: io::Write> {
    writer: &'a mut ODataWriter<W>,
    finished: bool,
}

impl<'a, W: io::Write> BinaryStream<'a, W> {
    pub(crate) fn new(writer: &'a mut ODataWriter<W>) -> Self {
        Self {
            writer,
            finished: false,
        }
    }

    /// Closes the value.
    pub fn finish(mut self) -> WriterResult<()> {
        self.finished = true;
        self.writer.core_mut().close_stream()?;
        self.writer.flush_if_needed()
    }
}

impl<W: io::Write> io::Write for BinaryStream<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer
            .core_mut()
            .write_stream_bytes(buf)
            .and_then(|()| self.writer.flush_if_needed())
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush_if_needed().map_err(io::Error::other)
    }
}

impl<W: io::Write> Drop for BinaryStream<'_, W> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("binary stream dropped without finish");
        }
    }
}

/// A text property value, written as escaped JSON text.
pub struct TextWriter<'a, W: io::Write> {
    writer: &'a mut ODataWriter<W>,
    finished: bool,
}

impl<'a, W: io::Write> TextWriter<'a, W> {
    pub(crate) fn new(writer: &'a mut ODataWriter<W>) -> Self {
        Self {
            writer,
            finished: false,
        }
    }

    /// Appends text.
    pub fn write_text(&mut self, text: &str) -> WriterResult<()> {
        self.writer.core_mut().write_stream_text(text)?;
        self.writer.flush_if_needed()
    }

    /// Closes the value.
    pub fn finish(mut self) -> WriterResult<()> {
        self.finished = true;
        self.writer.core_mut().close_stream()?;
        self.writer.flush_if_needed()
    }
}

impl<W: io::Write> fmt::Write for TextWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_text(s).map_err(|_| fmt::Error)
    }
}

impl<W: io::Write> Drop for TextWriter<'_, W> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("text writer dropped without finish");
        }
    }
}
