//! Operation bodies.

use crate::error::BatchResult;
use crate::framer::BatchWriter;
use odelta_model::WriterSettings;
use odelta_writer::{ODataWriter, SharedMetadata};
use std::io::{self, Write};
use tracing::warn;

/// The body of one batch operation.
///
/// Bytes written here go straight into the batch. Call
/// [`OperationBody::finish`] before starting the next part.
pub struct OperationBody<'a, W: Write> {
    batch: &'a mut BatchWriter<W>,
    finished: bool,
}

impl<'a, W: Write> OperationBody<'a, W> {
    pub(crate) fn new(batch: &'a mut BatchWriter<W>) -> Self {
        Self {
            batch,
            finished: false,
        }
    }

    /// Returns a payload writer whose output becomes this body.
    pub fn payload_writer(&mut self, settings: WriterSettings) -> ODataWriter<&mut Self> {
        ODataWriter::new(self, settings)
    }

    /// Like [`OperationBody::payload_writer`], with service metadata.
    pub fn payload_writer_with_metadata(
        &mut self,
        settings: WriterSettings,
        metadata: SharedMetadata,
    ) -> ODataWriter<&mut Self> {
        ODataWriter::with_metadata(self, settings, metadata)
    }

    /// Ends the body.
    pub fn finish(mut self) -> BatchResult<()> {
        self.finished = true;
        self.batch.finish_body()
    }
}

impl<W: Write> Write for OperationBody<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.batch.sink_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.batch.sink_mut().flush()
    }
}

impl<W: Write> Drop for OperationBody<'_, W> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("operation body dropped without finish");
        }
    }
}
