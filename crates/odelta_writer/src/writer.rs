//! Synchronous writer over an [`io::Write`] sink.

use crate::error::WriterResult;
use crate::machine::{SharedMetadata, StreamKind, WriterCore};
use crate::scope::ScopeKind;
use crate::stream::{BinaryStream, TextWriter};
use odelta_codec::Value;
use odelta_model::{
    DeltaDeletedLink, DeltaLink, EntityReferenceLink, Item, Property, WriterSettings,
};
use std::io::Write;
use tracing::trace;

/// Writes one payload into a blocking sink.
///
/// Output is buffered by the core and drained whenever the buffer reaches
/// [`WriterSettings::buffer_size`], when the payload completes, and on
/// [`ODataWriter::flush`].
///
/// # Example
///
/// ```rust
/// use odelta_model::{Dialect, Item, Resource, WriterSettings};
/// use odelta_writer::ODataWriter;
///
/// let settings = WriterSettings::new().dialect(Dialect::V401);
/// let mut writer = ODataWriter::new(Vec::new(), settings);
/// writer.begin(Resource::new().with_id("Orders(1)")).unwrap();
/// writer.end().unwrap();
/// assert_eq!(writer.into_inner().unwrap(), br#"{"@id":"Orders(1)"}"#);
/// ```
#[derive(Debug)]
pub struct ODataWriter<W: Write> {
    sink: W,
    core: WriterCore,
}

impl<W: Write> ODataWriter<W> {
    /// Creates a writer with no service metadata.
    pub fn new(sink: W, settings: WriterSettings) -> Self {
        Self {
            sink,
            core: WriterCore::new(settings),
        }
    }

    /// Creates a writer backed by service metadata.
    pub fn with_metadata(sink: W, settings: WriterSettings, metadata: SharedMetadata) -> Self {
        Self {
            sink,
            core: WriterCore::with_metadata(settings, metadata),
        }
    }

    /// The session settings.
    pub fn settings(&self) -> &WriterSettings {
        self.core.settings()
    }

    /// The kind of the innermost scope.
    pub fn state(&self) -> ScopeKind {
        self.core.state()
    }

    /// Whether the payload is complete.
    pub fn is_completed(&self) -> bool {
        self.core.is_completed()
    }

    /// Opens a scope. See [`WriterCore::begin`].
    pub fn begin(&mut self, item: impl Into<Item>) -> WriterResult<()> {
        self.core.begin(item.into())?;
        self.flush_if_needed()
    }

    /// Closes the innermost scope. See [`WriterCore::end`].
    pub fn end(&mut self) -> WriterResult<()> {
        self.core.end()?;
        self.flush_if_needed()
    }

    /// Writes an inline property. See [`WriterCore::write_property`].
    pub fn write_property(&mut self, property: &Property) -> WriterResult<()> {
        self.core.write_property(property)?;
        self.flush_if_needed()
    }

    /// Writes an added link. See [`WriterCore::write_link`].
    pub fn write_link(&mut self, link: &DeltaLink) -> WriterResult<()> {
        self.core.write_link(link)?;
        self.flush_if_needed()
    }

    /// Writes a removed link. See [`WriterCore::write_deleted_link`].
    pub fn write_deleted_link(&mut self, link: &DeltaDeletedLink) -> WriterResult<()> {
        self.core.write_deleted_link(link)?;
        self.flush_if_needed()
    }

    /// Binds an entity. See [`WriterCore::write_entity_reference_link`].
    pub fn write_entity_reference_link(&mut self, link: &EntityReferenceLink) -> WriterResult<()> {
        self.core.write_entity_reference_link(link)?;
        self.flush_if_needed()
    }

    /// Writes the value of the open property scope.
    pub fn write_property_value(&mut self, value: &Value) -> WriterResult<()> {
        self.core.write_property_value(value)?;
        self.flush_if_needed()
    }

    /// Opens a binary stream for the open property scope.
    ///
    /// The stream must be finished before the property scope is ended.
    pub fn create_stream(&mut self) -> WriterResult<BinaryStream<'_, W>> {
        self.core.open_stream(StreamKind::Binary)?;
        Ok(BinaryStream::new(self))
    }

    /// Opens a text stream for the open property scope.
    pub fn create_text_writer(&mut self) -> WriterResult<TextWriter<'_, W>> {
        self.core.open_stream(StreamKind::Text)?;
        Ok(TextWriter::new(self))
    }

    /// Drains buffered output and flushes the sink.
    pub fn flush(&mut self) -> WriterResult<()> {
        self.drain()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub fn into_inner(mut self) -> WriterResult<W> {
        self.flush()?;
        Ok(self.sink)
    }

    pub(crate) fn core_mut(&mut self) -> &mut WriterCore {
        &mut self.core
    }

    pub(crate) fn flush_if_needed(&mut self) -> WriterResult<()> {
        if self.core.is_completed() {
            self.flush()
        } else if self.core.buffered_len() >= self.core.settings().buffer_size {
            self.drain()
        } else {
            Ok(())
        }
    }

    fn drain(&mut self) -> WriterResult<()> {
        let bytes = self.core.take_output();
        if !bytes.is_empty() {
            self.sink.write_all(&bytes)?;
            trace!(bytes = bytes.len(), "drained to sink");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;
    use odelta_model::{Dialect, Direction, PropertyInfo, Resource, ResourceSet};
    use std::io;

    fn text(writer: ODataWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn small_buffer_drains_eagerly() {
        let settings = WriterSettings::new().buffer_size(4);
        let mut writer = ODataWriter::new(Vec::new(), settings);
        writer.begin(Item::ResourceSet(ResourceSet::new())).unwrap();
        writer.begin(Resource::new().with_property("Id", 1i64)).unwrap();
        assert!(writer.core.buffered_len() < 4);
        writer.end().unwrap();
        writer.end().unwrap();
        assert_eq!(text(writer), r#"{"value":[{"Id":1}]}"#);
    }

    #[test]
    fn binary_stream_guard() {
        let mut writer = ODataWriter::new(Vec::new(), WriterSettings::new());
        writer.begin(Resource::new()).unwrap();
        writer.begin(PropertyInfo::new("Photo")).unwrap();
        {
            let mut stream = writer.create_stream().unwrap();
            io::Write::write_all(&mut stream, b"hello").unwrap();
            stream.finish().unwrap();
        }
        writer.end().unwrap();
        writer.end().unwrap();
        assert_eq!(text(writer), r#"{"Photo":"aGVsbG8="}"#);
    }

    #[test]
    fn text_writer_guard() {
        use std::fmt::Write as _;
        let mut writer = ODataWriter::new(Vec::new(), WriterSettings::new());
        writer.begin(Resource::new()).unwrap();
        writer.begin(PropertyInfo::new("Notes")).unwrap();
        {
            let mut notes = writer.create_text_writer().unwrap();
            write!(notes, "line {}", 1).unwrap();
            notes.write_text("\tend").unwrap();
            notes.finish().unwrap();
        }
        writer.end().unwrap();
        writer.end().unwrap();
        assert_eq!(text(writer), r#"{"Notes":"line 1\tend"}"#);
    }

    #[test]
    fn unfinished_stream_blocks_end() {
        let mut writer = ODataWriter::new(Vec::new(), WriterSettings::new());
        writer.begin(Resource::new()).unwrap();
        writer.begin(PropertyInfo::new("Photo")).unwrap();
        drop(writer.create_stream().unwrap());
        assert!(matches!(
            writer.end(),
            Err(WriterError::StreamNotDisposed { .. })
        ));
        assert!(matches!(
            writer.write_property_value(&Value::Null),
            Err(WriterError::StreamNotDisposed { .. })
        ));
    }

    #[test]
    fn request_rejects_count() {
        let settings = WriterSettings::new()
            .dialect(Dialect::V4)
            .direction(Direction::Request);
        let mut writer = ODataWriter::new(Vec::new(), settings);
        let err = writer
            .begin(Item::ResourceSet(ResourceSet::new().with_count(3)))
            .unwrap_err();
        assert_eq!(err.identifier(), "query_annotation_in_request");
        assert_eq!(writer.state(), ScopeKind::Start);
    }
}
