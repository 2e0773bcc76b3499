//! Asynchronous writer over a tokio [`AsyncWrite`] sink.
//!
//! Validation and emission are synchronous and shared with
//! [`ODataWriter`](crate::ODataWriter); only draining the buffer awaits.

use crate::error::WriterResult;
use crate::machine::{SharedMetadata, StreamKind, WriterCore};
use crate::scope::ScopeKind;
use odelta_codec::Value;
use odelta_model::{
    DeltaDeletedLink, DeltaLink, EntityReferenceLink, Item, Property, WriterSettings,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

/// Writes one payload into an async sink.
#[derive(Debug)]
pub struct AsyncODataWriter<W: AsyncWrite + Unpin> {
    sink: W,
    core: WriterCore,
}

impl<W: AsyncWrite + Unpin> AsyncODataWriter<W> {
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

    /// Opens a scope.
    pub async fn begin(&mut self, item: impl Into<Item>) -> WriterResult<()> {
        self.core.begin(item.into())?;
        self.flush_if_needed().await
    }

    /// Closes the innermost scope.
    pub async fn end(&mut self) -> WriterResult<()> {
        self.core.end()?;
        self.flush_if_needed().await
    }

    /// Writes an inline property.
    pub async fn write_property(&mut self, property: &Property) -> WriterResult<()> {
        self.core.write_property(property)?;
        self.flush_if_needed().await
    }

    /// Writes an added link.
    pub async fn write_link(&mut self, link: &DeltaLink) -> WriterResult<()> {
        self.core.write_link(link)?;
        self.flush_if_needed().await
    }

    /// Writes a removed link.
    pub async fn write_deleted_link(&mut self, link: &DeltaDeletedLink) -> WriterResult<()> {
        self.core.write_deleted_link(link)?;
        self.flush_if_needed().await
    }

    /// Binds an entity to the open navigation property.
    pub async fn write_entity_reference_link(&mut self, link: &EntityReferenceLink) -> WriterResult<()> {
        self.core.write_entity_reference_link(link)?;
        self.flush_if_needed().await
    }

    /// Writes the value of the open property scope.
    pub async fn write_property_value(&mut self, value: &Value) -> WriterResult<()> {
        self.core.write_property_value(value)?;
        self.flush_if_needed().await
    }

    /// Opens a binary stream for the open property scope.
    pub fn create_stream(&mut self) -> WriterResult<AsyncStream<'_, W>> {
        self.core.open_stream(StreamKind::Binary)?;
        Ok(AsyncStream::new(self))
    }

    /// Opens a text stream for the open property scope.
    pub fn create_text_writer(&mut self) -> WriterResult<AsyncStream<'_, W>> {
        self.core.open_stream(StreamKind::Text)?;
        Ok(AsyncStream::new(self))
    }

    /// Drains buffered output and flushes the sink.
    pub async fn flush(&mut self) -> WriterResult<()> {
        self.drain().await?;
        self.sink.flush().await?;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub async fn into_inner(mut self) -> WriterResult<W> {
        self.flush().await?;
        Ok(self.sink)
    }

    async fn flush_if_needed(&mut self) -> WriterResult<()> {
        if self.core.is_completed() {
            self.flush().await
        } else if self.core.buffered_len() >= self.core.settings().buffer_size {
            self.drain().await
        } else {
            Ok(())
        }
    }

    async fn drain(&mut self) -> WriterResult<()> {
        let bytes = self.core.take_output();
        if !bytes.is_empty() {
            self.sink.write_all(&bytes).await?;
            trace!(bytes = bytes.len(), "drained to async sink");
        }
        Ok(())
    }
}

/// A streamed property value on an [`AsyncODataWriter`].
///
/// Binary streams accept [`AsyncStream::write_bytes`], text streams accept
/// [`AsyncStream::write_text`].
pub struct AsyncStream<'a, W: AsyncWrite + Unpin> {
    writer: &'a mut AsyncODataWriter<W>,
    finished: bool,
}

impl<'a, W: AsyncWrite + Unpin> AsyncStream<'a, W> {
    fn new(writer: &'a mut AsyncODataWriter<W>) -> Self {
        Self {
            writer,
            finished: false,
        }
    }

    /// Appends bytes to a binary stream.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> WriterResult<()> {
        self.writer.core.write_stream_bytes(bytes)?;
        self.writer.flush_if_needed().await
    }

    /// Appends text to a text stream.
    pub async fn write_text(&mut self, text: &str) -> WriterResult<()> {
        self.writer.core.write_stream_text(text)?;
        self.writer.flush_if_needed().await
    }

    /// Closes the value.
    pub async fn finish(mut self) -> WriterResult<()> {
        self.finished = true;
        self.writer.core.close_stream()?;
        self.writer.flush_if_needed().await
    }
}

impl<W: AsyncWrite + Unpin> Drop for AsyncStream<'_, W> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("async stream dropped without finish");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odelta_model::{
        DeletedReason, DeletedResource, Dialect, PropertyInfo, Resource, ResourceSet,
        SerializationInfo,
    };

    #[tokio::test]
    async fn async_delta_payload() {
        let settings = WriterSettings::new()
            .dialect(Dialect::V401)
            .service_root("http://host/service");
        let mut writer = AsyncODataWriter::new(Vec::new(), settings);
        let set = ResourceSet::new()
            .with_serialization_info(SerializationInfo::entity_set("Orders", "NS.Order"))
            .with_delta_link("Orders?$deltatoken=1")
            .unwrap();
        writer.begin(Item::DeltaResourceSet(set)).await.unwrap();
        writer
            .begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Orders(1)"))
            .await
            .unwrap();
        writer.end().await.unwrap();
        writer
            .write_link(&DeltaLink::new("Orders(2)", "Customer", "Customers('A')"))
            .await
            .unwrap();
        writer.end().await.unwrap();
        assert!(writer.is_completed());

        let bytes = writer.into_inner().await.unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"@context":"http://host/service/$metadata#Orders/$delta","@deltaLink":"Orders?$deltatoken=1","value":[{"@removed":{"reason":"deleted"},"@id":"Orders(1)"},{"@context":"http://host/service/$metadata#Orders/$link","source":"Orders(2)","relationship":"Customer","target":"Customers('A')"}]}"#
        );
    }

    #[tokio::test]
    async fn async_binary_stream() {
        let mut writer = AsyncODataWriter::new(Vec::new(), WriterSettings::new());
        writer.begin(Resource::new()).await.unwrap();
        writer.begin(PropertyInfo::new("Photo")).await.unwrap();
        let mut stream = writer.create_stream().unwrap();
        stream.write_bytes(b"he").await.unwrap();
        stream.write_bytes(b"llo").await.unwrap();
        stream.finish().await.unwrap();
        writer.end().await.unwrap();
        writer.end().await.unwrap();
        let bytes = writer.into_inner().await.unwrap();
        assert_eq!(bytes, br#"{"Photo":"aGVsbG8="}"#);
    }

    #[tokio::test]
    async fn text_into_binary_stream_fails() {
        let mut writer = AsyncODataWriter::new(Vec::new(), WriterSettings::new());
        writer.begin(Resource::new()).await.unwrap();
        writer.begin(PropertyInfo::new("Photo")).await.unwrap();
        let mut stream = writer.create_stream().unwrap();
        assert_eq!(stream.write_text("x").await.unwrap_err().identifier(), "codec");
        stream.finish().await.unwrap();
    }
}
