//! The batch and changeset framer.
//!
//! [`BatchWriter`] writes a multipart batch with CRLF line endings:
//!
//! ```text
//! --batch_<token>
//! Content-Type: multipart/mixed; boundary=changeset_<token>
//!
//! --changeset_<token>
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//! Content-ID: 1
//!
//! POST http://host/service/Customers HTTP/1.1
//! Content-Type: application/json
//!
//! {"Name":"x"}
//! --changeset_<token>--
//! --batch_<token>--
//! ```
//!
//! Every call is validated before anything is written.

use crate::body::OperationBody;
use crate::config::BatchSettings;
use crate::error::{BatchError, BatchResult, Quota};
use crate::message::{
    content_id_reference, parse_base, reason_phrase, request_target, HttpMethod, UriOption,
};
use odelta_model::Direction;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// State of the batch framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchState {
    /// Nothing written yet.
    Start,
    /// The batch is open.
    BatchStarted,
    /// A changeset was just opened.
    ChangesetStarted,
    /// An operation's head was written; headers may still be added.
    OperationCreated,
    /// An operation body is being written.
    OperationStreamRequested,
    /// An operation body was finished.
    OperationStreamDisposed,
    /// A changeset was closed.
    ChangesetCompleted,
    /// The batch was closed.
    BatchCompleted,
}

impl BatchState {
    /// Returns the state name.
    pub const fn as_str(self) -> &'static str {
        match self {
            BatchState::Start => "Start",
            BatchState::BatchStarted => "BatchStarted",
            BatchState::ChangesetStarted => "ChangesetStarted",
            BatchState::OperationCreated => "OperationCreated",
            BatchState::OperationStreamRequested => "OperationStreamRequested",
            BatchState::OperationStreamDisposed => "OperationStreamDisposed",
            BatchState::ChangesetCompleted => "ChangesetCompleted",
            BatchState::BatchCompleted => "BatchCompleted",
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct ChangesetFrame {
    boundary: String,
    ordinal: usize,
    operations: usize,
}

/// Writes a multipart batch into a blocking sink.
#[derive(Debug)]
pub struct BatchWriter<W: Write> {
    sink: W,
    settings: BatchSettings,
    state: BatchState,
    base: Option<Url>,
    batch_boundary: String,
    changeset: Option<ChangesetFrame>,
    changesets_opened: usize,
    /// Content id to the ordinal of the changeset that owns it.
    content_ids: HashMap<String, Option<usize>>,
    parts: usize,
    /// Headers of the last operation, written when its body starts.
    pending_headers: Option<Vec<(String, String)>>,
}

impl<W: Write> BatchWriter<W> {
    /// Creates a framer over `sink`.
    pub fn new(sink: W, settings: BatchSettings) -> Self {
        let batch_boundary = format!("batch_{}", boundary_token(&settings));
        Self {
            sink,
            settings,
            state: BatchState::Start,
            base: None,
            batch_boundary,
            changeset: None,
            changesets_opened: 0,
            content_ids: HashMap::new(),
            parts: 0,
            pending_headers: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// The session settings.
    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// The batch boundary, such as `batch_<token>`.
    pub fn batch_boundary(&self) -> &str {
        &self.batch_boundary
    }

    /// The `Content-Type` of the whole batch message.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.batch_boundary)
    }

    /// Opens the batch.
    ///
    /// # Errors
    ///
    /// Returns an error unless the framer is in its initial state, or if
    /// the configured base URI cannot be parsed.
    pub fn begin_batch(&mut self) -> BatchResult<()> {
        if self.state != BatchState::Start {
            return Err(self.invalid_transition(BatchState::BatchStarted));
        }
        self.base = self.settings.base_uri.as_deref().map(parse_base).transpose()?;
        self.state = BatchState::BatchStarted;
        debug!(boundary = %self.batch_boundary, direction = %self.settings.direction, "batch started");
        Ok(())
    }

    /// Opens a changeset.
    ///
    /// # Errors
    ///
    /// Returns an error if a changeset is already open, if an operation
    /// body is unfinished, or if the batch has no room for another part.
    pub fn begin_changeset(&mut self) -> BatchResult<()> {
        self.check_open(BatchState::ChangesetStarted)?;
        if self.changeset.is_some() {
            return Err(BatchError::ChangesetAlreadyOpen);
        }
        self.check_part_quota()?;

        self.close_pending_operation()?;
        let boundary = format!("changeset_{}", boundary_token(&self.settings));
        write!(
            self.sink,
            "--{}\r\nContent-Type: multipart/mixed; boundary={boundary}\r\n\r\n",
            self.batch_boundary
        )?;
        self.parts += 1;
        self.changesets_opened += 1;
        debug!(boundary = %boundary, "changeset started");
        self.changeset = Some(ChangesetFrame {
            boundary,
            ordinal: self.changesets_opened,
            operations: 0,
        });
        self.state = BatchState::ChangesetStarted;
        Ok(())
    }

    /// Closes the open changeset.
    ///
    /// # Errors
    ///
    /// Returns an error if no changeset is open or an operation body is
    /// unfinished.
    pub fn end_changeset(&mut self) -> BatchResult<()> {
        if self.state == BatchState::OperationStreamRequested {
            return Err(BatchError::OperationStreamNotDisposed);
        }
        if self.changeset.is_none() {
            return Err(BatchError::NoOpenChangeset);
        }
        self.close_pending_operation()?;
        if let Some(changeset) = self.changeset.take() {
            write!(self.sink, "--{}--\r\n", changeset.boundary)?;
            debug!(operations = changeset.operations, "changeset completed");
        }
        self.state = BatchState::ChangesetCompleted;
        Ok(())
    }

    /// Starts a request operation and returns its content id.
    ///
    /// Operations inside a changeset always get a content id: the given
    /// one, or the lowest free integer. `depends_on` ids, and a `$id`
    /// prefix of `url`, must name earlier operations; inside a changeset
    /// they must belong to the same changeset.
    ///
    /// # Errors
    ///
    /// Returns an error in a response batch, for a GET inside a changeset,
    /// for a duplicate content id, for an unresolved or cross-changeset
    /// dependency, when a quota is reached, or when the previous body is
    /// unfinished.
    pub fn create_operation_request_message(
        &mut self,
        method: HttpMethod,
        url: &str,
        content_id: Option<&str>,
        uri_option: UriOption,
        depends_on: &[&str],
    ) -> BatchResult<Option<String>> {
        self.check_open(BatchState::OperationCreated)?;
        if self.settings.direction != Direction::Request {
            return Err(BatchError::WrongDirection {
                direction: self.settings.direction,
            });
        }
        if self.changeset.is_some() && method == HttpMethod::Get {
            return Err(BatchError::GetInChangeset);
        }
        self.check_operation_quota()?;
        let content_id = self.assign_content_id(content_id)?;
        for id in depends_on {
            self.check_dependency(id).map_err(|err| {
                err.unwrap_or_else(|| BatchError::UnknownDependency { id: (*id).to_string() })
            })?;
        }
        if let Some(reference) = content_id_reference(url) {
            self.check_dependency(reference).map_err(|err| {
                err.unwrap_or_else(|| BatchError::UnresolvedContentIdReference {
                    reference: reference.to_string(),
                })
            })?;
        }
        let target = request_target(url, self.base.as_ref(), uri_option)?;

        self.close_pending_operation()?;
        self.write_part_head(content_id.as_deref())?;
        write!(self.sink, "{method} {} HTTP/1.1\r\n", target.target)?;
        if let Some(host) = &target.host {
            write!(self.sink, "Host: {host}\r\n")?;
        }
        self.register_operation(content_id.clone());
        debug!(%method, url, content_id = ?content_id, "request operation");
        Ok(content_id)
    }

    /// Starts a response operation.
    ///
    /// # Errors
    ///
    /// Returns an error in a request batch, for a duplicate content id,
    /// when a quota is reached, or when the previous body is unfinished.
    pub fn create_operation_response_message(
        &mut self,
        status: u16,
        content_id: Option<&str>,
    ) -> BatchResult<Option<String>> {
        self.check_open(BatchState::OperationCreated)?;
        if self.settings.direction != Direction::Response {
            return Err(BatchError::WrongDirection {
                direction: self.settings.direction,
            });
        }
        self.check_operation_quota()?;
        let content_id = self.assign_content_id(content_id)?;

        self.close_pending_operation()?;
        self.write_part_head(content_id.as_deref())?;
        let reason = reason_phrase(status);
        if reason.is_empty() {
            write!(self.sink, "HTTP/1.1 {status}\r\n")?;
        } else {
            write!(self.sink, "HTTP/1.1 {status} {reason}\r\n")?;
        }
        self.register_operation(content_id.clone());
        debug!(status, content_id = ?content_id, "response operation");
        Ok(content_id)
    }

    /// Adds a header to the operation just created.
    ///
    /// # Errors
    ///
    /// Returns an error unless an operation was created and its body has
    /// not started.
    pub fn set_operation_header(&mut self, name: &str, value: &str) -> BatchResult<()> {
        if self.state != BatchState::OperationCreated {
            return Err(self.invalid_transition(BatchState::OperationCreated));
        }
        if let Some(headers) = &mut self.pending_headers {
            headers.push((name.to_string(), value.to_string()));
        }
        Ok(())
    }

    /// Starts the body of the operation just created.
    ///
    /// # Errors
    ///
    /// Returns an error unless an operation was created and its body has
    /// not started.
    pub fn operation_body(&mut self) -> BatchResult<OperationBody<'_, W>> {
        if self.state != BatchState::OperationCreated {
            return Err(self.invalid_transition(BatchState::OperationStreamRequested));
        }
        self.close_pending_operation()?;
        self.state = BatchState::OperationStreamRequested;
        Ok(OperationBody::new(self))
    }

    /// Closes the batch and flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if a changeset is open, an operation body is
    /// unfinished, or the batch is not open.
    pub fn end_batch(&mut self) -> BatchResult<()> {
        match self.state {
            BatchState::OperationStreamRequested => return Err(BatchError::OperationStreamNotDisposed),
            BatchState::Start | BatchState::BatchCompleted => {
                return Err(self.invalid_transition(BatchState::BatchCompleted))
            }
            _ => {}
        }
        if self.changeset.is_some() {
            return Err(BatchError::BatchEndedWithOpenChangeset);
        }
        self.close_pending_operation()?;
        write!(self.sink, "--{}--\r\n", self.batch_boundary)?;
        self.sink.flush()?;
        self.state = BatchState::BatchCompleted;
        debug!(parts = self.parts, "batch completed");
        Ok(())
    }

    /// Flushes the sink.
    pub fn flush(&mut self) -> BatchResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    pub(crate) fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub(crate) fn finish_body(&mut self) -> BatchResult<()> {
        self.sink.write_all(b"\r\n")?;
        self.state = BatchState::OperationStreamDisposed;
        Ok(())
    }

    fn invalid_transition(&self, to: BatchState) -> BatchError {
        BatchError::InvalidTransition {
            from: self.state,
            to,
        }
    }

    /// Parts may only be added to an open batch with no unfinished body.
    fn check_open(&self, to: BatchState) -> BatchResult<()> {
        match self.state {
            BatchState::Start | BatchState::BatchCompleted => Err(self.invalid_transition(to)),
            BatchState::OperationStreamRequested => Err(BatchError::OperationStreamNotDisposed),
            _ => Ok(()),
        }
    }

    fn check_part_quota(&self) -> BatchResult<()> {
        if self.parts >= self.settings.max_parts_per_batch {
            return Err(BatchError::QuotaExceeded {
                quota: Quota::PartsPerBatch,
                limit: self.settings.max_parts_per_batch,
            });
        }
        Ok(())
    }

    fn check_operation_quota(&self) -> BatchResult<()> {
        match &self.changeset {
            Some(changeset) if changeset.operations >= self.settings.max_operations_per_changeset => {
                Err(BatchError::QuotaExceeded {
                    quota: Quota::OperationsPerChangeset,
                    limit: self.settings.max_operations_per_changeset,
                })
            }
            Some(_) => Ok(()),
            None => self.check_part_quota(),
        }
    }

    fn assign_content_id(&self, requested: Option<&str>) -> BatchResult<Option<String>> {
        match requested {
            Some(id) if self.content_ids.contains_key(id) => {
                Err(BatchError::DuplicateContentId { id: id.to_string() })
            }
            Some(id) => Ok(Some(id.to_string())),
            None if self.changeset.is_some() => Ok(Some(self.next_free_content_id())),
            None => Ok(None),
        }
    }

    fn next_free_content_id(&self) -> String {
        let mut n: u64 = 1;
        loop {
            let id = n.to_string();
            if !self.content_ids.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// `Err(None)` when `id` is unknown; the caller picks the error.
    fn check_dependency(&self, id: &str) -> Result<(), Option<BatchError>> {
        let current = self.changeset.as_ref().map(|c| c.ordinal);
        match self.content_ids.get(id) {
            None => Err(None),
            Some(owner) if current.is_some() && *owner != current => {
                Err(Some(BatchError::CrossChangesetDependency { id: id.to_string() }))
            }
            Some(_) => Ok(()),
        }
    }

    fn write_part_head(&mut self, content_id: Option<&str>) -> BatchResult<()> {
        let boundary = match &self.changeset {
            Some(changeset) => &changeset.boundary,
            None => &self.batch_boundary,
        };
        write!(
            self.sink,
            "--{boundary}\r\nContent-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n"
        )?;
        if let Some(id) = content_id {
            write!(self.sink, "Content-ID: {id}\r\n")?;
        }
        self.sink.write_all(b"\r\n")?;
        Ok(())
    }

    fn register_operation(&mut self, content_id: Option<String>) {
        let owner = self.changeset.as_ref().map(|c| c.ordinal);
        if let Some(id) = content_id {
            self.content_ids.insert(id, owner);
        }
        match &mut self.changeset {
            Some(changeset) => changeset.operations += 1,
            None => self.parts += 1,
        }
        self.pending_headers = Some(Vec::new());
        self.state = BatchState::OperationCreated;
    }

    /// Writes the headers of an operation that has not started a body.
    fn close_pending_operation(&mut self) -> BatchResult<()> {
        if let Some(headers) = self.pending_headers.take() {
            for (name, value) in headers {
                write!(self.sink, "{name}: {value}\r\n")?;
            }
            self.sink.write_all(b"\r\n")?;
        }
        Ok(())
    }
}

fn boundary_token(settings: &BatchSettings) -> String {
    settings
        .boundary_token
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
