//! # odelta Batch
//!
//! Multipart batch and changeset framing for odelta.
//!
//! [`BatchWriter`] frames operations into a `multipart/mixed` batch.
//! Changesets group operations that succeed or fail together; operations
//! in a changeset always carry a `Content-ID`, and later operations of the
//! same changeset may refer to them with `$<id>` URLs.
//!
//! ```rust
//! use odelta_batch::{BatchSettings, BatchWriter, HttpMethod, UriOption};
//!
//! let settings = BatchSettings::new()
//!     .with_base_uri("http://host/service/")
//!     .with_boundary_token("b");
//! let mut batch = BatchWriter::new(Vec::new(), settings);
//! batch.begin_batch().unwrap();
//! batch
//!     .create_operation_request_message(
//!         HttpMethod::Get,
//!         "Customers",
//!         None,
//!         UriOption::AbsoluteUri,
//!         &[],
//!     )
//!     .unwrap();
//! batch.end_batch().unwrap();
//!
//! let text = String::from_utf8(batch.into_inner()).unwrap();
//! assert!(text.contains("GET http://host/service/Customers HTTP/1.1\r\n"));
//! assert!(text.ends_with("--batch_b--\r\n"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod body;
mod config;
mod error;
mod framer;
mod message;

pub use body::OperationBody;
pub use config::BatchSettings;
pub use error::{BatchError, BatchResult, Quota};
pub use framer::{BatchState, BatchWriter};
pub use message::{reason_phrase, HttpMethod, UriOption};
