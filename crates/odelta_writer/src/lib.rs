//! # odelta Writer
//!
//! Version-aware payload writer for odelta.
//!
//! This crate provides:
//! - [`WriterCore`], the scope-stack state machine that validates every
//!   call and emits JSON into an in-memory buffer
//! - [`ODataWriter`], a blocking shim over any [`std::io::Write`]
//! - [`AsyncODataWriter`], a tokio shim over any `AsyncWrite`
//! - Stream guards for binary and text property values
//!
//! Both shims share the same core, so a payload written through either is
//! byte-for-byte identical. Every error is returned from the offending call
//! with nothing emitted and the scope stack untouched.
//!
//! ## Example
//!
//! ```rust
//! use odelta_model::{Dialect, Item, Resource, ResourceSet, SerializationInfo, WriterSettings};
//! use odelta_writer::ODataWriter;
//!
//! let settings = WriterSettings::new()
//!     .dialect(Dialect::V4)
//!     .service_root("http://host/service/");
//! let mut writer = ODataWriter::new(Vec::new(), settings);
//!
//! let set = ResourceSet::new()
//!     .with_serialization_info(SerializationInfo::entity_set("Orders", "NS.Order"));
//! writer.begin(Item::ResourceSet(set)).unwrap();
//! writer.begin(Resource::new().with_property("Id", 1i64)).unwrap();
//! writer.end().unwrap();
//! writer.end().unwrap();
//!
//! let json = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(
//!     json,
//!     r#"{"@odata.context":"http://host/service/$metadata#Orders","value":[{"Id":1}]}"#
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod async_writer;
mod error;
mod identity;
mod machine;
mod scope;
mod stream;
mod writer;

pub use async_writer::{AsyncODataWriter, AsyncStream};
pub use error::{ErrorCategory, QueryAnnotation, WriterError, WriterResult};
pub use identity::derive_identity;
pub use machine::{SharedMetadata, StreamKind, WriterCore};
pub use scope::ScopeKind;
pub use stream::{BinaryStream, TextWriter};
pub use writer::ODataWriter;
