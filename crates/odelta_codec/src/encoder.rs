//! Streaming JSON emitter.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use bytes::{BufMut, Bytes, BytesMut};

/// Encode a single value as compact JSON text.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_json_string(value: &Value) -> CodecResult<String> {
    serde_json::to_string(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Object,
    Array,
}

impl ContainerKind {
    fn name(self) -> &'static str {
        match self {
            ContainerKind::Object => "object",
            ContainerKind::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Container {
    kind: ContainerKind,
    has_members: bool,
}

/// A streaming emitter for newline-free JSON text.
///
/// The emitter tracks separators itself, so callers only say what comes
/// next (a name, a value, a container boundary). Output accumulates in an
/// in-memory buffer that the owner drains with [`JsonEmitter::take`].
#[derive(Debug, Default)]
pub struct JsonEmitter {
    buffer: BytesMut,
    containers: Vec<Container>,
    pending_name: bool,
    string_open: bool,
}

impl JsonEmitter {
    /// Create a new emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new emitter with the specified buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Open a JSON object.
    pub fn start_object(&mut self) -> CodecResult<()> {
        self.before_value()?;
        self.buffer.put_u8(b'{');
        self.containers.push(Container {
            kind: ContainerKind::Object,
            has_members: false,
        });
        Ok(())
    }

    /// Close the innermost JSON object.
    pub fn end_object(&mut self) -> CodecResult<()> {
        self.close(ContainerKind::Object)?;
        self.buffer.put_u8(b'}');
        Ok(())
    }

    /// Open a JSON array.
    pub fn start_array(&mut self) -> CodecResult<()> {
        self.before_value()?;
        self.buffer.put_u8(b'[');
        self.containers.push(Container {
            kind: ContainerKind::Array,
            has_members: false,
        });
        Ok(())
    }

    /// Close the innermost JSON array.
    pub fn end_array(&mut self) -> CodecResult<()> {
        self.close(ContainerKind::Array)?;
        self.buffer.put_u8(b']');
        Ok(())
    }

    /// Write a member name inside the current object.
    pub fn write_name(&mut self, name: &str) -> CodecResult<()> {
        self.ensure_no_open_string()?;
        if self.pending_name {
            return Err(CodecError::invalid_structure(format!(
                "name '{name}' written while a previous name has no value"
            )));
        }
        let container = match self.containers.last_mut() {
            Some(c) if c.kind == ContainerKind::Object => c,
            _ => {
                return Err(CodecError::invalid_structure(format!(
                    "name '{name}' written outside of an object"
                )))
            }
        };
        if container.has_members {
            self.buffer.put_u8(b',');
        }
        container.has_members = true;
        self.put_escaped(name)?;
        self.buffer.put_u8(b':');
        self.pending_name = true;
        Ok(())
    }

    /// Write a complete value.
    pub fn write_value(&mut self, value: &Value) -> CodecResult<()> {
        self.before_value()?;
        serde_json::to_writer((&mut self.buffer).writer(), value)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    /// Write a string value.
    pub fn write_string(&mut self, value: &str) -> CodecResult<()> {
        self.before_value()?;
        self.put_escaped(value)
    }

    /// Write a name followed by a value.
    pub fn write_member(&mut self, name: &str, value: &Value) -> CodecResult<()> {
        self.write_name(name)?;
        self.write_value(value)
    }

    /// Write a name followed by a string value.
    pub fn write_string_member(&mut self, name: &str, value: &str) -> CodecResult<()> {
        self.write_name(name)?;
        self.write_string(value)
    }

    /// Open a string value whose content is streamed in chunks.
    pub fn start_string_value(&mut self) -> CodecResult<()> {
        self.ensure_no_open_string()?;
        self.before_value()?;
        self.buffer.put_u8(b'"');
        self.string_open = true;
        Ok(())
    }

    /// Append a chunk to the open string value, escaping as needed.
    pub fn write_string_chunk(&mut self, chunk: &str) -> CodecResult<()> {
        if !self.string_open {
            return Err(CodecError::NoOpenString);
        }
        let quoted =
            serde_json::to_string(chunk).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        // Strip the surrounding quotes produced by the serializer.
        self.buffer
            .put_slice(&quoted.as_bytes()[1..quoted.len() - 1]);
        Ok(())
    }

    /// Close the open string value.
    pub fn end_string_value(&mut self) -> CodecResult<()> {
        if !self.string_open {
            return Err(CodecError::NoOpenString);
        }
        self.buffer.put_u8(b'"');
        self.string_open = false;
        Ok(())
    }

    /// Current container nesting depth.
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// Number of buffered bytes not yet taken.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get a reference to the buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Drain the buffered bytes, keeping the structural state.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    fn before_value(&mut self) -> CodecResult<()> {
        self.ensure_no_open_string()?;
        match self.containers.last_mut() {
            Some(c) if c.kind == ContainerKind::Object => {
                if !self.pending_name {
                    return Err(CodecError::invalid_structure(
                        "value written inside an object without a name",
                    ));
                }
                self.pending_name = false;
            }
            Some(c) => {
                if c.has_members {
                    self.buffer.put_u8(b',');
                }
                c.has_members = true;
            }
            None => {}
        }
        Ok(())
    }

    fn close(&mut self, kind: ContainerKind) -> CodecResult<()> {
        self.ensure_no_open_string()?;
        match self.containers.last() {
            Some(c) if c.kind == kind && !self.pending_name => {
                self.containers.pop();
                Ok(())
            }
            Some(c) if c.kind == kind => Err(CodecError::invalid_structure(
                "container closed after a name with no value",
            )),
            Some(c) => Err(CodecError::UnbalancedContainer {
                expected: kind.name(),
                found: c.kind.name(),
            }),
            None => Err(CodecError::UnbalancedContainer {
                expected: kind.name(),
                found: "nothing",
            }),
        }
    }

    fn ensure_no_open_string(&self) -> CodecResult<()> {
        if self.string_open {
            Err(CodecError::StringAlreadyOpen)
        } else {
            Ok(())
        }
    }

    fn put_escaped(&mut self, text: &str) -> CodecResult<()> {
        serde_json::to_writer((&mut self.buffer).writer(), text)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(emitter: &JsonEmitter) -> &str {
        std::str::from_utf8(emitter.as_bytes()).unwrap()
    }

    #[test]
    fn empty_object() {
        let mut e = JsonEmitter::new();
        e.start_object().unwrap();
        e.end_object().unwrap();
        assert_eq!(text(&e), "{}");
    }

    #[test]
    fn members_are_comma_separated() {
        let mut e = JsonEmitter::new();
        e.start_object().unwrap();
        e.write_member("a", &Value::Integer(1)).unwrap();
        e.write_string_member("b", "two").unwrap();
        e.write_name("c").unwrap();
        e.start_array().unwrap();
        e.write_value(&Value::Bool(true)).unwrap();
        e.write_value(&Value::Null).unwrap();
        e.end_array().unwrap();
        e.end_object().unwrap();
        assert_eq!(text(&e), r#"{"a":1,"b":"two","c":[true,null]}"#);
    }

    #[test]
    fn objects_inside_arrays() {
        let mut e = JsonEmitter::new();
        e.start_array().unwrap();
        e.start_object().unwrap();
        e.end_object().unwrap();
        e.start_object().unwrap();
        e.write_member("x", &Value::Integer(2)).unwrap();
        e.end_object().unwrap();
        e.end_array().unwrap();
        assert_eq!(text(&e), r#"[{},{"x":2}]"#);
    }

    #[test]
    fn names_are_escaped() {
        let mut e = JsonEmitter::new();
        e.start_object().unwrap();
        e.write_member("a\"b", &Value::from("c\nd")).unwrap();
        e.end_object().unwrap();
        assert_eq!(text(&e), r#"{"a\"b":"c\nd"}"#);
    }

    #[test]
    fn streamed_string() {
        let mut e = JsonEmitter::new();
        e.start_object().unwrap();
        e.write_name("value").unwrap();
        e.start_string_value().unwrap();
        e.write_string_chunk("line \"one\"").unwrap();
        e.write_string_chunk("\ttwo").unwrap();
        e.end_string_value().unwrap();
        e.end_object().unwrap();
        assert_eq!(text(&e), r#"{"value":"line \"one\"\ttwo"}"#);
    }

    #[test]
    fn rejects_value_without_name() {
        let mut e = JsonEmitter::new();
        e.start_object().unwrap();
        assert!(matches!(
            e.write_value(&Value::Null),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn rejects_unbalanced_close() {
        let mut e = JsonEmitter::new();
        e.start_array().unwrap();
        assert_eq!(
            e.end_object(),
            Err(CodecError::UnbalancedContainer {
                expected: "object",
                found: "array",
            })
        );
    }

    #[test]
    fn rejects_structure_while_string_open() {
        let mut e = JsonEmitter::new();
        e.start_array().unwrap();
        e.start_string_value().unwrap();
        assert_eq!(e.end_array(), Err(CodecError::StringAlreadyOpen));
        e.end_string_value().unwrap();
        e.end_array().unwrap();
        assert_eq!(text(&e), r#"[""]"#);
    }

    #[test]
    fn take_drains_but_keeps_state() {
        let mut e = JsonEmitter::new();
        e.start_array().unwrap();
        e.write_value(&Value::Integer(1)).unwrap();
        let first = e.take();
        assert_eq!(&first[..], b"[1");
        assert!(e.is_empty());
        e.write_value(&Value::Integer(2)).unwrap();
        e.end_array().unwrap();
        assert_eq!(text(&e), ",2]");
        assert_eq!(e.depth(), 0);
    }
}
