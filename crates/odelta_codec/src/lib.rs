//! # odelta Codec
//!
//! JSON building blocks for the odelta payload writer and reader.
//!
//! This crate provides:
//! - [`Value`]: a dynamic property value that keeps member order
//! - [`JsonEmitter`]: a streaming, separator-tracking JSON emitter
//! - [`from_json`]: a decoder that preserves member order and duplicates
//!
//! ## Wire rules
//!
//! - Output is compact, newline-free JSON
//! - Binary values are written as standard base64 strings
//! - Non-finite doubles are written as `"NaN"`, `"INF"` and `"-INF"`
//!
//! ## Usage
//!
//! ```
//! use odelta_codec::{from_json, JsonEmitter, Value};
//!
//! let mut emitter = JsonEmitter::new();
//! emitter.start_object().unwrap();
//! emitter.write_member("Name", &Value::from("Susan")).unwrap();
//! emitter.end_object().unwrap();
//!
//! let text = std::str::from_utf8(emitter.as_bytes()).unwrap();
//! assert_eq!(text, r#"{"Name":"Susan"}"#);
//!
//! let decoded = from_json(text).unwrap();
//! assert_eq!(decoded.get("Name"), Some(&Value::from("Susan")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_json, from_json_slice};
pub use encoder::{to_json_string, JsonEmitter};
pub use error::{CodecError, CodecResult};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn emitted_object_decodes() {
        let value = Value::complex([
            ("Street", Value::from("23 Tsawassen Blvd.")),
            ("Tags", Value::Collection(vec![Value::from("a"), Value::Null])),
        ]);
        let text = to_json_string(&value).unwrap();
        assert_eq!(from_json(&text).unwrap(), value);
    }

    proptest! {
        #[test]
        fn text_values_survive_escaping(s in ".*") {
            let text = to_json_string(&Value::Text(s.clone())).unwrap();
            prop_assert_eq!(from_json(&text).unwrap(), Value::Text(s));
        }

        #[test]
        fn integers_survive(n in any::<i64>()) {
            let text = to_json_string(&Value::Integer(n)).unwrap();
            prop_assert_eq!(from_json(&text).unwrap(), Value::Integer(n));
        }
    }
}
