use serde_json::Value;

use super::base64;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/json`.
///
/// Scalar → number, Text → string, Bytes → base64 string, Sequence → array.
/// Output is indented unless built with [`JsonEncoder::compact`].
#[derive(Debug, Clone, Copy)]
pub struct JsonEncoder {
    pretty: bool,
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonEncoder {
    #[must_use]
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

fn element_value(e: &Element) -> Value {
    match e {
        Element::Bytes(b) => Value::String(base64(b)),
        Element::Text(s) => Value::String(s.clone()),
    }
}

pub(crate) fn to_json(value: &ResultValue) -> Option<Value> {
    Some(match value {
        ResultValue::Absent => return None,
        ResultValue::Scalar(n) => Value::from(*n),
        ResultValue::Bytes(b) => Value::String(base64(b)),
        ResultValue::Text(s) => Value::String(s.clone()),
        ResultValue::Sequence(items) => Value::Array(items.iter().map(element_value).collect()),
    })
}

impl Encoder for JsonEncoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/json"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let json = to_json(value).ok_or_else(|| EncodeError::unsupported(self.name(), value.shape()))?;
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut *out, &json)
        } else {
            serde_json::to_writer(&mut *out, &json)
        };
        written.map_err(|e| EncodeError::unrepresentable(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(v: &ResultValue) -> String {
        String::from_utf8(JsonEncoder::default().encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_scalar_is_bare_number() {
        assert_eq!(render(&ResultValue::Scalar(3)), "3");
        assert_eq!(render(&ResultValue::Scalar(-12)), "-12");
    }

    #[test]
    fn test_bytes_are_base64() {
        assert_eq!(render(&ResultValue::Bytes(b"AB".to_vec())), "\"QUI=\"");
    }

    #[test]
    fn test_sequence_is_indented_array() {
        let v = ResultValue::text_sequence(["A", "B"]);
        assert_eq!(render(&v), "[\n  \"A\",\n  \"B\"\n]");
        let compact = JsonEncoder::compact().encode(&v).unwrap();
        assert_eq!(compact, b"[\"A\",\"B\"]");
    }

    #[test]
    fn test_absent_rejected() {
        assert!(JsonEncoder::default().encode(&ResultValue::Absent).is_err());
    }
}
