use serde_json::json;

use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{ResultValue, Shape};

/// `application/vnd+detectors.prtg`: PRTG custom sensor JSON.
///
/// - Scalar → one `Value` channel
/// - Sequence → one `Count` channel holding the element count
/// - Text → sensor message (`prtg.text`)
///
/// PRTG channels are numeric, so Bytes are not supported; asking for them is
/// an encoding fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrtgEncoder;

const SHAPES: [Shape; 3] = [Shape::Scalar, Shape::Text, Shape::Sequence];

impl Encoder for PrtgEncoder {
    fn name(&self) -> &'static str {
        "prtg"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.prtg"]
    }

    fn shapes(&self) -> &[Shape] {
        &SHAPES
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let doc = match value {
            ResultValue::Scalar(n) => json!({
                "prtg": { "result": [ { "channel": "Value", "value": n } ] }
            }),
            ResultValue::Sequence(items) => json!({
                "prtg": { "result": [ { "channel": "Count", "value": items.len() } ] }
            }),
            ResultValue::Text(s) => json!({ "prtg": { "text": s } }),
            ResultValue::Bytes(_) | ResultValue::Absent => {
                return Err(EncodeError::unsupported(self.name(), value.shape()))
            }
        };
        serde_json::to_writer(&mut *out, &doc)
            .map_err(|e| EncodeError::unrepresentable(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_channel() {
        let out = PrtgEncoder.encode(&ResultValue::Scalar(7)).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["prtg"]["result"][0]["channel"], "Value");
        assert_eq!(v["prtg"]["result"][0]["value"], 7);
    }

    #[test]
    fn test_sequence_count() {
        let out = PrtgEncoder
            .encode(&ResultValue::text_sequence(["a", "b", "c"]))
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["prtg"]["result"][0]["value"], 3);
    }

    #[test]
    fn test_bytes_unsupported() {
        let err = PrtgEncoder.encode(&ResultValue::Bytes(vec![1])).unwrap_err();
        assert_eq!(err, EncodeError::unsupported("prtg", Shape::Bytes));
    }
}
