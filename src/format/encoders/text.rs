use crate::format::encoder::{EncodeError, Encoder};
use crate::value::ResultValue;

/// `text/plain`.
///
/// Scalar → decimal, Text → literal, Bytes → UTF-8 with invalid sequences
/// replaced by U+FFFD, Sequence → one element per line (`\n` terminated).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEncoder;

impl Encoder for TextEncoder {
    fn name(&self) -> &'static str {
        "text"
    }

    fn media_types(&self) -> &[&'static str] {
        &["text/plain"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => out.extend_from_slice(n.to_string().as_bytes()),
            ResultValue::Text(s) => out.extend_from_slice(s.as_bytes()),
            ResultValue::Bytes(b) => out.extend_from_slice(String::from_utf8_lossy(b).as_bytes()),
            ResultValue::Sequence(items) => {
                for item in items {
                    out.extend_from_slice(item.as_text().as_bytes());
                    out.push(b'\n');
                }
            }
            ResultValue::Absent => return Err(EncodeError::unsupported(self.name(), value.shape())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_replaced() {
        let out = TextEncoder.encode(&ResultValue::Bytes(vec![b'o', 0xff, b'k'])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "o\u{fffd}k");
    }

    #[test]
    fn test_sequence_lines() {
        let out = TextEncoder
            .encode(&ResultValue::byte_sequence([b"A".to_vec(), b"B".to_vec()]))
            .unwrap();
        assert_eq!(out, b"A\nB\n");
    }
}
