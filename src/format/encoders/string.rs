use crate::format::encoder::{EncodeError, Encoder};
use crate::value::ResultValue;

/// `application/vnd+detectors.string`: the value's own string form.
///
/// Unlike [`TextEncoder`](super::TextEncoder) this is binary-capable: Bytes
/// are written as raw octets, untouched. Sequence elements are each followed
/// by `\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncoder;

impl Encoder for StringEncoder {
    fn name(&self) -> &'static str {
        "string"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.string"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => out.extend_from_slice(n.to_string().as_bytes()),
            ResultValue::Text(s) => out.extend_from_slice(s.as_bytes()),
            ResultValue::Bytes(b) => out.extend_from_slice(b),
            ResultValue::Sequence(items) => {
                for item in items {
                    out.extend_from_slice(item.as_bytes());
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
    fn test_bytes_pass_through() {
        let raw = vec![0x00, 0xff, 0x7f];
        assert_eq!(StringEncoder.encode(&ResultValue::Bytes(raw.clone())).unwrap(), raw);
    }
}
