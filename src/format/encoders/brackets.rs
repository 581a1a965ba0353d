use super::hex;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/vnd+detectors.brackets`: every value wrapped in square brackets.
///
/// - Scalar `3` → `[3]`
/// - Text → `[text]`, with `[`, `]` and `\` escaped by a backslash
/// - Bytes → `[` lowercase hex `]`
/// - Sequence → `[` elements `]`, e.g. `[[A][B]]`; empty → `[]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketsEncoder;

fn push_escaped(out: &mut Vec<u8>, s: &str) {
    for b in s.bytes() {
        if matches!(b, b'[' | b']' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
}

fn push_element(out: &mut Vec<u8>, e: &Element) {
    out.push(b'[');
    match e {
        Element::Bytes(b) => out.extend_from_slice(hex(b).as_bytes()),
        Element::Text(s) => push_escaped(out, s),
    }
    out.push(b']');
}

impl Encoder for BracketsEncoder {
    fn name(&self) -> &'static str {
        "brackets"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.brackets"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => {
                out.push(b'[');
                out.extend_from_slice(n.to_string().as_bytes());
                out.push(b']');
            }
            ResultValue::Text(s) => {
                out.push(b'[');
                push_escaped(out, s);
                out.push(b']');
            }
            ResultValue::Bytes(b) => {
                out.push(b'[');
                out.extend_from_slice(hex(b).as_bytes());
                out.push(b']');
            }
            ResultValue::Sequence(items) => {
                out.push(b'[');
                for item in items {
                    push_element(out, item);
                }
                out.push(b']');
            }
            ResultValue::Absent => return Err(EncodeError::unsupported(self.name(), value.shape())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(v: &ResultValue) -> String {
        String::from_utf8(BracketsEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_shapes() {
        assert_eq!(render(&ResultValue::Scalar(3)), "[3]");
        assert_eq!(render(&ResultValue::Bytes(vec![0x0a, 0xff])), "[0aff]");
        assert_eq!(render(&ResultValue::text_sequence(["A", "B"])), "[[A][B]]");
        assert_eq!(render(&ResultValue::Sequence(Vec::new())), "[]");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(render(&ResultValue::Text("a[b]\\".into())), "[a\\[b\\]\\\\]");
    }
}
