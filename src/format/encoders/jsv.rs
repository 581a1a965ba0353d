use super::base64;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/vnd+detectors.jsv`: JSON-like notation with bare strings.
///
/// Strings are written unquoted unless empty, padded with whitespace, or
/// containing one of `"` `,` `{` `}` `[` `]` or a control character; quoted
/// strings double their inner `"`. Bytes are base64, Scalar is decimal,
/// Sequence is `[a,b]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsvEncoder;

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.chars()
            .any(|c| matches!(c, '"' | ',' | '{' | '}' | '[' | ']') || c.is_control())
}

fn push_string(out: &mut Vec<u8>, s: &str) {
    if !needs_quotes(s) {
        out.extend_from_slice(s.as_bytes());
        return;
    }
    out.push(b'"');
    for b in s.bytes() {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

fn push_element(out: &mut Vec<u8>, e: &Element) {
    match e {
        Element::Bytes(b) => out.extend_from_slice(base64(b).as_bytes()),
        Element::Text(s) => push_string(out, s),
    }
}

impl Encoder for JsvEncoder {
    fn name(&self) -> &'static str {
        "jsv"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.jsv"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => out.extend_from_slice(n.to_string().as_bytes()),
            ResultValue::Text(s) => push_string(out, s),
            ResultValue::Bytes(b) => out.extend_from_slice(base64(b).as_bytes()),
            ResultValue::Sequence(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
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
        String::from_utf8(JsvEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_bare_and_quoted_strings() {
        assert_eq!(render(&ResultValue::Text("hello world".into())), "hello world");
        assert_eq!(render(&ResultValue::Text("a,b".into())), "\"a,b\"");
        assert_eq!(render(&ResultValue::Text("say \"hi\"".into())), "\"say \"\"hi\"\"\"");
        assert_eq!(render(&ResultValue::Text(String::new())), "\"\"");
    }

    #[test]
    fn test_sequence() {
        let v = ResultValue::text_sequence(["A", "b c", "[x]"]);
        assert_eq!(render(&v), "[A,b c,\"[x]\"]");
    }
}
