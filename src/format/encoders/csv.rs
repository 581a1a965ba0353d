use super::base64;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/vnd+detectors.csv`: one single-column row per value.
///
/// No header row, CRLF row terminators, RFC 4180 quoting. Bytes are written
/// as base64. A Sequence of N elements yields exactly N rows; an empty
/// string is written as `""` so its row is never blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

fn needs_quotes(field: &str) -> bool {
    field.is_empty()
        || field.starts_with(' ')
        || field.ends_with(' ')
        || field.bytes().any(|b| matches!(b, b',' | b'"' | b'\r' | b'\n'))
}

fn push_row(out: &mut Vec<u8>, field: &str) {
    if needs_quotes(field) {
        out.push(b'"');
        for b in field.bytes() {
            if b == b'"' {
                out.push(b'"');
            }
            out.push(b);
        }
        out.push(b'"');
    } else {
        out.extend_from_slice(field.as_bytes());
    }
    out.extend_from_slice(b"\r\n");
}

impl Encoder for CsvEncoder {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.csv"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => push_row(out, &n.to_string()),
            ResultValue::Text(s) => push_row(out, s),
            ResultValue::Bytes(b) => push_row(out, &base64(b)),
            ResultValue::Sequence(items) => {
                for item in items {
                    match item {
                        Element::Bytes(b) => push_row(out, &base64(b)),
                        Element::Text(s) => push_row(out, s),
                    }
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

    fn render(v: &ResultValue) -> String {
        String::from_utf8(CsvEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_rows_in_order() {
        assert_eq!(render(&ResultValue::text_sequence(["A", "B"])), "A\r\nB\r\n");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(render(&ResultValue::Text("a,\"b\"".into())), "\"a,\"\"b\"\"\"\r\n");
        assert_eq!(render(&ResultValue::Text(String::new())), "\"\"\r\n");
        assert_eq!(render(&ResultValue::Text(" pad".into())), "\" pad\"\r\n");
    }

    #[test]
    fn test_row_count_matches_elements() {
        for n in [0usize, 1, 1000] {
            let v = ResultValue::byte_sequence((0..n).map(|i| i.to_string().into_bytes()));
            let out = render(&v);
            assert_eq!(out.matches("\r\n").count(), n, "n = {n}");
        }
    }

    #[test]
    fn test_scalar_single_row() {
        assert_eq!(render(&ResultValue::Scalar(42)), "42\r\n");
    }
}
