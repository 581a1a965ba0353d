use super::hex;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/vnd+detectors.markdown`: a GitHub-flavoured markdown table.
///
/// Single values produce a one-column `Value` table; sequences add a `#`
/// index column. Bytes are lowercase hex. Pipes are escaped and line breaks
/// become `<br>` so each value stays on one row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownEncoder;

fn cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '|' => out.push_str("\\|"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br>");
            }
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

fn element_cell(e: &Element) -> String {
    match e {
        Element::Bytes(b) => hex(b),
        Element::Text(s) => cell(s),
    }
}

fn push_single(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(b"| Value |\n| --- |\n");
    out.extend_from_slice(format!("| {value} |\n").as_bytes());
}

impl Encoder for MarkdownEncoder {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.markdown"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => push_single(out, &n.to_string()),
            ResultValue::Text(s) => push_single(out, &cell(s)),
            ResultValue::Bytes(b) => push_single(out, &hex(b)),
            ResultValue::Sequence(items) => {
                out.extend_from_slice(b"| # | Value |\n| ---: | --- |\n");
                for (i, item) in items.iter().enumerate() {
                    out.extend_from_slice(format!("| {i} | {} |\n", element_cell(item)).as_bytes());
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
        String::from_utf8(MarkdownEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_scalar_table() {
        assert_eq!(render(&ResultValue::Scalar(3)), "| Value |\n| --- |\n| 3 |\n");
    }

    #[test]
    fn test_sequence_table() {
        let out = render(&ResultValue::text_sequence(["A", "x|y", "l1\r\nl2"]));
        assert_eq!(
            out,
            "| # | Value |\n| ---: | --- |\n| 0 | A |\n| 1 | x\\|y |\n| 2 | l1<br>l2 |\n"
        );
    }
}
