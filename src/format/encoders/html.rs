use super::base64;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

const HEAD: &str = "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>detectors</title></head>\n<body>\n";
const TAIL: &str = "</body>\n</html>\n";

/// `text/html`: a minimal standalone document.
///
/// Scalar → `<p class="scalar">`, Text → escaped `<pre>`, Bytes → base64 in
/// `<pre class="base64">`, Sequence → `<ol>` with one `<li>` per element.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEncoder;

fn push_escaped(out: &mut Vec<u8>, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\'' => out.extend_from_slice(b"&#39;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

fn push_item(out: &mut Vec<u8>, e: &Element) {
    match e {
        Element::Bytes(b) => {
            out.extend_from_slice(b"<li class=\"base64\">");
            out.extend_from_slice(base64(b).as_bytes());
        }
        Element::Text(s) => {
            out.extend_from_slice(b"<li>");
            push_escaped(out, s);
        }
    }
    out.extend_from_slice(b"</li>\n");
}

impl Encoder for HtmlEncoder {
    fn name(&self) -> &'static str {
        "html"
    }

    fn media_types(&self) -> &[&'static str] {
        &["text/html"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.extend_from_slice(HEAD.as_bytes());
        match value {
            ResultValue::Scalar(n) => {
                out.extend_from_slice(format!("<p class=\"scalar\">{n}</p>\n").as_bytes());
            }
            ResultValue::Text(s) => {
                out.extend_from_slice(b"<pre>");
                push_escaped(out, s);
                out.extend_from_slice(b"</pre>\n");
            }
            ResultValue::Bytes(b) => {
                out.extend_from_slice(b"<pre class=\"base64\">");
                out.extend_from_slice(base64(b).as_bytes());
                out.extend_from_slice(b"</pre>\n");
            }
            ResultValue::Sequence(items) => {
                out.extend_from_slice(b"<ol start=\"0\">\n");
                for item in items {
                    push_item(out, item);
                }
                out.extend_from_slice(b"</ol>\n");
            }
            ResultValue::Absent => return Err(EncodeError::unsupported(self.name(), value.shape())),
        }
        out.extend_from_slice(TAIL.as_bytes());
        Ok(())
    }
}
