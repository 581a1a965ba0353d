use super::base64;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// `application/xml` using schema-style element names.
///
/// ```xml
/// <list><string>A</string><base64Binary>Qg==</base64Binary></list>
/// ```
///
/// Text containing characters XML 1.0 cannot carry (most C0 controls) is an
/// encoding fault; such values should be served as bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder;

fn allowed(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

fn push_text(out: &mut Vec<u8>, s: &str) -> Result<(), EncodeError> {
    for c in s.chars() {
        match c {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            c if allowed(c) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            c => {
                return Err(EncodeError::unrepresentable(
                    "xml",
                    format!("character U+{:04X} is not allowed in XML 1.0", u32::from(c)),
                ))
            }
        }
    }
    Ok(())
}

fn push_string(out: &mut Vec<u8>, s: &str) -> Result<(), EncodeError> {
    out.extend_from_slice(b"<string>");
    push_text(out, s)?;
    out.extend_from_slice(b"</string>");
    Ok(())
}

fn push_bytes(out: &mut Vec<u8>, b: &[u8]) {
    out.extend_from_slice(b"<base64Binary>");
    out.extend_from_slice(base64(b).as_bytes());
    out.extend_from_slice(b"</base64Binary>");
}

impl Encoder for XmlEncoder {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/xml", "text/xml"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.extend_from_slice(DECLARATION.as_bytes());
        match value {
            ResultValue::Scalar(n) => {
                out.extend_from_slice(format!("<long>{n}</long>").as_bytes());
            }
            ResultValue::Text(s) => push_string(out, s)?,
            ResultValue::Bytes(b) => push_bytes(out, b),
            ResultValue::Sequence(items) => {
                out.extend_from_slice(b"<list>");
                for item in items {
                    match item {
                        Element::Bytes(b) => push_bytes(out, b),
                        Element::Text(s) => push_string(out, s)?,
                    }
                }
                out.extend_from_slice(b"</list>");
            }
            ResultValue::Absent => return Err(EncodeError::unsupported(self.name(), value.shape())),
        }
        out.push(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(v: &ResultValue) -> String {
        String::from_utf8(XmlEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_scalar() {
        assert_eq!(render(&ResultValue::Scalar(-1)), format!("{DECLARATION}<long>-1</long>\n"));
    }

    #[test]
    fn test_mixed_sequence() {
        let v = ResultValue::Sequence(vec![
            Element::Text("a<b".into()),
            Element::Bytes(b"B".to_vec()),
        ]);
        assert_eq!(
            render(&v),
            format!("{DECLARATION}<list><string>a&lt;b</string><base64Binary>Qg==</base64Binary></list>\n")
        );
    }

    #[test]
    fn test_control_character_is_a_fault() {
        let err = XmlEncoder
            .encode(&ResultValue::Text("bell\u{7}".into()))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Unrepresentable { encoder: "xml", .. }));
    }
}
