use crate::format::encoder::{EncodeError, Encoder};
use crate::value::ResultValue;

const BYTES_PER_LINE: usize = 16;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// `application/vnd+detectors.dump`: canonical hex + ASCII dump.
///
/// Bytes and Text (as UTF-8) are dumped in the classic `hexdump -C` layout,
/// ending with the total length line. Scalar is written as decimal. Each
/// Sequence element is preceded by an `[index] length=N` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpEncoder;

fn push_hex_u8(out: &mut Vec<u8>, b: u8) {
    out.push(HEX_DIGITS[usize::from(b >> 4)]);
    out.push(HEX_DIGITS[usize::from(b & 0x0f)]);
}

fn push_offset(out: &mut Vec<u8>, offset: usize) {
    out.extend_from_slice(format!("{offset:08x}").as_bytes());
}

fn push_dump(out: &mut Vec<u8>, bytes: &[u8]) {
    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        push_offset(out, line * BYTES_PER_LINE);
        out.extend_from_slice(b"  ");
        for i in 0..BYTES_PER_LINE {
            match chunk.get(i) {
                Some(b) => {
                    push_hex_u8(out, *b);
                    out.push(b' ');
                }
                None => out.extend_from_slice(b"   "),
            }
            if i == 7 {
                out.push(b' ');
            }
        }
        out.extend_from_slice(b" |");
        for b in chunk {
            out.push(if (0x20..=0x7e).contains(b) { *b } else { b'.' });
        }
        out.extend_from_slice(b"|\n");
    }
    push_offset(out, bytes.len());
    out.push(b'\n');
}

impl Encoder for DumpEncoder {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.dump"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match value {
            ResultValue::Scalar(n) => {
                out.extend_from_slice(n.to_string().as_bytes());
                out.push(b'\n');
            }
            ResultValue::Text(s) => push_dump(out, s.as_bytes()),
            ResultValue::Bytes(b) => push_dump(out, b),
            ResultValue::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    let bytes = item.as_bytes();
                    out.extend_from_slice(format!("[{i}] length={}\n", bytes.len()).as_bytes());
                    push_dump(out, bytes);
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
        String::from_utf8(DumpEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_short_line_layout() {
        let out = render(&ResultValue::Bytes(b"ABC\n".to_vec()));
        let expected = format!(
            "00000000  41 42 43 0a {}|ABC.|\n00000004\n",
            " ".repeat(3 * 12 + 2)
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_full_line_layout() {
        let out = render(&ResultValue::Bytes(vec![b'A'; 16]));
        assert_eq!(
            out,
            "00000000  41 41 41 41 41 41 41 41  41 41 41 41 41 41 41 41  |AAAAAAAAAAAAAAAA|\n00000010\n"
        );
    }

    #[test]
    fn test_empty_bytes() {
        assert_eq!(render(&ResultValue::Bytes(Vec::new())), "00000000\n");
    }

    #[test]
    fn test_sequence_headers() {
        let out = render(&ResultValue::text_sequence(["A", "BC"]));
        assert!(out.starts_with("[0] length=1\n00000000  41"));
        assert!(out.contains("[1] length=2\n00000000  42 43"));
    }
}
