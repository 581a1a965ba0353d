use super::hex;
use crate::format::encoder::{EncodeError, Encoder};
use crate::value::{Element, ResultValue};

/// `application/vnd+detectors.table`: a boxed plain-text table.
///
/// ```text
/// +---+-------+
/// | # | Value |
/// +---+-------+
/// | 0 | A     |
/// +---+-------+
/// ```
///
/// Single values omit the `#` column. Bytes are lowercase hex; CR, LF and TAB
/// inside text are shown as `\r`, `\n`, `\t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableEncoder;

fn cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn push_border(out: &mut String, widths: &[usize]) {
    for w in widths {
        out.push('+');
        out.push_str(&"-".repeat(w + 2));
    }
    out.push_str("+\n");
}

fn push_row(out: &mut String, widths: &[usize], cells: &[&str]) {
    for (w, c) in widths.iter().zip(cells) {
        out.push_str("| ");
        out.push_str(c);
        out.push_str(&" ".repeat(w - width(c) + 1));
    }
    out.push_str("|\n");
}

fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| width(h)).collect();
    for row in rows {
        for (w, c) in widths.iter_mut().zip(row) {
            *w = (*w).max(width(c));
        }
    }
    let mut out = String::new();
    push_border(&mut out, &widths);
    push_row(&mut out, &widths, header);
    push_border(&mut out, &widths);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&mut out, &widths, &cells);
    }
    if !rows.is_empty() {
        push_border(&mut out, &widths);
    }
    out
}

impl Encoder for TableEncoder {
    fn name(&self) -> &'static str {
        "table"
    }

    fn media_types(&self) -> &[&'static str] {
        &["application/vnd+detectors.table"]
    }

    fn render(&self, value: &ResultValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let table = match value {
            ResultValue::Scalar(n) => render_table(&["Value"], &[vec![n.to_string()]]),
            ResultValue::Text(s) => render_table(&["Value"], &[vec![cell(s)]]),
            ResultValue::Bytes(b) => render_table(&["Value"], &[vec![hex(b)]]),
            ResultValue::Sequence(items) => {
                let rows: Vec<Vec<String>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let value = match item {
                            Element::Bytes(b) => hex(b),
                            Element::Text(s) => cell(s),
                        };
                        vec![i.to_string(), value]
                    })
                    .collect();
                render_table(&["#", "Value"], &rows)
            }
            ResultValue::Absent => return Err(EncodeError::unsupported(self.name(), value.shape())),
        };
        out.extend_from_slice(table.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(v: &ResultValue) -> String {
        String::from_utf8(TableEncoder.encode(v).unwrap()).unwrap()
    }

    #[test]
    fn test_sequence_table() {
        let out = render(&ResultValue::text_sequence(["A", "Banana"]));
        assert_eq!(
            out,
            "+---+--------+\n\
             | # | Value  |\n\
             +---+--------+\n\
             | 0 | A      |\n\
             | 1 | Banana |\n\
             +---+--------+\n"
        );
    }

    #[test]
    fn test_scalar_table() {
        assert_eq!(
            render(&ResultValue::Scalar(3)),
            "+-------+\n| Value |\n+-------+\n| 3     |\n+-------+\n"
        );
    }

    #[test]
    fn test_empty_sequence_has_header_only() {
        assert_eq!(
            render(&ResultValue::Sequence(Vec::new())),
            "+---+-------+\n| # | Value |\n+---+-------+\n"
        );
    }
}
