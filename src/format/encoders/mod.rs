//! Built-in encoders, one per wire format.
//!
//! Every encoder documents how it renders `Bytes`; nothing is inferred.
//!
//! | encoder | Bytes rendering |
//! |---|---|
//! | json, csv, html, jsv, xml | base64 (standard alphabet, padded) |
//! | brackets, markdown, table | lowercase hex |
//! | dump | canonical hex dump |
//! | text | UTF-8, invalid sequences replaced |
//! | string | raw octets |
//! | prtg | not supported |

use std::sync::Arc;

use base64::Engine as _;

use super::encoder::Encoder;

mod brackets;
mod csv;
mod dump;
mod html;
mod json;
mod jsv;
mod markdown;
mod prtg;
mod string;
mod table;
mod text;
mod xml;

pub use brackets::BracketsEncoder;
pub use csv::CsvEncoder;
pub use dump::DumpEncoder;
pub use html::HtmlEncoder;
pub use json::JsonEncoder;
pub use jsv::JsvEncoder;
pub use markdown::MarkdownEncoder;
pub use prtg::PrtgEncoder;
pub use string::StringEncoder;
pub use table::TableEncoder;
pub use text::TextEncoder;
pub use xml::XmlEncoder;

/// All built-in encoders in registration order.
///
/// JSON and plain text come first, ahead of the vendor formats, so wildcard
/// negotiation without a default still lands on JSON.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn Encoder>> {
    vec![
        Arc::new(JsonEncoder::default()),
        Arc::new(TextEncoder),
        Arc::new(BracketsEncoder),
        Arc::new(CsvEncoder),
        Arc::new(DumpEncoder),
        Arc::new(HtmlEncoder),
        Arc::new(JsvEncoder),
        Arc::new(MarkdownEncoder),
        Arc::new(PrtgEncoder),
        Arc::new(TableEncoder),
        Arc::new(StringEncoder),
        Arc::new(XmlEncoder),
    ]
}

pub(crate) fn base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(HEX_DIGITS[usize::from(b >> 4)]));
        out.push(char::from(HEX_DIGITS[usize::from(b & 0x0f)]));
    }
    out
}
