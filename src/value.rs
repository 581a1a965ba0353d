//! Result values produced by domain handlers.
//!
//! A handler never writes bytes itself. It returns a [`ResultValue`] and the
//! dispatcher picks an encoder for it after the handler has finished, so the
//! same list lookup can be served as JSON, CSV, XML and so on.

use std::borrow::Cow;

/// One element of a [`ResultValue::Sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Opaque bytes as stored
    Bytes(Vec<u8>),
    /// Bytes already interpreted as a string by the handler
    Text(String),
}

impl Element {
    /// Text view of the element.
    ///
    /// `Bytes` are interpreted as UTF-8; invalid sequences become U+FFFD.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Element::Bytes(b) => String::from_utf8_lossy(b),
            Element::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Raw octets of the element (UTF-8 for `Text`).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Element::Bytes(b) => b,
            Element::Text(s) => s.as_bytes(),
        }
    }
}

/// The tagged result of a handler, before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultValue {
    /// Resource does not exist. Never passed to an encoder.
    Absent,
    Scalar(i64),
    Bytes(Vec<u8>),
    Text(String),
    Sequence(Vec<Element>),
}

/// Discriminant of a [`ResultValue`], used by encoders to declare what they render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Absent,
    Scalar,
    Bytes,
    Text,
    Sequence,
}

impl Shape {
    /// Every shape an encoder can be asked to render.
    pub const RENDERABLE: [Shape; 4] = [Shape::Scalar, Shape::Bytes, Shape::Text, Shape::Sequence];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Absent => "absent",
            Shape::Scalar => "scalar",
            Shape::Bytes => "bytes",
            Shape::Text => "text",
            Shape::Sequence => "sequence",
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResultValue {
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            ResultValue::Absent => Shape::Absent,
            ResultValue::Scalar(_) => Shape::Scalar,
            ResultValue::Bytes(_) => Shape::Bytes,
            ResultValue::Text(_) => Shape::Text,
            ResultValue::Sequence(_) => Shape::Sequence,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, ResultValue::Absent)
    }

    /// Build a sequence of byte elements.
    #[must_use]
    pub fn byte_sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        ResultValue::Sequence(items.into_iter().map(Element::Bytes).collect())
    }

    /// Build a sequence of text elements.
    #[must_use]
    pub fn text_sequence<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResultValue::Sequence(items.into_iter().map(|s| Element::Text(s.into())).collect())
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        ResultValue::Scalar(v)
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        ResultValue::Text(v)
    }
}

impl From<Vec<u8>> for ResultValue {
    fn from(v: Vec<u8>) -> Self {
        ResultValue::Bytes(v)
    }
}

impl<T: Into<ResultValue>> From<Option<T>> for ResultValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ResultValue::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_none_is_absent() {
        let v: ResultValue = Option::<Vec<u8>>::None.into();
        assert!(v.is_absent());
        let v: ResultValue = Some(b"x".to_vec()).into();
        assert_eq!(v.shape(), Shape::Bytes);
    }

    #[test]
    fn test_element_lossy_text() {
        let e = Element::Bytes(vec![0x41, 0xff, 0x42]);
        assert_eq!(e.as_text(), "A\u{fffd}B");
        assert_eq!(Element::Text("héllo".into()).as_bytes(), "héllo".as_bytes());
    }
}
