//! Accept header parsing and media range matching.

use smallvec::SmallVec;

/// Most Accept headers list a handful of ranges.
pub const MAX_INLINE_RANGES: usize = 8;

/// Lowercase `type/subtype` with parameters and whitespace removed.
#[must_use]
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// How precisely a range matched a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    /// `*/*`
    Any,
    /// `type/*`
    Type,
    /// `type/subtype`
    Exact,
}

/// One entry of an Accept header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub kind: String,
    pub subtype: String,
    /// Quality weight in `[0, 1]`
    pub q: f32,
}

impl MediaRange {
    /// Parse a single range such as `text/html;q=0.8`.
    ///
    /// Returns `None` for malformed entries, which are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        let (kind, subtype) = if essence == "*" {
            ("*".to_string(), "*".to_string())
        } else {
            let (k, s) = essence.split_once('/')?;
            if k.is_empty() || s.is_empty() || (k == "*" && s != "*") {
                return None;
            }
            (k.to_string(), s.to_string())
        };

        let mut q = 1.0_f32;
        for param in parts {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("q") {
                q = value.trim().parse::<f32>().ok().filter(|v| v.is_finite())?;
                q = q.clamp(0.0, 1.0);
            }
        }
        Some(Self { kind, subtype, q })
    }

    /// Specificity of the match against `media_type`, or `None` if it does not match.
    #[must_use]
    pub fn matches(&self, media_type: &str) -> Option<Specificity> {
        let (kind, subtype) = media_type.split_once('/')?;
        if self.kind == "*" {
            return Some(Specificity::Any);
        }
        if !self.kind.eq_ignore_ascii_case(kind) {
            return None;
        }
        if self.subtype == "*" {
            return Some(Specificity::Type);
        }
        self.subtype
            .eq_ignore_ascii_case(subtype)
            .then_some(Specificity::Exact)
    }
}

/// Parsed Accept header.
#[derive(Debug, Clone, Default)]
pub struct AcceptHeader {
    ranges: SmallVec<[MediaRange; MAX_INLINE_RANGES]>,
}

impl AcceptHeader {
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let ranges = header
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(MediaRange::parse)
            .collect();
        Self { ranges }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn ranges(&self) -> &[MediaRange] {
        &self.ranges
    }

    /// Quality and specificity the header grants `media_type`.
    ///
    /// The most specific matching range decides; among equally specific ranges
    /// the highest quality is used. A result with `q == 0` means "explicitly
    /// not acceptable".
    #[must_use]
    pub fn quality(&self, media_type: &str) -> Option<(f32, Specificity)> {
        let media_type = normalize_media_type(media_type);
        let mut best: Option<(f32, Specificity)> = None;
        for range in &self.ranges {
            let Some(specificity) = range.matches(&media_type) else {
                continue;
            };
            best = match best {
                Some((q, s)) if s > specificity || (s == specificity && q >= range.q) => Some((q, s)),
                _ => Some((range.q, specificity)),
            };
        }
        best
    }
}
