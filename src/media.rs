//! Media type handling for content negotiation.
//!
//! Provides the pieces the method selector is built on: parsed media types
//! with wildcard awareness, client `q` / server `qs` quality values, and the
//! combined client/server score used to rank candidate representations.
//!
//! Quality values are stored in thousandths (`q=0.8` becomes `800`) so that
//! ordering is exact integer comparison rather than float comparison.

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;

/// Default quality value in thousandths (`q=1.0`).
pub const DEFAULT_QUALITY: u16 = 1000;

/// The full wildcard media type `*/*`.
pub static WILDCARD: Lazy<MediaType> = Lazy::new(|| MediaType::new("*", "*"));

/// Error returned when a media type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypeError {
    /// The offending input string.
    pub input: String,
}

impl fmt::Display for MediaTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid media type '{}'", self.input)
    }
}

impl std::error::Error for MediaTypeError {}

/// A parsed `type/subtype;param=value` media type.
///
/// Type and subtype are stored lowercase; parameter order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    ty: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(ty: &str, subtype: &str) -> Self {
        MediaType {
            ty: ty.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Parse a media type string such as `application/json;qs=0.5`.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let mut parts = input.split(';');
        let essence = parts.next().unwrap_or("").trim();
        let mut type_parts = essence.splitn(2, '/');
        let ty = type_parts.next().unwrap_or("").trim();
        let subtype = type_parts.next().unwrap_or("").trim();
        if ty.is_empty() || subtype.is_empty() || ty.contains(char::is_whitespace) {
            return Err(MediaTypeError {
                input: input.to_string(),
            });
        }
        // A wildcard type with a concrete subtype (`*/json`) is nonsensical.
        if ty == "*" && subtype != "*" {
            return Err(MediaTypeError {
                input: input.to_string(),
            });
        }
        let mut params = Vec::new();
        for p in parts {
            let mut kv = p.splitn(2, '=');
            let k = kv.next().unwrap_or("").trim();
            if k.is_empty() {
                continue;
            }
            let v = kv.next().unwrap_or("").trim().trim_matches('"');
            params.push((k.to_ascii_lowercase(), v.to_string()));
        }
        Ok(MediaType {
            ty: ty.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    #[must_use]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.ty == "*"
    }

    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// True when neither type nor subtype is a wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Compatibility test used by both the consumes filter and the produces
    /// ranking: wildcards match anything on their level, concrete values must
    /// be equal.
    #[must_use]
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        let type_ok =
            self.is_wildcard_type() || other.is_wildcard_type() || self.ty == other.ty;
        let subtype_ok = self.is_wildcard_subtype()
            || other.is_wildcard_subtype()
            || self.subtype == other.subtype;
        type_ok && subtype_ok
    }

    /// Client-specified quality (`q` parameter), in thousandths.
    #[must_use]
    pub fn quality(&self) -> u16 {
        self.param("q")
            .and_then(parse_quality)
            .unwrap_or(DEFAULT_QUALITY)
    }

    /// Server-specified quality (`qs` parameter on declared produces types),
    /// in thousandths.
    #[must_use]
    pub fn quality_source(&self) -> u16 {
        self.param("qs")
            .and_then(parse_quality)
            .unwrap_or(DEFAULT_QUALITY)
    }

    /// Copy of this media type with `q`/`qs` parameters removed.
    #[must_use]
    pub fn without_quality_params(&self) -> MediaType {
        MediaType {
            ty: self.ty.clone(),
            subtype: self.subtype.clone(),
            params: self
                .params
                .iter()
                .filter(|(k, _)| k != "q" && k != "qs")
                .cloned()
                .collect(),
        }
    }

    /// Concreteness rank: `2` concrete, `1` for `type/*`, `0` for `*/*`.
    #[must_use]
    pub fn concreteness(&self) -> u8 {
        match (self.is_wildcard_type(), self.is_wildcard_subtype()) {
            (false, false) => 2,
            (false, true) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ty, self.subtype)?;
        for (k, v) in &self.params {
            write!(f, ";{k}={v}")?;
        }
        Ok(())
    }
}

/// Parse a quality value string into thousandths, clamped to `[0, 1000]`.
fn parse_quality(value: &str) -> Option<u16> {
    let q: f32 = value.trim().parse().ok()?;
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    Some((q * 1000.0).round() as u16)
}

/// Parse an `Accept` header into the ordered list of acceptable media types.
///
/// A missing or empty header means "anything". Entries that fail to parse are
/// skipped rather than failing the request.
#[must_use]
pub fn parse_accept(header: Option<&str>) -> Vec<MediaType> {
    let Some(raw) = header else {
        return vec![WILDCARD.clone()];
    };
    let parsed: Vec<MediaType> = raw
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            MediaType::parse(entry).ok()
        })
        .collect();
    if parsed.is_empty() {
        vec![WILDCARD.clone()]
    } else {
        parsed
    }
}

/// Combined client/server media type score used to rank candidate
/// representations during negotiation.
///
/// `d` is the wildcard distance between the two combined types: `0` for an
/// exact pairing, `1` when one side contributes a wildcard on one level, `2`
/// when a full wildcard is paired with a concrete type.
#[derive(Debug, Clone)]
pub struct CombinedMediaType {
    /// The most specific of the two compatible types, quality params stripped.
    pub combined: MediaType,
    /// Client quality, thousandths.
    pub q: u16,
    /// Server quality, thousandths.
    pub qs: u16,
    /// Wildcard distance; lower is better.
    pub d: u8,
}

impl CombinedMediaType {
    /// Combine a client (`Accept`) entry with a server (`produces`) entry.
    /// Returns `None` when the two are not compatible.
    #[must_use]
    pub fn create(client: &MediaType, server: &MediaType) -> Option<CombinedMediaType> {
        if !client.is_compatible(server) {
            return None;
        }
        let stripped_client = client.without_quality_params();
        let stripped_server = server.without_quality_params();
        let combined = if stripped_client.concreteness() >= stripped_server.concreteness() {
            stripped_client
        } else {
            stripped_server
        };
        let d = u8::from(client.is_wildcard_type() != server.is_wildcard_type())
            + u8::from(client.is_wildcard_subtype() != server.is_wildcard_subtype());
        Some(CombinedMediaType {
            combined,
            q: client.quality(),
            qs: server.quality_source(),
            d,
        })
    }

    /// Preference order: `Greater` means `self` is the better choice.
    ///
    /// More concrete combined type first, then higher `q`, then higher `qs`,
    /// then lower wildcard distance.
    #[must_use]
    pub fn cmp_preference(&self, other: &CombinedMediaType) -> Ordering {
        self.combined
            .concreteness()
            .cmp(&other.combined.concreteness())
            .then(self.q.cmp(&other.q))
            .then(self.qs.cmp(&other.qs))
            .then(other.d.cmp(&self.d))
    }

    /// The negotiated type a response will be labelled with. Wildcards
    /// concretize to the crate's JSON entity representation.
    #[must_use]
    pub fn concrete_type(&self) -> MediaType {
        if self.combined.is_concrete() {
            self.combined.clone()
        } else {
            MediaType::new("application", "json")
        }
    }
}
