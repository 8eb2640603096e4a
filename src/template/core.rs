use regex::Regex;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Maximum number of captured path parameters before heap allocation.
/// Most REST paths have ≤4 parameters (e.g. /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the matching hot path.
///
/// Parameter names use `Arc<str>` because they come from the static template
/// and cloning them is an O(1) atomic increment; values are per-request data
/// captured from the URL and stay `String`.
pub type CaptureVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Error produced when a path template cannot be compiled.
///
/// All variants are build-time fatal: an invalid template prevents the
/// resource model from locking.
#[derive(Debug, Clone)]
pub enum TemplateError {
    /// A `{` without a matching `}` (or vice versa).
    UnbalancedBraces { template: String },
    /// The same parameter name appears twice in one template.
    DuplicateParameter { template: String, name: String },
    /// `{}` or `{: regex}`; a parameter must be named.
    EmptyParameterName { template: String },
    /// The embedded custom regex (or the assembled pattern) failed to compile.
    InvalidRegex {
        template: String,
        source: regex::Error,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnbalancedBraces { template } => {
                write!(f, "unbalanced braces in path template '{template}'")
            }
            TemplateError::DuplicateParameter { template, name } => {
                write!(
                    f,
                    "duplicate parameter '{name}' in path template '{template}'"
                )
            }
            TemplateError::EmptyParameterName { template } => {
                write!(f, "empty parameter name in path template '{template}'")
            }
            TemplateError::InvalidRegex { template, source } => {
                write!(
                    f,
                    "invalid regex in path template '{template}': {source}"
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::InvalidRegex { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result of matching a template against the left edge of a path.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    /// Captured, percent-decoded path parameters in template order.
    pub params: CaptureVec,
    /// Unconsumed tail of the path; empty or starting with `/`.
    pub remainder: String,
}

impl TemplateMatch {
    /// Look up a captured parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An immutable, compiled path template.
///
/// Created once at model-build time and shared read-only afterwards. Two
/// templates compare by specificity descending with a lexical tie-break, so
/// any collection of templates sorts deterministically.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    pattern: Regex,
    /// Parameter names paired with their capture-group index in `pattern`.
    /// Indices account for capture groups inside embedded custom regexes.
    params: Vec<(Arc<str>, usize)>,
    literal_chars: usize,
    explicit_regex_groups: usize,
    /// Group index capturing the unconsumed remainder of the path.
    rest_group: usize,
}

impl UriTemplate {
    /// Compile a template string into a matchable pattern.
    ///
    /// The template is normalized to a leading `/` and no trailing `/`
    /// before compilation; `""` and `"/"` both denote the root template.
    pub fn compile(template: &str) -> Result<UriTemplate, TemplateError> {
        let raw = normalize(template);
        let mut pattern = String::with_capacity(raw.len() + 16);
        pattern.push('^');

        let mut params: Vec<(Arc<str>, usize)> = Vec::new();
        let mut literal_chars = 0usize;
        let mut explicit_regex_groups = 0usize;
        let mut group_count = 0usize;

        let body = if raw == "/" { "" } else { raw.as_str() };
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '{' => {
                    // Brace scanning is nesting-aware so `{id: \d{3}}` works.
                    let mut depth = 1usize;
                    let start = i + 1;
                    let mut end = None;
                    let mut j = start;
                    while j < chars.len() {
                        match chars[j] {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    end = Some(j);
                                    break;
                                }
                            }
                            _ => {}
                        }
                        j += 1;
                    }
                    let Some(end) = end else {
                        return Err(TemplateError::UnbalancedBraces { template: raw });
                    };
                    let inner: String = chars[start..end].iter().collect();
                    let (name, custom) = match inner.find(':') {
                        Some(pos) => (inner[..pos].trim(), Some(inner[pos + 1..].trim())),
                        None => (inner.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(TemplateError::EmptyParameterName { template: raw });
                    }
                    if params.iter().any(|(n, _)| n.as_ref() == name) {
                        return Err(TemplateError::DuplicateParameter {
                            template: raw,
                            name: name.to_string(),
                        });
                    }
                    group_count += 1;
                    params.push((Arc::from(name), group_count));
                    let expr = match custom {
                        Some(re) if !re.is_empty() => {
                            explicit_regex_groups += 1;
                            // Inner capture groups shift subsequent indices.
                            group_count += count_capture_groups(re);
                            re.to_string()
                        }
                        _ => "[^/]+".to_string(),
                    };
                    pattern.push('(');
                    pattern.push_str(&expr);
                    pattern.push(')');
                    i = end + 1;
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBraces { template: raw });
                }
                c => {
                    literal_chars += 1;
                    let mut buf = [0u8; 4];
                    pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                    i += 1;
                }
            }
        }

        let rest_group = group_count + 1;
        pattern.push_str("((?:/.*)?)$");

        let compiled = Regex::new(&pattern).map_err(|source| TemplateError::InvalidRegex {
            template: raw.clone(),
            source,
        })?;

        Ok(UriTemplate {
            raw,
            pattern: compiled,
            params,
            literal_chars,
            explicit_regex_groups,
            rest_group,
        })
    }

    /// The normalized template string this was compiled from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Names of the template's parameters, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_ref())
    }

    #[must_use]
    pub fn capture_group_count(&self) -> usize {
        self.params.len()
    }

    /// Match this template against the left edge of `path`.
    ///
    /// On success the matched prefix is consumed: captured parameters are
    /// percent-decoded and the remainder (empty, or starting with `/`) is
    /// returned for the next stage of the routing chain.
    #[must_use]
    pub fn match_prefix(&self, path: &str) -> Option<TemplateMatch> {
        let caps = self.pattern.captures(path)?;
        let mut params = CaptureVec::new();
        for (name, idx) in &self.params {
            if let Some(m) = caps.get(*idx) {
                let decoded = urlencoding::decode(m.as_str())
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| m.as_str().to_string());
                params.push((Arc::clone(name), decoded));
            }
        }
        let remainder = caps
            .get(self.rest_group)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Some(TemplateMatch { params, remainder })
    }

    /// True when `path` is fully consumed by this template (no remainder).
    #[must_use]
    pub fn matches_exactly(&self, path: &str) -> bool {
        match self.match_prefix(path) {
            Some(m) => m.remainder.is_empty() || m.remainder == "/",
            None => false,
        }
    }
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for UriTemplate {}

impl PartialOrd for UriTemplate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UriTemplate {
    /// Specificity order: ascending sort puts the most specific template
    /// first. More literal characters win, then more capture groups, then
    /// more explicitly constrained groups, then lexical order of the raw
    /// template for a stable total order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .literal_chars
            .cmp(&self.literal_chars)
            .then(other.params.len().cmp(&self.params.len()))
            .then(other.explicit_regex_groups.cmp(&self.explicit_regex_groups))
            .then(self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(template: &str) -> String {
    let trimmed = template.trim();
    let mut raw = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while raw.len() > 1 && raw.ends_with('/') {
        raw.pop();
    }
    raw
}

/// Count capture groups in an embedded regex: unescaped `(` not followed by
/// `?`, outside character classes (non-capturing / named constructs are the
/// author's responsibility).
fn count_capture_groups(re: &str) -> usize {
    let bytes = re.as_bytes();
    let mut count = 0;
    let mut in_class = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'(' if !in_class => {
                if bytes.get(i + 1) != Some(&b'?') {
                    count += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    count
}
