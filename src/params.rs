//! Parameter binding: the typed binder table.
//!
//! Each resource method declares an ordered list of [`ParamBinding`]s
//! describing where a handler argument comes from (path, query, header,
//! cookie, matrix, form, entity, context) and the target type it converts to.
//! Converters live in a [`BinderTable`] built once at model-build time and
//! invoked by index at request time, so the hot path performs no registry
//! lookups and no reflection-style dispatch.
//!
//! A conversion failure on a required parameter is a client error (400); on
//! an optional parameter the declared default (or JSON null) is bound
//! instead.

use crate::ids::RequestId;
use crate::message::Request;
use crate::template::CaptureVec;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Where a handler argument's raw value is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
    Header,
    Cookie,
    Matrix,
    Form,
    Entity,
    Context,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Header => "header",
            ParamSource::Cookie => "cookie",
            ParamSource::Matrix => "matrix",
            ParamSource::Form => "form",
            ParamSource::Entity => "entity",
            ParamSource::Context => "context",
        };
        f.write_str(s)
    }
}

/// Target type a raw string value converts to before reaching the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String = 0,
    I64 = 1,
    F64 = 2,
    Bool = 3,
    Json = 4,
}

/// A single declared parameter binding on a resource method.
#[derive(Debug, Clone)]
pub struct ParamBinding {
    /// Parameter name; for `Entity` and `Context` this names the argument.
    pub name: Arc<str>,
    pub source: ParamSource,
    pub ty: ParamType,
    pub required: bool,
    /// Bound when the value is absent (or fails conversion) and the
    /// parameter is optional.
    pub default: Option<Value>,
}

impl ParamBinding {
    #[must_use]
    pub fn new(name: &str, source: ParamSource, ty: ParamType) -> Self {
        ParamBinding {
            name: Arc::from(name),
            source,
            ty,
            required: false,
            default: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Error produced while binding parameters; maps to a 400 response.
#[derive(Debug, Clone)]
pub enum BindingError {
    /// A required parameter had no value in the request.
    Missing { name: String, source: ParamSource },
    /// A required parameter's raw value failed type conversion.
    Conversion {
        name: String,
        value: String,
        ty: ParamType,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::Missing { name, source } => {
                write!(f, "missing required {source} parameter '{name}'")
            }
            BindingError::Conversion { name, value, ty } => {
                write!(
                    f,
                    "cannot convert parameter '{name}' value '{value}' to {ty:?}"
                )
            }
        }
    }
}

impl std::error::Error for BindingError {}

type Converter = fn(&str) -> Option<Value>;

fn convert_string(raw: &str) -> Option<Value> {
    Some(Value::String(raw.to_string()))
}

fn convert_i64(raw: &str) -> Option<Value> {
    raw.parse::<i64>().ok().map(Value::from)
}

fn convert_f64(raw: &str) -> Option<Value> {
    raw.parse::<f64>().ok().map(Value::from)
}

fn convert_bool(raw: &str) -> Option<Value> {
    raw.parse::<bool>().ok().map(Value::from)
}

fn convert_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

/// Converter table indexed by [`ParamType`] discriminant.
///
/// Built once at model-build time; request-time conversion is a single
/// indexed call.
#[derive(Debug, Clone)]
pub struct BinderTable {
    converters: [Converter; 5],
}

impl Default for BinderTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl BinderTable {
    /// The standard converter set covering every [`ParamType`].
    #[must_use]
    pub fn standard() -> Self {
        BinderTable {
            converters: [
                convert_string,
                convert_i64,
                convert_f64,
                convert_bool,
                convert_json,
            ],
        }
    }

    /// Replace the converter for one target type. Intended for model-build
    /// time customization, before the model is locked.
    pub fn register(&mut self, ty: ParamType, converter: Converter) {
        self.converters[ty as usize] = converter;
    }

    #[inline]
    fn convert(&self, ty: ParamType, raw: &str) -> Option<Value> {
        (self.converters[ty as usize])(raw)
    }
}

/// Arguments bound for one invocation, in binding declaration order.
pub type BoundArgs = Vec<(Arc<str>, Value)>;

/// Raw per-request state the binder resolves values from.
pub struct BindInput<'a> {
    pub request: &'a Request,
    pub path_params: &'a CaptureVec,
    pub matrix_params: &'a CaptureVec,
    pub request_id: RequestId,
}

/// Resolve and convert every declared binding against the request state.
pub fn bind(
    bindings: &[ParamBinding],
    table: &BinderTable,
    input: &BindInput<'_>,
) -> Result<BoundArgs, BindingError> {
    let mut args = BoundArgs::with_capacity(bindings.len());
    for binding in bindings {
        let value = resolve(binding, table, input)?;
        args.push((Arc::clone(&binding.name), value));
    }
    Ok(args)
}

fn resolve(
    binding: &ParamBinding,
    table: &BinderTable,
    input: &BindInput<'_>,
) -> Result<Value, BindingError> {
    // Entity and Context bindings are structural, not string conversions.
    match binding.source {
        ParamSource::Entity => {
            return match &input.request.body {
                Some(body) => Ok(body.clone()),
                None if binding.required => Err(BindingError::Missing {
                    name: binding.name.to_string(),
                    source: binding.source,
                }),
                None => Ok(fallback(binding)),
            };
        }
        ParamSource::Context => {
            return Ok(serde_json::json!({
                "request_id": input.request_id.to_string(),
                "method": input.request.method.as_str(),
                "path": input.request.path,
            }));
        }
        _ => {}
    }

    let raw: Option<String> = match binding.source {
        ParamSource::Path => last_value(input.path_params, &binding.name),
        ParamSource::Query => input
            .request
            .get_query_param(&binding.name)
            .map(str::to_string),
        ParamSource::Header => input.request.get_header(&binding.name).map(str::to_string),
        ParamSource::Cookie => input.request.get_cookie(&binding.name).map(str::to_string),
        ParamSource::Matrix => last_value(input.matrix_params, &binding.name),
        ParamSource::Form => match input.request.body.as_ref().and_then(|b| b.get(&*binding.name)) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => return Ok(other.clone()),
            None => None,
        },
        ParamSource::Entity | ParamSource::Context => None,
    };

    let Some(raw) = raw else {
        if binding.required {
            return Err(BindingError::Missing {
                name: binding.name.to_string(),
                source: binding.source,
            });
        }
        return Ok(fallback(binding));
    };

    match table.convert(binding.ty, &raw) {
        Some(value) => Ok(value),
        None if binding.required => Err(BindingError::Conversion {
            name: binding.name.to_string(),
            value: raw,
            ty: binding.ty,
        }),
        None => Ok(fallback(binding)),
    }
}

fn fallback(binding: &ParamBinding) -> Value {
    binding.default.clone().unwrap_or(Value::Null)
}

fn last_value(params: &CaptureVec, name: &str) -> Option<String> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.clone())
}

/// Split matrix parameters (`;k=v` pairs on any segment) out of a path.
///
/// Returns the cleaned path used for template matching together with the
/// collected, URL-decoded matrix parameters.
#[must_use]
pub fn split_matrix(path: &str) -> (String, CaptureVec) {
    if !path.contains(';') {
        return (path.to_string(), CaptureVec::new());
    }
    let mut cleaned = String::with_capacity(path.len());
    let mut matrix = CaptureVec::new();
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            cleaned.push('/');
        }
        let mut parts = segment.split(';');
        cleaned.push_str(parts.next().unwrap_or(""));
        for pair in parts {
            let mut kv = pair.splitn(2, '=');
            let k = kv.next().unwrap_or("").trim();
            if k.is_empty() {
                continue;
            }
            let v = kv.next().unwrap_or("");
            let v = urlencoding::decode(v)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| v.to_string());
            matrix.push((Arc::from(k), v));
        }
    }
    (cleaned, matrix)
}
