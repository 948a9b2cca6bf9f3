//! Declarative request validation.
//!
//! A route declares up to three facet schemas (body, path parameters, query
//! parameters). Facets validate independently: a failure in one never stops
//! the others, and all field errors are aggregated into a single rejection,
//! ordered body, params, query, within each facet in declared order. On
//! success every validated facet is replaced by its normalized form so
//! downstream code never re-parses raw input.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::request::InboundRequest;

/// One of the three independently validated slices of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    /// JSON body
    Body,
    /// Path parameters
    Params,
    /// Query string parameters
    Query,
}

impl Facet {
    /// Name used when rendering field errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Params => "params",
            Self::Query => "query",
        }
    }
}

/// A single violated field, rendered `<facet>.<field>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Facet the field belongs to
    pub facet: Facet,
    /// Field path within the facet
    pub field: String,
    /// Human-readable violation
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.facet.as_str(), self.field, self.message)
    }
}

/// Expected shape of one field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A string with optional length bounds
    Text {
        /// Minimum length, inclusive
        min_len: Option<usize>,
        /// Maximum length, inclusive
        max_len: Option<usize>,
    },
    /// An email address
    Email,
    /// An integer with optional range bounds; numeric strings are coerced
    Integer {
        /// Minimum value, inclusive
        min: Option<i64>,
        /// Maximum value, inclusive
        max: Option<i64>,
    },
    /// A string drawn from a fixed set
    OneOf(&'static [&'static str]),
    /// A UUID in canonical textual form
    Uuid,
}

/// Declarative rule for one field of a facet.
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
}

impl FieldRule {
    /// A string field.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text {
                min_len: None,
                max_len: None,
            },
            required: false,
            default: None,
        }
    }

    /// An email field.
    #[must_use]
    pub const fn email(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Email,
            required: false,
            default: None,
        }
    }

    /// An integer field.
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer {
                min: None,
                max: None,
            },
            required: false,
            default: None,
        }
    }

    /// A field restricted to a fixed set of strings.
    #[must_use]
    pub const fn one_of(name: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::OneOf(values),
            required: false,
            default: None,
        }
    }

    /// A UUID field.
    #[must_use]
    pub const fn uuid(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Uuid,
            required: false,
            default: None,
        }
    }

    /// Mark the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set string length bounds (applies to [`FieldKind::Text`]).
    #[must_use]
    pub const fn len_between(mut self, min: usize, max: usize) -> Self {
        if let FieldKind::Text { .. } = self.kind {
            self.kind = FieldKind::Text {
                min_len: Some(min),
                max_len: Some(max),
            };
        }
        self
    }

    /// Set the minimum integer value.
    #[must_use]
    pub const fn min(mut self, value: i64) -> Self {
        if let FieldKind::Integer { max, .. } = self.kind {
            self.kind = FieldKind::Integer {
                min: Some(value),
                max,
            };
        }
        self
    }

    /// Set the maximum integer value.
    #[must_use]
    pub const fn max(mut self, value: i64) -> Self {
        if let FieldKind::Integer { min, .. } = self.kind {
            self.kind = FieldKind::Integer {
                min,
                max: Some(value),
            };
        }
        self
    }

    /// Value filled in when the field is absent.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Ordered field rules for one facet.
#[derive(Debug, Clone, Default)]
pub struct FacetSchema {
    rules: Vec<FieldRule>,
}

impl FacetSchema {
    /// An empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; rules validate in declaration order.
    #[must_use]
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Canned query schema for paginated listings.
    ///
    /// `page` defaults to 1 and must be positive; `limit` defaults to 10 and
    /// must be between 1 and 100. Both coerce numeric strings during
    /// validation so handlers read ready-made integers.
    #[must_use]
    pub fn pagination() -> Self {
        Self::new()
            .rule(
                FieldRule::integer("page")
                    .min(1)
                    .default_value(Value::from(1)),
            )
            .rule(
                FieldRule::integer("limit")
                    .min(1)
                    .max(100)
                    .default_value(Value::from(10)),
            )
    }

    fn validate(
        &self,
        facet: Facet,
        source: &Map<String, Value>,
        errors: &mut Vec<FieldError>,
    ) -> Map<String, Value> {
        let mut normalized = Map::new();
        for rule in &self.rules {
            let raw = source.get(rule.name).filter(|v| !v.is_null());
            let Some(value) = raw else {
                if let Some(default) = &rule.default {
                    normalized.insert(rule.name.to_string(), default.clone());
                } else if rule.required {
                    errors.push(FieldError {
                        facet,
                        field: rule.name.to_string(),
                        message: "is required".to_string(),
                    });
                }
                continue;
            };
            match check_value(&rule.kind, value) {
                Ok(coerced) => {
                    normalized.insert(rule.name.to_string(), coerced);
                }
                Err(message) => errors.push(FieldError {
                    facet,
                    field: rule.name.to_string(),
                    message,
                }),
            }
        }
        normalized
    }
}

fn check_value(kind: &FieldKind, value: &Value) -> Result<Value, String> {
    match kind {
        FieldKind::Text { min_len, max_len } => {
            let text = value.as_str().ok_or("must be a string")?;
            if let Some(min) = min_len {
                if text.chars().count() < *min {
                    return Err(format!("must be at least {min} characters"));
                }
            }
            if let Some(max) = max_len {
                if text.chars().count() > *max {
                    return Err(format!("must be at most {max} characters"));
                }
            }
            Ok(Value::from(text))
        }
        FieldKind::Email => {
            let text = value.as_str().ok_or("must be a string")?;
            if is_plausible_email(text) {
                Ok(Value::from(text.trim()))
            } else {
                Err("must be a valid email address".to_string())
            }
        }
        FieldKind::Integer { min, max } => {
            let number = coerce_integer(value).ok_or("must be an integer")?;
            if let Some(min) = min {
                if number < *min {
                    return Err(format!("must be at least {min}"));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(format!("must be at most {max}"));
                }
            }
            Ok(Value::from(number))
        }
        FieldKind::OneOf(allowed) => {
            let text = value.as_str().ok_or("must be a string")?;
            if allowed.contains(&text) {
                Ok(Value::from(text))
            } else {
                Err(format!("must be one of: {}", allowed.join(", ")))
            }
        }
        FieldKind::Uuid => {
            let text = value.as_str().ok_or("must be a string")?;
            uuid::Uuid::parse_str(text)
                .map(|_| Value::from(text))
                .map_err(|_| "must be a valid uuid".to_string())
        }
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_plausible_email(text: &str) -> bool {
    let text = text.trim();
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !text.contains(char::is_whitespace)
}

/// Schemas for the three request facets; an absent facet is not validated.
#[derive(Debug, Clone, Default)]
pub struct RequestSchema {
    body: Option<FacetSchema>,
    params: Option<FacetSchema>,
    query: Option<FacetSchema>,
}

/// Normalized facet maps produced by a successful validation.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFacets {
    /// Normalized body fields
    pub body: Map<String, Value>,
    /// Normalized path parameters
    pub params: Map<String, Value>,
    /// Normalized query parameters
    pub query: Map<String, Value>,
}

impl RequestSchema {
    /// A schema validating nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            body: None,
            params: None,
            query: None,
        }
    }

    /// Validate the JSON body.
    #[must_use]
    pub fn body(mut self, schema: FacetSchema) -> Self {
        self.body = Some(schema);
        self
    }

    /// Validate path parameters.
    #[must_use]
    pub fn params(mut self, schema: FacetSchema) -> Self {
        self.params = Some(schema);
        self
    }

    /// Validate query parameters.
    #[must_use]
    pub fn query(mut self, schema: FacetSchema) -> Self {
        self.query = Some(schema);
        self
    }

    /// Validate a request against all present facet schemas.
    ///
    /// Each facet validates in isolation; the result is either the full set
    /// of normalized facets or every field error across all facets.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] aggregating every violated field.
    pub fn validate(&self, request: &InboundRequest) -> Result<NormalizedFacets, GatewayError> {
        let mut errors = Vec::new();
        let mut normalized = NormalizedFacets::default();

        if let Some(schema) = &self.body {
            match body_map(request.body.as_ref()) {
                Ok(source) => {
                    normalized.body = schema.validate(Facet::Body, &source, &mut errors);
                }
                Err(message) => errors.push(FieldError {
                    facet: Facet::Body,
                    field: String::new(),
                    message,
                }),
            }
        }
        if let Some(schema) = &self.params {
            let source = string_map(&request.params);
            normalized.params = schema.validate(Facet::Params, &source, &mut errors);
        }
        if let Some(schema) = &self.query {
            let source = string_map(&request.query);
            normalized.query = schema.validate(Facet::Query, &source, &mut errors);
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(GatewayError::Validation { errors })
        }
    }
}

fn body_map(body: Option<&Value>) -> Result<Map<String, Value>, String> {
    match body {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err("must be a JSON object".to_string()),
    }
}

fn string_map(source: &std::collections::BTreeMap<String, String>) -> Map<String, Value> {
    source
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};

    fn req() -> InboundRequest {
        InboundRequest::new("POST", "/projects", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
    }

    fn errors_of(result: Result<NormalizedFacets, GatewayError>) -> Vec<String> {
        match result {
            Err(GatewayError::Validation { errors }) => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn required_field_missing() {
        let schema = RequestSchema::new()
            .body(FacetSchema::new().rule(FieldRule::text("name").required()));
        let errors = errors_of(schema.validate(&req().with_body(json!({}))));
        assert_eq!(errors, vec!["body.name: is required"]);
    }

    #[test]
    fn aggregates_across_facets_in_order() {
        let schema = RequestSchema::new()
            .body(
                FacetSchema::new()
                    .rule(FieldRule::text("name").required().len_between(3, 50))
                    .rule(FieldRule::email("email").required()),
            )
            .query(FacetSchema::pagination());
        let request = req()
            .with_body(json!({"name": "ab", "email": "nope"}))
            .with_query("page", "0");

        let errors = errors_of(schema.validate(&request));
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "body.name: must be at least 3 characters");
        assert_eq!(errors[1], "body.email: must be a valid email address");
        assert_eq!(errors[2], "query.page: must be at least 1");
    }

    #[test]
    fn one_facet_failing_does_not_stop_the_others() {
        let schema = RequestSchema::new()
            .body(FacetSchema::new().rule(FieldRule::text("name").required()))
            .params(FacetSchema::new().rule(FieldRule::uuid("id").required()))
            .query(FacetSchema::pagination());
        let request = req()
            .with_body(json!({}))
            .with_param("id", "not-a-uuid")
            .with_query("limit", "500");

        let errors = errors_of(schema.validate(&request));
        assert_eq!(
            errors,
            vec![
                "body.name: is required",
                "params.id: must be a valid uuid",
                "query.limit: must be at most 100",
            ]
        );
    }

    #[test]
    fn pagination_defaults_and_coercion() {
        let schema = RequestSchema::new().query(FacetSchema::pagination());

        let facets = schema.validate(&req()).unwrap();
        assert_eq!(facets.query["page"], json!(1));
        assert_eq!(facets.query["limit"], json!(10));

        let facets = schema
            .validate(&req().with_query("page", "3").with_query("limit", "25"))
            .unwrap();
        assert_eq!(facets.query["page"], json!(3));
        assert_eq!(facets.query["limit"], json!(25));
    }

    #[test]
    fn non_numeric_pagination_is_rejected() {
        let schema = RequestSchema::new().query(FacetSchema::pagination());
        let errors = errors_of(schema.validate(&req().with_query("page", "first")));
        assert_eq!(errors, vec!["query.page: must be an integer"]);
    }

    #[test]
    fn normalization_replaces_raw_values() {
        let schema = RequestSchema::new().body(
            FacetSchema::new()
                .rule(FieldRule::integer("count"))
                .rule(FieldRule::one_of("status", &["pending", "active"])),
        );
        let facets = schema
            .validate(&req().with_body(json!({"count": "42", "status": "active"})))
            .unwrap();
        assert_eq!(facets.body["count"], json!(42));
        assert_eq!(facets.body["status"], json!("active"));
    }

    #[test]
    fn non_object_body_is_a_single_error() {
        let schema = RequestSchema::new()
            .body(FacetSchema::new().rule(FieldRule::text("name").required()));
        let errors = errors_of(schema.validate(&req().with_body(json!([1, 2]))));
        assert_eq!(errors, vec!["body.: must be a JSON object"]);
    }

    #[test]
    fn absent_facet_is_not_validated() {
        let schema = RequestSchema::new().query(FacetSchema::pagination());
        let request = req().with_body(json!({"anything": "goes"}));
        assert!(schema.validate(&request).is_ok());
    }
}
