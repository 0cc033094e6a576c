//! Minimal request-body templating for the generic HTTP provider.
//!
//! Templates are plain text with `{{ variable }}` or
//! `{{ variable | filter | filter }}` placeholders. Everything outside a
//! placeholder is copied verbatim, so JSON bodies with literal braces work.
//!
//! ## Variables
//! - `idea` - the idea text
//! - `context` (alias `context_raw`) - human-readable domain context
//! - `context_json` - JSON serialization of the domain context (`null` when absent)
//!
//! A leading dot and any casing are accepted (`{{.Idea}}`).
//!
//! ## Filters
//! - `json` - encode the value as a JSON string literal
//! - `trim`, `upper`, `lower`
//!
//! ## Example
//!
//! ```
//! use ideascore_core::AnalysisRequest;
//! use ideascore_runtime::providers::RequestTemplate;
//!
//! let template = RequestTemplate::compile(r#"{"text": {{ idea | json }}}"#).unwrap();
//! let body = template.render(&AnalysisRequest::new("say \"hi\"")).unwrap();
//! assert_eq!(body, br#"{"text": "say \"hi\""}"#.to_vec());
//! ```

use std::fmt;
use thiserror::Error;

use ideascore_core::AnalysisRequest;

/// Errors from compiling or rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template compile error at byte {position}: {message}")]
    Compile { position: usize, message: String },

    #[error("template render error: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Idea,
    Context,
    ContextJson,
}

impl Variable {
    fn parse(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('.').to_ascii_lowercase();
        match name.as_str() {
            "idea" => Some(Variable::Idea),
            "context" | "context_raw" | "contextraw" => Some(Variable::Context),
            "context_json" | "contextjson" => Some(Variable::ContextJson),
            _ => None,
        }
    }

    fn resolve(self, request: &AnalysisRequest) -> Result<String, TemplateError> {
        match self {
            Variable::Idea => Ok(request.idea.clone()),
            Variable::Context => request
                .context
                .as_ref()
                .map(|c| c.to_string())
                .ok_or_else(|| {
                    TemplateError::Render(
                        "template references `context` but the request has no domain context"
                            .to_string(),
                    )
                }),
            Variable::ContextJson => serde_json::to_string(&request.context)
                .map_err(|e| TemplateError::Render(format!("context_json: {}", e))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Json,
    Trim,
    Upper,
    Lower,
}

impl Filter {
    fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "json" => Some(Filter::Json),
            "trim" => Some(Filter::Trim),
            "upper" => Some(Filter::Upper),
            "lower" => Some(Filter::Lower),
            _ => None,
        }
    }

    fn apply(self, value: String) -> Result<String, TemplateError> {
        match self {
            Filter::Json => serde_json::to_string(&value)
                .map_err(|e| TemplateError::Render(format!("json filter: {}", e))),
            Filter::Trim => Ok(value.trim().to_string()),
            Filter::Upper => Ok(value.to_uppercase()),
            Filter::Lower => Ok(value.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder {
        variable: Variable,
        filters: Vec<Filter>,
    },
}

/// A compiled request-body template.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RequestTemplate {
    /// Parse a template, rejecting unterminated placeholders, empty
    /// expressions, unknown variables and unknown filters.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }

            let expr_start = open + 2;
            let close = rest[expr_start..].find("}}").ok_or_else(|| TemplateError::Compile {
                position: offset + open,
                message: "unterminated `{{`".to_string(),
            })?;

            let expression = &rest[expr_start..expr_start + close];
            segments.push(Self::compile_expression(expression, offset + open)?);

            let consumed = expr_start + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    fn compile_expression(expression: &str, position: usize) -> Result<Segment, TemplateError> {
        let mut parts = expression.split('|');
        let name = parts.next().unwrap_or_default().trim();

        if name.is_empty() {
            return Err(TemplateError::Compile {
                position,
                message: "empty placeholder".to_string(),
            });
        }

        let variable = Variable::parse(name).ok_or_else(|| TemplateError::Compile {
            position,
            message: format!(
                "unknown variable `{}` (expected idea, context or context_json)",
                name
            ),
        })?;

        let filters = parts
            .map(|f| {
                Filter::parse(f).ok_or_else(|| TemplateError::Compile {
                    position,
                    message: format!("unknown filter `{}`", f.trim()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Segment::Placeholder { variable, filters })
    }

    /// Render the template for a request.
    pub fn render(&self, request: &AnalysisRequest) -> Result<Vec<u8>, TemplateError> {
        let mut out = String::with_capacity(self.source.len() + request.idea.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { variable, filters } => {
                    let mut value = variable.resolve(request)?;
                    for filter in filters {
                        value = filter.apply(value)?;
                    }
                    out.push_str(&value);
                }
            }
        }

        Ok(out.into_bytes())
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for RequestTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTemplate")
            .field("source", &self.source)
            .field("placeholders", &self.segments.iter().filter(|s| matches!(s, Segment::Placeholder { .. })).count())
            .finish()
    }
}
