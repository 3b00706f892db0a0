//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template error in {}: {}", .0.template, .0.message)]
    Template(#[from] TemplateError),

    /// Two templates render to the same output path
    #[error("Templates {first} and {second} both render to {output}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    InvalidOperation,
    Other,
}

impl From<minijinja::ErrorKind> for TemplateErrorKind {
    fn from(kind: minijinja::ErrorKind) -> Self {
        match kind {
            minijinja::ErrorKind::UndefinedError => Self::UndefinedVariable,
            minijinja::ErrorKind::UnknownFilter => Self::UnknownFilter,
            minijinja::ErrorKind::UnknownFunction => Self::UnknownFunction,
            minijinja::ErrorKind::SyntaxError => Self::SyntaxError,
            minijinja::ErrorKind::InvalidOperation => Self::InvalidOperation,
            _ => Self::Other,
        }
    }
}

/// A template failed to parse or render
///
/// Carries the template source so miette can point at the offending line.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(deckhand::template::render))]
pub struct TemplateError {
    /// Error message
    pub message: String,

    /// Template path relative to `templates/`
    pub template: String,

    /// Error kind for categorization
    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,
}

impl TemplateError {
    /// Wrap a MiniJinja error raised while handling `template_name`
    pub fn from_minijinja(err: minijinja::Error, template_name: &str, source: &str) -> Self {
        let kind = TemplateErrorKind::from(err.kind());
        let message = match err.detail() {
            Some(detail) => format!("{}: {}", err.kind(), detail),
            None => err.kind().to_string(),
        };
        let span = err.line().and_then(|line| line_span(source, line));

        Self {
            message,
            template: template_name.to_string(),
            kind,
            src: NamedSource::new(template_name, source.to_string()),
            span,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Byte span of a 1-based line
fn line_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }
    None
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span() {
        let source = "a: 1\nbb: 2\nccc: 3";
        let span = line_span(source, 2).unwrap();
        assert_eq!(span.offset(), 5);
        assert_eq!(span.len(), 5);
        assert!(line_span(source, 9).is_none());
    }

    #[test]
    fn test_from_minijinja() {
        let mut env = minijinja::Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        let source = "a: 1\nb: {{ missing.key }}";
        env.add_template("t.yaml", source).unwrap();
        let err = env
            .get_template("t.yaml")
            .unwrap()
            .render(minijinja::context! {})
            .unwrap_err();

        let err = TemplateError::from_minijinja(err, "t.yaml", source);

        assert_eq!(err.kind(), TemplateErrorKind::UndefinedVariable);
        assert_eq!(err.template, "t.yaml");
        assert!(err.span.is_some());
    }
}
