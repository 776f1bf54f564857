//! Parse and check diagnostics.

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

use crate::parser::{Location, SourceCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A single message located by a byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub start: usize,
    pub end: usize,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Range<usize>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            start: span.start,
            end: span.end,
        }
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message, span)
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// All error diagnostics of an `Issues`, collapsed into one failure.
#[derive(Debug, Clone, Error)]
#[error("{rendered}")]
pub struct IssuesError {
    pub diagnostics: Vec<Diagnostic>,
    rendered: String,
}

/// Ordered diagnostics from parsing and checking one source.
#[derive(Debug, Clone, Default)]
pub struct Issues {
    source: Option<SourceCode>,
    diagnostics: Vec<Diagnostic>,
}

impl Issues {
    pub fn new(source: SourceCode) -> Self {
        Issues {
            source: Some(source),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn from_diagnostics(source: SourceCode, diagnostics: Vec<Diagnostic>) -> Self {
        Issues {
            source: Some(source),
            diagnostics,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Append `other`'s diagnostics after this one's.
    pub fn append(&mut self, other: Issues) {
        if self.source.is_none() {
            self.source = other.source;
        }
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// `Some` iff at least one diagnostic is an error.
    pub fn err(&self) -> Option<IssuesError> {
        let errors: Vec<Diagnostic> = self
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .cloned()
            .collect();
        if errors.is_empty() {
            return None;
        }
        let rendered = Issues {
            source: self.source.clone(),
            diagnostics: errors.clone(),
        }
        .render();
        Some(IssuesError {
            diagnostics: errors,
            rendered,
        })
    }

    /// Location of a diagnostic's start, when the source is known.
    pub fn location(&self, diagnostic: &Diagnostic) -> Option<Location> {
        self.source.as_ref()?.offset_location(diagnostic.start)
    }

    /// Human-readable report: each message followed by the offending source
    /// snippet.
    pub fn render(&self) -> String {
        let Some(source) = &self.source else {
            return self
                .diagnostics
                .iter()
                .map(|diagnostic| format!("{}: {}", diagnostic.severity, diagnostic.message))
                .collect::<Vec<_>>()
                .join("\n");
        };
        let name = source.description();
        let mut output = Vec::new();
        for diagnostic in &self.diagnostics {
            let kind = match diagnostic.severity {
                Severity::Error => ReportKind::Error,
                Severity::Warning => ReportKind::Warning,
            };
            let span = clamp(diagnostic.span(), source.len());
            let written = Report::build(kind, (name, span.clone()))
                .with_config(
                    Config::default()
                        .with_color(false)
                        .with_index_type(IndexType::Byte),
                )
                .with_message(&diagnostic.message)
                .with_label(Label::new((name, span)).with_message(&diagnostic.message))
                .finish()
                .write((name, Source::from(source.as_str())), &mut output);
            if written.is_err() {
                output.extend_from_slice(
                    format!("{}: {}\n", diagnostic.severity, diagnostic.message).as_bytes(),
                );
            }
        }
        String::from_utf8_lossy(&output).trim_end().to_string()
    }
}

fn clamp(span: Range<usize>, len: usize) -> Range<usize> {
    let start = span.start.min(len);
    start..span.end.clamp(start, len)
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_err_collapses_errors_only() {
        let mut issues = Issues::new(SourceCode::new("a + b"));
        issues.push(Diagnostic::warning("style", 0..1));
        assert!(issues.err().is_none());
        issues.push(Diagnostic::error("undeclared reference to 'b'", 4..5));
        let error = issues.err().unwrap();
        assert_eq!(error.diagnostics.len(), 1);
        assert!(error.to_string().contains("undeclared reference to 'b'"));
    }

    #[test]
    fn test_append_preserves_order() {
        let source = SourceCode::new("x");
        let mut first = Issues::new(source.clone());
        first.push(Diagnostic::error("one", 0..1));
        let mut second = Issues::new(source);
        second.push(Diagnostic::error("two", 0..1));
        first.append(second);
        let messages: Vec<_> = first
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.message.as_str())
            .collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[test]
    fn test_render_includes_snippet() {
        let mut issues = Issues::new(SourceCode::with_description("1 < \"a\"", "expr"));
        issues.push(Diagnostic::error("found no matching overload", 2..3));
        let rendered = issues.render();
        assert!(rendered.contains("found no matching overload"));
        assert!(rendered.contains("1 < \"a\""));
        assert!(rendered.contains("expr"));
    }

    #[test]
    fn test_location() {
        let issues = Issues::new(SourceCode::new("a\n  b"));
        let diagnostic = Diagnostic::error("here", 4..5);
        assert_eq!(issues.location(&diagnostic), Some(Location { line: 2, column: 2 }));
    }
}
