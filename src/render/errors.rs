//! Error types for parsing and rendering
//!
//! This module defines [`TemplateError`], the single error type raised by
//! the parser and the renderer. Errors carry a kind tag, the template
//! name, and the source line of the nearest enclosing node, plus the
//! chain of include frames accumulated while the error unwinds so the
//! author can locate a fault inside nested includes.

use std::fmt;

/// The classes of error the engine can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid template syntax, reported at parse time
    Parse,

    /// A variable was not found in its compartment
    UnknownVariable,

    /// An operation was applied to values of the wrong type
    Type,

    /// A list index or dict key lookup failed
    Index,

    /// Division or modulus by zero, or integer overflow
    Arithmetic,

    /// Raised from the template itself via the `error` action
    User,

    /// The loader or a registry had no entry for a requested name
    NotFound,

    /// The abort predicate requested cancellation
    Abort,

    /// An engine invariant was violated
    Internal,
}

impl ErrorKind {
    fn label(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::UnknownVariable => "unknown variable",
            ErrorKind::Type => "type error",
            ErrorKind::Index => "index error",
            ErrorKind::Arithmetic => "arithmetic error",
            ErrorKind::User => "template error",
            ErrorKind::NotFound => "not found",
            ErrorKind::Abort => "render aborted",
            ErrorKind::Internal => "internal error",
        }
    }
}

/// An error at a specific location in a template.
#[derive(Debug, Clone)]
pub struct TemplateError {
    pub kind: ErrorKind,
    pub message: String,
    pub template: String,
    pub line: usize,
    /// Include frames the error crossed while unwinding, innermost
    /// first: (template name, line of the include tag).
    pub chain: Vec<(String, usize)>,
}

impl TemplateError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        template: impl Into<String>,
        line: usize,
    ) -> Self {
        TemplateError {
            kind,
            message: message.into(),
            template: template.into(),
            line,
            chain: Vec::new(),
        }
    }

    /// Record the include frame the error is unwinding through.
    pub fn included_from(mut self, template: &str, line: usize) -> Self {
        self.chain.push((template.to_string(), line));
        self
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} on {}:{}",
            self.kind.label(),
            self.message,
            if self.template.is_empty() {
                "<string>"
            } else {
                &self.template
            },
            self.line
        )?;
        for (template, line) in &self.chain {
            write!(f, "\n  included from {}:{}", template, line)?;
        }
        Ok(())
    }
}

impl std::error::Error for TemplateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_chain() {
        let err = TemplateError::new(ErrorKind::Type, "bad operand", "inner.tmpl", 3)
            .included_from("outer.tmpl", 7);
        let text = err.to_string();
        assert_eq!(
            text,
            "type error: bad operand on inner.tmpl:3\n  included from outer.tmpl:7"
        );
    }

    #[test]
    fn test_display_unnamed_template() {
        let err = TemplateError::new(ErrorKind::Parse, "unexpected token", "", 1);
        assert_eq!(err.to_string(), "parse error: unexpected token on <string>:1");
    }
}
