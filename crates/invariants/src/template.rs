//! Message templates for invariant violations.
//!
//! A template is parsed once and rendered for every violation it describes.
//! Two placeholders are understood:
//!
//! - `{condition}` - the name of the violated invariant
//! - `{type}` - the name of the type that owns the invariant
//!
//! Literal braces are written `{{` and `}}`. Any other placeholder is
//! rejected when the template is parsed, so a typo surfaces at configuration
//! time rather than in a user-facing message.
//!
//! ```rust
//! use invariants::Template;
//!
//! let template = Template::parse("{type} rejected: {condition}")?;
//! assert_eq!(template.render(&"not_completed", "Todo"), "Todo rejected: not_completed");
//! # Ok::<(), invariants::TemplateError>(())
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in message used when neither the call site, the invariant nor its
/// type supplies one.
pub const DEFAULT_MESSAGE: &str = "Invariant cannot be enforced: {condition}";

const DEFAULT_PREFIX: &str = "Invariant cannot be enforced: ";

/// Errors raised while parsing a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Placeholder other than `{condition}` or `{type}`
    #[error("unknown placeholder `{{{name}}}` (expected `{{condition}}` or `{{type}}`)")]
    UnknownPlaceholder { name: String },

    /// `{` without a closing `}`
    #[error("unclosed `{{` at byte {position}")]
    Unclosed { position: usize },

    /// `}` without an opening `{`
    #[error("unmatched `}}` at byte {position}")]
    Unmatched { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Condition,
    TypeName,
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` for unknown placeholders and unbalanced braces.
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, next)| next) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, next)| next) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, next) in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        name.push(next);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed { position });
                    }
                    let placeholder = match name.trim() {
                        "condition" => Segment::Condition,
                        "type" => Segment::TypeName,
                        _ => return Err(TemplateError::UnknownPlaceholder { name }),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(placeholder);
                }
                '}' => return Err(TemplateError::Unmatched { position }),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { source, segments })
    }

    /// Build a template that renders `text` verbatim.
    ///
    /// Braces in `text` are escaped, so this never fails.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let source = text.replace('{', "{{").replace('}', "}}");
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(text)]
        };
        Self { source, segments }
    }

    /// The template text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template mentions `{condition}`.
    #[must_use]
    pub fn mentions_condition(&self) -> bool {
        self.segments.contains(&Segment::Condition)
    }

    /// Render the template for one invariant of one type.
    #[must_use]
    pub fn render(&self, condition: &dyn fmt::Display, type_name: &str) -> String {
        let condition = condition.to_string();
        self.segments
            .iter()
            .fold(String::with_capacity(self.source.len()), |mut out, segment| {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Condition => out.push_str(&condition),
                    Segment::TypeName => out.push_str(type_name),
                }
                out
            })
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            source: DEFAULT_MESSAGE.to_owned(),
            segments: vec![
                Segment::Literal(DEFAULT_PREFIX.to_owned()),
                Segment::Condition,
            ],
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Template> for String {
    fn from(template: Template) -> Self {
        template.source
    }
}
