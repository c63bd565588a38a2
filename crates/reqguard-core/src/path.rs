//! # Nested Configuration Paths
//!
//! A [`SchemaPath`] locates the schema inside a route's configuration
//! document. Dot and bracket segments are interchangeable:
//!
//! ```text
//! options.schema       == options[schema]
//! options["schema"].v1 == options.schema.v1
//! ```
//!
//! Lookup walks plain JSON objects only. Arrays are never traversed and a
//! path that resolves to anything but an object resolves to nothing.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::CoreError;

/// A parsed nested-key path. The empty path addresses the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath {
    segments: Vec<String>,
}

impl SchemaPath {
    /// The path addressing the configuration root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted/bracketed path.
    ///
    /// Bracket keys may be bare (`[schema]`) or quoted with `'` or `"`;
    /// quoted keys may contain dots and brackets, and a backslash inside
    /// quotes takes the next character literally (`["a\"]"]` is `a"]`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPath`] for empty segments (`a..b`,
    /// `.a`, `a.`), unterminated or empty brackets, and stray `]`.
    pub fn parse(path: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut after_bracket = false;
        let mut after_dot = false;
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(invalid("empty segment"));
                    }
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    after_bracket = false;
                    after_dot = true;
                }
                '[' => {
                    if after_dot && current.is_empty() {
                        return Err(invalid("empty segment before '['"));
                    }
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }

                    let quote = match chars.peek() {
                        Some(&q @ ('"' | '\'')) => {
                            chars.next();
                            Some(q)
                        }
                        _ => None,
                    };

                    let mut key = String::new();
                    let mut closed = false;
                    while let Some(k) = chars.next() {
                        match quote {
                            Some(_) if k == '\\' => match chars.next() {
                                Some(escaped) => key.push(escaped),
                                None => break,
                            },
                            Some(q) if k == q => {
                                if chars.next() != Some(']') {
                                    return Err(invalid("expected ']' after closing quote"));
                                }
                                closed = true;
                                break;
                            }
                            None if k == ']' => {
                                closed = true;
                                break;
                            }
                            _ => key.push(k),
                        }
                    }

                    if !closed {
                        return Err(invalid("unterminated '['"));
                    }
                    if key.is_empty() && quote.is_none() {
                        return Err(invalid("empty brackets"));
                    }
                    segments.push(key);
                    after_bracket = true;
                    after_dot = false;
                }
                ']' => return Err(invalid("unexpected ']'")),
                other => {
                    if after_bracket {
                        return Err(invalid("expected '.' or '[' after ']'"));
                    }
                    current.push(other);
                    after_dot = false;
                }
            }
        }

        if after_dot {
            return Err(invalid("trailing '.'"));
        }
        if !current.is_empty() {
            segments.push(current);
        }

        Ok(Self { segments })
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this path addresses the document root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve the path against `root`, returning the object it names.
    ///
    /// Returns `None` when a segment is missing, when an intermediate value
    /// is not an object, or when the final value is not an object (arrays
    /// included).
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Map<String, Value>> {
        let mut current = root;
        for segment in &self.segments {
            current = current.as_object()?.get(segment)?;
        }
        current.as_object()
    }
}

impl FromStr for SchemaPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.is_empty() || segment.contains(['.', '[', ']']) {
                f.write_str("[\"")?;
                for c in segment.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"]")?;
            } else {
                if i > 0 {
                    f.write_str(".")?;
                }
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}
