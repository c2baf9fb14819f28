// abc-core/src/domain/position.rs

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Source position of a YAML node (1-based line/column).
///
/// A default position (line 0) means "unknown": the value did not come from
/// a file, or the position index could not resolve it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub file: String,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            file: file.into(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }

    /// Prefix for error messages: `"file:line:col: "` or empty when unknown.
    pub fn prefix(&self) -> String {
        if self.is_known() {
            format!("{}: ", self)
        } else {
            String::new()
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_known() {
            return write!(f, "unknown position");
        }
        if self.file.is_empty() {
            write!(f, "{}:{}", self.line, self.col)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        }
    }
}

/// A scalar decoded from YAML together with its source position.
///
/// Deserialization only captures the value; positions are filled in by a
/// post-decode annotation pass (see `infrastructure::yamlpos`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spanned<T> {
    pub value: T,
    pub pos: Position,
}

impl<T> Spanned<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            pos: Position::default(),
        }
    }

    pub fn at(value: T, pos: Position) -> Self {
        Self { value, pos }
    }
}

impl Spanned<String> {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T> From<T> for Spanned<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Spanned<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Spanned<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Spanned {
            value: T::deserialize(deserializer)?,
            pos: Position::default(),
        })
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
