use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::DEFAULT_NAMESPACE;
use crate::error::ErrorClass;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier has an empty namespace: {0:?}")]
    EmptyNamespace(String),
    #[error("identifier has an empty path: {0:?}")]
    EmptyPath(String),
    #[error("invalid character {ch:?} in namespace of {input:?}")]
    InvalidNamespace { input: String, ch: char },
    #[error("invalid character {ch:?} in path of {input:?}")]
    InvalidPath { input: String, ch: char },
    /// Absolute, empty, `.` or `..` segment; would leave its root directory.
    #[error("identifier {0:?} is not a plain relative path")]
    UnsafeSegment(String),
}

impl IdentifierError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::DataDefect
    }
}

/// Namespaced key such as `modid:my_house`.
///
/// Used both as a registry key and as a relative output path, so the character
/// set is restricted to what is safe in a file path on every platform.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    namespace: String,
    path: String,
}

fn valid_namespace_char(ch: char) -> bool {
    matches!(ch, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

fn valid_path_char(ch: char) -> bool {
    valid_namespace_char(ch) || ch == '/'
}

fn plain_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

impl Identifier {
    pub fn new(namespace: &str, path: &str) -> Result<Self, IdentifierError> {
        let input = format!("{namespace}:{path}");
        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace(input));
        }
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath(input));
        }
        if let Some(ch) = namespace.chars().find(|c| !valid_namespace_char(*c)) {
            return Err(IdentifierError::InvalidNamespace { input, ch });
        }
        if let Some(ch) = path.chars().find(|c| !valid_path_char(*c)) {
            return Err(IdentifierError::InvalidPath { input, ch });
        }
        if !plain_segment(namespace) || !path.split('/').all(plain_segment) {
            return Err(IdentifierError::UnsafeSegment(input));
        }
        Ok(Self {
            namespace: namespace.to_owned(),
            path: path.to_owned(),
        })
    }

    /// Identifier in the default namespace.
    pub fn with_default_namespace(path: &str) -> Result<Self, IdentifierError> {
        Self::new(DEFAULT_NAMESPACE, path)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Same namespace, different path.
    pub fn with_path(&self, path: &str) -> Result<Self, IdentifierError> {
        Self::new(&self.namespace, path)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::with_default_namespace(s),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}
