//! Namespaced resource identifiers (`namespace:path`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};

/// Namespace used when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A validated `namespace:path` identifier, e.g. `minecraft:iron_ingot`.
///
/// Namespaces allow `[a-z0-9_.-]`; paths additionally allow `/`.
/// Ordering and equality follow the full `namespace:path` string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    /// Full `namespace:path` text, always containing exactly one `:`.
    full: Box<str>,
}

impl Identifier {
    /// Create an identifier from its two parts.
    pub fn new(namespace: &str, path: &str) -> ResourceResult<Self> {
        if !is_valid_namespace(namespace) || !is_valid_path(path) {
            return Err(ResourceError::MalformedIdentifier(format!(
                "{namespace}:{path}"
            )));
        }

        Ok(Self {
            full: format!("{namespace}:{path}").into_boxed_str(),
        })
    }

    /// Parse `namespace:path`, or a bare `path` in the default namespace.
    pub fn parse(text: &str) -> ResourceResult<Self> {
        match text.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, text),
        }
    }

    /// The namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.full
            .split_once(':')
            .map_or(&*self.full, |(namespace, _)| namespace)
    }

    /// The path part.
    #[must_use]
    pub fn path(&self) -> &str {
        self.full.split_once(':').map_or("", |(_, path)| path)
    }

    /// The full `namespace:path` text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '/')
        })
}

impl FromStr for Identifier {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = ResourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.full.into_string()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.full)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
