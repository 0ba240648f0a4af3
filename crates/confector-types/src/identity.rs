use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::{Uuid, Variant};

use crate::error::TypeError;

/// Unique key of a property definition and of the node properties assigned to it.
///
/// An `Identifier` always wraps an RFC 4122 UUID of version 4. It is immutable;
/// equality, hashing and ordering follow the underlying UUID. The string form is
/// the canonical lowercase hyphenated UUID, which is also how identifiers appear
/// as keys in serialized nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(Uuid);

impl Identifier {
    /// Parse and validate an identifier string.
    ///
    /// Only the canonical lowercase hyphenated form is accepted, so
    /// `Identifier::parse(s)?.to_string() == s` always holds.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let uuid = Uuid::parse_str(s).map_err(|e| TypeError::InvalidIdentifier {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        if uuid.hyphenated().to_string() != s {
            return Err(TypeError::InvalidIdentifier {
                value: s.to_string(),
                reason: "expected the lowercase hyphenated UUID form".into(),
            });
        }
        Self::from_uuid(uuid).map_err(|_| TypeError::InvalidIdentifier {
            value: s.to_string(),
            reason: format!("expected UUID version 4, got version {}", uuid.get_version_num()),
        })
    }

    /// Wrap an existing UUID, rejecting anything that is not an RFC 4122 v4 UUID.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, TypeError> {
        if uuid.get_variant() != Variant::RFC4122 || uuid.get_version_num() != 4 {
            return Err(TypeError::InvalidIdentifier {
                value: uuid.to_string(),
                reason: format!(
                    "expected RFC 4122 UUID version 4, got version {}",
                    uuid.get_version_num()
                ),
            });
        }
        Ok(Self(uuid))
    }

    /// Generate a fresh random identifier, e.g. for a new property definition.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0.to_string()
    }
}

impl From<Identifier> for Uuid {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Anything that can name a property: a string to be validated, or an
/// identifier that is passed through unchanged.
pub trait IntoIdentifier {
    fn into_identifier(self) -> Result<Identifier, TypeError>;
}

impl IntoIdentifier for Identifier {
    fn into_identifier(self) -> Result<Identifier, TypeError> {
        Ok(self)
    }
}

impl IntoIdentifier for &Identifier {
    fn into_identifier(self) -> Result<Identifier, TypeError> {
        Ok(*self)
    }
}

impl IntoIdentifier for &str {
    fn into_identifier(self) -> Result<Identifier, TypeError> {
        Identifier::parse(self)
    }
}

impl IntoIdentifier for String {
    fn into_identifier(self) -> Result<Identifier, TypeError> {
        Identifier::parse(&self)
    }
}

impl IntoIdentifier for &String {
    fn into_identifier(self) -> Result<Identifier, TypeError> {
        Identifier::parse(self)
    }
}
