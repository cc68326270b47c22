use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaError;
use crate::naming::MAX_IDENTIFIER_LEN;

/// Nombre de tabla/columna/índice/trigger ya validado.
///
/// Invariantes: no vacío, sin espacios en los extremos, sin NUL, a lo sumo
/// `MAX_IDENTIFIER_LEN` caracteres. El quoting lo aplica el dialecto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("empty".to_string())
        } else if name.trim() != name {
            Some("leading or trailing whitespace".to_string())
        } else if name.contains('\0') {
            Some("contains NUL".to_string())
        } else if name.chars().count() > MAX_IDENTIFIER_LEN {
            Some(format!("longer than {MAX_IDENTIFIER_LEN} characters"))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(SchemaError::InvalidIdentifier { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = SchemaError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new(" name").is_err());
        assert!(Identifier::new("a\0b").is_err());
        assert!(Identifier::new("x".repeat(65)).is_err());
        assert!(Identifier::new("x".repeat(64)).is_ok());
        assert!(Identifier::new("first name").is_ok());
    }
}
