//! Mount point identifiers.
//!
//! A mount id names the element that receives rendered output. The rules
//! follow the HTML `id` attribute: non-empty and free of ASCII whitespace.

use std::{borrow::Borrow, fmt, str::FromStr};

use super::error::DomainError;

/// Validated identifier of a mount point in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(String);

impl MountId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::validation("mount id must not be empty"));
        }
        if value.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(DomainError::validation(format!(
                "mount id `{value}` must not contain whitespace"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MountId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for MountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dom_style_ids() {
        let id = MountId::new("markdown-preview").expect("valid id");
        assert_eq!(id.as_str(), "markdown-preview");
        assert_eq!(id.to_string(), "markdown-preview");
    }

    #[test]
    fn rejects_empty_id() {
        assert!(matches!(
            MountId::new(""),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_whitespace() {
        assert!("markdown preview".parse::<MountId>().is_err());
        assert!("preview\n".parse::<MountId>().is_err());
    }
}
