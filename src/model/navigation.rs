use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::UserFacingError;

/// Identifies a resource kind within a domain, like `ec2/instances`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    pub domain: String,
    pub kind: String,
}

impl ResourceKey {
    pub fn new(domain: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.kind)
    }
}

impl FromStr for ResourceKey {
    type Err = UserFacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((domain, kind)) if !domain.trim().is_empty() && !kind.trim().is_empty() => {
                Ok(Self::new(domain.trim(), kind.trim()))
            }
            _ => Err(UserFacingError::ResourceNotFound(s.to_owned())),
        }
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = UserFacingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKey> for String {
    fn from(value: ResourceKey) -> Self {
        value.to_string()
    }
}

/// A cross-kind jump declared by a [`Navigator`](super::Navigator) for a given resource.
///
/// The host builds a new browsing surface for `target`, pre-filtered by `filter_field == filter_value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    /// Shortcut key that triggers the navigation
    pub key: char,
    /// Human label, shown on the detail view and the help line
    pub label: String,
    /// The kind to navigate to
    pub target: ResourceKey,
    /// Payload field to filter the target kind by
    pub filter_field: String,
    /// Value the field must equal
    pub filter_value: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_resource_key_parse() {
        let key: ResourceKey = " ec2/instances ".parse().unwrap();
        assert_eq!(key, ResourceKey::new("ec2", "instances"));
        assert_eq!(key.to_string(), "ec2/instances");
        assert!("ec2".parse::<ResourceKey>().is_err());
        assert!("ec2/".parse::<ResourceKey>().is_err());
    }
}
