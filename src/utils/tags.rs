use std::{collections::BTreeMap, fmt};

use super::contains_ignore_case;

/// Tags attached to a resource
pub type Tags = BTreeMap<String, String>;

/// A parsed tag expression, as typed on the browser command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagExpr {
    /// `key`: the key must be present, with any value
    Exists(String),
    /// `key=value`: exact, case-sensitive value match
    Equals(String, String),
    /// `key~substring`: case-insensitive substring match on the value
    Contains(String, String),
}

impl TagExpr {
    /// Parses a tag expression, returning `None` when it's blank.
    ///
    /// The first `=` or `~` found splits the key from the value, so values may contain both characters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use cloudscope::utils::TagExpr;
    /// assert_eq!(TagExpr::parse("env"), Some(TagExpr::Exists("env".into())));
    /// assert_eq!(TagExpr::parse("env=prod"), Some(TagExpr::Equals("env".into(), "prod".into())));
    /// assert_eq!(TagExpr::parse("team~Core"), Some(TagExpr::Contains("team".into(), "Core".into())));
    /// assert_eq!(TagExpr::parse("  "), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.find(['=', '~']) {
            Some(idx) => {
                let (key, rest) = raw.split_at(idx);
                let value = rest[1..].to_owned();
                let key = key.trim().to_owned();
                if rest.starts_with('=') {
                    TagExpr::Equals(key, value)
                } else {
                    TagExpr::Contains(key, value)
                }
            }
            None => TagExpr::Exists(raw.to_owned()),
        })
    }

    /// Evaluates the expression against the given tags.
    ///
    /// Resources without tags never match.
    pub fn matches(&self, tags: Option<&Tags>) -> bool {
        let Some(tags) = tags else {
            return false;
        };
        match self {
            TagExpr::Exists(key) => tags.contains_key(key),
            TagExpr::Equals(key, value) => tags.get(key).is_some_and(|v| v == value),
            TagExpr::Contains(key, sub) => tags.get(key).is_some_and(|v| contains_ignore_case(v, sub)),
        }
    }
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagExpr::Exists(key) => write!(f, "{key}"),
            TagExpr::Equals(key, value) => write!(f, "{key}={value}"),
            TagExpr::Contains(key, sub) => write!(f, "{key}~{sub}"),
        }
    }
}
