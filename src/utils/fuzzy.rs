/// Checks whether every char of `pattern` appears in `candidate`, in the same order but not necessarily consecutively.
///
/// The comparison is case-insensitive. An empty pattern matches any candidate, including an empty one.
///
/// # Examples
///
/// ```rust
/// # use cloudscope::utils::fuzzy_match;
/// assert!(fuzzy_match("AgentCoreStackdev", "acd"));
/// assert!(!fuzzy_match("AgentCoreStackdev", "deva"));
/// assert!(fuzzy_match("", ""));
/// ```
pub fn fuzzy_match(candidate: &str, pattern: &str) -> bool {
    let mut candidate_chars = candidate.chars().flat_map(char::to_lowercase);
    'pattern: for p in pattern.chars().flat_map(char::to_lowercase) {
        for c in candidate_chars.by_ref() {
            if c == p {
                continue 'pattern;
            }
        }
        return false;
    }
    true
}

/// Case-insensitive substring check, used by tag expressions and column name lookups
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_subsequence() {
        assert!(fuzzy_match("AgentCoreStackdev", "acd"));
        assert!(fuzzy_match("AgentCoreStackdev", "AGENT"));
        assert!(fuzzy_match("AgentCoreStackdev", "stackdev"));
        assert!(fuzzy_match("i-0abc123", "i0123"));
    }

    #[test]
    fn test_fuzzy_order_matters() {
        assert!(!fuzzy_match("AgentCoreStackdev", "deva"));
        assert!(!fuzzy_match("abc", "cba"));
    }

    #[test]
    fn test_fuzzy_empty_pattern() {
        assert!(fuzzy_match("", ""));
        assert!(fuzzy_match("anything", ""));
        assert!(!fuzzy_match("", "a"));
    }

    #[test]
    fn test_fuzzy_repeated_chars() {
        assert!(fuzzy_match("aab", "aa"));
        assert!(!fuzzy_match("ab", "aa"));
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Production", "DUCT"));
        assert!(contains_ignore_case("x", ""));
        assert!(!contains_ignore_case("staging", "prod"));
    }
}
