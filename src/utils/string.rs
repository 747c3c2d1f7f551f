use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Returns the displayed width of a string on a terminal
pub fn display_width(s: &str) -> usize {
    s.width()
}

/// Produces a line of exactly `width` displayed columns, truncating with an ellipsis or padding with spaces.
///
/// # Examples
///
/// ```rust
/// # use cloudscope::utils::fit_width;
/// assert_eq!(fit_width("abc", 5), "abc  ");
/// assert_eq!(fit_width("abcdef", 4), "abc…");
/// assert_eq!(fit_width("日本語", 4), "日… ");
/// ```
pub fn fit_width(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let current = s.width();
    if current <= width {
        let mut out = String::with_capacity(s.len() + width - current);
        out.push_str(s);
        out.extend(std::iter::repeat_n(' ', width - current));
        return out;
    }
    // Leave room for the ellipsis
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

/// Returns the last path segment of a global identifier.
///
/// Both `/` and `:` are considered separators, so `arn:aws:sqs:eu-west-1:123:orders` yields `orders` and
/// `arn:aws:ec2:eu-west-1:123:instance/i-0abc` yields `i-0abc`.
pub fn last_path_segment(identifier: &str) -> &str {
    identifier.rsplit(['/', ':']).next().unwrap_or(identifier)
}

/// Checks whether the value looks like a global identifier (an ARN)
pub fn looks_like_global_id(value: &str) -> bool {
    value.starts_with("arn:") && value.matches(':').count() >= 5
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_fit_width_exact() {
        assert_eq!(fit_width("abcd", 4), "abcd");
        assert_eq!(fit_width("abcd", 0), "");
        assert_eq!(fit_width("abcd", 1), "…");
    }

    #[test]
    fn test_fit_width_keeps_display_width() {
        for s in ["hello world", "日本語テキスト", "🚀 rockets"] {
            for w in 1..12 {
                assert_eq!(display_width(&fit_width(s, w)), w, "{s} @ {w}");
            }
        }
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("arn:aws:sqs:eu-west-1:123456789012:orders"), "orders");
        assert_eq!(
            last_path_segment("arn:aws:ec2:eu-west-1:123456789012:instance/i-0abc"),
            "i-0abc"
        );
        assert_eq!(last_path_segment("plain"), "plain");
    }

    #[test]
    fn test_looks_like_global_id() {
        assert!(looks_like_global_id("arn:aws:sqs:eu-west-1:123456789012:orders"));
        assert!(!looks_like_global_id("arn:partial"));
        assert!(!looks_like_global_id("i-0abc"));
    }
}
