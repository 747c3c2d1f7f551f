use std::sync::LazyLock;

use regex::Regex;

/// Regex to match `${NAME}` placeholders, with a capturing group for the name
pub static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

/// Characters that are never allowed on a value substituted into an external command
pub const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '(', ')', '{', '}', '<', '>', '\n', '\r'];

/// A piece of a command template
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart<'t> {
    /// Literal text
    Text(&'t str),
    /// A `${NAME}` placeholder, holding the name
    Placeholder(&'t str),
}

/// Splits a command template into literal text and placeholders, preserving their order.
///
/// # Examples
///
/// ```rust
/// # use cloudscope::utils::{split_template, TemplatePart};
/// assert_eq!(
///     split_template("ssh ${USER}@${HOST}"),
///     vec![
///         TemplatePart::Text("ssh "),
///         TemplatePart::Placeholder("USER"),
///         TemplatePart::Text("@"),
///         TemplatePart::Placeholder("HOST"),
///     ]
/// );
/// ```
pub fn split_template(template: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER_REGEX.captures_iter(template) {
        let (Some(full), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if full.start() > last {
            parts.push(TemplatePart::Text(&template[last..full.start()]));
        }
        parts.push(TemplatePart::Placeholder(name.as_str()));
        last = full.end();
    }
    if last < template.len() {
        parts.push(TemplatePart::Text(&template[last..]));
    }
    parts
}

/// Returns the unique placeholder names referenced by a template, in order of appearance
pub fn referenced_placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for part in split_template(template) {
        if let TemplatePart::Placeholder(name) = part
            && !names.contains(&name)
        {
            names.push(name);
        }
    }
    names
}

/// Checks whether the value contains any of the [`SHELL_METACHARACTERS`]
pub fn has_shell_metacharacters(value: &str) -> bool {
    value.contains(SHELL_METACHARACTERS)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_split_template_edges() {
        assert_eq!(split_template(""), vec![]);
        assert_eq!(split_template("${ID}"), vec![TemplatePart::Placeholder("ID")]);
        assert_eq!(
            split_template("echo $ID ${} ${ID"),
            vec![TemplatePart::Text("echo $ID ${} ${ID")]
        );
    }

    #[test]
    fn test_referenced_placeholders_unique() {
        assert_eq!(
            referenced_placeholders("${ID} ${NAME} ${ID} ${LOG_GROUP}"),
            vec!["ID", "NAME", "LOG_GROUP"]
        );
    }

    #[test]
    fn test_shell_metacharacters() {
        assert!(has_shell_metacharacters("evil; rm -rf /"));
        assert!(has_shell_metacharacters("$(whoami)"));
        assert!(has_shell_metacharacters("a\nb"));
        assert!(has_shell_metacharacters("a\rb"));
        assert!(has_shell_metacharacters("x > y"));
        assert!(!has_shell_metacharacters("i-0abc123"));
        assert!(!has_shell_metacharacters("arn:aws:iam::123:role/my-role"));
        assert!(!has_shell_metacharacters("10.0.0.1"));
    }
}
