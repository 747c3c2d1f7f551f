use std::cmp::Ordering;

use crate::{
    errors::{Result, UserFacingError},
    model::Column,
};

/// Active sort of a browsing surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortState {
    /// Index of the sorted column, `None` keeps the fetch order
    pub column: Option<usize>,
    pub ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: None,
            ascending: true,
        }
    }
}

impl SortState {
    /// Sorts by the given column, ascending
    pub fn by(column: usize) -> Self {
        Self {
            column: Some(column),
            ascending: true,
        }
    }

    /// Header label for a column, with an arrow when it's the sorted one
    pub fn header_label(&self, index: usize, name: &str) -> String {
        match self.column {
            Some(col) if col == index => format!("{name} {}", if self.ascending { '▲' } else { '▼' }),
            _ => name.to_owned(),
        }
    }
}

/// A parsed `:sort` command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortCommand {
    /// Back to the fetch order
    Clear,
    /// Sort by a column, identified by (part of) its name
    By { column: String, ascending: bool },
}

/// Parses the arguments of a `:sort` command: nothing, `<col>`, `asc <col>` or `desc <col>`
pub fn parse_sort_command(args: &str) -> Result<SortCommand> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(SortCommand::Clear);
    }
    let (first, rest) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args, ""),
    };
    let direction = match first.to_lowercase().as_str() {
        "asc" => Some(true),
        "desc" => Some(false),
        _ => None,
    };
    match direction {
        Some(_) if rest.is_empty() => Err(UserFacingError::InvalidCommand(format!("missing column after '{first}'")).into()),
        Some(ascending) => Ok(SortCommand::By {
            column: rest.to_owned(),
            ascending,
        }),
        None => Ok(SortCommand::By {
            column: args.to_owned(),
            ascending: true,
        }),
    }
}

/// Resolves a column by name: exact match first, then prefix, then substring (all case-insensitive)
pub fn resolve_column(columns: &[Column], name: &str) -> Result<usize> {
    let needle = name.trim().to_lowercase();
    let names: Vec<String> = columns.iter().map(|c| c.name.to_lowercase()).collect();
    names
        .iter()
        .position(|n| *n == needle)
        .or_else(|| names.iter().position(|n| n.starts_with(&needle)))
        .or_else(|| names.iter().position(|n| n.contains(&needle)))
        .filter(|_| !needle.is_empty())
        .ok_or_else(|| UserFacingError::UnknownColumn(name.trim().to_owned()).into())
}

/// Sorts the indices by the values of a column, stable so equal values keep their relative order.
///
/// On columns mixing value classes, numbers come first, then durations, then text (so `-` sorts after `5`).
pub fn sort_indices(indices: &mut [usize], values: &[String], ascending: bool) {
    let keys: Vec<SortKey> = values.iter().map(|v| SortKey::parse(v)).collect();
    indices.sort_by(|&a, &b| {
        let ord = keys[a].cmp(&keys[b]);
        if ascending { ord } else { ord.reverse() }
    });
}

/// Compares two rendered cell values, see [`SortKey`]
pub fn compare_values(a: &str, b: &str) -> Ordering {
    SortKey::parse(a).cmp(&SortKey::parse(b))
}

/// A rendered cell value, classified for sorting.
///
/// Numbers (optionally with a size or percent unit) compare numerically, durations by length and anything else as
/// case-insensitive text. Values of different classes are ordered numbers first, then durations, then text, so
/// placeholders like `-` sort after every number on a mixed column.
#[derive(Clone, Debug, PartialEq)]
pub enum SortKey {
    Numeric(f64),
    Duration(f64),
    Text(String),
}

impl SortKey {
    pub fn parse(value: &str) -> Self {
        if let Some(n) = parse_numeric(value) {
            SortKey::Numeric(n)
        } else if let Some(secs) = parse_duration(value) {
            SortKey::Duration(secs)
        } else {
            SortKey::Text(value.to_lowercase())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Numeric(_) => 0,
            SortKey::Duration(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Values of different classes compare by class instead of falling back to their text, which keeps the order total
/// for the stable sort
impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Numeric(a), SortKey::Numeric(b)) | (SortKey::Duration(a), SortKey::Duration(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

const SIZE_UNITS: &[(&str, f64)] = &[
    ("B", 1.0),
    ("KB", 1e3),
    ("MB", 1e6),
    ("GB", 1e9),
    ("TB", 1e12),
    ("KIB", 1024.0),
    ("MIB", 1024.0 * 1024.0),
    ("GIB", 1024.0 * 1024.0 * 1024.0),
    ("TIB", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("%", 1.0),
];

/// Parses a number with an optional size or percent unit, like `900 MiB`, `1.5GB` or `42%`
pub fn parse_numeric(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value == "-" || value.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let split = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .map(|(ix, _)| ix)
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    let unit = unit.trim().to_uppercase();
    if unit.is_empty() {
        return Some(number);
    }
    SIZE_UNITS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, factor)| number * factor)
}

/// Parses a (possibly compound) duration like `5m`, `2h30m`, `3d` or `1y`, returning the seconds
pub fn parse_duration(value: &str) -> Option<f64> {
    let value = value.trim().to_lowercase();
    let mut rest = value.as_str();
    if rest.is_empty() {
        return None;
    }
    let mut total = 0.0;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
        if digits == 0 {
            return None;
        }
        let number: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
        let unit_len = rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86_400.0,
            "w" => 7.0 * 86_400.0,
            "mo" => 30.0 * 86_400.0,
            "y" => 365.0 * 86_400.0,
            _ => return None,
        };
        total += number * seconds;
        rest = rest[unit_len..].trim_start();
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::AppError;

    fn columns() -> Vec<Column> {
        ["NAME", "STATE", "INSTANCE TYPE", "LAUNCHED"]
            .into_iter()
            .map(|n| Column::new(n, 10, |r| r.name().to_owned()))
            .collect()
    }

    #[test]
    fn test_sizes_compare_numerically() {
        assert_eq!(compare_values("1.5 GiB", "900 MiB"), Ordering::Greater);
        assert_eq!(compare_values("1 KB", "999 B"), Ordering::Greater);
        assert_eq!(compare_values("1 KiB", "1000B"), Ordering::Greater);
        assert_eq!(compare_values("10", "9"), Ordering::Greater);
        assert_eq!(compare_values("42%", "7%"), Ordering::Greater);
    }

    #[test]
    fn test_placeholders_are_not_numeric() {
        assert_eq!(parse_numeric("-"), None);
        assert_eq!(parse_numeric("N/A"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("12 parsecs"), None);
        // Text sorts after numbers
        assert_eq!(compare_values("-", "5"), Ordering::Greater);
        assert_eq!(compare_values("N/A", "1 GB"), Ordering::Greater);
    }

    #[test]
    fn test_mixed_classes_are_transitive() {
        let values: Vec<String> = ["1z", "10", "9", "-", "5m"].iter().map(|s| s.to_string()).collect();
        let mut indices = vec![0, 1, 2, 3, 4];
        sort_indices(&mut indices, &values, true);
        assert_eq!(indices, vec![2, 1, 4, 3, 0]);
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("5m"), Some(300.0));
        assert_eq!(parse_duration("2h30m"), Some(9000.0));
        assert_eq!(parse_duration("1mo"), Some(30.0 * 86_400.0));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(compare_values("3d", "23h"), Ordering::Greater);
        assert_eq!(compare_values("2w", "1mo"), Ordering::Less);
    }

    #[test]
    fn test_text_is_case_insensitive() {
        assert_eq!(compare_values("alpha", "Beta"), Ordering::Less);
        assert_eq!(compare_values("ABC", "abc"), Ordering::Equal);
    }

    #[test]
    fn test_sort_is_stable() {
        let values: Vec<String> = ["b", "a", "B", "a", "c"].iter().map(|s| s.to_string()).collect();
        let mut indices = vec![0, 1, 2, 3, 4];
        sort_indices(&mut indices, &values, true);
        assert_eq!(indices, vec![1, 3, 0, 2, 4]);
        let mut indices = vec![0, 1, 2, 3, 4];
        sort_indices(&mut indices, &values, false);
        assert_eq!(indices, vec![4, 0, 2, 1, 3]);
    }

    #[test]
    fn test_resolve_column() {
        let cols = columns();
        assert_eq!(resolve_column(&cols, "state").unwrap(), 1);
        assert_eq!(resolve_column(&cols, "inst").unwrap(), 2);
        assert_eq!(resolve_column(&cols, "type").unwrap(), 2);
        assert!(matches!(
            resolve_column(&cols, "cpu"),
            Err(AppError::UserFacing(UserFacingError::UnknownColumn(c))) if c == "cpu"
        ));
        assert!(resolve_column(&cols, " ").is_err());
    }

    #[test]
    fn test_parse_sort_command() {
        assert_eq!(parse_sort_command("").unwrap(), SortCommand::Clear);
        assert_eq!(
            parse_sort_command("desc launched").unwrap(),
            SortCommand::By {
                column: String::from("launched"),
                ascending: false
            }
        );
        assert_eq!(
            parse_sort_command("instance type").unwrap(),
            SortCommand::By {
                column: String::from("instance type"),
                ascending: true
            }
        );
        assert!(parse_sort_command("asc").is_err());
    }

    #[test]
    fn test_header_label() {
        let sort = SortState {
            column: Some(1),
            ascending: false,
        };
        assert_eq!(sort.header_label(1, "STATE"), "STATE ▼");
        assert_eq!(sort.header_label(0, "NAME"), "NAME");
        assert_eq!(SortState::by(0).header_label(0, "NAME"), "NAME ▲");
    }
}
