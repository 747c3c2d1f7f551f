use chrono::{DateTime, Utc};
use serde::Deserialize;

/// How a payload value is rendered on a column
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    /// As is
    #[default]
    Text,
    /// A timestamp, rendered as the time elapsed since then (`5m`, `3h`, `2d`, `4mo`)
    Age,
    /// A number of bytes, rendered with binary units (`1.5 GiB`)
    Bytes,
    /// A ratio or percentage, rendered with a `%` suffix
    Percent,
}

impl CellFormat {
    /// Renders a raw payload value, falling back to the raw value when it can't be interpreted
    pub fn render(self, raw: &str, now: DateTime<Utc>) -> String {
        if raw.is_empty() {
            return String::from("-");
        }
        match self {
            CellFormat::Text => raw.to_owned(),
            CellFormat::Age => DateTime::parse_from_rfc3339(raw)
                .map(|ts| format_age(now.signed_duration_since(ts.with_timezone(&Utc)).num_seconds()))
                .unwrap_or_else(|_| raw.to_owned()),
            CellFormat::Bytes => raw.parse::<f64>().map(format_bytes).unwrap_or_else(|_| raw.to_owned()),
            CellFormat::Percent => raw
                .parse::<f64>()
                .map(|p| format!("{}%", trim_decimals(p)))
                .unwrap_or_else(|_| raw.to_owned()),
        }
    }
}

/// Formats an elapsed number of seconds with the largest unit that fits
pub fn format_age(seconds: i64) -> String {
    const UNITS: &[(i64, &str)] = &[
        (365 * 86_400, "y"),
        (30 * 86_400, "mo"),
        (7 * 86_400, "w"),
        (86_400, "d"),
        (3_600, "h"),
        (60, "m"),
    ];
    let seconds = seconds.max(0);
    UNITS
        .iter()
        .find(|(size, _)| seconds >= *size)
        .map(|(size, unit)| format!("{}{unit}", seconds / size))
        .unwrap_or_else(|| format!("{seconds}s"))
}

/// Formats a number of bytes with binary units
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", trim_decimals(value), UNITS[unit])
}

fn trim_decimals(value: f64) -> String {
    let rendered = format!("{value:.1}");
    rendered.strip_suffix(".0").map(String::from).unwrap_or(rendered)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_age() {
        assert_eq!(CellFormat::Age.render("2024-06-01T11:55:00Z", now()), "5m");
        assert_eq!(CellFormat::Age.render("2024-05-29T12:00:00Z", now()), "3d");
        assert_eq!(CellFormat::Age.render("2024-01-15T00:00:00Z", now()), "4mo");
        assert_eq!(CellFormat::Age.render("2024-06-01T11:59:30Z", now()), "30s");
        assert_eq!(CellFormat::Age.render("yesterday", now()), "yesterday");
        assert_eq!(CellFormat::Age.render("", now()), "-");
    }

    #[test]
    fn test_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1536.0), "1.5 KiB");
        assert_eq!(format_bytes(1610612736.0), "1.5 GiB");
        assert_eq!(CellFormat::Bytes.render("943718400", now()), "900 MiB");
    }

    #[test]
    fn test_percent() {
        assert_eq!(CellFormat::Percent.render("42", now()), "42%");
        assert_eq!(CellFormat::Percent.render("12.345", now()), "12.3%");
        assert_eq!(CellFormat::Percent.render("n/a", now()), "n/a");
    }
}
