use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use color_eyre::Result;
use ratatui::{
    prelude::FromCrossterm,
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use serde_json::Value;

use super::{Component, SurfaceContext, browser::BrowserComponent};
use crate::{
    app::Action,
    browser::FieldFilter,
    config::Theme,
    model::{Navigation, Resource},
    service::KindHandle,
    widgets::StatusBar,
};

/// A single field that differs between two resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    /// Flattened path of the field, like `State.Name` or `Tags[0].Value`
    pub path: String,
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Flattens a JSON value into its leaf values, keyed by their path
pub fn flatten(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, path: String, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                let path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                flatten_into(value, path, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (ix, value) in items.iter().enumerate() {
                flatten_into(value, format!("{path}[{ix}]"), out);
            }
        }
        Value::String(s) => {
            out.insert(path, s.clone());
        }
        other => {
            out.insert(path, other.to_string());
        }
    }
}

/// Compares two payloads, returning the fields that differ ordered by path
pub fn diff_fields(left: &Value, right: &Value) -> Vec<FieldDiff> {
    let mut left = flatten(left);
    let mut right = flatten(right);
    let mut paths = left.keys().chain(right.keys()).cloned().collect::<Vec<_>>();
    paths.sort();
    paths.dedup();
    paths
        .into_iter()
        .filter_map(|path| {
            let l = left.remove(&path);
            let r = right.remove(&path);
            (l != r).then_some(FieldDiff { path, left: l, right: r })
        })
        .collect()
}

/// A scrollable surface with the full detail of a resource, or the differences between two of them
pub struct DetailComponent {
    ctx: SurfaceContext,
    /// Navigations available from the displayed resource, none when comparing
    navigations: Vec<Navigation>,
    title: String,
    lines: Vec<Line<'static>>,
    offset: usize,
    height: usize,
    status: StatusBar,
}

impl DetailComponent {
    /// Builds the detail of a single resource
    pub fn single(ctx: SurfaceContext, handle: KindHandle, resource: Arc<Resource>) -> Self {
        let theme = &ctx.theme;
        let navigations = handle
            .formatter
            .as_navigator()
            .map(|n| n.navigations(&resource))
            .unwrap_or_default();

        let mut lines = Vec::new();
        for field in handle.formatter.render_summary(&resource) {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", field.label), Style::from_crossterm(theme.secondary)),
                Span::styled(field.value, Style::from_crossterm(theme.primary)),
            ]));
        }
        if !navigations.is_empty() {
            lines.push(Line::default());
            for navigation in &navigations {
                lines.push(Line::from(vec![
                    Span::styled(format!("[{}] ", navigation.key), Style::from_crossterm(theme.accent)),
                    Span::styled(
                        format!(
                            "{} → {} where {} = {}",
                            navigation.label, navigation.target, navigation.filter_field, navigation.filter_value
                        ),
                        Style::from_crossterm(theme.comment),
                    ),
                ]));
            }
        }
        lines.push(Line::default());
        lines.extend(
            handle
                .formatter
                .render_detail(&resource)
                .lines()
                .map(|l| Line::from(Span::styled(l.to_owned(), Style::from_crossterm(theme.primary)))),
        );

        Self {
            status: StatusBar::empty(theme),
            title: format!(" {} › {}", handle.key, resource.name()),
            navigations,
            lines,
            offset: 0,
            height: 0,
            ctx,
        }
    }

    /// Builds the comparison of two resources of the same kind
    pub fn diff(ctx: SurfaceContext, left: Arc<Resource>, right: Arc<Resource>) -> Self {
        let diffs = diff_fields(left.raw(), right.raw());
        tracing::debug!("{} fields differ between {} and {}", diffs.len(), left.id(), right.id());
        let lines = diff_lines(&ctx.theme, &diffs);
        Self {
            status: StatusBar::empty(&ctx.theme),
            title: format!(" {} ⇄ {}", left.name(), right.name()),
            navigations: Vec::new(),
            lines,
            offset: 0,
            height: 0,
            ctx,
        }
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height.max(1))
    }
}

fn diff_lines(theme: &Theme, diffs: &[FieldDiff]) -> Vec<Line<'static>> {
    if diffs.is_empty() {
        return vec![Line::from(Span::styled("No differences", Style::from_crossterm(theme.comment)))];
    }
    let absent = || String::from("(absent)");
    diffs
        .iter()
        .map(|diff| {
            Line::from(vec![
                Span::styled(format!("{}: ", diff.path), Style::from_crossterm(theme.secondary)),
                Span::styled(diff.left.clone().unwrap_or_else(absent), Style::from_crossterm(theme.error)),
                Span::styled(" → ", Style::from_crossterm(theme.comment)),
                Span::styled(diff.right.clone().unwrap_or_else(absent), Style::from_crossterm(theme.accent)),
            ])
        })
        .collect()
}

#[async_trait]
impl Component for DetailComponent {
    fn name(&self) -> &'static str {
        "DetailComponent"
    }

    fn tick(&mut self) -> Result<Action> {
        self.status.tick();
        Ok(Action::NoOp)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [title_area, body_area, status_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)]).areas(area);
        self.height = body_area.height as usize;
        self.offset = self.offset.min(self.max_offset());

        let theme = &self.ctx.theme;
        frame.render_widget(
            Line::from(Span::styled(self.title.as_str(), Style::from_crossterm(theme.accent))),
            title_area,
        );
        let visible = self
            .lines
            .iter()
            .skip(self.offset)
            .take(self.height)
            .cloned()
            .collect::<Vec<_>>();
        frame.render_widget(Paragraph::new(visible), body_area);
        self.status.render_in(frame, status_area, &self.ctx.help);
    }

    fn move_up(&mut self, rows: usize) -> Result<Action> {
        self.offset = self.offset.saturating_sub(rows);
        Ok(Action::NoOp)
    }

    fn move_down(&mut self, rows: usize) -> Result<Action> {
        self.offset = (self.offset + rows).min(self.max_offset());
        Ok(Action::NoOp)
    }

    fn move_page(&mut self, up: bool) -> Result<Action> {
        let rows = self.height.max(1);
        if up { self.move_up(rows) } else { self.move_down(rows) }
    }

    fn move_home(&mut self) -> Result<Action> {
        self.offset = 0;
        Ok(Action::NoOp)
    }

    fn move_end(&mut self) -> Result<Action> {
        self.offset = self.max_offset();
        Ok(Action::NoOp)
    }

    async fn insert_char(&mut self, c: char) -> Result<Action> {
        let Some(navigation) = self.navigations.iter().find(|n| n.key == c).cloned() else {
            return Ok(Action::NoOp);
        };
        match self.ctx.service.registry().get(&navigation.target) {
            Ok(handle) => {
                let filter = FieldFilter::new(navigation.filter_field, navigation.filter_value);
                Ok(Action::Push(Box::new(BrowserComponent::new(
                    self.ctx.clone(),
                    handle,
                    Some(filter),
                ))))
            }
            Err(err) => {
                self.status.error(err.to_status_line());
                Ok(Action::NoOp)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{catalog::demo_service, config::Config};

    #[test]
    fn test_flatten() {
        let flat = flatten(&json!({
            "State": { "Name": "running", "Code": 16 },
            "Tags": [{ "Key": "env", "Value": "dev" }],
            "Empty": {},
            "Missing": null
        }));
        assert_eq!(flat.get("State.Name").map(String::as_str), Some("running"));
        assert_eq!(flat.get("State.Code").map(String::as_str), Some("16"));
        assert_eq!(flat.get("Tags[0].Value").map(String::as_str), Some("dev"));
        assert_eq!(flat.get("Empty").map(String::as_str), Some("{}"));
        assert_eq!(flat.get("Missing").map(String::as_str), Some("null"));
    }

    #[test]
    fn test_diff_fields() {
        let left = json!({ "Id": "a", "State": { "Name": "running" }, "Only": 1 });
        let right = json!({ "Id": "b", "State": { "Name": "running" }, "Extra": true });
        assert_eq!(
            diff_fields(&left, &right),
            vec![
                FieldDiff {
                    path: String::from("Extra"),
                    left: None,
                    right: Some(String::from("true")),
                },
                FieldDiff {
                    path: String::from("Id"),
                    left: Some(String::from("a")),
                    right: Some(String::from("b")),
                },
                FieldDiff {
                    path: String::from("Only"),
                    left: Some(String::from("1")),
                    right: None,
                },
            ]
        );
        assert!(diff_fields(&left, &left).is_empty());
    }

    #[tokio::test]
    async fn test_navigation_from_detail() {
        let service = demo_service(false);
        let handle = service.open("ec2/instances").unwrap();
        let resource = service
            .fetch_first(&handle, &CancellationToken::new())
            .await
            .unwrap()
            .items
            .into_iter()
            .find(|r| !r.field_str("VpcId").is_empty())
            .unwrap()
            .shared();
        let ctx = SurfaceContext::new(&Config::default(), service, CancellationToken::new());
        let mut detail = DetailComponent::single(ctx, handle, resource);

        assert!(matches!(detail.insert_char('v').await.unwrap(), Action::Push(_)));
        assert!(matches!(detail.insert_char('?').await.unwrap(), Action::NoOp));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let service = demo_service(false);
        let ctx = SurfaceContext::new(&Config::default(), service, CancellationToken::new());
        let left = Resource::new("a").with_raw(json!({ "A": 1, "B": 2, "C": 3 })).shared();
        let right = Resource::new("b").with_raw(json!({ "A": 2, "B": 3, "C": 4 })).shared();
        let mut detail = DetailComponent::diff(ctx, left, right);
        detail.height = 2;
        detail.move_end().unwrap();
        assert_eq!(detail.offset, 1);
        detail.move_down(10).unwrap();
        assert_eq!(detail.offset, 1);
        detail.move_page(true).unwrap();
        assert_eq!(detail.offset, 0);
    }
}
