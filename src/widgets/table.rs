use itertools::Itertools;
use ratatui::{
    prelude::FromCrossterm,
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::{
    browser::{BrowserState, TableLayout},
    config::Theme,
    utils::{display_width, fit_width},
};

/// Renders the visible rows of a [`BrowserState`] as a table of fixed-width cells
pub struct ResourceTable<'a> {
    state: &'a mut BrowserState,
    theme: &'a Theme,
    empty_message: &'a str,
}

impl<'a> ResourceTable<'a> {
    pub fn new(state: &'a mut BrowserState, theme: &'a Theme) -> Self {
        Self {
            state,
            theme,
            empty_message: "No resources",
        }
    }

    /// Message displayed when there are no visible rows
    pub fn empty_message(mut self, message: &'a str) -> Self {
        self.empty_message = message;
        self
    }

    /// Renders the table, returning its layout so terminal rows can be mapped back to resources
    pub fn render_in(self, frame: &mut Frame, area: Rect) -> TableLayout {
        let header_rows = 1;
        let body_rows = area.height.saturating_sub(header_rows) as usize;
        let offset = self.state.scroll_to_cursor(body_rows);
        let state = &*self.state;
        let theme = self.theme;
        let line_width = area.width as usize;

        let blank = " ".repeat(display_width(&theme.highlight_symbol));
        let widths = state.columns().iter().map(|c| c.width as usize).collect::<Vec<_>>();

        let header = state
            .header_labels()
            .iter()
            .zip(&widths)
            .map(|(label, width)| fit_width(label, *width))
            .join(" ");
        let mut lines = Vec::with_capacity(body_rows + 1);
        lines.push(Line::from(Span::styled(
            fit_width(&format!("{blank}{header}"), line_width),
            Style::from_crossterm(theme.secondary).add_modifier(Modifier::BOLD),
        )));

        if state.visible_len() == 0 {
            lines.push(Line::from(Span::styled(
                format!("{blank}{}", self.empty_message),
                Style::from_crossterm(theme.comment),
            )));
        }

        let cursor = state.cursor();
        for (row, resource) in state.visible().enumerate().skip(offset).take(body_rows) {
            let selected = row == cursor;
            let style = match (selected, state.is_marked(resource)) {
                (true, true) => Style::from_crossterm(theme.highlight_primary_full()).patch(Style::from_crossterm(theme.marked)),
                (true, false) => Style::from_crossterm(theme.highlight_primary_full()),
                (false, true) => Style::from_crossterm(theme.marked),
                (false, false) => Style::from_crossterm(theme.primary),
            };
            let prefix = if selected { theme.highlight_symbol.as_str() } else { blank.as_str() };
            let cells = state
                .columns()
                .iter()
                .zip(&widths)
                .map(|(column, width)| fit_width(&column.value(resource), *width))
                .join(" ");
            lines.push(Line::from(Span::styled(
                fit_width(&format!("{prefix}{cells}"), line_width),
                style,
            )));
        }

        frame.render_widget(Paragraph::new(lines), area);

        TableLayout {
            top: area.y,
            header_rows,
            offset,
            height: area.height,
        }
    }
}
