use ratatui::{
    prelude::FromCrossterm,
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
};

use crate::config::Theme;

/// The number of ticks a status message will be displayed.
///
/// Calculated as 4 seconds * 10 ticks per second.
const STATUS_MESSAGE_DISPLAY_TICKS: u16 = 4 * 10;

/// Single-line status bar of a surface, displaying the outcome of the last operation for a short period of time.
///
/// Errors never abort the surface, they're rendered here.
pub struct StatusBar {
    info_style: Style,
    error_style: Style,
    hint_style: Style,
    message: Option<(String, bool)>,
    timeout_ticks: Option<u16>,
}

impl StatusBar {
    /// Creates a new, empty [`StatusBar`]
    pub fn empty(theme: &Theme) -> Self {
        Self {
            info_style: Style::from_crossterm(theme.accent),
            error_style: Style::from_crossterm(theme.error),
            hint_style: Style::from_crossterm(theme.comment),
            message: None,
            timeout_ticks: None,
        }
    }

    /// Sets or replaces the message, displayed temporarily
    pub fn info(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), false));
        self.timeout_ticks = Some(STATUS_MESSAGE_DISPLAY_TICKS);
    }

    /// Sets or replaces the message with an error, displayed temporarily
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Status error: {message}");
        self.message = Some((message, true));
        self.timeout_ticks = Some(STATUS_MESSAGE_DISPLAY_TICKS);
    }

    /// Clears the message
    pub fn clear(&mut self) {
        self.message = None;
        self.timeout_ticks = None;
    }

    /// The message currently displayed, and whether it's an error
    pub fn message(&self) -> Option<(&str, bool)> {
        self.message.as_ref().map(|(msg, error)| (msg.as_str(), *error))
    }

    /// Advances the state of the status bar by one tick, clearing the message once its timeout expires
    pub fn tick(&mut self) {
        if let Some(remaining_ticks) = self.timeout_ticks {
            if remaining_ticks > 0 {
                self.timeout_ticks = Some(remaining_ticks - 1);
            } else {
                self.clear();
            }
        }
    }

    /// Renders the current message on the given line, or the hint when there's none
    pub fn render_in(&self, frame: &mut Frame, area: Rect, hint: &str) {
        let line = match &self.message {
            Some((msg, true)) => Line::from(Span::styled(msg.as_str(), self.error_style)),
            Some((msg, false)) => Line::from(Span::styled(msg.as_str(), self.info_style)),
            None => Line::from(Span::styled(hint, self.hint_style)),
        };
        frame.render_widget(line, area);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_message_expires() {
        let mut status = StatusBar::empty(&Theme::default());
        status.error("boom");
        assert_eq!(status.message(), Some(("boom", true)));
        for _ in 0..STATUS_MESSAGE_DISPLAY_TICKS {
            status.tick();
        }
        assert_eq!(status.message(), Some(("boom", true)));
        status.tick();
        assert_eq!(status.message(), None);
    }

    #[test]
    fn test_message_replaced() {
        let mut status = StatusBar::empty(&Theme::default());
        status.error("boom");
        status.info("done");
        assert_eq!(status.message(), Some(("done", false)));
    }
}
