use async_trait::async_trait;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{Frame, layout::Rect};

use tokio_util::sync::CancellationToken;

use crate::{
    action::ActionResult,
    app::Action,
    config::{Config, KeyBindingAction, KeyBindingsConfig, Theme},
    service::CloudScopeService,
};

pub mod browser;
pub mod detail;

/// Everything a surface needs to open other surfaces
#[derive(Clone)]
pub struct SurfaceContext {
    pub service: CloudScopeService,
    pub theme: Theme,
    /// Help line listing the surface key bindings
    pub help: String,
    /// Global token, cancelled when the application is exiting
    pub cancellation_token: CancellationToken,
}

impl SurfaceContext {
    pub fn new(config: &Config, service: CloudScopeService, cancellation_token: CancellationToken) -> Self {
        Self {
            service,
            theme: config.theme.clone(),
            help: config.keybindings.help_line(),
            cancellation_token,
        }
    }
}

/// Defines the behavior for a surface of the application.
///
/// Surfaces are stacked by the host: only the one on top receives events and is rendered. They're responsible for
/// rendering themselves, handling user input, and managing their internal state.
#[async_trait]
pub trait Component: Send {
    /// Retrieves the component name, for debugging purposes
    fn name(&self) -> &'static str;

    /// Allows the component to initialize any internal state or start background tasks before being displayed
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases the resources of the component when it's closed, like cancelling any in-flight fetch
    fn close(&mut self) {}

    /// Processes time-based logic, like draining the results of background tasks or expiring status messages.
    ///
    /// This method is called periodically by the application's main loop and is not directly tied to rendering or user
    /// input events.
    fn tick(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Renders the component's UI within the given `area` of the `frame`
    fn render(&mut self, frame: &mut Frame, area: Rect);

    /// Receives the result of an action triggered by this component that completed outside of it, like an external
    /// process run by the host
    fn on_action_result(&mut self, result: ActionResult) -> Result<Action> {
        let _ = result;
        Ok(Action::NoOp)
    }

    /// Processes a paste event.
    ///
    /// The default implementation will just call [`insert_text`](Component::insert_text).
    fn process_paste_event(&mut self, content: String) -> Result<Action> {
        self.insert_text(content)
    }

    /// Processes a key press event.
    ///
    /// Implementors can override this method to provide entirely custom key handling, optionally calling
    /// [`default_process_key_event`](Component::default_process_key_event) first and checking its result.
    async fn process_key_event(&mut self, keybindings: &KeyBindingsConfig, key: KeyEvent) -> Result<Action> {
        Ok(self
            .default_process_key_event(keybindings, key)
            .await?
            .unwrap_or_default())
    }

    /// The default behavior for [`process_key_event`](Component::process_key_event), checking the customizable key
    /// bindings first and then a baseline set of movement and edition keys.
    ///
    /// - If this default method returns `Ok(Some(action))`, it means the key was recognized and mapped to an `Action`.
    /// - If it returns `Ok(None)`, it means the specific key event was **not handled** by this default logic, allowing
    ///   an overriding implementation to then process it.
    async fn default_process_key_event(
        &mut self,
        keybindings: &KeyBindingsConfig,
        key: KeyEvent,
    ) -> Result<Option<Action>> {
        if let Some(action) = keybindings.get_action_matching(&key) {
            return Ok(Some(match action {
                KeyBindingAction::Quit => self.exit()?,
                KeyBindingAction::Detail => self.selection_detail()?,
                KeyBindingAction::Filter => self.start_filter()?,
                KeyBindingAction::Command => self.start_command()?,
                KeyBindingAction::Mark => self.toggle_mark()?,
                KeyBindingAction::Diff => self.diff()?,
                KeyBindingAction::LoadMore => self.load_more()?,
                KeyBindingAction::Refresh => self.refresh()?,
            }));
        }

        Ok(match key.code {
            #[cfg(debug_assertions)]
            KeyCode::Char('p') if key.modifiers == KeyModifiers::ALT => panic!("Debug panic!"),
            KeyCode::Up => Some(self.move_up(1)?),
            KeyCode::Char('k') if key.modifiers == KeyModifiers::CONTROL => Some(self.move_up(1)?),
            KeyCode::Down => Some(self.move_down(1)?),
            KeyCode::Char('j') if key.modifiers == KeyModifiers::CONTROL => Some(self.move_down(1)?),
            KeyCode::PageUp => Some(self.move_page(true)?),
            KeyCode::PageDown => Some(self.move_page(false)?),
            KeyCode::Home => Some(self.move_home()?),
            KeyCode::End => Some(self.move_end()?),
            KeyCode::Backspace => Some(self.delete()?),
            KeyCode::Char(c) if key.modifiers == KeyModifiers::NONE || key.modifiers == KeyModifiers::SHIFT => {
                Some(self.insert_char(c).await?)
            }
            _ => None,
        })
    }

    /// Processes a mouse event, if mouse capture is enabled
    fn process_mouse_event(&mut self, mouse: MouseEvent) -> Result<Action> {
        let _ = mouse;
        Ok(Action::NoOp)
    }

    /// Called when the component gains focus, including when the surface on top of it is closed
    fn focus_gained(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Called when the component loses focus
    fn focus_lost(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Handles a terminal resize event, with the new dimensions of the whole terminal
    fn resize(&mut self, width: u16, height: u16) -> Result<Action> {
        _ = (width, height);
        Ok(Action::NoOp)
    }

    /// Closes the component, by default going back to the previous surface
    fn exit(&mut self) -> Result<Action> {
        Ok(Action::Pop)
    }

    /// Moves the selection up by the given number of rows
    fn move_up(&mut self, rows: usize) -> Result<Action> {
        let _ = rows;
        Ok(Action::NoOp)
    }

    /// Moves the selection down by the given number of rows
    fn move_down(&mut self, rows: usize) -> Result<Action> {
        let _ = rows;
        Ok(Action::NoOp)
    }

    /// Moves the selection a whole page, up or down
    fn move_page(&mut self, up: bool) -> Result<Action> {
        let _ = up;
        Ok(Action::NoOp)
    }

    /// Moves the selection to the first item
    fn move_home(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Moves the selection to the last item
    fn move_end(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Handles the insertion of a block of text
    fn insert_text(&mut self, text: String) -> Result<Action> {
        _ = text;
        Ok(Action::NoOp)
    }

    /// Handles a plain character, which is either typed into an input or triggers a shortcut
    async fn insert_char(&mut self, c: char) -> Result<Action> {
        _ = c;
        Ok(Action::NoOp)
    }

    /// Handles the backspace key
    fn delete(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Opens the detail of the selected item
    fn selection_detail(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Starts typing a free-text filter
    fn start_filter(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Starts typing a command
    fn start_command(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Marks or unmarks the selected item
    fn toggle_mark(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Compares the marked item with the selected one
    fn diff(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Loads the next page of items, if any
    fn load_more(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }

    /// Fetches the items again
    fn refresh(&mut self) -> Result<Action> {
        Ok(Action::NoOp)
    }
}
