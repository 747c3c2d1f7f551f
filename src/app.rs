use color_eyre::Result;
use crossterm::event::MouseEventKind;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    action::ExternalCommand,
    cli::CliProcess,
    component::Component,
    config::{Config, KeyBindingsConfig},
    process::{InteractiveProcess, Process, ProcessOutput},
    service::CloudScopeService,
    tui::{Event, Tui},
};

/// Represents actions that components can signal to change the application state or flow
#[derive(Default)]
pub enum Action {
    /// No-op action, nothing has to be done
    #[default]
    NoOp,
    /// Signals that the application should quit, providing the output
    Quit(ProcessOutput),
    /// Opens a new surface on top of the current one
    Push(Box<dyn Component>),
    /// Closes the current surface, going back to the previous one or quitting if it was the last
    Pop,
    /// Runs an external process with the TUI suspended, reporting its result back to the current surface
    Suspend(ExternalCommand),
}

/// The main application struct, holding the stack of surfaces and managing the application flow
pub struct App {
    cancellation_token: CancellationToken,
    views: Vec<Box<dyn Component>>,
}

impl App {
    /// Creates a new instance of the application
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            views: Vec::new(),
        }
    }

    /// Runs the process selected on the command line, returning its final [`ProcessOutput`]
    #[instrument(skip_all)]
    pub async fn run(self, config: Config, service: CloudScopeService, process: CliProcess) -> Result<ProcessOutput> {
        match process {
            CliProcess::List(list) => {
                tracing::info!("Running 'list' process");
                tracing::debug!("Options: {:?}", list);
                list.execute(config, service, self.cancellation_token).await
            }
            CliProcess::Kinds(kinds) => {
                tracing::info!("Running 'kinds' process");
                kinds.execute(config, service, self.cancellation_token).await
            }
            CliProcess::Browse(browse) => {
                tracing::info!("Running 'browse' process");
                tracing::debug!("Options: {:?}", browse);
                self.run_interactive(browse, config, service).await
            }
        }
    }

    /// Executes a process on the TUI, until every surface is closed
    async fn run_interactive(
        mut self,
        process: impl InteractiveProcess,
        config: Config,
        service: CloudScopeService,
    ) -> Result<ProcessOutput> {
        let keybindings = config.keybindings.clone();
        let component = process.into_component(config, service, self.cancellation_token.clone())?;
        if let Some(output) = self.process_action(Action::Push(component), None).await? {
            return Ok(output);
        }

        let mut tui = Tui::new(self.cancellation_token.clone())?.paste(true).mouse(true);
        tui.enter()?;

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Cancellation token received, exiting TUI loop");
                    return Ok(ProcessOutput::fail());
                }
                maybe_event = tui.next_event() => {
                    let Some(tui_event) = maybe_event else {
                        tracing::error!("TUI closed unexpectedly, no event received");
                        break;
                    };
                    let action = self.handle_tui_event(tui_event, &mut tui, &keybindings).await?;
                    if let Some(output) = self.process_action(action, Some(&mut tui)).await? {
                        return Ok(output);
                    }
                }
            }
        }

        Ok(ProcessOutput::success())
    }

    /// Handles a single TUI event by dispatching it to the surface on top of the stack
    #[instrument(skip_all)]
    async fn handle_tui_event(
        &mut self,
        event: Event,
        tui: &mut Tui,
        keybindings: &KeyBindingsConfig,
    ) -> Result<Action> {
        if event != Event::Tick
            && event != Event::Render
            && !matches!(event, Event::Mouse(m) if m.kind == MouseEventKind::Moved )
        {
            tracing::trace!("{event:?}");
        }
        let Some(view) = self.views.last_mut() else {
            return Ok(Action::Quit(ProcessOutput::success()));
        };
        Ok(match event {
            Event::Render => {
                tui.render(|frame, area| view.render(frame, area))?;
                Action::NoOp
            }
            Event::Tick => view.tick()?,
            Event::FocusGained => view.focus_gained()?,
            Event::FocusLost => view.focus_lost()?,
            Event::Resize(width, height) => view.resize(width, height)?,
            Event::Paste(content) => view.process_paste_event(content)?,
            Event::Key(key) => view.process_key_event(keybindings, key).await?,
            Event::Mouse(mouse) => view.process_mouse_event(mouse)?,
        })
    }

    /// Processes an [`Action`] returned by a surface.
    ///
    /// Returns an optional [`ProcessOutput`] if the action signals the application should exit.
    #[instrument(skip_all)]
    async fn process_action(&mut self, action: Action, tui: Option<&mut Tui>) -> Result<Option<ProcessOutput>> {
        match action {
            Action::NoOp => (),
            Action::Quit(output) => return Ok(Some(output)),
            Action::Push(mut view) => {
                tracing::debug!("Opening {}", view.name());
                view.init().await?;
                self.views.push(view);
            }
            Action::Pop => {
                if let Some(mut view) = self.views.pop() {
                    tracing::debug!("Closing {}", view.name());
                    view.close();
                }
                match self.views.last_mut() {
                    Some(view) => {
                        let next = view.focus_gained()?;
                        return Box::pin(self.process_action(next, tui)).await;
                    }
                    None => return Ok(Some(ProcessOutput::success())),
                }
            }
            Action::Suspend(command) => {
                let Some(tui) = tui else {
                    tracing::warn!("Can't run '{command}' without a TUI");
                    return Ok(None);
                };
                tui.suspend()?;
                let result = command.run().await;
                tui.resume()?;
                if let Some(view) = self.views.last_mut() {
                    let next = view.on_action_result(result)?;
                    return Box::pin(self.process_action(next, Some(tui))).await;
                }
            }
        }
        Ok(None)
    }
}
