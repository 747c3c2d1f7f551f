use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use itertools::Itertools;
use ratatui::{
    prelude::FromCrossterm,
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};

use super::{Component, SurfaceContext, detail::DetailComponent};
use crate::{
    action::{ActionDef, ActionOutcome, ActionResult, ConfirmState, FollowUp, PendingAction, policy},
    app::Action,
    browser::{BrowserState, FieldFilter, TableLayout, row_at},
    config::KeyBindingsConfig,
    errors::{self, AppError, UserFacingError},
    model::{Navigation, Page, Resource},
    service::KindHandle,
    utils::TagExpr,
    widgets::{ResourceTable, StatusBar},
};

/// The result of a task performed in the background
enum TaskEvent {
    /// A fresh first page, replacing every resource
    Replaced { generation: u64, result: errors::Result<Page> },
    /// A subsequent page, appended to the current resources
    Appended { generation: u64, result: errors::Result<Page> },
    /// An action finished running, its result is never discarded
    ActionDone {
        action: String,
        result: errors::Result<ActionOutcome>,
    },
}

/// What the user is currently typing, if anything
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    /// Editing the free-text filter, applied on every key
    Filter,
    /// Typing a command, applied on enter
    Command(String),
}

/// Commands that can be typed on a browser after the command key
#[derive(Debug, Clone, PartialEq)]
enum BrowserCommand {
    /// Close the browser
    Quit,
    /// Toggle the read-only mode
    ReadOnly,
    /// Drop the field filter the browser was opened with
    Clear,
    /// Filter by tag, or clear the tag filter when `None`
    Tag(Option<TagExpr>),
    /// Sort by a column, the raw arguments are parsed by the browser state
    Sort(String),
    /// Open a browser for another kind
    Open(String),
}

/// Parses the text typed after the command key
fn parse_command(input: &str) -> errors::Result<BrowserCommand> {
    let input = input.trim();
    let (name, args) = match input.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (input, ""),
    };
    Ok(match name {
        "" => return Err(UserFacingError::InvalidCommand(String::from("empty command")).into()),
        "q" | "quit" => BrowserCommand::Quit,
        "readonly" | "ro" => BrowserCommand::ReadOnly,
        "clear" => BrowserCommand::Clear,
        "tag" => BrowserCommand::Tag(TagExpr::parse(args)),
        "sort" => BrowserCommand::Sort(args.to_owned()),
        _ if args.is_empty() => BrowserCommand::Open(name.to_owned()),
        _ => return Err(UserFacingError::InvalidCommand(format!("unknown command '{name}'")).into()),
    })
}

/// A surface listing the resources of a single kind, on a table.
///
/// Resources are fetched in the background, page by page when the kind supports it, and the next page is requested
/// as the cursor gets close to the end of the list.
pub struct BrowserComponent {
    ctx: SurfaceContext,
    handle: KindHandle,
    state: BrowserState,
    mode: InputMode,
    confirm: ConfirmState,
    suffix_len: usize,
    status: StatusBar,
    layout: TableLayout,
    /// Token of the in-flight fetches, replaced on every refresh
    fetch_token: CancellationToken,
    /// Incremented on every refresh so late results of previous fetches are dropped
    generation: u64,
    loading: bool,
    /// Number of actions running in the background
    running_actions: usize,
    task_tx: UnboundedSender<TaskEvent>,
    task_rx: UnboundedReceiver<TaskEvent>,
}

impl BrowserComponent {
    /// Builds a new browser for the kind, optionally filtered by a field
    pub fn new(ctx: SurfaceContext, handle: KindHandle, field_filter: Option<FieldFilter>) -> Self {
        let mut columns = handle.formatter.columns();
        if let Some(metric) = handle.formatter.metric() {
            columns.push(metric.to_column());
        }
        let browser = *ctx.service.browser_config();
        let mut state = BrowserState::new(columns, handle.formatter.filter_fields(), browser.pagination_policy());
        if field_filter.is_some() {
            state.set_field_filter(field_filter);
        }
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        Self {
            status: StatusBar::empty(&ctx.theme),
            fetch_token: ctx.cancellation_token.child_token(),
            suffix_len: browser.typed_confirm_suffix_len,
            ctx,
            handle,
            state,
            mode: InputMode::Normal,
            confirm: ConfirmState::default(),
            layout: TableLayout::default(),
            generation: 0,
            loading: false,
            running_actions: 0,
            task_tx,
            task_rx,
        }
    }

    /// Displays an error on the status bar as soon as the browser is opened
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.status.error(message);
        self
    }

    /// Discards every in-flight fetch and requests the first page again
    fn spawn_refresh(&mut self) {
        self.fetch_token.cancel();
        self.fetch_token = self.ctx.cancellation_token.child_token();
        self.generation += 1;
        self.loading = true;
        // The page in flight belongs to the previous generation and will be dropped
        self.state.abort_page_load();

        let service = self.ctx.service.clone();
        let handle = self.handle.clone();
        let token = self.fetch_token.clone();
        let tx = self.task_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = service.fetch_first(&handle, &token).await;
            if tx.send(TaskEvent::Replaced { generation, result }).is_err() {
                tracing::debug!("Browser closed before the fetch completed");
            }
        });
    }

    /// Requests the next page, if there's any and none is in flight. Returns whether it was requested.
    fn spawn_next_page(&mut self, manual: bool) -> bool {
        let Some(next_token) = self.state.begin_next_page(manual) else {
            return false;
        };
        tracing::debug!(manual, "Requesting the next page of {}", self.handle.key);

        let service = self.ctx.service.clone();
        let handle = self.handle.clone();
        let token = self.fetch_token.clone();
        let tx = self.task_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = service.fetch_page(&handle, &token, next_token).await;
            if tx.send(TaskEvent::Appended { generation, result }).is_err() {
                tracing::debug!("Browser closed before the page was received");
            }
        });
        true
    }

    fn autoload(&mut self) {
        if self.state.wants_next_page() {
            self.spawn_next_page(false);
        }
    }

    /// Applies the result of a background task, returning the follow-up of finished actions
    fn apply_event(&mut self, event: TaskEvent) -> Result<Action> {
        match event {
            TaskEvent::ActionDone { action, result } => {
                self.running_actions = self.running_actions.saturating_sub(1);
                match result {
                    Ok(ActionOutcome::Done(result)) => self.on_action_result(result),
                    Ok(ActionOutcome::Suspend(command)) => Ok(Action::Suspend(command)),
                    Err(err) => self.on_action_result(ActionResult::failure(&action, &err)),
                }
            }
            fetch => {
                self.apply_fetch(fetch);
                Ok(Action::NoOp)
            }
        }
    }

    fn apply_fetch(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Replaced { generation, result } if generation == self.generation => {
                self.loading = false;
                match result {
                    Ok(page) => {
                        tracing::debug!("Received {} resources of {}", page.items.len(), self.handle.key);
                        self.state.replace_all(page.items, page.next_token);
                        self.autoload();
                    }
                    Err(err) => self.report(err),
                }
            }
            TaskEvent::Appended { generation, result } if generation == self.generation => match result {
                Ok(page) => {
                    tracing::debug!("Received a page of {} resources of {}", page.items.len(), self.handle.key);
                    self.state.append_page(page.items, page.next_token);
                    self.autoload();
                }
                Err(err) => {
                    self.state.fail_page();
                    self.report(err);
                }
            },
            _ => tracing::trace!("Dropping the result of a stale fetch"),
        }
    }

    /// Renders an error on the status bar, errors never close the surface
    fn report(&mut self, err: AppError) {
        match err {
            AppError::UserFacing(UserFacingError::Cancelled) => tracing::debug!("Fetch cancelled"),
            AppError::UserFacing(err) => self.status.error(err.to_string()),
            AppError::Unexpected(report) => {
                tracing::error!("Unexpected error on {}: {report:?}", self.handle.key);
                self.status.error(format!("Unexpected error: {report}"));
            }
        }
    }

    /// Navigations of the kind available for the resource
    fn navigations(&self, resource: &Resource) -> Vec<Navigation> {
        self.handle
            .formatter
            .as_navigator()
            .map(|n| n.navigations(resource))
            .unwrap_or_default()
    }

    /// Opens a browser for the target of the navigation, filtered by the navigation field
    fn open_navigation(&mut self, navigation: Navigation) -> Action {
        match self.ctx.service.registry().get(&navigation.target) {
            Ok(handle) => {
                tracing::info!(
                    "Navigating from {} to {} where {} = {}",
                    self.handle.key,
                    navigation.target,
                    navigation.filter_field,
                    navigation.filter_value
                );
                let filter = FieldFilter::new(navigation.filter_field, navigation.filter_value);
                Action::Push(Box::new(BrowserComponent::new(self.ctx.clone(), handle, Some(filter))))
            }
            Err(err) => {
                self.report(err);
                Action::NoOp
            }
        }
    }

    /// Checks the action can run before asking for any confirmation
    fn precheck(&self, action: &ActionDef, resource: &Resource) -> errors::Result<()> {
        policy::validate(action)?;
        if !action.applies_to(resource) {
            return Err(UserFacingError::ActionNotApplicable {
                action: action.name.clone(),
            }
            .into());
        }
        policy::check_read_only(action, self.ctx.service.executor().is_read_only())
    }

    /// Triggers an action on a resource, asking for confirmation when required
    fn trigger_action(&mut self, action: ActionDef, resource: Arc<Resource>) {
        if let Err(err) = self.precheck(&action, &resource) {
            self.report(err);
            return;
        }
        let pending = PendingAction {
            key: self.handle.key.clone(),
            action,
            resource,
        };
        if let Some(pending) = self.confirm.request(pending, self.suffix_len) {
            self.spawn_action(pending);
        }
    }

    /// Runs an accepted action in the background, its outcome is received on [`tick`](Component::tick)
    fn spawn_action(&mut self, pending: PendingAction) {
        let span = tracing::info_span!("action", action = %pending.action.name, resource = %pending.resource.id());
        self.running_actions += 1;
        self.status.info(format!("Running '{}'", pending.action.name));

        let service = self.ctx.service.clone();
        let handle = self.handle.clone();
        let token = self.ctx.cancellation_token.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(
            async move {
                let PendingAction { action, resource, .. } = pending;
                let result = service.execute_action(&handle, &action, &resource, &token).await;
                if tx
                    .send(TaskEvent::ActionDone {
                        action: action.name,
                        result,
                    })
                    .is_err()
                {
                    tracing::debug!("Browser closed before the action completed");
                }
            }
            .instrument(span),
        );
    }

    fn process_confirm_key(&mut self, key: KeyEvent) -> Result<Action> {
        let typed = matches!(self.confirm, ConfirmState::Typed { .. });
        match key.code {
            KeyCode::Esc => {
                self.confirm.cancel();
                self.status.info("Cancelled");
            }
            KeyCode::Enter | KeyCode::Char('y' | 'Y') if !typed => {
                if let Some(pending) = self.confirm.submit() {
                    self.spawn_action(pending);
                }
            }
            KeyCode::Enter => match self.confirm.submit() {
                Some(pending) => self.spawn_action(pending),
                None => self.status.error("The typed value doesn't match, try again or press esc to cancel"),
            },
            KeyCode::Backspace if typed => self.confirm.pop(),
            KeyCode::Char(c) if typed => self.confirm.push(c),
            _ if !typed => {
                self.confirm.cancel();
                self.status.info("Cancelled");
            }
            _ => (),
        }
        Ok(Action::NoOp)
    }

    fn process_filter_key(&mut self, key: KeyEvent) -> Result<Action> {
        match key.code {
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                self.state.set_text_filter("");
            }
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Up => return self.move_up(1),
            KeyCode::Down => return self.move_down(1),
            KeyCode::Backspace => {
                let mut text = self.state.filter().text.clone();
                text.pop();
                self.state.set_text_filter(text);
            }
            KeyCode::Char(c) => {
                let mut text = self.state.filter().text.clone();
                text.push(c);
                self.state.set_text_filter(text);
                self.autoload();
            }
            _ => (),
        }
        Ok(Action::NoOp)
    }

    fn process_command_key(&mut self, key: KeyEvent) -> Result<Action> {
        let InputMode::Command(input) = &mut self.mode else {
            return Ok(Action::NoOp);
        };
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Enter => {
                let input = std::mem::take(input);
                self.mode = InputMode::Normal;
                return Ok(self.run_command(&input));
            }
            KeyCode::Backspace => {
                if input.pop().is_none() {
                    self.mode = InputMode::Normal;
                }
            }
            KeyCode::Char(c) => input.push(c),
            _ => (),
        }
        Ok(Action::NoOp)
    }

    /// Runs a command typed by the user
    #[instrument(skip(self))]
    fn run_command(&mut self, input: &str) -> Action {
        let command = match parse_command(input) {
            Ok(command) => command,
            Err(err) => {
                self.report(err);
                return Action::NoOp;
            }
        };
        match command {
            BrowserCommand::Quit => return Action::Pop,
            BrowserCommand::ReadOnly => {
                let read_only = self.ctx.service.executor().toggle_read_only();
                self.status
                    .info(if read_only { "Read-only mode enabled" } else { "Read-only mode disabled" });
            }
            BrowserCommand::Clear => {
                self.state.set_field_filter(None);
                self.status.info("Field filter cleared");
            }
            BrowserCommand::Tag(expr) => {
                self.state.set_tag_filter(expr);
                self.autoload();
            }
            BrowserCommand::Sort(args) => {
                if let Err(err) = self.state.apply_sort_command(&args) {
                    self.report(err);
                }
            }
            BrowserCommand::Open(text) => match self.ctx.service.open(&text) {
                Ok(handle) => return Action::Push(Box::new(BrowserComponent::new(self.ctx.clone(), handle, None))),
                Err(err) => self.report(err),
            },
        }
        Action::NoOp
    }

    fn title(&self) -> Line<'static> {
        let theme = &self.ctx.theme;
        let mut spans = vec![
            Span::styled(format!(" {} ", self.handle.key), Style::from_crossterm(theme.accent)),
            Span::styled(
                format!("({}/{}) ", self.state.visible_len(), self.state.total()),
                Style::from_crossterm(theme.primary),
            ),
            Span::styled(self.ctx.service.selection_label(), Style::from_crossterm(theme.secondary)),
        ];
        let filter = self.state.filter();
        if let Some(field) = &filter.field {
            spans.push(Span::styled(
                format!("  {}={}", field.field, field.value),
                Style::from_crossterm(theme.comment),
            ));
        }
        if let Some(tag) = &filter.tag {
            spans.push(Span::styled(format!("  tag:{tag}"), Style::from_crossterm(theme.comment)));
        }
        if self.state.pagination().has_more {
            spans.push(Span::styled("  [more]", Style::from_crossterm(theme.secondary)));
        }
        if self.loading || self.state.pagination().is_loading_more {
            spans.push(Span::styled("  loading…", Style::from_crossterm(theme.secondary)));
        }
        if self.running_actions > 0 {
            spans.push(Span::styled(
                format!("  running {} action(s)…", self.running_actions),
                Style::from_crossterm(theme.secondary),
            ));
        }
        if self.ctx.service.executor().is_read_only() {
            spans.push(Span::styled("  [read-only]", Style::from_crossterm(theme.warning)));
        }
        Line::from(spans)
    }

    /// Shortcuts available for the selected resource
    fn shortcuts(&self) -> String {
        let Some(resource) = self.state.selected() else {
            return self.ctx.help.clone();
        };
        let actions = self
            .ctx
            .service
            .applicable_actions(&self.handle.key, resource)
            .into_iter()
            .map(|a| format!("{}: {}", a.shortcut, a.name));
        let navigations = self
            .navigations(resource)
            .into_iter()
            .map(|n| format!("{}: {}", n.key, n.label));
        actions
            .chain(navigations)
            .chain(std::iter::once(self.ctx.help.clone()))
            .join("  ")
    }
}

#[async_trait]
impl Component for BrowserComponent {
    fn name(&self) -> &'static str {
        "BrowserComponent"
    }

    async fn init(&mut self) -> Result<()> {
        self.spawn_refresh();
        Ok(())
    }

    fn close(&mut self) {
        self.fetch_token.cancel();
    }

    fn tick(&mut self) -> Result<Action> {
        self.status.tick();
        while let Ok(event) = self.task_rx.try_recv() {
            let action = self.apply_event(event)?;
            if !matches!(action, Action::NoOp) {
                // Remaining events are applied on the next tick
                return Ok(action);
            }
        }
        Ok(Action::NoOp)
    }

    #[instrument(skip_all)]
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [title_area, table_area, input_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(self.title(), title_area);

        let empty_message = if self.loading {
            "Loading…"
        } else if self.state.total() == 0 {
            "No resources found"
        } else {
            "No resources match the filters"
        };
        self.layout = ResourceTable::new(&mut self.state, &self.ctx.theme)
            .empty_message(empty_message)
            .render_in(frame, table_area);

        let theme = &self.ctx.theme;
        if let Some(prompt) = self.confirm.prompt() {
            frame.render_widget(Line::from(Span::styled(prompt, Style::from_crossterm(theme.warning))), input_area);
        } else {
            match &self.mode {
                InputMode::Filter => frame.render_widget(
                    Line::from(vec![
                        Span::styled("/", Style::from_crossterm(theme.accent)),
                        Span::styled(self.state.filter().text.clone(), Style::from_crossterm(theme.primary)),
                    ]),
                    input_area,
                ),
                InputMode::Command(input) => frame.render_widget(
                    Line::from(vec![
                        Span::styled(":", Style::from_crossterm(theme.accent)),
                        Span::styled(input.clone(), Style::from_crossterm(theme.primary)),
                    ]),
                    input_area,
                ),
                InputMode::Normal if self.state.filter().has_text() && self.status.message().is_none() => frame
                    .render_widget(
                        Line::from(Span::styled(
                            format!("/{}", self.state.filter().text),
                            Style::from_crossterm(theme.secondary),
                        )),
                        input_area,
                    ),
                InputMode::Normal => self.status.render_in(frame, input_area, ""),
            }
        }

        frame.render_widget(
            Line::from(Span::styled(self.shortcuts(), Style::from_crossterm(theme.comment))),
            help_area,
        );
    }

    fn on_action_result(&mut self, result: ActionResult) -> Result<Action> {
        if !result.success {
            self.status.error(result.status_line());
            return Ok(Action::NoOp);
        }
        self.status.info(result.status_line());
        Ok(match result.follow_up {
            Some(FollowUp::Refresh) => {
                self.spawn_refresh();
                Action::NoOp
            }
            Some(FollowUp::Back) => Action::Pop,
            Some(FollowUp::Navigate(navigation)) => self.open_navigation(navigation),
            None => Action::NoOp,
        })
    }

    fn process_paste_event(&mut self, content: String) -> Result<Action> {
        match &mut self.mode {
            InputMode::Filter => {
                let text = format!("{}{}", self.state.filter().text, content.trim());
                self.state.set_text_filter(text);
            }
            InputMode::Command(input) => input.push_str(content.trim()),
            InputMode::Normal => (),
        }
        Ok(Action::NoOp)
    }

    async fn process_key_event(&mut self, keybindings: &KeyBindingsConfig, key: KeyEvent) -> Result<Action> {
        if self.confirm.is_active() {
            return self.process_confirm_key(key);
        }
        match self.mode {
            InputMode::Normal => Ok(self
                .default_process_key_event(keybindings, key)
                .await?
                .unwrap_or_default()),
            InputMode::Filter => self.process_filter_key(key),
            InputMode::Command(_) => self.process_command_key(key),
        }
    }

    fn process_mouse_event(&mut self, mouse: MouseEvent) -> Result<Action> {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.move_down(1),
            MouseEventKind::ScrollUp => self.move_up(1),
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(row) = row_at(mouse.row, self.layout, self.state.visible_len()) {
                    self.state.select_row(row);
                    self.autoload();
                }
                Ok(Action::NoOp)
            }
            _ => Ok(Action::NoOp),
        }
    }

    fn exit(&mut self) -> Result<Action> {
        if self.state.filter().has_text() {
            self.state.set_text_filter("");
            Ok(Action::NoOp)
        } else {
            Ok(Action::Pop)
        }
    }

    fn move_up(&mut self, rows: usize) -> Result<Action> {
        self.state.move_up(rows);
        Ok(Action::NoOp)
    }

    fn move_down(&mut self, rows: usize) -> Result<Action> {
        self.state.move_down(rows);
        self.autoload();
        Ok(Action::NoOp)
    }

    fn move_page(&mut self, up: bool) -> Result<Action> {
        let rows = self.layout.body_rows().max(1);
        if up { self.move_up(rows) } else { self.move_down(rows) }
    }

    fn move_home(&mut self) -> Result<Action> {
        self.state.move_home();
        Ok(Action::NoOp)
    }

    fn move_end(&mut self) -> Result<Action> {
        self.state.move_end();
        self.autoload();
        Ok(Action::NoOp)
    }

    async fn insert_char(&mut self, c: char) -> Result<Action> {
        let key = self.handle.key.clone();
        let Some(resource) = self.state.selected().cloned() else {
            if let Some(action) = self.ctx.service.actions().bound_to(&key, c) {
                self.status.error(format!("Select a resource to run '{}'", action.name));
            }
            return Ok(Action::NoOp);
        };
        if let Some(action) = self.ctx.service.actions().find_by_shortcut(&key, c, &resource) {
            self.trigger_action(action, resource);
            return Ok(Action::NoOp);
        }
        if let Some(navigation) = self.navigations(&resource).into_iter().find(|n| n.key == c) {
            return Ok(self.open_navigation(navigation));
        }
        if let Some(action) = self.ctx.service.actions().bound_to(&key, c) {
            self.report(UserFacingError::ActionNotApplicable { action: action.name }.into());
        }
        Ok(Action::NoOp)
    }

    fn selection_detail(&mut self) -> Result<Action> {
        let Some(resource) = self.state.selected().cloned() else {
            return Ok(Action::NoOp);
        };
        Ok(Action::Push(Box::new(DetailComponent::single(
            self.ctx.clone(),
            self.handle.clone(),
            resource,
        ))))
    }

    fn start_filter(&mut self) -> Result<Action> {
        self.mode = InputMode::Filter;
        Ok(Action::NoOp)
    }

    fn start_command(&mut self) -> Result<Action> {
        self.mode = InputMode::Command(String::new());
        Ok(Action::NoOp)
    }

    fn toggle_mark(&mut self) -> Result<Action> {
        self.state.toggle_mark();
        match self.state.marked() {
            Some(marked) => self.status.info(format!("Marked {}, select another one to compare", marked.name())),
            None => self.status.info("Mark cleared"),
        }
        Ok(Action::NoOp)
    }

    fn diff(&mut self) -> Result<Action> {
        match (self.state.marked(), self.state.selected()) {
            (Some(marked), Some(selected)) if marked.id() != selected.id() => Ok(Action::Push(Box::new(
                DetailComponent::diff(self.ctx.clone(), marked.clone(), selected.clone()),
            ))),
            _ => {
                self.status.error("Mark a resource and select a different one to compare them");
                Ok(Action::NoOp)
            }
        }
    }

    fn load_more(&mut self) -> Result<Action> {
        if !self.spawn_next_page(true) {
            let pagination = self.state.pagination();
            if pagination.is_loading_more {
                self.status.info("A page is already being loaded");
            } else {
                self.status.info("There are no more pages");
            }
        }
        Ok(Action::NoOp)
    }

    fn refresh(&mut self) -> Result<Action> {
        self.spawn_refresh();
        self.status.info(format!("Refreshing {}", self.handle.key));
        Ok(Action::NoOp)
    }
}
