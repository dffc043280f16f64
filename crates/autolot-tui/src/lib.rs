// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use autolot_app::{
    AdminEditor, AppCommand, AppEvent, AppMode, AppState, DraftField, DurableStorage, Funnel,
    GalleryCursor, GalleryImage, GenerationKind, GenerationOutcome, GenerationRequest,
    HandoffPayload, Inventory, Listing, ListingId, Site, View, format_dollars, group_thousands,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const REFERENCE_PREVIEW_CHARS: usize = 56;
const THUMBNAIL_KEYS: usize = 9;

/// What happened when the runtime tried to open the messaging link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffOutcome {
    Opened { link: String },
    NotOpened { link: String, reason: String },
}

pub trait AppRuntime {
    type Storage: DurableStorage;

    fn inventory(&mut self) -> &mut Inventory<Self::Storage>;
    fn hand_off(&mut self, payload: &HandoffPayload, destination: &str) -> Result<HandoffOutcome>;
    fn generation_enabled(&self) -> bool;
    fn run_generation(&mut self, request: &GenerationRequest) -> Result<String>;
    fn spawn_generation(
        &mut self,
        request: GenerationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = match self.run_generation(&request) {
            Ok(content) => GenerationOutcome::Succeeded(content),
            Err(error) => GenerationOutcome::Failed(error.to_string()),
        };
        tx.send(InternalEvent::Generation {
            request_id: request.request_id,
            outcome,
        })
        .map_err(|_| anyhow!("generation event channel closed"))?;
        Ok(())
    }
    fn resolve_image_reference(&mut self, raw: &str) -> Result<String> {
        Ok(raw.trim().to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Generation {
        request_id: u64,
        outcome: GenerationOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    EditField(DraftField),
    AttachImage,
    RemoveImage,
    AddFeature,
    RemoveFeature,
    MessagingDestination,
}

impl PromptKind {
    fn title(self) -> String {
        match self {
            Self::Search => "search make or model".to_owned(),
            Self::EditField(field) => field.label().to_owned(),
            Self::AttachImage => "image url or file path".to_owned(),
            Self::RemoveImage => "remove image number".to_owned(),
            Self::AddFeature => "feature".to_owned(),
            Self::RemoveFeature => "remove feature number".to_owned(),
            Self::MessagingDestination => "messaging destination (phone number)".to_owned(),
        }
    }

    fn belongs_to_editor(self) -> bool {
        !matches!(self, Self::Search | Self::MessagingDestination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PromptUiState {
    kind: PromptKind,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    catalog_cursor: usize,
    editor_field: usize,
    prompt: Option<PromptUiState>,
    pending_delete: Option<ListingId>,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);
        let _ = state.selected_listing(runtime.inventory());

        let generation_enabled = runtime.generation_enabled();
        let inventory = runtime.inventory();
        if let Err(error) =
            terminal.draw(|frame| render(frame, state, inventory, &view_data, generation_enabled))
        {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(runtime.inventory(), AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Generation {
                request_id,
                outcome,
            } => dispatch(
                state,
                runtime,
                view_data,
                tx,
                AppCommand::GenerationFinished {
                    request_id,
                    outcome,
                },
            ),
        }
    }
}

/// Runs a command through the state machine and carries out the side
/// effects its events ask for.
fn dispatch<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let mut pending = VecDeque::from([command]);
    while let Some(command) = pending.pop_front() {
        for event in state.dispatch(runtime.inventory(), command) {
            match event {
                AppEvent::HandoffRequested(payload) => {
                    pending.push_back(AppCommand::SetStatus(perform_handoff(runtime, &payload)));
                }
                AppEvent::GenerationRequested(request) => {
                    let request_id = request.request_id;
                    if let Err(error) = runtime.spawn_generation(request, tx.clone()) {
                        tracing::warn!(
                            request_id,
                            error = %format!("{error:#}"),
                            "generation did not start"
                        );
                        pending.push_back(AppCommand::GenerationFinished {
                            request_id,
                            outcome: GenerationOutcome::Failed(format!("{error:#}")),
                        });
                    }
                }
                AppEvent::StatusUpdated(_) => {
                    view_data.status_token = view_data.status_token.saturating_add(1);
                    schedule_status_clear(tx, view_data.status_token);
                }
                AppEvent::ListingSaved(id) => focus_listing(state, runtime, view_data, &id),
                AppEvent::EditorOpened | AppEvent::EditorClosed => {
                    view_data.editor_field = 0;
                    if view_data
                        .prompt
                        .as_ref()
                        .is_some_and(|prompt| prompt.kind.belongs_to_editor())
                    {
                        view_data.prompt = None;
                    }
                }
                AppEvent::ListingRemoved(_) => clamp_catalog_cursor(state, runtime, view_data),
                _ => {}
            }
        }
    }
}

fn perform_handoff<R: AppRuntime>(runtime: &mut R, payload: &HandoffPayload) -> String {
    let destination = runtime.inventory().messaging().destination.clone();
    match runtime.hand_off(payload, &destination) {
        Ok(HandoffOutcome::Opened { .. }) => format!(
            "opened messaging for the {} {} visit in {}",
            payload.make,
            payload.model,
            payload.chosen_location.label()
        ),
        Ok(HandoffOutcome::NotOpened { link, reason }) => {
            format!("could not open messaging ({reason}); open {link} manually")
        }
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "messaging hand-off failed");
            format!("hand-off failed: {error:#}")
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(
        state,
        runtime,
        view_data,
        tx,
        AppCommand::SetStatus(message.into()),
    );
}

fn focus_listing<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    id: &ListingId,
) {
    if let Some(index) = state
        .visible_listings(runtime.inventory())
        .iter()
        .position(|listing| &listing.id == id)
    {
        view_data.catalog_cursor = index;
    }
}

fn clamp_catalog_cursor<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    let len = state.visible_listings(runtime.inventory()).len();
    view_data.catalog_cursor = view_data.catalog_cursor.min(len.saturating_sub(1));
}

fn cursor_listing_id<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &ViewData,
) -> Option<ListingId> {
    state
        .visible_listings(runtime.inventory())
        .get(view_data.catalog_cursor)
        .map(|listing| listing.id.clone())
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    if view_data.prompt.is_some() {
        handle_prompt_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if let Some(id) = view_data.pending_delete.take() {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::DeleteListing(id),
            );
        } else {
            emit_status(state, runtime, view_data, internal_tx, "delete cancelled");
        }
        return false;
    }

    if state.funnel.is_open() {
        handle_funnel_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.editor.is_some() {
        handle_editor_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Char('A') => {
            dispatch(state, runtime, view_data, internal_tx, AppCommand::ToggleMode);
            return false;
        }
        _ => {}
    }

    match state.view.clone() {
        View::Catalog => handle_catalog_key(state, runtime, view_data, internal_tx, key),
        View::Detail(id) => handle_detail_key(state, runtime, view_data, internal_tx, key, id),
    }
}

fn handle_catalog_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let len = state.visible_listings(runtime.inventory()).len();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            if view_data.catalog_cursor + 1 < len {
                view_data.catalog_cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.catalog_cursor = view_data.catalog_cursor.saturating_sub(1);
        }
        KeyCode::Char('g') | KeyCode::Home => view_data.catalog_cursor = 0,
        KeyCode::Char('G') | KeyCode::End => view_data.catalog_cursor = len.saturating_sub(1),
        KeyCode::Enter => {
            if let Some(id) = cursor_listing_id(state, runtime, view_data) {
                dispatch(state, runtime, view_data, tx, AppCommand::SelectListing(id));
            }
        }
        KeyCode::Char('/') => {
            view_data.prompt = Some(PromptUiState {
                kind: PromptKind::Search,
                buffer: state.search_query.clone(),
            });
        }
        KeyCode::Char('n') => dispatch(state, runtime, view_data, tx, AppCommand::StartCreate),
        KeyCode::Char('e') => {
            if let Some(id) = cursor_listing_id(state, runtime, view_data) {
                dispatch(state, runtime, view_data, tx, AppCommand::StartEdit(id));
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = cursor_listing_id(state, runtime, view_data) {
                request_delete(state, runtime, view_data, tx, id);
            }
        }
        KeyCode::Char('m') => {
            if state.mode != AppMode::Admin {
                emit_status(
                    state,
                    runtime,
                    view_data,
                    tx,
                    "switch to admin mode to change the messaging destination",
                );
            } else {
                view_data.prompt = Some(PromptUiState {
                    kind: PromptKind::MessagingDestination,
                    buffer: runtime.inventory().messaging().destination.clone(),
                });
            }
        }
        _ => {}
    }
    false
}

fn handle_detail_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    id: ListingId,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc | KeyCode::Backspace => {
            dispatch(state, runtime, view_data, tx, AppCommand::Back);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            dispatch(state, runtime, view_data, tx, AppCommand::GalleryNext);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            dispatch(state, runtime, view_data, tx, AppCommand::GalleryPrevious);
        }
        KeyCode::Char(ch @ '1'..='9') => {
            let index = (ch as usize) - ('1' as usize);
            dispatch(state, runtime, view_data, tx, AppCommand::GallerySelect(index));
        }
        KeyCode::Char('b') | KeyCode::Enter => {
            dispatch(state, runtime, view_data, tx, AppCommand::OpenFunnel);
        }
        KeyCode::Char('e') => dispatch(state, runtime, view_data, tx, AppCommand::StartEdit(id)),
        KeyCode::Char('d') => request_delete(state, runtime, view_data, tx, id),
        _ => {}
    }
    false
}

fn request_delete<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    id: ListingId,
) {
    if state.mode != AppMode::Admin {
        dispatch(state, runtime, view_data, tx, AppCommand::DeleteListing(id));
        return;
    }
    let title = runtime
        .inventory()
        .get(&id)
        .map(Listing::title)
        .unwrap_or_else(|| id.to_string());
    view_data.pending_delete = Some(id);
    emit_status(
        state,
        runtime,
        view_data,
        tx,
        format!("delete {title}? y to confirm, any other key to keep it"),
    );
}

fn handle_funnel_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match (&state.funnel, key.code) {
        (_, KeyCode::Esc) => Some(AppCommand::CancelFunnel),
        (Funnel::ConfirmDownPayment { .. }, KeyCode::Enter | KeyCode::Char('y')) => {
            Some(AppCommand::ConfirmDownPayment)
        }
        (Funnel::ConfirmDownPayment { .. }, KeyCode::Char('n')) => Some(AppCommand::CancelFunnel),
        (Funnel::ChooseLocation { .. }, KeyCode::Char('1') | KeyCode::Char('h')) => {
            Some(AppCommand::ChooseLocation(Site::Houston))
        }
        (Funnel::ChooseLocation { .. }, KeyCode::Char('2') | KeyCode::Char('d')) => {
            Some(AppCommand::ChooseLocation(Site::Dallas))
        }
        _ => None,
    };
    if let Some(command) = command {
        dispatch(state, runtime, view_data, tx, command);
    }
}

fn handle_editor_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            dispatch(state, runtime, view_data, tx, AppCommand::CommitEditor);
        }
        return;
    }

    let field_count = DraftField::ALL.len();
    match key.code {
        KeyCode::Esc => dispatch(state, runtime, view_data, tx, AppCommand::DiscardEditor),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
            view_data.editor_field = (view_data.editor_field + 1) % field_count;
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
            view_data.editor_field = (view_data.editor_field + field_count - 1) % field_count;
        }
        KeyCode::Enter => {
            let field = DraftField::ALL[view_data.editor_field];
            let buffer = state
                .editor
                .as_ref()
                .map(|editor| editor.draft().display_field(field))
                .unwrap_or_default();
            view_data.prompt = Some(PromptUiState {
                kind: PromptKind::EditField(field),
                buffer,
            });
        }
        KeyCode::Char('a') => open_empty_prompt(view_data, PromptKind::AttachImage),
        KeyCode::Char('x') => open_empty_prompt(view_data, PromptKind::RemoveImage),
        KeyCode::Char('f') => open_empty_prompt(view_data, PromptKind::AddFeature),
        KeyCode::Char('F') => open_empty_prompt(view_data, PromptKind::RemoveFeature),
        KeyCode::Char('g') => {
            request_generation(state, runtime, view_data, tx, GenerationKind::Image);
        }
        KeyCode::Char('G') => {
            request_generation(state, runtime, view_data, tx, GenerationKind::Description);
        }
        _ => {}
    }
}

fn open_empty_prompt(view_data: &mut ViewData, kind: PromptKind) {
    view_data.prompt = Some(PromptUiState {
        kind,
        buffer: String::new(),
    });
}

fn request_generation<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: GenerationKind,
) {
    if !runtime.generation_enabled() {
        emit_status(
            state,
            runtime,
            view_data,
            tx,
            "generation is disabled -- set [llm] enabled = true in the config and restart",
        );
        return;
    }
    dispatch(
        state,
        runtime,
        view_data,
        tx,
        AppCommand::RequestGeneration(kind),
    );
}

fn handle_prompt_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(prompt) = view_data.prompt.as_mut() else {
        return;
    };
    let kind = prompt.kind;
    match key.code {
        KeyCode::Esc => {
            view_data.prompt = None;
            if kind == PromptKind::Search {
                dispatch(state, runtime, view_data, tx, AppCommand::SetSearch(String::new()));
                view_data.catalog_cursor = 0;
            }
        }
        KeyCode::Enter => {
            let buffer = prompt.buffer.clone();
            submit_prompt(state, runtime, view_data, tx, kind, &buffer);
        }
        KeyCode::Backspace => {
            prompt.buffer.pop();
            if kind == PromptKind::Search {
                let query = prompt.buffer.clone();
                update_search(state, runtime, view_data, tx, query);
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            prompt.buffer.push(ch);
            if kind == PromptKind::Search {
                let query = prompt.buffer.clone();
                update_search(state, runtime, view_data, tx, query);
            }
        }
        _ => {}
    }
}

fn update_search<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    query: String,
) {
    dispatch(state, runtime, view_data, tx, AppCommand::SetSearch(query));
    view_data.catalog_cursor = 0;
}

fn submit_prompt<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: PromptKind,
    buffer: &str,
) {
    let command = match kind {
        PromptKind::Search => None,
        PromptKind::EditField(field) => match field.parse_input(buffer) {
            Ok(update) => Some(AppCommand::UpdateField(update)),
            Err(error) => {
                emit_status(state, runtime, view_data, tx, format!("{error:#}"));
                return;
            }
        },
        PromptKind::AttachImage => match runtime.resolve_image_reference(buffer) {
            Ok(reference) => Some(AppCommand::AttachImage(reference)),
            Err(error) => {
                emit_status(state, runtime, view_data, tx, format!("{error:#}"));
                return;
            }
        },
        PromptKind::RemoveImage | PromptKind::RemoveFeature => {
            let Some(position) = parse_position(buffer) else {
                emit_status(
                    state,
                    runtime,
                    view_data,
                    tx,
                    format!("{buffer:?} is not a list number -- enter 1, 2, ..."),
                );
                return;
            };
            if kind == PromptKind::RemoveImage {
                Some(AppCommand::RemoveImage(position))
            } else {
                Some(AppCommand::RemoveFeature(position))
            }
        }
        PromptKind::AddFeature => Some(AppCommand::AddFeature(buffer.to_owned())),
        PromptKind::MessagingDestination => {
            Some(AppCommand::SetMessagingDestination(buffer.to_owned()))
        }
    };

    view_data.prompt = None;
    if let Some(command) = command {
        dispatch(state, runtime, view_data, tx, command);
    }
}

/// One-based list number typed by the user, as a zero-based position.
fn parse_position(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
}

fn render<S: DurableStorage>(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    inventory: &Inventory<S>,
    view_data: &ViewData,
    generation_enabled: bool,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state, inventory)).block(
        Block::default()
            .title(format!("autolot [{}]", state.mode.label()))
            .borders(Borders::ALL),
    );
    frame.render_widget(header, layout[0]);

    let detail = match &state.view {
        View::Detail(id) => inventory.get(id),
        View::Catalog => None,
    };
    match detail {
        Some(listing) => {
            let body = Paragraph::new(render_detail_text(listing, state.gallery))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(listing.title()),
                );
            frame.render_widget(body, layout[1]);
        }
        None => render_catalog(frame, layout[1], state, inventory, view_data),
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(editor) = &state.editor {
        let area = centered_rect(80, 85, frame.area());
        frame.render_widget(Clear, area);
        let title = if editor.is_edit() {
            "edit listing"
        } else {
            "new listing"
        };
        let overlay = Paragraph::new(render_editor_text(
            editor,
            view_data.editor_field,
            generation_enabled,
        ))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(overlay, area);
    }

    if state.funnel.is_open() {
        let listing = state.funnel.listing().and_then(|id| inventory.get(id));
        let area = centered_rect(56, 40, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(render_funnel_text(&state.funnel, listing))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("book an appointment")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Green)),
            );
        frame.render_widget(overlay, area);
    }

    if let Some(prompt) = &view_data.prompt {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(render_prompt_text(prompt))
            .block(Block::default().title(prompt.kind.title()).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if view_data.help_visible {
        let area = centered_rect(76, 64, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_catalog<S: DurableStorage>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    inventory: &Inventory<S>,
    view_data: &ViewData,
) {
    let listings = state.visible_listings(inventory);
    let title = if state.search_query.is_empty() {
        format!("inventory ({})", listings.len())
    } else {
        format!(
            "inventory ({} matching {:?})",
            listings.len(),
            state.search_query
        )
    };

    if listings.is_empty() {
        let empty = Paragraph::new(empty_catalog_text(state))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(
        ["vehicle", "location", "price", "down", "miles", "status"]
            .into_iter()
            .map(Cell::from),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = listings.iter().enumerate().map(|(index, listing)| {
        let style = if index == view_data.catalog_cursor {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Row::new(catalog_cells(listing).into_iter().map(Cell::from)).style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(36),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
            Constraint::Percentage(12),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn header_text<S: DurableStorage>(state: &AppState, inventory: &Inventory<S>) -> String {
    let view = match &state.view {
        View::Catalog => "catalog".to_owned(),
        View::Detail(id) => inventory
            .get(id)
            .map(|listing| format!("catalog > {}", listing.title()))
            .unwrap_or_else(|| "catalog".to_owned()),
    };
    if state.mode == AppMode::Admin {
        format!(
            "{view} | leads go to {}",
            inventory.messaging().destination
        )
    } else {
        view
    }
}

fn empty_catalog_text(state: &AppState) -> String {
    if state.search_query.is_empty() {
        "no vehicles in inventory".to_owned()
    } else {
        format!(
            "no vehicles match {:?} -- press / to change the search",
            state.search_query
        )
    }
}

fn catalog_cells(listing: &Listing) -> [String; 6] {
    [
        format!("{} {} {}", listing.year, listing.make, listing.model),
        listing.location.label().to_owned(),
        format_dollars(listing.price_cents),
        format_dollars(listing.down_payment_cents),
        group_thousands(u64::from(listing.mileage)),
        listing.status.as_str().to_owned(),
    ]
}

fn render_detail_text(listing: &Listing, cursor: GalleryCursor) -> String {
    let mut lines = Vec::new();

    let images = &listing.image_refs;
    match cursor.current(images) {
        GalleryImage::Image(reference) => {
            lines.push(format!(
                "image {}/{}: {}",
                cursor.index() % images.len() + 1,
                images.len(),
                abbreviate_reference(reference)
            ));
            let thumbnails = (0..images.len().min(THUMBNAIL_KEYS))
                .map(|index| {
                    if index == cursor.index() % images.len() {
                        format!("[{}]", index + 1)
                    } else {
                        format!(" {} ", index + 1)
                    }
                })
                .collect::<Vec<_>>()
                .join("");
            lines.push(thumbnails);
        }
        GalleryImage::None => lines.push("no images for this vehicle".to_owned()),
    }
    lines.push(String::new());

    lines.push(format!(
        "{} {} {} | {}",
        listing.year,
        listing.make,
        listing.model,
        listing.status.as_str()
    ));
    lines.push(format!(
        "price {} | down payment {}",
        format_dollars(listing.price_cents),
        format_dollars(listing.down_payment_cents)
    ));
    lines.push(format!(
        "{} miles | {} | {} | {} | {}",
        group_thousands(u64::from(listing.mileage)),
        if listing.engine.trim().is_empty() {
            "engine n/a"
        } else {
            listing.engine.as_str()
        },
        listing.transmission.as_str(),
        listing.fuel.as_str(),
        listing.body.label()
    ));
    lines.push(format!("on the lot in {}", listing.location.label()));

    if !listing.features.is_empty() {
        lines.push(String::new());
        lines.push(format!("features: {}", listing.features.join(", ")));
    }
    if !listing.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(listing.description.trim().to_owned());
    }
    lines.push(String::new());
    lines.push("h/l photos | 1-9 jump | b book appointment | esc back".to_owned());
    lines.join("\n")
}

fn render_funnel_text(funnel: &Funnel, listing: Option<&Listing>) -> String {
    let Some(listing) = listing else {
        return "this vehicle is no longer available\n\nesc close".to_owned();
    };
    match funnel {
        Funnel::Closed => String::new(),
        Funnel::ConfirmDownPayment { .. } => format!(
            "step 1 of 2\n\n{}\nrequired down payment: {}\n\n\
             Do you have the down payment ready?\n\nenter/y yes, continue | n/esc not yet",
            listing.title(),
            format_dollars(listing.down_payment_cents)
        ),
        Funnel::ChooseLocation { .. } => format!(
            "step 2 of 2\n\n{}\nWhich lot would you like to visit?\n\n1/h {} | 2/d {} | esc cancel",
            listing.title(),
            Site::Houston.label(),
            Site::Dallas.label()
        ),
    }
}

fn render_editor_text(
    editor: &AdminEditor,
    field_index: usize,
    generation_enabled: bool,
) -> String {
    let draft = editor.draft();
    let mut lines = Vec::new();
    for (index, field) in DraftField::ALL.iter().enumerate() {
        let marker = if index == field_index { ">" } else { " " };
        let mut value = draft.display_field(*field);
        if *field == DraftField::Description {
            value = abbreviate_reference(&value);
        }
        lines.push(format!("{marker} {:<14} {value}", field.label()));
    }

    lines.push(String::new());
    if draft.image_refs().is_empty() {
        lines.push("images: none".to_owned());
    } else {
        lines.push("images:".to_owned());
        for (index, reference) in draft.image_refs().iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, abbreviate_reference(reference)));
        }
    }
    if draft.features().is_empty() {
        lines.push("features: none".to_owned());
    } else {
        lines.push(format!(
            "features: {}",
            draft
                .features()
                .iter()
                .enumerate()
                .map(|(index, feature)| format!("{}. {feature}", index + 1))
                .collect::<Vec<_>>()
                .join("  ")
        ));
    }

    lines.push(String::new());
    match (editor.generation_in_flight(), generation_enabled) {
        (Some(kind), _) => lines.push(format!("generating {}...", kind.label())),
        (None, true) => lines.push("g generate image | G generate description".to_owned()),
        (None, false) => lines.push("generation disabled".to_owned()),
    }
    if let Some(error) = editor.last_error() {
        lines.push(format!("error: {error}"));
    }
    lines.push(
        concat!(
            "j/k field | enter edit | a/x image add/remove | f/F feature add/remove | ",
            "ctrl+s save | esc discard"
        )
        .to_owned(),
    );
    lines.join("\n")
}

fn render_prompt_text(prompt: &PromptUiState) -> String {
    let hint = match prompt.kind {
        PromptKind::EditField(field) => field_options(field).unwrap_or(""),
        PromptKind::Search => "matches make or model; esc clears",
        PromptKind::AttachImage => "http(s) url, data: uri, or a local file",
        _ => "",
    };
    if hint.is_empty() {
        format!("> {}_", prompt.buffer)
    } else {
        format!("> {}_\n\n{hint}", prompt.buffer)
    }
}

fn field_options(field: DraftField) -> Option<&'static str> {
    match field {
        DraftField::Transmission => Some("automatic | manual"),
        DraftField::Fuel => Some("gasoline | diesel | electric | hybrid"),
        DraftField::Body => Some("sedan | suv | truck"),
        DraftField::Location => Some("houston | dallas"),
        DraftField::Status => Some("available | sold | reserved"),
        DraftField::Price | DraftField::DownPayment => Some("dollars, e.g. 1,300 or 1300.50"),
        _ => None,
    }
}

/// Shortens image references for a terminal cell; inline data is
/// summarized by size instead of printed.
fn abbreviate_reference(reference: &str) -> String {
    if let Some(rest) = reference.strip_prefix("data:") {
        let media = rest.split([';', ',']).next().unwrap_or("unknown");
        let payload = rest.split_once(',').map(|(_, data)| data.len()).unwrap_or(0);
        return format!("inline {media} ({payload} chars)");
    }
    if reference.chars().count() <= REFERENCE_PREVIEW_CHARS {
        return reference.to_owned();
    }
    let head = reference
        .chars()
        .take(REFERENCE_PREVIEW_CHARS - 3)
        .collect::<String>();
    format!("{head}...")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Client => "CLIENT",
        AppMode::Admin => "ADMIN",
    };
    let default = if view_data.prompt.is_some() {
        "enter accept | esc cancel"
    } else if state.funnel.is_open() {
        "follow the prompts | esc cancel"
    } else if state.editor.is_some() {
        "ctrl+s save | esc discard | ? help"
    } else {
        match (&state.view, state.mode) {
            (View::Catalog, AppMode::Client) => {
                "j/k move | enter open | / search | A admin | ? help | q quit"
            }
            (View::Catalog, AppMode::Admin) => concat!(
                "j/k move | enter open | n new | e edit | d delete | ",
                "m messaging | A client | q quit"
            ),
            (View::Detail(_), AppMode::Client) => "h/l photos | b book | esc back | ? help",
            (View::Detail(_), AppMode::Admin) => {
                "h/l photos | b book | e edit | d delete | esc back"
            }
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {default}"),
        None => format!("{mode} | {default}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help | A toggle admin mode\n\
catalog: j/k move | g/G first/last | enter open | / search | q quit\n\
catalog (admin): n new | e edit | d delete | m messaging destination\n\
detail: h/l previous/next photo | 1-9 jump to photo | b or enter book | esc back\n\
detail (admin): e edit | d delete\n\
booking: enter/y confirm down payment | 1/h Houston | 2/d Dallas | esc cancel\n\
editor: j/k field | enter edit field | a attach image | x remove image\n\
editor: f add feature | F remove feature | g generate image | G generate description\n\
editor: ctrl+s save | esc discard\n\
prompt: type | backspace | enter accept | esc cancel"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
