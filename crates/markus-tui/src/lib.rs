// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use markus_app::{
    Block as MarkupBlock, BlockKind, DraftEdit, FormatCommand, MarkupEditor, Note, NoteCommand,
    NoteController, NoteEvent, NoteId, NoteStatus, NoteStore, NotesState, RichTextEditor,
    StatusChange, View, filter_notes, is_dark_color, next_palette_color, parse_hex_color,
    plain_text,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

const SIDEBAR_WIDTH: u16 = 26;
const CARD_HEIGHT: u16 = 7;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailFocus {
    Title,
    Color,
    Body,
}

impl DetailFocus {
    const fn next(self) -> Self {
        match self {
            Self::Title => Self::Color,
            Self::Color => Self::Body,
            Self::Body => Self::Title,
        }
    }

    const fn prev(self) -> Self {
        match self {
            Self::Title => Self::Body,
            Self::Color => Self::Title,
            Self::Body => Self::Color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    cursor: usize,
    columns: usize,
    search_editing: bool,
    focus: DetailFocus,
    editor: Option<MarkupEditor>,
    help_visible: bool,
    status_token: u64,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            cursor: 0,
            columns: 1,
            search_editing: false,
            focus: DetailFocus::Title,
            editor: None,
            help_visible: false,
            status_token: 0,
        }
    }
}

pub fn run_app<S: NoteStore>(controller: &mut NoteController<S>) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let result = event_loop(&mut terminal, controller);

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<S: NoteStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut NoteController<S>,
) -> Result<()> {
    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let initial_view = controller.state().view;
    run_command(
        controller,
        &mut view_data,
        &internal_tx,
        NoteCommand::ChangeView(initial_view),
    );

    loop {
        process_internal_events(controller, &mut view_data, &internal_rx);

        let size = terminal.size().context("read terminal size")?;
        view_data.columns = grid_columns(size.width.saturating_sub(SIDEBAR_WIDTH));
        terminal
            .draw(|frame| render(frame, controller.state(), &view_data))
            .context("draw frame")?;

        if !event::poll(Duration::from_millis(120)).context("poll event")? {
            continue;
        }
        if let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(controller, &mut view_data, &internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                controller.clear_status();
            }
            InternalEvent::ClearStatus { .. } => {}
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

fn bump_status_token(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    controller.show_status(&message.into());
    bump_status_token(view_data, internal_tx);
}

/// Dispatches `command` and reconciles the view with the resulting state.
/// Failures land in the status line. Returns whether the command succeeded.
fn run_command<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: NoteCommand,
) -> bool {
    debug!(?command, "dispatch");
    match controller.dispatch(command) {
        Ok(events) => {
            for event in &events {
                match event {
                    NoteEvent::NoteOpened(_) => open_editor(controller.state(), view_data),
                    NoteEvent::StatusUpdated(_) => bump_status_token(view_data, internal_tx),
                    _ => {}
                }
            }
            sync_view_data(controller.state(), view_data);
            true
        }
        Err(error) => {
            emit_status(controller, view_data, internal_tx, error.to_string());
            false
        }
    }
}

fn open_editor(state: &NotesState, view_data: &mut ViewData) {
    if let Some(active) = &state.active {
        view_data.editor = Some(MarkupEditor::from_html(&active.draft.content));
        view_data.focus = DetailFocus::Title;
    }
}

fn sync_view_data(state: &NotesState, view_data: &mut ViewData) {
    if state.active.is_none() {
        view_data.editor = None;
        view_data.focus = DetailFocus::Title;
    }
    let visible = filter_notes(&state.notes, &state.search).len();
    view_data.cursor = if visible == 0 {
        0
    } else {
        view_data.cursor.min(visible - 1)
    };
}

fn handle_key_event<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if controller.state().pending.is_some() {
        handle_confirm_key(controller, view_data, internal_tx, key);
        return false;
    }

    if view_data.search_editing {
        handle_search_key(controller, view_data, internal_tx, key);
        return false;
    }

    if controller.state().active.is_some() {
        handle_detail_key(controller, view_data, internal_tx, key);
        return false;
    }

    handle_grid_key(controller, view_data, internal_tx, key);
    false
}

fn handle_confirm_key<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            run_command(controller, view_data, internal_tx, NoteCommand::Confirm);
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            run_command(controller, view_data, internal_tx, NoteCommand::Cancel);
            emit_status(controller, view_data, internal_tx, "canceled");
        }
        _ => {}
    }
}

fn handle_search_key<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let mut search = controller.state().search.clone();
    match key.code {
        KeyCode::Enter => {
            view_data.search_editing = false;
            return;
        }
        KeyCode::Esc => {
            view_data.search_editing = false;
            search.clear();
        }
        KeyCode::Backspace => {
            search.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => search.push(ch),
        _ => return,
    }
    view_data.cursor = 0;
    run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::SetSearch(search),
    );
}

fn handle_grid_key<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return;
    }

    let view = controller.state().view;
    let columns = view_data.columns.max(1);
    match key.code {
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('1') => switch_view(controller, view_data, internal_tx, View::All),
        KeyCode::Char('2') => switch_view(controller, view_data, internal_tx, View::Archived),
        KeyCode::Char('3') => switch_view(controller, view_data, internal_tx, View::Deleted),
        KeyCode::Char('f') => switch_view(controller, view_data, internal_tx, view.rotate(1)),
        KeyCode::Char('b') => switch_view(controller, view_data, internal_tx, view.rotate(-1)),
        KeyCode::Char('/') => view_data.search_editing = true,
        KeyCode::Char('s') => {
            let sort_key = controller.state().sort_key.next();
            if run_command(
                controller,
                view_data,
                internal_tx,
                NoteCommand::SetSort(sort_key),
            ) {
                emit_status(
                    controller,
                    view_data,
                    internal_tx,
                    format!("sort: {}", sort_key.label()),
                );
            }
        }
        KeyCode::Char('n') => {
            run_command(controller, view_data, internal_tx, NoteCommand::CreateNote);
        }
        KeyCode::Left | KeyCode::Char('h') => move_cursor(controller.state(), view_data, -1),
        KeyCode::Right | KeyCode::Char('l') => move_cursor(controller.state(), view_data, 1),
        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(controller.state(), view_data, -(columns as isize));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(controller.state(), view_data, columns as isize);
        }
        KeyCode::Enter => {
            if let Some(id) = current_note_id(controller.state(), view_data) {
                run_command(controller, view_data, internal_tx, NoteCommand::OpenNote(id));
            }
        }
        KeyCode::Char(' ') => {
            if let Some(id) = current_note_id(controller.state(), view_data) {
                run_command(
                    controller,
                    view_data,
                    internal_tx,
                    NoteCommand::ToggleSelect(id),
                );
            }
        }
        KeyCode::Char('A') => {
            run_command(controller, view_data, internal_tx, NoteCommand::SelectAll);
        }
        KeyCode::Esc => {
            run_command(controller, view_data, internal_tx, NoteCommand::ClearSelection);
        }
        KeyCode::Char('Z') => bulk(controller, view_data, internal_tx, NoteStatus::Archived),
        KeyCode::Char('D') => bulk(controller, view_data, internal_tx, NoteStatus::Deleted),
        KeyCode::Char(action @ ('a' | 'd' | 'r' | 'X')) => {
            note_action(controller, view_data, internal_tx, action);
        }
        _ => {}
    }
}

fn switch_view<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    view: View,
) {
    if view != controller.state().view {
        view_data.cursor = 0;
    }
    run_command(controller, view_data, internal_tx, NoteCommand::ChangeView(view));
}

fn bulk<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    status: NoteStatus,
) {
    if controller.state().selection.is_empty() {
        emit_status(
            controller,
            view_data,
            internal_tx,
            "nothing selected -- press space to select notes",
        );
        return;
    }
    run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::BulkAction(status),
    );
}

fn note_action<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: char,
) {
    let view = controller.state().view;
    let Some(change) = action_for_key(view, action) else {
        emit_status(
            controller,
            view_data,
            internal_tx,
            format!("{action} is not available in {}", view.label()),
        );
        return;
    };
    if let Some(id) = current_note_id(controller.state(), view_data) {
        run_command(
            controller,
            view_data,
            internal_tx,
            NoteCommand::SetStatus(id, change),
        );
    }
}

/// Single-note transition bound to `key` in `view`, if that action is shown
/// there.
fn action_for_key(view: View, key: char) -> Option<StatusChange> {
    match key {
        'a' if view != View::Archived => Some(StatusChange::To(NoteStatus::Archived)),
        'd' if view != View::Deleted => Some(StatusChange::To(NoteStatus::Deleted)),
        'X' if view == View::Deleted => Some(StatusChange::Permanent),
        'r' if view != View::All => Some(StatusChange::To(NoteStatus::Active)),
        _ => None,
    }
}

fn action_hints(view: View) -> &'static str {
    match view {
        View::All => "a archive  d delete",
        View::Archived => "d delete  r restore",
        View::Deleted => "a archive  X forever  r restore",
    }
}

fn current_note_id(state: &NotesState, view_data: &ViewData) -> Option<NoteId> {
    filter_notes(&state.notes, &state.search)
        .get(view_data.cursor)
        .map(|note| note.id)
}

fn move_cursor(state: &NotesState, view_data: &mut ViewData, delta: isize) {
    let len = filter_notes(&state.notes, &state.search).len();
    if len == 0 {
        view_data.cursor = 0;
        return;
    }
    let next = view_data.cursor as isize + delta;
    view_data.cursor = next.clamp(0, len as isize - 1) as usize;
}

fn handle_detail_key<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            run_command(controller, view_data, internal_tx, NoteCommand::SaveNote);
        }
        return;
    }

    if key.modifiers.contains(KeyModifiers::ALT) {
        if let KeyCode::Char(ch) = key.code
            && let Some(format) = format_for_key(controller.state(), ch)
        {
            apply_editor_format(controller, view_data, internal_tx, &format);
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            run_command(controller, view_data, internal_tx, NoteCommand::Back);
            return;
        }
        KeyCode::Tab => {
            view_data.focus = view_data.focus.next();
            return;
        }
        KeyCode::BackTab => {
            view_data.focus = view_data.focus.prev();
            return;
        }
        _ => {}
    }

    match view_data.focus {
        DetailFocus::Title => edit_title(controller, view_data, internal_tx, key),
        DetailFocus::Color => edit_color(controller, view_data, internal_tx, key),
        DetailFocus::Body => edit_body(controller, view_data, internal_tx, key),
    }
}

fn format_for_key(state: &NotesState, key: char) -> Option<FormatCommand> {
    let format = match key {
        'b' => FormatCommand::Bold,
        'i' => FormatCommand::Italic,
        'u' => FormatCommand::Underline,
        's' => FormatCommand::Strike,
        '1' => FormatCommand::Heading(1),
        '2' => FormatCommand::Heading(2),
        '3' => FormatCommand::Heading(3),
        '0' => FormatCommand::Paragraph,
        'l' => FormatCommand::BulletList,
        'c' => FormatCommand::TextColor(state.active.as_ref()?.draft.bg_color.clone()),
        _ => return None,
    };
    Some(format)
}

fn apply_editor_format<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    format: &FormatCommand,
) {
    let Some(editor) = view_data.editor.as_mut() else {
        return;
    };
    editor.apply(format);
    let html = editor.html();
    if run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::EditDraft(DraftEdit::Content(html)),
    ) {
        emit_status(controller, view_data, internal_tx, format.label());
    }
}

fn edit_title<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(active) = &controller.state().active else {
        return;
    };
    let mut title = active.draft.title.clone();
    match key.code {
        KeyCode::Char(ch) => title.push(ch),
        KeyCode::Backspace => {
            title.pop();
        }
        KeyCode::Enter => {
            view_data.focus = DetailFocus::Body;
            return;
        }
        _ => return,
    }
    run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::EditDraft(DraftEdit::Title(title)),
    );
}

fn edit_color<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(active) = &controller.state().active else {
        return;
    };
    let mut color = active.draft.bg_color.clone();
    match key.code {
        KeyCode::Left => color = next_palette_color(&color, -1).to_owned(),
        KeyCode::Right => color = next_palette_color(&color, 1).to_owned(),
        KeyCode::Char(ch) if ch == '#' || ch.is_ascii_hexdigit() => {
            if ch == '#' {
                color.clear();
            }
            color.push(ch);
        }
        KeyCode::Backspace => {
            color.pop();
        }
        KeyCode::Enter => {
            view_data.focus = DetailFocus::Body;
            return;
        }
        _ => return,
    }
    run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::EditDraft(DraftEdit::BgColor(color)),
    );
}

fn edit_body<S: NoteStore>(
    controller: &mut NoteController<S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(editor) = view_data.editor.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Char(ch) => editor.insert_char(ch),
        KeyCode::Enter => editor.newline(),
        KeyCode::Backspace => editor.backspace(),
        _ => return,
    }
    let html = editor.html();
    run_command(
        controller,
        view_data,
        internal_tx,
        NoteCommand::EditDraft(DraftEdit::Content(html)),
    );
}

/// Number of card columns that fit in `width`.
fn grid_columns(width: u16) -> usize {
    match width {
        0..50 => 1,
        50..90 => 2,
        90..130 => 3,
        _ => 4,
    }
}

fn note_colors(bg_color: &str) -> (Color, Color) {
    match parse_hex_color(bg_color) {
        Some((red, green, blue)) => {
            let fg = if is_dark_color(bg_color) {
                Color::White
            } else {
                Color::Black
            };
            (Color::Rgb(red, green, blue), fg)
        }
        None => (Color::Reset, Color::Reset),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &NotesState, view_data: &ViewData) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(rows[0]);

    let sidebar = Paragraph::new(sidebar_lines(state, view_data))
        .block(Block::default().title("markus").borders(Borders::ALL));
    frame.render_widget(sidebar, columns[0]);

    if state.active.is_some() {
        render_detail(frame, columns[1], state, view_data);
    } else {
        render_grid(frame, columns[1], state, view_data);
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, rows[1]);

    if let Some(pending) = &state.pending {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(format!(
            "{}\n\ny/enter delete forever | n/esc keep",
            pending.prompt()
        ))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("confirm")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(dialog, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .wrap(Wrap { trim: false })
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn sidebar_lines(state: &NotesState, view_data: &ViewData) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, view) in View::ALL.iter().enumerate() {
        let label = format!("{} {}", index + 1, view.label());
        if *view == state.view {
            lines.push(Line::from(Span::styled(
                format!("> {label}"),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )));
        } else {
            lines.push(Line::from(format!("  {label}")));
        }
    }
    lines.push(Line::from(""));

    let cursor = if view_data.search_editing { "_" } else { "" };
    lines.push(Line::from(format!("search: {}{cursor}", state.search)));
    lines.push(Line::from(format!("sort: {}", state.sort_key.label())));
    if !state.selection.is_empty() {
        lines.push(Line::from(format!("selected: {}", state.selection.len())));
    }
    lines
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &NotesState,
    view_data: &ViewData,
) {
    let notes = filter_notes(&state.notes, &state.search);
    if notes.is_empty() {
        let message = if state.search.is_empty() {
            format!("No notes in {}. Press n to create one.", state.view.label())
        } else {
            format!("No notes match {:?}.", state.search)
        };
        let empty = Paragraph::new(message)
            .block(Block::default().title(state.view.label()).borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }

    let columns = grid_columns(area.width);
    let visible_rows = usize::from((area.height / CARD_HEIGHT).max(1));
    let cursor = view_data.cursor.min(notes.len() - 1);
    let first_row = (cursor / columns).saturating_sub(visible_rows - 1);
    let card_width = area.width / columns as u16;

    for (index, note) in notes
        .iter()
        .enumerate()
        .skip(first_row * columns)
        .take(visible_rows * columns)
    {
        let row = (index / columns - first_row) as u16;
        let column = (index % columns) as u16;
        let card = Rect {
            x: area.x + column * card_width,
            y: area.y + row * CARD_HEIGHT,
            width: card_width,
            height: CARD_HEIGHT,
        }
        .intersection(area);
        let selected = state.selection.contains(&note.id);
        render_card(frame, card, note, state.view, selected, index == cursor);
    }
}

fn render_card(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    note: &Note,
    view: View,
    selected: bool,
    focused: bool,
) {
    let (bg, fg) = note_colors(&note.bg_color);
    let border = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(fg)
    };
    let marker = if selected { "[x]" } else { "[ ]" };
    let inner_width = usize::from(area.width.saturating_sub(2));
    let lines = vec![
        Line::from(truncate_label(&plain_text(&note.content), inner_width * 3)),
        Line::from(""),
        Line::from(format!("{marker} {}", action_hints(view))),
    ];
    let card = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(bg).fg(fg))
        .block(
            Block::default()
                .title(truncate_label(&note.title, inner_width))
                .borders(Borders::ALL)
                .border_style(border),
        );
    frame.render_widget(card, area);
}

fn render_detail(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &NotesState,
    view_data: &ViewData,
) {
    let Some(active) = &state.active else {
        return;
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let focus_style = |focus: DetailFocus| {
        if view_data.focus == focus {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let title = Paragraph::new(active.draft.title.clone()).block(
        Block::default()
            .title("title")
            .borders(Borders::ALL)
            .border_style(focus_style(DetailFocus::Title)),
    );
    frame.render_widget(title, sections[0]);

    let (bg, fg) = note_colors(&active.draft.bg_color);
    let color = Paragraph::new(Line::from(vec![
        Span::raw(format!("{} ", active.draft.bg_color)),
        Span::styled("      ", Style::default().bg(bg)),
    ]))
    .block(
        Block::default()
            .title("color (left/right)")
            .borders(Borders::ALL)
            .border_style(focus_style(DetailFocus::Color)),
    );
    frame.render_widget(color, sections[1]);

    let body_lines = view_data
        .editor
        .as_ref()
        .map(|editor| editor.blocks().iter().map(block_line).collect::<Vec<_>>())
        .unwrap_or_default();
    let body = Paragraph::new(body_lines)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(bg).fg(fg))
        .block(
            Block::default()
                .title(format!("{} | ctrl+s save | esc back", active.note.status.as_str()))
                .borders(Borders::ALL)
                .border_style(focus_style(DetailFocus::Body)),
        );
    frame.render_widget(body, sections[2]);
}

fn block_line(block: &MarkupBlock) -> Line<'static> {
    let mut style = Style::default();
    let marks = &block.marks;
    if marks.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if marks.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if marks.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if marks.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if let Some((red, green, blue)) = marks.color.as_deref().and_then(parse_hex_color) {
        style = style.fg(Color::Rgb(red, green, blue));
    }

    let prefix = match block.kind {
        BlockKind::Paragraph => String::new(),
        BlockKind::Heading(level) => {
            style = style.add_modifier(Modifier::BOLD);
            format!("{} ", "#".repeat(usize::from(level)))
        }
        BlockKind::BulletItem => "• ".to_owned(),
    };
    Line::from(vec![
        Span::raw(prefix),
        Span::styled(block.text.clone(), style),
    ])
}

fn status_text(state: &NotesState, view_data: &ViewData) -> String {
    let hints = if state.pending.is_some() {
        "y confirm | n cancel"
    } else if view_data.search_editing {
        "type to filter | enter keep | esc clear"
    } else if state.active.is_some() {
        "tab field | alt+b/i/u/s | alt+1/2/3/0 | alt+l list | alt+c color | ctrl+s save | esc back"
    } else {
        "1/2/3 b/f views | / search | s sort | n new | enter open | space select | ? help | ctrl+q"
    };
    let view = state.view.as_str().to_ascii_uppercase();
    match &state.status_line {
        Some(status) => format!("{view} | {status} | {hints}"),
        None => format!("{view} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
views: 1/2/3 all/archived/deleted | b/f prev/next | / search | s sort | n new note\n\
notes: arrows or h/j/k/l move | enter open | a archive | d delete | r restore | X delete forever\n\
selection: space toggle | A all | esc clear | Z archive selected | D delete selected\n\
detail: tab/shift+tab field | ctrl+s save | esc back\n\
format: alt+b/i/u/s marks | alt+1/2/3 heading | alt+0 paragraph | alt+l list | alt+c text color\n\
color field: left/right palette | type #rrggbb\n\
confirm: y/enter yes | n/esc no"
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out = value.chars().take(max_chars - 1).collect::<String>();
    out.push('…');
    out
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

#[cfg(test)]
mod tests {
    use super::{
        DetailFocus, InternalEvent, ViewData, action_for_key, action_hints, grid_columns,
        handle_key_event, help_overlay_text, process_internal_events, render, run_command,
        status_text, truncate_label,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use markus_app::{
        Confirmation, NoteCommand, NoteController, NoteStatus, StatusChange, View,
    };
    use markus_testkit::{MemoryStore, StoreCall, StoreOp};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    fn internal_channel() -> (
        mpsc::Sender<InternalEvent>,
        mpsc::Receiver<InternalEvent>,
    ) {
        mpsc::channel()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(value: char) -> KeyEvent {
        let modifiers = if value.is_ascii_uppercase() {
            KeyModifiers::SHIFT
        } else {
            KeyModifiers::NONE
        };
        KeyEvent::new(KeyCode::Char(value), modifiers)
    }

    fn ctrl(value: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(value), KeyModifiers::CONTROL)
    }

    fn alt(value: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(value), KeyModifiers::ALT)
    }

    struct Harness {
        controller: NoteController<MemoryStore>,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn new(notes: &[(&str, NoteStatus)]) -> Self {
            let mut store = MemoryStore::new();
            for (title, status) in notes {
                store.add_titled(title, *status);
            }
            let (tx, rx) = internal_channel();
            let mut harness = Self {
                controller: NoteController::new(store),
                view_data: ViewData {
                    columns: 2,
                    ..ViewData::default()
                },
                tx,
                rx,
            };
            assert!(run_command(
                &mut harness.controller,
                &mut harness.view_data,
                &harness.tx,
                NoteCommand::ChangeView(View::All),
            ));
            harness
        }

        fn press(&mut self, keys: &[KeyEvent]) -> bool {
            let mut quit = false;
            for key in keys {
                quit = handle_key_event(&mut self.controller, &mut self.view_data, &self.tx, *key);
                process_internal_events(&mut self.controller, &mut self.view_data, &self.rx);
            }
            quit
        }

        fn type_text(&mut self, text: &str) {
            let keys: Vec<KeyEvent> = text.chars().map(ch).collect();
            self.press(&keys);
        }

        fn titles(&self) -> Vec<String> {
            self.controller
                .visible_notes()
                .into_iter()
                .map(|note| note.title.clone())
                .collect()
        }

        fn status(&self) -> Option<&str> {
            self.controller.state().status_line.as_deref()
        }

        fn screen(&self, width: u16, height: u16) -> String {
            let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
            terminal
                .draw(|frame| render(frame, self.controller.state(), &self.view_data))
                .expect("draw");
            terminal
                .backend()
                .buffer()
                .content
                .iter()
                .map(|cell| cell.symbol())
                .collect()
        }
    }

    #[test]
    fn number_keys_switch_views() {
        let mut harness = Harness::new(&[
            ("live", NoteStatus::Active),
            ("shelved", NoteStatus::Archived),
            ("binned", NoteStatus::Deleted),
        ]);

        harness.press(&[ch('2')]);
        assert_eq!(harness.controller.state().view, View::Archived);
        assert_eq!(harness.titles(), vec!["shelved"]);

        harness.press(&[ch('3')]);
        assert_eq!(harness.titles(), vec!["binned"]);

        harness.press(&[ch('f')]);
        assert_eq!(harness.controller.state().view, View::All);
        harness.press(&[ch('b')]);
        assert_eq!(harness.controller.state().view, View::Deleted);
    }

    #[test]
    fn new_note_edit_and_save_returns_to_grid() {
        let mut harness = Harness::new(&[]);

        harness.press(&[ch('n')]);
        assert!(harness.controller.state().active.is_some());
        assert!(harness.view_data.editor.is_some());
        assert_eq!(harness.view_data.focus, DetailFocus::Title);

        harness.press(&[key(KeyCode::Backspace); 8]);
        harness.type_text("Hello");
        harness.press(&[key(KeyCode::Tab), key(KeyCode::Tab)]);
        assert_eq!(harness.view_data.focus, DetailFocus::Body);
        harness.press(&[key(KeyCode::Enter)]);
        harness.type_text("world");
        harness.press(&[ctrl('s')]);

        assert!(harness.controller.state().active.is_none());
        assert!(harness.view_data.editor.is_none());
        assert_eq!(harness.controller.state().view, View::All);
        assert_eq!(harness.titles(), vec!["Hello"]);
        let saved = &harness.controller.store().notes()[0];
        assert_eq!(saved.content, "<h1>Untitled</h1><p>world</p>");
        assert_eq!(harness.status(), Some("note saved"));
    }

    #[test]
    fn blank_title_save_reports_error_and_stays_open() {
        let mut harness = Harness::new(&[("x", NoteStatus::Active)]);
        harness.press(&[key(KeyCode::Enter), key(KeyCode::Backspace), ctrl('s')]);

        assert!(harness.controller.state().active.is_some());
        assert!(harness.status().is_some_and(|status| status.contains("title is required")));
        assert!(harness.controller.store().calls_of(StoreOp::Update).is_empty());
    }

    #[test]
    fn escape_from_detail_returns_to_previous_view() {
        let mut harness = Harness::new(&[("old", NoteStatus::Archived)]);
        harness.press(&[ch('2'), key(KeyCode::Enter)]);
        assert!(harness.controller.state().active.is_some());

        harness.type_text(" edited");
        harness.press(&[key(KeyCode::Esc)]);
        assert!(harness.controller.state().active.is_none());
        assert_eq!(harness.controller.state().view, View::Archived);
        assert_eq!(harness.titles(), vec!["old"]);
    }

    #[test]
    fn formatting_keys_update_draft_content() {
        let mut harness = Harness::new(&[("fmt", NoteStatus::Active)]);
        harness.press(&[key(KeyCode::Enter), alt('b'), alt('2')]);

        let content = harness
            .controller
            .state()
            .active
            .as_ref()
            .map(|active| active.draft.content.clone());
        assert_eq!(content.as_deref(), Some("<h2><strong>fmt</strong></h2>"));
        assert_eq!(harness.status(), Some("heading 2"));

        harness.press(&[alt('l')]);
        let content = harness
            .controller
            .state()
            .active
            .as_ref()
            .map(|active| active.draft.content.clone());
        assert_eq!(content.as_deref(), Some("<ul><li><strong>fmt</strong></li></ul>"));
    }

    #[test]
    fn color_field_cycles_palette() {
        let mut harness = Harness::new(&[("c", NoteStatus::Active)]);
        harness.press(&[key(KeyCode::Enter), key(KeyCode::Tab), key(KeyCode::Right)]);
        let color = harness
            .controller
            .state()
            .active
            .as_ref()
            .map(|active| active.draft.bg_color.clone());
        assert_eq!(color.as_deref(), Some("#fef3c7"));

        harness.press(&[ch('#'), ch('1'), ch('2'), ch('3'), ch('4'), ch('5'), ch('6')]);
        let color = harness
            .controller
            .state()
            .active
            .as_ref()
            .map(|active| active.draft.bg_color.clone());
        assert_eq!(color.as_deref(), Some("#123456"));
    }

    #[test]
    fn delete_key_moves_note_to_trash() {
        let mut harness = Harness::new(&[("a", NoteStatus::Active), ("b", NoteStatus::Active)]);
        let target = harness.controller.visible_notes()[0].id;

        harness.press(&[ch('d')]);
        assert_eq!(
            harness.controller.store().note(target).map(|note| note.status),
            Some(NoteStatus::Deleted)
        );
        assert_eq!(harness.titles().len(), 1);
        assert_eq!(harness.status(), Some("1 note moved to trash"));
    }

    #[test]
    fn actions_follow_view_visibility_rules() {
        assert_eq!(
            action_for_key(View::All, 'a'),
            Some(StatusChange::To(NoteStatus::Archived))
        );
        assert_eq!(action_for_key(View::Archived, 'a'), None);
        assert_eq!(
            action_for_key(View::Deleted, 'a'),
            Some(StatusChange::To(NoteStatus::Archived))
        );
        assert_eq!(action_for_key(View::Deleted, 'd'), None);
        assert_eq!(action_for_key(View::All, 'X'), None);
        assert_eq!(action_for_key(View::Deleted, 'X'), Some(StatusChange::Permanent));
        assert_eq!(action_for_key(View::All, 'r'), None);
        assert_eq!(
            action_for_key(View::Archived, 'r'),
            Some(StatusChange::To(NoteStatus::Active))
        );

        assert!(!action_hints(View::All).contains("restore"));
        assert!(action_hints(View::Deleted).contains("forever"));
        assert!(!action_hints(View::Archived).contains("archive"));
    }

    #[test]
    fn unavailable_action_explains_itself() {
        let mut harness = Harness::new(&[("a", NoteStatus::Active)]);
        harness.press(&[ch('X')]);
        assert_eq!(harness.status(), Some("X is not available in All Notes"));
        assert!(harness.controller.state().pending.is_none());
    }

    #[test]
    fn permanent_delete_asks_and_honours_answer() {
        let mut harness = Harness::new(&[("x", NoteStatus::Deleted), ("y", NoteStatus::Deleted)]);
        harness.press(&[ch('3')]);
        let first = harness.controller.visible_notes()[0].id;

        harness.press(&[ch('X')]);
        assert_eq!(
            harness.controller.state().pending,
            Some(Confirmation::DeleteNote(first))
        );
        let screen = harness.screen(100, 30);
        assert!(screen.contains("confirm"));

        harness.press(&[ch('n')]);
        assert!(harness.controller.state().pending.is_none());
        assert_eq!(harness.titles().len(), 2);

        harness.press(&[ch('X'), ch('y')]);
        assert!(harness.controller.store().note(first).is_none());
        assert_eq!(harness.titles().len(), 1);
    }

    #[test]
    fn confirmation_swallows_other_keys() {
        let mut harness = Harness::new(&[("x", NoteStatus::Deleted)]);
        harness.press(&[ch('3'), ch('X'), ch('1'), ch('n')]);
        assert_eq!(harness.controller.state().view, View::Deleted);
    }

    #[test]
    fn space_and_z_archive_selected_notes() {
        let mut harness = Harness::new(&[
            ("a", NoteStatus::Active),
            ("b", NoteStatus::Active),
            ("c", NoteStatus::Active),
        ]);
        harness.press(&[ch(' '), ch('l'), ch('l'), ch(' ')]);
        assert_eq!(harness.controller.state().selection.len(), 2);

        harness.press(&[ch('Z')]);
        assert_eq!(harness.titles().len(), 1);
        assert!(harness.controller.state().selection.is_empty());
        assert_eq!(harness.controller.store().calls_of(StoreOp::UpdateMany).len(), 1);
    }

    #[test]
    fn bulk_without_selection_only_reports() {
        let mut harness = Harness::new(&[("a", NoteStatus::Active)]);
        harness.press(&[ch('Z')]);
        assert!(harness.status().is_some_and(|status| status.contains("nothing selected")));
        assert!(harness.controller.store().calls_of(StoreOp::UpdateMany).is_empty());
    }

    #[test]
    fn shift_d_in_trash_purges_after_confirmation() {
        let mut harness = Harness::new(&[
            ("x", NoteStatus::Deleted),
            ("y", NoteStatus::Deleted),
            ("keep", NoteStatus::Active),
        ]);
        harness.press(&[ch('3'), ch('A'), ch('D')]);
        assert!(matches!(
            harness.controller.state().pending,
            Some(Confirmation::PurgeSelected(ref ids)) if ids.len() == 2
        ));

        harness.press(&[key(KeyCode::Enter)]);
        assert!(harness.titles().is_empty());
        assert!(
            harness
                .controller
                .store()
                .calls()
                .iter()
                .any(|call| matches!(call, StoreCall::RemoveMany(ids) if ids.len() == 2))
        );
        assert_eq!(harness.controller.store().notes().len(), 1);
    }

    #[test]
    fn escape_in_grid_clears_selection() {
        let mut harness = Harness::new(&[("a", NoteStatus::Active)]);
        harness.press(&[ch('A')]);
        assert_eq!(harness.controller.state().selection.len(), 1);
        harness.press(&[key(KeyCode::Esc)]);
        assert!(harness.controller.state().selection.is_empty());
    }

    #[test]
    fn search_filters_grid_and_clamps_cursor() {
        let mut harness = Harness::new(&[
            ("Groceries", NoteStatus::Active),
            ("Meeting", NoteStatus::Active),
            ("grocery run", NoteStatus::Active),
        ]);
        harness.press(&[ch('l'), ch('l')]);
        assert_eq!(harness.view_data.cursor, 2);

        harness.press(&[ch('/')]);
        harness.type_text("groc");
        assert!(harness.view_data.search_editing);
        assert_eq!(harness.titles().len(), 2);
        assert_eq!(harness.view_data.cursor, 0);

        harness.press(&[key(KeyCode::Enter)]);
        assert!(!harness.view_data.search_editing);
        assert_eq!(harness.controller.state().search, "groc");

        harness.press(&[ch('/'), key(KeyCode::Esc)]);
        assert_eq!(harness.controller.state().search, "");
        assert_eq!(harness.titles().len(), 3);
    }

    #[test]
    fn sort_key_cycles_and_refetches() {
        let mut harness = Harness::new(&[("b", NoteStatus::Active), ("a", NoteStatus::Active)]);
        assert_eq!(harness.titles(), vec!["a", "b"]);

        harness.press(&[ch('s')]);
        assert_eq!(harness.titles(), vec!["b", "a"]);
        assert_eq!(harness.status(), Some("sort: Oldest"));
        harness.press(&[ch('s')]);
        assert_eq!(harness.titles(), vec!["a", "b"]);
        assert_eq!(harness.status(), Some("sort: A-Z"));
    }

    #[test]
    fn cursor_moves_by_grid_rows() {
        let mut harness = Harness::new(&[
            ("1", NoteStatus::Active),
            ("2", NoteStatus::Active),
            ("3", NoteStatus::Active),
        ]);
        harness.press(&[ch('j')]);
        assert_eq!(harness.view_data.cursor, 2);
        harness.press(&[ch('j')]);
        assert_eq!(harness.view_data.cursor, 2);
        harness.press(&[ch('k'), ch('h')]);
        assert_eq!(harness.view_data.cursor, 0);
    }

    #[test]
    fn store_failure_surfaces_in_status_line() {
        let mut harness = Harness::new(&[("a", NoteStatus::Active)]);
        harness.controller.store_mut().fail_next(StoreOp::Fetch);
        harness.press(&[ch('2')]);

        assert_eq!(harness.controller.state().view, View::All);
        assert!(harness.status().is_some_and(|status| status.starts_with("store error: ")));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::new(&[]);
        harness.press(&[ch('X')]);
        let token = harness.view_data.status_token;
        assert!(harness.status().is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: token - 1 })
            .expect("send");
        process_internal_events(&mut harness.controller, &mut harness.view_data, &harness.rx);
        assert!(harness.status().is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token })
            .expect("send");
        process_internal_events(&mut harness.controller, &mut harness.view_data, &harness.rx);
        assert!(harness.status().is_none());
    }

    #[test]
    fn help_toggles_and_ctrl_q_quits() {
        let mut harness = Harness::new(&[]);
        assert!(!harness.press(&[ch('?')]));
        assert!(harness.view_data.help_visible);
        assert!(harness.screen(160, 40).contains("delete forever"));
        harness.press(&[ch('1')]);
        assert!(harness.view_data.help_visible);
        harness.press(&[key(KeyCode::Esc)]);
        assert!(!harness.view_data.help_visible);
        assert!(harness.press(&[ctrl('q')]));
        assert!(help_overlay_text().contains("alt+l"));
    }

    #[test]
    fn grid_renders_sidebar_and_cards() {
        let mut harness = Harness::new(&[
            ("Groceries", NoteStatus::Active),
            ("Standup", NoteStatus::Active),
        ]);
        harness.press(&[ch(' ')]);
        let screen = harness.screen(120, 30);
        assert!(screen.contains("All Notes"));
        assert!(screen.contains("Archived Notes"));
        assert!(screen.contains("Groceries"));
        assert!(screen.contains("Standup"));
        assert!(screen.contains("[x]"));
        assert!(screen.contains("sort: Newest"));
        assert!(screen.contains("selected: 1"));
    }

    #[test]
    fn empty_view_renders_hint() {
        let harness = Harness::new(&[]);
        assert!(harness.screen(100, 20).contains("Press n to create one"));
    }

    #[test]
    fn detail_renders_draft_fields() {
        let mut harness = Harness::new(&[("Plan", NoteStatus::Active)]);
        harness.press(&[key(KeyCode::Enter)]);
        let screen = harness.screen(100, 30);
        assert!(screen.contains("title"));
        assert!(screen.contains("#ffffff"));
        assert!(screen.contains("# Plan"));
    }

    #[test]
    fn status_text_reflects_mode() {
        let harness = Harness::new(&[("a", NoteStatus::Active)]);
        let grid = status_text(harness.controller.state(), &harness.view_data);
        assert!(grid.starts_with("ALL | "));
        assert!(grid.contains("? help"));

        let mut view_data = harness.view_data.clone();
        view_data.search_editing = true;
        assert!(status_text(harness.controller.state(), &view_data).contains("esc clear"));
    }

    #[test]
    fn grid_columns_scale_with_width() {
        assert_eq!(grid_columns(40), 1);
        assert_eq!(grid_columns(60), 2);
        assert_eq!(grid_columns(100), 3);
        assert_eq!(grid_columns(200), 4);
    }

    #[test]
    fn truncate_label_adds_ellipsis() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a longer title", 6), "a lon…");
        assert_eq!(truncate_label("x", 0), "");
    }
}
