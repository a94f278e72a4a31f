use std::{
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tally_core::{
    models::MAX_NAME_LEN,
    notify::{self, NotificationReceiver},
    AddPlayerRejected, AppConfig, GameRecord, Notification, PlayerId, RecordId, ScoreEngine,
    MAX_PLAYERS,
};
use tokio::{spawn, sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_SCORE_INPUT_LEN: usize = 9;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Table,
    AddPlayer,
    EditScore,
}

#[derive(Debug, Clone, Default)]
struct NamePromptModal {
    input: String,
    cursor: usize,
}

impl NamePromptModal {
    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if self.char_len() >= MAX_NAME_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index();
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index();
        self.input.remove(idx);
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }
}

/// Pending text for the score cell under the cursor.
#[derive(Debug, Clone)]
struct ScoreEdit {
    player: PlayerId,
    round_index: usize,
    input: String,
}

impl ScoreEdit {
    fn new(player: PlayerId, round_index: usize) -> Self {
        Self {
            player,
            round_index,
            input: String::new(),
        }
    }

    fn push(&mut self, ch: char) {
        if self.input.len() >= MAX_SCORE_INPUT_LEN {
            return;
        }
        let sign_allowed = self.input.is_empty() && matches!(ch, '-' | '+');
        if ch.is_ascii_digit() || sign_allowed {
            self.input.push(ch);
        }
    }

    fn backspace(&mut self) {
        self.input.pop();
    }
}

/// Selected cell: `column` indexes the roster, `row` the zero-based round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellCursor {
    column: usize,
    row: usize,
}

impl CellCursor {
    fn clamp(&mut self, columns: usize, rows: usize) {
        self.column = self.column.min(columns.saturating_sub(1));
        self.row = self.row.min(rows.saturating_sub(1));
    }

    fn shift(&mut self, delta_col: isize, delta_row: isize, columns: usize, rows: usize) {
        let max_col = columns.saturating_sub(1) as isize;
        let max_row = rows.saturating_sub(1) as isize;
        self.column = (self.column as isize + delta_col).clamp(0, max_col) as usize;
        self.row = (self.row as isize + delta_row).clamp(0, max_row) as usize;
    }
}

#[derive(Debug, Clone)]
struct Toast {
    notification: Notification,
    shown_at: Instant,
}

struct Celebration {
    record: GameRecord,
    started_at: Instant,
}

enum AppEvent {
    Input(Event),
    Tick,
    AutoReset(RecordId),
}

struct UiState {
    cursor: CellCursor,
    mode: Mode,
    status: String,
    toast: Option<Toast>,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: CellCursor::default(),
            mode: Mode::Table,
            status: "Ready".to_string(),
            toast: None,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn show(&mut self, notification: Notification) {
        self.toast = Some(Toast {
            notification,
            shown_at: Instant::now(),
        });
    }

    fn expire_toast(&mut self) {
        if self
            .toast
            .as_ref()
            .map(|toast| toast.shown_at.elapsed() >= TOAST_TTL)
            .unwrap_or(false)
        {
            self.toast = None;
        }
    }
}

/// Terminal front end driving a [`ScoreEngine`].
pub struct TallyApp {
    engine: ScoreEngine,
    notifications: NotificationReceiver,
    config: AppConfig,
    theme: Theme,
    state: UiState,
    name_prompt: Option<NamePromptModal>,
    editor: Option<ScoreEdit>,
    celebration: Option<Celebration>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl TallyApp {
    pub fn new(config: AppConfig) -> Self {
        let (notify_tx, notifications) = notify::channel();
        let engine = ScoreEngine::with_config(&config).with_notifier(notify_tx);
        Self {
            engine,
            notifications,
            config,
            theme: Theme::default(),
            state: UiState::default(),
            name_prompt: None,
            editor: None,
            celebration: None,
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state.set_status("Press a to add players, q to quit");

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        info!(archived = self.engine.history().len(), "Session closed");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind != KeyEventKind::Release {
                    self.handle_key(key);
                }
            }
            Some(AppEvent::Input(_)) => {}
            Some(AppEvent::Tick) => self.state.expire_toast(),
            Some(AppEvent::AutoReset(record)) => self.handle_auto_reset(record),
            None => return false,
        }
        self.drain_notifications();
        true
    }

    fn drain_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            debug!(kind = ?notification.kind, title = %notification.title, "Notification");
            self.state.show(notification);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.state.mode {
            Mode::AddPlayer => self.handle_name_prompt_key(key),
            Mode::EditScore => self.handle_edit_key(key),
            Mode::Table => self.handle_table_key(key),
        }
    }

    fn dimensions(&self) -> (usize, usize) {
        (
            self.engine.roster().len(),
            self.engine.current_round() as usize,
        )
    }

    fn selected_player(&self) -> Option<PlayerId> {
        self.engine
            .roster()
            .get(self.state.cursor.column)
            .map(|player| player.id)
    }

    fn move_cursor(&mut self, delta_col: isize, delta_row: isize) {
        let (columns, rows) = self.dimensions();
        self.state.cursor.shift(delta_col, delta_row, columns, rows);
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.state.should_quit = true;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => self.open_name_prompt(),
            KeyCode::Char('n') | KeyCode::Char('N') => self.start_round(),
            KeyCode::Char('f') | KeyCode::Char('F') => self.finish_game(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset_game(),
            KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Delete => self.remove_selected(),
            KeyCode::Char('h') | KeyCode::Left => self.move_cursor(-1, 0),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.move_cursor(1, 0),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(0, -1),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(0, 1),
            KeyCode::Enter => self.begin_edit(None),
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '-' || ch == '+' => {
                self.begin_edit(Some(ch))
            }
            _ => {}
        }
    }

    fn open_name_prompt(&mut self) {
        if self.engine.roster().len() >= MAX_PLAYERS {
            self.state
                .set_status(format!("Maximum {MAX_PLAYERS} players per game"));
            return;
        }
        self.name_prompt = Some(NamePromptModal::default());
        self.state.mode = Mode::AddPlayer;
    }

    fn close_name_prompt(&mut self) {
        self.name_prompt = None;
        self.state.mode = Mode::Table;
    }

    fn handle_name_prompt_key(&mut self, key: KeyEvent) {
        let mut submit: Option<String> = None;
        let mut cancel = false;
        if let Some(prompt) = self.name_prompt.as_mut() {
            match key.code {
                KeyCode::Esc => cancel = true,
                KeyCode::Enter => submit = Some(prompt.input.clone()),
                KeyCode::Left => prompt.move_cursor(-1),
                KeyCode::Right => prompt.move_cursor(1),
                KeyCode::Home => prompt.move_home(),
                KeyCode::End => prompt.move_end(),
                KeyCode::Backspace => prompt.backspace(),
                KeyCode::Delete => prompt.delete(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        prompt.insert(ch);
                    }
                }
                _ => {}
            }
        } else {
            cancel = true;
        }

        if cancel {
            self.close_name_prompt();
            return;
        }

        let Some(name) = submit else {
            return;
        };
        match self.engine.add_player(&name) {
            Ok(player) => {
                let seat = self.engine.roster().len();
                self.state
                    .set_status(format!("{} takes seat {seat}/{MAX_PLAYERS}", player.name));
                if let Some(prompt) = self.name_prompt.as_mut() {
                    prompt.clear();
                }
                if self.engine.roster().len() >= MAX_PLAYERS {
                    self.close_name_prompt();
                }
            }
            Err(AddPlayerRejected::EmptyName) => {
                self.state.set_status("Enter a player name first");
            }
            Err(err @ AddPlayerRejected::RosterFull) => {
                self.state.set_status(format!("Cannot add player: {err}"));
                self.close_name_prompt();
            }
        }
    }

    fn begin_edit(&mut self, first: Option<char>) {
        let Some(player) = self.selected_player() else {
            self.state.set_status("Add players before entering scores");
            return;
        };
        let mut edit = ScoreEdit::new(player, self.state.cursor.row);
        if let Some(ch) = first {
            edit.push(ch);
        }
        self.editor = Some(edit);
        self.state.mode = Mode::EditScore;
    }

    fn commit_edit(&mut self) {
        self.state.mode = Mode::Table;
        let Some(edit) = self.editor.take() else {
            return;
        };
        if !self
            .engine
            .update_score(edit.player, edit.round_index, &edit.input)
        {
            warn!(player = %edit.player, round = edit.round_index, "Score edit was not stored");
        }
    }

    /// Move away from the edited cell, saving only if something was typed.
    fn leave_edit(&mut self, delta_col: isize, delta_row: isize) {
        let typed = self
            .editor
            .as_ref()
            .map(|edit| !edit.input.is_empty())
            .unwrap_or(false);
        if typed {
            self.commit_edit();
        } else {
            self.editor = None;
            self.state.mode = Mode::Table;
        }
        self.move_cursor(delta_col, delta_row);
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editor = None;
                self.state.mode = Mode::Table;
            }
            KeyCode::Enter => {
                self.commit_edit();
                self.move_cursor(0, 1);
            }
            KeyCode::Tab | KeyCode::Right => self.leave_edit(1, 0),
            KeyCode::Left => self.leave_edit(-1, 0),
            KeyCode::Up => self.leave_edit(0, -1),
            KeyCode::Down => self.leave_edit(0, 1),
            KeyCode::Backspace => {
                if let Some(edit) = self.editor.as_mut() {
                    edit.backspace();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(edit) = self.editor.as_mut() {
                    edit.push(ch);
                }
            }
            _ => {}
        }
    }

    fn start_round(&mut self) {
        if self.engine.add_round() {
            let (columns, rows) = self.dimensions();
            self.state.cursor.row = rows.saturating_sub(1);
            self.state.cursor.clamp(columns, rows);
        } else {
            self.state.set_status("Add players before starting a round");
        }
    }

    fn finish_game(&mut self) {
        match self.engine.finish_game() {
            Ok(record) => {
                self.schedule_auto_reset(record.id);
                self.state.set_status(format!("Game of {} archived", record.date));
                self.celebration = Some(Celebration {
                    record,
                    started_at: Instant::now(),
                });
            }
            Err(err) => {
                self.state.set_status(format!("Cannot finish: {err}"));
            }
        }
    }

    fn schedule_auto_reset(&self, record: RecordId) {
        let Some(sender) = self.event_tx.clone() else {
            debug!(%record, "No event loop attached; auto-reset skipped");
            return;
        };
        let delay = self.config.reset_delay();
        spawn(async move {
            sleep(delay).await;
            let _ = sender.send(AppEvent::AutoReset(record)).await;
        });
    }

    fn handle_auto_reset(&mut self, record: RecordId) {
        info!(%record, "Auto-reset after finished game");
        self.celebration = None;
        self.reset_game();
    }

    fn reset_game(&mut self) {
        self.engine.reset_game();
        self.editor = None;
        self.name_prompt = None;
        self.state.cursor = CellCursor::default();
        self.state.mode = Mode::Table;
        self.state.set_status("Board cleared");
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected_player() else {
            return;
        };
        let name = self
            .engine
            .player(id)
            .map(|player| player.name.clone())
            .unwrap_or_default();
        if self.engine.remove_player(id) {
            let (columns, rows) = self.dimensions();
            self.state.cursor.clamp(columns, rows);
            self.state.set_status(format!("Removed {name}"));
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let history_rows = self
            .engine
            .history()
            .recent(self.config.history_display)
            .count() as u16;

        let mut constraints = vec![Constraint::Length(3), Constraint::Min(6)];
        if history_rows > 0 {
            constraints.push(Constraint::Length(history_rows + 2));
        }
        constraints.push(Constraint::Length(4));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_title(frame, chunks[0]);
        if self.engine.roster().is_empty() {
            self.render_empty(frame, chunks[1]);
        } else {
            self.render_scores(frame, chunks[1]);
        }
        if history_rows > 0 {
            self.render_history(frame, chunks[2]);
        }
        if let Some(status_area) = chunks.last().copied() {
            self.render_status(frame, status_area);
        }

        if let Some(prompt) = &self.name_prompt {
            self.render_name_prompt(frame, prompt);
        }
        if let Some(celebration) = &self.celebration {
            self.render_celebration(frame, celebration);
        }
    }

    fn render_title(&self, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "Tally",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  keep score, lowest total wins",
                Style::default().fg(self.theme.muted),
            ),
        ]);
        let paragraph = Paragraph::new(title)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_empty(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Ready for a card game?",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("Press a to add players and start recording scores"),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Scores"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_scores(&self, frame: &mut Frame, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(5)])
            .split(area);

        let roster = self.engine.roster();
        let mut widths = vec![Constraint::Length(7)];
        widths.extend(roster.iter().map(|_| Constraint::Min(6)));

        let header_style = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(
            std::iter::once(Cell::from("Round")).chain(
                roster
                    .iter()
                    .map(|player| Cell::from(player.name.clone())),
            ),
        )
        .style(header_style);

        let cursor = self.state.cursor;
        let rows: Vec<Row> = (0..self.engine.current_round() as usize)
            .map(|round_index| {
                let label = Cell::from(format!("R{}", round_index + 1))
                    .style(Style::default().fg(self.theme.muted));
                let cells = roster.iter().enumerate().map(|(column, player)| {
                    let selected = cursor.column == column && cursor.row == round_index;
                    let editing = self
                        .editor
                        .as_ref()
                        .filter(|edit| edit.player == player.id && edit.round_index == round_index);
                    let text = match (editing, player.score(round_index)) {
                        (Some(edit), _) => format!("{}_", edit.input),
                        (None, Some(score)) => score.to_string(),
                        (None, None) => "·".to_string(),
                    };
                    let style = if editing.is_some() {
                        Style::default()
                            .fg(self.theme.warning)
                            .add_modifier(Modifier::BOLD)
                    } else if selected {
                        Style::default()
                            .bg(self.theme.selection_bg)
                            .fg(self.theme.selection_fg)
                    } else {
                        Style::default().fg(self.theme.primary_fg)
                    };
                    Cell::from(text).style(style)
                });
                Row::new(std::iter::once(label).chain(cells))
            })
            .collect();

        let mut table_state = TableState::default();
        table_state.select(Some(cursor.row));
        let table = Table::new(rows, widths.clone())
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Scores - Round {}",
                self.engine.current_round()
            )));
        frame.render_stateful_widget(table, sections[0], &mut table_state);

        let totals = Row::new(
            std::iter::once(Cell::from("Total")).chain(roster.iter().map(|player| {
                let style = if self.engine.player_rank(player) == 1 {
                    Style::default()
                        .fg(self.theme.success)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                Cell::from(player.total().to_string()).style(style)
            })),
        );
        let ranks = Row::new(
            std::iter::once(Cell::from("Rank")).chain(
                roster
                    .iter()
                    .map(|player| Cell::from(format!("#{}", self.engine.player_rank(player)))),
            ),
        )
        .style(Style::default().fg(self.theme.muted));
        let summary = Table::new(vec![totals, ranks], widths)
            .block(Block::default().borders(Borders::ALL).title("Standings"));
        frame.render_widget(summary, sections[1]);
    }

    fn render_history(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .engine
            .history()
            .recent(self.config.history_display)
            .map(|record| {
                let scores = record
                    .players
                    .iter()
                    .map(|player| format!("{}: {} pts", player.name, player.total()))
                    .collect::<Vec<_>>()
                    .join(", ");
                ListItem::new(Line::from(vec![
                    Span::raw(format!("Game of {}  ", record.date)),
                    Span::styled(
                        format!("🏆 {}", record.winner),
                        Style::default()
                            .fg(self.theme.success)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!("  {scores}"), Style::default().fg(self.theme.muted)),
                ]))
            })
            .collect();
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Game history"),
        );
        frame.render_widget(list, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let primary = match &self.state.toast {
            Some(toast) => Line::from(vec![
                Span::styled(
                    format!("{}  ", toast.notification.title),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(toast.notification.description.clone()),
            ]),
            None => Line::from(self.state.status.clone()),
        };
        let help = match self.state.mode {
            Mode::Table => {
                "a add  n new round  f finish  r reset  x remove  hjkl move  0-9/Enter edit  q quit"
            }
            Mode::AddPlayer => "Enter add  Esc done",
            Mode::EditScore => "Enter save  Tab next  Esc cancel",
        };
        let paragraph = Paragraph::new(vec![
            primary,
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_name_prompt(&self, frame: &mut Frame, prompt: &NamePromptModal) {
        let area = centered_rect(44, 7, frame.size());
        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" add  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" done"),
        ]);
        let capacity = Line::from(Span::styled(
            format!("{}/{} players", self.engine.roster().len(), MAX_PLAYERS),
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![
            Line::from("Player name"),
            input_line,
            Line::from(""),
            helper,
            capacity,
        ])
        .block(Block::default().borders(Borders::ALL).title("Add a player"));
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_celebration(&self, frame: &mut Frame, celebration: &Celebration) {
        let area = centered_rect(48, 7, frame.size());
        frame.render_widget(Clear, area);
        let remaining = self
            .config
            .reset_delay()
            .saturating_sub(celebration.started_at.elapsed())
            .as_secs();
        let record = &celebration.record;
        let lines = vec![
            Line::from(Span::styled(
                "🎉 Congratulations!",
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "{} wins with {} points",
                record.winner, record.winner_total
            )),
            Line::from(Span::styled(
                format!("Board clears in {remaining}s"),
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.danger))
                    .title("Game over"),
            )
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut TallyApp, code: KeyCode) {
        let handled = app.process_app_event(Some(AppEvent::Input(Event::Key(KeyEvent::new(
            code,
            KeyModifiers::NONE,
        )))));
        assert!(handled);
    }

    fn type_text(app: &mut TallyApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn app_with_players(names: &[&str]) -> TallyApp {
        let mut app = TallyApp::new(AppConfig::default());
        press(&mut app, KeyCode::Char('a'));
        for name in names {
            type_text(&mut app, name);
            press(&mut app, KeyCode::Enter);
        }
        press(&mut app, KeyCode::Esc);
        app
    }

    #[test]
    fn name_prompt_handles_multibyte_and_cap() {
        let mut prompt = NamePromptModal::default();
        for ch in "Zoé".chars() {
            prompt.insert(ch);
        }
        prompt.move_cursor(-1);
        prompt.backspace();
        assert_eq!(prompt.input, "Zé");
        prompt.move_home();
        prompt.delete();
        assert_eq!(prompt.input, "é");
        prompt.move_end();
        for _ in 0..40 {
            prompt.insert('x');
        }
        assert_eq!(prompt.input.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn score_edit_accepts_sign_only_first() {
        let player = ScoreEngine::new().add_player("Ana").unwrap().id;
        let mut edit = ScoreEdit::new(player, 0);
        for ch in "-1-2a3".chars() {
            edit.push(ch);
        }
        assert_eq!(edit.input, "-123");
        edit.backspace();
        assert_eq!(edit.input, "-12");
    }

    #[test]
    fn cursor_stays_inside_table() {
        let mut cursor = CellCursor::default();
        cursor.shift(-1, -1, 3, 2);
        assert_eq!(cursor, CellCursor { column: 0, row: 0 });
        cursor.shift(5, 5, 3, 2);
        assert_eq!(cursor, CellCursor { column: 2, row: 1 });
        cursor.clamp(1, 1);
        assert_eq!(cursor, CellCursor { column: 0, row: 0 });
    }

    #[test]
    fn prompt_adds_players_and_clears_input() {
        let app = app_with_players(&["Ana", "  ", "Bo"]);
        let names: Vec<_> = app.engine.roster().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bo"]);
        assert_eq!(app.state.mode, Mode::Table);
        assert!(app.name_prompt.is_none());
        let toast = app.state.toast.as_ref().expect("toast for added player");
        assert!(toast.notification.description.contains("Bo"));
    }

    #[test]
    fn prompt_closes_when_roster_fills() {
        let names: Vec<String> = (1..=MAX_PLAYERS).map(|idx| format!("P{idx}")).collect();
        let mut app = TallyApp::new(AppConfig::default());
        press(&mut app, KeyCode::Char('a'));
        for name in &names {
            type_text(&mut app, name);
            press(&mut app, KeyCode::Enter);
        }
        assert_eq!(app.engine.roster().len(), MAX_PLAYERS);
        assert_eq!(app.state.mode, Mode::Table);

        press(&mut app, KeyCode::Char('a'));
        assert!(app.name_prompt.is_none());
    }

    #[test]
    fn typing_digits_records_scores() {
        let mut app = app_with_players(&["Ana", "Bo"]);
        type_text(&mut app, "12");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "7");
        press(&mut app, KeyCode::Enter);

        let roster = app.engine.roster();
        assert_eq!(roster[0].total(), 12);
        assert_eq!(roster[1].total(), 7);
        assert_eq!(app.engine.player_rank(&roster[1]), 1);
    }

    #[test]
    fn escape_discards_pending_edit() {
        let mut app = app_with_players(&["Ana"]);
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Esc);
        assert!(!app.engine.roster()[0].has_scores());
        assert_eq!(app.state.mode, Mode::Table);
    }

    #[test]
    fn new_round_moves_cursor_to_last_row() {
        let mut app = app_with_players(&["Ana"]);
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.engine.current_round(), 3);
        assert_eq!(app.state.cursor.row, 2);
        type_text(&mut app, "4");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.engine.roster()[0].scores, vec![None, None, Some(4)]);
    }

    #[test]
    fn finish_then_auto_reset_keeps_history() {
        let mut app = app_with_players(&["Ana", "Bo"]);
        type_text(&mut app, "9");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "3");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('f'));

        let record = app
            .celebration
            .as_ref()
            .map(|c| c.record.clone())
            .expect("celebration after finishing");
        assert_eq!(record.winner, "Bo");
        assert_eq!(app.engine.history().len(), 1);

        assert!(app.process_app_event(Some(AppEvent::AutoReset(record.id))));
        assert!(app.celebration.is_none());
        assert!(app.engine.roster().is_empty());
        assert_eq!(app.engine.current_round(), 1);
        assert_eq!(app.engine.history().len(), 1);
    }

    #[tokio::test]
    async fn finished_game_resets_after_delay() {
        let config = AppConfig {
            reset_delay_ms: 20,
            ..AppConfig::default()
        };
        let mut app = TallyApp::new(config);
        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(8);
        app.event_tx = Some(event_tx);

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Ana");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        type_text(&mut app, "6");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('f'));
        assert!(app.celebration.is_some());
        assert_eq!(app.engine.roster().len(), 1);

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .expect("auto-reset fired before the timeout");
        assert!(matches!(event, Some(AppEvent::AutoReset(_))));
        assert!(app.process_app_event(event));

        assert!(app.celebration.is_none());
        assert!(app.engine.roster().is_empty());
        assert_eq!(app.engine.current_round(), 1);
        assert_eq!(app.engine.history().len(), 1);
    }

    #[test]
    fn auto_reset_closes_open_name_prompt() {
        let mut app = app_with_players(&["Ana"]);
        type_text(&mut app, "2");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('f'));
        let record = app.engine.history().latest().map(|r| r.id).unwrap();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Half");
        assert_eq!(app.state.mode, Mode::AddPlayer);

        assert!(app.process_app_event(Some(AppEvent::AutoReset(record))));
        assert!(app.name_prompt.is_none());
        assert_eq!(app.state.mode, Mode::Table);

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.name_prompt.as_ref().map(|p| p.input.as_str()), Some(""));
    }

    #[test]
    fn arrow_on_untouched_edit_leaves_cell_absent() {
        let mut app = app_with_players(&["Ana", "Bo"]);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state.mode, Mode::EditScore);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.state.mode, Mode::Table);
        assert_eq!(app.state.cursor.column, 1);
        assert!(!app.engine.roster()[0].has_scores());

        press(&mut app, KeyCode::Char('f'));
        assert!(app.engine.history().is_empty());

        type_text(&mut app, "8");
        press(&mut app, KeyCode::Left);
        assert_eq!(app.engine.roster()[1].scores, vec![Some(8)]);
    }

    #[test]
    fn finish_without_scores_is_rejected() {
        let mut app = app_with_players(&["Ana"]);
        press(&mut app, KeyCode::Char('f'));
        assert!(app.celebration.is_none());
        assert!(app.engine.history().is_empty());
        assert!(app.state.status.starts_with("Cannot finish"));
    }

    #[test]
    fn remove_selected_player_clamps_cursor() {
        let mut app = app_with_players(&["Ana", "Bo"]);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.engine.roster().len(), 1);
        assert_eq!(app.state.cursor.column, 0);
    }

    #[test]
    fn channel_close_stops_loop() {
        let mut app = TallyApp::new(AppConfig::default());
        assert!(!app.process_app_event(None));
    }
}
