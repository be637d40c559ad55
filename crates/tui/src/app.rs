use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use billar_core::{
    api::SessionSync,
    camera::{CameraState, CAMERA_LOADING_GRACE},
    clock::SystemClock,
    format::format_currency,
    models::Player,
    SessionTick, TableController, TableEvent, TableSettings,
};
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
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::big_digits;

const TICK_RATE: Duration = Duration::from_millis(250);
const KPI_HEIGHT: u16 = big_digits::FONT_HEIGHT as u16 + 2;
const SCORE_STEP: i32 = 1;
const SCORE_JUMP: i32 = 5;
const PRICE_STEP: f64 = 0.5;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct Theme {
    primary_bg: Color,
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_bg: Color::Black,
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    CameraLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraAction {
    TogglePlay,
    GoLive,
    Rewind,
    ToggleRecording,
    ToggleMaximize,
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Quit,
    MoveSelection(isize),
    AdjustScore(i32),
    AdjustPrice(f64),
    Table(TableEvent),
    Camera(CameraAction),
}

fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Action::Quit);
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveSelection(1),
        KeyCode::Char('k') | KeyCode::Up => Action::MoveSelection(-1),
        KeyCode::Char('+') | KeyCode::Char('=') => Action::AdjustScore(SCORE_STEP),
        KeyCode::Char('-') => Action::AdjustScore(-SCORE_STEP),
        KeyCode::Char(']') => Action::AdjustScore(SCORE_JUMP),
        KeyCode::Char('[') => Action::AdjustScore(-SCORE_JUMP),
        KeyCode::Char('p') => Action::AdjustPrice(PRICE_STEP),
        KeyCode::Char('P') => Action::AdjustPrice(-PRICE_STEP),
        KeyCode::Char('a') => Action::Table(TableEvent::AddPlayer),
        KeyCode::Char('x') => Action::Table(TableEvent::RemovePlayer),
        KeyCode::Char('r') => Action::Table(TableEvent::ResetScores),
        KeyCode::Char('c') => Action::Table(TableEvent::IncrementCarambolas),
        KeyCode::Char('C') => Action::Table(TableEvent::DecrementCarambolas),
        KeyCode::Char('e') => Action::Table(TableEvent::IncrementEntryCount),
        KeyCode::Char('E') => Action::Table(TableEvent::DecrementEntryCount),
        KeyCode::Char('s') => Action::Table(TableEvent::CloseSession),
        KeyCode::Char('n') => Action::Table(TableEvent::NewSession),
        KeyCode::Char('v') => Action::Camera(CameraAction::TogglePlay),
        KeyCode::Char('l') => Action::Camera(CameraAction::GoLive),
        KeyCode::Char('w') => Action::Camera(CameraAction::Rewind),
        KeyCode::Char('o') => Action::Camera(CameraAction::ToggleRecording),
        KeyCode::Char('m') => Action::Camera(CameraAction::ToggleMaximize),
        _ => return None,
    };
    Some(action)
}

/// Terminal front end for one billiard table.
pub struct BillarApp {
    controller: TableController,
    tick_rx: Option<mpsc::Receiver<SessionTick>>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    selected: usize,
    status: String,
    should_quit: bool,
    theme: Theme,
}

impl BillarApp {
    /// Builds the table controller, which starts the first session right
    /// away. Must be called from within a Tokio runtime.
    pub fn new(settings: TableSettings, sync: SessionSync, tick_period: Duration) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let controller =
            TableController::new(settings, sync, Arc::new(SystemClock), tick_tx, tick_period);
        let status = format!("Session started at {}", controller.settings().table_name());
        Self {
            controller,
            tick_rx: Some(tick_rx),
            event_tx: None,
            selected: 0,
            status,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tick_rx = self.tick_rx.take().context("table terminal is already running")?;

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

        if self.controller.camera().state() == CameraState::Loading {
            self.schedule_camera_grace();
        }

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                Some(tick) = tick_rx.recv() => {
                    self.controller.on_tick(&tick);
                }
            }
        }

        restore_terminal(&mut terminal)?;
        self.tick_rx = Some(tick_rx);
        self.event_tx = None;
        if !self.controller.shutdown(SHUTDOWN_GRACE).await {
            warn!("some remote session reports were not delivered");
        }
        info!("table terminal closed");
        Ok(())
    }

    fn schedule_camera_grace(&self) {
        let Some(sender) = self.event_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(CAMERA_LOADING_GRACE).await;
            let _ = sender.send(AppEvent::CameraLoaded).await;
        });
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if let Some(action) = action_for(&key) {
                    self.apply(action);
                }
                true
            }
            Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => true,
            Some(AppEvent::CameraLoaded) => {
                if self.controller.camera_mut().finish_loading() {
                    info!(url = %self.controller.camera().url(), "camera stream playing");
                }
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, action: Action) {
        debug!(?action, "operator action");
        match action {
            Action::Quit => self.should_quit = true,
            Action::MoveSelection(delta) => self.move_selection(delta),
            Action::AdjustScore(delta) => self.adjust_selected(delta),
            Action::AdjustPrice(delta) => self.adjust_price(delta),
            Action::Table(event) => self.apply_table_event(event),
            Action::Camera(action) => self.apply_camera_action(action),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.controller.roster().len();
        if len == 0 {
            return;
        }
        let next = (self.selected as isize + delta).rem_euclid(len as isize);
        self.selected = next as usize;
    }

    fn selected_player(&self) -> Option<Player> {
        self.controller.roster().players().get(self.selected).cloned()
    }

    fn adjust_selected(&mut self, delta: i32) {
        let Some(player) = self.selected_player() else {
            return;
        };
        if self.controller.handle(TableEvent::AdjustScore {
            player: player.id,
            delta,
        }) {
            let score = self
                .controller
                .roster()
                .get_player(&player.id)
                .map(|p| p.score)
                .unwrap_or_default();
            self.set_status(format!("{}: {score}", player.name));
        } else {
            self.set_status(format!("{} is already at zero", player.name));
        }
    }

    fn adjust_price(&mut self, delta: f64) {
        let rate = self.controller.timer().price_per_minute() + delta;
        if self.controller.handle(TableEvent::SetPricePerMinute(rate)) {
            self.set_status(format!("Price set to {}/min", format_currency(rate)));
        } else {
            self.set_status("Price per minute must stay above zero");
        }
    }

    fn apply_table_event(&mut self, event: TableEvent) {
        let (done, refused) = match &event {
            TableEvent::AddPlayer => ("Player added", "Table is full"),
            TableEvent::RemovePlayer => ("Player removed", "At least two players are required"),
            TableEvent::ResetScores => ("Scores reset", "Scores are already zero"),
            TableEvent::IncrementCarambolas | TableEvent::IncrementEntryCount => {
                ("Counter updated", "Counter unchanged")
            }
            TableEvent::DecrementCarambolas | TableEvent::DecrementEntryCount => {
                ("Counter updated", "Counter is already at zero")
            }
            TableEvent::CloseSession => ("", "No active session"),
            TableEvent::NewSession => ("New session started", "Close the current session first (s)"),
            TableEvent::AdjustScore { .. } | TableEvent::SetPricePerMinute(_) => ("", ""),
        };
        let closing = event == TableEvent::CloseSession;
        if !self.controller.handle(event) {
            self.set_status(refused);
            return;
        }
        if closing {
            let session = self.controller.session();
            self.set_status(format!(
                "Session closed: {} for {}",
                session.elapsed_display, session.cost_display
            ));
        } else {
            self.set_status(done);
        }
        let len = self.controller.roster().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn apply_camera_action(&mut self, action: CameraAction) {
        let camera = self.controller.camera_mut();
        match action {
            CameraAction::TogglePlay => camera.toggle_play_pause(),
            CameraAction::GoLive => camera.go_to_live(),
            CameraAction::Rewind => camera.rewind(),
            CameraAction::ToggleRecording => camera.toggle_recording(),
            CameraAction::ToggleMaximize => camera.toggle_maximize(),
        }
        let message = match action {
            CameraAction::ToggleRecording if camera.is_recording() => "Recording".to_string(),
            CameraAction::ToggleRecording => "Recording stopped".to_string(),
            _ => format!("Camera {}", camera.state().label()),
        };
        self.set_status(message);
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(
                Style::default()
                    .bg(self.theme.primary_bg)
                    .fg(self.theme.primary_fg),
            ),
            area,
        );

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(KPI_HEIGHT),
                Constraint::Min(8),
                Constraint::Length(6),
            ])
            .split(area);

        self.render_kpi_bar(frame, rows[0]);

        if self.controller.camera().is_maximized() {
            self.render_camera(frame, rows[1]);
        } else {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(25),
                    Constraint::Percentage(50),
                    Constraint::Percentage(25),
                ])
                .split(rows[1]);
            let (left, right) = self.controller.roster().halves();
            self.render_player_column(frame, columns[0], &left, 0);
            self.render_camera(frame, columns[1]);
            self.render_player_column(frame, columns[2], &right, left.len());
        }

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[2]);
        self.render_help(frame, bottom[0]);
        self.render_status(frame, bottom[1]);
    }

    fn render_kpi_bar(&self, frame: &mut Frame, area: Rect) {
        let session = self.controller.session();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(26),
                Constraint::Min(20),
                Constraint::Min(20),
                Constraint::Length(26),
            ])
            .split(area);

        let (state_label, state_color) = if session.active {
            ("In play", self.theme.success)
        } else {
            ("Closed", self.theme.danger)
        };
        let info = Paragraph::new(vec![
            Line::from(Span::styled(
                self.controller.settings().table_name(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(session.table_id.unwrap_or_default()),
            Line::from(""),
            Line::from(Span::styled(
                state_label,
                Style::default()
                    .fg(state_color)
                    .add_modifier(Modifier::BOLD),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Table"));
        frame.render_widget(info, chunks[0]);

        let digits = Style::default().fg(self.theme.accent);
        frame.render_widget(
            Paragraph::new(big_lines(&session.elapsed_display, digits))
                .block(Block::default().borders(Borders::ALL).title("Time"))
                .alignment(Alignment::Center),
            chunks[1],
        );
        frame.render_widget(
            Paragraph::new(big_lines(&session.cost_display, digits))
                .block(Block::default().borders(Borders::ALL).title("Cost"))
                .alignment(Alignment::Center),
            chunks[2],
        );

        let counters = Paragraph::new(vec![
            Line::from(format!(
                "Price/min   {}",
                format_currency(session.price_per_minute)
            )),
            Line::from(format!("Carambolas  {}", session.carambolas)),
            Line::from(format!("Entries     {}", session.entry_count)),
            Line::from(format!("Players     {}", self.controller.roster().len())),
        ])
        .block(Block::default().borders(Borders::ALL).title("Counters"));
        frame.render_widget(counters, chunks[3]);
    }

    fn render_player_column(&self, frame: &mut Frame, area: Rect, players: &[Player], offset: usize) {
        if players.is_empty() {
            frame.render_widget(Block::default().borders(Borders::ALL), area);
            return;
        }
        let constraints = vec![Constraint::Ratio(1, players.len() as u32); players.len()];
        let cards = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);
        for (index, (player, card)) in players.iter().zip(cards.iter()).enumerate() {
            self.render_player_card(frame, *card, player, offset + index == self.selected);
        }
    }

    fn render_player_card(&self, frame: &mut Frame, area: Rect, player: &Player, selected: bool) {
        let color = Color::Rgb(player.color.r, player.color.g, player.color.b);
        let border_style = if selected {
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let marker = if selected { "▶ " } else { "" };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(
                format!("{marker}{}", player.name),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));

        let inner_height = area.height.saturating_sub(2) as usize;
        let score = player.score.to_string();
        let lines = if inner_height >= big_digits::FONT_HEIGHT {
            big_lines(&score, Style::default().fg(color))
        } else {
            vec![Line::from(Span::styled(
                score,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))]
        };
        let paragraph = Paragraph::new(center_vertically(lines, inner_height))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_camera(&self, frame: &mut Frame, area: Rect) {
        let camera = self.controller.camera();
        let state = camera.state();
        let state_color = match state {
            CameraState::Idle => self.theme.muted,
            CameraState::Loading | CameraState::Paused => self.theme.warning,
            CameraState::Playing => self.theme.success,
            CameraState::Error(_) => self.theme.danger,
        };
        let mut lines = vec![
            Line::from(Span::styled(
                state.label().to_uppercase(),
                Style::default()
                    .fg(state_color)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(if camera.is_live() { "● LIVE" } else { "◀◀ REWIND" }),
        ];
        if camera.is_recording() {
            lines.push(Line::from(Span::styled(
                "● REC",
                Style::default().fg(self.theme.danger),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            camera.url(),
            Style::default().fg(self.theme.muted),
        )));

        let inner_height = area.height.saturating_sub(2) as usize;
        let title = if camera.is_maximized() {
            "Camera (maximized)"
        } else {
            "Camera"
        };
        let paragraph = Paragraph::new(center_vertically(lines, inner_height))
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Commands");
        let lines = vec![
            Line::from("j/k select player  +/- score ±1  ]/[ score ±5  r reset scores"),
            Line::from("a/x add/remove player  c/C carambolas  e/E entries  p/P price ±0.5"),
            Line::from("s close session  n new session  q/Esc quit"),
            Line::from("v play/pause  l live  w rewind  o record  m maximize camera"),
        ];
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = match self.selected_player() {
            Some(player) => format!("Selected: {}", player.name),
            None => String::new(),
        };
        let paragraph = Paragraph::new(vec![Line::from(self.status.clone()), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Big-digit rows padded to a common width so centering keeps them aligned.
fn big_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    let width = big_digits::width(text);
    big_digits::render(text)
        .into_iter()
        .map(|row| Line::from(Span::styled(format!("{row:<width$}"), style)))
        .collect()
}

fn center_vertically(lines: Vec<Line<'static>>, height: usize) -> Vec<Line<'static>> {
    if height <= lines.len() {
        return lines;
    }
    let top = (height - lines.len()) / 2;
    let mut content = vec![Line::from(""); top];
    content.extend(lines);
    content
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
