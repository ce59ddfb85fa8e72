//! Main application state and logic.

use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tracing::warn;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::theme::{icons, Theme};
use super::widgets::{progress_bar, DeadlineBanner, KeyHints, Logo, StatsBar};
use crate::config::Config;
use crate::prompt::Answered;
use crate::scheduler::Countdown;
use crate::session::{CompletionOutcome, DrawOutcome, StudySession, CONFIRM_QUESTION};

// ══════════════════════════════════════════════════════════════════════════
// Application State
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Start,
    Active,
    Confirm,
    Syllabus,
    Stats,
}

pub struct App {
    pub screen: Screen,
    pub running: bool,

    // Config and theme
    pub config: Config,
    pub theme: Theme,

    pub session: StudySession,

    // Active batch
    pub batch_list_state: ListState,
    pub countdown: Option<Countdown>,
    last_tick: Instant,

    // Syllabus browser
    pub subject_list_state: ListState,

    // Status message (shown temporarily)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(session: StudySession, config: Config) -> Self {
        let theme = Theme::from_key(&config.theme);
        let screen = if session.state().active {
            Screen::Active
        } else {
            Screen::Start
        };

        let mut app = Self {
            screen,
            running: true,
            config,
            theme,
            session,
            batch_list_state: ListState::default().with_selected(Some(0)),
            countdown: None,
            last_tick: Instant::now(),
            subject_list_state: ListState::default().with_selected(Some(0)),
            status_message: None,
        };
        app.refresh_countdown();
        app
    }

    pub fn cycle_theme(&mut self) {
        let new_theme_name = self.theme.kind.next();
        self.theme = Theme::new(new_theme_name);
        self.config.theme = new_theme_name.key().to_string();
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save theme choice");
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Recompute the countdown from the wall clock.
    pub fn refresh_countdown(&mut self) {
        self.countdown = self.session.countdown_at(Local::now());
        self.last_tick = Instant::now();
    }

    fn tick(&mut self) {
        if self.last_tick.elapsed() >= self.config.timer_interval() {
            self.refresh_countdown();
        }
    }

    pub fn draw_batch(&mut self) {
        match self.session.draw_new_batch() {
            Ok(DrawOutcome::Drawn { total_weight, days }) => {
                self.set_status(format!(
                    "Drew {} topics, total weight {}, {} days to revise",
                    self.session.state().current_batch.len(),
                    total_weight,
                    days
                ));
            }
            Ok(DrawOutcome::AlreadyActive) => {}
            Err(e) => self.set_status(format!("Save failed: {}", e)),
        }
        self.batch_list_state.select(Some(0));
        self.refresh_countdown();
        self.screen = Screen::Active;
    }

    pub fn toggle_selected(&mut self) {
        let Some(i) = self.batch_list_state.selected() else {
            return;
        };
        if let Err(e) = self.session.toggle_topic(i) {
            self.set_status(format!("Save failed: {}", e));
        }
    }

    /// Run the discipline check and open the confirmation dialog if it passes.
    pub fn request_finish(&mut self) {
        // Answering "no" makes this a pure check: nothing is mutated.
        let mut check = Answered::no();
        match self.session.complete_batch(&mut check) {
            Ok(CompletionOutcome::Unfinished { remaining }) => {
                let notice = check.notices.join(" ");
                self.set_status(format!("{} ({} left)", notice, remaining));
            }
            Ok(CompletionOutcome::Cancelled) => self.screen = Screen::Confirm,
            Ok(CompletionOutcome::NoActiveBatch) => self.screen = Screen::Start,
            Ok(CompletionOutcome::Completed) => {}
            Err(e) => self.set_status(format!("Save failed: {}", e)),
        }
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if !yes {
            self.screen = Screen::Active;
            return;
        }

        let mut prompt = Answered::yes();
        match self.session.complete_batch(&mut prompt) {
            Ok(CompletionOutcome::Completed) => {
                self.set_status(format!("{} Batch complete. Draw the next set when ready.", icons::CHECK));
                self.screen = Screen::Start;
            }
            Ok(_) => self.screen = Screen::Active,
            Err(e) => {
                // The batch is closed in memory even if the write failed.
                self.set_status(format!("Save failed: {}", e));
                self.screen = Screen::Start;
            }
        }
        self.refresh_countdown();
    }

    // ══════════════════════════════════════════════════════════════════════
    // Event Handling
    // ══════════════════════════════════════════════════════════════════════

    pub fn handle_events(&mut self) -> anyhow::Result<()> {
        self.tick();

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match self.screen {
            Screen::Start => self.handle_start_keys(key),
            Screen::Active => self.handle_active_keys(key),
            Screen::Confirm => self.handle_confirm_keys(key),
            Screen::Syllabus => self.handle_syllabus_keys(key),
            Screen::Stats => self.handle_stats_keys(key),
        }
    }

    fn handle_start_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Enter | KeyCode::Char('n') => self.draw_batch(),
            KeyCode::Char('s') => self.screen = Screen::Syllabus,
            KeyCode::Char('i') => self.screen = Screen::Stats,
            _ => {}
        }
    }

    fn handle_active_keys(&mut self, key: KeyCode) {
        let len = self.session.state().current_batch.len();
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Up | KeyCode::Char('k') => {
                if len > 0 {
                    let i = self.batch_list_state.selected().unwrap_or(0);
                    let new_i = if i == 0 { len - 1 } else { i - 1 };
                    self.batch_list_state.select(Some(new_i));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    let i = self.batch_list_state.selected().unwrap_or(0);
                    let new_i = if i >= len - 1 { 0 } else { i + 1 };
                    self.batch_list_state.select(Some(new_i));
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('f') => self.request_finish(),
            KeyCode::Char('s') => self.screen = Screen::Syllabus,
            KeyCode::Char('i') => self.screen = Screen::Stats,
            _ => {}
        }
    }

    fn handle_confirm_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer_confirm(false),
            _ => {}
        }
    }

    fn handle_syllabus_keys(&mut self, key: KeyCode) {
        let len = self.session.syllabus().subject_count();
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = self.home_screen(),
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.subject_list_state.selected().unwrap_or(0);
                let new_i = if i == 0 { len.saturating_sub(1) } else { i - 1 };
                self.subject_list_state.select(Some(new_i));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.subject_list_state.selected().unwrap_or(0);
                let new_i = if i >= len.saturating_sub(1) { 0 } else { i + 1 };
                self.subject_list_state.select(Some(new_i));
            }
            _ => {}
        }
    }

    fn handle_stats_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = self.home_screen(),
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
    }

    fn home_screen(&self) -> Screen {
        if self.session.state().active {
            Screen::Active
        } else {
            Screen::Start
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rendering
    // ══════════════════════════════════════════════════════════════════════

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Clear with background
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.palette.background)),
            area,
        );

        match self.screen {
            Screen::Start => self.render_start(frame, area),
            Screen::Active => self.render_active(frame, area),
            Screen::Confirm => {
                self.render_active(frame, area);
                self.render_confirm(frame, area);
            }
            Screen::Syllabus => self.render_syllabus(frame, area),
            Screen::Stats => self.render_stats(frame, area),
        }

        self.render_status(frame, area);
    }

    fn render_start(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(2),   // Top padding
            Constraint::Length(6),   // Logo
            Constraint::Length(2),   // Spacing
            Constraint::Length(1),   // Stats
            Constraint::Length(2),   // Spacing
            Constraint::Min(5),      // Call to action
            Constraint::Length(3),   // Help
        ])
        .split(area);

        Logo::render_to(&self.theme, chunks[1], frame.buffer_mut());
        frame.render_widget(StatsBar::new(self.session.aggregate_stats(), &self.theme), chunks[3]);

        let subjects = self.session.syllabus().subject_count();
        let body = vec![
            Line::from(vec![Span::styled("No batch in progress", self.theme.title())]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Press ", Style::default().fg(self.theme.palette.muted)),
                Span::styled("Enter", self.theme.key_highlight()),
                Span::styled(
                    format!(" to draw one topic from each of {} subjects", subjects),
                    Style::default().fg(self.theme.palette.muted),
                ),
            ]),
            Line::from(""),
            Line::from(vec![Span::styled(
                format!("Cards remaining in deck: {}", self.session.aggregate_stats().current_cards_left),
                Style::default().fg(self.theme.palette.faint),
            )]),
        ];
        let cta = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(self.theme.palette.brand)),
        );
        frame.render_widget(cta, centered_rect(60, 100, chunks[5]));

        let theme_hint = format!("[{}]", self.theme.kind.label());
        let hints_data: [(&str, &str); 5] = [
            ("Enter", "draw batch"),
            ("s", "syllabus"),
            ("i", "stats"),
            ("t", &theme_hint),
            ("q", "quit"),
        ];
        frame.render_widget(KeyHints::new(&hints_data, &self.theme), chunks[6]);
    }

    fn render_active(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Deadline banner
            Constraint::Length(1),   // Stats
            Constraint::Length(1),   // Spacing
            Constraint::Min(6),      // Batch list
            Constraint::Length(1),   // Finish gate
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let state = self.session.state();
        if let Some(countdown) = self.countdown {
            frame.render_widget(
                DeadlineBanner::new(countdown, &state.range_str, &self.theme),
                centered_rect(60, 100, chunks[0]),
            );
        }
        frame.render_widget(StatsBar::new(self.session.aggregate_stats(), &self.theme), chunks[1]);

        let list_area = centered_rect(80, 100, chunks[3]);
        let name_width = (list_area.width as usize).saturating_sub(36).max(8);
        let items: Vec<ListItem> = state
            .current_batch
            .iter()
            .map(|card| {
                let (check, name_style) = if card.done {
                    (icons::CHECKED, self.theme.done())
                } else {
                    (icons::UNCHECKED, Style::default().fg(self.theme.palette.text))
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", check), self.theme.highlight()),
                    Span::styled(
                        fit_width(&card.subject, 22),
                        Style::default().fg(self.theme.palette.muted),
                    ),
                    Span::styled(fit_width(&card.name, name_width), name_style),
                    Span::styled(format!(" W{}", card.weight), self.theme.weight_tag(card.weight)),
                ]))
            })
            .collect();

        let title = format!(
            " Current Batch {}/{} ",
            state.done_in_batch(),
            state.current_batch.len()
        );
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.palette.brand))
                    .title(title)
                    .title_style(self.theme.highlight()),
            )
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, list_area, &mut self.batch_list_state);

        let gate = if self.session.is_batch_complete() {
            Line::from(vec![Span::styled(
                format!("{} Press f to mark batch complete", icons::CHECK),
                Style::default().fg(self.theme.palette.ok).add_modifier(Modifier::BOLD),
            )])
        } else {
            Line::from(vec![Span::styled(
                format!("{} Finish all topics first", icons::LOCK),
                Style::default().fg(self.theme.palette.faint),
            )])
        };
        frame.render_widget(Paragraph::new(gate).alignment(Alignment::Center), chunks[4]);

        let hints = KeyHints::new(&[
            ("j/k", "nav"),
            ("Space", "toggle"),
            ("f", "finish"),
            ("s", "syllabus"),
            ("i", "stats"),
            ("q", "quit"),
        ], &self.theme);
        frame.render_widget(hints, chunks[5]);
    }

    fn render_confirm(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(CONFIRM_QUESTION, Style::default().fg(self.theme.palette.text))),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", self.theme.key_highlight()),
                Span::styled(" yes   ", self.theme.key_hint()),
                Span::styled("n", self.theme.key_highlight()),
                Span::styled(" no", self.theme.key_hint()),
            ]),
        ];
        let dialog = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.palette.ok))
                    .title(" Complete Batch ")
                    .title_style(Style::default().fg(self.theme.palette.ok))
                    .style(Style::default().bg(self.theme.palette.background)),
            );
        frame.render_widget(dialog, popup);
    }

    fn render_syllabus(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Min(10),     // Content
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let title = Paragraph::new("Syllabus Progress")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let main_chunks = Layout::horizontal([
            Constraint::Percentage(40),  // Subjects
            Constraint::Percentage(60),  // Topics
        ])
        .split(chunks[1]);

        let progress = self.session.subject_progress();

        let items: Vec<ListItem> = progress
            .iter()
            .map(|subject| {
                let mut spans = vec![Span::styled(
                    fit_width(&subject.subject, 18),
                    Style::default().fg(self.theme.palette.text),
                )];
                spans.extend(progress_bar(subject.percent, 10, &self.theme));
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.palette.brand))
                    .title(" Subjects ")
                    .title_style(self.theme.highlight()),
            )
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, main_chunks[0], &mut self.subject_list_state);

        let selected = self
            .subject_list_state
            .selected()
            .and_then(|i| progress.get(i));
        if let Some(subject) = selected {
            let topic_width = (main_chunks[1].width as usize).saturating_sub(46).max(8);
            let lines: Vec<Line> = subject
                .topics
                .iter()
                .map(|topic| {
                    let mut spans = vec![
                        Span::styled(
                            fit_width(&topic.name, topic_width),
                            Style::default().fg(self.theme.palette.text),
                        ),
                        Span::styled(format!("W{} ", topic.weight), self.theme.weight_tag(topic.weight)),
                        Span::styled(
                            format!("{} left ", topic.left_in_deck),
                            Style::default().fg(self.theme.palette.faint),
                        ),
                    ];
                    spans.extend(progress_bar(topic.percent, 8, &self.theme));
                    spans.push(Span::styled(
                        format!(" {}", topic.status.label()),
                        Style::default().fg(self.theme.palette.muted),
                    ));
                    Line::from(spans)
                })
                .collect();

            let details = Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.palette.keycap))
                    .title(format!(" {} · {}% done ", subject.subject, subject.percent))
                    .title_style(Style::default().fg(self.theme.palette.keycap)),
            );
            frame.render_widget(details, main_chunks[1]);
        }

        let hints = KeyHints::new(&[
            ("j/k", "subject"),
            ("t", "theme"),
            ("Esc", "back"),
        ], &self.theme);
        frame.render_widget(hints, chunks[2]);
    }

    fn render_stats(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(1),   // Spacing
            Constraint::Min(10),     // Stats content
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let title = Paragraph::new("Stats")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let stats = self.session.aggregate_stats();
        let state = self.session.state();
        let label = |text: &'static str| Span::styled(text, Style::default().fg(self.theme.palette.muted));
        let value = |text: String| {
            Span::styled(text, Style::default().fg(self.theme.palette.brand).add_modifier(Modifier::BOLD))
        };

        let mut lines = vec![
            Line::from(vec![label("Cards in full cycle: "), value(stats.total_cards_in_cycle.to_string())]),
            Line::from(vec![label("Drawn this cycle: "), value(stats.completed.to_string())]),
            Line::from(vec![label("Left in decks: "), value(stats.current_cards_left.to_string())]),
            Line::from(""),
        ];
        let mut cycle = vec![label("Cycle progress: ")];
        cycle.extend(progress_bar(stats.percent_done(), 20, &self.theme));
        lines.push(Line::from(cycle));
        lines.push(Line::from(""));

        if state.active {
            lines.push(Line::from(vec![
                label("Active batch: "),
                value(format!("{}/{} done", state.done_in_batch(), state.current_batch.len())),
            ]));
            lines.push(Line::from(vec![label("Deadline: "), value(state.range_str.clone())]));
        } else {
            lines.push(Line::from(vec![label("Active batch: "), value("none".to_string())]));
        }

        let overview = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(self.theme.palette.brand))
                .title(" Overview ")
                .title_style(self.theme.highlight()),
        );
        frame.render_widget(overview, centered_rect(70, 100, chunks[2]));

        let hints = KeyHints::new(&[
            ("t", "theme"),
            ("Esc", "back"),
        ], &self.theme);
        frame.render_widget(hints, chunks[3]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        // Show status message if recent (within 5 seconds)
        if let Some((ref msg, time)) = self.status_message {
            if time.elapsed().as_secs() < 5 {
                let color = if msg.starts_with("Discipline") || msg.starts_with("Save failed") {
                    self.theme.palette.alert
                } else {
                    self.theme.palette.ok
                };
                let status = Paragraph::new(msg.as_str())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(color));
                // Render above the hints
                let status_area = Rect {
                    x: area.x,
                    y: area.bottom().saturating_sub(3),
                    width: area.width,
                    height: 1,
                };
                frame.render_widget(status, status_area);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helper Functions
// ══════════════════════════════════════════════════════════════════════════

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

/// Pad or truncate to exactly `width` display columns, ending in `…` when cut.
fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{}{}", text, " ".repeat(width - text.width()));
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
