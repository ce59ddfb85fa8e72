//! Custom widgets for the study deck TUI.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::BorderType, Block, Borders, Paragraph, Widget},
};

use super::theme::{icons, Theme};
use crate::progress::AggregateStats;
use crate::scheduler::Countdown;

// ══════════════════════════════════════════════════════════════════════════
// Logo Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct Logo;

impl Logo {
    const BANNER: [&'static str; 5] = [
        r" ___ _            _         ___         _   ",
        r"/ __| |_ _  _ __| |_  _   |   \ ___ __| |__",
        r"\__ \  _| || / _` | || |  | |) / -_) _| / /",
        r"|___/\__|\_,_\__,_|\_, |  |___/\___\__|_\_\",
        r"                   |__/    weighted draws  ",
    ];

    pub fn render_to(theme: &Theme, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(theme.palette.brand);
        let text: Text = Self::BANNER
            .iter()
            .map(|row| Line::styled(*row, style))
            .collect();
        Paragraph::new(text).centered().render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Stats Bar Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct StatsBar<'a> {
    stats: AggregateStats,
    theme: &'a Theme,
}

impl<'a> StatsBar<'a> {
    pub fn new(stats: AggregateStats, theme: &'a Theme) -> Self {
        Self { stats, theme }
    }
}

impl Widget for StatsBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

        let cells = [
            ("Drawn: ", self.stats.completed.to_string(), self.theme.palette.ok),
            ("Left in decks: ", self.stats.current_cards_left.to_string(), self.theme.palette.calm),
            (
                "Cycle: ",
                format!("{}%", self.stats.percent_done()),
                self.theme.palette.brand,
            ),
        ];

        for ((label, value, color), chunk) in cells.into_iter().zip(chunks.iter()) {
            let line = Line::from(vec![
                Span::styled("● ", Style::default().fg(color)),
                Span::styled(label, Style::default().fg(self.theme.palette.muted)),
                Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            ]);
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .render(*chunk, buf);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Deadline Banner Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct DeadlineBanner<'a> {
    countdown: Countdown,
    range_str: &'a str,
    theme: &'a Theme,
}

impl<'a> DeadlineBanner<'a> {
    pub fn new(countdown: Countdown, range_str: &'a str, theme: &'a Theme) -> Self {
        Self {
            countdown,
            range_str,
            theme,
        }
    }
}

impl Widget for DeadlineBanner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let alert = self.countdown.is_alert();
        let style = self.theme.countdown(alert);
        let icon = if alert { icons::WARNING } else { icons::CLOCK };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(style)
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(self.countdown.badge(), style),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center);

        let inner = block.inner(area);
        block.render(area, buf);

        Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", icon), style),
            Span::styled(self.countdown.headline(self.range_str), style),
        ]))
        .alignment(Alignment::Center)
        .render(inner, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Progress Bar
// ══════════════════════════════════════════════════════════════════════════

/// A one-line text gauge, `█████░░░░░ 50%`.
pub fn progress_bar<'a>(percent: u8, width: usize, theme: &Theme) -> Vec<Span<'a>> {
    let filled = (percent as usize * width + 50) / 100;
    let filled = filled.min(width);
    vec![
        Span::styled("█".repeat(filled), theme.progress_fill(percent)),
        Span::styled(
            "░".repeat(width - filled),
            Style::default().fg(theme.palette.faint),
        ),
        Span::styled(
            format!(" {:>3}%", percent),
            Style::default().fg(theme.palette.muted),
        ),
    ]
}

// ══════════════════════════════════════════════════════════════════════════
// Key Hints Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct KeyHints<'a> {
    hints: &'a [(&'a str, &'a str)],
    theme: &'a Theme,
}

impl<'a> KeyHints<'a> {
    pub fn new(hints: &'a [(&'a str, &'a str)], theme: &'a Theme) -> Self {
        Self { hints, theme }
    }
}

impl Widget for KeyHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let separator = Span::styled("  ·  ", Style::default().fg(self.theme.palette.faint));
        let mut spans = Vec::with_capacity(self.hints.len() * 3);
        for (i, (key, action)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(separator.clone());
            }
            spans.push(Span::styled(*key, self.theme.key_highlight()));
            spans.push(Span::styled(format!(" {}", action), self.theme.key_hint()));
        }
        Paragraph::new(Line::from(spans)).centered().render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_progress_bar_fill() {
        let theme = Theme::default();
        assert_eq!(text(&progress_bar(50, 10, &theme)), "█████░░░░░  50%");
        assert_eq!(text(&progress_bar(0, 4, &theme)), "░░░░   0%");
        assert_eq!(text(&progress_bar(100, 4, &theme)), "████ 100%");
    }

    #[test]
    fn test_deadline_banner_renders_headline() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        DeadlineBanner::new(Countdown::Overdue, "Deadline: Mon, Feb 16", &theme)
            .render(area, &mut buf);

        let rendered: String = (0..area.width)
            .map(|x| buf[(x, 1)].symbol().to_string())
            .collect();
        assert!(rendered.contains("OVERDUE"));
    }
}
