//! Palettes and shared styles.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Palette {
    pub brand: Color,
    pub keycap: Color,

    pub ok: Color,
    pub partial: Color,
    pub alert: Color,
    pub calm: Color,

    pub background: Color,
    pub selection: Color,

    pub text: Color,
    pub muted: Color,
    pub faint: Color,

    /// Tag colors for weight 1, 2 and 3+.
    pub weights: [Color; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Slate,
    Parchment,
}

impl ThemeKind {
    pub const ALL: [ThemeKind; 2] = [ThemeKind::Slate, ThemeKind::Parchment];

    /// Name stored in the config file.
    pub fn key(self) -> &'static str {
        match self {
            ThemeKind::Slate => "slate",
            ThemeKind::Parchment => "parchment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeKind::Slate => "Slate",
            ThemeKind::Parchment => "Parchment",
        }
    }

    /// Unknown names fall back to slate.
    pub fn from_key(key: &str) -> Self {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == key)
            .unwrap_or(ThemeKind::Slate)
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub kind: ThemeKind,
    pub palette: Palette,
}

impl Theme {
    pub fn new(kind: ThemeKind) -> Self {
        let palette = match kind {
            ThemeKind::Slate => Palette {
                brand: Color::Rgb(45, 212, 191),       // teal 400
                keycap: Color::Rgb(251, 146, 60),      // orange 400
                ok: Color::Rgb(74, 222, 128),
                partial: Color::Rgb(250, 204, 21),
                alert: Color::Rgb(248, 113, 113),
                calm: Color::Rgb(96, 165, 250),
                background: Color::Rgb(17, 24, 39),
                selection: Color::Rgb(55, 65, 81),
                text: Color::Rgb(243, 244, 246),
                muted: Color::Rgb(156, 163, 175),
                faint: Color::Rgb(107, 114, 128),
                weights: [
                    Color::Rgb(134, 239, 172),
                    Color::Rgb(253, 224, 71),
                    Color::Rgb(252, 165, 165),
                ],
            },
            ThemeKind::Parchment => Palette {
                brand: Color::Rgb(120, 53, 15),        // sepia
                keycap: Color::Rgb(153, 27, 27),       // oxblood
                ok: Color::Rgb(21, 128, 61),
                partial: Color::Rgb(161, 98, 7),
                alert: Color::Rgb(185, 28, 28),
                calm: Color::Rgb(30, 64, 175),
                background: Color::Rgb(250, 243, 224),
                selection: Color::Rgb(231, 215, 178),
                text: Color::Rgb(41, 37, 36),
                muted: Color::Rgb(87, 83, 78),
                faint: Color::Rgb(140, 130, 115),
                weights: [
                    Color::Rgb(21, 128, 61),
                    Color::Rgb(161, 98, 7),
                    Color::Rgb(185, 28, 28),
                ],
            },
        };
        Self { kind, palette }
    }

    pub fn from_key(key: &str) -> Self {
        Self::new(ThemeKind::from_key(key))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Styles
    // ══════════════════════════════════════════════════════════════════════

    fn bold(color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn title(&self) -> Style {
        Self::bold(self.palette.text)
    }

    pub fn highlight(&self) -> Style {
        Self::bold(self.palette.brand)
    }

    pub fn selected(&self) -> Style {
        Style::default().fg(self.palette.text).bg(self.palette.selection)
    }

    pub fn weight_tag(&self, weight: u32) -> Style {
        let slot = (weight.max(1) as usize - 1).min(2);
        Self::bold(self.palette.weights[slot])
    }

    pub fn done(&self) -> Style {
        Style::default()
            .fg(self.palette.faint)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    pub fn countdown(&self, alert: bool) -> Style {
        Self::bold(if alert { self.palette.alert } else { self.palette.calm })
    }

    pub fn progress_fill(&self, percent: u8) -> Style {
        Style::default().fg(match percent {
            0 => self.palette.faint,
            100 => self.palette.ok,
            _ => self.palette.partial,
        })
    }

    pub fn key_hint(&self) -> Style {
        Style::default().fg(self.palette.faint)
    }

    pub fn key_highlight(&self) -> Style {
        Self::bold(self.palette.keycap)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeKind::Slate)
    }
}

pub mod icons {
    pub const CHECKED: &str = "[x]";
    pub const UNCHECKED: &str = "[ ]";
    pub const LOCK: &str = "🔒";
    pub const CHECK: &str = "✓";
    pub const WARNING: &str = "⚠";
    pub const CLOCK: &str = "⏱";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_keys() {
        for kind in ThemeKind::ALL {
            assert_eq!(ThemeKind::from_key(kind.key()), kind);
        }
        assert_eq!(ThemeKind::from_key(" Parchment "), ThemeKind::Parchment);
        assert_eq!(ThemeKind::from_key("unknown"), ThemeKind::Slate);
        assert_eq!(ThemeKind::Slate.next(), ThemeKind::Parchment);
        assert_eq!(ThemeKind::Parchment.next(), ThemeKind::Slate);
    }

    #[test]
    fn test_weight_tags() {
        let theme = Theme::default();
        let [light, medium, heavy] = theme.palette.weights;
        assert_eq!(theme.weight_tag(0).fg, Some(light));
        assert_eq!(theme.weight_tag(1).fg, Some(light));
        assert_eq!(theme.weight_tag(2).fg, Some(medium));
        assert_eq!(theme.weight_tag(3).fg, Some(heavy));
        assert_eq!(theme.weight_tag(7).fg, Some(heavy));
    }
}
