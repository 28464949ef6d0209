use ratatui::style::{Color, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Header indicator: shows what a toggle switches to, like the
    /// sun/moon button in a web chat widget.
    pub fn indicator(&self) -> &'static str {
        match self {
            Theme::Light => "☾ dark",
            Theme::Dark => "☀ light",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Light => Palette {
                text: Style::default().fg(Color::Black),
                dim: Style::default().fg(Color::DarkGray),
                header: Style::default().bg(Color::Cyan).fg(Color::Black),
                user: Style::default().fg(Color::Blue),
                assistant: Style::default().fg(Color::Black),
                system: Style::default().fg(Color::DarkGray),
                border: Style::default().fg(Color::DarkGray),
                border_focused: Style::default().fg(Color::Blue),
            },
            Theme::Dark => Palette {
                text: Style::default().fg(Color::White),
                dim: Style::default().fg(Color::Gray),
                header: Style::default().bg(Color::DarkGray).fg(Color::White),
                user: Style::default().fg(Color::Cyan),
                assistant: Style::default().fg(Color::White),
                system: Style::default().fg(Color::Gray),
                border: Style::default().fg(Color::Gray),
                border_focused: Style::default().fg(Color::Cyan),
            },
        }
    }
}

/// Styles for one theme, resolved once per draw.
pub struct Palette {
    pub text: Style,
    pub dim: Style,
    pub header: Style,
    pub user: Style,
    pub assistant: Style,
    pub system: Style,
    pub border: Style,
    pub border_focused: Style,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_round_trips() {
        assert_eq!(Theme::Light.toggled().toggled(), Theme::Light);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn test_as_str_from_str_agree() {
        for theme in [Theme::Light, Theme::Dark] {
            assert_eq!(Theme::from_str(theme.as_str()), Some(theme));
        }
        assert_eq!(Theme::from_str("DARK"), Some(Theme::Dark));
        assert_eq!(Theme::from_str("solarized"), None);
    }
}
