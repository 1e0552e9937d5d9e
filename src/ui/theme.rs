//! Theme color definitions for the UI

use crate::config::Theme;
use ratatui::style::Color;

/// Color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text and borders
    pub dim: Color,
    /// Accent color (headings, active tab)
    pub accent: Color,
    /// Chart bars
    pub bar: Color,
    /// Transient messages and warnings
    pub warn: Color,
    /// Error status
    pub error: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(33, 33, 33),
            fg: Color::Rgb(224, 224, 224),
            dim: Color::Rgb(117, 117, 117),
            accent: Color::Rgb(80, 200, 220),
            bar: Color::Rgb(0, 122, 204),
            warn: Color::Rgb(240, 180, 80),
            error: Color::Rgb(240, 90, 100),
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            accent: Color::Rgb(0, 130, 160),
            bar: Color::Rgb(0, 95, 153),
            warn: Color::Rgb(180, 120, 0),
            error: Color::Rgb(200, 50, 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_theme_selects_correct_palette() {
        let dark = ThemeColors::from_theme(Theme::Dark);
        let light = ThemeColors::from_theme(Theme::Light);
        assert_eq!(dark.bg, Color::Rgb(33, 33, 33));
        assert_ne!(dark.bg, light.bg);
    }
}
