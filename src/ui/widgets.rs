//! Custom TUI widgets

use super::theme::ThemeColors;
use crate::tally::Snapshot;
use ratatui::{
    buffer::Buffer,
    layout::{Direction, Rect},
    style::{Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Widget},
};

fn panel<'a>(title: &'a str, colors: &ThemeColors) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(colors.dim))
}

/// Ranked list of key counts
pub struct CountsPanel<'a> {
    snapshot: &'a Snapshot,
    scroll: usize,
    colors: ThemeColors,
}

impl<'a> CountsPanel<'a> {
    pub fn new(snapshot: &'a Snapshot, scroll: usize, colors: ThemeColors) -> Self {
        Self {
            snapshot,
            scroll,
            colors,
        }
    }
}

impl Widget for CountsPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Key Usage ", &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.snapshot.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "No key presses recorded yet.",
                Style::default().fg(self.colors.dim),
            );
            return;
        }

        let total = self.snapshot.total().max(1);
        let key_width = self
            .snapshot
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(5, 16);

        let rows = self
            .snapshot
            .ranked()
            .into_iter()
            .enumerate()
            .skip(self.scroll)
            .take(inner.height as usize);

        for (line_no, (rank, (key, count))) in rows.enumerate() {
            let share = count as f64 * 100.0 / total as f64;
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>4}. ", rank + 1),
                    Style::default().fg(self.colors.dim),
                ),
                Span::styled(
                    format!("{:<width$} ", key, width = key_width),
                    Style::default()
                        .fg(self.colors.fg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:>9}", count),
                    Style::default().fg(self.colors.accent),
                ),
                Span::styled(
                    format!("  {:>5.1}%", share),
                    Style::default().fg(self.colors.dim),
                ),
            ]);
            buf.set_line(inner.x, inner.y + line_no as u16, &line, inner.width);
        }
    }
}

/// Horizontal bar chart of the most pressed keys
pub struct KeyChart<'a> {
    snapshot: &'a Snapshot,
    limit: usize,
    colors: ThemeColors,
}

impl<'a> KeyChart<'a> {
    pub fn new(snapshot: &'a Snapshot, limit: usize, colors: ThemeColors) -> Self {
        Self {
            snapshot,
            limit,
            colors,
        }
    }
}

impl Widget for KeyChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Keystroke Statistics ", &self.colors);

        if self.snapshot.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            buf.set_string(
                inner.x + 1,
                inner.y,
                "Not enough data for a chart.",
                Style::default().fg(self.colors.dim),
            );
            return;
        }

        // One row per bar inside the borders
        let rows = area.height.saturating_sub(2) as usize;
        let bars: Vec<Bar> = self
            .snapshot
            .top(self.limit.min(rows))
            .into_iter()
            .map(|(key, count)| {
                Bar::default()
                    .label(Line::from(key.to_string()))
                    .value(count)
                    .text_value(count.to_string())
            })
            .collect();

        BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .bar_style(Style::default().fg(self.colors.bar))
            .value_style(Style::default().fg(self.colors.fg).bg(self.colors.bar))
            .label_style(Style::default().fg(self.colors.fg))
            .data(BarGroup::default().bars(&bars))
            .render(area, buf);
    }
}

/// Widget for the help screen
pub struct HelpPanel {
    colors: ThemeColors,
}

impl HelpPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for HelpPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Help - Keystroke Tally ", &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        let help_text = [
            "",
            " NAVIGATION",
            " -----------",
            " Tab / Shift+Tab  : Switch between views",
            " Up / Down        : Scroll the key list",
            " q / Esc          : Quit (counting stops)",
            "",
            " EXPORT",
            " -----------",
            " e                : Save statistics as text",
            " j                : Save statistics as JSON report",
            "",
            " Every key press anywhere on the system is counted",
            " and saved immediately. Typed text is never stored,",
            " only how often each key was pressed.",
        ];

        for (i, line) in help_text.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if line.contains("---") {
                Style::default().fg(self.colors.dim)
            } else if line.trim().chars().all(|c| c.is_ascii_uppercase()) && !line.trim().is_empty()
            {
                Style::default()
                    .fg(self.colors.warn)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_string(inner.x, inner.y + i as u16, line, style);
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    state: &'a str,
    view: &'a str,
    keyboard: &'a str,
    total: u64,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(state: &'a str, view: &'a str, keyboard: &'a str, total: u64, colors: ThemeColors) -> Self {
        Self {
            state,
            view,
            keyboard,
            total,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.dim).fg(self.colors.fg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let left = format!(" {} | {} ", self.state, self.view);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        // Transient message takes the middle, otherwise the keyboard name
        let (middle, middle_style) = match self.message {
            Some(msg) => (msg, Style::default().bg(self.colors.dim).fg(self.colors.warn)),
            None => (self.keyboard, bg_style),
        };
        let middle_x = area.x + (area.width / 2).saturating_sub(middle.len() as u16 / 2);
        buf.set_string(middle_x, area.y, middle, middle_style);

        let right = format!(" Presses: {} ", self.total);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

/// Tab bar widget
pub struct TabBar<'a> {
    tabs: &'a [&'a str],
    selected: usize,
    colors: ThemeColors,
}

impl<'a> TabBar<'a> {
    pub fn new(tabs: &'a [&'a str], selected: usize, colors: ThemeColors) -> Self {
        Self {
            tabs,
            selected,
            colors,
        }
    }
}

impl Widget for TabBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut x = area.x;
        let idle = Style::default().fg(self.colors.fg).bg(self.colors.dim);

        for (i, tab) in self.tabs.iter().enumerate() {
            let style = if i == self.selected {
                Style::default()
                    .fg(self.colors.bg)
                    .bg(self.colors.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                idle
            };

            let label = format!(" {} ", tab);
            let width = label.len() as u16;
            if x + width > area.x + area.width {
                break;
            }
            buf.set_string(x, area.y, &label, style);
            x += width;
        }

        for fill_x in x..area.x + area.width {
            buf.set_string(fill_x, area.y, " ", idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::Counts;

    fn render_to_string(widget: impl Widget, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sample() -> Snapshot {
        Snapshot::from(Counts::from([
            ("a".to_string(), 2),
            ("space".to_string(), 1),
        ]))
    }

    #[test]
    fn counts_panel_lists_ranked_keys() {
        let snapshot = sample();
        let text = render_to_string(CountsPanel::new(&snapshot, 0, ThemeColors::dark()), 40, 6);
        let a_line = text.lines().position(|l| l.contains(" a ")).unwrap();
        let space_line = text.lines().position(|l| l.contains("space")).unwrap();
        assert!(a_line < space_line);
    }

    #[test]
    fn counts_panel_empty_message() {
        let snapshot = Snapshot::default();
        let text = render_to_string(CountsPanel::new(&snapshot, 0, ThemeColors::dark()), 40, 4);
        assert!(text.contains("No key presses recorded yet."));
    }

    #[test]
    fn chart_renders_labels() {
        let snapshot = sample();
        let text = render_to_string(KeyChart::new(&snapshot, 10, ThemeColors::dark()), 40, 6);
        assert!(text.contains("space"));
    }

    #[test]
    fn status_bar_shows_total() {
        let text = render_to_string(
            StatusBar::new("LISTENING", "Counts", "Test Keyboard", 42, ThemeColors::dark()),
            80,
            1,
        );
        assert!(text.contains("Presses: 42"));
        assert!(text.contains("LISTENING"));
        assert!(text.contains("Test Keyboard"));
    }
}
