use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};

use crate::theme;

pub(crate) fn wrapped_paragraph<'a, T>(text: T) -> Paragraph<'a>
where
    T: Into<Text<'a>>,
{
    Paragraph::new(text).wrap(Wrap { trim: false })
}

pub(crate) fn key_hint_paragraph<'a, T>(text: T) -> Paragraph<'a>
where
    T: Into<Text<'a>>,
{
    wrapped_paragraph(text).alignment(Alignment::Center)
}

pub(crate) fn key_hint_height(total_width: u16, text: &str) -> u16 {
    let content_width = total_width.saturating_sub(2).max(1) as usize;
    wrapped_line_count(text, content_width).saturating_add(2).max(3)
}

pub(crate) fn compact_hint<'a>(
    width: u16,
    full: &'a str,
    medium: &'a str,
    compact: &'a str,
) -> &'a str {
    match width {
        110.. => full,
        78.. => medium,
        _ => compact,
    }
}

pub(crate) fn focus_line(message: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(message.into(), theme::focus_prompt()))
}

pub(crate) fn label_value_line(
    label: impl Into<String>,
    value: impl Into<String>,
) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label.into()), theme::secondary_text()),
        Span::raw(value.into()),
    ])
}

pub(crate) fn highlighted_label_value_line(
    label: impl Into<String>,
    value: impl Into<String>,
) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label.into()), theme::focus_prompt()),
        Span::styled(
            value.into(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        ),
    ])
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

pub(crate) fn result_footer(width: u16) -> &'static str {
    compact_hint(
        width,
        "Enter/Esc: back to home    q: quit nurseryflow",
        "Enter/Esc: home    q: quit",
        "Enter/Esc home | q quit",
    )
}

/// Rows a hint occupies once wrapped at `width` columns. Characters are
/// counted one cell each and tabs four.
fn wrapped_line_count(text: &str, width: usize) -> u16 {
    let width = width.max(1);
    let rows: usize = text
        .split('\n')
        .map(|line| {
            let cells: usize = line
                .chars()
                .map(|ch| if ch == '\t' { 4 } else { 1 })
                .sum();
            cells.div_ceil(width).max(1)
        })
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use ratatui::style::{Color, Modifier};

    use super::{
        compact_hint, focus_line, highlighted_label_value_line, key_hint_height, label_value_line,
        result_footer, wrapped_line_count, yes_no,
    };

    #[test]
    fn compact_hint_selects_variant_by_width() {
        assert_eq!(compact_hint(120, "full", "medium", "compact"), "full");
        assert_eq!(compact_hint(90, "full", "medium", "compact"), "medium");
        assert_eq!(compact_hint(60, "full", "medium", "compact"), "compact");
    }

    #[test]
    fn key_hint_height_grows_only_when_hint_wraps() {
        assert_eq!(key_hint_height(80, "Enter: continue    Esc: back"), 3);
        assert!(key_hint_height(20, "Enter: save    Tab: next field    Esc: back") > 3);
    }

    #[test]
    fn wrapped_line_count_counts_each_line_and_tabs() {
        assert_eq!(wrapped_line_count("", 10), 1);
        assert_eq!(wrapped_line_count("abcdef", 3), 2);
        assert_eq!(wrapped_line_count("ab\n\ncd", 10), 3);
        assert_eq!(wrapped_line_count("\t\t", 4), 2);
    }

    #[test]
    fn focus_and_label_lines_use_theme_styles() {
        let line = focus_line("Choose a pick list");
        assert_eq!(line.spans[0].style.fg, Some(Color::Blue));

        let line = label_value_line("Order", "SO-1042");
        assert_eq!(line.spans[0].content.as_ref(), "Order: ");
        assert_eq!(line.spans[1].content.as_ref(), "SO-1042");

        let line = highlighted_label_value_line("Override", "Yes");
        assert!(
            line.spans[1]
                .style
                .add_modifier
                .contains(Modifier::UNDERLINED)
        );
    }

    #[test]
    fn footer_and_yes_no_strings() {
        assert_eq!(yes_no(true), "Yes");
        assert_eq!(yes_no(false), "No");
        assert_eq!(result_footer(60), "Enter/Esc home | q quit");
        assert!(result_footer(120).contains("quit nurseryflow"));
    }
}
