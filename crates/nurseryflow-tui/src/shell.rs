use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span, Text};

use crate::theme;
use crate::ui::text::{key_hint_height, key_hint_paragraph, wrapped_paragraph};

/// Frame around the active wizard step: title and target line, progress
/// line, the step body, an inline error slot and the key hints.
pub(crate) struct ShellView<'a> {
    pub(crate) title: &'a str,
    pub(crate) target: String,
    pub(crate) progress: Line<'static>,
    pub(crate) error: Option<&'a str>,
    pub(crate) keys: &'a str,
}

/// Draws the chrome and returns the area left for the step body.
pub(crate) fn render_shell(frame: &mut Frame<'_>, view: ShellView<'_>) -> Rect {
    let area = frame.area();
    let footer_height = key_hint_height(area.width, view.keys);
    let error_height = if view.error.is_some() { 3 } else { 0 };

    let [header, body, error, footer] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(error_height),
            Constraint::Length(footer_height),
        ])
        .areas(area);

    let header_text = Text::from(vec![Line::from(view.target), view.progress]);
    frame.render_widget(
        wrapped_paragraph(header_text).block(theme::chrome(view.title)),
        header,
    );

    if let Some(message) = view.error {
        frame.render_widget(
            wrapped_paragraph(Line::from(Span::styled(
                message.to_string(),
                theme::error_prompt(),
            )))
            .block(theme::chrome("Cannot continue")),
            error,
        );
    }

    frame.render_widget(
        key_hint_paragraph(view.keys).block(theme::key_block()),
        footer,
    );

    body
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::text::Line;

    use super::{ShellView, render_shell};

    #[test]
    fn shell_shows_error_slot_only_when_set() {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal
            .draw(|frame| {
                render_shell(
                    frame,
                    ShellView {
                        title: "Pick list",
                        target: "SO-1042 for Greenway".to_string(),
                        progress: Line::from("Step 1/6"),
                        error: Some("picker: enter who is picking"),
                        keys: "Enter: save    Esc: back",
                    },
                );
            })
            .expect("draw");
        let output = format!("{}", terminal.backend());
        assert!(output.contains("SO-1042 for Greenway"));
        assert!(output.contains("Step 1/6"));
        assert!(output.contains("enter who is picking"));

        terminal
            .draw(|frame| {
                render_shell(
                    frame,
                    ShellView {
                        title: "Pick list",
                        target: String::new(),
                        progress: Line::from("Step 1/6"),
                        error: None,
                        keys: "Enter: save",
                    },
                );
            })
            .expect("draw");
        assert!(!format!("{}", terminal.backend()).contains("Cannot continue"));
    }
}
