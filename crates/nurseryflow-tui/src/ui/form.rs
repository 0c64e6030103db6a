use crossterm::event::{Event, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::keymap;
use crate::theme;
use crate::ui::text::focus_line;

/// One labelled single-line text input.
#[derive(Debug, Clone)]
pub(crate) struct InputField {
    label: &'static str,
    input: Input,
}

impl InputField {
    pub(crate) fn new(label: &'static str, value: &str) -> Self {
        Self {
            label,
            input: Input::new(value.to_string()),
        }
    }

    pub(crate) fn value(&self) -> &str {
        self.input.value()
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) {
        self.input.handle_event(&Event::Key(key));
    }

    pub(crate) fn render(&self, frame: &mut Frame<'_>, area: Rect, focused: bool) {
        let title = if focused {
            focus_line(self.label)
        } else {
            Line::from(self.label)
        };
        let width = area.width.saturating_sub(2) as usize;
        let scroll = self.input.visual_scroll(width);
        frame.render_widget(
            Paragraph::new(self.input.value())
                .scroll((0, u16::try_from(scroll).unwrap_or(u16::MAX)))
                .block(theme::chrome(title)),
            area,
        );

        if focused && width > 0 {
            let relative = self
                .input
                .visual_cursor()
                .saturating_sub(scroll)
                .min(width - 1);
            frame.set_cursor_position((area.x + 1 + relative as u16, area.y + 1));
        }
    }
}

/// A column of text inputs with Tab / Shift+Tab focus cycling.
#[derive(Debug, Clone)]
pub(crate) struct FieldSet {
    fields: Vec<InputField>,
    focused: usize,
}

impl FieldSet {
    pub(crate) fn new(fields: Vec<InputField>) -> Self {
        Self { fields, focused: 0 }
    }

    pub(crate) fn value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", InputField::value)
    }

    /// Routes a key to the form. Tab keys move focus; everything else edits the
    /// focused field.
    pub(crate) fn on_key(&mut self, key: KeyEvent) {
        let count = self.fields.len().max(1);
        if keymap::is_next_field(key) {
            self.focused = (self.focused + 1) % count;
        } else if keymap::is_prev_field(key) {
            self.focused = (self.focused + count - 1) % count;
        } else if let Some(field) = self.fields.get_mut(self.focused) {
            field.on_key(key);
        }
    }

    pub(crate) fn height(&self) -> u16 {
        u16::try_from(self.fields.len() * 3).unwrap_or(u16::MAX)
    }

    pub(crate) fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(self.fields.iter().map(|_| Constraint::Length(3)))
            .split(area);
        for (index, (field, field_area)) in self.fields.iter().zip(areas.iter()).enumerate() {
            field.render(frame, *field_area, index == self.focused);
        }
    }
}

/// Next (or previous) entry in a focus order, wrapping at both ends.
pub(crate) fn cycle<T: Copy + PartialEq>(order: &[T], current: T, forward: bool) -> T {
    let Some(position) = order.iter().position(|entry| *entry == current) else {
        return order.first().copied().unwrap_or(current);
    };
    let len = order.len();
    let next = if forward {
        (position + 1) % len
    } else {
        (position + len - 1) % len
    };
    order[next]
}
