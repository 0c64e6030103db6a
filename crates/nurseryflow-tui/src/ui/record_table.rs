use crossterm::event::{Event, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Margin, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{
    Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table, TableState,
};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::keymap;
use crate::theme;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TableColumn {
    pub(crate) title: &'static str,
    pub(crate) width: Constraint,
}

pub(crate) struct TableRender<'a> {
    pub(crate) title: Line<'a>,
    pub(crate) empty_message: &'a str,
    pub(crate) columns: &'a [TableColumn],
    pub(crate) header_style: Style,
    pub(crate) highlight_style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableSignal {
    Continue,
    Back,
    Confirm,
}

/// Selectable rows with a Tab-focused substring filter over `search_text`.
#[derive(Debug)]
pub(crate) struct RecordTable<T> {
    rows: Vec<T>,
    filtered: Vec<usize>,
    selected: usize,
    query: Input,
    filter_focused: bool,
    search_text: fn(&T) -> String,
}

impl<T> RecordTable<T> {
    pub(crate) fn new(rows: Vec<T>, search_text: fn(&T) -> String) -> Self {
        let mut table = Self {
            rows,
            filtered: Vec::new(),
            selected: 0,
            query: Input::default(),
            filter_focused: false,
            search_text,
        };
        table.refresh_filtered();
        table
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) -> TableSignal {
        if keymap::is_back(key) {
            if self.filter_focused {
                self.filter_focused = false;
                return TableSignal::Continue;
            }
            return TableSignal::Back;
        }

        if keymap::is_next_field(key) {
            self.filter_focused = !self.filter_focused;
            return TableSignal::Continue;
        }

        if keymap::is_confirm(key) {
            self.filter_focused = false;
            return TableSignal::Confirm;
        }

        if self.filter_focused {
            if self.query.handle_event(&Event::Key(key)).is_some() {
                self.refresh_filtered();
            }
            return TableSignal::Continue;
        }

        if keymap::is_up(key) {
            self.selected = self.selected.saturating_sub(1);
        } else if keymap::is_down(key) && self.selected + 1 < self.filtered.len() {
            self.selected += 1;
        }
        TableSignal::Continue
    }

    pub(crate) fn selected_row(&self) -> Option<&T> {
        self.rows.get(*self.filtered.get(self.selected)?)
    }

    pub(crate) fn filter_focused(&self) -> bool {
        self.filter_focused
    }

    pub(crate) fn render_filter(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = if self.filter_focused {
            crate::ui::text::focus_line("Filter")
        } else {
            Line::from("Filter (Tab to focus)")
        };
        let width = area.width.saturating_sub(2) as usize;
        let scroll = self.query.visual_scroll(width);
        let paragraph = Paragraph::new(self.query.value())
            .scroll((0, u16::try_from(scroll).unwrap_or(u16::MAX)))
            .block(theme::chrome(title));
        frame.render_widget(paragraph, area);

        if self.filter_focused && width > 0 {
            let relative = self
                .query
                .visual_cursor()
                .saturating_sub(scroll)
                .min(width - 1);
            frame.set_cursor_position((area.x + 1 + relative as u16, area.y + 1));
        }
    }

    pub(crate) fn render_table<F>(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        render: TableRender<'_>,
        cells: F,
    ) where
        F: Fn(&T) -> Vec<String>,
    {
        if self.filtered.is_empty() {
            let empty = Paragraph::new(render.empty_message).block(theme::chrome(render.title));
            frame.render_widget(empty, area);
            return;
        }

        let header =
            Row::new(render.columns.iter().map(|column| column.title)).style(render.header_style);
        let rows = self
            .filtered
            .iter()
            .filter_map(|index| self.rows.get(*index))
            .map(|row| Row::new(cells(row)));
        let widths = render.columns.iter().map(|column| column.width);

        let table = Table::new(rows, widths)
            .header(header)
            .block(theme::chrome(render.title))
            .row_highlight_style(render.highlight_style)
            .highlight_symbol(">> ");

        let mut state = TableState::new().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);

        let mut scrollbar = ScrollbarState::new(self.filtered.len())
            .position(self.selected)
            .viewport_content_length(area.height.saturating_sub(3) as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar,
        );
    }

    fn refresh_filtered(&mut self) {
        let query = self.query.value().trim().to_lowercase();
        let search_text = self.search_text;
        self.filtered = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| query.is_empty() || search_text(row).to_lowercase().contains(&query))
            .map(|(index, _)| index)
            .collect();
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }

    #[cfg(test)]
    pub(crate) fn visible_len(&self) -> usize {
        self.filtered.len()
    }
}
