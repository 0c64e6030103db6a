use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{List, ListItem, ListState};

use nurseryflow_core::scouting::{Location, ScoutStep, Severity, logged_entry};

use super::entry::{LogEditor, LogFocus, mode_label};
use super::treatment::TreatmentEditor;
use super::{BatchChoice, ScoutWizard, Stage};
use crate::shell::{ShellView, render_shell};
use crate::theme;
use crate::ui::modal::{render_busy_modal, render_success_modal};
use crate::ui::progress::progress_line;
use crate::ui::record_table::{TableColumn, TableRender};
use crate::ui::text::{
    compact_hint, highlighted_label_value_line, label_value_line, result_footer,
    wrapped_paragraph,
};

const LOCATION_COLUMNS: [TableColumn; 3] = [
    TableColumn {
        title: "ID",
        width: Constraint::Length(16),
    },
    TableColumn {
        title: "Location",
        width: Constraint::Min(20),
    },
    TableColumn {
        title: "Batches",
        width: Constraint::Length(9),
    },
];

const BATCH_COLUMNS: [TableColumn; 3] = [
    TableColumn {
        title: "Batch",
        width: Constraint::Length(14),
    },
    TableColumn {
        title: "Variety",
        width: Constraint::Min(20),
    },
    TableColumn {
        title: "Plants",
        width: Constraint::Length(8),
    },
];

fn location_cells(location: &Location) -> Vec<String> {
    vec![
        location.id.clone(),
        location.name.clone(),
        location.batches.len().to_string(),
    ]
}

fn batch_cells(choice: &BatchChoice) -> Vec<String> {
    vec![
        choice.label.clone(),
        choice.variety.clone(),
        choice
            .quantity
            .map(|quantity| quantity.to_string())
            .unwrap_or_default(),
    ]
}

fn severity_line(current: Severity, focused: bool) -> Line<'static> {
    let mut spans = vec![Span::styled("Severity: ", label_style(focused))];
    for severity in Severity::ALL {
        let style = if severity == current {
            theme::step_current()
        } else {
            theme::secondary_text()
        };
        spans.push(Span::styled(format!(" {} ", severity.label()), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn label_style(focused: bool) -> ratatui::style::Style {
    if focused {
        theme::focus_prompt()
    } else {
        theme::secondary_text()
    }
}

impl ScoutWizard {
    pub(super) fn render(&self, frame: &mut Frame<'_>) {
        match self.stage {
            Stage::SelectLocation => self.render_locations(frame),
            Stage::SelectBatch => self.render_batches(frame),
            Stage::Steps => self.render_steps(frame),
            Stage::Done => self.render_done(frame),
        }
    }

    fn render_locations(&self, frame: &mut Frame<'_>) {
        let keys = compact_hint(
            frame.area().width,
            "Up/Down: move    Tab: filter    Enter: scout location    Esc: home",
            "Up/Down: move    Tab: filter    Enter: scout    Esc: home",
            "Up/Down | Tab filter | Enter scout | Esc home",
        );
        let body = render_shell(
            frame,
            ShellView {
                title: "Scouting",
                target: "Choose a location to scout".to_string(),
                progress: Line::from(Span::styled(
                    format!("Scout: {}", self.operator),
                    theme::secondary_text(),
                )),
                error: self.error.as_deref(),
                keys,
            },
        );
        let [filter, table] = split_filter(body);
        self.locations.render_filter(frame, filter);
        self.locations.render_table(
            frame,
            table,
            TableRender {
                title: Line::from("Locations"),
                empty_message: "No locations configured.",
                columns: &LOCATION_COLUMNS,
                header_style: theme::table_header(Color::Green),
                highlight_style: theme::table_highlight(Color::Green),
            },
            location_cells,
        );
    }

    fn render_batches(&self, frame: &mut Frame<'_>) {
        let keys = compact_hint(
            frame.area().width,
            "Up/Down: move    Tab: filter    Enter: choose batch    Esc: locations",
            "Up/Down    Tab: filter    Enter: choose    Esc: back",
            "Up/Down | Enter choose | Esc back",
        );
        let location = self
            .locations
            .selected_row()
            .map_or_else(String::new, |location| location.name.clone());
        let body = render_shell(
            frame,
            ShellView {
                title: "Scouting",
                target: format!("{location}: scan or choose a batch"),
                progress: Line::from(Span::styled(
                    "All batches scouts the whole location",
                    theme::secondary_text(),
                )),
                error: self.error.as_deref(),
                keys,
            },
        );
        let [filter, table] = split_filter(body);
        self.batches.render_filter(frame, filter);
        self.batches.render_table(
            frame,
            table,
            TableRender {
                title: Line::from("Batches"),
                empty_message: "No batch matches the filter.",
                columns: &BATCH_COLUMNS,
                header_style: theme::table_header(Color::Green),
                highlight_style: theme::table_highlight(Color::Green),
            },
            batch_cells,
        );
    }

    fn render_steps(&self, frame: &mut Frame<'_>) {
        let Some(session) = self.host.session() else {
            return;
        };
        let target = session.target();
        let step = session.current_step();
        let scope = match &target.scanned_batch {
            Some(batch) => format!("{} / batch {batch}", target.location.name),
            None => format!("{} / all batches", target.location.name),
        };
        let keys = match step {
            ScoutStep::Log => compact_hint(
                frame.area().width,
                "Tab: next field    Space/Left/Right: change choice    Enter: save log    Esc: back",
                "Tab: next    Space: change    Enter: save    Esc: back",
                "Tab | Space | Enter save | Esc back",
            ),
            ScoutStep::Treatment => compact_hint(
                frame.area().width,
                "Tab: next field    Left/Right: treatment type    Enter: save treatment    Esc: back to log",
                "Tab: next    Left/Right: type    Enter: save    Esc: log",
                "Tab | Left/Right | Enter save | Esc log",
            ),
        };

        let body = render_shell(
            frame,
            ShellView {
                title: "Scouting",
                target: scope,
                progress: progress_line(session),
                error: self.error.as_deref(),
                keys,
            },
        );

        match step {
            ScoutStep::Log => {
                if let Some(log) = &self.log {
                    render_log(frame, body, log);
                }
            }
            ScoutStep::Treatment => {
                let summary = logged_entry(session.collected())
                    .map(|entry| entry.summary())
                    .unwrap_or_default();
                render_treatment(frame, body, &self.treatment, &summary);
            }
        }

        if self.pending.is_some() {
            let message = match step {
                ScoutStep::Log => "Saving scout log",
                ScoutStep::Treatment => "Saving treatment",
            };
            render_busy_modal(frame, message, &self.spinner);
        }
    }

    fn render_done(&self, frame: &mut Frame<'_>) {
        let summary = self
            .host
            .hooks()
            .summary
            .as_deref()
            .unwrap_or("Scouting saved");
        render_success_modal(frame, summary, result_footer(frame.area().width));
    }
}

fn split_filter(area: Rect) -> [Rect; 2] {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .areas(area)
}

fn render_log(frame: &mut Frame<'_>, area: Rect, log: &LogEditor) {
    let show_issue = log.focus_order().contains(&LogFocus::Reason);
    let mut constraints = vec![Constraint::Length(1)];
    if show_issue {
        constraints.extend([Constraint::Length(3), Constraint::Length(1)]);
    }
    constraints.extend([Constraint::Length(3), Constraint::Min(4)]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut index = 0;
    frame.render_widget(
        wrapped_paragraph(Line::from(vec![
            Span::styled("Entry: ", label_style(log.focus == LogFocus::Mode)),
            Span::styled(format!(" {} ", mode_label(log.mode)), theme::step_current()),
        ])),
        rows[index],
    );
    index += 1;

    if show_issue {
        log.reason.render(frame, rows[index], log.focus == LogFocus::Reason);
        frame.render_widget(
            wrapped_paragraph(severity_line(log.severity, log.focus == LogFocus::Severity)),
            rows[index + 1],
        );
        index += 2;
    }

    let [ec, ph, notes] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Min(20),
        ])
        .areas(rows[index]);
    log.ec.render(frame, ec, log.focus == LogFocus::Ec);
    log.ph.render(frame, ph, log.focus == LogFocus::Ph);
    log.notes.render(frame, notes, log.focus == LogFocus::Notes);

    let items = log.batches.iter().map(|batch| {
        let mark = if log.is_selected(&batch.id) { "[x]" } else { "[ ]" };
        ListItem::new(format!(
            "{mark} {}  {}  ({} plants)",
            batch.batch_number, batch.variety, batch.quantity
        ))
    });
    let title = if log.focus == LogFocus::Batches {
        Line::from(Span::styled("Affected batches", theme::focus_prompt()))
    } else {
        Line::from("Affected batches")
    };
    let list = List::new(items)
        .block(theme::chrome(title))
        .highlight_style(theme::table_highlight(Color::Green));
    let mut state = ListState::default();
    if log.focus == LogFocus::Batches {
        state.select(Some(log.batch_cursor));
    }
    frame.render_stateful_widget(list, rows[index + 1], &mut state);
}

fn render_treatment(frame: &mut Frame<'_>, area: Rect, editor: &TreatmentEditor, summary: &str) {
    let [header, fields] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .areas(area);

    let variant = editor
        .variant
        .map_or("choose a type", |variant| variant.label());
    let header_text = Text::from(vec![
        label_value_line("Logged", summary.to_string()),
        if editor.variant_focused() {
            highlighted_label_value_line("Treatment", variant)
        } else {
            label_value_line("Treatment", variant)
        },
    ]);
    frame.render_widget(wrapped_paragraph(header_text), header);

    let [left, right] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .areas(fields);
    let column = |area: Rect| {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area)
    };
    let slots = column(left)
        .iter()
        .chain(column(right).iter())
        .copied()
        .collect::<Vec<_>>();
    for (index, (field, slot)) in editor.fields.iter().zip(slots).enumerate() {
        field.render(frame, slot, editor.field_focused(index));
    }
}
