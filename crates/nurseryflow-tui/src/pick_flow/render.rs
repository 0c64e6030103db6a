use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Clear, List, ListItem, ListState, Row, Table, TableState};

use nurseryflow_core::picking::{PickItemStatus, PickList, PickStep, pick_results};

use super::items::ItemEdit;
use super::qc::OverridePrompt;
use super::{PickWizard, Stage};
use crate::centered_rect;
use crate::shell::{ShellView, render_shell};
use crate::theme;
use crate::ui::form::FieldSet;
use crate::ui::modal::{render_busy_modal, render_notice_modal, render_success_modal};
use crate::ui::progress::progress_line;
use crate::ui::record_table::{TableColumn, TableRender};
use crate::ui::text::{
    compact_hint, focus_line, highlighted_label_value_line, label_value_line, result_footer,
    wrapped_paragraph, yes_no,
};

const LIST_COLUMNS: [TableColumn; 5] = [
    TableColumn {
        title: "ID",
        width: Constraint::Length(10),
    },
    TableColumn {
        title: "Order",
        width: Constraint::Length(12),
    },
    TableColumn {
        title: "Customer",
        width: Constraint::Min(20),
    },
    TableColumn {
        title: "Status",
        width: Constraint::Length(12),
    },
    TableColumn {
        title: "Lines",
        width: Constraint::Length(8),
    },
];

fn list_cells(list: &PickList) -> Vec<String> {
    vec![
        list.id.clone(),
        list.order_ref.clone(),
        list.customer.clone(),
        list.status.label().to_string(),
        list.items.len().to_string(),
    ]
}

impl PickWizard {
    pub(super) fn render(&self, frame: &mut Frame<'_>) {
        match self.stage {
            Stage::SelectList => self.render_select(frame),
            Stage::Steps => self.render_steps(frame),
            Stage::Done => self.render_done(frame),
        }
    }

    fn render_select(&self, frame: &mut Frame<'_>) {
        let keys = compact_hint(
            frame.area().width,
            "Up/Down: move    Tab: filter    Enter: open pick list    Esc: home",
            "Up/Down: move    Tab: filter    Enter: open    Esc: home",
            "Up/Down | Tab filter | Enter open | Esc home",
        );
        let body = render_shell(
            frame,
            ShellView {
                title: "Pick lists",
                target: "Choose an open pick list".to_string(),
                progress: Line::from(Span::styled(
                    format!("Operator: {}", self.operator),
                    theme::secondary_text(),
                )),
                error: self.error.as_deref(),
                keys,
            },
        );
        let [filter, table] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .areas(body);
        self.lists.render_filter(frame, filter);
        self.lists.render_table(
            frame,
            table,
            TableRender {
                title: Line::from("Open pick lists"),
                empty_message: "No open pick lists. Completed lists are hidden.",
                columns: &LIST_COLUMNS,
                header_style: theme::table_header(Color::Cyan),
                highlight_style: theme::table_highlight(Color::Cyan),
            },
            list_cells,
        );
    }

    fn render_steps(&self, frame: &mut Frame<'_>) {
        let Some(session) = self.host.session() else {
            return;
        };
        let list = session.target();
        let step = session.current_step();
        let error = match step {
            PickStep::Pick => self.items.error.as_deref().or(self.error.as_deref()),
            _ => self.error.as_deref(),
        };

        let body = render_shell(
            frame,
            ShellView {
                title: "Pick list",
                target: format!("{} for {} ({})", list.order_ref, list.customer, list.id),
                progress: progress_line(session),
                error,
                keys: self.step_keys(step, frame.area().width),
            },
        );

        match step {
            PickStep::Start => self.render_start(frame, body),
            PickStep::Labels => self.render_labels(frame, body),
            PickStep::Pick => self.render_items(frame, body),
            PickStep::Qc => self.render_qc(frame, body),
            PickStep::Trolley => self.render_trolley(frame, body),
            PickStep::Complete => self.render_complete(frame, body),
        }

        if self.pending.is_some() {
            render_busy_modal(frame, saving_message(step), &self.spinner);
        }
    }

    fn step_keys(&self, step: PickStep, width: u16) -> &'static str {
        match step {
            PickStep::Start => compact_hint(
                width,
                "Type to edit    Enter: start picking    Esc: back    Ctrl+X: close",
                "Type    Enter: start    Esc: back    Ctrl+X: close",
                "Type | Enter start | Esc back | ^X close",
            ),
            PickStep::Labels => compact_hint(
                width,
                "Space: toggle printing    Up/Down or +/-: copies    Enter: save    Esc: back",
                "Space: print    +/-: copies    Enter: save    Esc: back",
                "Space print | +/- copies | Enter save | Esc back",
            ),
            PickStep::Pick if self.items.is_editing() => compact_hint(
                width,
                "Tab: next field    Enter: apply    Esc: cancel edit",
                "Tab: next    Enter: apply    Esc: cancel",
                "Tab next | Enter apply | Esc cancel",
            ),
            PickStep::Pick => compact_hint(
                width,
                "p: picked    s: short    x: substitute    u: undo    Enter: save lines    Esc: back",
                "p picked  s short  x substitute  u undo    Enter: save    Esc: back",
                "p|s|x|u | Enter save | Esc back",
            ),
            PickStep::Qc if self.qc.is_overriding() => compact_hint(
                width,
                "Type a reason    Left/Right: choose    Enter: confirm    Esc: cancel",
                "Type reason    Left/Right    Enter: confirm    Esc: cancel",
                "Type | Left/Right | Enter | Esc",
            ),
            PickStep::Qc => compact_hint(
                width,
                "Up/Down: move    Space: cycle ok/flagged    Enter: save checks    Esc: back",
                "Up/Down    Space: cycle    Enter: save    Esc: back",
                "Up/Down | Space cycle | Enter save | Esc back",
            ),
            PickStep::Trolley => compact_hint(
                width,
                "Tab: next field    Enter: save allocation    Esc: back    Ctrl+X: close",
                "Tab: next    Enter: save    Esc: back    Ctrl+X: close",
                "Tab next | Enter save | Esc back",
            ),
            PickStep::Complete => compact_hint(
                width,
                "Left/Right: choose    Enter: confirm    Esc: back    Ctrl+X: close",
                "Left/Right    Enter: confirm    Esc: back",
                "Left/Right | Enter | Esc back",
            ),
        }
    }

    fn render_start(&self, frame: &mut Frame<'_>, area: Rect) {
        let [intro, field] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3)])
            .areas(area);
        frame.render_widget(
            wrapped_paragraph(focus_line("Who is picking this order?")),
            intro,
        );
        self.start.render(frame, field, true);
    }

    fn render_labels(&self, frame: &mut Frame<'_>, area: Rect) {
        let lines = self
            .host
            .session()
            .map_or(0, |session| session.target().items.len());
        let total = if self.labels.print {
            lines.saturating_mul(self.labels.copies as usize)
        } else {
            0
        };
        let text = Text::from(vec![
            highlighted_label_value_line("Print labels", yes_no(self.labels.print)),
            label_value_line("Copies per line", self.labels.copies.to_string()),
            label_value_line("Labels to print", total.to_string()),
        ]);
        frame.render_widget(
            wrapped_paragraph(text).block(theme::chrome("Plant labels")),
            area,
        );
    }

    fn render_items(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = self.items.items.iter().map(|item| {
            let style = match item.status {
                PickItemStatus::Pending => theme::secondary_text(),
                PickItemStatus::Picked => theme::step_done(),
                PickItemStatus::Substituted | PickItemStatus::Short => theme::warning_prompt(),
            };
            let note = item
                .substitute_batch_id
                .as_deref()
                .map(|batch| format!("sub {batch}"))
                .or_else(|| item.short_reason.clone())
                .unwrap_or_default();
            Row::new(vec![
                item.description.clone(),
                item.batch_id.clone(),
                item.quantity.to_string(),
                item.picked_quantity.to_string(),
                item.status.label().to_string(),
                note,
            ])
            .style(style)
        });
        let pending = self
            .items
            .items
            .iter()
            .filter(|item| item.status == PickItemStatus::Pending)
            .count();
        let table = Table::new(
            rows,
            [
                Constraint::Min(18),
                Constraint::Length(10),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(12),
                Constraint::Min(12),
            ],
        )
        .header(
            Row::new(["Line", "Batch", "Qty", "Picked", "Status", "Note"])
                .style(theme::table_header(Color::Cyan)),
        )
        .block(theme::chrome(format!("Lines ({pending} pending)")))
        .row_highlight_style(theme::table_highlight(Color::Cyan))
        .highlight_symbol(">> ");
        let mut state = TableState::new().with_selected(Some(self.items.selected));
        frame.render_stateful_widget(table, area, &mut state);

        match &self.items.edit {
            ItemEdit::Browse => {}
            ItemEdit::Short(form) => render_field_popup(frame, "Short pick", form),
            ItemEdit::Substitute(form) => render_field_popup(frame, "Substitute", form),
        }
    }

    fn render_qc(&self, frame: &mut Frame<'_>, area: Rect) {
        let items = self.qc.form.checks.iter().map(|check| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("[{:^9}] ", check.state.label())),
                Span::raw(check.label.clone()),
            ]))
        });
        let list = List::new(items)
            .block(theme::chrome("Quality checks"))
            .highlight_style(theme::table_highlight(Color::Cyan))
            .highlight_symbol(">> ");
        let mut state = ListState::default().with_selected(Some(self.qc.selected));
        frame.render_stateful_widget(list, area, &mut state);

        if let Some(prompt) = &self.qc.prompt {
            render_override_prompt(frame, prompt);
        }
    }

    fn render_trolley(&self, frame: &mut Frame<'_>, area: Rect) {
        let units = self
            .host
            .session()
            .and_then(|session| pick_results(session.collected()))
            .map_or(0, |results| results.units);
        let [summary, fields] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(self.trolley.height())])
            .areas(area);
        frame.render_widget(
            wrapped_paragraph(label_value_line("Units to load", units.to_string())),
            summary,
        );
        self.trolley.render(frame, fields);
    }

    fn render_complete(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(session) = self.host.session() else {
            return;
        };
        let list = session.target();
        let units = pick_results(session.collected()).map_or(0, |results| results.units);
        let text = Text::from(vec![
            label_value_line("Order", list.order_ref.clone()),
            label_value_line("Customer", list.customer.clone()),
            label_value_line("Lines", list.items.len().to_string()),
            label_value_line("Units picked", units.to_string()),
            Line::from(""),
            highlighted_label_value_line(
                "Mark this pick list complete",
                self.complete_choice.selected_label(),
            ),
        ]);
        frame.render_widget(
            wrapped_paragraph(text).block(theme::chrome("Finish")),
            area,
        );
    }

    fn render_done(&self, frame: &mut Frame<'_>) {
        let summary = self
            .host
            .hooks()
            .completed
            .as_ref()
            .map_or("Pick list completed", |completed| completed.summary.as_str());
        render_success_modal(frame, summary, result_footer(frame.area().width));

        if let Some(notice) = &self.notice {
            render_notice_modal(frame, "Packing record", notice, "Enter/Esc: continue");
        }
    }
}

fn saving_message(step: PickStep) -> &'static str {
    match step {
        PickStep::Start => "Starting pick list",
        PickStep::Labels => "Recording labels",
        PickStep::Pick => "Saving pick results",
        PickStep::Qc => "Saving quality checks",
        PickStep::Trolley => "Saving trolley allocation",
        PickStep::Complete => "Completing pick list",
    }
}

fn render_field_popup(frame: &mut Frame<'_>, title: &str, form: &FieldSet) {
    let area = centered_rect(60, 40, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(theme::chrome(focus_line(title.to_string())), area);
    form.render(
        frame,
        area.inner(ratatui::layout::Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn render_override_prompt(frame: &mut Frame<'_>, prompt: &OverridePrompt) {
    let area = centered_rect(70, 50, frame.area());
    frame.render_widget(Clear, area);
    let inner = area.inner(ratatui::layout::Margin {
        vertical: 1,
        horizontal: 1,
    });
    frame.render_widget(
        theme::chrome(Line::from(Span::styled(
            "Override quality checks",
            theme::warning_prompt(),
        ))),
        area,
    );
    let [summary, reason, choice] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .areas(inner);
    frame.render_widget(
        wrapped_paragraph(format!(
            "{} check(s) unchecked and {} flagged.",
            prompt.unchecked, prompt.flagged
        )),
        summary,
    );
    prompt.reason.render(frame, reason, true);
    frame.render_widget(
        wrapped_paragraph(highlighted_label_value_line(
            "Proceed anyway",
            prompt.choice.selected_label(),
        )),
        choice,
    );
}
