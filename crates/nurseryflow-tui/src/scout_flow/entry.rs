use crossterm::event::{KeyCode, KeyEvent};
use nurseryflow_core::scouting::{BatchRef, EntryMode, LogForm, ScoutTarget, Severity};

use crate::keymap;
use crate::ui::form::{InputField, cycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LogFocus {
    Mode,
    Reason,
    Severity,
    Ec,
    Ph,
    Notes,
    Batches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LogSignal {
    Continue,
    Submit,
}

pub(super) fn mode_label(mode: EntryMode) -> &'static str {
    match mode {
        EntryMode::Issue => "issue",
        EntryMode::Reading => "reading",
    }
}

/// Editable scout log. Reason and severity only take focus in issue mode.
#[derive(Debug, Clone)]
pub(super) struct LogEditor {
    pub(super) mode: EntryMode,
    pub(super) severity: Severity,
    pub(super) reason: InputField,
    pub(super) ec: InputField,
    pub(super) ph: InputField,
    pub(super) notes: InputField,
    pub(super) batches: Vec<BatchRef>,
    pub(super) batch_ids: Vec<String>,
    pub(super) batch_cursor: usize,
    pub(super) focus: LogFocus,
}

impl LogEditor {
    pub(super) fn new(target: &ScoutTarget, form: &LogForm) -> Self {
        Self {
            mode: form.mode,
            severity: form.severity,
            reason: InputField::new("Reason", &form.reason),
            ec: InputField::new("EC (mS/cm)", &form.ec),
            ph: InputField::new("pH", &form.ph),
            notes: InputField::new("Notes", &form.notes),
            batches: target.location.batches.clone(),
            batch_ids: form.batch_ids.clone(),
            batch_cursor: 0,
            focus: LogFocus::Mode,
        }
    }

    pub(super) fn focus_order(&self) -> Vec<LogFocus> {
        let mut order = vec![LogFocus::Mode];
        if self.mode == EntryMode::Issue {
            order.extend([LogFocus::Reason, LogFocus::Severity]);
        }
        order.extend([LogFocus::Ec, LogFocus::Ph, LogFocus::Notes]);
        if !self.batches.is_empty() {
            order.push(LogFocus::Batches);
        }
        order
    }

    pub(super) fn is_selected(&self, batch_id: &str) -> bool {
        self.batch_ids.iter().any(|id| id == batch_id)
    }

    pub(super) fn to_form(&self) -> LogForm {
        LogForm {
            mode: self.mode,
            reason: self.reason.value().to_string(),
            severity: self.severity,
            ec: self.ec.value().to_string(),
            ph: self.ph.value().to_string(),
            notes: self.notes.value().to_string(),
            batch_ids: self.batch_ids.clone(),
        }
    }

    pub(super) fn on_key(&mut self, key: KeyEvent) -> LogSignal {
        if keymap::is_confirm(key) {
            return LogSignal::Submit;
        }
        if keymap::is_next_field(key) || keymap::is_prev_field(key) {
            self.move_focus(keymap::is_next_field(key));
            return LogSignal::Continue;
        }
        if self.focus == LogFocus::Batches && (keymap::is_up(key) || keymap::is_down(key)) {
            self.move_batch_cursor(keymap::is_down(key));
            return LogSignal::Continue;
        }
        if keymap::is_arrow_up(key) || keymap::is_arrow_down(key) {
            self.move_focus(keymap::is_arrow_down(key));
            return LogSignal::Continue;
        }

        let choice_key = keymap::is_toggle(key) || keymap::is_switch(key);
        match self.focus {
            LogFocus::Mode if choice_key => {
                self.mode = match self.mode {
                    EntryMode::Issue => EntryMode::Reading,
                    EntryMode::Reading => EntryMode::Issue,
                };
            }
            LogFocus::Severity if choice_key => {
                let forward = key.code != KeyCode::Left;
                self.severity = cycle(&Severity::ALL, self.severity, forward);
            }
            LogFocus::Batches if keymap::is_toggle(key) => self.toggle_current_batch(),
            LogFocus::Reason => self.reason.on_key(key),
            LogFocus::Ec => self.ec.on_key(key),
            LogFocus::Ph => self.ph.on_key(key),
            LogFocus::Notes => self.notes.on_key(key),
            LogFocus::Mode | LogFocus::Severity | LogFocus::Batches => {}
        }
        LogSignal::Continue
    }

    fn move_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        self.focus = cycle(&order, self.focus, forward);
    }

    fn move_batch_cursor(&mut self, down: bool) {
        if down {
            if self.batch_cursor + 1 < self.batches.len() {
                self.batch_cursor += 1;
            }
        } else {
            self.batch_cursor = self.batch_cursor.saturating_sub(1);
        }
    }

    fn toggle_current_batch(&mut self) {
        let Some(batch) = self.batches.get(self.batch_cursor) else {
            return;
        };
        let mut form = self.to_form();
        form.toggle_batch(&batch.id);
        self.batch_ids = form.batch_ids;
    }
}
