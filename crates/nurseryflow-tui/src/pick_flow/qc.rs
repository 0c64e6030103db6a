use crossterm::event::KeyEvent;
use nurseryflow_core::picking::{QcForm, QcVerdict, evaluate_qc};

use crate::keymap;
use crate::ui::confirm::{Confirm, ConfirmEvent};
use crate::ui::form::InputField;

#[derive(Debug, Clone)]
pub(super) struct OverridePrompt {
    pub(super) choice: Confirm,
    pub(super) reason: InputField,
    pub(super) unchecked: usize,
    pub(super) flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum QcSignal {
    Continue,
    Submit(QcForm),
}

#[derive(Debug, Clone)]
pub(super) struct QcEditor {
    pub(super) form: QcForm,
    pub(super) selected: usize,
    pub(super) prompt: Option<OverridePrompt>,
}

impl QcEditor {
    pub(super) fn new() -> Self {
        Self {
            form: QcForm::default(),
            selected: 0,
            prompt: None,
        }
    }

    pub(super) fn is_overriding(&self) -> bool {
        self.prompt.is_some()
    }

    pub(super) fn on_key(&mut self, key: KeyEvent) -> QcSignal {
        if let Some(prompt) = self.prompt.as_mut() {
            if !(keymap::is_switch(key) || keymap::is_confirm(key) || keymap::is_back(key)) {
                prompt.reason.on_key(key);
                return QcSignal::Continue;
            }
            return match prompt.choice.on_key_without_space(key) {
                ConfirmEvent::Pending => QcSignal::Continue,
                ConfirmEvent::No | ConfirmEvent::Back => {
                    self.prompt = None;
                    QcSignal::Continue
                }
                ConfirmEvent::Yes => {
                    self.form.override_confirmed = true;
                    self.form.override_reason = prompt.reason.value().to_string();
                    self.prompt = None;
                    QcSignal::Submit(self.form.clone())
                }
            };
        }

        if keymap::is_up(key) {
            self.selected = self.selected.saturating_sub(1);
        } else if keymap::is_down(key) {
            if self.selected + 1 < self.form.checks.len() {
                self.selected += 1;
            }
        } else if keymap::is_toggle(key) {
            if let Some(check) = self.form.checks.get_mut(self.selected) {
                check.state = check.state.next();
            }
        } else if keymap::is_confirm(key) {
            match evaluate_qc(&self.form.checks) {
                QcVerdict::Clean => {
                    self.form.override_confirmed = false;
                    self.form.override_reason.clear();
                    return QcSignal::Submit(self.form.clone());
                }
                QcVerdict::NeedsOverride { unchecked, flagged } => {
                    self.prompt = Some(OverridePrompt {
                        choice: Confirm::new(false),
                        reason: InputField::new("Override reason", &self.form.override_reason),
                        unchecked,
                        flagged,
                    });
                }
            }
        }
        QcSignal::Continue
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use nurseryflow_core::picking::{QcState, validate_qc};

    use super::{QcEditor, QcSignal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn all_checks_passed_submits_without_prompt() {
        let mut editor = QcEditor::new();
        for _ in 0..editor.form.checks.len() {
            editor.on_key(key(KeyCode::Char(' ')));
            editor.on_key(key(KeyCode::Down));
        }
        match editor.on_key(key(KeyCode::Enter)) {
            QcSignal::Submit(form) => {
                let result = validate_qc(&form).expect("clean");
                assert!(!result.overridden);
            }
            QcSignal::Continue => panic!("expected submit"),
        }
    }

    #[test]
    fn incomplete_checklist_needs_confirmed_override() {
        let mut editor = QcEditor::new();
        editor.on_key(key(KeyCode::Char(' ')));
        editor.on_key(key(KeyCode::Char(' ')));
        assert_eq!(editor.form.checks[0].state, QcState::Flagged);

        assert_eq!(editor.on_key(key(KeyCode::Enter)), QcSignal::Continue);
        let prompt = editor.prompt.as_ref().expect("override prompt");
        assert_eq!((prompt.unchecked, prompt.flagged), (4, 1));

        assert_eq!(editor.on_key(key(KeyCode::Enter)), QcSignal::Continue);
        assert!(!editor.is_overriding());

        editor.on_key(key(KeyCode::Enter));
        for ch in "customer collecting".chars() {
            editor.on_key(key(KeyCode::Char(ch)));
        }
        editor.on_key(key(KeyCode::Right));
        match editor.on_key(key(KeyCode::Enter)) {
            QcSignal::Submit(form) => {
                let result = validate_qc(&form).expect("override accepted");
                assert!(result.overridden);
                assert_eq!(result.override_reason.as_deref(), Some("customer collecting"));
            }
            QcSignal::Continue => panic!("expected submit"),
        }
    }
}
