use crossterm::event::{KeyCode, KeyEvent};
use nurseryflow_core::scouting::{TreatmentForm, TreatmentVariant};

use crate::keymap;
use crate::ui::form::{InputField, cycle};

const PRODUCT: usize = 0;
const RATE: usize = 1;
const UNIT: usize = 2;
const METHOD: usize = 3;
const APPLICATIONS: usize = 4;
const NOTES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TreatmentSignal {
    Continue,
    Submit,
}

/// Treatment plan editor. Focus 0 is the variant selector; the text fields
/// follow it.
#[derive(Debug, Clone)]
pub(super) struct TreatmentEditor {
    pub(super) variant: Option<TreatmentVariant>,
    pub(super) fields: Vec<InputField>,
    pub(super) focus: usize,
}

impl TreatmentEditor {
    pub(super) fn new(form: &TreatmentForm) -> Self {
        Self {
            variant: form.variant,
            fields: vec![
                InputField::new("Product", &form.product),
                InputField::new("Rate", &form.rate),
                InputField::new("Unit", &form.unit),
                InputField::new("Method", &form.method),
                InputField::new("Applications", &form.applications),
                InputField::new("Notes", &form.notes),
            ],
            focus: 0,
        }
    }

    pub(super) fn variant_focused(&self) -> bool {
        self.focus == 0
    }

    pub(super) fn field_focused(&self, index: usize) -> bool {
        self.focus == index + 1
    }

    pub(super) fn to_form(&self) -> TreatmentForm {
        let value = |index: usize| {
            self.fields
                .get(index)
                .map_or_else(String::new, |field| field.value().to_string())
        };
        TreatmentForm {
            variant: self.variant,
            product: value(PRODUCT),
            rate: value(RATE),
            unit: value(UNIT),
            method: value(METHOD),
            applications: value(APPLICATIONS),
            notes: value(NOTES),
        }
    }

    pub(super) fn on_key(&mut self, key: KeyEvent) -> TreatmentSignal {
        if keymap::is_confirm(key) {
            return TreatmentSignal::Submit;
        }
        let stops = self.fields.len() + 1;
        if keymap::is_next_field(key) || keymap::is_arrow_down(key) {
            self.focus = (self.focus + 1) % stops;
        } else if keymap::is_prev_field(key) || keymap::is_arrow_up(key) {
            self.focus = (self.focus + stops - 1) % stops;
        } else if self.variant_focused() {
            if keymap::is_toggle(key) || keymap::is_switch(key) {
                self.variant = Some(match self.variant {
                    None => TreatmentVariant::ALL[0],
                    Some(current) => {
                        cycle(&TreatmentVariant::ALL, current, key.code != KeyCode::Left)
                    }
                });
            }
        } else if let Some(field) = self.fields.get_mut(self.focus - 1) {
            field.on_key(key);
        }
        TreatmentSignal::Continue
    }
}
