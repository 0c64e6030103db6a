use crossterm::event::KeyEvent;
use nurseryflow_core::picking::{PickItem, PickItemStatus};

use crate::keymap;
use crate::ui::form::{FieldSet, InputField};

const QUANTITY: usize = 0;
const REASON: usize = 1;
const BATCH: usize = 1;

#[derive(Debug, Clone)]
pub(super) enum ItemEdit {
    Browse,
    Short(FieldSet),
    Substitute(FieldSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ItemsSignal {
    Continue,
    Submit,
}

/// Local outcome edits for every line of the pick list. Nothing is persisted
/// until the whole list is submitted.
#[derive(Debug, Clone)]
pub(super) struct ItemsEditor {
    pub(super) items: Vec<PickItem>,
    pub(super) selected: usize,
    pub(super) edit: ItemEdit,
    pub(super) error: Option<String>,
}

impl ItemsEditor {
    pub(super) fn new(items: Vec<PickItem>) -> Self {
        Self {
            items,
            selected: 0,
            edit: ItemEdit::Browse,
            error: None,
        }
    }

    pub(super) fn is_editing(&self) -> bool {
        !matches!(self.edit, ItemEdit::Browse)
    }

    pub(super) fn on_key(&mut self, key: KeyEvent) -> ItemsSignal {
        match std::mem::replace(&mut self.edit, ItemEdit::Browse) {
            ItemEdit::Browse => self.on_key_browse(key),
            ItemEdit::Short(form) => {
                self.edit = self.on_key_short(key, form);
                ItemsSignal::Continue
            }
            ItemEdit::Substitute(form) => {
                self.edit = self.on_key_substitute(key, form);
                ItemsSignal::Continue
            }
        }
    }

    fn on_key_browse(&mut self, key: KeyEvent) -> ItemsSignal {
        if keymap::is_confirm(key) {
            return ItemsSignal::Submit;
        }
        if keymap::is_up(key) {
            self.selected = self.selected.saturating_sub(1);
        } else if keymap::is_down(key) {
            if self.selected + 1 < self.items.len() {
                self.selected += 1;
            }
        } else if keymap::is_char(key, 'p') {
            if let Some(item) = self.items.get_mut(self.selected) {
                item.mark_picked();
                self.error = None;
                self.select_next_pending();
            }
        } else if keymap::is_char(key, 'u') {
            if let Some(item) = self.items.get_mut(self.selected) {
                item.reset_pending();
                self.error = None;
            }
        } else if keymap::is_char(key, 's') {
            if let Some(item) = self.items.get(self.selected) {
                self.error = None;
                self.edit = ItemEdit::Short(FieldSet::new(vec![
                    InputField::new("Quantity picked", &item.picked_quantity.to_string()),
                    InputField::new("Reason", item.short_reason.as_deref().unwrap_or("")),
                ]));
            }
        } else if keymap::is_char(key, 'x') {
            if let Some(item) = self.items.get(self.selected) {
                self.error = None;
                self.edit = ItemEdit::Substitute(FieldSet::new(vec![
                    InputField::new("Quantity", &item.quantity.to_string()),
                    InputField::new(
                        "Substitute batch",
                        item.substitute_batch_id.as_deref().unwrap_or(""),
                    ),
                ]));
            }
        }
        ItemsSignal::Continue
    }

    fn on_key_short(&mut self, key: KeyEvent, mut form: FieldSet) -> ItemEdit {
        if keymap::is_back(key) {
            return ItemEdit::Browse;
        }
        if !keymap::is_confirm(key) {
            form.on_key(key);
            return ItemEdit::Short(form);
        }

        let Some(quantity) = parse_quantity(form.value(QUANTITY)) else {
            self.error = Some(format!(
                "'{}' is not a whole number",
                form.value(QUANTITY).trim()
            ));
            return ItemEdit::Short(form);
        };
        let Some(item) = self.items.get_mut(self.selected) else {
            return ItemEdit::Browse;
        };
        match item.mark_short(quantity, form.value(REASON)) {
            Ok(()) => {
                self.error = None;
                self.select_next_pending();
                ItemEdit::Browse
            }
            Err(error) => {
                self.error = Some(error.to_string());
                ItemEdit::Short(form)
            }
        }
    }

    fn on_key_substitute(&mut self, key: KeyEvent, mut form: FieldSet) -> ItemEdit {
        if keymap::is_back(key) {
            return ItemEdit::Browse;
        }
        if !keymap::is_confirm(key) {
            form.on_key(key);
            return ItemEdit::Substitute(form);
        }

        let quantity = parse_quantity(form.value(QUANTITY)).unwrap_or(0);
        let Some(item) = self.items.get_mut(self.selected) else {
            return ItemEdit::Browse;
        };
        match item.substitute(form.value(BATCH), quantity) {
            Ok(()) => {
                self.error = None;
                self.select_next_pending();
                ItemEdit::Browse
            }
            Err(error) => {
                self.error = Some(error.to_string());
                ItemEdit::Substitute(form)
            }
        }
    }

    fn select_next_pending(&mut self) {
        let len = self.items.len();
        if let Some(next) = (1..=len)
            .map(|offset| (self.selected + offset) % len)
            .find(|index| self.items[*index].status == PickItemStatus::Pending)
        {
            self.selected = next;
        }
    }
}

fn parse_quantity(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use nurseryflow_core::picking::{PickItem, PickItemStatus, can_proceed};

    use super::{ItemEdit, ItemsEditor, ItemsSignal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut ItemsEditor, text: &str) {
        for ch in text.chars() {
            editor.on_key(key(KeyCode::Char(ch)));
        }
    }

    fn item(index: usize, quantity: u32) -> PickItem {
        PickItem {
            id: format!("pi-{index:04}"),
            batch_id: format!("bat-{index:04}"),
            description: format!("Line {index}"),
            quantity,
            picked_quantity: 0,
            status: PickItemStatus::Pending,
            substitute_batch_id: None,
            short_reason: None,
        }
    }

    fn editor() -> ItemsEditor {
        ItemsEditor::new(vec![item(1, 10), item(2, 6), item(3, 4)])
    }

    #[test]
    fn picking_a_line_jumps_to_the_next_pending_one() {
        let mut editor = editor();
        editor.on_key(key(KeyCode::Char('p')));
        assert_eq!(editor.items[0].status, PickItemStatus::Picked);
        assert_eq!(editor.selected, 1);
    }

    #[test]
    fn short_pick_requires_reason_and_lower_quantity() {
        let mut editor = editor();
        editor.on_key(key(KeyCode::Char('s')));
        assert!(editor.is_editing());

        editor.on_key(key(KeyCode::Backspace));
        type_text(&mut editor, "12");
        editor.on_key(key(KeyCode::Enter));
        assert!(editor.error.as_deref().is_some_and(|e| e.contains("below 10")));

        editor.on_key(key(KeyCode::Backspace));
        editor.on_key(key(KeyCode::Backspace));
        type_text(&mut editor, "7");
        editor.on_key(key(KeyCode::Tab));
        type_text(&mut editor, "frost damage");
        editor.on_key(key(KeyCode::Enter));

        assert!(!editor.is_editing());
        assert_eq!(editor.items[0].status, PickItemStatus::Short);
        assert_eq!(editor.items[0].picked_quantity, 7);
        assert_eq!(editor.items[0].short_reason.as_deref(), Some("frost damage"));
    }

    #[test]
    fn substitution_records_batch_and_esc_cancels_without_change() {
        let mut editor = editor();
        editor.on_key(key(KeyCode::Char('j')));
        editor.on_key(key(KeyCode::Char('x')));
        editor.on_key(key(KeyCode::Esc));
        assert!(matches!(editor.edit, ItemEdit::Browse));
        assert_eq!(editor.items[1].status, PickItemStatus::Pending);

        editor.on_key(key(KeyCode::Char('x')));
        editor.on_key(key(KeyCode::Tab));
        type_text(&mut editor, "bat-0099");
        editor.on_key(key(KeyCode::Enter));
        assert_eq!(editor.items[1].status, PickItemStatus::Substituted);
        assert_eq!(editor.items[1].picked_quantity, 6);
        assert_eq!(
            editor.items[1].substitute_batch_id.as_deref(),
            Some("bat-0099")
        );
    }

    #[test]
    fn reset_returns_line_to_pending_and_enter_requests_submit() {
        let mut editor = editor();
        for _ in 0..3 {
            editor.on_key(key(KeyCode::Char('p')));
        }
        assert!(can_proceed(&editor.items));

        editor.selected = 2;
        editor.on_key(key(KeyCode::Char('u')));
        assert!(!can_proceed(&editor.items));
        assert_eq!(editor.on_key(key(KeyCode::Enter)), ItemsSignal::Submit);
    }
}
