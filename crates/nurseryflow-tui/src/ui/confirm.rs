use crossterm::event::KeyEvent;

use crate::keymap;

/// Yes/no prompt. Space or Left/Right flips the answer; Enter commits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Confirm {
    yes_selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmEvent {
    Pending,
    Yes,
    No,
    Back,
}

impl Confirm {
    pub(crate) fn new(default_yes: bool) -> Self {
        Self {
            yes_selected: default_yes,
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) -> ConfirmEvent {
        self.handle(key, true)
    }

    /// Same as [`Confirm::on_key`] but leaves Space alone so a neighbouring
    /// text field can receive it.
    pub(crate) fn on_key_without_space(&mut self, key: KeyEvent) -> ConfirmEvent {
        self.handle(key, false)
    }

    fn handle(&mut self, key: KeyEvent, space_toggles: bool) -> ConfirmEvent {
        if keymap::is_back(key) {
            return ConfirmEvent::Back;
        }
        if keymap::is_switch(key) || (space_toggles && keymap::is_toggle(key)) {
            self.yes_selected = !self.yes_selected;
            return ConfirmEvent::Pending;
        }
        if keymap::is_confirm(key) {
            return if self.yes_selected {
                ConfirmEvent::Yes
            } else {
                ConfirmEvent::No
            };
        }
        ConfirmEvent::Pending
    }

    pub(crate) fn selected_label(&self) -> &'static str {
        crate::ui::text::yes_no(self.yes_selected)
    }
}
