use nurseryflow_core::wizard::{WizardFlow, WizardSession};
use ratatui::text::{Line, Span};

use crate::theme;

/// `Step i/N` followed by the effective step sequence, recomputed from the
/// session on every call so inserted branch steps show up immediately.
pub(crate) fn progress_line<F: WizardFlow>(session: &WizardSession<F>) -> Line<'static> {
    let progress = session.progress();
    let current = session.current_step();
    let steps = session.effective_steps();
    let current_index = steps.iter().position(|step| *step == current);

    let mut spans = vec![Span::styled(
        format!("Step {}/{}  ", progress.position, progress.total),
        theme::focus_prompt(),
    )];

    for (index, step) in steps.iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(" › ", theme::secondary_text()));
        }
        let (icon, label) = F::descriptor(*step)
            .map_or(("", "?"), |descriptor| (descriptor.icon, descriptor.label));
        let text = format!("{icon} {label}");
        let style = match current_index {
            Some(active) if index == active => theme::step_current(),
            Some(active) if index < active => theme::step_done(),
            _ => theme::secondary_text(),
        };
        spans.push(Span::styled(text, style));
    }

    Line::from(spans)
}
