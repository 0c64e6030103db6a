mod items;
mod qc;
mod render;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::KeyEvent;
use nurseryflow_app::App;
use nurseryflow_app::pick::{PickSubmission, check_pick_precondition};
use nurseryflow_core::picking::{
    CompletionRecord, LabelsForm, MAX_LABEL_COPIES, PickFlow, PickList, PickStep, StartForm,
    TrolleyForm, completion, pick_results, validate_labels, validate_qc, validate_start,
    validate_trolley,
};
use nurseryflow_core::wizard::{CollectedData, StepError, Transition, WizardHooks, WizardHost};
use tracing::{debug, info};

use crate::UiExit;
use crate::keymap;
use crate::submit::{LedgerSubmitWorker, PendingSubmit, Poll, SubmitWorker};
use crate::ui::confirm::{Confirm, ConfirmEvent};
use crate::ui::form::{FieldSet, InputField};
use crate::ui::record_table::{RecordTable, TableSignal};
use crate::ui::spinner::Spinner;

use items::{ItemsEditor, ItemsSignal};
use qc::{QcEditor, QcSignal};

const TROLLEYS: usize = 0;
const SHELVES: usize = 1;
const TROLLEY_NOTES: usize = 2;

pub(crate) trait PickFlowOps {
    fn pick_lists(&self) -> Result<Vec<PickList>>;
    fn pick_load(&self, id: &str) -> Result<PickList>;
}

impl<'a> PickFlowOps for App<'a> {
    fn pick_lists(&self) -> Result<Vec<PickList>> {
        App::pick_lists(self)
    }

    fn pick_load(&self, id: &str) -> Result<PickList> {
        App::pick_load(self, id)
    }
}

#[derive(Debug, Default)]
pub(crate) struct PickHooks {
    completed: Option<CompletedPick>,
    cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompletedPick {
    record: CompletionRecord,
    summary: String,
}

impl WizardHooks<PickFlow> for PickHooks {
    fn on_complete(&mut self, list: &PickList, collected: &CollectedData<PickFlow>) {
        let Some(record) = completion(collected).cloned() else {
            return;
        };
        info!(pick_list = %list.id, "pick wizard completed");
        self.completed = Some(CompletedPick {
            summary: completion_summary(list, collected, &record),
            record,
        });
    }

    fn on_cancel(&mut self, list: &PickList) {
        self.cancelled += 1;
        debug!(pick_list = %list.id, closed = self.cancelled, "pick wizard closed");
    }
}

fn completion_summary(
    list: &PickList,
    collected: &CollectedData<PickFlow>,
    record: &CompletionRecord,
) -> String {
    let units = pick_results(collected).map_or(0, |results| results.units);
    let mut lines = vec![
        format!("Pick list {} ({}) completed", list.id, list.order_ref),
        format!("Customer: {}", list.customer),
        format!("Units picked: {units}"),
        format!("Completed at: {}", record.completed_at),
    ];
    if record.packing_warning.is_some() {
        lines.push("Packing record: not updated".to_string());
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SelectList,
    Steps,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowSignal {
    Continue,
    Exit(UiExit),
}

struct PickWizard {
    stage: Stage,
    lists: RecordTable<PickList>,
    host: WizardHost<PickFlow, PickHooks>,
    worker: Arc<dyn SubmitWorker>,
    pending: Option<PendingSubmit<PickFlow>>,
    operator: String,
    start: InputField,
    labels: LabelsForm,
    items: ItemsEditor,
    qc: QcEditor,
    trolley: FieldSet,
    complete_choice: Confirm,
    error: Option<String>,
    notice: Option<String>,
    spinner: Spinner,
}

pub(crate) struct PickScreen {
    flow: PickWizard,
}

impl PickScreen {
    pub(crate) fn new(app: &App<'_>, ledger_path: &Path, operator: &str) -> Result<Self> {
        let worker = Arc::new(LedgerSubmitWorker::new(ledger_path.to_path_buf()));
        Ok(Self {
            flow: PickWizard::new(app, worker, operator)?,
        })
    }

    pub(crate) fn render(&self, frame: &mut ratatui::Frame<'_>) {
        self.flow.render(frame);
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent, app: &App<'_>) -> Result<Option<UiExit>> {
        match self.flow.on_key(key, app)? {
            FlowSignal::Continue => Ok(None),
            FlowSignal::Exit(exit) => Ok(Some(exit)),
        }
    }

    pub(crate) fn on_tick(&mut self) {
        self.flow.on_tick();
    }

    pub(crate) fn is_submitting(&self) -> bool {
        self.flow.pending.is_some()
    }
}

fn list_search_text(list: &PickList) -> String {
    format!("{} {} {}", list.id, list.order_ref, list.customer)
}

fn trolley_fields(form: &TrolleyForm) -> FieldSet {
    FieldSet::new(vec![
        InputField::new("Trolleys", &form.trolleys),
        InputField::new("Shelves (optional)", &form.shelves),
        InputField::new("Notes", &form.notes),
    ])
}

impl PickWizard {
    fn new(ops: &dyn PickFlowOps, worker: Arc<dyn SubmitWorker>, operator: &str) -> Result<Self> {
        let lists = ops.pick_lists()?;
        Ok(Self {
            stage: Stage::SelectList,
            lists: RecordTable::new(lists, list_search_text),
            host: WizardHost::new(PickHooks::default()),
            worker,
            pending: None,
            operator: operator.to_string(),
            start: InputField::new("Picker", operator),
            labels: LabelsForm::default(),
            items: ItemsEditor::new(Vec::new()),
            qc: QcEditor::new(),
            trolley: trolley_fields(&TrolleyForm::default()),
            complete_choice: Confirm::new(true),
            error: None,
            notice: None,
            spinner: Spinner::default(),
        })
    }

    fn current_step(&self) -> Option<PickStep> {
        self.host.session().map(|session| session.current_step())
    }

    fn on_key(&mut self, key: KeyEvent, ops: &dyn PickFlowOps) -> Result<FlowSignal> {
        if self.pending.is_some() {
            if keymap::is_close(key) {
                self.close();
                return Ok(FlowSignal::Exit(UiExit::BackAtRoot));
            }
            return Ok(FlowSignal::Continue);
        }

        match self.stage {
            Stage::SelectList => self.on_key_select(key, ops),
            Stage::Steps => self.on_key_step(key, ops),
            Stage::Done => Ok(self.on_key_done(key)),
        }
    }

    fn on_key_select(&mut self, key: KeyEvent, ops: &dyn PickFlowOps) -> Result<FlowSignal> {
        match self.lists.on_key(key) {
            TableSignal::Back => return Ok(FlowSignal::Exit(UiExit::BackAtRoot)),
            TableSignal::Continue => return Ok(FlowSignal::Continue),
            TableSignal::Confirm => {}
        }

        let Some(id) = self.lists.selected_row().map(|list| list.id.clone()) else {
            return Ok(FlowSignal::Continue);
        };
        match ops.pick_load(&id) {
            Ok(list) => self.open(list),
            Err(error) => self.error = Some(format!("{error:#}")),
        }
        Ok(FlowSignal::Continue)
    }

    fn open(&mut self, list: PickList) {
        self.start = InputField::new(
            "Picker",
            list.picker.as_deref().unwrap_or(self.operator.as_str()),
        );
        self.labels = LabelsForm::default();
        self.items = ItemsEditor::new(list.items.clone());
        self.qc = QcEditor::new();
        self.trolley = trolley_fields(&TrolleyForm::default());
        self.complete_choice = Confirm::new(true);
        self.error = None;
        self.notice = None;
        debug!(pick_list = %list.id, "pick wizard opened");
        self.host.initialize(list);
        self.stage = Stage::Steps;
    }

    fn close(&mut self) {
        self.pending = None;
        self.host.close();
        self.error = None;
    }

    fn on_key_step(&mut self, key: KeyEvent, ops: &dyn PickFlowOps) -> Result<FlowSignal> {
        let Some(step) = self.current_step() else {
            self.stage = Stage::SelectList;
            return Ok(FlowSignal::Continue);
        };

        if keymap::is_close(key) {
            self.close();
            return Ok(FlowSignal::Exit(UiExit::BackAtRoot));
        }

        let editor_owns_back = match step {
            PickStep::Pick => self.items.is_editing(),
            PickStep::Qc => self.qc.is_overriding(),
            _ => false,
        };
        if keymap::is_back(key) && !editor_owns_back {
            self.step_back(ops)?;
            return Ok(FlowSignal::Continue);
        }

        match step {
            PickStep::Start => self.on_key_start(key),
            PickStep::Labels => self.on_key_labels(key),
            PickStep::Pick => {
                if self.items.on_key(key) == ItemsSignal::Submit {
                    self.submit(PickSubmission::Pick {
                        items: self.items.items.clone(),
                    });
                }
            }
            PickStep::Qc => {
                if let QcSignal::Submit(form) = self.qc.on_key(key) {
                    match validate_qc(&form) {
                        Ok(result) => self.submit(PickSubmission::Qc(result)),
                        Err(error) => self.error = Some(error.to_string()),
                    }
                }
            }
            PickStep::Trolley => self.on_key_trolley(key),
            PickStep::Complete => {
                if self.complete_choice.on_key(key) == ConfirmEvent::Yes {
                    self.submit(PickSubmission::Complete);
                }
            }
        }
        Ok(FlowSignal::Continue)
    }

    /// Esc on the first step closes the wizard and returns to list selection;
    /// elsewhere it steps back one entry in the history.
    fn step_back(&mut self, ops: &dyn PickFlowOps) -> Result<()> {
        self.error = None;
        let Some(session) = self.host.session_mut() else {
            return Ok(());
        };
        if session.is_first() {
            self.close();
            self.lists = RecordTable::new(ops.pick_lists()?, list_search_text);
            self.stage = Stage::SelectList;
            return Ok(());
        }
        if let Some(step) = session.retreat() {
            debug!(?step, "pick wizard stepped back");
        }
        Ok(())
    }

    fn on_key_start(&mut self, key: KeyEvent) {
        if !keymap::is_confirm(key) {
            self.start.on_key(key);
            return;
        }
        let form = StartForm {
            picker: self.start.value().to_string(),
        };
        match validate_start(&form) {
            Ok(picker) => self.submit(PickSubmission::Start { picker }),
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    fn on_key_labels(&mut self, key: KeyEvent) {
        if keymap::is_toggle(key) {
            self.labels.print = !self.labels.print;
        } else if keymap::is_up(key) || keymap::is_char(key, '+') {
            self.labels.copies = (self.labels.copies + 1).min(MAX_LABEL_COPIES);
        } else if keymap::is_down(key) || keymap::is_char(key, '-') {
            self.labels.copies = self.labels.copies.saturating_sub(1).max(1);
        } else if keymap::is_confirm(key) {
            match validate_labels(&self.labels) {
                Ok((printed, copies)) => self.submit(PickSubmission::Labels { printed, copies }),
                Err(error) => self.error = Some(error.to_string()),
            }
        }
    }

    fn on_key_trolley(&mut self, key: KeyEvent) {
        if !keymap::is_confirm(key) {
            self.trolley.on_key(key);
            return;
        }
        let units = self
            .host
            .session()
            .and_then(|session| pick_results(session.collected()))
            .map_or(0, |results| results.units);
        let form = TrolleyForm {
            trolleys: self.trolley.value(TROLLEYS).to_string(),
            shelves: self.trolley.value(SHELVES).to_string(),
            notes: self.trolley.value(TROLLEY_NOTES).to_string(),
        };
        match validate_trolley(&form, units) {
            Ok(allocation) => self.submit(PickSubmission::Trolley(allocation)),
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    fn on_key_done(&mut self, key: KeyEvent) -> FlowSignal {
        if self.notice.is_some() {
            if keymap::is_confirm(key) || keymap::is_back(key) {
                self.notice = None;
            }
            return FlowSignal::Continue;
        }
        if keymap::is_quit(key) {
            self.host.unmount();
            return FlowSignal::Exit(UiExit::Completed);
        }
        if keymap::is_confirm(key) || keymap::is_back(key) {
            self.host.unmount();
            return FlowSignal::Exit(UiExit::BackAtRoot);
        }
        FlowSignal::Continue
    }

    /// Starts a background submission for the active step. Gating predicates
    /// are checked first so a refused step never reaches the store.
    fn submit(&mut self, submission: PickSubmission) {
        let Some(session) = self.host.session() else {
            return;
        };
        if let Err(error) = check_pick_precondition(&submission, session.collected()) {
            self.error = Some(error.to_string());
            return;
        }
        let list = session.target().clone();
        let collected = session.collected().clone();

        match self.host.begin_submit(submission.step()) {
            Ok(ticket) => {
                let receiver =
                    self.worker
                        .spawn_pick(list, collected, submission, ticket.token());
                self.pending = Some(PendingSubmit::new(ticket, receiver));
                self.error = None;
            }
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    fn on_tick(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        self.spinner.tick();
        let outcome = match pending.poll() {
            Poll::Waiting => return,
            Poll::Ready(outcome) => outcome,
        };
        let ticket = pending.ticket();
        self.pending = None;

        match self.host.finish(ticket, outcome) {
            Ok(transition) => self.apply_transition(transition),
            Err(StepError::Orphaned) => debug!("ignored pick result for a closed wizard"),
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    fn apply_transition(&mut self, transition: Transition<PickStep>) {
        debug!(?transition, "pick wizard transition");
        match transition {
            Transition::Advanced { to, .. } => {
                if to == PickStep::Complete {
                    self.complete_choice = Confirm::new(true);
                }
            }
            Transition::Completed => {
                self.notice = self
                    .host
                    .hooks()
                    .completed
                    .as_ref()
                    .and_then(|completed| completed.record.packing_warning.clone());
                self.stage = Stage::Done;
            }
            Transition::Stayed(_) => {}
        }
    }
}
