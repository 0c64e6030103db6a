mod entry;
mod render;
mod treatment;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::KeyEvent;
use nurseryflow_app::App;
use nurseryflow_app::scout::ScoutSubmission;
use nurseryflow_core::scouting::{
    Location, LogForm, ScoutFlow, ScoutPayload, ScoutStep, ScoutTarget, TreatmentForm,
    logged_entry, suggested_variant, validate_log, validate_treatment,
};
use nurseryflow_core::wizard::{CollectedData, StepError, Transition, WizardHooks, WizardHost};
use tracing::{debug, info};

use crate::UiExit;
use crate::keymap;
use crate::submit::{LedgerSubmitWorker, PendingSubmit, Poll, SubmitWorker};
use crate::ui::record_table::{RecordTable, TableSignal};
use crate::ui::spinner::Spinner;

use entry::{LogEditor, LogSignal};
use treatment::{TreatmentEditor, TreatmentSignal};

pub(crate) trait ScoutFlowOps {
    fn scout_locations(&self) -> Result<Vec<Location>>;
    fn scout_prepare(&self, location_id: &str, scanned_batch: Option<&str>) -> Result<ScoutTarget>;
}

impl<'a> ScoutFlowOps for App<'a> {
    fn scout_locations(&self) -> Result<Vec<Location>> {
        App::scout_locations(self)
    }

    fn scout_prepare(&self, location_id: &str, scanned_batch: Option<&str>) -> Result<ScoutTarget> {
        App::scout_prepare(self, location_id, scanned_batch)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScoutHooks {
    summary: Option<String>,
    cancelled: usize,
}

impl WizardHooks<ScoutFlow> for ScoutHooks {
    fn on_complete(&mut self, target: &ScoutTarget, collected: &CollectedData<ScoutFlow>) {
        info!(location = %target.location.id, steps = collected.len(), "scout wizard completed");
        self.summary = Some(completion_summary(target, collected));
    }

    fn on_cancel(&mut self, target: &ScoutTarget) {
        self.cancelled += 1;
        debug!(
            location = %target.location.id,
            closed = self.cancelled,
            "scout wizard closed"
        );
    }
}

fn completion_summary(target: &ScoutTarget, collected: &CollectedData<ScoutFlow>) -> String {
    let mut lines = vec![format!("Scouting saved for {}", target.location.name)];
    for payload in collected.values() {
        match payload {
            ScoutPayload::Log(saved) => {
                lines.push(format!("Log {}: {}", saved.log_id, saved.entry.summary()));
                lines.push(format!("Batches: {}", saved.entry.batch_ids.len()));
            }
            ScoutPayload::Treatment(saved) => {
                let mut plan = format!(
                    "Treatment {}: {} x{}",
                    saved.treatment_id, saved.plan.variant, saved.plan.applications
                );
                if let Some(product) = &saved.plan.product {
                    plan.push_str(&format!(" ({product})"));
                }
                lines.push(plan);
            }
        }
    }
    lines.join("\n")
}

/// A row of the batch chooser. `id: None` scouts the whole location.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchChoice {
    id: Option<String>,
    label: String,
    variety: String,
    quantity: Option<u32>,
}

fn batch_choices(location: &Location) -> Vec<BatchChoice> {
    let mut rows = vec![BatchChoice {
        id: None,
        label: "All batches".to_string(),
        variety: format!("{} batch(es)", location.batches.len()),
        quantity: None,
    }];
    rows.extend(location.batches.iter().map(|batch| BatchChoice {
        id: Some(batch.id.clone()),
        label: batch.batch_number.clone(),
        variety: batch.variety.clone(),
        quantity: Some(batch.quantity),
    }));
    rows
}

fn location_search_text(location: &Location) -> String {
    format!("{} {}", location.id, location.name)
}

fn batch_search_text(choice: &BatchChoice) -> String {
    format!("{} {}", choice.label, choice.variety)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SelectLocation,
    SelectBatch,
    Steps,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowSignal {
    Continue,
    Exit(UiExit),
}

struct ScoutWizard {
    stage: Stage,
    locations: RecordTable<Location>,
    batches: RecordTable<BatchChoice>,
    location_id: Option<String>,
    host: WizardHost<ScoutFlow, ScoutHooks>,
    worker: Arc<dyn SubmitWorker>,
    pending: Option<PendingSubmit<ScoutFlow>>,
    operator: String,
    log: Option<LogEditor>,
    treatment: TreatmentEditor,
    error: Option<String>,
    spinner: Spinner,
}

pub(crate) struct ScoutScreen {
    flow: ScoutWizard,
}

impl ScoutScreen {
    pub(crate) fn new(app: &App<'_>, ledger_path: &Path, operator: &str) -> Result<Self> {
        let worker = Arc::new(LedgerSubmitWorker::new(ledger_path.to_path_buf()));
        Ok(Self {
            flow: ScoutWizard::new(app, worker, operator)?,
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

impl ScoutWizard {
    fn new(ops: &dyn ScoutFlowOps, worker: Arc<dyn SubmitWorker>, operator: &str) -> Result<Self> {
        Ok(Self {
            stage: Stage::SelectLocation,
            locations: RecordTable::new(ops.scout_locations()?, location_search_text),
            batches: RecordTable::new(Vec::new(), batch_search_text),
            location_id: None,
            host: WizardHost::new(ScoutHooks::default()),
            worker,
            pending: None,
            operator: operator.to_string(),
            log: None,
            treatment: TreatmentEditor::new(&TreatmentForm::default()),
            error: None,
            spinner: Spinner::default(),
        })
    }

    fn current_step(&self) -> Option<ScoutStep> {
        self.host.session().map(|session| session.current_step())
    }

    fn on_key(&mut self, key: KeyEvent, ops: &dyn ScoutFlowOps) -> Result<FlowSignal> {
        if self.pending.is_some() {
            if keymap::is_close(key) {
                self.close();
                return Ok(FlowSignal::Exit(UiExit::BackAtRoot));
            }
            return Ok(FlowSignal::Continue);
        }

        match self.stage {
            Stage::SelectLocation => Ok(self.on_key_location(key, ops)),
            Stage::SelectBatch => Ok(self.on_key_batch(key, ops)),
            Stage::Steps => self.on_key_step(key, ops),
            Stage::Done => Ok(self.on_key_done(key)),
        }
    }

    fn on_key_location(&mut self, key: KeyEvent, ops: &dyn ScoutFlowOps) -> FlowSignal {
        match self.locations.on_key(key) {
            TableSignal::Back => return FlowSignal::Exit(UiExit::BackAtRoot),
            TableSignal::Continue => return FlowSignal::Continue,
            TableSignal::Confirm => {}
        }
        let Some(location) = self.locations.selected_row().cloned() else {
            return FlowSignal::Continue;
        };

        self.error = None;
        if location.batches.is_empty() {
            self.prepare(ops, &location.id, None);
        } else {
            self.batches = RecordTable::new(batch_choices(&location), batch_search_text);
            self.location_id = Some(location.id);
            self.stage = Stage::SelectBatch;
        }
        FlowSignal::Continue
    }

    fn on_key_batch(&mut self, key: KeyEvent, ops: &dyn ScoutFlowOps) -> FlowSignal {
        match self.batches.on_key(key) {
            TableSignal::Back => {
                self.error = None;
                self.stage = Stage::SelectLocation;
                return FlowSignal::Continue;
            }
            TableSignal::Continue => return FlowSignal::Continue,
            TableSignal::Confirm => {}
        }
        let Some(location_id) = self.location_id.clone() else {
            self.stage = Stage::SelectLocation;
            return FlowSignal::Continue;
        };
        let scanned = self
            .batches
            .selected_row()
            .and_then(|choice| choice.id.clone());
        self.prepare(ops, &location_id, scanned.as_deref());
        FlowSignal::Continue
    }

    fn prepare(&mut self, ops: &dyn ScoutFlowOps, location_id: &str, scanned: Option<&str>) {
        match ops.scout_prepare(location_id, scanned) {
            Ok(target) => self.open(target),
            Err(error) => self.error = Some(format!("{error:#}")),
        }
    }

    fn open(&mut self, target: ScoutTarget) {
        debug!(
            location = %target.location.id,
            scanned = ?target.scanned_batch,
            "scout wizard opened"
        );
        self.log = Some(LogEditor::new(&target, &LogForm::for_target(&target)));
        self.treatment = TreatmentEditor::new(&TreatmentForm::default());
        self.error = None;
        self.host.initialize(target);
        self.stage = Stage::Steps;
    }

    fn close(&mut self) {
        self.pending = None;
        self.host.close();
        self.log = None;
        self.error = None;
    }

    fn on_key_step(&mut self, key: KeyEvent, ops: &dyn ScoutFlowOps) -> Result<FlowSignal> {
        let Some(step) = self.current_step() else {
            self.stage = Stage::SelectLocation;
            return Ok(FlowSignal::Continue);
        };

        if keymap::is_close(key) {
            self.close();
            return Ok(FlowSignal::Exit(UiExit::BackAtRoot));
        }
        if keymap::is_back(key) {
            self.step_back(ops)?;
            return Ok(FlowSignal::Continue);
        }

        match step {
            ScoutStep::Log => {
                let submit = self
                    .log
                    .as_mut()
                    .is_some_and(|log| log.on_key(key) == LogSignal::Submit);
                if submit {
                    self.submit_log();
                }
            }
            ScoutStep::Treatment => {
                if self.treatment.on_key(key) == TreatmentSignal::Submit {
                    match validate_treatment(&self.treatment.to_form()) {
                        Ok(plan) => self.submit(ScoutSubmission::Treatment(plan)),
                        Err(error) => self.error = Some(error.to_string()),
                    }
                }
            }
        }
        Ok(FlowSignal::Continue)
    }

    fn submit_log(&mut self) {
        let (Some(log), Some(session)) = (self.log.as_ref(), self.host.session()) else {
            return;
        };
        match validate_log(&log.to_form(), session.target()) {
            Ok(entry) => self.submit(ScoutSubmission::Log {
                entry,
                scout: self.operator.clone(),
            }),
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    /// Esc on the log closes the wizard and returns to location selection.
    /// From the treatment it steps back to the log, refilled from the saved
    /// entry so a re-save updates the same record.
    fn step_back(&mut self, ops: &dyn ScoutFlowOps) -> Result<()> {
        self.error = None;
        let Some(session) = self.host.session_mut() else {
            return Ok(());
        };
        if session.is_first() {
            self.close();
            self.locations = RecordTable::new(ops.scout_locations()?, location_search_text);
            self.stage = Stage::SelectLocation;
            return Ok(());
        }
        if session.retreat() == Some(ScoutStep::Log) {
            let form = logged_entry(session.collected()).map(LogForm::from_entry);
            if let Some(form) = form {
                self.log = Some(LogEditor::new(session.target(), &form));
            }
        }
        Ok(())
    }

    fn on_key_done(&mut self, key: KeyEvent) -> FlowSignal {
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

    fn submit(&mut self, submission: ScoutSubmission) {
        let Some(session) = self.host.session() else {
            return;
        };
        let target = session.target().clone();
        let collected = session.collected().clone();

        match self.host.begin_submit(submission.step()) {
            Ok(ticket) => {
                let receiver =
                    self.worker
                        .spawn_scout(target, collected, submission, ticket.token());
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
            Err(StepError::Orphaned) => debug!("ignored scout result for a closed wizard"),
            Err(error) => self.error = Some(error.to_string()),
        }
    }

    fn apply_transition(&mut self, transition: Transition<ScoutStep>) {
        debug!(?transition, "scout wizard transition");
        match transition {
            Transition::Advanced {
                to: ScoutStep::Treatment,
                ..
            } => {
                let suggestion = self
                    .host
                    .session()
                    .and_then(|session| suggested_variant(session.collected()));
                self.treatment = TreatmentEditor::new(&TreatmentForm::with_suggestion(suggestion));
            }
            Transition::Advanced { .. } | Transition::Stayed(_) => {}
            Transition::Completed => self.stage = Stage::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use nurseryflow_app::scout::ScoutSubmission;
    use nurseryflow_core::scouting::{
        BatchRef, Location, LogEntry, SavedLog, SavedTreatment, ScoutPayload, ScoutStep,
        ScoutTarget, TreatmentVariant,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::{FlowSignal, ScoutFlowOps, ScoutWizard, Stage};
    use crate::UiExit;
    use crate::submit::scripted::ScriptedWorker;

    struct FakeOps {
        locations: Vec<Location>,
        prepared: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeOps {
        fn new() -> Self {
            Self {
                locations: vec![
                    Location {
                        id: "loc-tunnel-3".to_string(),
                        name: "Tunnel 3".to_string(),
                        batches: vec![
                            BatchRef {
                                id: "bat-0001".to_string(),
                                batch_number: "B-1001".to_string(),
                                variety: "Lavandula angustifolia".to_string(),
                                quantity: 240,
                            },
                            BatchRef {
                                id: "bat-0002".to_string(),
                                batch_number: "B-1002".to_string(),
                                variety: "Salvia nemorosa".to_string(),
                                quantity: 120,
                            },
                        ],
                    },
                    Location {
                        id: "loc-yard".to_string(),
                        name: "Standing yard".to_string(),
                        batches: Vec::new(),
                    },
                ],
                prepared: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScoutFlowOps for FakeOps {
        fn scout_locations(&self) -> Result<Vec<Location>> {
            Ok(self.locations.clone())
        }

        fn scout_prepare(&self, location_id: &str, scanned: Option<&str>) -> Result<ScoutTarget> {
            self.prepared
                .borrow_mut()
                .push((location_id.to_string(), scanned.map(str::to_string)));
            let location = self
                .locations
                .iter()
                .find(|location| location.id == location_id)
                .cloned()
                .ok_or_else(|| anyhow!("location '{location_id}' does not exist"))?;
            Ok(ScoutTarget {
                location,
                scanned_batch: scanned.map(str::to_string),
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(flow: &mut ScoutWizard, ops: &FakeOps, code: KeyCode) {
        flow.on_key(key(code), ops).expect("key");
    }

    fn type_text(flow: &mut ScoutWizard, ops: &FakeOps, text: &str) {
        for ch in text.chars() {
            press(flow, ops, KeyCode::Char(ch));
        }
    }

    fn render_output(flow: &ScoutWizard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 34)).expect("terminal");
        terminal.draw(|frame| flow.render(frame)).expect("draw");
        format!("{}", terminal.backend())
    }

    /// Opens the tunnel location scoped to its second batch.
    fn opened(ops: &FakeOps, worker: Arc<ScriptedWorker>) -> ScoutWizard {
        let mut flow = ScoutWizard::new(ops, worker, "Alex").expect("flow");
        press(&mut flow, ops, KeyCode::Enter);
        assert_eq!(flow.stage, Stage::SelectBatch);
        press(&mut flow, ops, KeyCode::Down);
        press(&mut flow, ops, KeyCode::Down);
        press(&mut flow, ops, KeyCode::Enter);
        assert_eq!(flow.stage, Stage::Steps);
        flow
    }

    fn saved_log(entry: LogEntry) -> ScoutPayload {
        ScoutPayload::Log(SavedLog {
            log_id: "log-0001".to_string(),
            entry,
        })
    }

    fn last_log_entry(worker: &ScriptedWorker) -> LogEntry {
        match worker.last_scout().0 {
            ScoutSubmission::Log { entry, .. } => entry,
            other => panic!("expected a log submission, got {other:?}"),
        }
    }

    #[test]
    fn batch_choice_scopes_the_target() {
        let ops = FakeOps::new();
        let flow = opened(&ops, Arc::new(ScriptedWorker::default()));

        assert_eq!(
            ops.prepared.borrow().as_slice(),
            [("loc-tunnel-3".to_string(), Some("bat-0002".to_string()))]
        );
        let log = flow.log.as_ref().expect("log editor");
        assert_eq!(log.batch_ids, vec!["bat-0002".to_string()]);
        assert!(render_output(&flow).contains("Tunnel 3"));
    }

    #[test]
    fn location_without_batches_opens_directly() {
        let ops = FakeOps::new();
        let mut flow =
            ScoutWizard::new(&ops, Arc::new(ScriptedWorker::default()), "Alex").expect("flow");
        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Enter);

        assert_eq!(flow.stage, Stage::Steps);
        assert_eq!(
            ops.prepared.borrow().as_slice(),
            [("loc-yard".to_string(), None)]
        );
    }

    #[test]
    fn low_severity_issue_completes_without_treatment() {
        let ops = FakeOps::new();
        let worker = Arc::new(ScriptedWorker::default());
        let mut flow = opened(&ops, worker.clone());

        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "slight leaf curl");
        press(&mut flow, &ops, KeyCode::Enter);
        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(worker.scout_spawns(), 1);

        let entry = last_log_entry(&worker);
        assert!(!entry.needs_treatment());
        assert!(matches!(
            worker.last_scout().0,
            ScoutSubmission::Log { scout, .. } if scout == "Alex"
        ));

        worker.resolve_scout(Ok(saved_log(entry)));
        flow.on_tick();

        assert_eq!(flow.stage, Stage::Done);
        let output = render_output(&flow);
        assert!(output.contains("Scouting saved for Tunnel 3"));
        assert!(output.contains("slight leaf curl (low)"));
    }

    #[test]
    fn low_ec_reading_branches_into_prefilled_feeding_plan() {
        let ops = FakeOps::new();
        let worker = Arc::new(ScriptedWorker::default());
        let mut flow = opened(&ops, worker.clone());

        press(&mut flow, &ops, KeyCode::Char(' '));
        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "0.3");
        press(&mut flow, &ops, KeyCode::Enter);

        let entry = last_log_entry(&worker);
        assert!(entry.needs_treatment());
        worker.resolve_scout(Ok(saved_log(entry)));
        flow.on_tick();

        assert_eq!(flow.current_step(), Some(ScoutStep::Treatment));
        assert_eq!(flow.treatment.variant, Some(TreatmentVariant::Feeding));
        assert!(render_output(&flow).contains("Step 2/2"));

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(flow.error.as_deref(), Some("product: enter the product applied"));
        assert_eq!(worker.scout_spawns(), 1);

        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "Osmocote");
        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "2.5");
        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(worker.scout_spawns(), 2);
        let plan = match worker.last_scout().0 {
            ScoutSubmission::Treatment(plan) => plan,
            other => panic!("expected a treatment submission, got {other:?}"),
        };
        assert_eq!(plan.rate, Some(2.5));

        worker.resolve_scout(Ok(ScoutPayload::Treatment(SavedTreatment {
            treatment_id: "trt-0001".to_string(),
            log_id: "log-0001".to_string(),
            plan,
        })));
        flow.on_tick();
        assert_eq!(flow.stage, Stage::Done);
        assert!(render_output(&flow).contains("Treatment trt-0001: feeding x1 (Osmocote)"));

        let signal = flow.on_key(key(KeyCode::Enter), &ops).expect("home");
        assert_eq!(signal, FlowSignal::Exit(UiExit::BackAtRoot));
        assert!(flow.host.is_loading());
    }

    #[test]
    fn esc_from_treatment_refills_log_and_esc_again_closes() {
        let ops = FakeOps::new();
        let worker = Arc::new(ScriptedWorker::default());
        let mut flow = opened(&ops, worker.clone());

        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "vine weevil");
        press(&mut flow, &ops, KeyCode::Tab);
        press(&mut flow, &ops, KeyCode::Right);
        press(&mut flow, &ops, KeyCode::Enter);
        let entry = last_log_entry(&worker);
        worker.resolve_scout(Ok(saved_log(entry)));
        flow.on_tick();
        assert_eq!(flow.current_step(), Some(ScoutStep::Treatment));

        press(&mut flow, &ops, KeyCode::Esc);
        assert_eq!(flow.current_step(), Some(ScoutStep::Log));
        let log = flow.log.as_ref().expect("log editor");
        assert_eq!(log.reason.value(), "vine weevil");

        press(&mut flow, &ops, KeyCode::Esc);
        assert_eq!(flow.stage, Stage::SelectLocation);
        assert_eq!(flow.host.hooks().cancelled, 1);
    }

    #[test]
    fn failed_save_keeps_the_log_and_allows_retry() {
        let ops = FakeOps::new();
        let worker = Arc::new(ScriptedWorker::default());
        let mut flow = opened(&ops, worker.clone());

        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "mildew");
        press(&mut flow, &ops, KeyCode::Enter);
        worker.resolve_scout(Err("failed to save scout log: disk full".to_string()));
        flow.on_tick();

        assert_eq!(flow.current_step(), Some(ScoutStep::Log));
        assert!(render_output(&flow).contains("disk full"));

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(worker.scout_spawns(), 2);
    }
}
