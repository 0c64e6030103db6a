use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use nurseryflow_app::App;
use nurseryflow_app::pick::PickSubmission;
use nurseryflow_app::scout::ScoutSubmission;
use nurseryflow_core::ledger::FileLedger;
use nurseryflow_core::picking::{PickFlow, PickList, PickPayload};
use nurseryflow_core::scouting::{ScoutFlow, ScoutPayload, ScoutTarget};
use nurseryflow_core::wizard::{CollectedData, SubmitTicket, WizardFlow};
use tracing::debug;

/// Result of one background persistence call, tagged with the ticket token it
/// was started under.
#[derive(Debug)]
pub(crate) struct SubmitOutcome<P> {
    pub(crate) token: u64,
    pub(crate) result: Result<P, String>,
}

/// Runs step persistence off the UI thread. Each call owns a snapshot of the
/// target and collected data and reports exactly one outcome.
pub(crate) trait SubmitWorker: Send + Sync {
    fn spawn_pick(
        &self,
        list: PickList,
        collected: CollectedData<PickFlow>,
        submission: PickSubmission,
        token: u64,
    ) -> Receiver<SubmitOutcome<PickPayload>>;

    fn spawn_scout(
        &self,
        target: ScoutTarget,
        collected: CollectedData<ScoutFlow>,
        submission: ScoutSubmission,
        token: u64,
    ) -> Receiver<SubmitOutcome<ScoutPayload>>;
}

#[derive(Debug, Clone)]
pub(crate) struct LedgerSubmitWorker {
    ledger_path: PathBuf,
}

impl LedgerSubmitWorker {
    pub(crate) fn new(ledger_path: PathBuf) -> Self {
        Self { ledger_path }
    }
}

impl SubmitWorker for LedgerSubmitWorker {
    fn spawn_pick(
        &self,
        list: PickList,
        collected: CollectedData<PickFlow>,
        submission: PickSubmission,
        token: u64,
    ) -> Receiver<SubmitOutcome<PickPayload>> {
        let (sender, receiver) = mpsc::channel();
        let ledger = FileLedger::new(self.ledger_path.clone());
        std::thread::spawn(move || {
            debug!(token, step = ?submission.step(), "pick submission started");
            let app = App::new(&ledger);
            let result = app
                .pick_persist(&list, &collected, &submission)
                .map_err(|error| format!("{error:#}"));
            let _ = sender.send(SubmitOutcome { token, result });
        });
        receiver
    }

    fn spawn_scout(
        &self,
        target: ScoutTarget,
        collected: CollectedData<ScoutFlow>,
        submission: ScoutSubmission,
        token: u64,
    ) -> Receiver<SubmitOutcome<ScoutPayload>> {
        let (sender, receiver) = mpsc::channel();
        let ledger = FileLedger::new(self.ledger_path.clone());
        std::thread::spawn(move || {
            debug!(token, step = ?submission.step(), "scout submission started");
            let app = App::new(&ledger);
            let result = app
                .scout_persist(&target, &collected, &submission)
                .map_err(|error| format!("{error:#}"));
            let _ = sender.send(SubmitOutcome { token, result });
        });
        receiver
    }
}

pub(crate) enum Poll<P> {
    Waiting,
    Ready(Result<P, String>),
}

/// An in-flight submission: the session ticket plus the channel its outcome
/// arrives on.
pub(crate) struct PendingSubmit<F: WizardFlow> {
    ticket: SubmitTicket<F::Step>,
    receiver: Receiver<SubmitOutcome<F::Payload>>,
}

impl<F: WizardFlow> PendingSubmit<F> {
    pub(crate) fn new(
        ticket: SubmitTicket<F::Step>,
        receiver: Receiver<SubmitOutcome<F::Payload>>,
    ) -> Self {
        Self { ticket, receiver }
    }

    pub(crate) fn ticket(&self) -> SubmitTicket<F::Step> {
        self.ticket
    }

    pub(crate) fn poll(&self) -> Poll<F::Payload> {
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) if outcome.token == self.ticket.token() => {
                    return Poll::Ready(outcome.result);
                }
                Ok(outcome) => {
                    debug!(token = outcome.token, "dropping outcome for another ticket");
                }
                Err(TryRecvError::Empty) => return Poll::Waiting,
                Err(TryRecvError::Disconnected) => {
                    return Poll::Ready(Err(
                        "submission worker ended without a result".to_string()
                    ));
                }
            }
        }
    }
}
