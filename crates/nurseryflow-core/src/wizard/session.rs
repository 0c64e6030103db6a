use super::{CollectedData, StepError, WizardFlow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position of the current step in the effective sequence.
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance<S> {
    Moved { from: S, to: S },
    AtTerminal,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    Advanced { from: S, to: S },
    Completed,
    Stayed(S),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket<S> {
    token: u64,
    step: S,
}

impl<S: Copy> SubmitTicket<S> {
    pub fn step(&self) -> S {
        self.step
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

#[derive(Debug)]
pub struct WizardSession<F: WizardFlow> {
    target: F::Target,
    current: F::Step,
    collected: CollectedData<F>,
    submitting: bool,
    history: Vec<F::Step>,
    active_ticket: Option<u64>,
    next_ticket: u64,
    completion_reported: bool,
}

impl<F: WizardFlow> WizardSession<F> {
    pub fn new(target: F::Target) -> Self {
        Self {
            target,
            current: F::first_step(),
            collected: CollectedData::<F>::new(),
            submitting: false,
            history: Vec::new(),
            active_ticket: None,
            next_ticket: 1,
            completion_reported: false,
        }
    }

    pub fn target(&self) -> &F::Target {
        &self.target
    }

    pub fn current_step(&self) -> F::Step {
        self.current
    }

    pub fn collected(&self) -> &CollectedData<F> {
        &self.collected
    }

    pub fn step_data(&self, step: F::Step) -> Option<&F::Payload> {
        self.collected.get(&step)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn history(&self) -> &[F::Step] {
        &self.history
    }

    pub fn effective_steps(&self) -> Vec<F::Step> {
        F::effective_steps(&self.collected)
    }

    pub fn is_first(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.effective_steps().last() == Some(&self.current)
    }

    pub fn progress(&self) -> Progress {
        let steps = self.effective_steps();
        let index = steps
            .iter()
            .position(|step| *step == self.current)
            .unwrap_or(self.history.len());
        Progress {
            position: index + 1,
            total: steps.len().max(index + 1),
        }
    }

    pub fn set_step_data(&mut self, step: F::Step, payload: F::Payload) {
        self.collected.insert(step, payload);
    }

    pub fn set_submitting(&mut self, value: bool) {
        self.submitting = value;
    }

    pub fn advance(&mut self) -> Advance<F::Step> {
        if self.submitting {
            return Advance::Blocked;
        }
        let steps = self.effective_steps();
        self.advance_within(&steps)
    }

    /// Moves back to the step visited before the current one. Returns the new
    /// current step, or `None` at the first step or while a submission is pending.
    pub fn retreat(&mut self) -> Option<F::Step> {
        if self.submitting {
            return None;
        }
        let previous = self.history.pop()?;
        self.current = previous;
        Some(previous)
    }

    pub fn reset(&mut self) {
        self.collected.clear();
        self.history.clear();
        self.current = F::first_step();
        self.submitting = false;
        self.active_ticket = None;
        self.completion_reported = false;
    }

    pub fn begin_submit(&mut self, step: F::Step) -> Result<SubmitTicket<F::Step>, StepError> {
        if self.submitting {
            return Err(StepError::Busy);
        }
        if step != self.current {
            return Err(StepError::Precondition(format!(
                "{step:?} is not the active step (currently {:?})",
                self.current
            )));
        }

        let token = self.next_ticket;
        self.next_ticket = self.next_ticket.saturating_add(1);
        self.active_ticket = Some(token);
        self.set_submitting(true);
        Ok(SubmitTicket { token, step })
    }

    /// Settles an in-flight submission. The submitting flag is cleared on both
    /// outcomes; a failed outcome leaves the step and its collected data untouched.
    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket<F::Step>,
        outcome: Result<F::Payload, String>,
    ) -> Result<Transition<F::Step>, StepError> {
        if self.active_ticket != Some(ticket.token) {
            return Err(StepError::Orphaned);
        }

        self.active_ticket = None;
        self.set_submitting(false);

        match outcome {
            Ok(payload) => Ok(self.commit(ticket.step, payload)),
            Err(message) => Err(StepError::Persistence(message)),
        }
    }

    pub fn submit_with<P>(
        &mut self,
        step: F::Step,
        persist: P,
    ) -> Result<Transition<F::Step>, StepError>
    where
        P: FnOnce(&F::Target, &CollectedData<F>) -> anyhow::Result<F::Payload>,
    {
        let ticket = self.begin_submit(step)?;
        let outcome =
            persist(&self.target, &self.collected).map_err(|error| format!("{error:#}"));
        self.finish_submit(ticket, outcome)
    }

    fn commit(&mut self, step: F::Step, payload: F::Payload) -> Transition<F::Step> {
        self.set_step_data(step, payload);
        let steps = F::effective_steps(&self.collected);

        match self.advance_within(&steps) {
            Advance::Moved { from, to } => Transition::Advanced { from, to },
            Advance::AtTerminal if !self.completion_reported => {
                self.completion_reported = true;
                Transition::Completed
            }
            Advance::AtTerminal | Advance::Blocked => Transition::Stayed(self.current),
        }
    }

    fn advance_within(&mut self, steps: &[F::Step]) -> Advance<F::Step> {
        let Some(index) = steps.iter().position(|step| *step == self.current) else {
            return Advance::Blocked;
        };
        let Some(next) = steps.get(index + 1).copied() else {
            return Advance::AtTerminal;
        };

        let from = self.current;
        self.history.push(from);
        self.current = next;
        Advance::Moved { from, to: next }
    }
}
