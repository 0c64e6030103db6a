use super::session::{Progress, SubmitTicket, Transition, WizardSession};
use super::{CollectedData, StepError, WizardFlow};

pub trait WizardHooks<F: WizardFlow> {
    fn on_complete(&mut self, target: &F::Target, collected: &CollectedData<F>);
    fn on_cancel(&mut self, target: &F::Target);
}

/// Owns the session for one mounted wizard. `None` means the target is still loading
/// or the wizard has been unmounted.
pub struct WizardHost<F: WizardFlow, H: WizardHooks<F>> {
    session: Option<WizardSession<F>>,
    hooks: H,
}

impl<F: WizardFlow, H: WizardHooks<F>> WizardHost<F, H> {
    pub fn new(hooks: H) -> Self {
        Self {
            session: None,
            hooks,
        }
    }

    pub fn initialize(&mut self, target: F::Target) {
        self.session = Some(WizardSession::new(target));
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_none()
    }

    pub fn session(&self) -> Option<&WizardSession<F>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut WizardSession<F>> {
        self.session.as_mut()
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn progress(&self) -> Option<Progress> {
        self.session.as_ref().map(WizardSession::progress)
    }

    pub fn is_busy(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(WizardSession::is_submitting)
    }

    pub fn begin_submit(&mut self, step: F::Step) -> Result<SubmitTicket<F::Step>, StepError> {
        self.session
            .as_mut()
            .ok_or(StepError::Orphaned)?
            .begin_submit(step)
    }

    pub fn finish(
        &mut self,
        ticket: SubmitTicket<F::Step>,
        outcome: Result<F::Payload, String>,
    ) -> Result<Transition<F::Step>, StepError> {
        let session = self.session.as_mut().ok_or(StepError::Orphaned)?;
        let transition = session.finish_submit(ticket, outcome)?;
        self.report(transition);
        Ok(transition)
    }

    pub fn submit_with<P>(
        &mut self,
        step: F::Step,
        persist: P,
    ) -> Result<Transition<F::Step>, StepError>
    where
        P: FnOnce(&F::Target, &CollectedData<F>) -> anyhow::Result<F::Payload>,
    {
        let session = self.session.as_mut().ok_or(StepError::Orphaned)?;
        let transition = session.submit_with(step, persist)?;
        self.report(transition);
        Ok(transition)
    }

    /// Close affordance: resets the session, notifies the parent and unmounts.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.reset();
            self.hooks.on_cancel(session.target());
        }
    }

    pub fn unmount(&mut self) {
        self.session = None;
    }

    fn report(&mut self, transition: Transition<F::Step>) {
        if transition != Transition::Completed {
            return;
        }
        if let Some(session) = self.session.as_ref() {
            self.hooks.on_complete(session.target(), session.collected());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WizardHooks, WizardHost};
    use crate::wizard::test_flow::{Demo, DemoFlow, DemoPayload};
    use crate::wizard::{CollectedData, StepError, Transition};

    #[derive(Default)]
    struct CountingHooks {
        completed: Vec<(String, usize)>,
        cancelled: Vec<String>,
    }

    impl WizardHooks<DemoFlow> for CountingHooks {
        fn on_complete(&mut self, target: &String, collected: &CollectedData<DemoFlow>) {
            self.completed.push((target.clone(), collected.len()));
        }

        fn on_cancel(&mut self, target: &String) {
            self.cancelled.push(target.clone());
        }
    }

    fn host() -> WizardHost<DemoFlow, CountingHooks> {
        let mut host = WizardHost::new(CountingHooks::default());
        host.initialize("order-9".to_string());
        host
    }

    #[test]
    fn loading_until_initialized() {
        let host: WizardHost<DemoFlow, CountingHooks> = WizardHost::new(CountingHooks::default());
        assert!(host.is_loading());
        assert!(host.progress().is_none());
        assert!(!host.is_busy());
    }

    #[test]
    fn on_complete_fires_once_after_terminal_submission() {
        let mut host = host();
        host.submit_with(Demo::Intake, |_, _| Ok(DemoPayload::Intake { detour: false }))
            .expect("intake");
        host.submit_with(Demo::Review, |_, _| Ok(DemoPayload::Note("ok")))
            .expect("review");
        let done = host
            .submit_with(Demo::Finish, |_, _| Ok(DemoPayload::Note("done")))
            .expect("finish");
        let again = host
            .submit_with(Demo::Finish, |_, _| Ok(DemoPayload::Note("done")))
            .expect("finish again");

        assert_eq!(done, Transition::Completed);
        assert_eq!(again, Transition::Stayed(Demo::Finish));
        assert_eq!(host.hooks().completed, vec![("order-9".to_string(), 3)]);
    }

    #[test]
    fn close_resets_notifies_and_unmounts() {
        let mut host = host();
        let ticket = host.begin_submit(Demo::Intake).expect("ticket");
        assert!(host.is_busy());

        host.close();

        assert!(host.is_loading());
        assert_eq!(host.hooks().cancelled, vec!["order-9".to_string()]);
        assert_eq!(
            host.finish(ticket, Ok(DemoPayload::Intake { detour: true })),
            Err(StepError::Orphaned)
        );
        assert!(host.hooks().completed.is_empty());
    }
}
