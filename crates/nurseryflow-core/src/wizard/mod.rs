//! Step-sequencing engine shared by the picking and scouting wizards.
//!
//! A wizard type implements [`WizardFlow`]: a static registry of steps that are
//! always present, plus optional branch steps spliced in after an anchor step
//! when a predicate over the collected data holds. The effective sequence is
//! never stored; it is recomputed from the collected data whenever it is needed.

mod host;
mod session;

use std::collections::BTreeMap;
use std::fmt::Debug;

use thiserror::Error;

pub use host::{WizardHooks, WizardHost};
pub use session::{Advance, Progress, SubmitTicket, Transition, WizardSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor<S> {
    pub id: S,
    pub label: &'static str,
    pub icon: &'static str,
}

/// A conditionally inserted step, placed directly after `anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchStep<S> {
    pub anchor: S,
    pub descriptor: StepDescriptor<S>,
}

pub type CollectedData<F> = BTreeMap<<F as WizardFlow>::Step, <F as WizardFlow>::Payload>;

pub trait WizardFlow: Sized {
    type Target: Clone + Debug;
    type Step: Copy + Ord + Debug + 'static;
    type Payload: Clone + Debug;

    /// Steps that are structurally always present, in order. Never empty.
    fn registry() -> &'static [StepDescriptor<Self::Step>];

    fn branches() -> &'static [BranchStep<Self::Step>] {
        &[]
    }

    /// Branch predicate. Only consulted for steps listed in [`WizardFlow::branches`].
    fn branch_applies(_step: Self::Step, _collected: &CollectedData<Self>) -> bool {
        false
    }

    fn first_step() -> Self::Step {
        Self::registry()[0].id
    }

    fn effective_steps(collected: &CollectedData<Self>) -> Vec<Self::Step> {
        let mut steps = Vec::with_capacity(Self::registry().len() + Self::branches().len());
        for descriptor in Self::registry() {
            steps.push(descriptor.id);
            for branch in Self::branches()
                .iter()
                .filter(|branch| branch.anchor == descriptor.id)
            {
                if Self::branch_applies(branch.descriptor.id, collected) {
                    steps.push(branch.descriptor.id);
                }
            }
        }
        steps
    }

    fn descriptor(step: Self::Step) -> Option<StepDescriptor<Self::Step>> {
        Self::registry()
            .iter()
            .copied()
            .chain(Self::branches().iter().map(|branch| branch.descriptor))
            .find(|descriptor| descriptor.id == step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    Busy,
    #[error("{0}")]
    Persistence(String),
    #[error("{0}")]
    Precondition(String),
    #[error("submission result arrived after the wizard was closed")]
    Orphaned,
}

#[cfg(test)]
pub(crate) mod test_flow {
    use std::cell::Cell;

    use super::{BranchStep, CollectedData, StepDescriptor, WizardFlow};

    thread_local! {
        pub(crate) static RESOLVER_CALLS: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub(crate) enum Demo {
        Intake,
        Detour,
        Review,
        Finish,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum DemoPayload {
        Intake { detour: bool },
        Note(&'static str),
    }

    #[derive(Debug)]
    pub(crate) struct DemoFlow;

    static REGISTRY: &[StepDescriptor<Demo>] = &[
        StepDescriptor {
            id: Demo::Intake,
            label: "Intake",
            icon: "1",
        },
        StepDescriptor {
            id: Demo::Review,
            label: "Review",
            icon: "2",
        },
        StepDescriptor {
            id: Demo::Finish,
            label: "Finish",
            icon: "3",
        },
    ];

    static BRANCHES: &[BranchStep<Demo>] = &[BranchStep {
        anchor: Demo::Intake,
        descriptor: StepDescriptor {
            id: Demo::Detour,
            label: "Detour",
            icon: "+",
        },
    }];

    impl WizardFlow for DemoFlow {
        type Target = String;
        type Step = Demo;
        type Payload = DemoPayload;

        fn registry() -> &'static [StepDescriptor<Demo>] {
            REGISTRY
        }

        fn branches() -> &'static [BranchStep<Demo>] {
            BRANCHES
        }

        fn branch_applies(step: Demo, collected: &CollectedData<Self>) -> bool {
            RESOLVER_CALLS.with(|calls| calls.set(calls.get() + 1));
            step == Demo::Detour
                && matches!(
                    collected.get(&Demo::Intake),
                    Some(DemoPayload::Intake { detour: true })
                )
        }
    }

    pub(crate) fn resolver_calls() -> usize {
        RESOLVER_CALLS.with(Cell::get)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::WizardFlow;
    use super::test_flow::{Demo, DemoFlow, DemoPayload};

    #[test]
    fn effective_steps_match_registry_without_branch_data() {
        let collected = BTreeMap::new();
        assert_eq!(
            DemoFlow::effective_steps(&collected),
            vec![Demo::Intake, Demo::Review, Demo::Finish]
        );
    }

    #[test]
    fn branch_is_spliced_after_its_anchor() {
        let mut collected = BTreeMap::new();
        collected.insert(Demo::Intake, DemoPayload::Intake { detour: true });
        assert_eq!(
            DemoFlow::effective_steps(&collected),
            vec![Demo::Intake, Demo::Detour, Demo::Review, Demo::Finish]
        );
    }

    #[test]
    fn descriptor_covers_registry_and_branch_steps() {
        assert_eq!(
            DemoFlow::descriptor(Demo::Review).map(|value| value.label),
            Some("Review")
        );
        assert_eq!(
            DemoFlow::descriptor(Demo::Detour).map(|value| value.label),
            Some("Detour")
        );
        assert_eq!(DemoFlow::first_step(), Demo::Intake);
    }
}
