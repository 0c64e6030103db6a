use anyhow::{Context, Result};
use nurseryflow_core::picking::{
    CompletionRecord, LabelsRecord, PickError, PickFlow, PickItem, PickItemStatus, PickList,
    PickListStatus, PickPayload, PickResults, PickSession, PickStep, QcResult, StartRecord,
    TrolleyAllocation, can_proceed, pick_results, picked_units,
};
use nurseryflow_core::store::PackingRecord;
use nurseryflow_core::wizard::{CollectedData, StepError, Transition, WizardFlow};
use tracing::{info, warn};

use crate::{App, timestamp};

/// Validated input for one pick step, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickSubmission {
    Start { picker: String },
    Labels { printed: bool, copies: u32 },
    Pick { items: Vec<PickItem> },
    Qc(QcResult),
    Trolley(TrolleyAllocation),
    Complete,
}

impl PickSubmission {
    pub fn step(&self) -> PickStep {
        match self {
            Self::Start { .. } => PickStep::Start,
            Self::Labels { .. } => PickStep::Labels,
            Self::Pick { .. } => PickStep::Pick,
            Self::Qc(_) => PickStep::Qc,
            Self::Trolley(_) => PickStep::Trolley,
            Self::Complete => PickStep::Complete,
        }
    }
}

/// Gating predicates that must hold before a pick step may be submitted.
pub fn check_pick_precondition(
    submission: &PickSubmission,
    collected: &CollectedData<PickFlow>,
) -> Result<(), PickError> {
    match submission {
        PickSubmission::Pick { items } if !can_proceed(items) => Err(PickError::PendingItems {
            count: items
                .iter()
                .filter(|item| item.status == PickItemStatus::Pending)
                .count(),
        }),
        PickSubmission::Complete => {
            for descriptor in PickFlow::registry() {
                if descriptor.id != PickStep::Complete && !collected.contains_key(&descriptor.id) {
                    return Err(PickError::MissingStep {
                        step: descriptor.label,
                    });
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl<'a> App<'a> {
    pub fn pick_lists(&self) -> Result<Vec<PickList>> {
        self.store.pick_lists().context("failed to load pick lists")
    }

    pub fn pick_load(&self, id: &str) -> Result<PickList> {
        let list = self
            .store
            .load_pick_list(id)
            .with_context(|| format!("failed to load pick list {id}"))?
            .ok_or_else(|| PickError::Unknown { id: id.to_string() })?;

        if list.status == PickListStatus::Completed {
            return Err(PickError::AlreadyCompleted { id: list.id }.into());
        }
        Ok(list)
    }

    pub fn pick_persist(
        &self,
        list: &PickList,
        collected: &CollectedData<PickFlow>,
        submission: &PickSubmission,
    ) -> Result<PickPayload> {
        check_pick_precondition(submission, collected)?;
        let id = list.id.as_str();

        match submission {
            PickSubmission::Start { picker } => {
                let started_at = timestamp()?;
                self.store
                    .start_pick_list(id, picker, &started_at)
                    .context("failed to start pick list")?;
                info!(pick_list = id, picker = %picker, "started pick list");
                Ok(PickPayload::Start(StartRecord {
                    picker: picker.clone(),
                    started_at,
                }))
            }
            PickSubmission::Labels { printed, copies } => {
                let record = LabelsRecord::for_items(*printed, *copies, list.items.len());
                self.store
                    .record_labels(id, &record)
                    .context("failed to record labels")?;
                info!(pick_list = id, labels = record.labels, "recorded labels");
                Ok(PickPayload::Labels(record))
            }
            PickSubmission::Pick { items } => {
                self.store
                    .save_pick_results(id, items)
                    .context("failed to save picked items")?;
                let units = picked_units(items);
                info!(pick_list = id, units, "saved pick results");
                Ok(PickPayload::Pick(PickResults {
                    items: items.clone(),
                    units,
                }))
            }
            PickSubmission::Qc(result) => {
                self.store
                    .save_qc(id, result)
                    .context("failed to save QC checklist")?;
                info!(pick_list = id, overridden = result.overridden, "saved QC");
                Ok(PickPayload::Qc(result.clone()))
            }
            PickSubmission::Trolley(allocation) => {
                self.store
                    .assign_trolleys(id, allocation)
                    .context("failed to assign trolleys")?;
                info!(pick_list = id, trolleys = allocation.trolleys, "assigned trolleys");
                Ok(PickPayload::Trolley(allocation.clone()))
            }
            PickSubmission::Complete => self.pick_complete(list, collected),
        }
    }

    /// Runs one pick step to completion on the calling thread.
    pub fn pick_submit(
        &self,
        session: &mut PickSession,
        submission: &PickSubmission,
    ) -> Result<Transition<PickStep>, StepError> {
        check_pick_precondition(submission, session.collected())
            .map_err(|error| StepError::Precondition(error.to_string()))?;
        session.submit_with(submission.step(), |list, collected| {
            self.pick_persist(list, collected, submission)
        })
    }

    fn pick_complete(
        &self,
        list: &PickList,
        collected: &CollectedData<PickFlow>,
    ) -> Result<PickPayload> {
        let completed_at = timestamp()?;
        self.store
            .complete_pick_list(&list.id, &completed_at)
            .context("failed to complete pick list")?;
        info!(pick_list = %list.id, "completed pick list");

        let units = pick_results(collected).map_or(0, |results| results.units);
        let trolleys = match collected.get(&PickStep::Trolley) {
            Some(PickPayload::Trolley(allocation)) => allocation.trolleys,
            _ => 0,
        };
        let packing = PackingRecord {
            pick_list_id: list.id.clone(),
            order_ref: list.order_ref.clone(),
            trolleys,
            units,
            packed_at: completed_at.clone(),
        };

        let packing_warning = match self.store.update_packing(&packing) {
            Ok(()) => None,
            Err(error) => {
                warn!(
                    pick_list = %list.id,
                    error = %format!("{error:#}"),
                    "pick list completed but packing record was not updated"
                );
                Some(format!("packing record not updated: {error:#}"))
            }
        };

        Ok(PickPayload::Complete(CompletionRecord {
            completed_at,
            packing_warning,
        }))
    }
}
