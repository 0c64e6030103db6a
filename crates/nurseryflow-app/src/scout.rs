use anyhow::{Context, Result};
use nurseryflow_core::scouting::{
    LogEntry, Location, SavedLog, SavedTreatment, ScoutFlow, ScoutPayload, ScoutSession,
    ScoutStep, ScoutTarget, TreatmentPlan, saved_log_id,
};
use nurseryflow_core::store::{ScoutLogRecord, TreatmentRecord};
use nurseryflow_core::wizard::{CollectedData, StepError, Transition};
use thiserror::Error;
use tracing::info;

use crate::{App, timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoutError {
    #[error("location '{id}' does not exist")]
    UnknownLocation { id: String },
    #[error("batch '{batch}' is not at location '{location}'")]
    UnknownBatch { location: String, batch: String },
    #[error("the log must be saved before a treatment")]
    MissingLog,
}

/// Validated input for one scout step, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoutSubmission {
    Log { entry: LogEntry, scout: String },
    Treatment(TreatmentPlan),
}

impl ScoutSubmission {
    pub fn step(&self) -> ScoutStep {
        match self {
            Self::Log { .. } => ScoutStep::Log,
            Self::Treatment(_) => ScoutStep::Treatment,
        }
    }
}

impl<'a> App<'a> {
    pub fn scout_locations(&self) -> Result<Vec<Location>> {
        self.store
            .locations()
            .context("failed to load scouting locations")
    }

    pub fn scout_prepare(&self, location_id: &str, scanned_batch: Option<&str>) -> Result<ScoutTarget> {
        let location = self
            .scout_locations()?
            .into_iter()
            .find(|location| location.id == location_id)
            .ok_or_else(|| ScoutError::UnknownLocation {
                id: location_id.to_string(),
            })?;

        let unknown_batch = scanned_batch
            .filter(|batch| !location.batches.iter().any(|candidate| candidate.id == *batch));
        if let Some(batch) = unknown_batch {
            return Err(ScoutError::UnknownBatch {
                location: location.id,
                batch: batch.to_string(),
            }
            .into());
        }

        Ok(ScoutTarget {
            location,
            scanned_batch: scanned_batch.map(str::to_string),
        })
    }

    pub fn scout_persist(
        &self,
        target: &ScoutTarget,
        collected: &CollectedData<ScoutFlow>,
        submission: &ScoutSubmission,
    ) -> Result<ScoutPayload> {
        match submission {
            ScoutSubmission::Log { entry, scout } => {
                let existing = saved_log_id(collected).map(str::to_string);
                let record = ScoutLogRecord::from_entry(
                    existing,
                    &target.location.id,
                    entry,
                    scout,
                    timestamp()?,
                );
                let log_id = self
                    .store
                    .save_scout_log(&record)
                    .context("failed to save scout log")?;
                info!(
                    log_id = %log_id,
                    location = %target.location.id,
                    needs_treatment = entry.needs_treatment(),
                    "saved scout log"
                );
                Ok(ScoutPayload::Log(SavedLog {
                    log_id,
                    entry: entry.clone(),
                }))
            }
            ScoutSubmission::Treatment(plan) => {
                let log_id = saved_log_id(collected).ok_or(ScoutError::MissingLog)?;
                let record = TreatmentRecord::from_plan(log_id, plan, timestamp()?);
                let treatment_id = self
                    .store
                    .save_treatment(&record)
                    .context("failed to save treatment")?;
                info!(
                    treatment_id = %treatment_id,
                    log_id = %log_id,
                    variant = %plan.variant,
                    "saved treatment"
                );
                Ok(ScoutPayload::Treatment(SavedTreatment {
                    treatment_id,
                    log_id: log_id.to_string(),
                    plan: plan.clone(),
                }))
            }
        }
    }

    /// Runs one scout step to completion on the calling thread.
    pub fn scout_submit(
        &self,
        session: &mut ScoutSession,
        submission: &ScoutSubmission,
    ) -> Result<Transition<ScoutStep>, StepError> {
        session.submit_with(submission.step(), |target, collected| {
            self.scout_persist(target, collected, submission)
        })
    }
}
