use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wizard::{CollectedData, StepDescriptor, ValidationError, WizardFlow, WizardSession};

pub const MAX_LABEL_COPIES: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PickStep {
    Start,
    Labels,
    Pick,
    Qc,
    Trolley,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickItemStatus {
    #[default]
    Pending,
    Picked,
    Substituted,
    Short,
}

impl PickItemStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Picked => "picked",
            Self::Substituted => "substituted",
            Self::Short => "short",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("pick list {id} is already completed")]
    AlreadyCompleted { id: String },
    #[error("pick list {id} was not found")]
    Unknown { id: String },
    #[error("{count} item(s) are still pending")]
    PendingItems { count: usize },
    #[error("short pick needs a quantity below {ordered}")]
    ShortQuantity { ordered: u32 },
    #[error("short pick needs a reason")]
    MissingShortReason,
    #[error("substitution needs a batch and a quantity above zero")]
    InvalidSubstitute,
    #[error("the {step} step has not been saved yet")]
    MissingStep { step: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickItem {
    pub id: String,
    pub batch_id: String,
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub picked_quantity: u32,
    #[serde(default)]
    pub status: PickItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_reason: Option<String>,
}

impl PickItem {
    pub fn mark_picked(&mut self) {
        self.status = PickItemStatus::Picked;
        self.picked_quantity = self.quantity;
        self.substitute_batch_id = None;
        self.short_reason = None;
    }

    pub fn mark_short(&mut self, picked: u32, reason: &str) -> Result<(), PickError> {
        if picked >= self.quantity {
            return Err(PickError::ShortQuantity {
                ordered: self.quantity,
            });
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PickError::MissingShortReason);
        }
        self.status = PickItemStatus::Short;
        self.picked_quantity = picked;
        self.substitute_batch_id = None;
        self.short_reason = Some(reason.to_string());
        Ok(())
    }

    pub fn substitute(&mut self, batch_id: &str, quantity: u32) -> Result<(), PickError> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() || quantity == 0 {
            return Err(PickError::InvalidSubstitute);
        }
        self.status = PickItemStatus::Substituted;
        self.picked_quantity = quantity;
        self.substitute_batch_id = Some(batch_id.to_string());
        self.short_reason = None;
        Ok(())
    }

    pub fn reset_pending(&mut self) {
        self.status = PickItemStatus::Pending;
        self.picked_quantity = 0;
        self.substitute_batch_id = None;
        self.short_reason = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickListStatus {
    #[default]
    Open,
    InProgress,
    Completed,
}

impl PickListStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickList {
    pub id: String,
    pub order_ref: String,
    pub customer: String,
    #[serde(default)]
    pub status: PickListStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelsRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc: Option<QcResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trolleys: Option<TrolleyAllocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, rename = "item")]
    pub items: Vec<PickItem>,
}

impl PickList {
    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == PickItemStatus::Pending)
            .count()
    }

    /// Steps already persisted for this list, counted from the stored fields.
    pub fn committed_steps(&self) -> usize {
        let items_done = !self.items.is_empty()
            && self.pending_count() == 0
            && self.started_at.is_some();
        [
            self.started_at.is_some(),
            self.labels.is_some(),
            items_done,
            self.qc.is_some(),
            self.trolleys.is_some(),
            self.completed_at.is_some(),
        ]
        .into_iter()
        .filter(|done| *done)
        .count()
    }
}

/// Gate for leaving the pick step: every line must be resolved.
pub fn can_proceed(items: &[PickItem]) -> bool {
    items
        .iter()
        .all(|item| item.status != PickItemStatus::Pending)
}

pub fn picked_units(items: &[PickItem]) -> u32 {
    items.iter().map(|item| item.picked_quantity).sum()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartForm {
    pub picker: String,
}

pub fn validate_start(form: &StartForm) -> Result<String, ValidationError> {
    let picker = form.picker.trim();
    if picker.is_empty() {
        return Err(ValidationError::new("picker", "enter who is picking"));
    }
    Ok(picker.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRecord {
    pub picker: String,
    pub started_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelsForm {
    pub print: bool,
    pub copies: u32,
}

impl Default for LabelsForm {
    fn default() -> Self {
        Self {
            print: true,
            copies: 1,
        }
    }
}

pub fn validate_labels(form: &LabelsForm) -> Result<(bool, u32), ValidationError> {
    if !form.print {
        return Ok((false, 0));
    }
    if !(1..=MAX_LABEL_COPIES).contains(&form.copies) {
        return Err(ValidationError::new(
            "copies",
            format!("copies must be between 1 and {MAX_LABEL_COPIES}"),
        ));
    }
    Ok((true, form.copies))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsRecord {
    pub printed: bool,
    pub copies: u32,
    pub labels: u32,
}

impl LabelsRecord {
    pub fn for_items(printed: bool, copies: u32, items: usize) -> Self {
        let lines = u32::try_from(items).unwrap_or(u32::MAX);
        Self {
            printed,
            copies,
            labels: if printed {
                lines.saturating_mul(copies)
            } else {
                0
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcState {
    #[default]
    Unchecked,
    Passed,
    Flagged,
}

impl QcState {
    pub fn next(self) -> Self {
        match self {
            Self::Unchecked => Self::Passed,
            Self::Passed => Self::Flagged,
            Self::Flagged => Self::Unchecked,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Passed => "ok",
            Self::Flagged => "flagged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcCheck {
    pub key: String,
    pub label: String,
    pub state: QcState,
}

pub fn default_checklist() -> Vec<QcCheck> {
    [
        ("quantities", "Quantities match the pick list"),
        ("health", "Plants free of pests and disease"),
        ("labels", "Every plant labelled"),
        ("pots", "Pots clean and undamaged"),
        ("watering", "Watered before dispatch"),
    ]
    .into_iter()
    .map(|(key, label)| QcCheck {
        key: key.to_string(),
        label: label.to_string(),
        state: QcState::Unchecked,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QcVerdict {
    Clean,
    NeedsOverride { unchecked: usize, flagged: usize },
}

pub fn evaluate_qc(checks: &[QcCheck]) -> QcVerdict {
    let unchecked = checks
        .iter()
        .filter(|check| check.state == QcState::Unchecked)
        .count();
    let flagged = checks
        .iter()
        .filter(|check| check.state == QcState::Flagged)
        .count();
    if unchecked == 0 && flagged == 0 {
        QcVerdict::Clean
    } else {
        QcVerdict::NeedsOverride { unchecked, flagged }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QcForm {
    pub checks: Vec<QcCheck>,
    pub override_confirmed: bool,
    pub override_reason: String,
}

impl Default for QcForm {
    fn default() -> Self {
        Self {
            checks: default_checklist(),
            override_confirmed: false,
            override_reason: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcResult {
    #[serde(rename = "check")]
    pub checks: Vec<QcCheck>,
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

pub fn validate_qc(form: &QcForm) -> Result<QcResult, ValidationError> {
    match evaluate_qc(&form.checks) {
        QcVerdict::Clean => Ok(QcResult {
            checks: form.checks.clone(),
            overridden: false,
            override_reason: None,
        }),
        QcVerdict::NeedsOverride { unchecked, flagged } => {
            if !form.override_confirmed {
                return Err(ValidationError::new(
                    "override",
                    format!(
                        "{unchecked} unchecked and {flagged} flagged; confirm to proceed anyway"
                    ),
                ));
            }
            let reason = form.override_reason.trim();
            Ok(QcResult {
                checks: form.checks.clone(),
                overridden: true,
                override_reason: (!reason.is_empty()).then(|| reason.to_string()),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrolleyForm {
    pub trolleys: String,
    pub shelves: String,
    pub notes: String,
}

impl Default for TrolleyForm {
    fn default() -> Self {
        Self {
            trolleys: "1".to_string(),
            shelves: String::new(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrolleyAllocation {
    pub trolleys: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelves: Option<u32>,
    pub units: u32,
    #[serde(default)]
    pub notes: String,
}

pub fn validate_trolley(form: &TrolleyForm, units: u32) -> Result<TrolleyAllocation, ValidationError> {
    let trolleys = parse_count("trolleys", &form.trolleys)?.unwrap_or(0);
    let shelves = parse_count("shelves", &form.shelves)?;

    if units > 0 && trolleys == 0 {
        return Err(ValidationError::new(
            "trolleys",
            format!("{units} unit(s) need at least one trolley"),
        ));
    }
    if shelves.is_some_and(|shelves| shelves < trolleys) {
        return Err(ValidationError::new(
            "shelves",
            "each trolley needs at least one shelf",
        ));
    }

    Ok(TrolleyAllocation {
        trolleys,
        shelves,
        units,
        notes: form.notes.trim().to_string(),
    })
}

fn parse_count(field: &'static str, raw: &str) -> Result<Option<u32>, ValidationError> {
    match raw.trim() {
        "" => Ok(None),
        value => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ValidationError::new(field, format!("'{value}' is not a whole number"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResults {
    pub items: Vec<PickItem>,
    pub units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub completed_at: String,
    pub packing_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickPayload {
    Start(StartRecord),
    Labels(LabelsRecord),
    Pick(PickResults),
    Qc(QcResult),
    Trolley(TrolleyAllocation),
    Complete(CompletionRecord),
}

pub fn pick_results(collected: &CollectedData<PickFlow>) -> Option<&PickResults> {
    match collected.get(&PickStep::Pick) {
        Some(PickPayload::Pick(results)) => Some(results),
        _ => None,
    }
}

pub fn completion(collected: &CollectedData<PickFlow>) -> Option<&CompletionRecord> {
    match collected.get(&PickStep::Complete) {
        Some(PickPayload::Complete(record)) => Some(record),
        _ => None,
    }
}

#[derive(Debug)]
pub struct PickFlow;

pub type PickSession = WizardSession<PickFlow>;

static PICK_STEPS: &[StepDescriptor<PickStep>] = &[
    StepDescriptor {
        id: PickStep::Start,
        label: "Start",
        icon: "▶",
    },
    StepDescriptor {
        id: PickStep::Labels,
        label: "Labels",
        icon: "🏷",
    },
    StepDescriptor {
        id: PickStep::Pick,
        label: "Pick",
        icon: "✋",
    },
    StepDescriptor {
        id: PickStep::Qc,
        label: "QC",
        icon: "✔",
    },
    StepDescriptor {
        id: PickStep::Trolley,
        label: "Trolley",
        icon: "🛒",
    },
    StepDescriptor {
        id: PickStep::Complete,
        label: "Complete",
        icon: "★",
    },
];

impl WizardFlow for PickFlow {
    type Target = PickList;
    type Step = PickStep;
    type Payload = PickPayload;

    fn registry() -> &'static [StepDescriptor<PickStep>] {
        PICK_STEPS
    }
}
