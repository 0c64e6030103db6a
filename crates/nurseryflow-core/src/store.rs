use serde::{Deserialize, Serialize};

use crate::picking::{LabelsRecord, PickItem, PickList, QcResult, TrolleyAllocation};
use crate::scouting::{EntryKind, EntryMode, LogEntry, Location, Severity, TreatmentPlan, TreatmentVariant};

/// Persistence port consumed by the wizards. Every write is a single call that
/// either succeeds or leaves the store as it was.
pub trait NurseryStore {
    fn locations(&self) -> anyhow::Result<Vec<Location>>;
    fn pick_lists(&self) -> anyhow::Result<Vec<PickList>>;
    fn load_pick_list(&self, id: &str) -> anyhow::Result<Option<PickList>>;

    /// Creates the log when `record.id` is `None`, otherwise replaces it.
    fn save_scout_log(&self, record: &ScoutLogRecord) -> anyhow::Result<String>;
    /// Upserts by `record.log_id`; a log has at most one treatment.
    fn save_treatment(&self, record: &TreatmentRecord) -> anyhow::Result<String>;

    fn start_pick_list(&self, id: &str, picker: &str, started_at: &str) -> anyhow::Result<()>;
    fn record_labels(&self, id: &str, labels: &LabelsRecord) -> anyhow::Result<()>;
    fn save_pick_results(&self, id: &str, items: &[PickItem]) -> anyhow::Result<()>;
    fn save_qc(&self, id: &str, qc: &QcResult) -> anyhow::Result<()>;
    fn assign_trolleys(&self, id: &str, allocation: &TrolleyAllocation) -> anyhow::Result<()>;
    fn complete_pick_list(&self, id: &str, completed_at: &str) -> anyhow::Result<()>;
    fn update_packing(&self, record: &PackingRecord) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutLogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location_id: String,
    pub kind: EntryMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub batch_ids: Vec<String>,
    pub logged_by: String,
    pub logged_at: String,
}

impl ScoutLogRecord {
    pub fn from_entry(
        id: Option<String>,
        location_id: &str,
        entry: &LogEntry,
        logged_by: &str,
        logged_at: String,
    ) -> Self {
        let (reason, severity) = match &entry.kind {
            EntryKind::Issue { reason, severity } => (Some(reason.clone()), Some(*severity)),
            EntryKind::Reading => (None, None),
        };
        Self {
            id,
            location_id: location_id.to_string(),
            kind: entry.mode(),
            reason,
            severity,
            ec: entry.ec,
            ph: entry.ph,
            notes: entry.notes.clone(),
            batch_ids: entry.batch_ids.clone(),
            logged_by: logged_by.to_string(),
            logged_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub log_id: String,
    pub variant: TreatmentVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub applications: u32,
    #[serde(default)]
    pub notes: String,
    pub recorded_at: String,
}

impl TreatmentRecord {
    pub fn from_plan(log_id: &str, plan: &TreatmentPlan, recorded_at: String) -> Self {
        Self {
            id: None,
            log_id: log_id.to_string(),
            variant: plan.variant,
            product: plan.product.clone(),
            rate: plan.rate,
            unit: plan.unit.clone(),
            method: plan.method.clone(),
            applications: plan.applications,
            notes: plan.notes.clone(),
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingRecord {
    pub pick_list_id: String,
    pub order_ref: String,
    pub trolleys: u32,
    pub units: u32,
    pub packed_at: String,
}
