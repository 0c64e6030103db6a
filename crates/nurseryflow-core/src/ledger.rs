use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::picking::{
    LabelsRecord, PickItem, PickItemStatus, PickList, PickListStatus, QcResult, TrolleyAllocation,
};
use crate::scouting::{BatchRef, Location};
use crate::store::{NurseryStore, PackingRecord, ScoutLogRecord, TreatmentRecord};

const LEDGER_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LedgerFile {
    version: i64,
    #[serde(default, rename = "location")]
    locations: Vec<Location>,
    #[serde(default, rename = "pick_list")]
    pick_lists: Vec<PickList>,
    #[serde(default, rename = "scout_log")]
    scout_logs: Vec<ScoutLogRecord>,
    #[serde(default, rename = "treatment")]
    treatments: Vec<TreatmentRecord>,
    #[serde(default, rename = "packing")]
    packing: Vec<PackingRecord>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            locations: Vec::new(),
            pick_lists: Vec::new(),
            scout_logs: Vec::new(),
            treatments: Vec::new(),
            packing: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("could not resolve home directory for ledger path")]
    HomeDirectoryUnavailable,
    #[error("ledger not found at {path}; run `nurseryflow init`")]
    Missing { path: PathBuf },
    #[error("failed to read ledger at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ledger at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write ledger at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize ledger: {0}")]
    Serialize(toml::ser::Error),
    #[error("{message}")]
    InvalidSchema { message: String },
    #[error("pick list '{id}' does not exist")]
    UnknownPickList { id: String },
    #[error("pick list '{id}' is already completed")]
    PickListClosed { id: String },
    #[error("scout log '{id}' does not exist")]
    UnknownScoutLog { id: String },
}

pub fn default_ledger_path() -> Result<PathBuf, LedgerError> {
    let base_dirs = BaseDirs::new().ok_or(LedgerError::HomeDirectoryUnavailable)?;
    Ok(base_dirs
        .home_dir()
        .join(".local")
        .join("share")
        .join("nurseryflow")
        .join("ledger.toml"))
}

#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty ledger when none exists. Returns true when a file was written.
    pub fn ensure_exists(&self) -> Result<bool, LedgerError> {
        if self.path.exists() {
            return Ok(false);
        }
        write_ledger_file(&self.path, &LedgerFile::default())?;
        Ok(true)
    }

    /// Adds a small demo data set to an empty ledger. Returns false when the ledger
    /// already holds locations or pick lists.
    pub fn seed_demo(&self) -> Result<bool, LedgerError> {
        self.ensure_exists()?;
        self.update(|ledger| {
            if !ledger.locations.is_empty() || !ledger.pick_lists.is_empty() {
                return Ok(false);
            }
            ledger.locations = demo_locations();
            ledger.pick_lists = vec![demo_pick_list()];
            Ok(true)
        })
    }

    pub fn check(&self) -> Result<LedgerSummary, LedgerError> {
        let ledger = load_ledger_file(&self.path)?;
        Ok(LedgerSummary {
            locations: ledger.locations.len(),
            open_pick_lists: ledger
                .pick_lists
                .iter()
                .filter(|list| list.status != PickListStatus::Completed)
                .count(),
            scout_logs: ledger.scout_logs.len(),
        })
    }

    pub fn scout_logs(&self) -> Result<Vec<ScoutLogRecord>, LedgerError> {
        Ok(load_ledger_file(&self.path)?.scout_logs)
    }

    pub fn treatments(&self) -> Result<Vec<TreatmentRecord>, LedgerError> {
        Ok(load_ledger_file(&self.path)?.treatments)
    }

    pub fn packing(&self) -> Result<Vec<PackingRecord>, LedgerError> {
        Ok(load_ledger_file(&self.path)?.packing)
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut LedgerFile) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut ledger = load_ledger_file(&self.path)?;
        let value = apply(&mut ledger)?;
        write_ledger_file(&self.path, &ledger)?;
        Ok(value)
    }

    fn update_pick_list(
        &self,
        id: &str,
        apply: impl FnOnce(&mut PickList),
    ) -> Result<(), LedgerError> {
        self.update(|ledger| {
            let list = ledger
                .pick_lists
                .iter_mut()
                .find(|list| list.id == id)
                .ok_or_else(|| LedgerError::UnknownPickList { id: id.to_string() })?;
            if list.status == PickListStatus::Completed {
                return Err(LedgerError::PickListClosed { id: id.to_string() });
            }
            apply(list);
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSummary {
    pub locations: usize,
    pub open_pick_lists: usize,
    pub scout_logs: usize,
}

impl NurseryStore for FileLedger {
    fn locations(&self) -> anyhow::Result<Vec<Location>> {
        Ok(load_ledger_file(&self.path)?.locations)
    }

    fn pick_lists(&self) -> anyhow::Result<Vec<PickList>> {
        Ok(load_ledger_file(&self.path)?.pick_lists)
    }

    fn load_pick_list(&self, id: &str) -> anyhow::Result<Option<PickList>> {
        Ok(load_ledger_file(&self.path)?
            .pick_lists
            .into_iter()
            .find(|list| list.id == id))
    }

    fn save_scout_log(&self, record: &ScoutLogRecord) -> anyhow::Result<String> {
        let id = self.update(|ledger| match &record.id {
            Some(id) => {
                let existing = ledger
                    .scout_logs
                    .iter_mut()
                    .find(|log| log.id.as_deref() == Some(id.as_str()))
                    .ok_or_else(|| LedgerError::UnknownScoutLog { id: id.clone() })?;
                *existing = record.clone();
                Ok(id.clone())
            }
            None => {
                let id = next_id("log", ledger.scout_logs.iter().filter_map(|log| log.id.as_deref()));
                let mut stored = record.clone();
                stored.id = Some(id.clone());
                ledger.scout_logs.push(stored);
                Ok(id)
            }
        })?;
        Ok(id)
    }

    fn save_treatment(&self, record: &TreatmentRecord) -> anyhow::Result<String> {
        let id = self.update(|ledger| {
            if !ledger
                .scout_logs
                .iter()
                .any(|log| log.id.as_deref() == Some(record.log_id.as_str()))
            {
                return Err(LedgerError::UnknownScoutLog {
                    id: record.log_id.clone(),
                });
            }

            if let Some(existing) = ledger
                .treatments
                .iter_mut()
                .find(|treatment| treatment.log_id == record.log_id)
            {
                let id = existing.id.clone();
                *existing = record.clone();
                existing.id = id.clone();
                return Ok(id.unwrap_or_default());
            }

            let id = next_id(
                "trt",
                ledger
                    .treatments
                    .iter()
                    .filter_map(|treatment| treatment.id.as_deref()),
            );
            let mut stored = record.clone();
            stored.id = Some(id.clone());
            ledger.treatments.push(stored);
            Ok(id)
        })?;
        Ok(id)
    }

    fn start_pick_list(&self, id: &str, picker: &str, started_at: &str) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| {
            list.status = PickListStatus::InProgress;
            list.picker = Some(picker.to_string());
            list.started_at = Some(started_at.to_string());
        })?;
        Ok(())
    }

    fn record_labels(&self, id: &str, labels: &LabelsRecord) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| list.labels = Some(labels.clone()))?;
        Ok(())
    }

    fn save_pick_results(&self, id: &str, items: &[PickItem]) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| list.items = items.to_vec())?;
        Ok(())
    }

    fn save_qc(&self, id: &str, qc: &QcResult) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| list.qc = Some(qc.clone()))?;
        Ok(())
    }

    fn assign_trolleys(&self, id: &str, allocation: &TrolleyAllocation) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| list.trolleys = Some(allocation.clone()))?;
        Ok(())
    }

    fn complete_pick_list(&self, id: &str, completed_at: &str) -> anyhow::Result<()> {
        self.update_pick_list(id, |list| {
            list.status = PickListStatus::Completed;
            list.completed_at = Some(completed_at.to_string());
        })?;
        Ok(())
    }

    fn update_packing(&self, record: &PackingRecord) -> anyhow::Result<()> {
        self.update(|ledger| {
            match ledger
                .packing
                .iter_mut()
                .find(|packing| packing.pick_list_id == record.pick_list_id)
            {
                Some(existing) => *existing = record.clone(),
                None => ledger.packing.push(record.clone()),
            }
            Ok(())
        })?;
        Ok(())
    }
}

fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let highest = existing
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}-{:04}", highest + 1)
}

fn load_ledger_file(path: &Path) -> Result<LedgerFile, LedgerError> {
    if !path.exists() {
        return Err(LedgerError::Missing {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|source| LedgerError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed_value: toml::Value = toml::from_str(&raw).map_err(|source| LedgerError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_ledger_schema(&parsed_value)?;

    let parsed: LedgerFile = parsed_value
        .try_into()
        .map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        pick_lists = parsed.pick_lists.len(),
        scout_logs = parsed.scout_logs.len(),
        "loaded ledger"
    );
    Ok(parsed)
}

fn validate_ledger_schema(value: &toml::Value) -> Result<(), LedgerError> {
    let Some(version) = value.as_table().and_then(|root| root.get("version")) else {
        return Err(schema_error(
            "invalid ledger schema: missing required top-level field 'version'".to_string(),
        ));
    };

    match version.as_integer() {
        Some(LEDGER_VERSION) => Ok(()),
        Some(current) => Err(schema_error(format!(
            "invalid ledger schema: unsupported version (expected {LEDGER_VERSION}, found {current})"
        ))),
        None => Err(schema_error(
            "invalid ledger schema: unsupported version (expected integer)".to_string(),
        )),
    }
}

fn write_ledger_file(path: &Path, ledger: &LedgerFile) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LedgerError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = toml::to_string(ledger).map_err(LedgerError::Serialize)?;
    let temp_path = path.with_extension("toml.tmp");

    fs::write(&temp_path, serialized).map_err(|source| LedgerError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "wrote ledger");
    Ok(())
}

fn schema_error(message: String) -> LedgerError {
    LedgerError::InvalidSchema { message }
}

fn demo_locations() -> Vec<Location> {
    let batch = |id: &str, number: &str, variety: &str, quantity: u32| BatchRef {
        id: id.to_string(),
        batch_number: number.to_string(),
        variety: variety.to_string(),
        quantity,
    };
    vec![
        Location {
            id: "loc-0001".to_string(),
            name: "Tunnel 3".to_string(),
            batches: vec![
                batch("bat-0001", "B24-101", "Lavandula angustifolia 'Hidcote'", 240),
                batch("bat-0002", "B24-102", "Salvia nemorosa 'Caradonna'", 180),
                batch("bat-0003", "B24-117", "Nepeta x faassenii", 150),
            ],
        },
        Location {
            id: "loc-0002".to_string(),
            name: "Propagation house".to_string(),
            batches: Vec::new(),
        },
    ]
}

fn demo_pick_list() -> PickList {
    let item = |id: &str, batch_id: &str, description: &str, quantity: u32| PickItem {
        id: id.to_string(),
        batch_id: batch_id.to_string(),
        description: description.to_string(),
        quantity,
        picked_quantity: 0,
        status: PickItemStatus::Pending,
        substitute_batch_id: None,
        short_reason: None,
    };
    PickList {
        id: "pl-0001".to_string(),
        order_ref: "SO-1042".to_string(),
        customer: "Greenway Garden Centre".to_string(),
        status: PickListStatus::Open,
        picker: None,
        started_at: None,
        labels: None,
        qc: None,
        trolleys: None,
        completed_at: None,
        items: vec![
            item("pi-0001", "bat-0001", "Lavandula 'Hidcote' 2L", 48),
            item("pi-0002", "bat-0002", "Salvia 'Caradonna' 2L", 24),
            item("pi-0003", "bat-0003", "Nepeta x faassenii 3L", 12),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scouting::{EntryMode, Severity, TreatmentVariant};

    fn ledger_in(temp: &tempfile::TempDir) -> FileLedger {
        let ledger = FileLedger::new(temp.path().join("data").join("ledger.toml"));
        ledger.seed_demo().expect("seed demo");
        ledger
    }

    fn log_record(id: Option<String>, reason: &str) -> ScoutLogRecord {
        ScoutLogRecord {
            id,
            location_id: "loc-0001".to_string(),
            kind: EntryMode::Issue,
            reason: Some(reason.to_string()),
            severity: Some(Severity::Medium),
            ec: None,
            ph: None,
            notes: String::new(),
            batch_ids: vec!["bat-0001".to_string()],
            logged_by: "Sam".to_string(),
            logged_at: "2026-10-16T08:00:00Z".to_string(),
        }
    }

    fn treatment_record(log_id: &str, product: &str) -> TreatmentRecord {
        TreatmentRecord {
            id: None,
            log_id: log_id.to_string(),
            variant: TreatmentVariant::Chemical,
            product: Some(product.to_string()),
            rate: Some(2.5),
            unit: Some("ml/L".to_string()),
            method: None,
            applications: 2,
            notes: String::new(),
            recorded_at: "2026-10-16T08:05:00Z".to_string(),
        }
    }

    #[test]
    fn missing_ledger_reports_init_hint() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = FileLedger::new(temp.path().join("ledger.toml"));
        let error = ledger.locations().expect_err("missing ledger");
        assert!(error.to_string().contains("nurseryflow init"));
    }

    #[test]
    fn seed_demo_only_fills_an_empty_ledger() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        assert!(!ledger.seed_demo().expect("second seed"));

        let summary = ledger.check().expect("summary");
        assert_eq!(summary.locations, 2);
        assert_eq!(summary.open_pick_lists, 1);
        assert_eq!(ledger.locations().expect("locations")[0].batches.len(), 3);
    }

    #[test]
    fn scout_log_is_created_then_updated_in_place() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);

        let id = ledger
            .save_scout_log(&log_record(None, "aphids"))
            .expect("create");
        assert_eq!(id, "log-0001");

        let again = ledger
            .save_scout_log(&log_record(Some(id.clone()), "thrips"))
            .expect("update");
        assert_eq!(again, id);

        let logs = ledger.scout_logs().expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].reason.as_deref(), Some("thrips"));
    }

    #[test]
    fn updating_unknown_scout_log_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        let error = ledger
            .save_scout_log(&log_record(Some("log-0042".to_string()), "aphids"))
            .expect_err("unknown log");
        assert!(error.to_string().contains("log-0042"));
    }

    #[test]
    fn treatment_upserts_by_log_id() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        let log_id = ledger
            .save_scout_log(&log_record(None, "aphids"))
            .expect("log");

        let first = ledger
            .save_treatment(&treatment_record(&log_id, "Pyrethrum"))
            .expect("first");
        let second = ledger
            .save_treatment(&treatment_record(&log_id, "Neem oil"))
            .expect("second");

        assert_eq!(first, "trt-0001");
        assert_eq!(second, first);
        let treatments = ledger.treatments().expect("treatments");
        assert_eq!(treatments.len(), 1);
        assert_eq!(treatments[0].product.as_deref(), Some("Neem oil"));
    }

    #[test]
    fn treatment_for_unknown_log_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        assert!(
            ledger
                .save_treatment(&treatment_record("log-0009", "Pyrethrum"))
                .is_err()
        );
    }

    #[test]
    fn pick_list_lifecycle_round_trips_through_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);

        ledger
            .start_pick_list("pl-0001", "Sam", "2026-10-16T08:00:00Z")
            .expect("start");
        ledger
            .record_labels("pl-0001", &LabelsRecord::for_items(true, 2, 3))
            .expect("labels");
        let mut items = ledger
            .load_pick_list("pl-0001")
            .expect("load")
            .expect("exists")
            .items;
        for item in &mut items {
            item.mark_picked();
        }
        ledger.save_pick_results("pl-0001", &items).expect("items");
        ledger
            .complete_pick_list("pl-0001", "2026-10-16T09:00:00Z")
            .expect("complete");

        let list = ledger
            .load_pick_list("pl-0001")
            .expect("reload")
            .expect("exists");
        assert_eq!(list.status, PickListStatus::Completed);
        assert_eq!(list.labels.as_ref().map(|labels| labels.labels), Some(6));
        assert_eq!(list.committed_steps(), 4);

        let error = ledger
            .start_pick_list("pl-0001", "Sam", "2026-10-16T10:00:00Z")
            .expect_err("closed");
        assert!(error.to_string().contains("already completed"));
    }

    #[test]
    fn unknown_pick_list_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        let error = ledger
            .save_qc(
                "pl-0404",
                &QcResult {
                    checks: Vec::new(),
                    overridden: false,
                    override_reason: None,
                },
            )
            .expect_err("unknown list");
        assert!(error.to_string().contains("pl-0404"));
    }

    #[test]
    fn packing_record_is_replaced_per_pick_list() {
        let temp = tempfile::tempdir().expect("temp dir");
        let ledger = ledger_in(&temp);
        let record = |trolleys| PackingRecord {
            pick_list_id: "pl-0001".to_string(),
            order_ref: "SO-1042".to_string(),
            trolleys,
            units: 84,
            packed_at: "2026-10-16T09:00:00Z".to_string(),
        };
        ledger.update_packing(&record(2)).expect("first");
        ledger.update_packing(&record(3)).expect("second");
        let packing = ledger.packing().expect("packing");
        assert_eq!(packing.len(), 1);
        assert_eq!(packing[0].trolleys, 3);
    }

    #[test]
    fn rejects_unsupported_version() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("ledger.toml");
        fs::write(&path, "version = 2\n").expect("write ledger");
        let error = FileLedger::new(&path).check().expect_err("bad version");
        assert!(error.to_string().contains("unsupported version"));
    }

    #[test]
    fn rejects_missing_version() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("ledger.toml");
        fs::write(&path, "[[location]]\nid = \"loc-1\"\nname = \"A\"\n").expect("write ledger");
        let error = FileLedger::new(&path).check().expect_err("no version");
        assert!(error.to_string().contains("missing required top-level field"));
    }

    #[test]
    fn next_id_continues_after_highest() {
        assert_eq!(next_id("log", ["log-0003", "log-0001", "x"].into_iter()), "log-0004");
        assert_eq!(next_id("trt", std::iter::empty()), "trt-0001");
    }
}
