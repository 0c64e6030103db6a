use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use nurseryflow_core::picking::{
    LabelsRecord, PickItem, PickItemStatus, PickList, PickListStatus, QcResult, TrolleyAllocation,
};
use nurseryflow_core::scouting::{BatchRef, Location};
use nurseryflow_core::store::{NurseryStore, PackingRecord, ScoutLogRecord, TreatmentRecord};

#[derive(Default)]
struct State {
    locations: Vec<Location>,
    pick_lists: Vec<PickList>,
    scout_logs: Vec<ScoutLogRecord>,
    treatments: Vec<TreatmentRecord>,
    packing: Vec<PackingRecord>,
}

/// In-memory store that records every write and fails the methods it is told to.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failures: Mutex<BTreeMap<&'static str, String>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn with_fixtures() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().expect("state lock");
            state.locations = vec![
                location("loc-0001", "Tunnel 3", 3),
                location("loc-0002", "Yard", 0),
            ];
            state.pick_lists = vec![pick_list("pl-0001", PickListStatus::Open)];
        }
        store
    }

    pub fn fail(&self, method: &'static str, message: &str) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(method, message.to_string());
    }

    #[allow(dead_code)]
    pub fn recover(&self, method: &'static str) {
        self.failures.lock().expect("failures lock").remove(method);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    #[allow(dead_code)]
    pub fn add_pick_list(&self, list: PickList) {
        self.state.lock().expect("state lock").pick_lists.push(list);
    }

    #[allow(dead_code)]
    pub fn scout_logs(&self) -> Vec<ScoutLogRecord> {
        self.state.lock().expect("state lock").scout_logs.clone()
    }

    #[allow(dead_code)]
    pub fn treatments(&self) -> Vec<TreatmentRecord> {
        self.state.lock().expect("state lock").treatments.clone()
    }

    #[allow(dead_code)]
    pub fn packing(&self) -> Vec<PackingRecord> {
        self.state.lock().expect("state lock").packing.clone()
    }

    #[allow(dead_code)]
    pub fn stored_pick_list(&self, id: &str) -> Option<PickList> {
        self.state
            .lock()
            .expect("state lock")
            .pick_lists
            .iter()
            .find(|list| list.id == id)
            .cloned()
    }

    fn enter(&self, method: &'static str) -> anyhow::Result<()> {
        self.calls.lock().expect("calls lock").push(method);
        match self.failures.lock().expect("failures lock").get(method) {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    fn with_list(&self, id: &str, apply: impl FnOnce(&mut PickList)) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("state lock");
        let Some(list) = state.pick_lists.iter_mut().find(|list| list.id == id) else {
            bail!("no pick list {id}");
        };
        apply(list);
        Ok(())
    }
}

impl NurseryStore for MemoryStore {
    fn locations(&self) -> anyhow::Result<Vec<Location>> {
        self.enter("locations")?;
        Ok(self.state.lock().expect("state lock").locations.clone())
    }

    fn pick_lists(&self) -> anyhow::Result<Vec<PickList>> {
        self.enter("pick_lists")?;
        Ok(self.state.lock().expect("state lock").pick_lists.clone())
    }

    fn load_pick_list(&self, id: &str) -> anyhow::Result<Option<PickList>> {
        self.enter("load_pick_list")?;
        Ok(self.stored_pick_list(id))
    }

    fn save_scout_log(&self, record: &ScoutLogRecord) -> anyhow::Result<String> {
        self.enter("save_scout_log")?;
        let mut state = self.state.lock().expect("state lock");
        if let Some(id) = &record.id {
            let Some(existing) = state
                .scout_logs
                .iter_mut()
                .find(|log| log.id.as_ref() == Some(id))
            else {
                bail!("no scout log {id}");
            };
            *existing = record.clone();
            return Ok(id.clone());
        }
        let id = format!("log-{:04}", state.scout_logs.len() + 1);
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        state.scout_logs.push(stored);
        Ok(id)
    }

    fn save_treatment(&self, record: &TreatmentRecord) -> anyhow::Result<String> {
        self.enter("save_treatment")?;
        let mut state = self.state.lock().expect("state lock");
        if let Some(existing) = state
            .treatments
            .iter_mut()
            .find(|treatment| treatment.log_id == record.log_id)
        {
            let id = existing.id.clone().unwrap_or_default();
            *existing = record.clone();
            existing.id = Some(id.clone());
            return Ok(id);
        }
        let id = format!("trt-{:04}", state.treatments.len() + 1);
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        state.treatments.push(stored);
        Ok(id)
    }

    fn start_pick_list(&self, id: &str, picker: &str, started_at: &str) -> anyhow::Result<()> {
        self.enter("start_pick_list")?;
        self.with_list(id, |list| {
            list.status = PickListStatus::InProgress;
            list.picker = Some(picker.to_string());
            list.started_at = Some(started_at.to_string());
        })
    }

    fn record_labels(&self, id: &str, labels: &LabelsRecord) -> anyhow::Result<()> {
        self.enter("record_labels")?;
        self.with_list(id, |list| list.labels = Some(labels.clone()))
    }

    fn save_pick_results(&self, id: &str, items: &[PickItem]) -> anyhow::Result<()> {
        self.enter("save_pick_results")?;
        self.with_list(id, |list| list.items = items.to_vec())
    }

    fn save_qc(&self, id: &str, qc: &QcResult) -> anyhow::Result<()> {
        self.enter("save_qc")?;
        self.with_list(id, |list| list.qc = Some(qc.clone()))
    }

    fn assign_trolleys(&self, id: &str, allocation: &TrolleyAllocation) -> anyhow::Result<()> {
        self.enter("assign_trolleys")?;
        self.with_list(id, |list| list.trolleys = Some(allocation.clone()))
    }

    fn complete_pick_list(&self, id: &str, completed_at: &str) -> anyhow::Result<()> {
        self.enter("complete_pick_list")?;
        self.with_list(id, |list| {
            list.status = PickListStatus::Completed;
            list.completed_at = Some(completed_at.to_string());
        })
    }

    fn update_packing(&self, record: &PackingRecord) -> anyhow::Result<()> {
        self.enter("update_packing")?;
        self.state
            .lock()
            .expect("state lock")
            .packing
            .push(record.clone());
        Ok(())
    }
}

pub fn location(id: &str, name: &str, batches: usize) -> Location {
    Location {
        id: id.to_string(),
        name: name.to_string(),
        batches: (1..=batches)
            .map(|index| BatchRef {
                id: format!("bat-{index:04}"),
                batch_number: format!("B24-{index:03}"),
                variety: "Lavandula angustifolia".to_string(),
                quantity: 100,
            })
            .collect(),
    }
}

#[allow(dead_code)]
pub fn pick_list(id: &str, status: PickListStatus) -> PickList {
    let item = |index: usize, quantity: u32| PickItem {
        id: format!("pi-{index:04}"),
        batch_id: format!("bat-{index:04}"),
        description: format!("Line {index}"),
        quantity,
        picked_quantity: 0,
        status: PickItemStatus::Pending,
        substitute_batch_id: None,
        short_reason: None,
    };
    PickList {
        id: id.to_string(),
        order_ref: "SO-1042".to_string(),
        customer: "Greenway Garden Centre".to_string(),
        status,
        picker: None,
        started_at: None,
        labels: None,
        qc: None,
        trolleys: None,
        completed_at: None,
        items: vec![item(1, 10), item(2, 6)],
    }
}
