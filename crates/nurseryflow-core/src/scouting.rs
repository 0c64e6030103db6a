use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wizard::{
    BranchStep, CollectedData, StepDescriptor, ValidationError, WizardFlow, WizardSession,
};

pub const EC_LOW_THRESHOLD: f64 = 0.5;
pub const PH_MIN: f64 = 5.5;
pub const PH_MAX: f64 = 6.5;
pub const MAX_APPLICATIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    pub id: String,
    pub batch_number: String,
    pub variety: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "batch")]
    pub batches: Vec<BatchRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutTarget {
    pub location: Location,
    pub scanned_batch: Option<String>,
}

impl ScoutTarget {
    /// Batches pre-selected as affected: the scanned batch when there is one,
    /// otherwise every batch at the location.
    pub fn default_batch_ids(&self) -> Vec<String> {
        match &self.scanned_batch {
            Some(batch_id) => vec![batch_id.clone()],
            None => self
                .location
                .batches
                .iter()
                .map(|batch| batch.id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::Critical];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Critical => "critical",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::Critical,
            Self::Critical => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    #[default]
    Issue,
    Reading,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Issue { reason: String, severity: Severity },
    Reading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub ec: Option<f64>,
    pub ph: Option<f64>,
    pub notes: String,
    pub batch_ids: Vec<String>,
}

impl LogEntry {
    pub fn mode(&self) -> EntryMode {
        match self.kind {
            EntryKind::Issue { .. } => EntryMode::Issue,
            EntryKind::Reading => EntryMode::Reading,
        }
    }

    pub fn needs_treatment(&self) -> bool {
        match &self.kind {
            EntryKind::Issue { severity, .. } => {
                matches!(severity, Severity::Medium | Severity::Critical)
            }
            EntryKind::Reading => {
                self.ec.is_some_and(|ec| ec < EC_LOW_THRESHOLD)
                    || self.ph.is_some_and(|ph| !(PH_MIN..=PH_MAX).contains(&ph))
            }
        }
    }

    pub fn suggested_variant(&self) -> Option<TreatmentVariant> {
        if self.ec.is_some_and(|ec| ec < EC_LOW_THRESHOLD) {
            return Some(TreatmentVariant::Feeding);
        }
        match self.kind {
            EntryKind::Issue { .. } => Some(TreatmentVariant::Chemical),
            EntryKind::Reading => None,
        }
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        match &self.kind {
            EntryKind::Issue { reason, severity } => {
                parts.push(format!("{reason} ({})", severity.label()));
            }
            EntryKind::Reading => parts.push("reading".to_string()),
        }
        if let Some(ec) = self.ec {
            parts.push(format!("EC {ec:.2}"));
        }
        if let Some(ph) = self.ph {
            parts.push(format!("pH {ph:.1}"));
        }
        parts.join(", ")
    }
}

pub fn needs_branch(collected: &CollectedData<ScoutFlow>) -> bool {
    logged_entry(collected).is_some_and(LogEntry::needs_treatment)
}

pub fn suggested_variant(collected: &CollectedData<ScoutFlow>) -> Option<TreatmentVariant> {
    logged_entry(collected).and_then(LogEntry::suggested_variant)
}

pub fn logged_entry(collected: &CollectedData<ScoutFlow>) -> Option<&LogEntry> {
    match collected.get(&ScoutStep::Log) {
        Some(ScoutPayload::Log(saved)) => Some(&saved.entry),
        _ => None,
    }
}

pub fn saved_log_id(collected: &CollectedData<ScoutFlow>) -> Option<&str> {
    match collected.get(&ScoutStep::Log) {
        Some(ScoutPayload::Log(saved)) => Some(saved.log_id.as_str()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogForm {
    pub mode: EntryMode,
    pub reason: String,
    pub severity: Severity,
    pub ec: String,
    pub ph: String,
    pub notes: String,
    pub batch_ids: Vec<String>,
}

impl LogForm {
    pub fn for_target(target: &ScoutTarget) -> Self {
        Self {
            batch_ids: target.default_batch_ids(),
            ..Self::default()
        }
    }

    /// Refills the form from a previously committed entry, used when the scout
    /// steps back to the log after saving it.
    pub fn from_entry(entry: &LogEntry) -> Self {
        let (mode, reason, severity) = match &entry.kind {
            EntryKind::Issue { reason, severity } => (EntryMode::Issue, reason.clone(), *severity),
            EntryKind::Reading => (EntryMode::Reading, String::new(), Severity::default()),
        };
        Self {
            mode,
            reason,
            severity,
            ec: entry.ec.map(|value| value.to_string()).unwrap_or_default(),
            ph: entry.ph.map(|value| value.to_string()).unwrap_or_default(),
            notes: entry.notes.clone(),
            batch_ids: entry.batch_ids.clone(),
        }
    }

    pub fn toggle_batch(&mut self, batch_id: &str) {
        if let Some(index) = self.batch_ids.iter().position(|id| id == batch_id) {
            self.batch_ids.remove(index);
        } else {
            self.batch_ids.push(batch_id.to_string());
        }
    }
}

pub fn validate_log(form: &LogForm, target: &ScoutTarget) -> Result<LogEntry, ValidationError> {
    let ec = parse_measure("ec", &form.ec)?;
    let ph = parse_measure("ph", &form.ph)?;

    let kind = match form.mode {
        EntryMode::Issue => {
            let reason = form.reason.trim();
            if reason.is_empty() {
                return Err(ValidationError::new("reason", "describe the issue"));
            }
            EntryKind::Issue {
                reason: reason.to_string(),
                severity: form.severity,
            }
        }
        EntryMode::Reading => {
            if ec.is_none() && ph.is_none() {
                return Err(ValidationError::new("ec", "enter an EC or pH reading"));
            }
            EntryKind::Reading
        }
    };

    if ec.is_some_and(|value| value < 0.0) {
        return Err(ValidationError::new("ec", "EC cannot be negative"));
    }
    if ph.is_some_and(|value| !(0.0..=14.0).contains(&value)) {
        return Err(ValidationError::new("ph", "pH must be between 0 and 14"));
    }

    let known = &target.location.batches;
    if let Some(unknown) = form
        .batch_ids
        .iter()
        .find(|id| !known.iter().any(|batch| &batch.id == *id))
    {
        return Err(ValidationError::new(
            "batches",
            format!("batch {unknown} is not at {}", target.location.name),
        ));
    }
    if !known.is_empty() && form.batch_ids.is_empty() {
        return Err(ValidationError::new(
            "batches",
            "select at least one affected batch",
        ));
    }

    Ok(LogEntry {
        kind,
        ec,
        ph,
        notes: form.notes.trim().to_string(),
        batch_ids: form.batch_ids.clone(),
    })
}

fn parse_measure(field: &'static str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ValidationError::new(
            field,
            format!("'{trimmed}' is not a number"),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentVariant {
    Chemical,
    Mechanical,
    Feeding,
}

impl TreatmentVariant {
    pub const ALL: [TreatmentVariant; 3] = [
        TreatmentVariant::Chemical,
        TreatmentVariant::Mechanical,
        TreatmentVariant::Feeding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Chemical => "chemical",
            Self::Mechanical => "mechanical",
            Self::Feeding => "feeding",
        }
    }
}

impl fmt::Display for TreatmentVariant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentPlan {
    pub variant: TreatmentVariant,
    pub product: Option<String>,
    pub rate: Option<f64>,
    pub unit: Option<String>,
    pub method: Option<String>,
    pub applications: u32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentForm {
    pub variant: Option<TreatmentVariant>,
    pub product: String,
    pub rate: String,
    pub unit: String,
    pub method: String,
    pub applications: String,
    pub notes: String,
}

impl Default for TreatmentForm {
    fn default() -> Self {
        Self {
            variant: None,
            product: String::new(),
            rate: String::new(),
            unit: String::new(),
            method: String::new(),
            applications: "1".to_string(),
            notes: String::new(),
        }
    }
}

impl TreatmentForm {
    pub fn with_suggestion(suggestion: Option<TreatmentVariant>) -> Self {
        Self {
            variant: suggestion,
            unit: match suggestion {
                Some(TreatmentVariant::Feeding) => "g/L".to_string(),
                Some(TreatmentVariant::Chemical) => "ml/L".to_string(),
                _ => String::new(),
            },
            ..Self::default()
        }
    }
}

pub fn validate_treatment(form: &TreatmentForm) -> Result<TreatmentPlan, ValidationError> {
    let Some(variant) = form.variant else {
        return Err(ValidationError::new("variant", "choose a treatment type"));
    };

    let product = non_empty(&form.product);
    let method = non_empty(&form.method);
    let unit = non_empty(&form.unit);

    let rate = match form.rate.trim() {
        "" => None,
        raw => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => return Err(ValidationError::new("rate", format!("'{raw}' is not a number"))),
        },
    };
    if rate.is_some_and(|value| value <= 0.0) {
        return Err(ValidationError::new("rate", "rate must be greater than zero"));
    }

    match variant {
        TreatmentVariant::Chemical | TreatmentVariant::Feeding if product.is_none() => {
            return Err(ValidationError::new("product", "enter the product applied"));
        }
        TreatmentVariant::Feeding if rate.is_none() => {
            return Err(ValidationError::new("rate", "feeding needs a rate"));
        }
        TreatmentVariant::Mechanical if method.is_none() => {
            return Err(ValidationError::new("method", "describe the method"));
        }
        _ => {}
    }

    let applications = match form.applications.trim() {
        "" => 1,
        raw => raw.parse::<u32>().map_err(|_| {
            ValidationError::new("applications", format!("'{raw}' is not a whole number"))
        })?,
    };
    if !(1..=MAX_APPLICATIONS).contains(&applications) {
        return Err(ValidationError::new(
            "applications",
            format!("applications must be between 1 and {MAX_APPLICATIONS}"),
        ));
    }

    Ok(TreatmentPlan {
        variant,
        product,
        rate,
        unit,
        method,
        applications,
        notes: form.notes.trim().to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScoutStep {
    Log,
    Treatment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedLog {
    pub log_id: String,
    pub entry: LogEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedTreatment {
    pub treatment_id: String,
    pub log_id: String,
    pub plan: TreatmentPlan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoutPayload {
    Log(SavedLog),
    Treatment(SavedTreatment),
}

#[derive(Debug)]
pub struct ScoutFlow;

pub type ScoutSession = WizardSession<ScoutFlow>;

static SCOUT_STEPS: &[StepDescriptor<ScoutStep>] = &[StepDescriptor {
    id: ScoutStep::Log,
    label: "Log",
    icon: "📝",
}];

static SCOUT_BRANCHES: &[BranchStep<ScoutStep>] = &[BranchStep {
    anchor: ScoutStep::Log,
    descriptor: StepDescriptor {
        id: ScoutStep::Treatment,
        label: "Treatment",
        icon: "💧",
    },
}];

impl WizardFlow for ScoutFlow {
    type Target = ScoutTarget;
    type Step = ScoutStep;
    type Payload = ScoutPayload;

    fn registry() -> &'static [StepDescriptor<ScoutStep>] {
        SCOUT_STEPS
    }

    fn branches() -> &'static [BranchStep<ScoutStep>] {
        SCOUT_BRANCHES
    }

    fn branch_applies(step: ScoutStep, collected: &CollectedData<Self>) -> bool {
        step == ScoutStep::Treatment && needs_branch(collected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn location(batches: usize) -> Location {
        Location {
            id: "loc-0001".to_string(),
            name: "Tunnel 3".to_string(),
            batches: (1..=batches)
                .map(|index| BatchRef {
                    id: format!("bat-000{index}"),
                    batch_number: format!("B24-{index:03}"),
                    variety: "Lavandula angustifolia".to_string(),
                    quantity: 120,
                })
                .collect(),
        }
    }

    fn target(batches: usize) -> ScoutTarget {
        ScoutTarget {
            location: location(batches),
            scanned_batch: None,
        }
    }

    fn issue(severity: Severity, ec: Option<f64>) -> LogEntry {
        LogEntry {
            kind: EntryKind::Issue {
                reason: "aphids".to_string(),
                severity,
            },
            ec,
            ph: None,
            notes: String::new(),
            batch_ids: Vec::new(),
        }
    }

    fn reading(ec: Option<f64>, ph: Option<f64>) -> LogEntry {
        LogEntry {
            kind: EntryKind::Reading,
            ec,
            ph,
            notes: String::new(),
            batch_ids: Vec::new(),
        }
    }

    fn collected_with(entry: LogEntry) -> CollectedData<ScoutFlow> {
        let mut collected = BTreeMap::new();
        collected.insert(
            ScoutStep::Log,
            ScoutPayload::Log(SavedLog {
                log_id: "log-0001".to_string(),
                entry,
            }),
        );
        collected
    }

    #[test]
    fn critical_issue_needs_treatment() {
        assert!(needs_branch(&collected_with(issue(Severity::Critical, None))));
        assert!(needs_branch(&collected_with(issue(Severity::Medium, None))));
        assert!(!needs_branch(&collected_with(issue(Severity::Low, None))));
    }

    #[test]
    fn reading_within_range_needs_no_treatment() {
        assert!(!needs_branch(&collected_with(reading(Some(2.0), Some(6.0)))));
        assert!(!needs_branch(&collected_with(reading(Some(0.5), Some(5.5)))));
        assert!(!needs_branch(&collected_with(reading(None, Some(6.5)))));
    }

    #[test]
    fn reading_out_of_range_needs_treatment() {
        assert!(needs_branch(&collected_with(reading(Some(0.49), None))));
        assert!(needs_branch(&collected_with(reading(None, Some(5.4)))));
        assert!(needs_branch(&collected_with(reading(Some(1.2), Some(7.1)))));
    }

    #[test]
    fn nothing_logged_means_no_branch() {
        assert!(!needs_branch(&BTreeMap::new()));
        assert_eq!(suggested_variant(&BTreeMap::new()), None);
    }

    #[test]
    fn low_ec_suggests_feeding_for_any_entry() {
        assert_eq!(
            suggested_variant(&collected_with(reading(Some(0.3), None))),
            Some(TreatmentVariant::Feeding)
        );
        assert_eq!(
            suggested_variant(&collected_with(issue(Severity::Low, Some(0.3)))),
            Some(TreatmentVariant::Feeding)
        );
    }

    #[test]
    fn issue_without_ec_suggests_chemical_and_reading_suggests_nothing() {
        assert_eq!(
            suggested_variant(&collected_with(issue(Severity::Medium, None))),
            Some(TreatmentVariant::Chemical)
        );
        assert_eq!(
            suggested_variant(&collected_with(reading(None, Some(7.2)))),
            None
        );
    }

    #[test]
    fn effective_steps_follow_logged_entry() {
        assert_eq!(
            ScoutFlow::effective_steps(&collected_with(issue(Severity::Medium, None))),
            vec![ScoutStep::Log, ScoutStep::Treatment]
        );
        assert_eq!(
            ScoutFlow::effective_steps(&collected_with(reading(Some(2.0), Some(6.0)))),
            vec![ScoutStep::Log]
        );
    }

    #[test]
    fn log_form_requires_reason_for_issues() {
        let form = LogForm::for_target(&target(3));
        let error = validate_log(&form, &target(3)).expect_err("missing reason");
        assert_eq!(error.field, "reason");
    }

    #[test]
    fn log_form_requires_a_measurement_for_readings() {
        let mut form = LogForm::for_target(&target(1));
        form.mode = EntryMode::Reading;
        let error = validate_log(&form, &target(1)).expect_err("missing reading");
        assert_eq!(error.field, "ec");

        form.ph = "6.1".to_string();
        let entry = validate_log(&form, &target(1)).expect("valid reading");
        assert_eq!(entry.ph, Some(6.1));
        assert_eq!(entry.ec, None);
    }

    #[test]
    fn log_form_rejects_out_of_bounds_measurements() {
        let mut form = LogForm::for_target(&target(1));
        form.mode = EntryMode::Reading;
        form.ec = "-1".to_string();
        assert_eq!(
            validate_log(&form, &target(1)).expect_err("negative ec").field,
            "ec"
        );

        form.ec = String::new();
        form.ph = "15".to_string();
        assert_eq!(
            validate_log(&form, &target(1)).expect_err("ph too high").field,
            "ph"
        );

        form.ph = "six".to_string();
        assert_eq!(
            validate_log(&form, &target(1)).expect_err("not a number").field,
            "ph"
        );
    }

    #[test]
    fn log_form_requires_batches_when_location_has_them() {
        let mut form = LogForm::for_target(&target(3));
        form.reason = "aphids".to_string();
        assert_eq!(form.batch_ids.len(), 3);

        form.batch_ids.clear();
        assert_eq!(
            validate_log(&form, &target(3)).expect_err("no batch").field,
            "batches"
        );

        let empty = target(0);
        let mut bare = LogForm::for_target(&empty);
        bare.reason = "weeds".to_string();
        assert!(validate_log(&bare, &empty).is_ok());
    }

    #[test]
    fn log_form_rejects_unknown_batches() {
        let mut form = LogForm::for_target(&target(2));
        form.reason = "aphids".to_string();
        form.batch_ids.push("bat-9999".to_string());
        let error = validate_log(&form, &target(2)).expect_err("unknown batch");
        assert!(error.message.contains("bat-9999"));
    }

    #[test]
    fn scanned_batch_is_the_only_default_selection() {
        let mut target = target(3);
        target.scanned_batch = Some("bat-0002".to_string());
        assert_eq!(target.default_batch_ids(), vec!["bat-0002".to_string()]);
    }

    #[test]
    fn log_form_round_trips_through_entry() {
        let mut form = LogForm::for_target(&target(2));
        form.reason = "aphids".to_string();
        form.severity = Severity::Critical;
        form.ec = "0.4".to_string();
        let entry = validate_log(&form, &target(2)).expect("valid");
        assert_eq!(LogForm::from_entry(&entry), form);
    }

    #[test]
    fn treatment_form_starts_from_suggestion() {
        let form = TreatmentForm::with_suggestion(Some(TreatmentVariant::Feeding));
        assert_eq!(form.variant, Some(TreatmentVariant::Feeding));
        assert_eq!(form.applications, "1");

        let error = validate_treatment(&TreatmentForm::with_suggestion(None))
            .expect_err("no variant");
        assert_eq!(error.field, "variant");
    }

    #[test]
    fn treatment_rules_per_variant() {
        let mut chemical = TreatmentForm::with_suggestion(Some(TreatmentVariant::Chemical));
        assert_eq!(validate_treatment(&chemical).expect_err("product").field, "product");
        chemical.product = "Pyrethrum".to_string();
        let plan = validate_treatment(&chemical).expect("chemical plan");
        assert_eq!(plan.applications, 1);
        assert_eq!(plan.rate, None);

        let mut feeding = TreatmentForm::with_suggestion(Some(TreatmentVariant::Feeding));
        feeding.product = "Osmocote".to_string();
        assert_eq!(validate_treatment(&feeding).expect_err("rate").field, "rate");
        feeding.rate = "0".to_string();
        assert_eq!(validate_treatment(&feeding).expect_err("zero rate").field, "rate");
        feeding.rate = "1.5".to_string();
        assert_eq!(validate_treatment(&feeding).expect("feeding").rate, Some(1.5));

        let mut mechanical = TreatmentForm::with_suggestion(Some(TreatmentVariant::Mechanical));
        assert_eq!(validate_treatment(&mechanical).expect_err("method").field, "method");
        mechanical.method = "hand removal".to_string();
        mechanical.applications = "11".to_string();
        assert_eq!(
            validate_treatment(&mechanical).expect_err("too many").field,
            "applications"
        );
        mechanical.applications = "3".to_string();
        assert_eq!(validate_treatment(&mechanical).expect("plan").applications, 3);
    }
}
