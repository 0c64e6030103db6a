use std::env;
use std::fmt;
use std::path::Path;

use crate::config::{NurseryConfig, load_config, resolve_config_path};
use crate::ledger::FileLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pass,
    Fail,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub state: CheckState,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.state == CheckState::Fail)
    }

    pub fn summary(&self) -> String {
        let passed = self
            .checks
            .iter()
            .filter(|check| check.state == CheckState::Pass)
            .count();
        let failed = self.checks.len().saturating_sub(passed);
        format!("{passed} passed, {failed} failed")
    }
}

const CONFIG_DEPENDENT: &[&str] = &[
    "config parses and validates",
    "ledger path resolves",
    "ledger parses",
    "open pick lists",
];

pub fn run_doctor() -> DoctorReport {
    let mut checks = vec![check_os()];

    match resolve_config_path() {
        Ok(config_path) => checks.extend(run_doctor_for(&config_path).checks),
        Err(error) => {
            checks.push(fail_check("config path resolves", error.to_string()));
            push_skipped_checks(
                &mut checks,
                &["config file exists"],
                "config path could not be resolved",
            );
            push_skipped_checks(
                &mut checks,
                CONFIG_DEPENDENT,
                "config path could not be resolved",
            );
        }
    }

    DoctorReport { checks }
}

/// Config and ledger checks for an explicit config file.
pub fn run_doctor_for(config_path: &Path) -> DoctorReport {
    let mut checks = Vec::new();

    if !config_path.exists() {
        checks.push(fail_check(
            "config file exists",
            format!("expected at {}", config_path.display()),
        ));
        push_skipped_checks(
            &mut checks,
            &CONFIG_DEPENDENT[..],
            "config file is missing",
        );
        return DoctorReport { checks };
    }

    checks.push(pass_check(
        "config file exists",
        format!("found at {}", config_path.display()),
    ));

    match load_config(config_path) {
        Ok(config) => {
            checks.push(pass_check("config parses and validates", "config is valid"));
            checks.extend(check_ledger(&config));
        }
        Err(error) => {
            checks.push(fail_check("config parses and validates", error.to_string()));
            push_skipped_checks(&mut checks, &CONFIG_DEPENDENT[1..], "config is invalid");
        }
    }

    DoctorReport { checks }
}

fn check_os() -> DoctorCheck {
    match env::consts::OS {
        "macos" => pass_check("os is supported", "detected macOS"),
        "linux" => pass_check("os is supported", "detected Linux"),
        detected => fail_check(
            "os is supported",
            format!("detected {detected}, expected macOS or Linux"),
        ),
    }
}

fn check_ledger(config: &NurseryConfig) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();

    let path = match config.ledger_path() {
        Ok(path) => path,
        Err(error) => {
            checks.push(fail_check("ledger path resolves", error.to_string()));
            push_skipped_checks(&mut checks, &CONFIG_DEPENDENT[2..], "ledger path is unknown");
            return checks;
        }
    };
    checks.push(pass_check("ledger path resolves", path.display().to_string()));

    match FileLedger::new(path).check() {
        Ok(summary) => {
            checks.push(pass_check(
                "ledger parses",
                format!(
                    "{} location(s), {} scout log(s)",
                    summary.locations, summary.scout_logs
                ),
            ));
            checks.push(pass_check(
                "open pick lists",
                format!("{} open", summary.open_pick_lists),
            ));
        }
        Err(error) => {
            checks.push(fail_check("ledger parses", error.to_string()));
            push_skipped_checks(&mut checks, &CONFIG_DEPENDENT[3..], "ledger is unreadable");
        }
    }

    checks
}

fn pass_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Pass,
        details: details.into(),
    }
}

fn fail_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Fail,
        details: details.into(),
    }
}

fn skipped_check(name: &str, reason: &str) -> DoctorCheck {
    fail_check(name, format!("skipped because {reason}"))
}

fn push_skipped_checks(checks: &mut Vec<DoctorCheck>, names: &[&str], reason: &str) {
    checks.extend(
        names
            .iter()
            .copied()
            .map(|name| skipped_check(name, reason)),
    );
}
