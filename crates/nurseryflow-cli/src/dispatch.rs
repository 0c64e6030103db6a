use anyhow::{Context, Result};
use comfy_table::{Cell, ContentArrangement, Table};
use nurseryflow_app::{App, load_ready_config};
use nurseryflow_core::config::{NurseryConfig, load_config, resolve_config_path, write_config};
use nurseryflow_core::doctor::{CheckState, DoctorReport, run_doctor};
use nurseryflow_core::ledger::FileLedger;
use nurseryflow_core::picking::{PickFlow, PickList};
use nurseryflow_core::wizard::WizardFlow;
use nurseryflow_tui::{RunContext, UiExit};
use tracing::info;

use crate::cli::{Cli, Command};

const FALLBACK_OPERATOR: &str = "operator";

pub fn run_with_deps(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Doctor) => run_doctor_command(),
        Some(Command::Lists) => run_lists_command(),
        Some(Command::Init { operator, demo }) => run_init_command(operator.as_deref(), demo),
        None => run_root_command(),
    }
}

fn run_root_command() -> Result<()> {
    let config = load_ready_config()?;
    let ledger_path = config.ledger_path()?;
    let ledger = FileLedger::new(ledger_path.clone());
    ledger.check()?;

    let app = App::new(&ledger);
    let context = RunContext {
        ledger_path,
        operator: config.operator.name.clone(),
    };
    let exit = nurseryflow_tui::run_root(&app, &context)?;
    if exit == UiExit::Canceled {
        info!("terminal UI canceled");
    }

    Ok(())
}

fn run_doctor_command() -> Result<()> {
    let report = run_doctor();
    print_doctor_report(&report);
    Ok(())
}

fn print_doctor_report(report: &DoctorReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Details"]);

    for check in &report.checks {
        let status = match check.state {
            CheckState::Pass => "PASS",
            CheckState::Fail => "FAIL",
        };

        table.add_row(vec![
            Cell::new(check.name.as_str()),
            Cell::new(status),
            Cell::new(check.details.as_str()),
        ]);
    }

    println!("{table}");
    println!("{}", report.summary());
}

fn run_lists_command() -> Result<()> {
    let config = load_ready_config()?;
    let ledger = FileLedger::new(config.ledger_path()?);
    let lists = App::new(&ledger).pick_lists()?;

    if lists.is_empty() {
        println!("No pick lists in {}", ledger.path().display());
        return Ok(());
    }

    print_pick_lists(&lists);
    Ok(())
}

fn print_pick_lists(lists: &[PickList]) {
    let total_steps = PickFlow::registry().len();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID", "Order", "Customer", "Status", "Picker", "Lines", "Progress",
    ]);

    for list in lists {
        table.add_row(vec![
            Cell::new(list.id.as_str()),
            Cell::new(list.order_ref.as_str()),
            Cell::new(list.customer.as_str()),
            Cell::new(list.status.label()),
            Cell::new(list.picker.as_deref().unwrap_or("-")),
            Cell::new(list.items.len()),
            Cell::new(format!("{}/{total_steps}", list.committed_steps())),
        ]);
    }

    println!("{table}");
}

fn run_init_command(operator: Option<&str>, demo: bool) -> Result<()> {
    let config_path = resolve_config_path().context("failed to resolve config path")?;

    let config = if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        load_config(&config_path)?
    } else {
        let config = NurseryConfig::starter(&operator_name(operator));
        write_config(&config_path, &config)?;
        println!("Wrote starter config to {}", config_path.display());
        config
    };

    let ledger = FileLedger::new(config.ledger_path()?);
    if ledger.ensure_exists()? {
        println!("Created ledger at {}", ledger.path().display());
    } else {
        println!("Ledger already exists at {}", ledger.path().display());
    }

    if demo {
        if ledger.seed_demo()? {
            println!("Seeded demo locations and pick list");
        } else {
            println!("Ledger already holds data; demo seed skipped");
        }
    }

    Ok(())
}

fn operator_name(explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var("USER")
                .ok()
                .filter(|name| !name.trim().is_empty())
        })
        .unwrap_or_else(|| FALLBACK_OPERATOR.to_string())
}
