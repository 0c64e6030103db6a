use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "nurseryflow")]
#[command(bin_name = "nurseryflow")]
#[command(version)]
#[command(about = "Guided picking and scouting workflows for nursery staff")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Write a diagnostics log under ~/.config/nurseryflow/diagnostics"
    )]
    pub diagnostics: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Run environment, configuration and ledger checks")]
    Doctor,
    #[command(about = "List pick lists with their status and progress")]
    Lists,
    #[command(about = "Write a starter config and create the ledger")]
    Init {
        #[arg(long, help = "Operator name recorded on picks and scout logs")]
        operator: Option<String>,
        #[arg(long, help = "Seed demo locations and a pick list into an empty ledger")]
        demo: bool,
    },
}
