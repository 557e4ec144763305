//! `extsync plan` — what the next pass would do.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use extsync_sync::pipeline::{self, PassPlan};

use super::Workspace;

/// Arguments for `extsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "operation")]
    operation: String,
    #[tabled(rename = "channel")]
    channel: String,
    #[tabled(rename = "extension")]
    extension: String,
}

impl PlanArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let ws = Workspace::load(config_path)?;
        let cached = ws.store.load_cached();
        let current = ws.store.discover_current();
        let planned = pipeline::prepare(&cached, &current, &ws.config.layout());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
            return Ok(());
        }
        print_table(&planned);
        Ok(())
    }
}

fn print_table(planned: &PassPlan) {
    if !planned.has_changes() {
        println!("Nothing to do.");
        return;
    }

    for change in &planned.changes {
        println!("{} {}", change.change, change.reference);
    }
    if planned.plan.is_empty() {
        println!("No backend operations; the snapshot will be updated.");
        return;
    }
    let rows: Vec<PlanRow> = planned
        .plan
        .iter()
        .enumerate()
        .map(|(i, step)| PlanRow {
            index: i + 1,
            operation: step.operation.to_string(),
            channel: step.channel_id().to_string(),
            extension: step.reference.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
