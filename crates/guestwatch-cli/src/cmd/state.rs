use crate::output::{print_json, print_table};
use anyhow::Context;
use guestwatch_core::state::RunState;
use guestwatch_core::GuestwatchError;
use std::path::Path;

const RECENT_RUNS: usize = 10;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = match RunState::load(root) {
        Ok(s) => s,
        Err(GuestwatchError::NotInitialized) => {
            if json {
                return print_json(&serde_json::Value::Null);
            }
            println!("No runs recorded yet.");
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to load state"),
    };

    if json {
        return print_json(&state);
    }

    println!("Last checked:    {}", state.last_checked_at.to_rfc3339());
    println!("Orders alerted:  {}", state.alerted_order_ids.len());
    println!("Runs recorded:   {}", state.runs.len());

    if state.runs.is_empty() {
        return Ok(());
    }

    println!();
    let rows = state
        .runs
        .iter()
        .rev()
        .take(RECENT_RUNS)
        .map(|r| {
            vec![
                r.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.fetched.to_string(),
                r.qualifying.to_string(),
                r.new.to_string(),
                r.notified.to_string(),
                format!("{}/{}", r.deliveries_ok, r.deliveries_ok + r.deliveries_failed),
            ]
        })
        .collect();
    print_table(
        &["STARTED (UTC)", "FETCHED", "QUALIFYING", "NEW", "NOTIFIED", "SENT"],
        rows,
    );
    Ok(())
}
