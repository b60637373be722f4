//! Plain-text rendering for the terminal.

use std::fmt::Write;

use reaper_core::ResourceCatalog;
use reaper_engine::{DeletionPlan, StateChange};
use reaper_ledger::{FinalOutcome, RunSummary};

/// Plan layers in execution order, one resource per line.
pub fn render_plan(plan: &DeletionPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "plan {} ({} resources)", plan.run_id(), plan.len());
    for (depth, layer) in plan.layers().iter().enumerate() {
        let _ = writeln!(out, "  layer {depth}:");
        for resource in layer {
            let label = ResourceCatalog::capability_for(resource.kind).label;
            let _ = writeln!(out, "    {resource}  ({label})");
        }
    }
    out
}

/// IAM actions the plan's delete calls need, plus discovery.
pub fn render_required_actions() -> String {
    let mut out = String::from("required IAM actions:\n");
    for action in ResourceCatalog::required_actions() {
        let _ = writeln!(out, "  {action}");
    }
    out
}

pub fn render_change(change: &StateChange) -> String {
    format!(
        "{} {:<9} -> {:<9} {}",
        change.at.strftime("%H:%M:%S"),
        change.from.to_string(),
        change.to.to_string(),
        change.resource
    )
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let state = summary
        .state
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let _ = writeln!(out, "run {}: {state}", summary.run_id);
    let _ = writeln!(
        out,
        "  succeeded {}, failed {}, skipped {}, unresolved {}",
        summary.succeeded, summary.failed, summary.skipped, summary.unresolved
    );

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "failures:");
        for failure in &summary.failures {
            let _ = writeln!(out, "  {}: {}", failure.resource, failure.reason);
        }
    }

    let skipped: Vec<_> = summary
        .resources
        .iter()
        .filter_map(|r| match &r.outcome {
            FinalOutcome::Skipped { blocked_by } => Some((&r.resource, blocked_by)),
            _ => None,
        })
        .collect();
    if !skipped.is_empty() {
        let _ = writeln!(out, "skipped:");
        for (resource, blocked_by) in skipped {
            let _ = writeln!(out, "  {resource} (blocked by {blocked_by})");
        }
    }
    out
}
