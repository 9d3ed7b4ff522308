//! # Envkeep Result Rendering (`commands::report`)
//!
//! File: cli/src/commands/report.rs
//!
//! Plain-text rendering of manager outcomes shared by several command groups.
//!
use crate::manager::{
    cleanup::CleanupReport, lifecycle::RestartOutcome, snapshots::RotationReport,
};

pub fn describe_restart(outcome: RestartOutcome) -> &'static str {
    match outcome {
        RestartOutcome::NotPresent => "no container to restart",
        RestartOutcome::Restarted => "container restarted",
        RestartOutcome::Recreated => "container recreated from the new image",
    }
}

pub fn render_cleanup(report: &CleanupReport) -> String {
    let mut out = String::new();
    if report.removed.is_empty() {
        out.push_str("Cleanup: nothing to remove.\n");
    } else {
        out.push_str(&format!("Cleanup removed {} path(s):\n", report.removed.len()));
        for path in &report.removed {
            out.push_str(&format!("  - {}\n", path));
        }
    }
    for skipped in &report.skipped {
        out.push_str(&format!(
            "  kept {} (excluded by {})\n",
            skipped.path, skipped.excluded_by
        ));
    }
    for (step, reason) in &report.step_failures {
        out.push_str(&format!("  warning: step '{}' failed: {}\n", step, reason));
    }
    out
}

pub fn print_cleanup(report: &CleanupReport) {
    print!("{}", render_cleanup(report));
}

pub fn render_rotation(report: &RotationReport) -> String {
    let mut out = String::new();
    if report.removed.is_empty() && report.failed.is_empty() {
        out.push_str("No snapshots deleted.\n");
    }
    for tag in &report.removed {
        out.push_str(&format!("Deleted {}\n", tag));
    }
    for (tag, reason) in &report.failed {
        out.push_str(&format!("Could not delete {}: {}\n", tag, reason));
    }
    out
}

pub fn print_rotation(report: &RotationReport) {
    print!("{}", render_rotation(report));
}
