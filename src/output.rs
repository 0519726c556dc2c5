//! Terminal output for the CLI.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::ocm::{PolicyState, Target, VersionInfo};
use crate::upgrade::version;
use crate::upgrade::{ExistingUpgrade, ReconcileOutcome, ReconcilePlan, TargetVersion};

/// Print upgrade policies with their state.
pub fn print_policies(target: &Target, upgrades: &[ExistingUpgrade]) {
    println!();
    println!("{}", format!("Upgrade policies of {target}:").bold());
    println!("{}", "-".repeat(60));

    if upgrades.is_empty() {
        println!("  No upgrade policies");
        return;
    }

    println!(
        "  {:<36} {:<12} {:<10} {}",
        "ID".bold(),
        "VERSION".bold(),
        "STATE".bold(),
        "NEXT RUN".bold()
    );
    for upgrade in upgrades {
        println!(
            "  {:<36} {:<12} {:<10} {}",
            upgrade.id(),
            upgrade.version(),
            colored_state(upgrade.state()),
            format_next_run(upgrade.next_run())
        );
    }
}

/// Print the versions the installed version may move to.
pub fn print_versions(installed: &VersionInfo, candidates: &[VersionInfo]) {
    println!();
    println!(
        "{} {}",
        "Installed version:".bold(),
        display_version(installed)
    );

    if candidates.is_empty() {
        println!("  {} No upgrades available", "✓".green());
        return;
    }

    let sorted = sort_by_version(candidates);
    println!("{}", "Available upgrades:".bold());
    for (i, candidate) in sorted.iter().enumerate() {
        let label = if i + 1 == sorted.len() {
            "(latest)"
        } else {
            ""
        };
        println!("  {:<12} {}", display_version(candidate), label.dimmed());
    }
}

/// Print a read-only reconciliation plan.
pub fn print_plan(target: &Target, desired: &TargetVersion, plan: &ReconcilePlan) {
    println!();
    println!(
        "{}",
        format!("Upgrade plan for {target} to {desired}:").cyan().bold()
    );

    for upgrade in &plan.keep {
        println!(
            "  {} Keep policy {} ({}, {})",
            "✓".green(),
            upgrade.id(),
            upgrade.version(),
            upgrade.state()
        );
    }
    for upgrade in &plan.cancel {
        println!(
            "  {} Cancel policy {} ({}, {})",
            "✗".red(),
            upgrade.id(),
            upgrade.version(),
            format_next_run(upgrade.next_run())
        );
    }

    if plan.is_satisfied() {
        println!("  Upgrade to {desired} is already scheduled");
    } else {
        println!("  {} Schedule manual upgrade to {desired}", "+".green());
    }
    println!();
    println!("{}", "Dry run: no changes were made.".yellow());
}

/// Print the result of a reconciliation pass.
pub fn print_outcome(target: &Target, desired: &TargetVersion, outcome: &ReconcileOutcome) {
    println!();
    match outcome {
        ReconcileOutcome::AlreadyScheduled { kept, cancelled } => {
            print_cancelled(cancelled);
            let ids: Vec<&str> = kept.iter().map(ExistingUpgrade::id).collect();
            println!(
                "{} Upgrade of {target} to {desired} is already scheduled (policy {})",
                "✓".green(),
                ids.join(", ")
            );
        }
        ReconcileOutcome::Scheduled {
            policy,
            cancelled,
            acknowledged,
        } => {
            print_cancelled(cancelled);
            for gate in acknowledged {
                println!("  Acknowledged version gate {gate}");
            }
            println!(
                "{} Scheduled upgrade of {target} to {} (policy {}, next run {})",
                "✓".green(),
                policy.version.bold(),
                policy.id,
                format_next_run(policy.next_run)
            );
        }
    }
}

/// Print outstanding gates, if any.
pub fn print_gates(target: &Target, desired: &TargetVersion, description: Option<&str>) {
    match description {
        None => println!(
            "{} No version gates to acknowledge for {target} to {desired}",
            "✓".green()
        ),
        Some(text) => {
            println!("{}", text.trim_end());
            println!();
            println!(
                "Re-run upgrade with {} to acknowledge.",
                format!("--ack-for {}", desired.gate_prefix()).bold()
            );
        }
    }
}

fn print_cancelled(cancelled: &[String]) {
    for id in cancelled {
        println!("  Cancelled upgrade policy {id}");
    }
}

fn colored_state(state: PolicyState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        PolicyState::Started | PolicyState::Delayed => text.yellow(),
        PolicyState::Pending | PolicyState::Scheduled => text.cyan(),
        PolicyState::Completed => text.green(),
        PolicyState::Cancelled | PolicyState::Unknown => text.dimmed(),
    }
}

/// Order candidates oldest first. Unparseable versions sort before the rest.
fn sort_by_version(candidates: &[VersionInfo]) -> Vec<&VersionInfo> {
    let mut sorted: Vec<&VersionInfo> = candidates.iter().collect();
    sorted.sort_by_cached_key(|v| version::normalize(display_version(v)).ok());
    sorted
}

fn display_version(version: &VersionInfo) -> &str {
    if version.raw_id.is_empty() {
        &version.id
    } else {
        &version.raw_id
    }
}

pub fn format_next_run(next_run: Option<DateTime<Utc>>) -> String {
    next_run.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_next_run() {
        let t = Utc.with_ymd_and_hms(2023, 6, 9, 20, 5, 0).unwrap();
        assert_eq!(format_next_run(Some(t)), "2023-06-09 20:05 UTC");
        assert_eq!(format_next_run(None), "-");
    }

    #[test]
    fn test_sort_by_version_puts_latest_last() {
        let candidate = |raw: &str| VersionInfo {
            raw_id: raw.to_string(),
            ..Default::default()
        };
        let candidates = vec![
            candidate("4.15.0"),
            candidate("4.14.10"),
            candidate("4.14.9"),
            candidate("4.14.0-rc.1"),
        ];
        let order: Vec<&str> = sort_by_version(&candidates)
            .into_iter()
            .map(|v| v.raw_id.as_str())
            .collect();
        assert_eq!(order, vec!["4.14.0-rc.1", "4.14.9", "4.14.10", "4.15.0"]);
    }

    #[test]
    fn test_display_version_prefers_raw_id() {
        let mut version = VersionInfo {
            id: "openshift-v4.14.1".to_string(),
            raw_id: "4.14.1".to_string(),
            ..Default::default()
        };
        assert_eq!(display_version(&version), "4.14.1");
        version.raw_id.clear();
        assert_eq!(display_version(&version), "openshift-v4.14.1");
    }
}
