//! License mutation.
//!
//! Every target gets its removals first, then its assignments, one directory
//! call per selected product. Calls are independent: a rejected call is
//! recorded and the run moves on.

use crate::cli::prompt::{confirm, Prompter};
use crate::constants;
use crate::core::graph::{AddedLicense, Directory};
use crate::error::{AppError, DirectoryError, SelectionError};
use crate::state::{Selections, Target, TargetSet};

/// Direction of a license call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

/// A license call the directory rejected.
#[derive(Debug)]
pub struct MutationError {
    pub target: Target,
    pub product: String,
    pub action: Action,
    pub error: DirectoryError,
}

impl std::fmt::Display for MutationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} on {}: {}",
            self.action, self.product, self.target, self.error
        )
    }
}

/// Result of applying selections to a target set.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Calls that succeeded (or would have, in a dry run).
    pub succeeded: usize,
    pub failures: Vec<MutationError>,
}

/// Warns about assignments that need more seats than are free.
///
/// Only list-derived target sets are checked. Each overrun must be confirmed;
/// the default answer declines.
///
/// # Errors
///
/// Returns [`AppError::Declined`] if the operator does not confirm an overrun.
pub fn check_seats(
    prompter: &mut dyn Prompter,
    targets: &TargetSet,
    selections: &Selections,
) -> Result<(), AppError> {
    if !targets.seat_check {
        return Ok(());
    }
    let demand = i64::try_from(targets.seat_demand).unwrap_or(i64::MAX);
    for assignment in &selections.assignments {
        if demand <= assignment.available_seats {
            continue;
        }
        prompter.warn(&format!(
            "{} needs {} seat(s) but only {} are available.",
            assignment.friendly_name, demand, assignment.available_seats
        ));
        let confirmed = confirm(prompter, constants::PROMPT_CONFIRM_OVERRUN)
            .map_err(SelectionError::from)?;
        if !confirmed {
            return Err(AppError::Declined);
        }
        log::warn!(
            "Operator accepted seat overrun for {} ({demand} > {})",
            assignment.friendly_name,
            assignment.available_seats
        );
    }
    Ok(())
}

/// Issues the license calls for every target.
pub fn apply_selections(
    directory: &dyn Directory,
    prompter: &mut dyn Prompter,
    targets: &TargetSet,
    selections: &Selections,
    dry_run: bool,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for target in &targets.targets {
        for removal in &selections.removals {
            let remove = [removal.product_id.clone()];
            let result = if dry_run {
                Ok(())
            } else {
                set_license(directory, target, &[], &remove)
            };
            record(
                prompter,
                &mut report,
                target,
                &removal.friendly_name,
                Action::Remove,
                dry_run,
                result,
            );
        }

        for assignment in &selections.assignments {
            let add = [AddedLicense {
                sku_id: assignment.product_id.clone(),
                disabled_plans: assignment.disabled_plan_ids.clone(),
            }];
            let result = if dry_run {
                Ok(())
            } else {
                set_license(directory, target, &add, &[])
            };
            record(
                prompter,
                &mut report,
                target,
                &assignment.friendly_name,
                Action::Add,
                dry_run,
                result,
            );
        }
    }

    report
}

fn set_license(
    directory: &dyn Directory,
    target: &Target,
    add: &[AddedLicense],
    remove: &[String],
) -> Result<(), DirectoryError> {
    match target {
        Target::User(user) => directory.set_user_license(user, add, remove),
        Target::Group { id, .. } => directory.set_group_license(id, add, remove),
    }
}

fn record(
    prompter: &mut dyn Prompter,
    report: &mut ApplyReport,
    target: &Target,
    product: &str,
    action: Action,
    dry_run: bool,
    result: Result<(), DirectoryError>,
) {
    let prefix = if dry_run { constants::MSG_DRY_RUN } else { "" };
    match result {
        Ok(()) => {
            prompter.say(&format!("{prefix}{target}: {action} {product}"));
            report.succeeded += 1;
        }
        Err(error) => {
            let failure = MutationError {
                target: target.clone(),
                product: product.to_string(),
                action,
                error,
            };
            log::error!("{failure}");
            prompter.warn(&format!("FAILED {failure}"));
            report.failures.push(failure);
        }
    }
}

/// Summary lines for the end of a run.
#[must_use]
pub fn summarize(report: &ApplyReport, targets: &TargetSet) -> Vec<String> {
    let mut lines = vec![
        constants::MSG_SUMMARY_HEADER.to_string(),
        format!("   Targets:   {}", targets.targets.len()),
        format!("   Succeeded: {}", report.succeeded),
        format!("   Failed:    {}", report.failures.len()),
    ];
    lines.extend(report.failures.iter().map(|f| format!("     - {f}")));
    if !targets.unresolved.is_empty() {
        lines.push(format!("   Unresolved groups: {}", targets.unresolved.len()));
        lines.extend(targets.unresolved.iter().map(|e| format!("     - {e}")));
    }
    lines
}
