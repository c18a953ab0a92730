//! Operator selection of licenses to remove and add.

use crate::cli::prompt::{Prompter, Step};
use crate::constants;
use crate::core::reference::{parse_plan_id, ReferenceTable};
use crate::core::sku::SkuMenu;
use crate::error::{AppError, SelectionError};
use crate::state::{AssignmentSelection, MenuEntry, RemovalSelection, Selections, SubscribedSku};

/// Parses a `;`-separated list of 1-based sequence numbers.
///
/// Blank tokens are ignored and repeated numbers are kept once, in first-seen
/// order. An empty answer yields an empty list.
///
/// # Errors
///
/// Returns [`SelectionError::Invalid`] for a non-numeric token and
/// [`SelectionError::OutOfRange`] for a number outside `1..=max`.
pub fn parse_sequence_list(input: &str, max: usize) -> Result<Vec<usize>, SelectionError> {
    let mut picked = Vec::new();
    for token in input.split(constants::SELECTION_SEPARATOR).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        let value: usize = token
            .parse()
            .map_err(|_| SelectionError::Invalid(token.to_string()))?;
        if value == 0 || value > max {
            return Err(SelectionError::OutOfRange { value, max });
        }
        if !picked.contains(&value) {
            picked.push(value);
        }
    }
    Ok(picked)
}

/// Runs the removal, assignment and plan prompts against the menu.
///
/// All prompting finishes before anything is returned, so no mutation can
/// start on a partial selection.
///
/// # Errors
///
/// Returns [`AppError::NothingSelected`] when both lists are empty and
/// [`AppError::Selection`] when an answer cannot be resolved.
pub fn collect_selections(
    prompter: &mut dyn Prompter,
    menu: &SkuMenu,
    table: &ReferenceTable,
) -> Result<Selections, AppError> {
    for line in menu.render() {
        prompter.say(&line);
    }
    prompter.say("");

    let max = menu.len();
    let sequence_step = |question: &'static str| {
        Step::new(question, move |answer: &str| parse_sequence_list(answer, max))
    };
    let to_remove = sequence_step(constants::PROMPT_REMOVE).run(prompter)?;
    let to_add = sequence_step(constants::PROMPT_ADD).run(prompter)?;

    if to_remove.is_empty() && to_add.is_empty() {
        return Err(AppError::NothingSelected);
    }

    let mut selections = Selections::default();
    for seq in to_remove {
        let (entry, sku) = lookup(menu, seq)?;
        let product = resolve_product(entry, sku, table)?;
        selections.removals.push(RemovalSelection {
            friendly_name: entry.friendly_name.clone(),
            product_id: product.product_id,
        });
    }

    for seq in to_add {
        let (entry, sku) = lookup(menu, seq)?;
        let product = resolve_product(entry, sku, table)?;
        let disabled_plan_ids = choose_disabled_plans(prompter, entry, &product.plans)?;
        selections.assignments.push(AssignmentSelection {
            friendly_name: entry.friendly_name.clone(),
            available_seats: entry.available_seats,
            product_id: product.product_id,
            disabled_plan_ids,
        });
    }

    log::info!(
        "Selected {} removal(s) and {} assignment(s)",
        selections.removals.len(),
        selections.assignments.len()
    );
    Ok(selections)
}

/// Product identifier and plan list behind a menu entry.
struct ResolvedProduct {
    product_id: String,
    plans: Vec<String>,
}

fn lookup(menu: &SkuMenu, seq: usize) -> Result<(&MenuEntry, &SubscribedSku), SelectionError> {
    menu.entry(seq).ok_or(SelectionError::OutOfRange {
        value: seq,
        max: menu.len(),
    })
}

/// Mapped entries resolve through the reference table by name; unmapped ones
/// fall back to the directory's own identifiers and plan list.
fn resolve_product(
    entry: &MenuEntry,
    sku: &SubscribedSku,
    table: &ReferenceTable,
) -> Result<ResolvedProduct, SelectionError> {
    if !entry.mapped {
        return Ok(ResolvedProduct {
            product_id: sku.sku_id.clone(),
            plans: sku
                .service_plans
                .iter()
                .map(|p| format!("{} ({})", p.service_plan_name, p.service_plan_id))
                .collect(),
        });
    }
    let mapping = table
        .by_friendly_name(&entry.friendly_name)
        .ok_or_else(|| SelectionError::Unmapped(entry.friendly_name.clone()))?;
    Ok(ResolvedProduct {
        product_id: mapping.product_id.clone(),
        plans: mapping.service_plans.clone(),
    })
}

fn choose_disabled_plans(
    prompter: &mut dyn Prompter,
    entry: &MenuEntry,
    plans: &[String],
) -> Result<Vec<String>, SelectionError> {
    prompter.say(&format!("\nService plans in {}:", entry.friendly_name));
    if plans.is_empty() {
        prompter.say(constants::MSG_NO_PLANS);
        return Ok(Vec::new());
    }
    for (i, plan) in plans.iter().enumerate() {
        prompter.say(&format!("[{}] - {plan}", i + 1));
    }

    Step::new(constants::PROMPT_DISABLE_PLANS, |answer: &str| {
        parse_sequence_list(answer, plans.len())?
            .into_iter()
            .map(|n| parse_plan_id(&plans[n - 1]))
            .collect()
    })
    .run(prompter)
}
