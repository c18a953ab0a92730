//! Command handlers.
//!
//! [`run`] wires the real terminal, session and Graph client together;
//! [`execute`] holds the workflow itself and is driven directly in tests.

use crate::cli::args::Args;
use crate::cli::prompt::{Prompter, TerminalPrompter};
use crate::config::AppConfig;
use crate::constants;
use crate::core::apply::{apply_selections, check_seats, summarize, ApplyReport};
use crate::core::graph::{Directory, GraphClient};
use crate::core::reference::ReferenceTable;
use crate::core::selection::collect_selections;
use crate::core::session::{
    establish_session, Authenticator, DeviceCodeAuthenticator, TokenAuthenticator,
};
use crate::core::sku::{load_menu, UnmappedSkuPolicy};
use crate::core::targets::{resolve_targets, TargetMode};
use crate::error::Result;

/// Options that shape one run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    pub unmapped: UnmappedSkuPolicy,
    pub group_objects: bool,
    pub dry_run: bool,
}

/// Runs one invocation against the live directory.
///
/// # Errors
///
/// Returns the first fatal error; per-target failures are only reported.
pub fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let table = ReferenceTable::load(&config.reference_table)?;

    let mut auth = authenticator(config)?;
    let session = establish_session(auth.as_mut(), &config.scopes)?;
    let directory = GraphClient::new(&config.graph_url, &session)?;

    let options = RunOptions {
        unmapped: config.unmapped_skus,
        group_objects: args.group_object,
        dry_run: args.dry_run,
    };
    let mut prompter = TerminalPrompter::new();
    execute(
        &directory,
        &mut prompter,
        &table,
        args.target_mode().as_ref(),
        options,
    )?;
    Ok(())
}

fn authenticator(config: &AppConfig) -> Result<Box<dyn Authenticator>> {
    if let Ok(token) = std::env::var(constants::ENV_ACCESS_TOKEN) {
        log::info!("Using access token from {}", constants::ENV_ACCESS_TOKEN);
        return Ok(Box::new(TokenAuthenticator::new(token)));
    }
    Ok(Box::new(DeviceCodeAuthenticator::new(
        &config.authority,
        &config.tenant,
        &config.client_id,
        config.open_browser,
    )?))
}

/// Shows the menu, collects selections and applies them to the targets.
///
/// With no target mode only the menu is shown. Returns `None` in that case,
/// otherwise the report of the license calls.
///
/// # Errors
///
/// Returns the first fatal error. Nothing is changed in the directory unless
/// every prompt and the seat check succeeded.
pub fn execute(
    directory: &dyn Directory,
    prompter: &mut dyn Prompter,
    table: &ReferenceTable,
    mode: Option<&TargetMode>,
    options: RunOptions,
) -> Result<Option<ApplyReport>> {
    let menu = load_menu(directory, table, options.unmapped)?;

    let Some(mode) = mode else {
        for line in menu.render() {
            prompter.say(&line);
        }
        return Ok(None);
    };

    let selections = collect_selections(prompter, &menu, table)?;
    let targets = resolve_targets(directory, mode, options.group_objects)?;
    check_seats(prompter, &targets, &selections)?;

    let report = apply_selections(directory, prompter, &targets, &selections, options.dry_run);
    for line in summarize(&report, &targets) {
        prompter.say(&line);
    }
    Ok(Some(report))
}
