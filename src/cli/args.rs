//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};

use crate::core::targets::TargetMode;

/// skuctl - assign and remove Microsoft 365 licenses on users and groups
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["user", "user_list", "group", "group_list", "list_skus"])
))]
pub struct Args {
    /// Change licenses of a single user (user principal name)
    #[arg(long, value_name = "UPN")]
    pub user: Option<String>,

    /// Change licenses of every user in a CSV with a UserPrincipalName column
    #[arg(long, value_name = "PATH")]
    pub user_list: Option<PathBuf>,

    /// Change licenses of every member of a group (exact display name)
    #[arg(long, value_name = "NAME")]
    pub group: Option<String>,

    /// Change licenses of every member of the groups in a CSV with a DisplayName column
    #[arg(long, value_name = "PATH")]
    pub group_list: Option<PathBuf>,

    /// Show available licenses and exit
    #[arg(long)]
    pub list_skus: bool,

    /// License the group objects themselves instead of their members
    #[arg(long, conflicts_with_all = ["user", "user_list", "list_skus"])]
    pub group_object: bool,

    /// Print the license calls without issuing them
    #[arg(long)]
    pub dry_run: bool,

    /// License reference table (CSV)
    #[arg(long, value_name = "PATH", env = "SKUCTL_REFERENCE_TABLE")]
    pub reference_table: Option<PathBuf>,

    /// Configuration file (default: <config dir>/skuctl/config.toml)
    #[arg(long, value_name = "PATH", env = "SKUCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tenant id or domain to sign in to
    #[arg(long, env = "SKUCTL_TENANT")]
    pub tenant: Option<String>,

    /// Application (client) id used for device login
    #[arg(long, env = "SKUCTL_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Leave licenses missing from the reference table out of the menu
    #[arg(long)]
    pub skip_unmapped: bool,

    /// Do not open a browser for device login
    #[arg(long)]
    pub no_browser: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// The selected target mode, or `None` for `--list-skus`.
    #[must_use]
    pub fn target_mode(&self) -> Option<TargetMode> {
        if let Some(user) = &self.user {
            Some(TargetMode::User(user.clone()))
        } else if let Some(path) = &self.user_list {
            Some(TargetMode::UserList(path.clone()))
        } else if let Some(group) = &self.group {
            Some(TargetMode::Group(group.clone()))
        } else {
            self.group_list.clone().map(TargetMode::GroupList)
        }
    }

    /// Log filter for the chosen verbosity.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
