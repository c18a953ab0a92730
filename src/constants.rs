//! Application-wide constants and configuration values.
//!
//! This module defines the static values used throughout skuctl, including
//! directory endpoints, file layouts, prompt texts and operator messages.

use std::time::Duration;

// === Application Metadata ===

/// Application name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Path Configuration ===

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Name of the cached session file inside the cache directory.
pub const SESSION_FILE_NAME: &str = "session.json";
/// Default location of the license reference table, relative to the working directory.
pub const DEFAULT_REFERENCE_TABLE: &str = "licensing-service-plan-reference.csv";

// === Reference Table Layout ===

/// Column holding the product (SKU) identifier.
pub const COL_PRODUCT_ID: &str = "GUID";
/// Column holding the product friendly name.
pub const COL_PRODUCT_NAME: &str = "Product name";
/// Column holding the pipe-delimited service plan list.
pub const COL_SERVICE_PLANS: &str = "Service plans included (friendly names)";
/// Separator between service plans in the reference table.
pub const SERVICE_PLAN_SEPARATOR: char = '|';

// === Target List Layout ===

/// Header of the user list file.
pub const COL_USER_PRINCIPAL_NAME: &str = "UserPrincipalName";
/// Header of the group list file.
pub const COL_DISPLAY_NAME: &str = "DisplayName";

// === Directory Service ===

/// Microsoft Graph v1.0 endpoint.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
/// Microsoft identity platform authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
/// Tenant segment used when no tenant is configured.
pub const DEFAULT_TENANT: &str = "organizations";
/// Public client id of the Microsoft Graph command-line tools.
pub const DEFAULT_CLIENT_ID: &str = "14d82eec-204b-4c2f-b7e8-296a70dab67e";
/// Delegated permissions needed to modify licenses on users and groups.
pub const DEFAULT_SCOPES: [&str; 3] = [
    "User.ReadWrite.All",
    "Organization.Read.All",
    "Group.ReadWrite.All",
];
/// Resource prefix for fully-qualified Graph scopes.
pub const GRAPH_SCOPE_PREFIX: &str = "https://graph.microsoft.com/";
/// `appliesTo` value of SKUs that can be assigned to users.
pub const APPLIES_TO_USER: &str = "User";
/// Environment variable carrying a pre-issued access token.
pub const ENV_ACCESS_TOKEN: &str = "SKUCTL_ACCESS_TOKEN";
/// Grant type for polling the device code endpoint.
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Timeout for HTTP calls in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// Fallback polling interval for device login.
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Sessions expiring sooner than this are treated as expired.
pub const SESSION_EXPIRY_SLACK_SECS: u64 = 60;

// === Prompting ===

/// Separator between sequence numbers in operator input.
pub const SELECTION_SEPARATOR: char = ';';
/// Number of attempts for a prompt before the run aborts.
pub const MAX_PROMPT_ATTEMPTS: usize = 3;

pub const PROMPT_REMOVE: &str =
    "Licenses to REMOVE (e.g. 1;3), or press Enter to remove nothing";
pub const PROMPT_ADD: &str = "Licenses to ADD (e.g. 2;4), or press Enter to add nothing";
pub const PROMPT_DISABLE_PLANS: &str =
    "Service plans to DISABLE (e.g. 1;5), or press Enter to keep all enabled";
pub const PROMPT_CONFIRM_OVERRUN: &str = "Continue anyway? [y/N]";

// === Operator Messages ===

pub const MSG_MENU_HEADER: &str = "\nAvailable licenses:";
pub const MSG_NOTHING_SELECTED: &str = "Nothing selected to add or remove. Exiting.";
pub const MSG_DECLINED: &str = "Aborted: seat overrun not confirmed.";
pub const MSG_NO_PLANS: &str = "  (no service plans listed for this product)";
pub const MSG_SUMMARY_HEADER: &str = "\nSummary:";
pub const MSG_DRY_RUN: &str = "[dry-run] ";

// === Error Messages ===

pub const ERR_HTTP_CLIENT_BUILD_FAILED: &str = "Failed to build HTTP client";
pub const ERR_NETWORK_REQUEST_FAILED: &str = "Network request failed";
pub const ERR_INVALID_RESPONSE: &str = "Invalid response from directory";
