//! Directory service access.
//!
//! [`Directory`] is the narrow surface the license workflow needs from the
//! remote directory. [`GraphClient`] implements it over Microsoft Graph with a
//! blocking HTTP client.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::core::session::Session;
use crate::error::DirectoryError;
use crate::state::{ServicePlanInfo, SubscribedSku};

/// A group as returned by a display-name lookup.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

/// A product to add, with the plans to leave disabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedLicense {
    pub sku_id: String,
    pub disabled_plans: Vec<String>,
}

/// Operations consumed from the remote directory.
pub trait Directory {
    /// Lists every license pool the tenant subscribes to.
    fn list_subscribed_skus(&self) -> Result<Vec<SubscribedSku>, DirectoryError>;

    /// Finds groups whose display name matches exactly.
    fn find_groups(&self, display_name: &str) -> Result<Vec<Group>, DirectoryError>;

    /// Lists the identifiers of a group's user members.
    fn list_group_members(&self, group_id: &str) -> Result<Vec<String>, DirectoryError>;

    /// Adds and removes licenses on a user.
    fn set_user_license(
        &self,
        user: &str,
        add: &[AddedLicense],
        remove: &[String],
    ) -> Result<(), DirectoryError>;

    /// Adds and removes licenses on a group (group-based licensing).
    fn set_group_license(
        &self,
        group_id: &str,
        add: &[AddedLicense],
        remove: &[String],
    ) -> Result<(), DirectoryError>;
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Page<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkuRecord {
    sku_id: String,
    #[serde(default)]
    sku_part_number: String,
    #[serde(default)]
    applies_to: String,
    #[serde(default)]
    prepaid_units: PrepaidUnits,
    #[serde(default)]
    consumed_units: i64,
    #[serde(default)]
    service_plans: Vec<ServicePlanInfo>,
}

#[derive(Deserialize, Default)]
struct PrepaidUnits {
    #[serde(default)]
    enabled: i64,
}

impl From<SkuRecord> for SubscribedSku {
    fn from(r: SkuRecord) -> Self {
        Self {
            sku_id: r.sku_id,
            sku_part_number: r.sku_part_number,
            applies_to: r.applies_to,
            prepaid_seats: r.prepaid_units.enabled,
            consumed_seats: r.consumed_units,
            service_plans: r.service_plans,
        }
    }
}

#[derive(Deserialize)]
struct MemberRecord {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignLicenseBody<'a> {
    add_licenses: &'a [AddedLicense],
    remove_licenses: &'a [String],
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// ── Graph client ────────────────────────────────────────────────────────────

/// Microsoft Graph implementation of [`Directory`].
pub struct GraphClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GraphClient {
    /// Creates a client that authenticates with the given session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, session: &Session) -> Result<Self, DirectoryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: session.access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<reqwest::blocking::Response, DirectoryError> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (status.canonical_reason().unwrap_or("").to_string(), text),
        };
        Err(DirectoryError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Fetches every page of a collection, following `@odata.nextLink`.
    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, DirectoryError> {
        let mut items = Vec::new();
        let mut request = self.http.get(self.url(path)).query(query);
        loop {
            let text = self.send(request)?.text()?;
            let page: Page<T> = serde_json::from_str(&text)?;
            items.extend(page.value);
            match page.next_link {
                Some(next) => {
                    log::debug!("Following {next}");
                    request = self.http.get(next);
                }
                None => return Ok(items),
            }
        }
    }

    fn assign(
        &self,
        path: &str,
        add: &[AddedLicense],
        remove: &[String],
    ) -> Result<(), DirectoryError> {
        let body = AssignLicenseBody {
            add_licenses: add,
            remove_licenses: remove,
        };
        self.send(self.http.post(self.url(path)).json(&body))?;
        Ok(())
    }
}

impl Directory for GraphClient {
    fn list_subscribed_skus(&self) -> Result<Vec<SubscribedSku>, DirectoryError> {
        let records: Vec<SkuRecord> = self.get_all("/subscribedSkus", &[])?;
        Ok(records.into_iter().map(SubscribedSku::from).collect())
    }

    fn find_groups(&self, display_name: &str) -> Result<Vec<Group>, DirectoryError> {
        let filter = group_filter(display_name);
        self.get_all(
            "/groups",
            &[("$filter", filter.as_str()), ("$select", "id,displayName")],
        )
    }

    fn list_group_members(&self, group_id: &str) -> Result<Vec<String>, DirectoryError> {
        let path = format!(
            "/groups/{}/members/microsoft.graph.user",
            urlencoding::encode(group_id)
        );
        let members: Vec<MemberRecord> = self.get_all(&path, &[("$select", "id")])?;
        Ok(members.into_iter().map(|m| m.id).collect())
    }

    fn set_user_license(
        &self,
        user: &str,
        add: &[AddedLicense],
        remove: &[String],
    ) -> Result<(), DirectoryError> {
        let path = format!("/users/{}/assignLicense", urlencoding::encode(user));
        self.assign(&path, add, remove)
    }

    fn set_group_license(
        &self,
        group_id: &str,
        add: &[AddedLicense],
        remove: &[String],
    ) -> Result<(), DirectoryError> {
        let path = format!("/groups/{}/assignLicense", urlencoding::encode(group_id));
        self.assign(&path, add, remove)
    }
}

/// OData filter matching a display name exactly. Single quotes are doubled.
fn group_filter(display_name: &str) -> String {
    format!("displayName eq '{}'", display_name.replace('\'', "''"))
}
