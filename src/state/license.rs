//! License catalogue types: reference table rows, subscribed pools and menu entries.

use serde::Deserialize;

/// One row of the license reference table.
///
/// Maps a product identifier to its friendly name and the service plans it
/// bundles. Plans keep the table's `"Friendly name (plan-id)"` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LicenseMappingEntry {
    /// Product (SKU) identifier.
    pub product_id: String,
    /// Human-friendly product name.
    pub friendly_name: String,
    /// Service plans in table order.
    pub service_plans: Vec<String>,
}

/// A service plan as reported by the directory for a subscribed SKU.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanInfo {
    pub service_plan_id: String,
    pub service_plan_name: String,
}

/// A license pool subscribed by the tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribedSku {
    /// Product identifier, matches [`LicenseMappingEntry::product_id`].
    pub sku_id: String,
    /// Short technical name (e.g. `SPE_E5`).
    pub sku_part_number: String,
    /// Principal type the pool applies to (`User` or `Company`).
    pub applies_to: String,
    /// Seats purchased.
    pub prepaid_seats: i64,
    /// Seats in use.
    pub consumed_seats: i64,
    /// Component plans as reported by the directory.
    pub service_plans: Vec<ServicePlanInfo>,
}

impl SubscribedSku {
    /// Seats still free. Negative when the pool is oversold.
    #[must_use]
    pub const fn available_seats(&self) -> i64 {
        self.prepaid_seats - self.consumed_seats
    }
}

/// A numbered line of the license menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    /// 1-based position, only meaningful within one rendering.
    pub sequence: usize,
    /// Reference table name, or the raw part number when unmapped.
    pub friendly_name: String,
    /// Free seats when the menu was built.
    pub available_seats: i64,
    /// Product identifier of the underlying pool.
    pub sku_id: String,
    /// Whether the pool was found in the reference table.
    pub mapped: bool,
}

impl std::fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] - {} ({} available)",
            self.sequence, self.friendly_name, self.available_seats
        )?;
        if !self.mapped {
            write!(f, " [not in reference table]")?;
        }
        Ok(())
    }
}
