//! License availability menu.
//!
//! Joins the tenant's subscribed pools with the reference table and numbers
//! the result for the operator.

use serde::Deserialize;

use crate::constants;
use crate::core::graph::Directory;
use crate::core::reference::ReferenceTable;
use crate::error::DirectoryError;
use crate::state::{MenuEntry, SubscribedSku};

/// What to do with pools missing from the reference table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedSkuPolicy {
    /// List them under their part number.
    #[default]
    Show,
    /// Leave them out of the menu and report them as skipped.
    Skip,
}

/// The numbered license menu of one run.
#[derive(Clone, Debug, Default)]
pub struct SkuMenu {
    pub entries: Vec<MenuEntry>,
    /// User pools in fetch order, parallel to `entries`.
    pub skus: Vec<SubscribedSku>,
    /// Pools left out because they are not in the reference table.
    pub skipped: Vec<SubscribedSku>,
}

impl SkuMenu {
    /// Builds the menu from a snapshot of subscribed pools.
    ///
    /// Only pools assignable to users are kept. Sequence numbers run from 1
    /// over the entries actually listed, in fetch order.
    #[must_use]
    pub fn build(
        skus: Vec<SubscribedSku>,
        table: &ReferenceTable,
        policy: UnmappedSkuPolicy,
    ) -> Self {
        let mut menu = Self::default();
        for sku in skus {
            if !sku.applies_to.eq_ignore_ascii_case(constants::APPLIES_TO_USER) {
                log::debug!("Skipping {} (applies to {})", sku.sku_part_number, sku.applies_to);
                continue;
            }

            let (friendly_name, mapped) = match table.by_product_id(&sku.sku_id) {
                Some(entry) => (entry.friendly_name.clone(), true),
                None if policy == UnmappedSkuPolicy::Skip => {
                    menu.skipped.push(sku);
                    continue;
                }
                None => (raw_name(&sku), false),
            };

            menu.entries.push(MenuEntry {
                sequence: menu.entries.len() + 1,
                friendly_name,
                available_seats: sku.available_seats(),
                sku_id: sku.sku_id.clone(),
                mapped,
            });
            menu.skus.push(sku);
        }
        menu
    }

    /// Entry for a 1-based sequence number.
    #[must_use]
    pub fn entry(&self, sequence: usize) -> Option<(&MenuEntry, &SubscribedSku)> {
        let idx = sequence.checked_sub(1)?;
        Some((self.entries.get(idx)?, self.skus.get(idx)?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Menu lines, including a note for skipped pools.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![constants::MSG_MENU_HEADER.to_string()];
        lines.extend(self.entries.iter().map(ToString::to_string));
        if !self.skipped.is_empty() {
            let names: Vec<String> = self.skipped.iter().map(raw_name).collect();
            lines.push(format!(
                "Skipped {} license(s) not in the reference table: {}",
                self.skipped.len(),
                names.join(", ")
            ));
        }
        lines
    }
}

/// Fetches the tenant's pools and builds the menu.
///
/// # Errors
///
/// Returns an error if the directory query fails.
pub fn load_menu(
    directory: &dyn Directory,
    table: &ReferenceTable,
    policy: UnmappedSkuPolicy,
) -> Result<SkuMenu, DirectoryError> {
    let skus = directory.list_subscribed_skus()?;
    log::info!("Directory reports {} subscribed SKUs", skus.len());
    Ok(SkuMenu::build(skus, table, policy))
}

fn raw_name(sku: &SubscribedSku) -> String {
    if sku.sku_part_number.is_empty() {
        sku.sku_id.clone()
    } else {
        sku.sku_part_number.clone()
    }
}
