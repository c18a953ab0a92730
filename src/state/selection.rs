//! Operator selections.

/// A product to take away from every target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovalSelection {
    pub friendly_name: String,
    pub product_id: String,
}

/// A product to give to every target, with the plans to switch off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentSelection {
    pub friendly_name: String,
    /// Free seats when the operator picked the product.
    pub available_seats: i64,
    pub product_id: String,
    /// Plan identifiers to disable, in the order they were chosen.
    pub disabled_plan_ids: Vec<String>,
}

/// Everything the operator asked for in one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selections {
    pub removals: Vec<RemovalSelection>,
    pub assignments: Vec<AssignmentSelection>,
}
