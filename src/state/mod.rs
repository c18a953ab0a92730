//! Data types shared across the license workflow.

mod license;
mod selection;
mod target;

pub use license::{LicenseMappingEntry, MenuEntry, ServicePlanInfo, SubscribedSku};
pub use selection::{AssignmentSelection, RemovalSelection, Selections};
pub use target::{Target, TargetSet};
