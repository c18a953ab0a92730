//! License targets.

use crate::error::NotFoundError;

/// A principal whose licenses are changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A user, by object id or user principal name.
    User(String),
    /// A group object, for group-based licensing.
    Group { id: String, display_name: String },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::User(id) => write!(f, "{id}"),
            Target::Group { display_name, .. } => write!(f, "group '{display_name}'"),
        }
    }
}

/// The resolved targets of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    /// Targets in processing order.
    pub targets: Vec<Target>,
    /// Seats one assignment consumes across all targets.
    pub seat_demand: usize,
    /// Whether assignments are checked against free seats first.
    pub seat_check: bool,
    /// Groups from a list that did not resolve.
    pub unresolved: Vec<NotFoundError>,
}

impl TargetSet {
    /// Target set with one seat per target.
    #[must_use]
    pub fn from_users(targets: Vec<Target>, seat_check: bool) -> Self {
        Self {
            seat_demand: targets.len(),
            targets,
            seat_check,
            unresolved: Vec::new(),
        }
    }
}
