//! Target resolution for the four input modes.

use std::path::{Path, PathBuf};

use crate::constants;
use crate::core::graph::{Directory, Group};
use crate::core::reference::read_column;
use crate::error::{AppError, NotFoundError};
use crate::state::{Target, TargetSet};

/// Where the targets of a run come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetMode {
    /// One user principal name.
    User(String),
    /// A CSV of user principal names.
    UserList(PathBuf),
    /// One group display name.
    Group(String),
    /// A CSV of group display names.
    GroupList(PathBuf),
}

impl TargetMode {
    /// List modes check seat availability before assigning.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::UserList(_) | Self::GroupList(_))
    }
}

/// Resolves a mode into concrete targets.
///
/// Group members are listed group by group and not deduplicated. With
/// `group_objects` set, groups are licensed themselves instead of their
/// members, and each group demands one seat per member.
///
/// For a group list, a group that does not resolve is recorded in
/// [`TargetSet::unresolved`] and the remaining groups are still processed.
///
/// # Errors
///
/// Returns an error if a list file cannot be read, a single group does not
/// resolve, no group of a list resolves, or a directory query fails.
pub fn resolve_targets(
    directory: &dyn Directory,
    mode: &TargetMode,
    group_objects: bool,
) -> Result<TargetSet, AppError> {
    let seat_check = mode.is_list();
    match mode {
        TargetMode::User(user) => Ok(TargetSet::from_users(
            vec![Target::User(user.clone())],
            seat_check,
        )),
        TargetMode::UserList(path) => {
            let users = read_column(path, constants::COL_USER_PRINCIPAL_NAME)?;
            log::info!("Read {} user(s) from {}", users.len(), path.display());
            Ok(TargetSet::from_users(
                users.into_iter().map(Target::User).collect(),
                seat_check,
            ))
        }
        TargetMode::Group(name) => {
            let group = find_group(directory, name)?;
            let mut set = TargetSet {
                seat_check,
                ..TargetSet::default()
            };
            expand_group(directory, &group, group_objects, &mut set)?;
            Ok(set)
        }
        TargetMode::GroupList(path) => resolve_group_list(directory, path, group_objects),
    }
}

fn resolve_group_list(
    directory: &dyn Directory,
    path: &Path,
    group_objects: bool,
) -> Result<TargetSet, AppError> {
    let names = read_column(path, constants::COL_DISPLAY_NAME)?;
    let mut set = TargetSet {
        seat_check: true,
        ..TargetSet::default()
    };

    let mut resolved = 0usize;
    for name in &names {
        match find_group(directory, name) {
            Ok(group) => {
                expand_group(directory, &group, group_objects, &mut set)?;
                resolved += 1;
            }
            Err(AppError::NotFound(e)) => {
                log::warn!("{e}; skipping");
                set.unresolved.push(e);
            }
            Err(e) => return Err(e),
        }
    }

    if resolved == 0 && !names.is_empty() {
        return Err(NotFoundError::NothingResolved(path.to_path_buf()).into());
    }
    Ok(set)
}

/// Looks up a group by exact display name; exactly one match is required.
fn find_group(directory: &dyn Directory, name: &str) -> Result<Group, AppError> {
    let mut groups = directory.find_groups(name)?;
    match groups.len() {
        0 => Err(NotFoundError::NoMatch(name.to_string()).into()),
        1 => Ok(groups.remove(0)),
        count => Err(NotFoundError::Ambiguous {
            name: name.to_string(),
            count,
        }
        .into()),
    }
}

fn expand_group(
    directory: &dyn Directory,
    group: &Group,
    group_objects: bool,
    set: &mut TargetSet,
) -> Result<(), AppError> {
    let members = directory.list_group_members(&group.id)?;
    log::info!("Group '{}' has {} user member(s)", group.display_name, members.len());
    set.seat_demand += members.len();
    if group_objects {
        set.targets.push(Target::Group {
            id: group.id.clone(),
            display_name: group.display_name.clone(),
        });
    } else {
        set.targets.extend(members.into_iter().map(Target::User));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::fake::FakeDirectory;
    use crate::core::reference::tests::write_temp;

    fn directory() -> FakeDirectory {
        let mut dir = FakeDirectory::default();
        dir.add_group("g-sales", "Sales", &["u1", "u2"]);
        dir.add_group("g-ops", "Ops", &["u2", "u3"]);
        dir.add_group("g-dup-1", "Shared", &["u4"]);
        dir.add_group("g-dup-2", "Shared", &["u5"]);
        dir
    }

    fn users(ids: &[&str]) -> Vec<Target> {
        ids.iter().map(|id| Target::User((*id).to_string())).collect()
    }

    #[test]
    fn test_single_user_skips_seat_check() {
        let set = resolve_targets(&directory(), &TargetMode::User("a@contoso.com".into()), false)
            .unwrap();
        assert_eq!(set.targets, users(&["a@contoso.com"]));
        assert!(!set.seat_check);
    }

    #[test]
    fn test_user_list() {
        let path = write_temp("users.csv", "UserPrincipalName\na@contoso.com\nb@contoso.com\n");
        let set = resolve_targets(&directory(), &TargetMode::UserList(path.clone()), false);
        let _ = std::fs::remove_file(&path);
        let set = set.unwrap();
        assert_eq!(set.targets, users(&["a@contoso.com", "b@contoso.com"]));
        assert_eq!(set.seat_demand, 2);
        assert!(set.seat_check);
    }

    #[test]
    fn test_user_list_wrong_header() {
        let path = write_temp("badusers.csv", "Mail\na@contoso.com\n");
        let err = resolve_targets(&directory(), &TargetMode::UserList(path.clone()), false)
            .unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, AppError::Load(_)));
    }

    #[test]
    fn test_single_group_members() {
        let set = resolve_targets(&directory(), &TargetMode::Group("Sales".into()), false).unwrap();
        assert_eq!(set.targets, users(&["u1", "u2"]));
        assert!(!set.seat_check);
    }

    #[test]
    fn test_single_group_not_found_is_fatal() {
        let err = resolve_targets(&directory(), &TargetMode::Group("Nobody".into()), false)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(NotFoundError::NoMatch(_))));
    }

    #[test]
    fn test_ambiguous_group() {
        let err = resolve_targets(&directory(), &TargetMode::Group("Shared".into()), false)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFound(NotFoundError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_group_list_continues_past_unresolved_group() {
        let path = write_temp("groups.csv", "DisplayName\nNobody\nSales\nOps\n");
        let set = resolve_targets(&directory(), &TargetMode::GroupList(path.clone()), false);
        let _ = std::fs::remove_file(&path);
        let set = set.unwrap();
        // not deduplicated across groups
        assert_eq!(set.targets, users(&["u1", "u2", "u2", "u3"]));
        assert_eq!(set.unresolved, vec![NotFoundError::NoMatch("Nobody".into())]);
        assert!(set.seat_check);
    }

    #[test]
    fn test_group_list_nothing_resolved() {
        let path = write_temp("nogroups.csv", "DisplayName\nNobody\nShared\n");
        let err = resolve_targets(&directory(), &TargetMode::GroupList(path.clone()), false)
            .unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            err,
            AppError::NotFound(NotFoundError::NothingResolved(_))
        ));
    }

    #[test]
    fn test_group_objects_demand_member_seats() {
        let path = write_temp("objgroups.csv", "DisplayName\nSales\nOps\n");
        let set = resolve_targets(&directory(), &TargetMode::GroupList(path.clone()), true);
        let _ = std::fs::remove_file(&path);
        let set = set.unwrap();
        assert_eq!(set.targets.len(), 2);
        assert_eq!(
            set.targets[0],
            Target::Group {
                id: "g-sales".into(),
                display_name: "Sales".into()
            }
        );
        assert_eq!(set.seat_demand, 4);
    }
}
