//! Role time limits and the member directory collaborator.

use crate::errors::{AppError, AppResult};
use crate::models::record::MemberId;
use crate::models::role::RoleId;
use std::collections::{BTreeMap, BTreeSet};

/// Source of role membership and display names (the chat platform).
pub trait MemberDirectory: Send + Sync {
    /// All roles the member currently holds. Roles without a configured
    /// limit are filtered out by the caller.
    fn qualifying_roles(&self, member: &MemberId) -> AppResult<BTreeSet<RoleId>>;

    fn display_name(&self, member: &MemberId) -> AppResult<Option<String>>;
}

/// `RoleId → maximum session hours`, injected at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleLimits {
    limits: BTreeMap<RoleId, f64>,
}

impl RoleLimits {
    pub fn from_entries<I>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (RoleId, f64)>,
    {
        let mut limits = BTreeMap::new();
        for (role, hours) in entries {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(AppError::Config(format!(
                    "Role {role} has an invalid time limit: {hours}"
                )));
            }
            limits.insert(role, hours);
        }
        Ok(Self { limits })
    }

    pub fn limit_for(&self, role: &RoleId) -> Option<f64> {
        self.limits.get(role).copied()
    }

    /// Limit that applies to a member holding `roles`.
    ///
    /// Only roles with a configured limit qualify. With several qualifying
    /// roles the smallest limit wins; equal limits fall back to the lowest
    /// role id so the choice never depends on iteration order.
    pub fn effective_limit<'a, I>(&self, roles: I) -> Option<(RoleId, f64)>
    where
        I: IntoIterator<Item = &'a RoleId>,
    {
        roles
            .into_iter()
            .filter_map(|role| self.limit_for(role).map(|h| (role, h)))
            .min_by(|(ra, ha), (rb, hb)| ha.total_cmp(hb).then_with(|| ra.cmp(rb)))
            .map(|(role, hours)| (role.clone(), hours))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoleId, f64)> {
        self.limits.iter().map(|(r, h)| (r, *h))
    }
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    display_name: String,
    roles: BTreeSet<RoleId>,
}

/// Fixed directory loaded from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: BTreeMap<MemberId, DirectoryEntry>,
}

impl StaticDirectory {
    pub fn insert<I>(&mut self, member: MemberId, display_name: String, roles: I)
    where
        I: IntoIterator<Item = RoleId>,
    {
        self.members.insert(
            member,
            DirectoryEntry {
                display_name,
                roles: roles.into_iter().collect(),
            },
        );
    }
}

impl MemberDirectory for StaticDirectory {
    fn qualifying_roles(&self, member: &MemberId) -> AppResult<BTreeSet<RoleId>> {
        Ok(self
            .members
            .get(member)
            .map(|e| e.roles.clone())
            .unwrap_or_default())
    }

    fn display_name(&self, member: &MemberId) -> AppResult<Option<String>> {
        Ok(self.members.get(member).map(|e| e.display_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RoleLimits {
        RoleLimits::from_entries([
            (RoleId::from("team_leader"), 12.25),
            (RoleId::from("chatter"), 16.25),
        ])
        .unwrap()
    }

    #[test]
    fn smallest_limit_wins_for_multiple_roles() {
        let roles = [RoleId::from("chatter"), RoleId::from("team_leader")];
        let (role, hours) = limits().effective_limit(roles.iter()).unwrap();
        assert_eq!(role, RoleId::from("team_leader"));
        assert_eq!(hours, 12.25);
    }

    #[test]
    fn unknown_roles_do_not_qualify() {
        let roles = [RoleId::from("visitor")];
        assert!(limits().effective_limit(roles.iter()).is_none());
        assert!(limits().effective_limit(std::iter::empty()).is_none());
    }

    #[test]
    fn equal_limits_pick_lowest_role_id() {
        let l = RoleLimits::from_entries([(RoleId::from("b"), 8.0), (RoleId::from("a"), 8.0)])
            .unwrap();
        let roles = [RoleId::from("b"), RoleId::from("a")];
        assert_eq!(l.effective_limit(roles.iter()).unwrap().0, RoleId::from("a"));
    }

    #[test]
    fn non_positive_limits_are_rejected() {
        assert!(RoleLimits::from_entries([(RoleId::from("x"), 0.0)]).is_err());
        assert!(RoleLimits::from_entries([(RoleId::from("x"), f64::NAN)]).is_err());
    }

    #[test]
    fn static_directory_returns_empty_roles_for_strangers() {
        let mut dir = StaticDirectory::default();
        dir.insert(
            MemberId::from("u1"),
            "Ana".into(),
            [RoleId::from("chatter")],
        );
        assert_eq!(dir.qualifying_roles(&MemberId::from("u1")).unwrap().len(), 1);
        assert!(dir.qualifying_roles(&MemberId::from("u2")).unwrap().is_empty());
        assert_eq!(dir.display_name(&MemberId::from("u2")).unwrap(), None);
    }
}
