//! Role tags attached to users.
//!
//! A role is an opaque string. There is no hierarchy: every command carries
//! its own whitelist of roles and the dispatcher checks membership only.

use std::collections::BTreeSet;

pub const NEW: &str = "new";
pub const MEMBER: &str = "member";
pub const ADMIN: &str = "admin";
pub const OWNER: &str = "owner";
pub const BLOCKED: &str = "blocked";
pub const DELETED: &str = "deleted";

/// Roles that can run anything open to the public.
pub const EVERYONE: &[&str] = &[NEW, MEMBER, ADMIN, OWNER];

/// Confirmed users.
pub const MEMBERS: &[&str] = &[MEMBER, ADMIN, OWNER];

/// Management commands.
pub const STAFF: &[&str] = &[ADMIN, OWNER];

/// Set of role tags a command accepts
pub type RoleSet = BTreeSet<String>;

/// Build a role set from string slices
pub fn roles(list: &[&str]) -> RoleSet {
    list.iter().map(|r| r.to_string()).collect()
}

/// Roles an account can never act under
pub fn is_locked_out(role: &str) -> bool {
    role == BLOCKED || role == DELETED
}

/// Roles that `userpromote` may assign
pub fn is_assignable(role: &str) -> bool {
    matches!(role, NEW | MEMBER | ADMIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_dedupes() {
        let set = roles(&[ADMIN, OWNER, ADMIN]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("admin"));
    }

    #[test]
    fn test_locked_out() {
        assert!(is_locked_out(BLOCKED));
        assert!(is_locked_out(DELETED));
        assert!(!is_locked_out(NEW));
    }

    #[test]
    fn test_owner_is_not_assignable() {
        assert!(!is_assignable(OWNER));
        assert!(!is_assignable(BLOCKED));
        assert!(is_assignable(MEMBER));
    }
}
