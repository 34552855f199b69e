//! Post-login landing pages and open-redirect protection.
//!
//! Every login entry point funnels through `post_login_redirect` so redirect
//! policy cannot diverge between the password, magic-link, and OAuth flows.

use super::policy::path_has_prefix;
use super::roles::{Role, StaffRole};

/// The caller's own landing page. Staff priority is a policy decision:
/// TEAM_MEMBERS over ASSOCIATES over STAFF, since a user may hold several
/// staff roles at once.
#[must_use]
pub(crate) fn default_dashboard(role: Role, staff_roles: &[StaffRole]) -> &'static str {
    match role {
        Role::Admin => "/admin/dashboard",
        Role::Organizer => "/organizer/dashboard",
        Role::User => {
            if staff_roles.contains(&StaffRole::TeamMembers) {
                "/team/dashboard"
            } else if staff_roles.contains(&StaffRole::Associates) {
                "/associate/dashboard"
            } else if staff_roles.contains(&StaffRole::Staff) {
                "/staff/dashboard"
            } else {
                "/user/dashboard"
            }
        }
    }
}

/// Accept only same-site absolute paths that are not themselves login
/// targets. Everything else invites an open redirect.
#[must_use]
pub(crate) fn is_valid_redirect_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }
    if path.contains("://") {
        return false;
    }
    if path_has_prefix(path, "/login") || path_has_prefix(path, "/register") {
        return false;
    }
    true
}

/// Intended path if it validates, otherwise the role default.
#[must_use]
pub(crate) fn post_login_redirect(
    role: Role,
    staff_roles: &[StaffRole],
    intended: Option<&str>,
) -> String {
    intended
        .filter(|path| is_valid_redirect_path(path))
        .map_or_else(
            || default_dashboard(role, staff_roles).to_string(),
            str::to_string,
        )
}
