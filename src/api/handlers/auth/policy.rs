//! The authoritative route policy table.
//!
//! One table, one gate: every route-protection decision in the process goes
//! through `required_access` and `authorize`. Paths outside the table are
//! public by design; the table is exhaustive, not best-effort.

use super::claims::SessionClaims;
use super::roles::{Role, StaffRole};

/// Access requirement for a protected route prefix.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RouteAccess {
    /// Any authenticated user.
    Authenticated,
    /// At least one of the listed requirements must hold.
    AnyOf(&'static [Requirement]),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Requirement {
    Role(Role),
    Staff(StaffRole),
    Vendor,
    Restaurateur,
}

/// Prefixes served without any cookie work at all.
const PUBLIC_PREFIXES: &[&str] = &[
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/events",
    "/search",
    "/restaurants",
    "/marketplace",
    "/api/auth",
    "/api-docs",
    "/swagger-ui",
    "/health",
    "/assets",
    "/favicon.ico",
];

/// Protected prefixes and what they require. Order matters only for
/// readability; prefixes do not overlap.
const PROTECTED_ROUTES: &[(&str, RouteAccess)] = &[
    ("/admin", RouteAccess::AnyOf(&[Requirement::Role(Role::Admin)])),
    (
        "/organizer",
        RouteAccess::AnyOf(&[Requirement::Role(Role::Organizer)]),
    ),
    ("/vendor", RouteAccess::AnyOf(&[Requirement::Vendor])),
    (
        "/restaurant",
        RouteAccess::AnyOf(&[Requirement::Restaurateur]),
    ),
    (
        "/team",
        RouteAccess::AnyOf(&[Requirement::Staff(StaffRole::TeamMembers)]),
    ),
    (
        "/associate",
        RouteAccess::AnyOf(&[Requirement::Staff(StaffRole::Associates)]),
    ),
    (
        "/staff",
        RouteAccess::AnyOf(&[
            Requirement::Staff(StaffRole::Staff),
            Requirement::Staff(StaffRole::TeamMembers),
            Requirement::Staff(StaffRole::Associates),
        ]),
    ),
    ("/user", RouteAccess::Authenticated),
    ("/account", RouteAccess::Authenticated),
    ("/tickets", RouteAccess::Authenticated),
    ("/orders", RouteAccess::Authenticated),
    ("/checkout", RouteAccess::Authenticated),
];

/// Prefix match on path-segment boundaries: `/admin` covers `/admin` and
/// `/admin/events` but not `/administrator`.
pub(crate) fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

pub(crate) fn is_public(path: &str) -> bool {
    path == "/"
        || PUBLIC_PREFIXES
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
}

pub(crate) fn required_access(path: &str) -> Option<RouteAccess> {
    PROTECTED_ROUTES
        .iter()
        .find(|(prefix, _)| path_has_prefix(path, prefix))
        .map(|(_, access)| *access)
}

/// Authorization predicate for a verified session against a route entry.
/// Admins pass everything.
pub(crate) fn authorize(access: RouteAccess, claims: &SessionClaims) -> bool {
    if claims.role == Role::Admin {
        return true;
    }
    match access {
        RouteAccess::Authenticated => true,
        RouteAccess::AnyOf(requirements) => requirements.iter().any(|requirement| {
            match requirement {
                Requirement::Role(role) => claims.role == *role,
                Requirement::Staff(staff) => claims.staff_roles.contains(staff),
                Requirement::Vendor => claims.vendor,
                Requirement::Restaurateur => claims.restaurateur,
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(role: Role, staff_roles: Vec<StaffRole>) -> SessionClaims {
        SessionClaims {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            role,
            staff_roles,
            vendor: false,
            restaurateur: false,
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        assert!(path_has_prefix("/admin", "/admin"));
        assert!(path_has_prefix("/admin/events", "/admin"));
        assert!(!path_has_prefix("/administrator", "/admin"));
        assert!(!path_has_prefix("/ad", "/admin"));
    }

    #[test]
    fn public_paths_need_no_policy_entry() {
        assert!(is_public("/"));
        assert!(is_public("/login"));
        assert!(is_public("/events/some-concert"));
        assert!(is_public("/api/auth/magic-link"));
        assert!(!is_public("/admin"));
        assert!(!is_public("/user/dashboard"));
    }

    #[test]
    fn unenumerated_paths_have_no_requirement() {
        assert!(required_access("/about").is_none());
        assert!(required_access("/pricing/faq").is_none());
    }

    #[test]
    fn admin_passes_every_entry() {
        let admin = claims(Role::Admin, Vec::new());
        for (_, access) in PROTECTED_ROUTES {
            assert!(authorize(*access, &admin));
        }
    }

    #[test]
    fn primary_role_must_match_required_set() {
        let organizer = claims(Role::Organizer, Vec::new());
        let user = claims(Role::User, Vec::new());

        let organizer_routes = required_access("/organizer/events").expect("entry");
        assert!(authorize(organizer_routes, &organizer));
        assert!(!authorize(organizer_routes, &user));

        let admin_routes = required_access("/admin").expect("entry");
        assert!(!authorize(admin_routes, &organizer));
    }

    #[test]
    fn staff_roles_map_into_required_sets() {
        let team = claims(Role::User, vec![StaffRole::TeamMembers]);
        let associate = claims(Role::User, vec![StaffRole::Associates]);
        let plain = claims(Role::User, Vec::new());

        let team_access = required_access("/team/scans").expect("entry");
        assert!(authorize(team_access, &team));
        assert!(!authorize(team_access, &associate));

        let staff_access = required_access("/staff").expect("entry");
        assert!(authorize(staff_access, &team));
        assert!(authorize(staff_access, &associate));
        assert!(!authorize(staff_access, &plain));
    }

    #[test]
    fn vendor_and_restaurateur_flags_satisfy_their_routes() {
        let mut vendor = claims(Role::User, Vec::new());
        vendor.vendor = true;
        let mut restaurateur = claims(Role::User, Vec::new());
        restaurateur.restaurateur = true;

        let vendor_access = required_access("/vendor/products").expect("entry");
        assert!(authorize(vendor_access, &vendor));
        assert!(!authorize(vendor_access, &restaurateur));

        let restaurant_access = required_access("/restaurant/menu").expect("entry");
        assert!(authorize(restaurant_access, &restaurateur));
        assert!(!authorize(restaurant_access, &vendor));
    }

    #[test]
    fn any_authenticated_user_passes_generic_entries() {
        let user = claims(Role::User, Vec::new());
        let access = required_access("/user/dashboard").expect("entry");
        assert!(authorize(access, &user));

        let tickets = required_access("/tickets/42").expect("entry");
        assert!(authorize(tickets, &user));
    }
}
