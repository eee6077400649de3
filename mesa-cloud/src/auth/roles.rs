//! Role hierarchy and role-assignment rules

use std::collections::HashSet;

use shared::error::{AppError, ErrorCode};
use shared::models::{RoleAssignment, UserRoleInfo};

use crate::security_log;

pub const SUPERADMIN: &str = "superadmin";
pub const RESTAURANT_ADMINISTRATOR: &str = "restaurant_administrator";
pub const LOCATION_ADMINISTRATOR: &str = "location_administrator";
pub const WAITER: &str = "waiter";
pub const KITCHEN: &str = "kitchen";
pub const CASHIER: &str = "cashier";
pub const CUSTOMER: &str = "customer";

/// Levels used for endpoint guards
pub const LEVEL_SUPERADMIN: i32 = 100;
pub const LEVEL_RESTAURANT_ADMIN: i32 = 80;
pub const LEVEL_LOCATION_ADMIN: i32 = 60;
pub const LEVEL_STAFF: i32 = 40;
pub const LEVEL_CUSTOMER: i32 = 10;

/// Hierarchy level of a known role
pub fn role_level(name: &str) -> Option<i32> {
    match name {
        SUPERADMIN => Some(LEVEL_SUPERADMIN),
        RESTAURANT_ADMINISTRATOR => Some(LEVEL_RESTAURANT_ADMIN),
        LOCATION_ADMINISTRATOR => Some(LEVEL_LOCATION_ADMIN),
        WAITER | KITCHEN | CASHIER => Some(LEVEL_STAFF),
        CUSTOMER => Some(LEVEL_CUSTOMER),
        _ => None,
    }
}

/// Highest level among role names (0 when none are known)
pub fn highest_level<'a>(roles: impl IntoIterator<Item = &'a str>) -> i32 {
    roles.into_iter().filter_map(role_level).max().unwrap_or(0)
}

/// Authority of the user performing a role assignment
#[derive(Debug, Clone)]
pub struct Grantor {
    pub user_id: i64,
    pub level: i32,
    pub is_superadmin: bool,
    /// Locations where the grantor holds `location_administrator`
    pub administered_locations: HashSet<i64>,
}

impl Grantor {
    /// Build from the grantor's current grants (as stored)
    pub fn from_grants(user_id: i64, grants: &[UserRoleInfo]) -> Self {
        let level = grants.iter().map(|g| g.role_level).max().unwrap_or(0);
        let administered_locations = grants
            .iter()
            .filter(|g| g.role_name == LOCATION_ADMINISTRATOR)
            .filter_map(|g| g.location_id)
            .collect();
        Self {
            user_id,
            level,
            is_superadmin: grants.iter().any(|g| g.role_name == SUPERADMIN),
            administered_locations,
        }
    }

    /// Location-scoped when the highest authority is location administrator
    pub fn is_location_scoped(&self) -> bool {
        !self.is_superadmin && self.level == LEVEL_LOCATION_ADMIN
    }

    /// Strictly-lower rule; superadmin may grant anything
    pub fn may_grant_level(&self, target_level: i32) -> bool {
        self.is_superadmin || target_level < self.level
    }

    /// Whether this grantor may manage a user whose highest level is `target_level`
    pub fn outranks(&self, target_level: i32) -> bool {
        self.is_superadmin || target_level < self.level
    }

    /// Whether the grants of a managed user all sit within this grantor's reach.
    ///
    /// A location-scoped grantor reaches only users whose every grant is on a
    /// location it administers; a user without grants is out of its reach.
    pub fn covers(&self, grants: &[UserRoleInfo]) -> bool {
        if !self.is_location_scoped() {
            return true;
        }
        !grants.is_empty()
            && grants.iter().all(|g| {
                g.location_id
                    .is_some_and(|id| self.administered_locations.contains(&id))
            })
    }
}

/// Validate and normalize requested grants.
///
/// Rules:
/// - every role must exist and be strictly below the grantor's level (superadmin excepted)
/// - a location-scoped grantor may only grant on locations it administers
/// - every referenced location must belong to the restaurant
/// - at most one grant is the primary role; when none is, the first becomes primary
pub fn check_assignments(
    grantor: &Grantor,
    requested: &[RoleAssignment],
    restaurant_locations: &HashSet<i64>,
) -> Result<Vec<RoleAssignment>, AppError> {
    if requested.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "At least one role is required",
        ));
    }

    let primary_count = requested.iter().filter(|r| r.is_primary_role).count();
    if primary_count > 1 {
        return Err(AppError::validation("Only one role can be marked as primary"));
    }

    let mut seen = HashSet::new();
    for assignment in requested {
        let level = role_level(&assignment.role_name).ok_or_else(|| {
            AppError::validation(format!("Unknown role: {}", assignment.role_name))
                .with_detail("role", assignment.role_name.clone())
        })?;

        if !seen.insert((assignment.role_name.as_str(), assignment.location_id)) {
            return Err(AppError::validation(format!(
                "Duplicate role assignment: {}",
                assignment.role_name
            )));
        }

        if !grantor.may_grant_level(level) {
            security_log!(
                WARN,
                "role_assignment_denied",
                grantor_id = grantor.user_id,
                role = %assignment.role_name
            );
            return Err(AppError::new(ErrorCode::RoleAssignmentForbidden)
                .with_detail("role", assignment.role_name.clone()));
        }

        if let Some(location_id) = assignment.location_id
            && !restaurant_locations.contains(&location_id)
        {
            return Err(AppError::new(ErrorCode::LocationNotFound)
                .with_detail("location_id", location_id));
        }

        if grantor.is_location_scoped() {
            let allowed = assignment
                .location_id
                .is_some_and(|id| grantor.administered_locations.contains(&id));
            if !allowed {
                security_log!(
                    WARN,
                    "role_assignment_denied",
                    grantor_id = grantor.user_id,
                    role = %assignment.role_name,
                    location_id = ?assignment.location_id
                );
                return Err(AppError::new(ErrorCode::LocationScopeDenied));
            }
        }
    }

    let mut normalized = requested.to_vec();
    if primary_count == 0 {
        normalized[0].is_primary_role = true;
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(role: &str, location_id: Option<i64>) -> UserRoleInfo {
        UserRoleInfo {
            role_name: role.into(),
            role_level: role_level(role).unwrap(),
            location_id,
            location_name: None,
            is_primary_role: false,
            is_primary_location: false,
        }
    }

    fn assign(role: &str, location_id: Option<i64>) -> RoleAssignment {
        RoleAssignment {
            role_name: role.into(),
            location_id,
            is_primary_role: false,
            is_primary_location: false,
        }
    }

    fn locations(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_role_levels() {
        assert_eq!(role_level(SUPERADMIN), Some(100));
        assert_eq!(role_level(RESTAURANT_ADMINISTRATOR), Some(80));
        assert_eq!(role_level(LOCATION_ADMINISTRATOR), Some(60));
        assert_eq!(role_level(WAITER), Some(40));
        assert_eq!(role_level(KITCHEN), Some(40));
        assert_eq!(role_level(CASHIER), Some(40));
        assert_eq!(role_level(CUSTOMER), Some(10));
        assert_eq!(role_level("owner"), None);
        assert_eq!(highest_level(["waiter", "location_administrator"]), 60);
        assert_eq!(highest_level(["nobody"]), 0);
    }

    #[test]
    fn test_restaurant_admin_grants_lower_roles() {
        let grantor = Grantor::from_grants(1, &[grant(RESTAURANT_ADMINISTRATOR, Some(10))]);
        let result = check_assignments(
            &grantor,
            &[assign(WAITER, Some(10)), assign(LOCATION_ADMINISTRATOR, Some(11))],
            &locations(&[10, 11]),
        )
        .unwrap();
        assert!(result[0].is_primary_role);
        assert!(!result[1].is_primary_role);
    }

    #[test]
    fn test_cannot_grant_equal_or_higher() {
        let grantor = Grantor::from_grants(1, &[grant(RESTAURANT_ADMINISTRATOR, None)]);
        let err = check_assignments(
            &grantor,
            &[assign(RESTAURANT_ADMINISTRATOR, None)],
            &locations(&[]),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleAssignmentForbidden);

        let err = check_assignments(&grantor, &[assign(SUPERADMIN, None)], &locations(&[]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleAssignmentForbidden);
    }

    #[test]
    fn test_superadmin_grants_anything() {
        let grantor = Grantor::from_grants(1, &[grant(SUPERADMIN, None)]);
        assert!(check_assignments(&grantor, &[assign(SUPERADMIN, None)], &locations(&[])).is_ok());
    }

    #[test]
    fn test_location_admin_limited_to_own_locations() {
        let grantor = Grantor::from_grants(1, &[grant(LOCATION_ADMINISTRATOR, Some(10))]);
        assert!(grantor.is_location_scoped());

        assert!(
            check_assignments(&grantor, &[assign(WAITER, Some(10))], &locations(&[10, 11]))
                .is_ok()
        );

        let err = check_assignments(&grantor, &[assign(WAITER, Some(11))], &locations(&[10, 11]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LocationScopeDenied);

        let err = check_assignments(&grantor, &[assign(KITCHEN, None)], &locations(&[10, 11]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LocationScopeDenied);
    }

    #[test]
    fn test_location_admin_covers_only_own_locations() {
        let grantor = Grantor::from_grants(1, &[grant(LOCATION_ADMINISTRATOR, Some(10))]);
        assert!(grantor.covers(&[grant(WAITER, Some(10))]));
        assert!(!grantor.covers(&[grant(WAITER, Some(11))]));
        assert!(!grantor.covers(&[grant(WAITER, Some(10)), grant(KITCHEN, Some(11))]));
        assert!(!grantor.covers(&[grant(CUSTOMER, None)]));
        assert!(!grantor.covers(&[]));

        let admin = Grantor::from_grants(2, &[grant(RESTAURANT_ADMINISTRATOR, None)]);
        assert!(admin.covers(&[grant(WAITER, Some(11))]));
        assert!(admin.covers(&[]));
    }

    #[test]
    fn test_foreign_location_rejected() {
        let grantor = Grantor::from_grants(1, &[grant(RESTAURANT_ADMINISTRATOR, None)]);
        let err = check_assignments(&grantor, &[assign(WAITER, Some(99))], &locations(&[10]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LocationNotFound);
    }

    #[test]
    fn test_primary_role_rules() {
        let grantor = Grantor::from_grants(1, &[grant(RESTAURANT_ADMINISTRATOR, None)]);
        let mut a = assign(WAITER, Some(10));
        a.is_primary_role = true;
        let mut b = assign(CASHIER, Some(10));
        b.is_primary_role = true;
        let err = check_assignments(&grantor, &[a.clone(), b], &locations(&[10])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let result =
            check_assignments(&grantor, &[assign(CASHIER, Some(10)), a], &locations(&[10]))
                .unwrap();
        assert!(!result[0].is_primary_role);
        assert!(result[1].is_primary_role);
    }

    #[test]
    fn test_unknown_and_duplicate_roles() {
        let grantor = Grantor::from_grants(1, &[grant(RESTAURANT_ADMINISTRATOR, None)]);
        let err = check_assignments(&grantor, &[assign("chef", None)], &locations(&[]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = check_assignments(
            &grantor,
            &[assign(WAITER, Some(1)), assign(WAITER, Some(1))],
            &locations(&[1]),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = check_assignments(&grantor, &[], &locations(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
    }
}
