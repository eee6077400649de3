//! Role catalogue and role grants

use shared::models::{Role, RoleAssignment, UserRoleInfo};
use sqlx::{PgConnection, PgPool};

use crate::error::ServiceResult;

/// Roles strictly below `level` (all roles for superadmin)
pub async fn assignable(
    pool: &PgPool,
    level: i32,
    is_superadmin: bool,
) -> ServiceResult<Vec<Role>> {
    let roles = sqlx::query_as(
        "SELECT id, name, display_name, description, level FROM roles
         WHERE $2 OR level < $1
         ORDER BY level DESC, name",
    )
    .bind(level)
    .bind(is_superadmin)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

const GRANTS_SELECT: &str = "
    SELECT ur.user_id, r.name AS role_name, r.level AS role_level,
           ur.location_id, l.name AS location_name,
           ur.is_primary_role, ur.is_primary_location
    FROM user_roles ur
    JOIN roles r ON r.id = ur.role_id
    LEFT JOIN restaurant_locations l ON l.id = ur.location_id";

#[derive(sqlx::FromRow)]
struct GrantRow {
    user_id: i64,
    #[sqlx(flatten)]
    info: UserRoleInfo,
}

/// Grants held by one user, primary role first
pub async fn grants_of(pool: &PgPool, user_id: i64) -> ServiceResult<Vec<UserRoleInfo>> {
    let rows: Vec<GrantRow> = sqlx::query_as(&format!(
        "{GRANTS_SELECT} WHERE ur.user_id = $1 ORDER BY ur.is_primary_role DESC, r.level DESC, ur.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.info).collect())
}

/// Grants for many users, as `(user_id, grant)` pairs
pub async fn grants_of_many(
    pool: &PgPool,
    user_ids: &[i64],
) -> ServiceResult<Vec<(i64, UserRoleInfo)>> {
    let rows: Vec<GrantRow> = sqlx::query_as(&format!(
        "{GRANTS_SELECT} WHERE ur.user_id = ANY($1)
         ORDER BY ur.user_id, ur.is_primary_role DESC, r.level DESC, ur.id"
    ))
    .bind(user_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| (r.user_id, r.info)).collect())
}

/// Insert grants for `user_id` (batch, inside the caller's transaction)
pub async fn insert_grants(
    conn: &mut PgConnection,
    user_id: i64,
    grants: &[RoleAssignment],
    now: i64,
) -> ServiceResult<()> {
    if grants.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = grants.iter().map(|g| g.role_name.as_str()).collect();
    let locations: Vec<Option<i64>> = grants.iter().map(|g| g.location_id).collect();
    let primary_roles: Vec<bool> = grants.iter().map(|g| g.is_primary_role).collect();
    let primary_locations: Vec<bool> = grants.iter().map(|g| g.is_primary_location).collect();

    sqlx::query(
        "INSERT INTO user_roles
             (user_id, role_id, location_id, is_primary_role, is_primary_location, created_at)
         SELECT $1, r.id, g.location_id, g.is_primary_role, g.is_primary_location, $2
         FROM UNNEST($3::text[], $4::bigint[], $5::boolean[], $6::boolean[])
             AS g(role_name, location_id, is_primary_role, is_primary_location)
         JOIN roles r ON r.name = g.role_name",
    )
    .bind(user_id)
    .bind(now)
    .bind(&names)
    .bind(&locations)
    .bind(&primary_roles)
    .bind(&primary_locations)
    .execute(conn)
    .await?;
    Ok(())
}
