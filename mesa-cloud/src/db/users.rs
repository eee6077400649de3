//! User database operations

use std::collections::HashMap;

use shared::models::{RoleAssignment, User, UserStatus, UserUpdate, UserWithRoles};
use sqlx::PgPool;

use super::roles;
use crate::error::ServiceResult;

const USER_COLUMNS: &str =
    "id, restaurant_id, email, first_name, last_name, phone, status, created_at, updated_at";

/// User row with its password hash (login / password change only)
#[derive(sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// New account data (email already normalized, password already hashed)
pub struct NewUser<'a> {
    pub restaurant_id: Option<i64>,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
}

pub async fn find_credentials(
    pool: &PgPool,
    email: &str,
) -> ServiceResult<Option<UserCredentials>> {
    let row = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_credentials_by_id(
    pool: &PgPool,
    id: i64,
) -> ServiceResult<Option<UserCredentials>> {
    let row = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> ServiceResult<Option<User>> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// User of `restaurant_id` (other tenants' users are invisible)
pub async fn find_in_restaurant(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
) -> ServiceResult<Option<User>> {
    let user = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND restaurant_id = $2"
    ))
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn email_taken(pool: &PgPool, email: &str) -> ServiceResult<bool> {
    let taken = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

pub async fn with_roles(pool: &PgPool, user: User) -> ServiceResult<UserWithRoles> {
    let roles = roles::grants_of(pool, user.id).await?;
    Ok(UserWithRoles { user, roles })
}

/// All users of a restaurant with their role-location pairs
pub async fn list_for_restaurant(
    pool: &PgPool,
    restaurant_id: i64,
) -> ServiceResult<Vec<UserWithRoles>> {
    let users: Vec<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE restaurant_id = $1
         ORDER BY last_name, first_name, id"
    ))
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let mut grants: HashMap<i64, Vec<_>> = HashMap::new();
    for (user_id, grant) in roles::grants_of_many(pool, &ids).await? {
        grants.entry(user_id).or_default().push(grant);
    }

    Ok(users
        .into_iter()
        .map(|user| {
            let roles = grants.remove(&user.id).unwrap_or_default();
            UserWithRoles { user, roles }
        })
        .collect())
}

/// Create a user and its grants in one transaction
pub async fn create(
    pool: &PgPool,
    new_user: &NewUser<'_>,
    grants: &[RoleAssignment],
    now: i64,
) -> ServiceResult<User> {
    let mut tx = pool.begin().await?;

    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users
             (restaurant_id, email, password_hash, first_name, last_name, phone, status,
              created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $7)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.restaurant_id)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.phone)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    roles::insert_grants(&mut *tx, user.id, grants, now).await?;

    tx.commit().await?;
    Ok(user)
}

/// Replace every grant of a user
pub async fn replace_roles(
    pool: &PgPool,
    user_id: i64,
    grants: &[RoleAssignment],
    now: i64,
) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    roles::insert_grants(&mut *tx, user_id, grants, now).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn update_profile(
    pool: &PgPool,
    id: i64,
    data: &UserUpdate,
    now: i64,
) -> ServiceResult<Option<User>> {
    let user = sqlx::query_as(&format!(
        "UPDATE users SET
             first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             phone = COALESCE($4, phone),
             updated_at = $5
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.phone)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn set_status(
    pool: &PgPool,
    id: i64,
    status: UserStatus,
    now: i64,
) -> ServiceResult<Option<User>> {
    let user = sqlx::query_as(&format!(
        "UPDATE users SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn update_password(
    pool: &PgPool,
    id: i64,
    password_hash: &str,
    now: i64,
) -> ServiceResult<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}
