//! User database queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::user::User;

/// Get user by ID
pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, role, created_at, updated_at
        FROM users
        WHERE id = $1
        "#
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Get user by email (for login)
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, role, created_at, updated_at
        FROM users
        WHERE email = $1
        "#
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Admin row's password hash, if an admin with this email exists
pub async fn get_admin_password_hash(pool: &PgPool, email: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT password_hash FROM users WHERE email = $1 AND role = 'admin'"
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(hash,)| hash))
}

/// Insert an admin account, or reset the password and role of an existing one
pub async fn upsert_admin(pool: &PgPool, email: &str, password_hash: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, 'Admin', 'admin')
        ON CONFLICT (email) DO UPDATE
        SET password_hash = EXCLUDED.password_hash,
            role = 'admin',
            updated_at = NOW()
        "#
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(())
}
