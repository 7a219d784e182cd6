//! Admin account provisioning: interactive CLI and startup hash.

use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db::queries;

const MIN_PASSWORD_LENGTH: usize = 12;
const DEFAULT_ADMIN_EMAIL: &str = "admin@royalpaints.local";

/// Prompt for a password (hidden input), confirm it, hash it, and upsert
/// the admin account.
pub async fn create_admin_interactive(pool: &PgPool, email: &str) -> Result<()> {
    let email = normalize_email(email);
    validate_email(&email)?;

    let password = prompt_password()?;
    validate_password(&password)?;

    let hash = crate::auth::hash_password(&password)?;

    queries::user::upsert_admin(pool, &email, &hash)
        .await
        .context("Failed to upsert admin user")?;

    println!("Admin account ready: {email}");
    Ok(())
}

/// Startup path for automated deployments: when ADMIN_PASSWORD_HASH holds
/// an argon2 hash and the admin row is missing or carries a non-argon2
/// hash, apply it. No plaintext password involved.
pub async fn ensure_admin_from_env(pool: &PgPool) {
    let hash = match std::env::var("ADMIN_PASSWORD_HASH") {
        Ok(h) if is_argon2_hash(&h) => h,
        _ => return,
    };

    let email = normalize_email(
        &std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),
    );

    let existing = match queries::user::get_admin_password_hash(pool, &email).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!("Could not look up admin {email}: {e}");
            None
        }
    };

    if existing.as_deref().is_some_and(is_argon2_hash) {
        return;
    }

    info!("Applying ADMIN_PASSWORD_HASH for {email}");

    match queries::user::upsert_admin(pool, &email, &hash).await {
        Ok(()) => info!("Admin account set via ADMIN_PASSWORD_HASH"),
        Err(e) => warn!("Failed to apply ADMIN_PASSWORD_HASH: {e}"),
    }
}

fn is_argon2_hash(hash: &str) -> bool {
    hash.starts_with("$argon2")
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn prompt_password() -> Result<String> {
    let pass = rpassword::prompt_password("Enter admin password: ")
        .context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Confirm admin password: ")
        .context("Failed to read password confirmation")?;

    if pass != confirm {
        bail!("Passwords do not match");
    }
    Ok(pass)
}

fn validate_email(email: &str) -> Result<()> {
    if !email.contains('@') || !email.contains('.') {
        bail!("Invalid email address: {email}");
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters (got {})",
            password.len()
        );
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        bail!("Password must contain uppercase, lowercase, and a digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_passes() {
        assert!(validate_email("owner@royalpaints.com").is_ok());
    }

    #[test]
    fn invalid_email_fails() {
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Owner@RoyalPaints.com "), "owner@royalpaints.com");
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_password("Short1").is_err());
    }

    #[test]
    fn weak_password_rejected() {
        assert!(validate_password("alllowercase123").is_err());
    }

    #[test]
    fn strong_password_accepted() {
        assert!(validate_password("StrongPass123!").is_ok());
    }

    #[test]
    fn only_argon2_hashes_are_applied() {
        assert!(is_argon2_hash("$argon2id$v=19$m=19456,t=2,p=1$abc$def"));
        assert!(!is_argon2_hash("pbkdf2_sha256$260000$abc"));
    }
}
