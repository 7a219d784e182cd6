//! Customer database queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::customer::{Customer, CreateCustomerRequest, CustomerDetails, UpdateCustomerRequest};

const CUSTOMER_COLUMNS: &str = r#"
    id, full_name, contact_number, address, email,
    sms_sent, sms_sent_at, created_at, updated_at
"#;

/// Create a new customer
pub async fn create_customer(pool: &PgPool, req: &CreateCustomerRequest) -> Result<Customer> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        INSERT INTO customers (
            id, full_name, contact_number, address, email,
            sms_sent, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, FALSE, NOW(), NOW())
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&req.full_name)
    .bind(&req.contact_number)
    .bind(&req.address)
    .bind(&req.email)
    .fetch_one(pool)
    .await?;

    Ok(customer)
}

/// Get customer by ID
pub async fn get_customer(pool: &PgPool, customer_id: Uuid) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
    ))
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// Exact lookup by the natural key
pub async fn find_by_contact_number(pool: &PgPool, contact_number: &str) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE contact_number = $1"
    ))
    .bind(contact_number)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// List customers, newest first
pub async fn list_customers(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>(&format!(
        r#"
        SELECT {CUSTOMER_COLUMNS}
        FROM customers
        ORDER BY created_at DESC, full_name ASC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(customers)
}

/// All customers in a stable order (export)
pub async fn list_all_customers(pool: &PgPool) -> Result<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(customers)
}

pub async fn count_customers(pool: &PgPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

pub async fn count_sms_sent(pool: &PgPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers WHERE sms_sent")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Update a customer; absent fields keep their current value
pub async fn update_customer(pool: &PgPool, req: &UpdateCustomerRequest) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        UPDATE customers
        SET
            full_name = COALESCE($2, full_name),
            contact_number = COALESCE($3, contact_number),
            address = COALESCE($4, address),
            email = COALESCE($5, email),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(req.id)
    .bind(&req.full_name)
    .bind(&req.contact_number)
    .bind(&req.address)
    .bind(&req.email)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// Overwrite name, address and email of an existing customer
pub async fn update_customer_details(
    pool: &PgPool,
    customer_id: Uuid,
    details: &CustomerDetails,
) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        UPDATE customers
        SET full_name = $2, address = $3, email = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(customer_id)
    .bind(&details.full_name)
    .bind(&details.address)
    .bind(&details.email)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// Set the SMS flag, stamping or clearing `sms_sent_at`
pub async fn set_sms_sent(pool: &PgPool, customer_id: Uuid, sms_sent: bool) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        UPDATE customers
        SET
            sms_sent = $2,
            sms_sent_at = CASE WHEN $2 THEN COALESCE(sms_sent_at, NOW()) ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(customer_id)
    .bind(sms_sent)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// Delete a customer
pub async fn delete_customer(pool: &PgPool, customer_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(customer_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether another customer already uses this contact number
pub async fn contact_number_taken(pool: &PgPool, contact_number: &str, except_id: Option<Uuid>) -> Result<bool> {
    let exists: bool = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE contact_number = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(contact_number)
    .bind(except_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
