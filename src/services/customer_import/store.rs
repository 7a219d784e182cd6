//! Record store seam between the import workflow and the customers table

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::types::customer::{CreateCustomerRequest, Customer, CustomerDetails};

/// Customer persistence used by the import workflow
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Exact match on the natural key
    async fn find_by_contact_number(&self, contact_number: &str) -> Result<Option<Customer>>;

    async fn create(&self, customer: &CreateCustomerRequest) -> Result<Customer>;

    /// Overwrite name, address and email. The contact number is left alone.
    async fn update_details(&self, id: Uuid, details: &CustomerDetails) -> Result<Customer>;

    /// Every customer, oldest first
    async fn list_all(&self) -> Result<Vec<Customer>>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_by_contact_number(&self, contact_number: &str) -> Result<Option<Customer>> {
        queries::customer::find_by_contact_number(&self.pool, contact_number).await
    }

    async fn create(&self, customer: &CreateCustomerRequest) -> Result<Customer> {
        queries::customer::create_customer(&self.pool, customer)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    anyhow!("Contact number {} already exists", customer.contact_number)
                } else {
                    e
                }
            })
    }

    async fn update_details(&self, id: Uuid, details: &CustomerDetails) -> Result<Customer> {
        queries::customer::update_customer_details(&self.pool, id, details)
            .await?
            .ok_or_else(|| anyhow!("Customer {} no longer exists", id))
    }

    async fn list_all(&self) -> Result<Vec<Customer>> {
        queries::customer::list_all_customers(&self.pool).await
    }
}

/// Whether an error came from a unique constraint in the database
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
pub mod memory {
    //! In-memory store for workflow tests

    use std::collections::HashSet;

    use chrono::Utc;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryCustomerStore {
        customers: Mutex<Vec<Customer>>,
        failing_contacts: Mutex<HashSet<String>>,
        lookups_fail: Mutex<bool>,
    }

    impl MemoryCustomerStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an existing customer
        pub fn insert(&self, full_name: &str, contact_number: &str, address: &str, email: &str) -> Customer {
            let now = Utc::now();
            let customer = Customer {
                id: Uuid::new_v4(),
                full_name: full_name.to_string(),
                contact_number: contact_number.to_string(),
                address: address.to_string(),
                email: email.to_string(),
                sms_sent: false,
                sms_sent_at: None,
                created_at: now,
                updated_at: now,
            };
            self.customers.lock().push(customer.clone());
            customer
        }

        /// Make `create` fail for this contact number
        pub fn fail_create_for(&self, contact_number: &str) {
            self.failing_contacts.lock().insert(contact_number.to_string());
        }

        pub fn fail_lookups(&self) {
            *self.lookups_fail.lock() = true;
        }

        pub fn get(&self, id: Uuid) -> Option<Customer> {
            self.customers.lock().iter().find(|c| c.id == id).cloned()
        }

        pub fn count(&self) -> usize {
            self.customers.lock().len()
        }
    }

    #[async_trait]
    impl CustomerStore for MemoryCustomerStore {
        async fn find_by_contact_number(&self, contact_number: &str) -> Result<Option<Customer>> {
            if *self.lookups_fail.lock() {
                return Err(anyhow!("connection refused"));
            }
            Ok(self
                .customers
                .lock()
                .iter()
                .find(|c| c.contact_number == contact_number)
                .cloned())
        }

        async fn create(&self, req: &CreateCustomerRequest) -> Result<Customer> {
            if self.failing_contacts.lock().contains(&req.contact_number) {
                return Err(anyhow!("insert rejected"));
            }
            if self.customers.lock().iter().any(|c| c.contact_number == req.contact_number) {
                return Err(anyhow!("Contact number {} already exists", req.contact_number));
            }
            Ok(self.insert(&req.full_name, &req.contact_number, &req.address, &req.email))
        }

        async fn update_details(&self, id: Uuid, details: &CustomerDetails) -> Result<Customer> {
            let mut customers = self.customers.lock();
            let customer = customers
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow!("Customer {} no longer exists", id))?;
            customer.full_name = details.full_name.clone();
            customer.address = details.address.clone();
            customer.email = details.email.clone();
            customer.updated_at = Utc::now();
            Ok(customer.clone())
        }

        async fn list_all(&self) -> Result<Vec<Customer>> {
            Ok(self.customers.lock().clone())
        }
    }
}
