//! Row-by-row writer for accepted import rows

use tracing::warn;
use uuid::Uuid;

use super::store::CustomerStore;
use crate::types::customer::{CreateCustomerRequest, CustomerDetails};
use crate::types::import::{CommitResult, ConflictEntry, NewRowEntry};

/// Write new rows as creates and, when `replace` is set, conflicts as
/// detail updates of the existing records.
///
/// A failing row is recorded and skipped; earlier writes stay in place.
pub async fn commit_batch(
    store: &dyn CustomerStore,
    new_rows: &[NewRowEntry],
    conflicts: &[ConflictEntry],
    replace: bool,
    imported_by: Uuid,
) -> CommitResult {
    let mut created_count = 0;
    let mut updated_count = 0;
    let mut total_processed = 0;
    let mut errors = Vec::new();

    for row in new_rows {
        total_processed += 1;
        let req = CreateCustomerRequest {
            full_name: row.full_name.clone(),
            contact_number: row.contact_number.clone(),
            address: row.address.clone(),
            email: row.email.clone(),
        };
        match store.create(&req).await {
            Ok(_) => created_count += 1,
            Err(e) => {
                warn!("Import row {} not created: {}", row.row_number, e);
                errors.push(format!("Row {}: {}", row.row_number, e));
            }
        }
    }

    if replace {
        for conflict in conflicts {
            total_processed += 1;
            let details = CustomerDetails {
                full_name: conflict.full_name.clone(),
                address: conflict.address.clone(),
                email: conflict.email.clone(),
            };
            match store.update_details(conflict.existing_id, &details).await {
                Ok(_) => updated_count += 1,
                Err(e) => {
                    warn!("Import row {} not updated: {}", conflict.row_number, e);
                    errors.push(format!("Row {}: {}", conflict.row_number, e));
                }
            }
        }
    }

    CommitResult {
        success: true,
        created_count,
        updated_count,
        total_processed,
        errors,
        imported_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::customer_import::store::memory::MemoryCustomerStore;

    fn new_row(n: u32, contact: &str) -> NewRowEntry {
        NewRowEntry {
            row_number: n,
            full_name: format!("Customer {}", n),
            contact_number: contact.to_string(),
            address: "Main Bazaar".to_string(),
            email: format!("c{}@example.com", n),
        }
    }

    #[tokio::test]
    async fn test_failing_row_is_reported_and_skipped() {
        let store = MemoryCustomerStore::new();
        store.fail_create_for("0303");
        let rows: Vec<NewRowEntry> = (2..=6).map(|n| new_row(n, &format!("030{}", n - 1))).collect();

        let result = commit_batch(&store, &rows, &[], false, Uuid::nil()).await;

        assert_eq!(result.created_count, 4);
        assert_eq!(result.updated_count, 0);
        assert_eq!(result.total_processed, 5);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Row 4: "), "got {}", result.errors[0]);
        assert_eq!(store.count(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_within_file_fails_second_insert() {
        let store = MemoryCustomerStore::new();
        let rows = vec![new_row(2, "0300"), new_row(3, "0300")];

        let result = commit_batch(&store, &rows, &[], false, Uuid::nil()).await;

        assert_eq!(result.created_count, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Row 3: "));
    }

    #[tokio::test]
    async fn test_conflicts_skipped_unless_replacing() {
        let store = MemoryCustomerStore::new();
        let existing = store.insert("Jane Doe", "0302", "Old Street", "jane@old.com");
        let conflict = ConflictEntry {
            row_number: 2,
            full_name: "Jane D.".to_string(),
            contact_number: "0302".to_string(),
            address: "New Street".to_string(),
            email: "jane@new.com".to_string(),
            existing_id: existing.id,
            existing_name: existing.full_name.clone(),
            existing_email: existing.email.clone(),
        };

        let ignored = commit_batch(&store, &[], std::slice::from_ref(&conflict), false, Uuid::nil()).await;
        assert_eq!(ignored.updated_count, 0);
        assert_eq!(ignored.total_processed, 0);
        assert_eq!(store.get(existing.id).unwrap().address, "Old Street");

        let replaced = commit_batch(&store, &[], &[conflict], true, Uuid::nil()).await;
        assert_eq!(replaced.updated_count, 1);
        let after = store.get(existing.id).unwrap();
        assert_eq!(after.full_name, "Jane D.");
        assert_eq!(after.address, "New Street");
        assert_eq!(after.email, "jane@new.com");
        assert_eq!(after.contact_number, "0302");
    }

    #[tokio::test]
    async fn test_update_of_vanished_record_is_row_error() {
        let store = MemoryCustomerStore::new();
        let conflict = ConflictEntry {
            row_number: 9,
            full_name: "Ghost".to_string(),
            contact_number: "0399".to_string(),
            address: "Nowhere".to_string(),
            email: "ghost@example.com".to_string(),
            existing_id: Uuid::new_v4(),
            existing_name: "Ghost".to_string(),
            existing_email: "ghost@example.com".to_string(),
        };

        let result = commit_batch(&store, &[], &[conflict], true, Uuid::nil()).await;
        assert_eq!(result.updated_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Row 9: "));
    }
}
