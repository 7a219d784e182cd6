//! Split validated rows into new customers and conflicts with existing ones

use anyhow::Result;

use super::store::CustomerStore;
use super::validator::ImportRow;
use crate::types::import::{ConflictEntry, NewRowEntry};

/// Disjoint partition of the valid rows, each side in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub new_rows: Vec<NewRowEntry>,
    pub conflicts: Vec<ConflictEntry>,
}

/// Look up every row's contact number and sort it into one side
pub async fn partition_rows(store: &dyn CustomerStore, rows: Vec<ImportRow>) -> Result<Partition> {
    let mut partition = Partition::default();

    for row in rows {
        match store.find_by_contact_number(&row.contact_number).await? {
            Some(existing) => partition.conflicts.push(ConflictEntry {
                row_number: row.row_number,
                full_name: row.full_name,
                contact_number: row.contact_number,
                address: row.address,
                email: row.email,
                existing_id: existing.id,
                existing_name: existing.full_name,
                existing_email: existing.email,
            }),
            None => partition.new_rows.push(NewRowEntry {
                row_number: row.row_number,
                full_name: row.full_name,
                contact_number: row.contact_number,
                address: row.address,
                email: row.email,
            }),
        }
    }

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::customer_import::store::memory::MemoryCustomerStore;

    fn row(n: u32, name: &str, contact: &str) -> ImportRow {
        ImportRow {
            row_number: n,
            full_name: name.to_string(),
            contact_number: contact.to_string(),
            address: "Somewhere".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_partition_is_exhaustive_disjoint_and_ordered() {
        let store = MemoryCustomerStore::new();
        let jane = store.insert("Jane Doe", "0302", "Old Street", "jane@old.com");

        let rows = vec![row(2, "Ali", "0300"), row(3, "Jane", "0302"), row(4, "Omar", "0301")];
        let partition = partition_rows(&store, rows).await.unwrap();

        let new_numbers: Vec<u32> = partition.new_rows.iter().map(|r| r.row_number).collect();
        assert_eq!(new_numbers, vec![2, 4]);
        assert_eq!(partition.conflicts.len(), 1);

        let conflict = &partition.conflicts[0];
        assert_eq!(conflict.row_number, 3);
        assert_eq!(conflict.existing_id, jane.id);
        assert_eq!(conflict.existing_name, "Jane Doe");
        assert_eq!(conflict.existing_email, "jane@old.com");
        assert_eq!(conflict.full_name, "Jane");
    }

    #[tokio::test]
    async fn test_contact_match_is_exact() {
        let store = MemoryCustomerStore::new();
        store.insert("Jane Doe", "0302 111", "Old Street", "jane@old.com");

        let partition = partition_rows(&store, vec![row(2, "Jane", "0302111")]).await.unwrap();
        assert_eq!(partition.new_rows.len(), 1);
        assert!(partition.conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let store = MemoryCustomerStore::new();
        store.fail_lookups();
        assert!(partition_rows(&store, vec![row(2, "Ali", "0300")]).await.is_err());
    }
}
