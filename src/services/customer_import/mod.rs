//! Customer spreadsheet import
//!
//! Upload flow: parse the first worksheet, validate the required columns
//! and rows, split rows into new customers and contact-number conflicts.
//! Without conflicts the new rows are written straight away. With
//! conflicts the validated import is staged for the caller's session and
//! nothing is written until `resolve` receives `replace`, `ignore` or
//! `cancel`.

pub mod committer;
pub mod detector;
pub mod parser;
pub mod staging;
pub mod store;
pub mod validator;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::types::import::{
    DuplicatesFound, ImportCancelled, ImportCommitted, ImportResolveResponse, ImportUploadResponse,
    ResolutionAction,
};

pub use staging::{ImportStaging, SessionKey, StagedImport};
pub use store::{CustomerStore, PgCustomerStore};

/// Failures of the import workflow, each with a stable wire code
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Could not read the uploaded file: {0}")]
    MalformedFile(String),

    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("No valid rows found in the uploaded file")]
    NoValidData,

    #[error("No pending import for this session")]
    NoStagedImport,

    #[error("Customer store error: {0}")]
    Store(String),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MalformedFile(_) => "MALFORMED_FILE",
            ImportError::Schema { .. } => "SCHEMA_ERROR",
            ImportError::NoValidData => "NO_VALID_DATA",
            ImportError::NoStagedImport => "NO_STAGED_IMPORT",
            ImportError::Store(_) => "DATABASE_ERROR",
        }
    }
}

impl From<anyhow::Error> for ImportError {
    fn from(err: anyhow::Error) -> Self {
        ImportError::Store(err.to_string())
    }
}

/// Import workflow over a record store and the session staging area
#[derive(Clone)]
pub struct CustomerImportService {
    store: Arc<dyn CustomerStore>,
    staging: ImportStaging,
}

impl CustomerImportService {
    pub fn new(store: Arc<dyn CustomerStore>, staging: ImportStaging) -> Self {
        Self { store, staging }
    }

    /// Record store shared with the customer export
    pub fn store(&self) -> Arc<dyn CustomerStore> {
        Arc::clone(&self.store)
    }

    #[cfg(test)]
    pub fn staging(&self) -> &ImportStaging {
        &self.staging
    }

    /// Accept an uploaded file for the session
    pub async fn upload(
        &self,
        session: SessionKey,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<ImportUploadResponse, ImportError> {
        let sheet = parser::parse_upload(bytes, filename)?;
        let rows = validator::validate(&sheet)?;
        let total_rows = rows.len();

        let partition = detector::partition_rows(self.store.as_ref(), rows).await?;

        if !partition.conflicts.is_empty() {
            let duplicate_count = partition.conflicts.len();
            let new_count = partition.new_rows.len();
            let duplicates = partition.conflicts.clone();

            self.staging.stage(
                session,
                StagedImport {
                    total_rows,
                    new_rows: partition.new_rows,
                    conflicts: partition.conflicts,
                    imported_by: session.user_id,
                },
            );
            info!(
                "Import staged for user {}: {} rows, {} new, {} duplicates",
                session.user_id, total_rows, new_count, duplicate_count
            );

            return Ok(ImportUploadResponse::DuplicatesFound(DuplicatesFound {
                success: true,
                has_duplicates: true,
                total_rows,
                new_count,
                duplicate_count,
                duplicates,
                message: format!(
                    "{} of {} rows match existing contact numbers. Choose replace, ignore or cancel.",
                    duplicate_count, total_rows
                ),
            }));
        }

        let result = committer::commit_batch(
            self.store.as_ref(),
            &partition.new_rows,
            &[],
            false,
            session.user_id,
        )
        .await;
        info!(
            "Import committed for user {}: {} created, {} errors",
            session.user_id,
            result.created_count,
            result.errors.len()
        );

        Ok(ImportUploadResponse::Committed(ImportCommitted {
            has_duplicates: false,
            result,
        }))
    }

    /// Apply the caller's decision to the session's staged import
    pub async fn resolve(
        &self,
        session: SessionKey,
        action: ResolutionAction,
    ) -> Result<ImportResolveResponse, ImportError> {
        let staged = self.staging.take(&session).ok_or(ImportError::NoStagedImport)?;

        if action == ResolutionAction::Cancel {
            info!("Import cancelled by user {}", session.user_id);
            return Ok(ImportResolveResponse::Cancelled(ImportCancelled {
                success: true,
                cancelled: true,
                message: "Import cancelled, no customers were changed".to_string(),
            }));
        }

        let result = committer::commit_batch(
            self.store.as_ref(),
            &staged.new_rows,
            &staged.conflicts,
            action == ResolutionAction::Replace,
            staged.imported_by,
        )
        .await;
        info!(
            "Import resolved with '{}' for user {} ({} staged rows): {} created, {} updated, {} errors",
            action.as_str(),
            session.user_id,
            staged.total_rows,
            result.created_count,
            result.updated_count,
            result.errors.len()
        );

        Ok(ImportResolveResponse::Committed(result))
    }

    /// Forget the session's staged import (logout)
    pub fn discard(&self, session: &SessionKey) -> bool {
        self.staging.discard(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rust_xlsxwriter::Workbook;
    use uuid::Uuid;

    use store::memory::MemoryCustomerStore;

    const HEADERS: [&str; 4] = ["FULL NAME", "CONTACT NUMBER", "ADDRESS", "EMAIL"];

    fn workbook(headers: &[&str], rows: &[[&str; 4]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn setup() -> (CustomerImportService, Arc<MemoryCustomerStore>) {
        let store = Arc::new(MemoryCustomerStore::new());
        let service = CustomerImportService::new(
            store.clone(),
            ImportStaging::new(Duration::from_secs(60)),
        );
        (service, store)
    }

    fn session() -> SessionKey {
        SessionKey {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
        }
    }

    fn jane_upload() -> Vec<u8> {
        workbook(
            &HEADERS,
            &[
                ["Ali Khan", "0300 1111111", "Lahore", "ali@example.com"],
                ["Jane Doe", "0302 2222222", "New Street 5", "jane@new.com"],
            ],
        )
    }

    #[tokio::test]
    async fn test_upload_without_conflicts_commits_immediately() {
        let (service, store) = setup();
        let s = session();
        let bytes = workbook(
            &HEADERS,
            &[
                ["Ali", "0300", "Lahore", "ali@example.com"],
                ["Sara", "0301", "Karachi", "sara@example.com"],
                ["Omar", "0302", "Multan", "omar@example.com"],
            ],
        );

        let response = service.upload(s, &bytes, Some("customers.xlsx")).await.unwrap();

        match response {
            ImportUploadResponse::Committed(committed) => {
                assert!(!committed.has_duplicates);
                assert_eq!(committed.result.created_count, 3);
                assert_eq!(committed.result.updated_count, 0);
                assert_eq!(committed.result.imported_by, s.user_id);
                assert!(committed.result.errors.is_empty());
            }
            other => panic!("expected commit, got {:?}", other),
        }
        assert_eq!(store.count(), 3);
        assert_eq!(service.staging().len(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_conflict_stages_and_writes_nothing() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();

        let response = service.upload(s, &jane_upload(), None).await.unwrap();

        match response {
            ImportUploadResponse::DuplicatesFound(found) => {
                assert!(found.has_duplicates);
                assert_eq!(found.total_rows, 2);
                assert_eq!(found.new_count, 1);
                assert_eq!(found.duplicate_count, 1);
                assert_eq!(found.duplicates[0].existing_name, "Jane Doe");
                assert_eq!(found.duplicates[0].row_number, 3);
            }
            other => panic!("expected duplicates, got {:?}", other),
        }
        assert_eq!(store.count(), 1);
        assert_eq!(service.staging().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_discards_without_writes() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        service.upload(s, &jane_upload(), None).await.unwrap();

        let response = service.resolve(s, ResolutionAction::Cancel).await.unwrap();

        assert!(matches!(response, ImportResolveResponse::Cancelled(ref c) if c.cancelled));
        assert_eq!(store.count(), 1);
        assert!(matches!(
            service.resolve(s, ResolutionAction::Replace).await,
            Err(ImportError::NoStagedImport)
        ));
    }

    #[tokio::test]
    async fn test_replace_updates_details_but_keeps_contact_number() {
        let (service, store) = setup();
        let jane = store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        service.upload(s, &jane_upload(), None).await.unwrap();

        let response = service.resolve(s, ResolutionAction::Replace).await.unwrap();

        match response {
            ImportResolveResponse::Committed(result) => {
                assert_eq!(result.created_count, 1);
                assert_eq!(result.updated_count, 1);
                assert_eq!(result.total_processed, 2);
            }
            other => panic!("expected commit, got {:?}", other),
        }
        let after = store.get(jane.id).unwrap();
        assert_eq!(after.address, "New Street 5");
        assert_eq!(after.email, "jane@new.com");
        assert_eq!(after.contact_number, "0302 2222222");
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_ignore_leaves_existing_records_untouched() {
        let (service, store) = setup();
        let jane = store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        service.upload(s, &jane_upload(), None).await.unwrap();

        let response = service.resolve(s, ResolutionAction::Ignore).await.unwrap();

        match response {
            ImportResolveResponse::Committed(result) => {
                assert_eq!(result.created_count, 1);
                assert_eq!(result.updated_count, 0);
            }
            other => panic!("expected commit, got {:?}", other),
        }
        let after = store.get(jane.id).unwrap();
        assert_eq!(after.address, "Old Street 1");
        assert_eq!(after.email, "jane@old.com");
    }

    #[tokio::test]
    async fn test_second_resolve_finds_nothing_staged() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        service.upload(s, &jane_upload(), None).await.unwrap();

        service.resolve(s, ResolutionAction::Ignore).await.unwrap();
        let second = service.resolve(s, ResolutionAction::Ignore).await;

        assert!(matches!(second, Err(ImportError::NoStagedImport)));
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_staged_import_is_invisible_to_other_sessions() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        service.upload(s, &jane_upload(), None).await.unwrap();

        let other = SessionKey {
            user_id: s.user_id,
            session_id: Uuid::new_v4(),
        };
        assert!(matches!(
            service.resolve(other, ResolutionAction::Replace).await,
            Err(ImportError::NoStagedImport)
        ));
        assert!(service.resolve(s, ResolutionAction::Cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_columns_commit_nothing() {
        let (service, store) = setup();
        let bytes = workbook(&["FULL NAME", "EMAIL"], &[]);

        match service.upload(session(), &bytes, None).await {
            Err(ImportError::Schema { missing }) => {
                assert_eq!(missing, vec!["CONTACT NUMBER", "ADDRESS"]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_rows_with_empty_fields_are_not_counted() {
        let (service, store) = setup();
        let bytes = workbook(
            &HEADERS,
            &[
                ["Ali", "0300", "Lahore", "ali@example.com"],
                ["Sara", "", "Karachi", "sara@example.com"],
                ["Omar", "0302", "nan", "omar@example.com"],
            ],
        );

        let response = service.upload(session(), &bytes, None).await.unwrap();

        match response {
            ImportUploadResponse::Committed(committed) => {
                assert_eq!(committed.result.created_count, 1);
                assert_eq!(committed.result.total_processed, 1);
            }
            other => panic!("expected commit, got {:?}", other),
        }
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_upload() {
        let (service, _store) = setup();
        let result = service.upload(session(), b"PK\x03\x04 truncated", Some("x.xlsx")).await;
        assert_eq!(result.unwrap_err().code(), "MALFORMED_FILE");
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_database_error() {
        let (service, store) = setup();
        store.fail_lookups();
        let result = service.upload(session(), &jane_upload(), None).await;
        assert_eq!(result.unwrap_err().code(), "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn test_second_upload_replaces_staged_import() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        store.insert("Ali Khan", "0300 1111111", "Lahore", "ali@example.com");
        let s = session();

        service.upload(s, &jane_upload(), None).await.unwrap();
        let single = workbook(&HEADERS, &[["Jane Doe", "0302 2222222", "Third Street", "jane@third.com"]]);
        service.upload(s, &single, None).await.unwrap();

        match service.resolve(s, ResolutionAction::Replace).await.unwrap() {
            ImportResolveResponse::Committed(result) => {
                assert_eq!(result.created_count, 0);
                assert_eq!(result.updated_count, 1);
            }
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_reads_committed_rows_through_store() {
        let (service, _store) = setup();
        let bytes = workbook(
            &HEADERS,
            &[
                ["Ali", "0300", "Lahore", "ali@example.com"],
                ["Sara", "0301", "Karachi", "sara@example.com"],
            ],
        );
        tokio_test::assert_ok!(service.upload(session(), &bytes, None).await);

        let customers = tokio_test::assert_ok!(service.store().list_all().await);
        let names: Vec<&str> = customers.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, ["Ali", "Sara"]);

        let exported = tokio_test::assert_ok!(crate::services::customer_export::build_customer_export(&customers));
        let sheet = tokio_test::assert_ok!(parser::parse_upload(&exported, None));
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].get("CONTACT NUMBER"), "0301");
    }

    #[tokio::test]
    async fn test_staged_import_counts_valid_rows() {
        let (service, store) = setup();
        store.insert("Jane Doe", "0302 2222222", "Old Street 1", "jane@old.com");
        let s = session();
        tokio_test::assert_ok!(service.upload(s, &jane_upload(), None).await);

        let staged = service.staging().take(&s).unwrap();
        assert_eq!(staged.total_rows, 2);
        assert_eq!(staged.new_rows.len() + staged.conflicts.len(), staged.total_rows);
    }
}
