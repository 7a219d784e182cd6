//! Customer spreadsheet import types
//!
//! Request payloads follow the camelCase envelope convention; the result
//! payloads keep the snake_case field names the admin import dialog reads
//! (`has_duplicates`, `created_count`, ...).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upload of a customer spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUploadRequest {
    /// Original file name; a `.csv` extension selects the CSV reader
    #[serde(default)]
    pub filename: Option<String>,
    pub file_content_base64: String,
}

/// How to resolve a staged import with conflicting contact numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionAction {
    /// Create new rows and overwrite name/address/email of conflicting records
    Replace,
    /// Create new rows only, leave conflicting records untouched
    Ignore,
    /// Drop the staged import without writing anything
    Cancel,
}

impl ResolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::Replace => "replace",
            ResolutionAction::Ignore => "ignore",
            ResolutionAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResolveRequest {
    pub action: ResolutionAction,
}

/// A valid row whose contact number matches no existing customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRowEntry {
    pub row_number: u32,
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub email: String,
}

/// A valid row whose contact number already belongs to a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub row_number: u32,
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub email: String,
    pub existing_id: Uuid,
    pub existing_name: String,
    pub existing_email: String,
}

/// Outcome of writing a batch of import rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub success: bool,
    pub created_count: usize,
    pub updated_count: usize,
    pub total_processed: usize,
    /// One `"Row <n>: <message>"` entry per row that failed
    pub errors: Vec<String>,
    pub imported_by: Uuid,
}

/// Upload accepted but paused: conflicts must be resolved first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesFound {
    pub success: bool,
    pub has_duplicates: bool,
    pub total_rows: usize,
    pub new_count: usize,
    pub duplicate_count: usize,
    pub duplicates: Vec<ConflictEntry>,
    pub message: String,
}

/// Upload without conflicts, committed straight away
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCommitted {
    pub has_duplicates: bool,
    #[serde(flatten)]
    pub result: CommitResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportUploadResponse {
    DuplicatesFound(DuplicatesFound),
    Committed(ImportCommitted),
}

/// Acknowledgement of a cancelled import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCancelled {
    pub success: bool,
    pub cancelled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportResolveResponse {
    Cancelled(ImportCancelled),
    Committed(CommitResult),
}
