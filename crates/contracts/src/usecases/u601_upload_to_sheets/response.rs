use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notice::Notice;

/// Result of one upload request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    /// Correlation id for log lines, not persisted anywhere
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub total_rows_uploaded: usize,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// All files were visited
    Done,
    /// Sheet resolution or the header check failed, no file was processed
    Aborted,
    /// The request carried no files
    NoFiles,
    /// The service could not authenticate at startup
    Unavailable,
}

/// Outcome of a single uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    pub status: FileStatus,
    pub rows_uploaded: usize,
    /// Rows selected for upload, rendered as text (truncated)
    #[serde(default)]
    pub preview: Vec<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    NoValidRows,
    ParseFailed,
    ColumnMissing,
    AppendFailed,
}

/// State of the connection to the spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub spreadsheet_id: String,
    pub notices: Vec<Notice>,
}
