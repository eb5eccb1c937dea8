pub mod credentials;
pub mod errors;
pub mod executor;
pub mod file_ingestor;
pub mod header_ensurer;
pub mod row_filter;
pub mod sheets_api_client;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use credentials::ServiceAccountCredentials;
pub use errors::{AuthError, ColumnMissingError, ParseError, RemoteError};
pub use executor::{unavailable_report, UploadExecutor, UploadedFile};
pub use sheets_api_client::{SheetRef, SheetStore, SheetsSession};
