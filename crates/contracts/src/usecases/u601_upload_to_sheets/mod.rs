pub mod notice;
pub mod response;
pub mod schema;

pub use notice::{Notice, NoticeLevel};
pub use response::{BatchStatus, ConnectionStatus, FileReport, FileStatus, UploadReport};
pub use schema::{HEADER_RANGE, NON_EMPTY_COLUMNS, REQUIRED_HEADERS};
